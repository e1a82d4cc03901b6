//! Multi-sample merging: project per-sample splice graphs into position-keyed
//! summaries, accumulate them across samples, and resolve the accumulation
//! back into a meta splice graph with phasing paths.
//!
//! A [`CombinedGraph`] lives in three states: freshly [`built`](CombinedGraph::build)
//! from one sample; accumulating children via [`combine`](CombinedGraph::combine)
//! (which unions splice positions only, deferring the expensive merge); and
//! finalised via [`combine_children`](CombinedGraph::combine_children) followed
//! by [`resolve`](CombinedGraph::resolve).

use crate::chain::{build_exon_coordinates_from_path, build_path_from_intron_coordinates};
use crate::config::Config;
use crate::graph::{EdgeInfo, SpliceGraph, VertexInfo};
use crate::interval::{intersect_sorted_count, merge_sorted_union, split_interval_union};
use crate::phase::HyperSet;
use crate::revise::{group_end_boundaries, group_start_boundaries};
use crate::types::{GenomicPos, HashMap, HashMapExt};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Half-open genomic interval.
pub type Interval = (GenomicPos, GenomicPos);

/// Accumulated weight and sample count of a merged element.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightCount {
    pub weight: f64,
    pub count: i32,
}

impl WeightCount {
    pub fn new(weight: f64, count: i32) -> Self {
        Self { weight, count }
    }

    fn absorb(&mut self, other: WeightCount) {
        self.weight += other.weight;
        self.count += other.count;
    }
}

/// Phases sharing an inner exon-boundary chain, with the outer endpoints and
/// counts of every contributing observation.
#[derive(Debug, Clone, Default)]
pub struct PhaseCluster {
    /// Inner exon-boundary chain (outer `lpos`/`rpos` stripped).
    pub chain: Vec<GenomicPos>,
    pub lefts: Vec<GenomicPos>,
    pub rights: Vec<GenomicPos>,
    pub counts: Vec<i32>,
}

/// Exon-coordinate projection of an unbridged mate pair.
#[derive(Debug, Clone, Default)]
pub struct UnbridgedReads {
    pub chain1: Vec<GenomicPos>,
    pub chain2: Vec<GenomicPos>,
    pub count: i32,
}

/// Everything [`CombinedGraph::resolve`] rebuilds for downstream assembly.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub graph: SpliceGraph,
    pub phases: HyperSet,
    pub reads: Vec<UnbridgedReads>,
}

#[derive(Debug, Clone, Default)]
pub struct CombinedGraph {
    pub num_combined: i32,
    pub gid: String,
    pub chrm: String,
    pub strand: char,

    pub regions: Vec<(Interval, WeightCount)>,
    pub junctions: Vec<(Interval, WeightCount)>,
    pub sbounds: Vec<(GenomicPos, WeightCount)>,
    pub tbounds: Vec<(GenomicPos, WeightCount)>,
    /// Sorted, duplicate-free junction endpoint positions.
    pub splices: Vec<GenomicPos>,
    pub phase: Vec<PhaseCluster>,
    pub reads: Vec<UnbridgedReads>,

    pub children: Vec<CombinedGraph>,

    /// Folded start-boundary position → group leader, filled by resolve.
    pub smap: BTreeMap<GenomicPos, GenomicPos>,
    /// Folded end-boundary position → group leader, filled by resolve.
    pub tmap: BTreeMap<GenomicPos, GenomicPos>,
}

impl CombinedGraph {
    pub fn new() -> Self {
        Self { strand: '?', ..Self::default() }
    }

    pub fn clear(&mut self) {
        *self = Self { strand: '.', ..Self::default() };
    }

    // ── per-sample projection ───────────────────────────────────────────────

    /// Project one sample's splice graph, hyper paths, and unbridged read
    /// pairs into this (empty) combined graph.
    pub fn build(
        &mut self,
        gr: &SpliceGraph,
        hs: &HyperSet,
        ub: &[(Vec<usize>, Vec<usize>, i32)],
    ) {
        self.chrm = gr.chrm.clone();
        self.strand = gr.strand;
        self.num_combined = 1;

        self.build_regions(gr);
        self.build_start_bounds(gr);
        self.build_end_bounds(gr);
        self.build_splices_junctions(gr);
        self.build_phase(gr, hs);
        self.build_reads(gr, ub);
    }

    fn build_regions(&mut self, gr: &SpliceGraph) {
        self.regions.clear();
        let n = gr.num_vertices() - 1;
        for i in 1..n {
            let vi = gr.get_vertex_info(i);
            let w = gr.get_vertex_weight(i);
            self.regions.push(((vi.lpos, vi.rpos), WeightCount::new(w, 1)));
        }
    }

    fn build_start_bounds(&mut self, gr: &SpliceGraph) {
        self.sbounds.clear();
        let n = gr.num_vertices() - 1;
        for e in gr.out_edges(0) {
            let t = gr.edge_target(e);
            if t == n {
                continue;
            }
            let w = gr.get_edge_weight(e);
            let p = gr.get_vertex_info(t).lpos;
            self.sbounds.push((p, WeightCount::new(w, 1)));
        }
    }

    fn build_end_bounds(&mut self, gr: &SpliceGraph) {
        self.tbounds.clear();
        let n = gr.num_vertices() - 1;
        for e in gr.in_edges(n) {
            let s = gr.edge_source(e);
            if s == 0 {
                continue;
            }
            let w = gr.get_edge_weight(e);
            let p = gr.get_vertex_info(s).rpos;
            self.tbounds.push((p, WeightCount::new(w, 1)));
        }
    }

    fn build_splices_junctions(&mut self, gr: &SpliceGraph) {
        self.junctions.clear();
        self.splices.clear();
        let n = gr.num_vertices() - 1;
        let mut sp: BTreeSet<GenomicPos> = BTreeSet::new();
        for e in gr.edges() {
            let (s, t) = gr.edge_endpoints(e);
            debug_assert!(s < t);
            if s == 0 || t == n {
                continue;
            }
            let p1 = gr.get_vertex_info(s).rpos;
            let p2 = gr.get_vertex_info(t).lpos;
            if p1 >= p2 {
                continue;
            }
            let w = gr.get_edge_weight(e);
            self.junctions.push(((p1, p2), WeightCount::new(w, 1)));
            sp.insert(p1);
            sp.insert(p2);
        }
        self.splices = sp.into_iter().collect();
    }

    fn build_phase(&mut self, gr: &SpliceGraph, hs: &HyperSet) {
        self.phase.clear();
        let mut index: HashMap<Vec<GenomicPos>, usize> = HashMap::new();
        for (shifted, &count) in hs.iter_with_counts() {
            if shifted.is_empty() {
                continue;
            }
            // hyper paths are stored shifted by −1; undo before projecting
            let path: Vec<usize> = shifted.iter().map(|&v| v + 1).collect();
            let vv = build_exon_coordinates_from_path(gr, &path);
            if vv.len() <= 1 {
                continue;
            }
            let inner = vv[1..vv.len() - 1].to_vec();
            let left = vv[0];
            let right = vv[vv.len() - 1];
            match index.get(&inner) {
                None => {
                    index.insert(inner.clone(), self.phase.len());
                    self.phase.push(PhaseCluster {
                        chain: inner,
                        lefts: vec![left],
                        rights: vec![right],
                        counts: vec![count],
                    });
                }
                Some(&k) => {
                    debug_assert_eq!(inner, self.phase[k].chain);
                    self.phase[k].lefts.push(left);
                    self.phase[k].rights.push(right);
                    self.phase[k].counts.push(count);
                }
            }
        }
    }

    fn build_reads(&mut self, gr: &SpliceGraph, ub: &[(Vec<usize>, Vec<usize>, i32)]) {
        self.reads.clear();
        let n = gr.num_vertices() - 1;
        for (path1, path2, count) in ub {
            if path1.is_empty() || path2.is_empty() {
                continue;
            }
            debug_assert!(path1[0] != 0 && path2[0] != 0);
            debug_assert!(*path1.last().unwrap() != n && *path2.last().unwrap() != n);
            self.reads.push(UnbridgedReads {
                chain1: build_exon_coordinates_from_path(gr, path1),
                chain2: build_exon_coordinates_from_path(gr, path2),
                count: *count,
            });
        }
    }

    // ── accumulation ────────────────────────────────────────────────────────

    /// Adopt another combined graph as a child, unioning splice positions
    /// only.  The full merge is deferred to [`combine_children`](Self::combine_children).
    pub fn combine(&mut self, gt: &CombinedGraph) {
        if self.children.is_empty() {
            let me = self.clone();
            self.children.push(me);
        }
        if gt.children.is_empty() {
            self.children.push(gt.clone());
        } else {
            self.children.extend(gt.children.iter().cloned());
        }

        if self.chrm.is_empty() {
            self.chrm = gt.chrm.clone();
        }
        if self.strand == '?' {
            self.strand = gt.strand;
        }
        assert_eq!(gt.chrm, self.chrm, "combining graphs from different chromosomes");
        assert_eq!(gt.strand, self.strand, "combining graphs from different strands");

        self.num_combined += gt.num_combined;
        self.splices = merge_sorted_union(&self.splices, &gt.splices);
    }

    /// Number of positions shared between `v` (sorted) and this graph's
    /// splice positions.
    pub fn get_overlapped_splice_positions(&self, v: &[GenomicPos]) -> usize {
        intersect_sorted_count(v, &self.splices)
    }

    /// Digest the children: union regions over split intervals, sum junctions
    /// and bounds keyed by position, and verify the combined-count law.
    pub fn combine_children(&mut self) {
        if self.children.is_empty() {
            return;
        }

        let mut items: Vec<(GenomicPos, GenomicPos, i32)> = Vec::new();
        let mut mj: BTreeMap<Interval, WeightCount> = BTreeMap::new();
        let mut ms: BTreeMap<GenomicPos, WeightCount> = BTreeMap::new();
        let mut mt: BTreeMap<GenomicPos, WeightCount> = BTreeMap::new();
        self.phase.clear();
        self.reads.clear();

        let mut num = 0;
        for gt in &self.children {
            for &((l, r), wc) in &gt.regions {
                items.push((l, r, wc.weight as i32));
            }
            for &(p, wc) in &gt.junctions {
                mj.entry(p).or_default().absorb(wc);
            }
            for &(p, wc) in &gt.sbounds {
                ms.entry(p).or_default().absorb(wc);
            }
            for &(p, wc) in &gt.tbounds {
                mt.entry(p).or_default().absorb(wc);
            }
            num += gt.num_combined;
        }
        assert_eq!(num, self.num_combined, "combined count does not add up");

        self.regions = split_interval_union(&items)
            .into_iter()
            .map(|(l, r, w)| ((l, r), WeightCount::new(w as f64, 1)))
            .collect();
        self.junctions = mj.into_iter().collect();
        self.sbounds = ms.into_iter().collect();
        self.tbounds = mt.into_iter().collect();
    }

    // ── resolution ──────────────────────────────────────────────────────────

    /// Rebuild a meta splice graph and hyper paths from the merged summaries.
    pub fn resolve(&mut self, cfg: &Config) -> Resolved {
        self.group_junctions(cfg);
        let mut gr = self.build_splice_graph();
        self.smap = group_start_boundaries(&mut gr, cfg.max_group_boundary_distance);
        self.tmap = group_end_boundaries(&mut gr, cfg.max_group_boundary_distance);
        let phases = self.build_phasing_paths(&gr);
        Resolved { graph: gr, phases, reads: std::mem::take(&mut self.reads) }
    }

    /// Drop a junction when a near-identical, vastly heavier one exists.
    pub fn group_junctions(&mut self, cfg: &Config) {
        let max_dist = cfg.max_group_junction_distance;
        let mut dropped: BTreeSet<usize> = BTreeSet::new();
        for i in 0..self.junctions.len() {
            if dropped.contains(&i) {
                continue;
            }
            let (xp, xd) = self.junctions[i];
            for j in i + 1..self.junctions.len() {
                if dropped.contains(&j) {
                    continue;
                }
                let (yp, yd) = self.junctions[j];
                let d1 = (xp.0 - yp.0).abs();
                let d2 = (xp.1 - yp.1).abs();
                if d1 + d2 >= max_dist {
                    continue;
                }
                if 10.0 * xd.weight < yd.weight
                    && xd.count < yd.count
                    && xd.count <= 2
                    && yd.weight <= 100.0
                {
                    debug!(loser = ?xp, winner = ?yp, "group junctions: drop dominated");
                    dropped.insert(i);
                }
                if xd.weight > 10.0 * yd.weight
                    && xd.count > yd.count
                    && yd.count <= 2
                    && yd.weight <= 100.0
                {
                    debug!(loser = ?yp, winner = ?xp, "group junctions: drop dominated");
                    dropped.insert(j);
                }
            }
        }
        if !dropped.is_empty() {
            let kept: Vec<_> = self
                .junctions
                .iter()
                .enumerate()
                .filter(|(k, _)| !dropped.contains(k))
                .map(|(_, j)| *j)
                .collect();
            self.junctions = kept;
        }
    }

    /// Emit sentinels plus one vertex per region, wire bound and junction
    /// edges through the position indices, and connect touching regions.
    pub fn build_splice_graph(&self) -> SpliceGraph {
        let mut gr = SpliceGraph::new(&self.chrm, self.strand);
        gr.gid = self.gid.clone();

        // sentinels sit at the outermost bounds
        let sb = self.get_leftmost_bound().map_or(-1, |(p, _)| p);
        let tb = self.get_rightmost_bound().map_or(-1, |(p, _)| p);

        gr.add_vertex();
        gr.set_vertex_weight(0, 0.0);
        gr.set_vertex_info(0, VertexInfo::new(sb, sb));

        for (i, &((l, r), wc)) in self.regions.iter().enumerate() {
            gr.add_vertex();
            let mut vi = VertexInfo::new(l, r);
            vi.count = wc.count;
            gr.set_vertex_weight(i + 1, wc.weight);
            gr.set_vertex_info(i + 1, vi);
        }

        let sink = gr.add_vertex();
        gr.set_vertex_weight(sink, 0.0);
        gr.set_vertex_info(sink, VertexInfo::new(tb, tb));

        gr.build_vertex_index();

        for &(p, wc) in &self.sbounds {
            let k = *gr.lindex.get(&p).expect("start bound lost from regions");
            let e = gr.add_edge(0, k);
            gr.set_edge_weight(e, wc.weight);
            gr.set_edge_info(e, EdgeInfo { weight: wc.weight, count: wc.count });
        }

        for &(p, wc) in &self.tbounds {
            let k = *gr.rindex.get(&p).expect("end bound lost from regions");
            let e = gr.add_edge(k, sink);
            gr.set_edge_weight(e, wc.weight);
            gr.set_edge_info(e, EdgeInfo { weight: wc.weight, count: wc.count });
        }

        for &((p1, p2), wc) in &self.junctions {
            let s = *gr.rindex.get(&p1).expect("junction source lost from regions");
            let t = *gr.lindex.get(&p2).expect("junction target lost from regions");
            let e = gr.add_edge(s, t);
            gr.set_edge_weight(e, wc.weight);
            gr.set_edge_info(e, EdgeInfo { weight: wc.weight, count: wc.count });
        }

        // connect touching regions; the narrower side's coverage carries over
        for i in 1..self.regions.len() {
            let ((_, p1), ss) = self.regions[i - 1];
            let ((p2, _), tt) = self.regions[i];
            debug_assert!(p1 <= p2);
            if p1 < p2 {
                continue;
            }

            let xd = gr.out_degree(i);
            let yd = gr.in_degree(i + 1);
            let mut w = if xd < yd { ss.weight } else { tt.weight };
            let c = ss.count.min(tt.count);
            if w < 1.0 {
                w = 1.0;
            }
            let e = gr.add_edge(i, i + 1);
            gr.set_edge_weight(e, w);
            gr.set_edge_info(e, EdgeInfo { weight: w, count: c });
        }

        gr
    }

    /// Materialise every phase cluster (own and children's) into vertex paths
    /// over the rebuilt graph, applying the boundary-group maps to the outer
    /// endpoints.
    pub fn build_phasing_paths(&self, gr: &SpliceGraph) -> HyperSet {
        let mut hs = HyperSet::new();
        for rc in self.phase.iter().chain(self.children.iter().flat_map(|c| c.phase.iter())) {
            self.build_phasing_path(gr, &mut hs, rc);
        }
        hs
    }

    fn build_phasing_path(&self, gr: &SpliceGraph, hs: &mut HyperSet, rc: &PhaseCluster) {
        let Some(uu) = build_path_from_intron_coordinates(gr, &rc.chain) else {
            debug!(chain = ?rc.chain, "phase cluster does not resolve to a path");
            return;
        };

        for j in 0..rc.lefts.len() {
            let mut p1 = rc.lefts[j];
            let mut p2 = rc.rights[j];
            let w = rc.counts[j];
            debug_assert!(p1 >= 0 && p2 >= 0);

            if let Some(&q) = self.smap.get(&p1) {
                p1 = q;
            }
            if let Some(&q) = self.tmap.get(&p2) {
                p2 = q;
            }

            let (Some(&a), Some(&b)) = (gr.lindex.get(&p1), gr.rindex.get(&p2)) else {
                debug!(p1, p2, "phase endpoints lost from rebuilt graph");
                continue;
            };

            let vv: Vec<usize> = if uu.is_empty() {
                (a..=b).collect()
            } else {
                let mut vv: Vec<usize> = (a..uu[0]).collect();
                vv.extend_from_slice(&uu);
                vv.extend(uu[uu.len() - 1] + 1..=b);
                vv
            };
            hs.add_node_list(&vv, w);
        }
    }

    // ── reliability selectors ───────────────────────────────────────────────

    /// Positions where two touching regions are both sample- or
    /// weight-supported.
    pub fn get_reliable_adjacencies(&self, samples: i32, weight: f64) -> BTreeSet<GenomicPos> {
        let mut s = BTreeSet::new();
        if self.regions.len() <= 1 {
            return s;
        }
        for w in self.regions.windows(2) {
            let ((_, p1), d1) = w[0];
            let ((p2, _), d2) = w[1];
            if p1 != p2 {
                continue;
            }
            let supported = (d1.weight >= weight && d2.weight >= weight)
                || (d1.count >= samples && d2.count >= samples);
            if supported {
                s.insert(p1);
            }
        }
        s
    }

    /// Splice positions whose accumulated junction support passes either
    /// threshold.
    pub fn get_reliable_splices(&self, samples: i32, weight: f64) -> BTreeSet<GenomicPos> {
        let mut m: BTreeMap<GenomicPos, WeightCount> = BTreeMap::new();
        for &((p1, p2), wc) in &self.junctions {
            m.entry(p1).or_default().absorb(wc);
            m.entry(p2).or_default().absorb(wc);
        }
        m.into_iter()
            .filter(|(_, wc)| wc.weight >= weight || wc.count >= samples)
            .map(|(p, _)| p)
            .collect()
    }

    /// Junctions passing either threshold on their own support.
    pub fn get_reliable_junctions(&self, samples: i32, weight: f64) -> BTreeSet<Interval> {
        self.junctions
            .iter()
            .filter(|(_, wc)| wc.count >= samples || wc.weight >= weight)
            .map(|(p, _)| *p)
            .collect()
    }

    /// Start boundaries whose group (under `smap`) passes either threshold;
    /// returns the original positions of every supported group member.
    pub fn get_reliable_start_boundaries(
        &self,
        samples: i32,
        weight: f64,
    ) -> BTreeSet<GenomicPos> {
        let mut m: BTreeMap<GenomicPos, WeightCount> = BTreeMap::new();
        for &(p, wc) in &self.sbounds {
            let q = self.smap.get(&p).copied().unwrap_or(p);
            m.entry(q).or_default().absorb(wc);
        }
        let supported: BTreeSet<GenomicPos> = m
            .into_iter()
            .filter(|(_, wc)| wc.weight >= weight || wc.count >= samples)
            .map(|(p, _)| p)
            .collect();

        self.sbounds
            .iter()
            .map(|&(p, _)| p)
            .filter(|p| supported.contains(&self.smap.get(p).copied().unwrap_or(*p)))
            .collect()
    }

    /// End boundaries whose group (under `tmap`) passes either threshold.
    pub fn get_reliable_end_boundaries(
        &self,
        samples: i32,
        weight: f64,
    ) -> BTreeSet<GenomicPos> {
        let mut m: BTreeMap<GenomicPos, WeightCount> = BTreeMap::new();
        for &(p, wc) in &self.tbounds {
            let q = self.tmap.get(&p).copied().unwrap_or(p);
            m.entry(q).or_default().absorb(wc);
        }
        let supported: BTreeSet<GenomicPos> = m
            .into_iter()
            .filter(|(_, wc)| wc.weight >= weight || wc.count >= samples)
            .map(|(p, _)| p)
            .collect();

        self.tbounds
            .iter()
            .map(|&(p, _)| p)
            .filter(|p| supported.contains(&self.tmap.get(p).copied().unwrap_or(*p)))
            .collect()
    }

    // ── bounds ──────────────────────────────────────────────────────────────

    pub fn get_leftmost_bound(&self) -> Option<(GenomicPos, WeightCount)> {
        self.sbounds.iter().copied().min_by_key(|&(p, _)| p)
    }

    pub fn get_rightmost_bound(&self) -> Option<(GenomicPos, WeightCount)> {
        self.tbounds.iter().copied().max_by_key(|&(p, _)| p)
    }

    /// Log a one-line summary of the merged state.
    pub fn log_summary(&self, index: usize) {
        debug!(
            index,
            num_combined = self.num_combined,
            chrm = %self.chrm,
            strand = %self.strand,
            regions = self.regions.len(),
            sbounds = self.sbounds.len(),
            tbounds = self.tbounds.len(),
            junctions = self.junctions.len(),
            phase = self.phase.len(),
            "combined graph"
        );
    }
}
