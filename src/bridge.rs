//! Paired-end bridging: decide, per fragment, whether a path through the
//! splice graph can connect its two mates under a fragment-length window, and
//! construct that path.
//!
//! The solver runs five phases over a revised graph: locate the bridging
//! vertices of every fragment, collapse distinct (source, sink) pairs into
//! piers, nominate the top-K candidate paths per pier with a bottleneck DP,
//! trace the candidates back into vertex paths, and vote per fragment for the
//! first candidate that satisfies the length window.

use crate::chain::{
    build_intron_coordinates_from_path, get_total_intron_length, merge_intron_chains,
};
use crate::config::Config;
use crate::graph::SpliceGraph;
use crate::interval::check_increasing;
use crate::phase::PhaseSet;
use crate::types::{GenomicPos, HashMap, HashMapExt};
use tracing::debug;

/// Fill value for unused stack slots; effectively +∞ against edge weights.
pub const STACK_FILL: i32 = 999_999;

/// Score assigned to a bridge formed by directly merging overlapping mates.
pub const MATE_OVERLAP_SCORE: f64 = 10.0;

/// A cluster of paired-end fragments with identical mate structure.
///
/// The two mates cover `[bounds[0], bounds[1])` and `[bounds[2], bounds[3])`;
/// the gap `(bounds[1], bounds[2])` is what bridging must span.  `extend`
/// carries the outermost coordinates used when emitting phases.
#[derive(Debug, Clone, Default)]
pub struct PairedReadCluster {
    pub bounds: [GenomicPos; 4],
    pub extend: [GenomicPos; 4],
    pub chain1: Vec<GenomicPos>,
    pub chain2: Vec<GenomicPos>,
    pub count: i32,
}

/// How a fragment was (or was not) bridged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeKind {
    /// No candidate satisfied the length window (a normal outcome).
    Unbridged,
    /// The mates overlap on the same vertex; their chains merged directly.
    MateOverlap,
    /// A path through the graph connects the mates.
    GraphPath,
}

/// One candidate (or final) bridge for a fragment.
#[derive(Debug, Clone)]
pub struct BridgePath {
    pub kind: BridgeKind,
    pub score: f64,
    /// Vertex path from the left bridging vertex to the right one.
    pub path: Vec<usize>,
    /// Intron chain of `path` alone.
    pub chain: Vec<GenomicPos>,
    /// Full intron chain of the fragment: `chain1 ⊕ chain ⊕ chain2`.
    pub whole: Vec<GenomicPos>,
    /// Ascending bottleneck stack the path was ranked by.
    pub stack: Vec<i32>,
}

impl Default for BridgePath {
    fn default() -> Self {
        Self {
            kind: BridgeKind::Unbridged,
            score: 0.0,
            path: Vec::new(),
            chain: Vec::new(),
            whole: Vec::new(),
            stack: Vec::new(),
        }
    }
}

impl BridgePath {
    pub fn is_bridged(&self) -> bool {
        self.kind != BridgeKind::Unbridged
    }
}

/// A distinct (source, sink) vertex pair shared by one or more fragments,
/// with its ranked bridge candidates.
#[derive(Debug, Clone)]
pub struct Pier {
    pub bs: usize,
    pub bt: usize,
    pub bridges: Vec<BridgePath>,
}

#[derive(Debug, Clone)]
struct DpEntry {
    /// Ascending list of the smallest edge weights seen along the path,
    /// padded with [`STACK_FILL`].
    stack: Vec<i32>,
    /// Accumulated exonic length of the path.
    length: i32,
    /// Predecessor `(vertex, entry index)`; `None` at the source.
    trace: Option<(usize, usize)>,
}

/// Insert `w` into an ascending bottleneck stack, keeping the width fixed and
/// dropping the largest excess value.
#[doc(hidden)]
pub fn update_stack(stack: &[i32], w: i32) -> Vec<i32> {
    let pos = stack.partition_point(|&x| x <= w);
    let mut out = Vec::with_capacity(stack.len());
    out.extend_from_slice(&stack[..pos]);
    if pos < stack.len() {
        out.push(w);
        out.extend_from_slice(&stack[pos..stack.len() - 1]);
    }
    out
}

/// Ranking of DP entries: lexicographically larger stack first (maximising
/// the path's worst edge weights), shorter accumulated length on ties.
fn entry_order(x: &DpEntry, y: &DpEntry) -> std::cmp::Ordering {
    compare_stacks(&x.stack, &y.stack).then(x.length.cmp(&y.length))
}

/// Lexicographic bottleneck order: larger values first.
fn compare_stacks(x: &[i32], y: &[i32]) -> std::cmp::Ordering {
    for (a, b) in x.iter().zip(y.iter()) {
        if a != b {
            return b.cmp(a);
        }
    }
    std::cmp::Ordering::Equal
}

/// Bridge a batch of fragment clusters against a revised splice graph.
pub struct BridgeSolver<'a> {
    gr: &'a SpliceGraph,
    vc: &'a [PairedReadCluster],
    length_low: GenomicPos,
    length_high: GenomicPos,
    solution_size: usize,
    stack_size: usize,
    vpairs: Vec<(Option<usize>, Option<usize>)>,
    pub piers: Vec<Pier>,
    pindex: HashMap<(usize, usize), usize>,
    /// Best bridge per fragment, parallel to the input clusters.
    pub opt: Vec<BridgePath>,
}

impl<'a> BridgeSolver<'a> {
    /// Run all bridging phases for `vc` over `gr`, accepting fragments whose
    /// implied insert length falls in `[length_low, length_high]`.
    pub fn new(
        gr: &'a SpliceGraph,
        vc: &'a [PairedReadCluster],
        cfg: &Config,
        length_low: GenomicPos,
        length_high: GenomicPos,
    ) -> Self {
        let mut solver = Self {
            gr,
            vc,
            length_low,
            length_high,
            solution_size: cfg.bridge_dp_solution_size,
            stack_size: cfg.bridge_dp_stack_size,
            vpairs: Vec::new(),
            piers: Vec::new(),
            pindex: HashMap::new(),
            opt: Vec::new(),
        };
        solver.build_bridging_vertices();
        solver.build_piers();
        solver.nominate();
        solver.vote_all();
        solver
    }

    /// Phase 1: locate the vertex containing each mate's inner endpoint.
    fn build_bridging_vertices(&mut self) {
        self.vpairs = self
            .vc
            .iter()
            .map(|pc| {
                let v1 = self.gr.locate_vertex(pc.bounds[1] - 1);
                let v2 = self.gr.locate_vertex(pc.bounds[2]);
                (v1, v2)
            })
            .collect();
    }

    /// Phase 2: one pier per distinct located pair with `v1 < v2`.
    fn build_piers(&mut self) {
        self.piers.clear();
        let mut seen: HashMap<(usize, usize), ()> = HashMap::new();
        for &(v1, v2) in &self.vpairs {
            let (Some(a), Some(b)) = (v1, v2) else {
                continue;
            };
            if a >= b {
                continue;
            }
            if seen.insert((a, b), ()).is_some() {
                continue;
            }
            self.piers.push(Pier { bs: a, bt: b, bridges: Vec::new() });
        }
    }

    fn build_piers_index(&mut self) {
        self.pindex.clear();
        for (k, pr) in self.piers.iter().enumerate() {
            self.pindex.insert((pr.bs, pr.bt), k);
        }
    }

    /// Phase 3+4: for each group of piers sharing a source, run the DP once
    /// up to the farthest sink, then trace back candidates per pier.
    fn nominate(&mut self) {
        if self.piers.is_empty() {
            return;
        }
        self.piers.sort_by_key(|p| (p.bs, p.bt));

        let mut b1 = 0;
        while b1 < self.piers.len() {
            let mut b2 = b1;
            while b2 + 1 < self.piers.len() && self.piers[b2 + 1].bs == self.piers[b1].bs {
                b2 += 1;
            }
            let k1 = self.piers[b2].bs;
            let k2 = self.piers[b2].bt;

            let table = self.dynamic_programming(k1, k2);

            for b in b1..=b2 {
                let bt = self.piers[b].bt;
                let paths = trace_back(bt, &table);
                for (j, path) in paths.into_iter().enumerate() {
                    let entry = &table[bt][j];
                    let chain = build_intron_coordinates_from_path(self.gr, &path);
                    self.piers[b].bridges.push(BridgePath {
                        kind: BridgeKind::GraphPath,
                        score: entry.stack[0] as f64,
                        path,
                        chain,
                        whole: Vec::new(),
                        stack: entry.stack.clone(),
                    });
                }
                self.piers[b]
                    .bridges
                    .sort_by(|x, y| compare_stacks(&x.stack, &y.stack));
            }

            b1 = b2 + 1;
        }
    }

    /// Top-K bottleneck DP from `k1` over vertices `k1+1..=k2`.
    fn dynamic_programming(&self, k1: usize, k2: usize) -> Vec<Vec<DpEntry>> {
        let n = self.gr.num_vertices();
        debug_assert!(k1 < n && k2 < n);

        let mut table: Vec<Vec<DpEntry>> = vec![Vec::new(); n];
        let vi = self.gr.get_vertex_info(k1);
        table[k1].push(DpEntry {
            stack: vec![STACK_FILL; self.stack_size],
            length: vi.rpos - vi.lpos,
            trace: None,
        });

        for k in k1 + 1..=k2 {
            let vi = self.gr.get_vertex_info(k);
            let len = vi.rpos - vi.lpos;
            let mut v: Vec<DpEntry> = Vec::new();
            for e in self.gr.in_edges(k) {
                let j = self.gr.edge_source(e);
                if j < k1 || table[j].is_empty() {
                    continue;
                }
                let w = self.gr.get_edge_weight(e) as i32;
                for (i, prev) in table[j].iter().enumerate() {
                    v.push(DpEntry {
                        stack: update_stack(&prev.stack, w),
                        length: prev.length + len,
                        trace: Some((j, i)),
                    });
                }
            }
            v.sort_by(entry_order);
            v.truncate(self.solution_size);
            table[k] = v;
        }
        table
    }

    /// Phase 5: pick the best admissible bridge for every fragment.
    fn vote_all(&mut self) {
        self.build_piers_index();
        self.opt = (0..self.vc.len()).map(|r| self.vote(r)).collect();
    }

    fn vote(&self, r: usize) -> BridgePath {
        let mut bbp = BridgePath::default();
        let (Some(ss), Some(tt)) = self.vpairs[r] else {
            return bbp;
        };

        let pc = &self.vc[r];

        // candidate bridges, best first; `whole` is the full fragment chain
        let mut kind = BridgeKind::Unbridged;
        let mut candidates: Vec<BridgePath> = Vec::new();

        if ss >= tt {
            // mates meet on the same vertex (or in reverse order): their
            // chains must agree where they overlap
            let Some(whole) = merge_intron_chains(&pc.chain1, &pc.chain2) else {
                return bbp;
            };
            kind = BridgeKind::MateOverlap;
            candidates.push(BridgePath {
                kind,
                score: MATE_OVERLAP_SCORE,
                whole,
                ..BridgePath::default()
            });
        } else if let Some(&k) = self.pindex.get(&(ss, tt)) {
            kind = BridgeKind::GraphPath;
            if let (Some(&back), Some(&front)) = (pc.chain1.last(), pc.chain2.first()) {
                debug_assert!(back < front);
            }
            for pb in &self.piers[k].bridges {
                let mut cand = pb.clone();
                cand.whole = pc.chain1.clone();
                cand.whole.extend_from_slice(&pb.chain);
                cand.whole.extend_from_slice(&pc.chain2);
                candidates.push(cand);
            }
        }

        for cand in candidates {
            debug_assert!(check_increasing(&cand.whole));
            debug_assert!(check_increasing(&cand.chain));
            if let Some(&front) = cand.whole.first() {
                debug_assert!(front > pc.bounds[0]);
            }
            if let Some(&back) = cand.whole.last() {
                debug_assert!(back < pc.bounds[3]);
            }

            let intron = get_total_intron_length(&cand.whole);
            let length = pc.bounds[3] - pc.bounds[0] - intron;
            if length < self.length_low || length > self.length_high {
                continue;
            }
            bbp = cand;
            bbp.kind = kind;
            break;
        }

        bbp
    }

    /// Clone out the clusters that stayed unbridged.
    pub fn collect_unbridged_clusters(&self) -> Vec<PairedReadCluster> {
        self.opt
            .iter()
            .zip(self.vc.iter())
            .filter(|(bp, _)| !bp.is_bridged())
            .map(|(_, pc)| pc.clone())
            .collect()
    }

    /// Emit phases: one full chain per bridged fragment, two half chains per
    /// unbridged one.
    pub fn build_phase_set(&self, ps: &mut PhaseSet) {
        debug_assert_eq!(self.opt.len(), self.vc.len());
        for (pc, bp) in self.vc.iter().zip(self.opt.iter()) {
            if bp.is_bridged() {
                add_phases_from_bridged_cluster(pc, bp, ps);
            } else {
                add_phases_from_unbridged_cluster(pc, ps);
            }
        }
    }

    /// Log how much of the batch was bridged.
    pub fn log_summary(&self) {
        let mut total_reads = 0;
        let mut bridged_reads = 0;
        let mut bridged_clusters = 0;
        for (pc, bp) in self.vc.iter().zip(self.opt.iter()) {
            total_reads += pc.count;
            if bp.is_bridged() {
                bridged_reads += pc.count;
                bridged_clusters += 1;
            }
        }
        debug!(
            clusters = self.vc.len(),
            bridged_clusters,
            total_reads,
            bridged_reads,
            low = self.length_low,
            high = self.length_high,
            "bridging complete"
        );
    }
}

fn trace_back(k: usize, table: &[Vec<DpEntry>]) -> Vec<Vec<usize>> {
    let mut vv = Vec::with_capacity(table[k].len());
    for i in 0..table[k].len() {
        let mut v = Vec::new();
        let (mut p, mut q) = (k, i);
        loop {
            v.push(p);
            match table[p][q].trace {
                Some((tp, tq)) => {
                    p = tp;
                    q = tq;
                }
                None => break,
            }
        }
        v.reverse();
        vv.push(v);
    }
    vv
}

/// Phase of a bridged fragment: the whole chain flanked by the extend bounds.
pub fn add_phases_from_bridged_cluster(
    pc: &PairedReadCluster,
    bp: &BridgePath,
    ps: &mut PhaseSet,
) {
    debug_assert!(bp.is_bridged());
    let mut v = Vec::with_capacity(bp.whole.len() + 2);
    v.push(pc.extend[0]);
    v.extend_from_slice(&bp.whole);
    v.push(pc.extend[3]);
    debug_assert!(check_increasing(&v));
    ps.add(v, pc.count);
}

/// Phases of an unbridged fragment: each mate contributes its own chain.
pub fn add_phases_from_unbridged_cluster(pc: &PairedReadCluster, ps: &mut PhaseSet) {
    let mut v1 = Vec::with_capacity(pc.chain1.len() + 2);
    v1.push(pc.extend[0]);
    v1.extend_from_slice(&pc.chain1);
    v1.push(pc.extend[1]);
    debug_assert!(check_increasing(&v1));
    ps.add(v1, pc.count);

    let mut v2 = Vec::with_capacity(pc.chain2.len() + 2);
    v2.push(pc.extend[2]);
    v2.extend_from_slice(&pc.chain2);
    v2.push(pc.extend[3]);
    debug_assert!(check_increasing(&v2));
    ps.add(v2, pc.count);
}
