//! Iterative cleanup of a noisy splice graph.
//!
//! [`revise_full`] applies the operators below in fixed priority until a full
//! pass changes nothing, re-refining after the operators that can leave
//! half-connected vertices behind.  Every operator preserves the sentinels and
//! the forward-edge (DAG) property.  `extend_boundaries` rewires one edge per
//! pass; the other operators batch their removals.

use crate::chain::check_continuous_vertices;
use crate::config::Config;
use crate::graph::{EdgeInfo, SpliceGraph};
use crate::types::GenomicPos;
use anyhow::{Result, anyhow};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Run the full revision cascade to a fixed point, then refine.
pub fn revise_full(gr: &mut SpliceGraph, cfg: &Config) -> Result<()> {
    refine_splice_graph(gr);

    loop {
        if extend_boundaries(gr) {
            continue;
        }
        if remove_inner_boundaries(gr) {
            continue;
        }
        if remove_small_exons(gr, cfg.min_exon_length) {
            refine_splice_graph(gr);
            continue;
        }
        if remove_small_junctions(gr) {
            refine_splice_graph(gr);
            continue;
        }
        if keep_surviving_edges(gr, cfg.min_surviving_edge_weight)? {
            refine_splice_graph(gr);
            continue;
        }
        if remove_intron_contamination(gr, cfg.max_intron_contamination_coverage) {
            continue;
        }
        break;
    }

    refine_splice_graph(gr);
    Ok(())
}

/// Run only the surviving-edge filter to a fixed point, then refine.
pub fn revise(gr: &mut SpliceGraph, cfg: &Config) -> Result<()> {
    refine_splice_graph(gr);
    while keep_surviving_edges(gr, cfg.min_surviving_edge_weight)? {
        refine_splice_graph(gr);
    }
    refine_splice_graph(gr);
    Ok(())
}

/// Clear every internal vertex that has edges on only one side, repeating
/// until stable.
pub fn refine_splice_graph(gr: &mut SpliceGraph) {
    loop {
        let mut changed = false;
        for i in 1..gr.num_vertices() - 1 {
            if gr.degree(i) == 0 {
                continue;
            }
            if gr.in_degree(i) >= 1 && gr.out_degree(i) >= 1 {
                continue;
            }
            gr.clear_vertex(i);
            changed = true;
        }
        if !changed {
            break;
        }
    }
}

/// Turn a lone high-coverage vertex followed (or preceded) by a thin
/// gap-crossing edge into a terminal: redirect it to the sink (or from the
/// source) and drop the crossing edge.  Rewires at most one edge per call.
pub fn extend_boundaries(gr: &mut SpliceGraph) -> bool {
    let n = gr.num_vertices() - 1;
    let edges: Vec<usize> = gr.edges().collect();
    for e in edges {
        let (s, t) = gr.edge_endpoints(e);
        if s == 0 || t == n {
            continue;
        }
        let gap = gr.get_vertex_info(t).lpos - gr.get_vertex_info(s).rpos;
        if gap <= 0 {
            continue;
        }
        let we = gr.get_edge_weight(e);
        let ws = gr.get_vertex_weight(s);
        let wt = gr.get_vertex_weight(t);

        let cut = (gr.out_degree(s) == 1 && ws >= 10.0 * we * we + 10.0)
            || (gr.in_degree(t) == 1 && wt >= 10.0 * we * we + 10.0);
        if !cut {
            continue;
        }

        if gr.out_degree(s) == 1 {
            let ee = gr.add_edge(s, n);
            gr.set_edge_weight(ee, ws);
            gr.set_edge_info(ee, EdgeInfo::default());
        }
        if gr.in_degree(t) == 1 {
            let ee = gr.add_edge(0, t);
            gr.set_edge_weight(ee, wt);
            gr.set_edge_info(ee, EdgeInfo::default());
        }
        debug!(s, t, weight = we, "extend boundary across gap edge");
        gr.remove_edge(e);
        return true;
    }
    false
}

/// Remove transit vertices that only connect a sentinel to the interior and
/// show no coverage variation (`stddev < 0.01`).
pub fn remove_inner_boundaries(gr: &mut SpliceGraph) -> bool {
    let n = gr.num_vertices() - 1;
    let mut changed = false;
    for i in 1..n {
        if gr.in_degree(i) != 1 || gr.out_degree(i) != 1 {
            continue;
        }
        let e1 = gr.in_edges(i).next().unwrap();
        let e2 = gr.out_edges(i).next().unwrap();
        let s = gr.edge_source(e1);
        let t = gr.edge_target(e2);

        if s != 0 && t != n {
            continue;
        }
        if s != 0 && gr.out_degree(s) == 1 {
            continue;
        }
        if t != n && gr.in_degree(t) == 1 {
            continue;
        }
        let vi = gr.get_vertex_info(i);
        if vi.stddev >= 0.01 {
            continue;
        }

        debug!(
            vertex = i,
            weight = gr.get_vertex_weight(i),
            lpos = vi.lpos,
            rpos = vi.rpos,
            "remove inner boundary"
        );
        gr.clear_vertex(i);
        changed = true;
    }
    changed
}

/// Clear short boundary exons with no position-adjacent neighbour on either
/// side.  Only vertices touching a sentinel qualify.
pub fn remove_small_exons(gr: &mut SpliceGraph, min_exon: i32) -> bool {
    let n = gr.num_vertices() - 1;
    let mut changed = false;
    for i in 1..n {
        let vi = gr.get_vertex_info(i);
        if vi.rpos - vi.lpos >= min_exon {
            continue;
        }
        if gr.degree(i) == 0 {
            continue;
        }

        let left_adjacent = gr.in_edges(i).any(|e| {
            let s = gr.edge_source(e);
            s != 0 && gr.get_vertex_info(s).rpos == vi.lpos
        });
        let right_adjacent = gr.out_edges(i).any(|e| {
            let t = gr.edge_target(e);
            t != n && gr.get_vertex_info(t).lpos == vi.rpos
        });
        if left_adjacent || right_adjacent {
            continue;
        }

        // only boundary small exons are candidates
        if gr.edge(0, i).is_none() && gr.edge(i, n).is_none() {
            continue;
        }

        debug!(vertex = i, length = vi.rpos - vi.lpos, "remove small exon");
        gr.clear_vertex(i);
        changed = true;
    }
    changed
}

/// Remove crossing junctions that are dwarfed both by the vertex they attach
/// to and by its strongest position-adjacent neighbour.
pub fn remove_small_junctions(gr: &mut SpliceGraph) -> bool {
    let n = gr.num_vertices() - 1;
    let mut doomed: BTreeSet<usize> = BTreeSet::new();

    for i in 1..n {
        if gr.degree(i) == 0 {
            continue;
        }
        let vi = gr.get_vertex_info(i);
        let (p1, p2) = (vi.lpos, vi.rpos);
        let wi = gr.get_vertex_weight(i);

        // strongest adjacent predecessor
        let mut ws = 0.0f64;
        for e in gr.in_edges(i) {
            let s = gr.edge_source(e);
            if s == 0 || gr.get_vertex_info(s).rpos != p1 {
                continue;
            }
            ws = ws.max(gr.get_vertex_weight(s));
        }
        for e in gr.in_edges(i) {
            let s = gr.edge_source(e);
            if s == 0 || gr.get_vertex_info(s).rpos == p1 {
                continue;
            }
            let w = gr.get_edge_weight(e);
            if ws >= 2.0 * w * w + 18.0 && wi >= 2.0 * w * w + 18.0 {
                doomed.insert(e);
            }
        }

        // strongest adjacent successor
        let mut wt = 0.0f64;
        for e in gr.out_edges(i) {
            let t = gr.edge_target(e);
            if t == n || gr.get_vertex_info(t).lpos != p2 {
                continue;
            }
            wt = wt.max(gr.get_vertex_weight(t));
        }
        for e in gr.out_edges(i) {
            let t = gr.edge_target(e);
            if t == n || gr.get_vertex_info(t).lpos == p2 {
                continue;
            }
            let w = gr.get_edge_weight(e);
            if wt >= 2.0 * w * w + 18.0 && wi >= 2.0 * w * w + 18.0 {
                doomed.insert(e);
            }
        }
    }

    if doomed.is_empty() {
        return false;
    }
    for e in doomed {
        let (s, t) = gr.edge_endpoints(e);
        debug!(s, t, weight = gr.get_edge_weight(e), "remove small junction");
        gr.remove_edge(e);
    }
    true
}

/// Clear retained-intron vertices: a degree-(1,1) vertex filling exactly the
/// gap between touching neighbours that are themselves joined by a junction at
/// least as heavy, when its own coverage is below `ratio`.
pub fn remove_intron_contamination(gr: &mut SpliceGraph, ratio: f64) -> bool {
    let n = gr.num_vertices() - 1;
    let mut changed = false;
    for i in 1..n {
        if gr.in_degree(i) != 1 || gr.out_degree(i) != 1 {
            continue;
        }
        let e1 = gr.in_edges(i).next().unwrap();
        let e2 = gr.out_edges(i).next().unwrap();
        let s = gr.edge_source(e1);
        let t = gr.edge_target(e2);
        if s == 0 || t == n {
            continue;
        }
        let vi = gr.get_vertex_info(i);
        if gr.get_vertex_info(s).rpos != vi.lpos {
            continue;
        }
        if gr.get_vertex_info(t).lpos != vi.rpos {
            continue;
        }
        let Some(ee) = gr.edge(s, t) else {
            continue;
        };
        let wv = gr.get_vertex_weight(i);
        if wv > gr.get_edge_weight(ee) {
            continue;
        }
        if wv > ratio {
            continue;
        }

        debug!(vertex = i, weight = wv, "clear intron contamination");
        gr.clear_vertex(i);
        changed = true;
    }
    changed
}

// ── surviving edges ─────────────────────────────────────────────────────────

/// Keep only edges that are heavy enough, belong to the maximal cover, or are
/// pulled in to keep every retained vertex connected on both sides; remove the
/// rest.  Returns whether anything was removed.
pub fn keep_surviving_edges(gr: &mut SpliceGraph, surviving: f64) -> Result<bool> {
    let n = gr.num_vertices() - 1;
    let mut se: BTreeSet<usize> = BTreeSet::new();
    let mut covered_in: BTreeSet<usize> = BTreeSet::new(); // vertices with a surviving in-edge
    let mut covered_out: BTreeSet<usize> = BTreeSet::new(); // vertices with a surviving out-edge

    for e in gr.edges() {
        if gr.get_edge_weight(e) < surviving {
            continue;
        }
        let (s, t) = gr.edge_endpoints(e);
        se.insert(e);
        covered_in.insert(t);
        covered_out.insert(s);
    }

    for e in compute_maximal_edges(gr) {
        let (s, t) = gr.edge_endpoints(e);
        se.insert(e);
        covered_in.insert(t);
        covered_out.insert(s);
    }

    // Grow the surviving set until every incident vertex has a surviving edge
    // on each required side.  The set only grows, so this terminates.
    loop {
        let mut grown = false;
        for e in se.clone() {
            let (s, t) = gr.edge_endpoints(e);
            if !covered_in.contains(&s) && s != 0 {
                let ee = gr
                    .max_in_edge(s)
                    .ok_or_else(|| anyhow!("vertex {s} has no incoming edge to survive"))?;
                se.insert(ee);
                covered_in.insert(s);
                covered_out.insert(gr.edge_source(ee));
                grown = true;
            }
            if !covered_out.contains(&t) && t != n {
                let ee = gr
                    .max_out_edge(t)
                    .ok_or_else(|| anyhow!("vertex {t} has no outgoing edge to survive"))?;
                se.insert(ee);
                covered_in.insert(gr.edge_target(ee));
                covered_out.insert(t);
                grown = true;
            }
            if grown {
                break;
            }
        }
        if !grown {
            break;
        }
    }

    let doomed: Vec<usize> = gr.edges().filter(|e| !se.contains(e)).collect();
    for &e in &doomed {
        let (s, t) = gr.edge_endpoints(e);
        debug!(s, t, weight = gr.get_edge_weight(e), "remove non-surviving edge");
        gr.remove_edge(e);
    }
    Ok(!doomed.is_empty())
}

/// One heaviest edge per connected component of the undirected projection
/// (sentinel-incident edges excluded), restricted to weight >= 1.5.  Ensures
/// every non-trivial component keeps at least one edge through revision.
pub fn compute_maximal_edges(gr: &SpliceGraph) -> Vec<usize> {
    let n = gr.num_vertices() - 1;
    let mut dsu = DisjointSet::new(gr.num_vertices());
    let mut ve: Vec<(f64, usize)> = Vec::new();
    for e in gr.edges() {
        let (s, t) = gr.edge_endpoints(e);
        if s == 0 || t == n {
            continue;
        }
        dsu.union(s, t);
        ve.push((gr.get_edge_weight(e), e));
    }

    ve.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut picked = Vec::new();
    let mut seen: BTreeSet<usize> = BTreeSet::new();
    for &(w, e) in ve.iter().rev() {
        if w < 1.5 {
            break;
        }
        let (s, t) = gr.edge_endpoints(e);
        let c = dsu.find(s);
        debug_assert_eq!(c, dsu.find(t));
        if seen.contains(&c) {
            continue;
        }
        picked.push(e);
        seen.insert(c);
    }
    picked
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut r = x;
        while self.parent[r] != r {
            r = self.parent[r];
        }
        let mut c = x;
        while self.parent[c] != r {
            let next = self.parent[c];
            self.parent[c] = r;
            c = next;
        }
        r
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

// ── boundary & junction filters ─────────────────────────────────────────────

/// Drop low-weight start boundaries whose position is not whitelisted, then
/// refine.
pub fn filter_start_boundaries(
    gr: &mut SpliceGraph,
    whitelist: &BTreeSet<GenomicPos>,
    surviving: f64,
) {
    let z = gr.get_vertex_info(0).lpos;
    debug_assert_eq!(z, gr.get_vertex_info(0).rpos);
    let doomed: Vec<usize> = gr
        .out_edges(0)
        .filter(|&e| {
            if gr.get_edge_weight(e) >= surviving {
                return false;
            }
            let p = gr.get_vertex_info(gr.edge_target(e)).lpos;
            p != z && !whitelist.contains(&p)
        })
        .collect();
    for e in doomed {
        debug!(
            target = gr.edge_target(e),
            weight = gr.get_edge_weight(e),
            "remove non-surviving start boundary"
        );
        gr.remove_edge(e);
    }
    refine_splice_graph(gr);
}

/// Drop low-weight end boundaries whose position is not whitelisted, then
/// refine.
pub fn filter_end_boundaries(
    gr: &mut SpliceGraph,
    whitelist: &BTreeSet<GenomicPos>,
    surviving: f64,
) {
    let n = gr.num_vertices() - 1;
    let z = gr.get_vertex_info(n).lpos;
    debug_assert_eq!(z, gr.get_vertex_info(n).rpos);
    let doomed: Vec<usize> = gr
        .in_edges(n)
        .filter(|&e| {
            if gr.get_edge_weight(e) >= surviving {
                return false;
            }
            let p = gr.get_vertex_info(gr.edge_source(e)).rpos;
            p != z && !whitelist.contains(&p)
        })
        .collect();
    for e in doomed {
        debug!(
            source = gr.edge_source(e),
            weight = gr.get_edge_weight(e),
            "remove non-surviving end boundary"
        );
        gr.remove_edge(e);
    }
    refine_splice_graph(gr);
}

/// Drop low-weight gap-crossing junctions unless both splice positions are
/// whitelisted, then refine.
pub fn filter_junctions(
    gr: &mut SpliceGraph,
    whitelist: &BTreeSet<GenomicPos>,
    surviving: f64,
) {
    let n = gr.num_vertices() - 1;
    let doomed: Vec<usize> = gr
        .edges()
        .filter(|&e| {
            let (s, t) = gr.edge_endpoints(e);
            if s == 0 || t == n {
                return false;
            }
            let p1 = gr.get_vertex_info(s).rpos;
            let p2 = gr.get_vertex_info(t).lpos;
            if p1 >= p2 {
                return false;
            }
            if gr.get_edge_weight(e) >= surviving {
                return false;
            }
            !(whitelist.contains(&p1) && whitelist.contains(&p2))
        })
        .collect();
    for e in doomed {
        let (s, t) = gr.edge_endpoints(e);
        debug!(s, t, weight = gr.get_edge_weight(e), "remove non-surviving junction");
        gr.remove_edge(e);
    }
    refine_splice_graph(gr);
}

// ── boundary grouping ───────────────────────────────────────────────────────

/// Fold nearby start boundaries into a group leader.
///
/// Sentinel successors are swept in vertex order; a successor joins the
/// current group when it is reachable from the group's far vertex through unit
/// adjacencies and its `lpos` stays within `max_group_boundary_distance` of
/// the previous member.  Folding records a position→position entry, pours the
/// folded edge's weight and count into the leader edge and every vertex/edge
/// along the adjacency chain, and removes the redundant sentinel edge.
pub fn group_start_boundaries(
    gr: &mut SpliceGraph,
    max_group_boundary_distance: i32,
) -> BTreeMap<GenomicPos, GenomicPos> {
    let mut smap = BTreeMap::new();
    let mut v: Vec<usize> = gr.out_edges(0).map(|e| gr.edge_target(e)).collect();
    if v.len() <= 1 {
        return smap;
    }
    v.sort_unstable();

    let mut p1 = gr.get_vertex_info(v[0]).lpos;
    let mut p2 = p1;
    let mut k1 = v[0];
    let mut k2 = k1;
    let mut pa = gr.edge(0, v[0]).expect("sentinel edge disappeared");
    let mut wa = gr.get_edge_weight(pa);
    let mut ea = gr.get_edge_info(pa);

    for &vi in &v[1..] {
        let p = gr.get_vertex_info(vi).lpos;
        let pb = gr.edge(0, vi).expect("sentinel edge disappeared");
        let wb = gr.get_edge_weight(pb);
        let eb = gr.get_edge_info(pb);

        debug_assert!(p >= p2);
        let joined =
            p - p2 <= max_group_boundary_distance && check_continuous_vertices(gr, k2, vi);

        if !joined {
            p1 = p;
            p2 = p;
            k1 = vi;
            k2 = vi;
            pa = pb;
            wa = wb;
            ea = eb;
        } else {
            smap.insert(p, p1);
            for j in k1..vi {
                let pc = gr.edge(j, j + 1).expect("adjacency chain broken inside group");
                let vc = gr.get_vertex_weight(j);
                let wc = gr.get_edge_weight(pc);
                gr.set_vertex_weight(j, vc + wb);
                let mut ec = gr.get_edge_info(pc);
                ec.count += eb.count;
                ec.weight += eb.weight;
                gr.set_edge_weight(pc, wc + wb);
                gr.set_edge_info(pc, ec);
            }
            wa += wb;
            ea.count += eb.count;
            ea.weight += eb.weight;
            gr.set_edge_weight(pa, wa);
            gr.set_edge_info(pa, ea);
            gr.remove_edge(pb);

            k2 = vi;
            p2 = p;

            debug!(from = p, to = p1, weight = wb, "group start boundary");
        }
    }
    smap
}

/// Fold nearby end boundaries into a group leader; mirror image of
/// [`group_start_boundaries`], sweeping sentinel predecessors in descending
/// vertex order.
pub fn group_end_boundaries(
    gr: &mut SpliceGraph,
    max_group_boundary_distance: i32,
) -> BTreeMap<GenomicPos, GenomicPos> {
    let mut tmap = BTreeMap::new();
    let n = gr.num_vertices() - 1;
    let mut v: Vec<usize> = gr.in_edges(n).map(|e| gr.edge_source(e)).collect();
    if v.len() <= 1 {
        return tmap;
    }
    v.sort_unstable_by(|a, b| b.cmp(a));

    let mut p1 = gr.get_vertex_info(v[0]).rpos;
    let mut p2 = p1;
    let mut k1 = v[0];
    let mut k2 = k1;
    let mut pa = gr.edge(v[0], n).expect("sentinel edge disappeared");
    let mut wa = gr.get_edge_weight(pa);
    let mut ea = gr.get_edge_info(pa);

    for &vi in &v[1..] {
        let p = gr.get_vertex_info(vi).rpos;
        let pb = gr.edge(vi, n).expect("sentinel edge disappeared");
        let wb = gr.get_edge_weight(pb);
        let eb = gr.get_edge_info(pb);

        debug_assert!(p <= p2);
        let joined =
            p2 - p <= max_group_boundary_distance && check_continuous_vertices(gr, vi, k2);

        if !joined {
            p1 = p;
            p2 = p;
            k1 = vi;
            k2 = vi;
            pa = pb;
            wa = wb;
            ea = eb;
        } else {
            tmap.insert(p, p1);
            for j in vi..k1 {
                let pc = gr.edge(j, j + 1).expect("adjacency chain broken inside group");
                let wc = gr.get_edge_weight(pc);
                let vc = gr.get_vertex_weight(j + 1);
                gr.set_vertex_weight(j + 1, vc + wb);
                let mut ec = gr.get_edge_info(pc);
                ec.count += eb.count;
                ec.weight += eb.weight;
                gr.set_edge_weight(pc, wc + wb);
                gr.set_edge_info(pc, ec);
            }
            wa += wb;
            ea.count += eb.count;
            ea.weight += eb.weight;
            gr.set_edge_weight(pa, wa);
            gr.set_edge_info(pa, ea);
            gr.remove_edge(pb);

            k2 = vi;
            p2 = p;

            debug!(from = p, to = p1, weight = wb, "group end boundary");
        }
    }
    tmap
}
