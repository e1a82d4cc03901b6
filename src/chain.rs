//! Translations between genomic coordinate chains and splice-graph vertex
//! paths.
//!
//! Two chain encodings appear throughout the engine:
//!
//! - an *intron chain* `[p0, q0, p1, q1, …]`, strictly increasing and of even
//!   length, where each `(p, q)` is a half-open intron;
//! - an *exon chain* `[l0, r0, l1, r1, …]` of exon boundaries, where the
//!   markers [`OPEN_LEFT`] / [`OPEN_RIGHT`] stand for a path that starts at the
//!   source sentinel or ends at the sink sentinel.
//!
//! Index misses and discontinuities are data errors: the builders return
//! `None` and the caller drops the offending record.

use crate::graph::SpliceGraph;
use crate::interval::merge_consistent;
use crate::types::GenomicPos;

/// Exon-chain marker for a path entering through the source sentinel.
pub const OPEN_LEFT: GenomicPos = -1;
/// Exon-chain marker for a path leaving through the sink sentinel.
pub const OPEN_RIGHT: GenomicPos = -2;

/// Total genomic length covered by the introns of a chain.
pub fn get_total_intron_length(chain: &[GenomicPos]) -> GenomicPos {
    assert!(chain.len() % 2 == 0, "intron chain must have even length");
    chain
        .chunks_exact(2)
        .map(|c| {
            assert!(c[0] < c[1], "intron ({}, {}) is not forward", c[0], c[1]);
            c[1] - c[0]
        })
        .sum()
}

/// Project a vertex path onto exon-boundary coordinates.
///
/// Consecutive vertices that touch (`rpos == next.lpos`) fold into a single
/// exon.  A leading source sentinel contributes two [`OPEN_LEFT`] markers, a
/// trailing sink sentinel two [`OPEN_RIGHT`] markers.
pub fn build_exon_coordinates_from_path(gr: &SpliceGraph, path: &[usize]) -> Vec<GenomicPos> {
    let mut vv = Vec::new();
    if path.is_empty() {
        return vv;
    }

    let n = gr.num_vertices() - 1;
    let mut pre: GenomicPos = GenomicPos::MIN;

    if path[0] == 0 {
        vv.push(OPEN_LEFT);
        vv.push(OPEN_LEFT);
    }

    for &p in path {
        if p == 0 || p == n {
            continue;
        }
        let vi = gr.get_vertex_info(p);
        if vi.lpos == pre {
            pre = vi.rpos;
            continue;
        }
        if pre >= 0 {
            vv.push(pre);
        }
        vv.push(vi.lpos);
        pre = vi.rpos;
    }

    if pre >= 0 {
        vv.push(pre);
    }
    if *path.last().unwrap() == n {
        vv.push(OPEN_RIGHT);
        vv.push(OPEN_RIGHT);
    }
    vv
}

/// Project a vertex path onto its intron chain: one `(rpos, next.lpos)` pair
/// per consecutive vertex pair with a positive gap.
pub fn build_intron_coordinates_from_path(gr: &SpliceGraph, path: &[usize]) -> Vec<GenomicPos> {
    let mut vv = Vec::new();
    for w in path.windows(2) {
        let pp = gr.get_vertex_info(w[0]).rpos;
        let qq = gr.get_vertex_info(w[1]).lpos;
        debug_assert!(pp <= qq);
        if pp < qq {
            vv.push(pp);
            vv.push(qq);
        }
    }
    vv
}

/// Rebuild a vertex path from an intron chain.
///
/// Each intron `(p, q)` anchors `rindex[p]` and `lindex[q]`; consecutive
/// anchors must be connected by unit adjacencies.  `None` when a position is
/// missing from the index or the adjacency chain is broken.
pub fn build_path_from_intron_coordinates(
    gr: &SpliceGraph,
    chain: &[GenomicPos],
) -> Option<Vec<usize>> {
    assert!(chain.len() % 2 == 0, "intron chain must have even length");
    let mut vv = Vec::new();
    if chain.is_empty() {
        return Some(vv);
    }

    let mut anchors = Vec::with_capacity(chain.len() / 2);
    for c in chain.chunks_exact(2) {
        debug_assert!(c[0] >= 0 && c[1] >= 0 && c[0] <= c[1]);
        let kp = *gr.rindex.get(&c[0])?;
        let kq = *gr.lindex.get(&c[1])?;
        anchors.push((kp, kq));
    }

    vv.push(anchors[0].0);
    for k in 0..anchors.len() - 1 {
        let a = anchors[k].1;
        let b = anchors[k + 1].0;
        debug_assert!(a <= b);
        if !check_continuous_vertices(gr, a, b) {
            return None;
        }
        vv.extend(a..=b);
    }
    vv.push(anchors.last().unwrap().1);
    Some(vv)
}

/// Rebuild a vertex path from an exon chain of real coordinates.
pub fn build_path_from_exon_coordinates(
    gr: &SpliceGraph,
    chain: &[GenomicPos],
) -> Option<Vec<usize>> {
    assert!(chain.len() % 2 == 0, "exon chain must have even length");
    let mut vv = Vec::new();
    if chain.is_empty() {
        return Some(vv);
    }

    let mut spans = Vec::with_capacity(chain.len() / 2);
    for c in chain.chunks_exact(2) {
        debug_assert!(c[0] >= 0 && c[1] >= 0 && c[0] <= c[1]);
        let kp = *gr.lindex.get(&c[0])?;
        let kq = *gr.rindex.get(&c[1])?;
        spans.push((kp, kq));
    }

    for &(a, b) in &spans {
        if a > b {
            return None;
        }
        if !check_continuous_vertices(gr, a, b) {
            return None;
        }
        vv.extend(a..=b);
    }

    debug_assert!(vv.windows(2).all(|w| w[0] < w[1]));
    Some(vv)
}

/// Rebuild a vertex path from mixed coordinates: the outer pair are exon
/// endpoints (located by containment), the middle an intron chain.
pub fn build_path_from_mixed_coordinates(
    gr: &SpliceGraph,
    chain: &[GenomicPos],
) -> Option<Vec<usize>> {
    assert!(chain.len() % 2 == 0, "mixed chain must have even length");
    if chain.is_empty() {
        return Some(Vec::new());
    }

    let u1 = gr.locate_vertex(chain[0])?;
    let u2 = gr.locate_vertex(chain[chain.len() - 1] - 1)?;

    if chain.len() == 2 {
        return Some((u1..=u2).collect());
    }

    let uu = build_path_from_intron_coordinates(gr, &chain[1..chain.len() - 1])?;

    let mut vv: Vec<usize> = (u1..uu[0]).collect();
    vv.extend_from_slice(&uu);
    vv.extend(uu.last().unwrap() + 1..=u2);
    Some(vv)
}

/// Merge the intron chains of two mates into one chain.
///
/// Fails (`None`) when the chains are inconsistent: the left chain must not
/// start after the right one, their shared region must match exactly, and the
/// shared element count must be even so whole introns are shared.
pub fn merge_intron_chains(x: &[GenomicPos], y: &[GenomicPos]) -> Option<Vec<GenomicPos>> {
    if !x.is_empty() && !y.is_empty() && x[0] > y[0] {
        return None;
    }
    let (merged, shared) = merge_consistent(x, y)?;
    if shared % 2 != 0 {
        return None;
    }
    Some(merged)
}

/// `true` when the two chains can be merged by [`merge_intron_chains`].
pub fn consistent_intron_chains(x: &[GenomicPos], y: &[GenomicPos]) -> bool {
    merge_intron_chains(x, y).is_some()
}

/// Check that `x..=y` is a run of unit adjacencies: each consecutive pair is
/// connected by an edge and touches in genomic coordinates.
pub fn check_continuous_vertices(gr: &SpliceGraph, x: usize, y: usize) -> bool {
    if x >= y {
        return true;
    }
    for i in x..y {
        if gr.edge(i, i + 1).is_none() {
            return false;
        }
        if gr.get_vertex_info(i).rpos != gr.get_vertex_info(i + 1).lpos {
            return false;
        }
    }
    true
}

/// Check that consecutive path vertices are in range and connected.
pub fn check_valid_path(gr: &SpliceGraph, path: &[usize]) -> bool {
    let n = gr.num_vertices() - 1;
    for w in path.windows(2) {
        if w[0] > n || w[1] > n {
            return false;
        }
        if gr.edge(w[0], w[1]).is_none() {
            return false;
        }
    }
    true
}
