//! Graph-revision tests: the cleanup operators, boundary grouping, the
//! surviving-edge cover, and fixed-point idempotence.

use splicebridge::revise::{
    extend_boundaries, filter_end_boundaries, filter_junctions, filter_start_boundaries,
    group_end_boundaries, group_start_boundaries, keep_surviving_edges,
    refine_splice_graph, remove_inner_boundaries, remove_intron_contamination,
    remove_small_exons, remove_small_junctions, revise_full,
};
use splicebridge::{Config, SpliceGraph, VertexInfo};
use std::collections::BTreeSet;

/// Graph with sentinels around `intervals`; edges added separately.
fn graph_with(intervals: &[(i32, i32)]) -> SpliceGraph {
    let mut gr = SpliceGraph::new("chr1", '+');
    let lpos = intervals[0].0;
    let rpos = intervals[intervals.len() - 1].1;
    gr.add_vertex();
    gr.set_vertex_info(0, VertexInfo::new(lpos, lpos));
    for &(l, r) in intervals {
        let v = gr.add_vertex();
        gr.set_vertex_info(v, VertexInfo::new(l, r));
    }
    let sink = gr.add_vertex();
    gr.set_vertex_info(sink, VertexInfo::new(rpos, rpos));
    gr
}

fn add_edge(gr: &mut SpliceGraph, s: usize, t: usize, w: f64) -> usize {
    let e = gr.add_edge(s, t);
    gr.set_edge_weight(e, w);
    e
}

/// Live edges as comparable `(s, t, weight)` triples.
fn edge_set(gr: &SpliceGraph) -> Vec<(usize, usize, i64)> {
    let mut v: Vec<_> = gr
        .edges()
        .map(|e| {
            let (s, t) = gr.edge_endpoints(e);
            (s, t, (gr.get_edge_weight(e) * 1000.0).round() as i64)
        })
        .collect();
    v.sort_unstable();
    v
}

#[test]
fn refine_clears_half_connected_vertices() {
    // vertex 2 has an in-edge but no out-edge; clearing it strands vertex 1
    let mut gr = graph_with(&[(100, 200), (300, 400)]);
    add_edge(&mut gr, 0, 1, 1.0);
    add_edge(&mut gr, 1, 2, 1.0);

    refine_splice_graph(&mut gr);
    assert_eq!(gr.degree(1), 0);
    assert_eq!(gr.degree(2), 0);
    assert_eq!(gr.num_edges(), 0);
}

#[test]
fn extend_boundaries_redirects_heavy_vertices() {
    let mut gr = graph_with(&[(100, 200), (300, 400)]);
    gr.set_vertex_weight(1, 100.0);
    gr.set_vertex_weight(2, 1.0);
    add_edge(&mut gr, 0, 1, 100.0);
    add_edge(&mut gr, 1, 2, 2.0); // thin crossing: 100 >= 10*4 + 10
    add_edge(&mut gr, 2, 3, 1.0);

    assert!(extend_boundaries(&mut gr));
    assert!(gr.edge(1, 2).is_none());
    // the lone out-edge of 1 is redirected to the sink with the vertex weight
    let e = gr.edge(1, 3).expect("redirected terminal edge");
    assert_eq!(gr.get_edge_weight(e), 100.0);
    // the lone in-edge of 2 is replaced by a fresh start boundary
    let e = gr.edge(0, 2).expect("redirected start edge");
    assert_eq!(gr.get_edge_weight(e), 1.0);

    // nothing else qualifies
    assert!(!extend_boundaries(&mut gr));
}

#[test]
fn extend_boundaries_ignores_adjacent_edges() {
    // touching vertices (gap <= 0) are never cut, however lopsided
    let mut gr = graph_with(&[(100, 200), (200, 300)]);
    gr.set_vertex_weight(1, 1000.0);
    add_edge(&mut gr, 0, 1, 1.0);
    add_edge(&mut gr, 1, 2, 1.0);
    add_edge(&mut gr, 2, 3, 1.0);
    assert!(!extend_boundaries(&mut gr));
}

#[test]
fn remove_inner_boundaries_clears_flat_transit_vertices() {
    let mut gr = graph_with(&[(100, 200), (300, 400)]);
    let mut vi = VertexInfo::new(100, 200);
    vi.stddev = 0.0;
    gr.set_vertex_info(1, vi);
    add_edge(&mut gr, 0, 1, 1.0);
    add_edge(&mut gr, 1, 2, 1.0);
    add_edge(&mut gr, 0, 2, 5.0); // vertex 2 keeps a second in-edge
    add_edge(&mut gr, 2, 3, 5.0);

    assert!(remove_inner_boundaries(&mut gr));
    assert_eq!(gr.degree(1), 0);
    assert!(gr.edge(0, 2).is_some());
}

#[test]
fn remove_inner_boundaries_respects_stddev() {
    let mut gr = graph_with(&[(100, 200), (300, 400)]);
    // default stddev 1.0: the vertex looks genuinely observed
    add_edge(&mut gr, 0, 1, 1.0);
    add_edge(&mut gr, 1, 2, 1.0);
    add_edge(&mut gr, 0, 2, 5.0);
    add_edge(&mut gr, 2, 3, 5.0);
    assert!(!remove_inner_boundaries(&mut gr));
}

/// Scenario: a 3 bp boundary exon with no position-adjacent neighbours is
/// cleared by `remove_small_exons`; refine removes nothing else.
#[test]
fn small_boundary_exon_cascade() {
    let mut gr = graph_with(&[(100, 103), (150, 250)]);
    add_edge(&mut gr, 0, 1, 1.0);
    add_edge(&mut gr, 1, 2, 1.0);
    add_edge(&mut gr, 0, 2, 5.0);
    add_edge(&mut gr, 2, 3, 5.0);

    assert!(remove_small_exons(&mut gr, 5));
    assert_eq!(gr.degree(1), 0);

    let before = edge_set(&gr);
    refine_splice_graph(&mut gr);
    assert_eq!(edge_set(&gr), before);
    assert!(gr.edge(0, 2).is_some());
    assert!(gr.edge(2, 3).is_some());
}

#[test]
fn small_exon_with_adjacent_neighbour_survives() {
    // [147,150) touches [150,250): the left-adjacent neighbour protects it
    let mut gr = graph_with(&[(147, 150), (150, 250)]);
    add_edge(&mut gr, 0, 1, 1.0);
    add_edge(&mut gr, 1, 2, 1.0);
    add_edge(&mut gr, 2, 3, 5.0);
    // not a candidate: its only neighbour is position-adjacent
    assert!(!remove_small_exons(&mut gr, 5));
    assert_eq!(gr.degree(1), 2);
}

#[test]
fn small_junction_dwarfed_on_both_sides_is_removed() {
    // vertex 3 at [300,400) receives a thin crossing edge from vertex 1 while
    // its position-adjacent predecessor (vertex 2) carries real coverage
    let mut gr = graph_with(&[(100, 150), (200, 300), (300, 400)]);
    gr.set_vertex_weight(1, 2.0);
    gr.set_vertex_weight(2, 50.0);
    gr.set_vertex_weight(3, 50.0);
    add_edge(&mut gr, 0, 1, 2.0);
    add_edge(&mut gr, 0, 2, 50.0);
    add_edge(&mut gr, 1, 3, 1.0); // 50 >= 2*1+18 on both tests
    add_edge(&mut gr, 2, 3, 50.0);
    add_edge(&mut gr, 3, 4, 50.0);

    assert!(remove_small_junctions(&mut gr));
    assert!(gr.edge(1, 3).is_none());
    assert!(gr.edge(2, 3).is_some());
    // already at the fixed point
    assert!(!remove_small_junctions(&mut gr));
}

#[test]
fn intron_contamination_is_cleared() {
    // vertex 2 fills the gap between touching neighbours joined by a junction
    let mut gr = graph_with(&[(100, 200), (200, 300), (300, 400)]);
    gr.set_vertex_weight(2, 1.5);
    add_edge(&mut gr, 0, 1, 5.0);
    add_edge(&mut gr, 1, 2, 1.5);
    add_edge(&mut gr, 2, 3, 1.5);
    add_edge(&mut gr, 1, 3, 2.0); // the junction outweighs the filler
    add_edge(&mut gr, 3, 4, 5.0);

    assert!(remove_intron_contamination(&mut gr, 2.0));
    assert_eq!(gr.degree(2), 0);
    assert!(gr.edge(1, 3).is_some());
}

#[test]
fn intron_contamination_respects_coverage_cap() {
    let mut gr = graph_with(&[(100, 200), (200, 300), (300, 400)]);
    gr.set_vertex_weight(2, 3.0); // above the ratio: genuinely covered
    add_edge(&mut gr, 0, 1, 5.0);
    add_edge(&mut gr, 1, 2, 3.0);
    add_edge(&mut gr, 2, 3, 3.0);
    add_edge(&mut gr, 1, 3, 4.0);
    add_edge(&mut gr, 3, 4, 5.0);
    assert!(!remove_intron_contamination(&mut gr, 2.0));
}

/// Scenario: the maximal cover keeps one heavy edge per component and the
/// augmentation pulls the thin flanks back in.
#[test]
fn surviving_edges_keep_maximal_cover_and_flanks() {
    let mut gr = graph_with(&[(100, 200), (300, 400), (500, 600), (700, 800)]);
    add_edge(&mut gr, 0, 1, 5.0);
    add_edge(&mut gr, 1, 2, 0.5);
    add_edge(&mut gr, 2, 3, 3.0);
    add_edge(&mut gr, 3, 4, 0.4);
    add_edge(&mut gr, 4, 5, 5.0);

    let before = edge_set(&gr);
    let changed = keep_surviving_edges(&mut gr, 2.0).unwrap();
    assert!(!changed);
    assert_eq!(edge_set(&gr), before);
}

#[test]
fn surviving_edges_drop_uncovered_parallel_path() {
    // two parallel junctions from 1 to {2,3}; only the heavy one survives,
    // and vertex 2 (left dangling) is cleaned up by the follow-up refine
    let mut gr = graph_with(&[(100, 200), (300, 400), (450, 550)]);
    add_edge(&mut gr, 0, 1, 10.0);
    add_edge(&mut gr, 1, 2, 0.5);
    add_edge(&mut gr, 1, 3, 8.0);
    add_edge(&mut gr, 2, 4, 0.5);
    add_edge(&mut gr, 3, 4, 8.0);

    let changed = keep_surviving_edges(&mut gr, 2.0).unwrap();
    assert!(changed);
    assert!(gr.edge(1, 2).is_none());
    assert!(gr.edge(2, 4).is_none());
    assert!(gr.edge(1, 3).is_some());

    refine_splice_graph(&mut gr);
    assert_eq!(gr.degree(2), 0);
}

/// Scenario: boundary grouping folds 1005 into 1000 and leaves 1020 alone.
#[test]
fn start_boundaries_group_within_distance() {
    let mut gr = graph_with(&[(1000, 1005), (1005, 1020), (1020, 1030)]);
    add_edge(&mut gr, 0, 1, 10.0);
    add_edge(&mut gr, 0, 2, 4.0);
    add_edge(&mut gr, 0, 3, 6.0);
    add_edge(&mut gr, 1, 2, 2.0);
    add_edge(&mut gr, 2, 3, 2.0);
    add_edge(&mut gr, 3, 4, 20.0);
    gr.set_vertex_weight(1, 10.0);
    gr.set_vertex_weight(2, 10.0);
    gr.set_vertex_weight(3, 10.0);

    let smap = group_start_boundaries(&mut gr, 10);
    assert_eq!(smap.get(&1005), Some(&1000));
    assert_eq!(smap.get(&1020), None);
    assert_eq!(smap.len(), 1);

    // (0,2) folded into (0,1); (0,3) started its own group and persists
    assert!(gr.edge(0, 2).is_none());
    assert_eq!(gr.get_edge_weight(gr.edge(0, 1).unwrap()), 14.0);
    assert_eq!(gr.get_edge_weight(gr.edge(0, 3).unwrap()), 6.0);
    // the adjacency chain between leader and member absorbed the folded weight
    assert_eq!(gr.get_edge_weight(gr.edge(1, 2).unwrap()), 6.0);
    assert_eq!(gr.get_vertex_weight(1), 14.0);
}

#[test]
fn end_boundaries_group_within_distance() {
    let mut gr = graph_with(&[(1000, 1010), (1010, 1016), (1016, 1021)]);
    add_edge(&mut gr, 0, 1, 20.0);
    add_edge(&mut gr, 1, 2, 2.0);
    add_edge(&mut gr, 2, 3, 2.0);
    add_edge(&mut gr, 1, 4, 4.0);
    add_edge(&mut gr, 2, 4, 3.0);
    add_edge(&mut gr, 3, 4, 9.0);
    gr.set_vertex_weight(1, 20.0);
    gr.set_vertex_weight(2, 5.0);
    gr.set_vertex_weight(3, 9.0);

    let tmap = group_end_boundaries(&mut gr, 10);
    // 1016 folds into 1021; 1010 joins the same group transitively
    assert_eq!(tmap.get(&1016), Some(&1021));
    assert_eq!(tmap.get(&1010), Some(&1021));
    assert!(gr.edge(2, 4).is_none());
    assert!(gr.edge(1, 4).is_none());
    assert_eq!(gr.get_edge_weight(gr.edge(3, 4).unwrap()), 16.0);
}

#[test]
fn filter_start_boundaries_respects_whitelist() {
    let mut gr = graph_with(&[(100, 200), (300, 400)]);
    add_edge(&mut gr, 0, 1, 0.5);
    add_edge(&mut gr, 0, 2, 0.5);
    add_edge(&mut gr, 1, 2, 5.0);
    add_edge(&mut gr, 2, 3, 5.0);

    let whitelist: BTreeSet<i32> = [100].into_iter().collect();
    filter_start_boundaries(&mut gr, &whitelist, 2.0);
    // 100 is whitelisted, 300 is not
    assert!(gr.edge(0, 1).is_some());
    assert!(gr.edge(0, 2).is_none());
}

#[test]
fn filter_end_boundaries_respects_whitelist() {
    let mut gr = graph_with(&[(100, 200), (300, 400), (500, 600)]);
    add_edge(&mut gr, 0, 1, 5.0);
    add_edge(&mut gr, 0, 2, 5.0);
    add_edge(&mut gr, 0, 3, 5.0);
    add_edge(&mut gr, 1, 4, 0.5);
    add_edge(&mut gr, 2, 4, 0.5);
    add_edge(&mut gr, 3, 4, 5.0);

    let whitelist: BTreeSet<i32> = [400].into_iter().collect();
    filter_end_boundaries(&mut gr, &whitelist, 2.0);
    // 400 is whitelisted, 200 is not; heavy boundaries are untouched
    assert!(gr.edge(2, 4).is_some());
    assert!(gr.edge(3, 4).is_some());
    assert!(gr.edge(1, 4).is_none());
    // vertex 1 lost its only out-edge and was refined away
    assert_eq!(gr.degree(1), 0);
}

#[test]
fn filter_junctions_requires_both_endpoints_whitelisted() {
    let mut gr = graph_with(&[(100, 200), (300, 400), (500, 600)]);
    add_edge(&mut gr, 0, 1, 5.0);
    add_edge(&mut gr, 1, 2, 0.5); // junction (200, 300)
    add_edge(&mut gr, 2, 3, 0.5); // junction (400, 500)
    add_edge(&mut gr, 2, 4, 5.0);
    add_edge(&mut gr, 3, 4, 5.0);

    let whitelist: BTreeSet<i32> = [200, 300].into_iter().collect();
    filter_junctions(&mut gr, &whitelist, 2.0);
    assert!(gr.edge(1, 2).is_some());
    // (400,500) is only half-whitelisted at best, and thin: removed, and the
    // refine pass then strips the stranded vertex 3
    assert!(gr.edge(2, 3).is_none());
    assert_eq!(gr.degree(3), 0);
}

#[test]
fn revise_full_is_idempotent() {
    let mut gr = graph_with(&[(100, 103), (150, 250), (250, 350), (500, 600)]);
    gr.set_vertex_weight(1, 1.0);
    gr.set_vertex_weight(2, 30.0);
    gr.set_vertex_weight(3, 28.0);
    gr.set_vertex_weight(4, 25.0);
    add_edge(&mut gr, 0, 1, 1.0);
    add_edge(&mut gr, 1, 2, 1.0);
    add_edge(&mut gr, 0, 2, 20.0);
    add_edge(&mut gr, 2, 3, 25.0);
    add_edge(&mut gr, 3, 4, 1.0);
    add_edge(&mut gr, 2, 4, 0.5);
    add_edge(&mut gr, 4, 5, 25.0);

    let cfg = Config::default();
    revise_full(&mut gr, &cfg).unwrap();
    let first = edge_set(&gr);

    revise_full(&mut gr, &cfg).unwrap();
    assert_eq!(edge_set(&gr), first);
}
