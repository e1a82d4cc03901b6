//! Multi-sample merging tests: projection, splice union, child digestion,
//! junction grouping, resolution, and reliability thresholds.

use splicebridge::interval::split_interval_union;
use splicebridge::{CombinedGraph, Config, HyperSet, SpliceGraph, VertexInfo};

/// Two-exon sample graph with one junction `(200, 300)`:
/// `0 →(w_s) [100,200) →(w_j) [300,400) →(w_t) sink`.
fn sample_graph(w_s: f64, w_j: f64, w_t: f64) -> SpliceGraph {
    let mut gr = SpliceGraph::new("chr1", '+');
    gr.add_vertex();
    gr.set_vertex_info(0, VertexInfo::new(100, 100));
    for &(l, r, w) in &[(100, 200, 10.0), (300, 400, 9.0)] {
        let v = gr.add_vertex();
        gr.set_vertex_info(v, VertexInfo::new(l, r));
        gr.set_vertex_weight(v, w);
    }
    let sink = gr.add_vertex();
    gr.set_vertex_info(sink, VertexInfo::new(400, 400));
    for &(s, t, w) in &[(0, 1, w_s), (1, 2, w_j), (2, 3, w_t)] {
        let e = gr.add_edge(s, t);
        gr.set_edge_weight(e, w);
    }
    gr.build_vertex_index();
    gr
}

fn sample_hyper() -> HyperSet {
    let mut hs = HyperSet::new();
    hs.add_node_list(&[1, 2], 2);
    hs
}

fn combined_from_sample() -> CombinedGraph {
    let gr = sample_graph(10.0, 8.0, 9.0);
    let hs = sample_hyper();
    let mut cb = CombinedGraph::new();
    cb.build(&gr, &hs, &[]);
    cb
}

// ── per-sample projection ────────────────────────────────────────────────────

#[test]
fn build_projects_graph_elements() {
    let cb = combined_from_sample();
    assert_eq!(cb.num_combined, 1);
    assert_eq!(cb.chrm, "chr1");
    assert_eq!(cb.strand, '+');

    assert_eq!(cb.regions, vec![
        ((100, 200), splicebridge::WeightCount::new(10.0, 1)),
        ((300, 400), splicebridge::WeightCount::new(9.0, 1)),
    ]);
    assert_eq!(cb.sbounds.len(), 1);
    assert_eq!(cb.sbounds[0].0, 100);
    assert_eq!(cb.tbounds[0].0, 400);
    assert_eq!(cb.junctions.len(), 1);
    assert_eq!(cb.junctions[0].0, (200, 300));
    assert_eq!(cb.splices, vec![200, 300]);
}

#[test]
fn build_clusters_phases_by_inner_chain() {
    let cb = combined_from_sample();
    assert_eq!(cb.phase.len(), 1);
    let rc = &cb.phase[0];
    // exon chain [100, 200, 300, 400] stripped of its outer endpoints
    assert_eq!(rc.chain, vec![200, 300]);
    assert_eq!(rc.lefts, vec![100]);
    assert_eq!(rc.rights, vec![400]);
    assert_eq!(rc.counts, vec![2]);
}

#[test]
fn build_projects_unbridged_reads() {
    let gr = sample_graph(10.0, 8.0, 9.0);
    let hs = HyperSet::new();
    let mut cb = CombinedGraph::new();
    cb.build(&gr, &hs, &[(vec![1], vec![2], 4)]);
    assert_eq!(cb.reads.len(), 1);
    assert_eq!(cb.reads[0].chain1, vec![100, 200]);
    assert_eq!(cb.reads[0].chain2, vec![300, 400]);
    assert_eq!(cb.reads[0].count, 4);
}

// ── accumulation ─────────────────────────────────────────────────────────────

#[test]
fn combine_unions_splices_only() {
    let mut cb1 = combined_from_sample();

    let mut gr2 = SpliceGraph::new("chr1", '+');
    gr2.add_vertex();
    gr2.set_vertex_info(0, VertexInfo::new(100, 100));
    for &(l, r) in &[(100, 250), (350, 400)] {
        let v = gr2.add_vertex();
        gr2.set_vertex_info(v, VertexInfo::new(l, r));
        gr2.set_vertex_weight(v, 5.0);
    }
    let sink = gr2.add_vertex();
    gr2.set_vertex_info(sink, VertexInfo::new(400, 400));
    for s in 0..sink {
        let e = gr2.add_edge(s, s + 1);
        gr2.set_edge_weight(e, 5.0);
    }
    gr2.build_vertex_index();

    let mut cb2 = CombinedGraph::new();
    cb2.build(&gr2, &HyperSet::new(), &[]);
    assert_eq!(cb2.splices, vec![250, 350]);

    cb1.combine(&cb2);
    assert_eq!(cb1.num_combined, 2);
    assert_eq!(cb1.children.len(), 2);
    assert_eq!(cb1.splices, vec![200, 250, 300, 350]);
    assert_eq!(cb1.get_overlapped_splice_positions(&[200, 240, 350]), 2);
}

#[test]
fn combine_children_merges_summaries() {
    let mut cb1 = combined_from_sample();
    let cb2 = combined_from_sample();
    cb1.combine(&cb2);
    cb1.combine_children();

    // identical samples: regions double their weight, keep their splits
    assert_eq!(cb1.regions.len(), 2);
    assert_eq!(cb1.regions[0], ((100, 200), splicebridge::WeightCount::new(20.0, 1)));
    assert_eq!(cb1.regions[1], ((300, 400), splicebridge::WeightCount::new(18.0, 1)));

    assert_eq!(cb1.junctions.len(), 1);
    assert_eq!(cb1.junctions[0], ((200, 300), splicebridge::WeightCount::new(16.0, 2)));
    assert_eq!(cb1.sbounds[0], (100, splicebridge::WeightCount::new(20.0, 2)));
    assert_eq!(cb1.tbounds[0], (400, splicebridge::WeightCount::new(18.0, 2)));
}

#[test]
fn overlapping_regions_split_on_merge() {
    let items = vec![(100, 200, 10), (150, 250, 20)];
    assert_eq!(
        split_interval_union(&items),
        vec![(100, 150, 10), (150, 200, 30), (200, 250, 20)]
    );
    // disjoint contributions keep their gap
    let items = vec![(100, 150, 5), (200, 250, 7)];
    assert_eq!(split_interval_union(&items), vec![(100, 150, 5), (200, 250, 7)]);
    // zero-weight contributions are absorbed
    let items = vec![(100, 150, 0)];
    assert!(split_interval_union(&items).is_empty());
}

// ── junction grouping ────────────────────────────────────────────────────────

#[test]
fn nearby_dominated_junctions_are_dropped() {
    let mut cb = CombinedGraph::new();
    cb.junctions = vec![
        ((1000, 2000), splicebridge::WeightCount::new(1.0, 1)),
        ((1003, 2001), splicebridge::WeightCount::new(50.0, 3)),
        ((5000, 6000), splicebridge::WeightCount::new(1.0, 1)),
    ];
    cb.group_junctions(&Config::default());
    assert_eq!(cb.junctions.len(), 2);
    assert_eq!(cb.junctions[0].0, (1003, 2001));
    assert_eq!(cb.junctions[1].0, (5000, 6000));
}

#[test]
fn distant_or_balanced_junctions_survive_grouping() {
    let mut cb = CombinedGraph::new();
    cb.junctions = vec![
        ((1000, 2000), splicebridge::WeightCount::new(1.0, 1)),
        ((1500, 2500), splicebridge::WeightCount::new(50.0, 3)),
        ((3000, 4000), splicebridge::WeightCount::new(5.0, 2)),
        ((3001, 4001), splicebridge::WeightCount::new(6.0, 2)),
    ];
    cb.group_junctions(&Config::default());
    assert_eq!(cb.junctions.len(), 4);
}

// ── resolution ───────────────────────────────────────────────────────────────

#[test]
fn resolve_rebuilds_graph_and_phases() {
    let mut cb1 = combined_from_sample();
    let cb2 = combined_from_sample();
    cb1.combine(&cb2);
    cb1.combine_children();

    let resolved = cb1.resolve(&Config::default());
    let gr = &resolved.graph;

    // sentinels at the outermost bounds, one vertex per region
    assert_eq!(gr.num_vertices(), 4);
    assert_eq!(gr.get_vertex_info(0).lpos, 100);
    assert_eq!(gr.get_vertex_info(3).rpos, 400);
    assert_eq!(gr.get_vertex_info(1).lpos, 100);
    assert_eq!(gr.get_vertex_weight(1), 20.0);
    assert_eq!(gr.get_vertex_weight(2), 18.0);

    // bound and junction edges wired through the indices
    assert!(gr.edge(0, 1).is_some());
    assert!(gr.edge(2, 3).is_some());
    let j = gr.edge(1, 2).expect("junction edge");
    assert_eq!(gr.get_edge_weight(j), 16.0);
    assert_eq!(gr.get_edge_info(j).count, 2);

    // both children's phases land on the same rebuilt path, shifted by −1
    assert_eq!(resolved.phases.len(), 1);
    assert_eq!(resolved.phases.get(&[0, 1]), Some(4));
    // children's reads were digested during combine_children
    assert!(resolved.reads.is_empty());
}

#[test]
fn resolve_connects_touching_regions() {
    // two samples whose regions touch at 200 without a junction
    let mut gr = SpliceGraph::new("chr1", '+');
    gr.add_vertex();
    gr.set_vertex_info(0, VertexInfo::new(100, 100));
    for &(l, r, w) in &[(100, 200, 10.0), (200, 300, 4.0)] {
        let v = gr.add_vertex();
        gr.set_vertex_info(v, VertexInfo::new(l, r));
        gr.set_vertex_weight(v, w);
    }
    let sink = gr.add_vertex();
    gr.set_vertex_info(sink, VertexInfo::new(300, 300));
    for s in 0..sink {
        let e = gr.add_edge(s, s + 1);
        gr.set_edge_weight(e, 5.0);
    }
    gr.build_vertex_index();

    let mut cb = CombinedGraph::new();
    cb.build(&gr, &HyperSet::new(), &[]);
    let other = cb.clone();
    cb.combine(&other);
    cb.combine_children();

    let resolved = cb.resolve(&Config::default());
    let adj = resolved.graph.edge(1, 2).expect("adjacency edge");
    // the narrower side's coverage carries over; counts take the minimum
    assert_eq!(resolved.graph.get_edge_weight(adj), 8.0);
    assert_eq!(resolved.graph.get_edge_info(adj).count, 1);
}

// ── reliability ──────────────────────────────────────────────────────────────

#[test]
fn reliability_thresholds_are_disjunctive() {
    let mut cb1 = combined_from_sample();
    let cb2 = combined_from_sample();
    cb1.combine(&cb2);
    cb1.combine_children();
    // junction (200,300) has weight 16, count 2

    let j = cb1.get_reliable_junctions(3, 10.0);
    assert!(j.contains(&(200, 300))); // weight passes
    let j = cb1.get_reliable_junctions(2, 100.0);
    assert!(j.contains(&(200, 300))); // count passes
    let j = cb1.get_reliable_junctions(3, 100.0);
    assert!(j.is_empty()); // neither passes

    let s = cb1.get_reliable_splices(3, 10.0);
    assert!(s.contains(&200) && s.contains(&300));

    let sb = cb1.get_reliable_start_boundaries(2, 100.0);
    assert!(sb.contains(&100));
    let tb = cb1.get_reliable_end_boundaries(3, 10.0);
    assert!(tb.contains(&400));
    assert!(cb1.get_reliable_end_boundaries(3, 100.0).is_empty());
}

#[test]
fn reliable_adjacencies_need_support_on_both_sides() {
    let mut cb = CombinedGraph::new();
    cb.regions = vec![
        ((100, 200), splicebridge::WeightCount::new(30.0, 1)),
        ((200, 300), splicebridge::WeightCount::new(25.0, 1)),
        ((400, 500), splicebridge::WeightCount::new(40.0, 3)),
    ];
    let adj = cb.get_reliable_adjacencies(2, 20.0);
    assert!(adj.contains(&200)); // weights pass on both sides
    assert_eq!(adj.len(), 1); // 300/400 do not touch
    assert!(cb.get_reliable_adjacencies(2, 50.0).is_empty());
}
