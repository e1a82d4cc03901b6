//! Splice graph: a DAG whose internal vertices are candidate exonic intervals
//! and whose edges are candidate junctions, flanked by a zero-width source
//! sentinel (vertex 0) and sink sentinel (vertex N−1).
//!
//! The graph is an arena: vertices and edges live in flat vectors and edges are
//! addressed by stable `usize` ids.  Removing an edge tombstones its record and
//! unlinks it from the incident adjacency lists; vertex ids never move.

use crate::types::{GenomicPos, HashMap, HashMapExt};

/// Per-vertex payload: genomic interval, exonic length, sample count, and the
/// coverage standard deviation used by the boundary-revision heuristics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexInfo {
    pub lpos: GenomicPos,
    pub rpos: GenomicPos,
    pub length: i32,
    pub count: i32,
    pub stddev: f64,
}

impl Default for VertexInfo {
    fn default() -> Self {
        Self { lpos: 0, rpos: 0, length: 0, count: 0, stddev: 1.0 }
    }
}

impl VertexInfo {
    pub fn new(lpos: GenomicPos, rpos: GenomicPos) -> Self {
        Self { lpos, rpos, length: rpos - lpos, ..Self::default() }
    }
}

/// Per-edge payload accumulated across merges.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EdgeInfo {
    pub weight: f64,
    pub count: i32,
}

#[derive(Debug, Clone, Default)]
struct Vertex {
    weight: f64,
    info: VertexInfo,
    ins: Vec<usize>,
    outs: Vec<usize>,
}

#[derive(Debug, Clone)]
struct Edge {
    source: usize,
    target: usize,
    weight: f64,
    info: EdgeInfo,
    alive: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SpliceGraph {
    /// Chromosome (or contig) this graph was bundled from.
    pub chrm: String,
    /// Strand: '+', '-', '.' (unstranded) or '?' (unknown).
    pub strand: char,
    /// Graph id assigned by the caller.
    pub gid: String,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    /// lpos → internal vertex; rebuilt by [`SpliceGraph::build_vertex_index`].
    pub lindex: HashMap<GenomicPos, usize>,
    /// rpos → internal vertex; rebuilt by [`SpliceGraph::build_vertex_index`].
    pub rindex: HashMap<GenomicPos, usize>,
}

impl SpliceGraph {
    pub fn new(chrm: &str, strand: char) -> Self {
        Self { chrm: chrm.to_string(), strand, ..Self::default() }
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.edges.clear();
        self.lindex.clear();
        self.rindex.clear();
    }

    // ── vertices ─────────────────────────────────────────────────────────────

    pub fn add_vertex(&mut self) -> usize {
        self.vertices.push(Vertex::default());
        self.vertices.len() - 1
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn set_vertex_weight(&mut self, v: usize, w: f64) {
        self.vertices[v].weight = w;
    }

    pub fn get_vertex_weight(&self, v: usize) -> f64 {
        self.vertices[v].weight
    }

    pub fn set_vertex_info(&mut self, v: usize, info: VertexInfo) {
        self.vertices[v].info = info;
    }

    pub fn get_vertex_info(&self, v: usize) -> VertexInfo {
        self.vertices[v].info
    }

    /// Remove every edge incident to `v`.  The vertex record itself stays so
    /// indices remain stable; a cleared internal vertex simply has degree 0.
    pub fn clear_vertex(&mut self, v: usize) {
        let ids: Vec<usize> = self.vertices[v]
            .ins
            .iter()
            .chain(self.vertices[v].outs.iter())
            .copied()
            .collect();
        for e in ids {
            self.remove_edge(e);
        }
    }

    // ── edges ────────────────────────────────────────────────────────────────

    /// Add an edge `s → t`.  Edges always point forward in vertex order; this
    /// is what keeps the graph acyclic.
    pub fn add_edge(&mut self, s: usize, t: usize) -> usize {
        assert!(s < t, "splice graph edge must go forward: ({s}, {t})");
        assert!(t < self.vertices.len());
        let id = self.edges.len();
        self.edges.push(Edge {
            source: s,
            target: t,
            weight: 0.0,
            info: EdgeInfo::default(),
            alive: true,
        });
        self.vertices[s].outs.push(id);
        self.vertices[t].ins.push(id);
        id
    }

    pub fn remove_edge(&mut self, e: usize) {
        if !self.edges[e].alive {
            return;
        }
        let (s, t) = (self.edges[e].source, self.edges[e].target);
        self.edges[e].alive = false;
        self.vertices[s].outs.retain(|&x| x != e);
        self.vertices[t].ins.retain(|&x| x != e);
    }

    pub fn num_edges(&self) -> usize {
        self.edges.iter().filter(|e| e.alive).count()
    }

    pub fn edge_source(&self, e: usize) -> usize {
        self.edges[e].source
    }

    pub fn edge_target(&self, e: usize) -> usize {
        self.edges[e].target
    }

    /// `(source, target)` of an edge id.
    pub fn edge_endpoints(&self, e: usize) -> (usize, usize) {
        (self.edges[e].source, self.edges[e].target)
    }

    pub fn set_edge_weight(&mut self, e: usize, w: f64) {
        self.edges[e].weight = w;
    }

    pub fn get_edge_weight(&self, e: usize) -> f64 {
        self.edges[e].weight
    }

    pub fn set_edge_info(&mut self, e: usize, info: EdgeInfo) {
        self.edges[e].info = info;
    }

    pub fn get_edge_info(&self, e: usize) -> EdgeInfo {
        self.edges[e].info
    }

    /// Look up the edge `s → t`, if present.
    pub fn edge(&self, s: usize, t: usize) -> Option<usize> {
        self.vertices[s].outs.iter().copied().find(|&e| self.edges[e].target == t)
    }

    // ── iteration & degrees ─────────────────────────────────────────────────

    pub fn in_edges(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.vertices[v].ins.iter().copied()
    }

    pub fn out_edges(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.vertices[v].outs.iter().copied()
    }

    /// All live edge ids.  Collect before mutating the graph mid-iteration.
    pub fn edges(&self) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.alive)
            .map(|(id, _)| id)
    }

    pub fn in_degree(&self, v: usize) -> usize {
        self.vertices[v].ins.len()
    }

    pub fn out_degree(&self, v: usize) -> usize {
        self.vertices[v].outs.len()
    }

    pub fn degree(&self, v: usize) -> usize {
        self.in_degree(v) + self.out_degree(v)
    }

    /// Heaviest incoming edge of `v`, if any.
    pub fn max_in_edge(&self, v: usize) -> Option<usize> {
        self.vertices[v]
            .ins
            .iter()
            .copied()
            .max_by(|&a, &b| {
                self.edges[a]
                    .weight
                    .partial_cmp(&self.edges[b].weight)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Heaviest outgoing edge of `v`, if any.
    pub fn max_out_edge(&self, v: usize) -> Option<usize> {
        self.vertices[v]
            .outs
            .iter()
            .copied()
            .max_by(|&a, &b| {
                self.edges[a]
                    .weight
                    .partial_cmp(&self.edges[b].weight)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    // ── position lookups ────────────────────────────────────────────────────

    /// The unique internal vertex whose `[lpos, rpos)` contains `pos`.
    ///
    /// Internal vertices are ordered by increasing `lpos`, so a binary search
    /// suffices.
    pub fn locate_vertex(&self, pos: GenomicPos) -> Option<usize> {
        let n = self.vertices.len();
        if n <= 2 {
            return None;
        }
        let (mut lo, mut hi) = (1usize, n - 1); // internal vertices [1, n-1)
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.vertices[mid].info.lpos <= pos {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        // lo is the first internal vertex with lpos > pos
        let v = lo.checked_sub(1)?;
        if v == 0 {
            return None;
        }
        let vi = self.vertices[v].info;
        if vi.lpos <= pos && pos < vi.rpos { Some(v) } else { None }
    }

    /// Recompute `lindex` / `rindex` from the internal vertices.
    ///
    /// Both maps must come out injective; a duplicate boundary position means
    /// the graph was built wrong.
    pub fn build_vertex_index(&mut self) {
        self.lindex.clear();
        self.rindex.clear();
        let n = self.vertices.len();
        if n <= 2 {
            return;
        }
        for v in 1..n - 1 {
            let vi = self.vertices[v].info;
            let dup_l = self.lindex.insert(vi.lpos, v);
            let dup_r = self.rindex.insert(vi.rpos, v);
            assert!(dup_l.is_none(), "duplicate lpos {} in vertex index", vi.lpos);
            assert!(dup_r.is_none(), "duplicate rpos {} in vertex index", vi.rpos);
        }
    }

    // ── subgraphs ───────────────────────────────────────────────────────────

    /// Build the child graph induced by a sorted set of internal vertices.
    ///
    /// Fresh sentinels are placed at the leftmost `lpos` / rightmost `rpos` of
    /// the kept vertices; edges from the root's source sentinel and to its sink
    /// sentinel are remapped onto the new sentinels, and internal edges whose
    /// endpoints both survive are carried over with their payloads.
    pub fn subgraph(&self, keep: &[usize]) -> SpliceGraph {
        let mut gr = SpliceGraph::new(&self.chrm, self.strand);
        if keep.is_empty() {
            return gr;
        }
        debug_assert!(keep.windows(2).all(|w| w[0] < w[1]));

        let mut a2b: HashMap<usize, usize> = HashMap::with_capacity(keep.len());
        for (i, &v) in keep.iter().enumerate() {
            a2b.insert(v, i + 1);
        }

        let lpos = self.get_vertex_info(keep[0]).lpos;
        let rpos = self.get_vertex_info(*keep.last().unwrap()).rpos;

        gr.add_vertex();
        gr.set_vertex_info(0, VertexInfo::new(lpos, lpos));

        for &v in keep {
            let k = gr.add_vertex();
            gr.set_vertex_weight(k, self.get_vertex_weight(v));
            gr.set_vertex_info(k, self.get_vertex_info(v));
        }

        let sink = gr.add_vertex();
        gr.set_vertex_info(sink, VertexInfo::new(rpos, rpos));

        let n = self.num_vertices() - 1;
        for e in self.out_edges(0) {
            let t = self.edge_target(e);
            if let Some(&y) = a2b.get(&t) {
                let ee = gr.add_edge(0, y);
                gr.set_edge_weight(ee, self.get_edge_weight(e));
                gr.set_edge_info(ee, self.get_edge_info(e));
            }
        }
        for &s in keep {
            let x = a2b[&s];
            for e in self.out_edges(s) {
                let t = self.edge_target(e);
                let y = if t == n {
                    sink
                } else {
                    match a2b.get(&t) {
                        Some(&y) => y,
                        None => continue,
                    }
                };
                let ee = gr.add_edge(x, y);
                gr.set_edge_weight(ee, self.get_edge_weight(e));
                gr.set_edge_info(ee, self.get_edge_info(e));
            }
        }
        gr
    }
}
