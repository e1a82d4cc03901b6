//! splicebridge: the core engine of a meta-assembler for RNA transcripts.
//!
//! Given per-sample splice graphs (candidate exons and junctions inferred from
//! short-read alignments) and clusters of paired-end fragments whose mates are
//! separated by an unobserved gap, this crate:
//!
//! 1. **revises** each noisy splice graph in place ([`revise::revise_full`]),
//! 2. **bridges** each fragment by finding a path through the revised graph
//!    that connects its mates under a fragment-length window
//!    ([`BridgeSolver`]),
//! 3. **merges** the per-sample graphs, phases, and boundaries into a meta
//!    graph across samples ([`CombinedGraph`]), which
//!    [`resolve`](CombinedGraph::resolve)s back into a splice graph and
//!    phasing paths for downstream assembly.
//!
//! # Library usage
//!
//! ```no_run
//! use splicebridge::{BridgeSolver, CombinedGraph, Config, PhaseSet, SpliceGraph};
//! use splicebridge::phase::HyperSet;
//!
//! // Per sample: build a SpliceGraph and fragment clusters upstream, then
//! // let cfg = Config::default();
//! // splicebridge::revise::revise_full(&mut gr, &cfg)?;
//! // let solver = BridgeSolver::new(&gr, &clusters, &cfg, 50, 500);
//! // let mut phases = PhaseSet::new();
//! // solver.build_phase_set(&mut phases);
//! // let hs = HyperSet::from_phase_set(&gr, &phases);
//! //
//! // Across samples:
//! // let mut cb = CombinedGraph::new();
//! // cb.build(&gr, &hs, &[]);
//! // cb.combine(&other_sample);
//! // cb.combine_children();
//! // let resolved = cb.resolve(&cfg);
//! ```

pub mod bridge;
pub mod chain;
pub mod combined;
pub mod config;
pub mod graph;
pub mod interval;
pub mod phase;
pub mod revise;

pub(crate) mod types;

// Flat re-exports for the most commonly used types.
pub use bridge::{BridgeKind, BridgePath, BridgeSolver, PairedReadCluster, Pier};
pub use combined::{CombinedGraph, PhaseCluster, Resolved, UnbridgedReads, WeightCount};
pub use config::Config;
pub use graph::{EdgeInfo, SpliceGraph, VertexInfo};
pub use phase::{HyperSet, PhaseSet};
pub use types::GenomicPos;
