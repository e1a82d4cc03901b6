use serde::{Deserialize, Serialize};

/// Tuning parameters for graph revision, bridging, and merging.
///
/// The core never reads files; construct this directly or deserialize it from
/// whatever format the surrounding pipeline uses.  [`Config::default`] matches
/// the engine's standard short-read settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Exons shorter than this are candidates for removal during revision.
    pub min_exon_length: i32,
    /// Edges below this weight survive revision only through the spanning cover.
    pub min_surviving_edge_weight: f64,
    /// Maximum coverage at which a retained-intron vertex is treated as
    /// contamination and cleared.
    pub max_intron_contamination_coverage: f64,
    /// Number of candidate bridge paths kept per vertex in the bridging DP (K).
    pub bridge_dp_solution_size: usize,
    /// Width of the bottleneck stack carried by each DP entry (S).
    pub bridge_dp_stack_size: usize,
    /// Start/end boundaries within this distance of a grouped leader are folded
    /// into it.
    pub max_group_boundary_distance: i32,
    /// Junction pairs closer than this (summed endpoint distance) compete for
    /// removal during junction grouping.
    pub max_group_junction_distance: i32,
    /// Verbosity level; >= 2 enables per-operation debug events.
    pub verbose: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_exon_length: 20,
            min_surviving_edge_weight: 1.5,
            max_intron_contamination_coverage: 2.0,
            bridge_dp_solution_size: 10,
            bridge_dp_stack_size: 5,
            max_group_boundary_distance: 10_000,
            max_group_junction_distance: 100,
            verbose: 0,
        }
    }
}
