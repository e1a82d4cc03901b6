//! Multisets of observed phases.
//!
//! A *phase* is a distinct chain observed with some multiplicity: a
//! [`PhaseSet`] keys coordinate chains, a [`HyperSet`] keys vertex paths.
//! Both iterate in insertion order so downstream consumers are deterministic.

use crate::chain::build_path_from_mixed_coordinates;
use crate::graph::SpliceGraph;
use crate::types::GenomicPos;
use indexmap::IndexMap;
use tracing::debug;

/// Multiset of coordinate chains with observation counts.
#[derive(Debug, Clone, Default)]
pub struct PhaseSet {
    chains: IndexMap<Vec<GenomicPos>, i32>,
}

impl PhaseSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, chain: Vec<GenomicPos>, count: i32) {
        *self.chains.entry(chain).or_insert(0) += count;
    }

    /// Multiset sum of another phase set into this one.
    pub fn combine(&mut self, other: &PhaseSet) {
        for (chain, &count) in other.iter_with_counts() {
            self.add(chain.clone(), count);
        }
    }

    pub fn clear(&mut self) {
        self.chains.clear();
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn get(&self, chain: &[GenomicPos]) -> Option<i32> {
        self.chains.get(chain).copied()
    }

    /// Chains in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Vec<GenomicPos>> {
        self.chains.keys()
    }

    pub fn iter_with_counts(&self) -> impl Iterator<Item = (&Vec<GenomicPos>, &i32)> {
        self.chains.iter()
    }
}

/// Multiset of vertex paths with observation counts.
///
/// Paths are stored shifted by −1 so that index 0 refers to the first internal
/// vertex of the graph rather than the source sentinel.
#[derive(Debug, Clone, Default)]
pub struct HyperSet {
    nodes: IndexMap<Vec<usize>, i32>,
}

impl HyperSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path of graph vertex indices; the −1 shift is applied here.
    pub fn add_node_list(&mut self, path: &[usize], count: i32) {
        let shifted: Vec<usize> = path
            .iter()
            .map(|&v| {
                debug_assert!(v >= 1, "hyper path must not include the source sentinel");
                v - 1
            })
            .collect();
        *self.nodes.entry(shifted).or_insert(0) += count;
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, shifted_path: &[usize]) -> Option<i32> {
        self.nodes.get(shifted_path).copied()
    }

    /// Shifted paths with counts, in insertion order.
    pub fn iter_with_counts(&self) -> impl Iterator<Item = (&Vec<usize>, &i32)> {
        self.nodes.iter()
    }

    /// Materialise coordinate phases into vertex paths over `gr`.
    ///
    /// Each phase chain is mixed coordinates (outer exon endpoints around an
    /// intron chain); chains that no longer resolve against the graph are
    /// skipped.
    pub fn from_phase_set(gr: &SpliceGraph, ps: &PhaseSet) -> Self {
        let mut hs = Self::new();
        for (chain, &count) in ps.iter_with_counts() {
            match build_path_from_mixed_coordinates(gr, chain) {
                Some(path) if !path.is_empty() => hs.add_node_list(&path, count),
                Some(_) => {}
                None => {
                    debug!(len = chain.len(), "phase chain does not resolve to a path");
                }
            }
        }
        hs
    }
}
