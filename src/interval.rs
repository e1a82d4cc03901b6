//! Primitives over sorted coordinate sequences and weighted intervals.
//!
//! Splice-position unions, chain consistency merging, and region merging are
//! all operations on sorted `GenomicPos` sequences; they share the helpers in
//! this module.

use crate::types::GenomicPos;

/// Set union of two sorted, duplicate-free sequences.
pub fn merge_sorted_union(a: &[GenomicPos], b: &[GenomicPos]) -> Vec<GenomicPos> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Number of elements shared by two sorted, duplicate-free sequences.
pub fn intersect_sorted_count(a: &[GenomicPos], b: &[GenomicPos]) -> usize {
    let (mut i, mut j, mut n) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                n += 1;
                i += 1;
                j += 1;
            }
        }
    }
    n
}

/// Merge two strictly increasing sequences into a common supersequence.
///
/// The merge fails when one sequence carries an element strictly inside the
/// span the other has already committed to; the shared region of the two
/// sequences must be identical element-for-element.  Returns the number of
/// shared elements alongside the merged sequence.
pub fn merge_consistent(
    x: &[GenomicPos],
    y: &[GenomicPos],
) -> Option<(Vec<GenomicPos>, usize)> {
    let mut out = Vec::with_capacity(x.len() + y.len());
    let mut shared = 0usize;
    let (mut i, mut j) = (0, 0);
    while i < x.len() && j < y.len() {
        match x[i].cmp(&y[j]) {
            std::cmp::Ordering::Equal => {
                out.push(x[i]);
                shared += 1;
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => {
                // x[i] falls between y[j-1] and y[j]: inside y's window.
                if j > 0 {
                    return None;
                }
                out.push(x[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                if i > 0 {
                    return None;
                }
                out.push(y[j]);
                j += 1;
            }
        }
    }
    out.extend_from_slice(&x[i..]);
    out.extend_from_slice(&y[j..]);
    Some((out, shared))
}

/// Union of weighted half-open intervals, split at every inserted endpoint.
///
/// Weights sum over overlaps; sub-intervals whose summed weight is zero are
/// absorbed.  Adjacent sub-intervals are *not* coalesced across inserted
/// endpoints, so the result preserves each contributor's boundaries.
pub fn split_interval_union(
    items: &[(GenomicPos, GenomicPos, i32)],
) -> Vec<(GenomicPos, GenomicPos, i32)> {
    let mut bounds: Vec<GenomicPos> = Vec::with_capacity(items.len() * 2);
    for &(l, r, _) in items {
        debug_assert!(l < r);
        bounds.push(l);
        bounds.push(r);
    }
    bounds.sort_unstable();
    bounds.dedup();

    let mut out = Vec::new();
    for w in bounds.windows(2) {
        let (l, r) = (w[0], w[1]);
        let sum: i32 = items
            .iter()
            .filter(|&&(a, b, _)| a <= l && r <= b)
            .map(|&(_, _, w)| w)
            .sum();
        if sum > 0 {
            out.push((l, r, sum));
        }
    }
    out
}

/// `true` when the sequence is strictly increasing.
pub fn check_increasing(v: &[GenomicPos]) -> bool {
    v.windows(2).all(|w| w[0] < w[1])
}
