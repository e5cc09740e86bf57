//! Sparse synapse encoding and iteration.
//!
//! A synapse range's `start` is signed: a non-negative `start` addresses an
//! internal neuron index directly; a negative `start` addresses an external
//! (network-input) index through the bijection `external_index = -start - 1`.
//! The walk direction depends on that same sign: a non-negative `start` walks
//! forward (`start`, `start+1`, …), while a negative `start` walks backward
//! (`start`, `start-1`, …), staying in the external addressing space.

use std::cell::Cell;

use crate::error::{CoreError, Result};

/// One contiguous range of flat indices, as stored in a neuron's synapse
/// list. `start` may be negative (see module docs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynapseRange {
    /// First flat index (signed; see module docs)
    pub start: i64,
    /// Number of consecutive indices this range denotes
    pub interval_size: u32,
}

impl SynapseRange {
    /// Construct a new range.
    pub fn new(start: i64, interval_size: u32) -> Self {
        Self { start, interval_size }
    }

    /// The k-th flat index in this range (`k < interval_size`). Walks
    /// forward for a non-negative `start` (internal addressing), backward
    /// for a negative `start` (external addressing).
    pub fn index_at(&self, k: u32) -> i64 {
        if self.start < 0 {
            self.start - k as i64
        } else {
            self.start + k as i64
        }
    }
}

/// An input synapse additionally carries how many sequence steps in the
/// past it reads from: 0 is "this time step", k > 0 is "k steps ago".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSynapse {
    /// Underlying index range
    pub range: SynapseRange,
    /// 0 = current step, k>0 = k steps in the past
    pub reach_past_loops: u32,
}

impl InputSynapse {
    /// Construct a new input synapse.
    pub fn new(start: i64, interval_size: u32, reach_past_loops: u32) -> Self {
        Self {
            range: SynapseRange::new(start, interval_size),
            reach_past_loops,
        }
    }
}

/// `true` iff the flat index refers to an external network input.
pub fn is_index_input(i: i64) -> bool {
    i < 0
}

/// Maps an internal array index that denotes an external input (i.e.
/// negative) to its `0`-based external input index.
pub fn external_index_from_array_index(i: i64) -> i64 {
    debug_assert!(is_index_input(i));
    -i - 1
}

/// Inverse of [`external_index_from_array_index`]: maps a `0`-based external
/// input index back to its synapse encoding.
pub fn synapse_index_from_input_index(external_index: i64) -> i64 {
    -external_index - 1
}

/// Iterates the flat indices denoted by an ordered sequence of synapse
/// ranges, caching the last visited `(range, offset)` pair to amortize
/// repeated nearby random access.
pub struct SynapseIterator<'a> {
    ranges: &'a [SynapseRange],
    total_len: u32,
    // (range_index, offset_within_range) of the last `[]` access.
    last_visited: Cell<(usize, u32)>,
}

impl<'a> SynapseIterator<'a> {
    /// Build an iterator view over `ranges`.
    pub fn new(ranges: &'a [SynapseRange]) -> Self {
        let total_len = ranges.iter().map(|r| r.interval_size).sum();
        Self {
            ranges,
            total_len,
            last_visited: Cell::new((0, 0)),
        }
    }

    /// Total number of flat indices across all ranges.
    pub fn len(&self) -> u32 {
        self.total_len
    }

    /// `true` if this synapse list denotes no indices.
    pub fn is_empty(&self) -> bool {
        self.total_len == 0
    }

    /// Visit every flat index in order.
    pub fn iterate(&self, mut f: impl FnMut(i64)) {
        self.iterate_terminatable(|idx| {
            f(idx);
            true
        });
    }

    /// Visit every flat index in order, stopping early if `f` returns
    /// `false`.
    pub fn iterate_terminatable(&self, mut f: impl FnMut(i64) -> bool) {
        for range in self.ranges {
            for k in 0..range.interval_size {
                if !f(range.index_at(k)) {
                    return;
                }
            }
        }
    }

    /// Random access to the `k`-th flat index, `k < len()`.
    pub fn get(&self, k: u32) -> Result<i64> {
        if k >= self.total_len {
            return Err(CoreError::index_out_of_bounds(
                "synapse",
                k as usize,
                self.total_len as usize,
            ));
        }

        let (mut range_idx, mut consumed) = self.last_visited.get();
        if range_idx >= self.ranges.len() {
            range_idx = 0;
            consumed = 0;
        }

        // Figure out how many indices precede `range_idx` to decide whether
        // the cached position is usable as a starting point for `k`.
        let preceding: u32 = self.ranges[..range_idx].iter().map(|r| r.interval_size).sum();
        let (mut range_idx, mut offset_in_range) = if preceding <= k {
            (range_idx, k - preceding)
        } else {
            (0, k)
        };
        if range_idx < self.ranges.len() && offset_in_range >= self.ranges[range_idx].interval_size
        {
            // cached range no longer covers k; fall back to a full scan
            let mut remaining = k;
            range_idx = 0;
            loop {
                let size = self.ranges[range_idx].interval_size;
                if remaining < size {
                    offset_in_range = remaining;
                    break;
                }
                remaining -= size;
                range_idx += 1;
            }
        }
        let _ = consumed;

        let idx = self.ranges[range_idx].index_at(offset_in_range);
        self.last_visited.set((range_idx, offset_in_range));
        Ok(idx)
    }
}
