//! Collision-safe channel number assignment.
//!
//! Before any assignment the system computes
//! `external_occupied = dispatcharr_numbers − teamarr_managed_numbers`:
//! numbers held downstream by channels Teamarr does not own. Every
//! assignment algorithm skips that set, so EPG never bleeds into
//! externally managed channels. An empty set behaves exactly like the
//! integration being disabled.

use crate::db::settings::NumberingMode;
use std::collections::BTreeSet;
use tracing::debug;

/// Numbers occupied downstream by channels Teamarr does not manage.
pub fn compute_external_occupied(
    dispatcharr_numbers: &[u32],
    teamarr_managed_numbers: &[u32],
) -> BTreeSet<u32> {
    let managed: BTreeSet<u32> = teamarr_managed_numbers.iter().copied().collect();
    dispatcharr_numbers
        .iter()
        .copied()
        .filter(|n| !managed.contains(n))
        .collect()
}

/// Allocates channel numbers, skipping externals and already-assigned
/// numbers.
#[derive(Debug, Clone)]
pub struct NumberAssigner {
    external: BTreeSet<u32>,
    assigned: BTreeSet<u32>,
}

impl NumberAssigner {
    pub fn new(external: BTreeSet<u32>, active_numbers: &[u32]) -> Self {
        Self {
            external,
            assigned: active_numbers.iter().copied().collect(),
        }
    }

    fn is_free(&self, n: u32) -> bool {
        !self.external.contains(&n) && !self.assigned.contains(&n)
    }

    /// First free number at or above `start`; marks it assigned.
    pub fn next_from(&mut self, start: u32) -> u32 {
        let mut candidate = start.max(1);
        while !self.is_free(candidate) {
            candidate += 1;
        }
        self.assigned.insert(candidate);
        candidate
    }

    /// First free number in `[start, end]`, when one exists.
    pub fn next_in_range(&mut self, start: u32, end: u32) -> Option<u32> {
        let mut candidate = start.max(1);
        while candidate <= end {
            if self.is_free(candidate) {
                self.assigned.insert(candidate);
                return Some(candidate);
            }
            candidate += 1;
        }
        None
    }

    /// Assign numbers for `count` channels per the configured mode.
    ///
    /// - `strict_block`: dense block from the group's start number,
    ///   skipping occupied numbers.
    /// - `rational_block`: like strict_block but the block is padded to
    ///   the next multiple of ten, keeping stable gaps between groups.
    /// - `strict_compact`: single global sequence from `range_start`.
    pub fn assign_block(
        &mut self,
        mode: NumberingMode,
        group_start: u32,
        range_start: u32,
        count: usize,
    ) -> Vec<u32> {
        let start = match mode {
            NumberingMode::StrictCompact => range_start,
            _ => group_start,
        };
        let numbers: Vec<u32> = (0..count).map(|_| self.next_from(start)).collect();

        if mode == NumberingMode::RationalBlock {
            // Reserve the rest of the ten-block so the next group starts
            // on a stable boundary.
            if let Some(&highest) = numbers.iter().max() {
                let block_end = ((highest / 10) + 1) * 10;
                for n in highest + 1..block_end {
                    self.assigned.insert(n);
                }
            }
        }
        debug!(
            "[NUMBERING] Assigned {:?} (mode {:?}, start {})",
            numbers, mode, start
        );
        numbers
    }

    pub fn external(&self) -> &BTreeSet<u32> {
        &self.external
    }
}

/// Globally reassign AUTO channels (destructive): sort by the caller's
/// priority key, assign contiguous numbers from `range_start`, still
/// skipping externals. Returns `(channel_id, new_number)` pairs.
pub fn global_reassign<T, K: Ord>(
    channels: &[T],
    id_of: impl Fn(&T) -> i64,
    priority_key: impl Fn(&T) -> K,
    range_start: u32,
    external: &BTreeSet<u32>,
) -> Vec<(i64, u32)> {
    let mut ordered: Vec<&T> = channels.iter().collect();
    ordered.sort_by(|a, b| priority_key(a).cmp(&priority_key(b)));

    let mut assigner = NumberAssigner::new(external.clone(), &[]);
    ordered
        .into_iter()
        .map(|channel| (id_of(channel), assigner.next_from(range_start)))
        .collect()
}
