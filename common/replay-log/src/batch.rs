// Copyright 2026 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::tag::ReplayTag;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Set of batch-local sequence numbers that were recognised as replays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySet {
    seqs: HashSet<u16>,
}

impl ReplaySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags the given sequence number as a replay.
    pub fn insert(&mut self, seq: u16) {
        self.seqs.insert(seq);
    }

    pub fn contains(&self, seq: u16) -> bool {
        self.seqs.contains(&seq)
    }

    /// Extends this set with all sequence numbers of `other` (set union).
    pub fn merge(&mut self, other: &ReplaySet) {
        self.seqs.extend(other.seqs.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.seqs.iter().copied()
    }
}

impl FromIterator<u16> for ReplaySet {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        ReplaySet {
            seqs: iter.into_iter().collect(),
        }
    }
}

/// Single element of a [`PacketBatch`]: the packet's position within the
/// batch, its replay tag and the caller-attached expiry value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchEntry {
    pub seq: u16,
    pub tag: ReplayTag,
    pub expiry: u32,
}

/// An ordered group of packets submitted to the log together, e.g. all
/// forwarding instructions derived from a single block.
///
/// The batch is constructed and owned by the forwarder. Committing it hands
/// the detected replays back through [`replays`](PacketBatch::replays) and
/// flips [`is_committed`](PacketBatch::is_committed); the log additionally
/// retains its own copy of the result keyed by the batch id so that any
/// later commit under the same id observes the identical outcome.
#[derive(Debug, Clone)]
pub struct PacketBatch {
    id: Vec<u8>,
    entries: Vec<BatchEntry>,
    replays: ReplaySet,
    committed: bool,
}

impl PacketBatch {
    /// Creates an empty batch under the provided grouping key (typically a
    /// block hash). The key is opaque to the log.
    pub fn new(id: Vec<u8>) -> Self {
        PacketBatch {
            id,
            entries: Vec::new(),
            replays: ReplaySet::new(),
            committed: false,
        }
    }

    /// Creates a batch carrying replays the caller already knows about, for
    /// instance ones recovered from its own state after a restart. They are
    /// merged into the commit result.
    pub fn with_known_replays(id: Vec<u8>, replays: ReplaySet) -> Self {
        PacketBatch {
            id,
            entries: Vec::new(),
            replays,
            committed: false,
        }
    }

    pub fn push(&mut self, seq: u16, tag: ReplayTag, expiry: u32) {
        self.entries.push(BatchEntry { seq, tag, expiry })
    }

    pub fn id(&self) -> &[u8] {
        &self.id
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn replays(&self) -> &ReplaySet {
        &self.replays
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Records the outcome of a commit. Invoked by [`ReplayLog`]
    /// implementations, not by forwarding code.
    ///
    /// [`ReplayLog`]: crate::log::ReplayLog
    pub fn mark_committed(&mut self, replays: ReplaySet) {
        self.replays = replays;
        self.committed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_a_union() {
        let mut first: ReplaySet = [1, 2, 3].into_iter().collect();
        let second: ReplaySet = [3, 4].into_iter().collect();

        first.merge(&second);

        let expected: ReplaySet = [1, 2, 3, 4].into_iter().collect();
        assert_eq!(first, expected);
        // merging again changes nothing
        first.merge(&second);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn batch_starts_uncommitted() {
        let mut batch = PacketBatch::new(b"block-1".to_vec());
        batch.push(0, ReplayTag::from_bytes([1; 20]), 100);

        assert!(!batch.is_committed());
        assert!(batch.replays().is_empty());
        assert_eq!(batch.entries().len(), 1);
    }

    #[test]
    fn committing_replaces_known_replays() {
        let known: ReplaySet = [5].into_iter().collect();
        let mut batch = PacketBatch::with_known_replays(b"block-2".to_vec(), known);

        let result: ReplaySet = [5, 7].into_iter().collect();
        batch.mark_committed(result.clone());

        assert!(batch.is_committed());
        assert_eq!(batch.replays(), &result);
    }
}
