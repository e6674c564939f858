// Copyright 2026 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::batch::{PacketBatch, ReplaySet};
use crate::error::ReplayLogError;
use crate::tag::ReplayTag;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::trace;

/// The two indices every realization of the log maintains: the entries keyed
/// by replay tag and the result cache of previously committed batches.
///
/// This is the single-threaded heart of the log. Implementations wrap it in
/// their concurrency primitive of choice and, for durable variants, persist
/// it; every contract operation maps onto exactly one method here, executed
/// while holding the wrapping lock.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LogIndices {
    entries: HashMap<ReplayTag, u32>,
    batches: HashMap<Vec<u8>, ReplaySet>,
}

impl LogIndices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the expiry value stored for `tag`.
    pub fn get(&self, tag: &ReplayTag) -> Result<u32, ReplayLogError> {
        self.entries
            .get(tag)
            .copied()
            .ok_or(ReplayLogError::EntryNotFound)
    }

    /// Inserts a new entry. A tag that is already present is rejected with
    /// [`ReplayLogError::ReplayedPacket`] and the stored value is left
    /// untouched.
    pub fn put(&mut self, tag: &ReplayTag, expiry: u32) -> Result<(), ReplayLogError> {
        if self.entries.contains_key(tag) {
            trace!("replayed packet: {tag}");
            return Err(ReplayLogError::ReplayedPacket);
        }

        self.entries.insert(*tag, expiry);
        Ok(())
    }

    /// Removes the entry for `tag`, returning whether it was present.
    /// Removing an absent tag is a no-op.
    pub fn delete(&mut self, tag: &ReplayTag) -> bool {
        self.entries.remove(tag).is_some()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// The cached result of a previous commit under this batch id, if any.
    pub fn batch_result(&self, batch_id: &[u8]) -> Option<&ReplaySet> {
        self.batches.get(batch_id)
    }

    /// Commits a batch of packets and returns the set of entries within it
    /// that are replays.
    ///
    /// A batch id that was committed before short-circuits to the cached
    /// result without touching the entries, which is what makes resubmitting
    /// an in-flight batch after a restart safe. A fresh commit inserts every
    /// entry in order, collecting the sequence numbers of the ones already
    /// present, merges in the replays the caller attached to the batch and
    /// caches the union under the batch id.
    ///
    /// Entries inserted before a storage failure mid-commit are not rolled
    /// back; the caller is expected to retry the whole batch.
    pub fn commit_batch(&mut self, batch: &mut PacketBatch) -> Result<ReplaySet, ReplayLogError> {
        let replays = match self.batches.get(batch.id()) {
            Some(cached) => cached.clone(),
            None => {
                let mut replays = ReplaySet::new();
                for entry in batch.entries() {
                    match self.put(&entry.tag, entry.expiry) {
                        Ok(()) => {}
                        Err(err) if err.is_replay() => replays.insert(entry.seq),
                        Err(err) => return Err(err),
                    }
                }

                replays.merge(batch.replays());
                self.batches.insert(batch.id().to_vec(), replays.clone());
                replays
            }
        };

        batch.mark_committed(replays.clone());
        Ok(replays)
    }
}
