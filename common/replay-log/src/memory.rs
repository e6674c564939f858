// Copyright 2026 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::batch::{PacketBatch, ReplaySet};
use crate::error::ReplayLogError;
use crate::indices::LogIndices;
use crate::log::ReplayLog;
use crate::tag::ReplayTag;
use parking_lot::Mutex;
use tracing::debug;

/// [`ReplayLog`] implementation that keeps all added packets and processed
/// batches in memory with no persistence whatsoever.
///
/// This is the reference implementation, designed for use in testing:
/// stopping (or crashing) discards everything, so it cannot uphold the
/// exactly-once guarantee across process restarts. Forwarders that need that
/// guarantee use the snapshot-backed log from the persistence crate instead.
///
/// A single mutex guards both indices and is held for the entire duration of
/// every operation, so batch commits under one id never interleave.
#[derive(Debug, Default)]
pub struct MemoryReplayLog {
    state: Mutex<Option<LogIndices>>,
}

impl MemoryReplayLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently stored. Exposed for metrics and for
    /// idempotency probes in tests.
    pub fn entry_count(&self) -> Result<usize, ReplayLogError> {
        let guard = self.state.lock();
        let indices = guard.as_ref().ok_or(ReplayLogError::NotStarted)?;
        Ok(indices.entry_count())
    }
}

impl ReplayLog for MemoryReplayLog {
    fn start(&self) -> Result<(), ReplayLogError> {
        debug!("starting in-memory replay log");
        *self.state.lock() = Some(LogIndices::new());
        Ok(())
    }

    fn stop(&self) -> Result<(), ReplayLogError> {
        let mut guard = self.state.lock();
        if guard.take().is_none() {
            return Err(ReplayLogError::NotStarted);
        }

        debug!("stopped in-memory replay log");
        Ok(())
    }

    fn get(&self, tag: &ReplayTag) -> Result<u32, ReplayLogError> {
        let guard = self.state.lock();
        let indices = guard.as_ref().ok_or(ReplayLogError::NotStarted)?;
        indices.get(tag)
    }

    fn put(&self, tag: &ReplayTag, expiry: u32) -> Result<(), ReplayLogError> {
        let mut guard = self.state.lock();
        let indices = guard.as_mut().ok_or(ReplayLogError::NotStarted)?;
        indices.put(tag, expiry)
    }

    fn delete(&self, tag: &ReplayTag) -> Result<(), ReplayLogError> {
        let mut guard = self.state.lock();
        let indices = guard.as_mut().ok_or(ReplayLogError::NotStarted)?;
        indices.delete(tag);
        Ok(())
    }

    fn put_batch(&self, batch: &mut PacketBatch) -> Result<ReplaySet, ReplayLogError> {
        let mut guard = self.state.lock();
        let indices = guard.as_mut().ok_or(ReplayLogError::NotStarted)?;
        indices.commit_batch(batch)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rand::{Rng, RngCore};
    use std::sync::Arc;
    use std::thread;

    fn started_log() -> MemoryReplayLog {
        let log = MemoryReplayLog::new();
        log.start().unwrap();
        log
    }

    fn random_tag() -> ReplayTag {
        let mut secret = [0u8; crate::tag::SHARED_SECRET_SIZE];
        rand::thread_rng().fill_bytes(&mut secret);
        ReplayTag::from_shared_secret(&secret)
    }

    #[test]
    fn get_fails_for_an_unknown_tag() {
        let log = started_log();

        assert!(matches!(
            log.get(&random_tag()),
            Err(ReplayLogError::EntryNotFound)
        ));
    }

    #[test]
    fn put_stores_and_rejects_duplicates() {
        let log = started_log();
        let tag = random_tag();

        log.put(&tag, 10).unwrap();
        assert_eq!(log.get(&tag).unwrap(), 10);

        // second insert is rejected and the stored value stays untouched
        assert!(matches!(
            log.put(&tag, 99),
            Err(ReplayLogError::ReplayedPacket)
        ));
        assert_eq!(log.get(&tag).unwrap(), 10);
    }

    #[test]
    fn delete_removes_the_entry_and_ignores_absent_tags() {
        let log = started_log();
        let tag = random_tag();

        // deleting something that was never there is fine
        log.delete(&tag).unwrap();

        log.put(&tag, 42).unwrap();
        log.delete(&tag).unwrap();
        assert!(matches!(
            log.get(&tag),
            Err(ReplayLogError::EntryNotFound)
        ));

        // and the tag may be inserted again afterwards
        log.put(&tag, 43).unwrap();
        assert_eq!(log.get(&tag).unwrap(), 43);
    }

    #[test]
    fn operations_fail_before_start_and_after_stop() {
        let assert_not_started = |log: &MemoryReplayLog| {
            let tag = random_tag();
            assert!(matches!(log.get(&tag), Err(ReplayLogError::NotStarted)));
            assert!(matches!(
                log.put(&tag, 1),
                Err(ReplayLogError::NotStarted)
            ));
            assert!(matches!(log.delete(&tag), Err(ReplayLogError::NotStarted)));

            let mut batch = PacketBatch::new(b"block".to_vec());
            assert!(matches!(
                log.put_batch(&mut batch),
                Err(ReplayLogError::NotStarted)
            ));
        };

        let log = MemoryReplayLog::new();
        assert_not_started(&log);
        assert!(matches!(log.stop(), Err(ReplayLogError::NotStarted)));

        log.start().unwrap();
        log.stop().unwrap();
        assert_not_started(&log);
        assert!(matches!(log.stop(), Err(ReplayLogError::NotStarted)));
    }

    #[test]
    fn batch_detects_replays_within_itself() {
        let log = started_log();
        let tag_a = random_tag();
        let tag_b = random_tag();

        let mut batch = PacketBatch::new(b"block-1".to_vec());
        batch.push(1, tag_a, 10);
        batch.push(2, tag_b, 20);
        batch.push(3, tag_a, 30);

        let replays = log.put_batch(&mut batch).unwrap();

        let expected: ReplaySet = [3].into_iter().collect();
        assert_eq!(replays, expected);
        assert!(batch.is_committed());
        assert_eq!(batch.replays(), &replays);

        // first writer wins
        assert_eq!(log.get(&tag_a).unwrap(), 10);
        assert_eq!(log.get(&tag_b).unwrap(), 20);
    }

    #[test]
    fn batch_merges_caller_supplied_replays() {
        let log = started_log();

        let known: ReplaySet = [5].into_iter().collect();
        let mut batch = PacketBatch::with_known_replays(b"block-2".to_vec(), known.clone());
        batch.push(1, random_tag(), 10);

        let replays = log.put_batch(&mut batch).unwrap();
        assert_eq!(replays, known);
    }

    #[test]
    fn batch_commit_is_idempotent() {
        let log = started_log();
        let tag_a = random_tag();
        let tag_b = random_tag();

        let mut batch = PacketBatch::new(b"block-3".to_vec());
        batch.push(1, tag_a, 10);
        batch.push(2, tag_b, 20);
        batch.push(3, tag_a, 30);

        let first = log.put_batch(&mut batch).unwrap();
        let entries_after_first = log.entry_count().unwrap();

        // resubmission of the same id must return the identical result
        // without inserting anything new, regardless of the batch content
        let mut resubmitted = PacketBatch::new(b"block-3".to_vec());
        resubmitted.push(1, tag_a, 10);
        resubmitted.push(2, tag_b, 20);
        resubmitted.push(3, tag_a, 30);

        let second = log.put_batch(&mut resubmitted).unwrap();

        assert_eq!(first, second);
        assert_eq!(log.entry_count().unwrap(), entries_after_first);
        assert!(resubmitted.is_committed());
    }

    #[test]
    fn empty_batch_commits_to_an_empty_set() {
        let log = started_log();

        let mut batch = PacketBatch::new(b"empty".to_vec());
        let replays = log.put_batch(&mut batch).unwrap();

        assert!(replays.is_empty());
        assert!(batch.is_committed());
        assert_eq!(log.entry_count().unwrap(), 0);

        // the trivial result is cached like any other
        let mut again = PacketBatch::new(b"empty".to_vec());
        assert!(log.put_batch(&mut again).unwrap().is_empty());
    }

    #[test]
    fn replay_detection_is_global_across_batches() {
        let log = started_log();
        let shared = random_tag();

        let mut first = PacketBatch::new(b"block-4".to_vec());
        first.push(1, shared, 10);
        log.put_batch(&mut first).unwrap();

        // a different batch id does not shield a previously seen tag
        let mut second = PacketBatch::new(b"block-5".to_vec());
        second.push(7, shared, 20);
        let replays = log.put_batch(&mut second).unwrap();

        let expected: ReplaySet = [7].into_iter().collect();
        assert_eq!(replays, expected);
        assert_eq!(log.get(&shared).unwrap(), 10);
    }

    #[test]
    fn concurrent_puts_of_one_tag_succeed_exactly_once() {
        let log = Arc::new(started_log());
        let tag = random_tag();

        let mut handles = Vec::new();
        for i in 0..16u32 {
            let log = Arc::clone(&log);
            handles.push(thread::spawn(move || log.put(&tag, i).is_ok()));
        }

        let successes = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|succeeded| *succeeded)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(log.entry_count().unwrap(), 1);
    }

    #[test]
    fn concurrent_commits_of_one_batch_id_agree() {
        let log = Arc::new(started_log());

        let entries: Vec<_> = (0..64u16)
            .map(|seq| {
                let expiry = rand::thread_rng().gen();
                // every 4th entry duplicates the previous tag
                if seq % 4 == 3 {
                    (seq, None, expiry)
                } else {
                    (seq, Some(random_tag()), expiry)
                }
            })
            .collect();

        let build_batch = |entries: &[(u16, Option<ReplayTag>, u32)]| {
            let mut batch = PacketBatch::new(b"contended-block".to_vec());
            let mut previous = None;
            for (seq, tag, expiry) in entries {
                let tag = (*tag).or(previous).unwrap();
                batch.push(*seq, tag, *expiry);
                previous = Some(tag);
            }
            batch
        };

        let mut handles = Vec::new();
        for _ in 0..8 {
            let log = Arc::clone(&log);
            let entries = entries.clone();
            handles.push(thread::spawn(move || {
                let mut batch = build_batch(&entries);
                log.put_batch(&mut batch).unwrap()
            }));
        }

        let results: Vec<ReplaySet> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        // every caller observed the identical result...
        for result in &results {
            assert_eq!(result, &results[0]);
        }
        let expected: ReplaySet = (3u16..64).step_by(4).collect();
        assert_eq!(results[0], expected);

        // ...and exactly one insertion pass took place
        assert_eq!(log.entry_count().unwrap(), 48);
    }
}
