// Copyright 2026 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

//! Snapshot-backed [`ReplayLog`] whose replay-protection and batch
//! idempotency guarantees survive process restarts.
//!
//! Both log indices are written out as a single versioned snapshot file
//! after every successful mutating operation, using the
//! write-to-temp-then-rename discipline, so whatever point the process
//! crashes at, the next start observes either the previous snapshot or the
//! new one, never a torn write. Restarting and resubmitting the in-flight
//! batch then returns the originally computed replay set without any entry
//! being counted twice.
//!
//! The snapshot is rewritten wholesale, which is deliberate: the log is
//! small (20 bytes + a value per forwarded packet, garbage-collected by the
//! caller through `delete`) and the full rewrite is what lets a later flush
//! repair an earlier failed one.

use nym_replay_log::indices::LogIndices;
use nym_replay_log::{PacketBatch, ReplayLog, ReplayLogError, ReplaySet, ReplayTag};
use parking_lot::Mutex;
use std::path::PathBuf;
use tracing::{debug, info};

mod error;
mod snapshot;

pub use error::PersistenceError;

/// Durable [`ReplayLog`] implementation backed by a snapshot file.
///
/// Selected at construction time wherever a [`MemoryReplayLog`] would
/// otherwise be used; the contract and its concurrency guarantees are
/// identical, with one mutex held across the whole of every operation.
///
/// [`MemoryReplayLog`]: nym_replay_log::MemoryReplayLog
#[derive(Debug)]
pub struct PersistentReplayLog {
    snapshot_path: PathBuf,
    state: Mutex<Option<LogIndices>>,
}

impl PersistentReplayLog {
    /// Creates a log persisting itself to `snapshot_path`. Nothing is read
    /// or written until [`start`](ReplayLog::start).
    pub fn new<P: Into<PathBuf>>(snapshot_path: P) -> Self {
        PersistentReplayLog {
            snapshot_path: snapshot_path.into(),
            state: Mutex::new(None),
        }
    }

    /// Number of entries currently stored. Exposed for metrics and for
    /// idempotency probes in tests.
    pub fn entry_count(&self) -> Result<usize, ReplayLogError> {
        let guard = self.state.lock();
        let indices = guard.as_ref().ok_or(ReplayLogError::NotStarted)?;
        Ok(indices.entry_count())
    }

    fn flush(&self, indices: &LogIndices) -> Result<(), PersistenceError> {
        snapshot::flush(&self.snapshot_path, indices)
    }
}

impl ReplayLog for PersistentReplayLog {
    fn start(&self) -> Result<(), ReplayLogError> {
        let mut guard = self.state.lock();

        let indices = match snapshot::load(&self.snapshot_path)? {
            Some(indices) => indices,
            None => {
                info!(
                    "no replay log snapshot at '{}', starting empty",
                    self.snapshot_path.display()
                );
                LogIndices::new()
            }
        };

        *guard = Some(indices);
        Ok(())
    }

    fn stop(&self) -> Result<(), ReplayLogError> {
        let mut guard = self.state.lock();
        let indices = guard.as_ref().ok_or(ReplayLogError::NotStarted)?;

        // final flush so that anything the periodic per-mutation flushes
        // missed (after an earlier I/O failure) still makes it out
        self.flush(indices)?;
        *guard = None;

        debug!("stopped persistent replay log");
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

        indices.put(tag, expiry)?;
        self.flush(indices)?;
        Ok(())
    }

    fn delete(&self, tag: &ReplayTag) -> Result<(), ReplayLogError> {
        let mut guard = self.state.lock();
        let indices = guard.as_mut().ok_or(ReplayLogError::NotStarted)?;

        if indices.delete(tag) {
            self.flush(indices)?;
        }
        Ok(())
    }

    fn put_batch(&self, batch: &mut PacketBatch) -> Result<ReplaySet, ReplayLogError> {
        let mut guard = self.state.lock();
        let indices = guard.as_mut().ok_or(ReplayLogError::NotStarted)?;

        // a commit that merely hits the result cache changes nothing worth
        // flushing
        let fresh_commit = indices.batch_result(batch.id()).is_none();
        let replays = indices.commit_batch(batch)?;

        if fresh_commit {
            // a failure here leaves the commit applied in memory but not on
            // disk; the snapshot catches up on the next successful flush
            // (at the latest the one in `stop`)
            self.flush(indices)?;
        }

        Ok(replays)
    }
}
