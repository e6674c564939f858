// Copyright 2026 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::batch::{PacketBatch, ReplaySet};
use crate::error::ReplayLogError;
use crate::tag::ReplayTag;

/// A log of incoming sphinx packets providing strong replay protection.
///
/// The contract is deliberately general to leave implementations
/// near-complete autonomy over their backing store; the in-memory
/// [`MemoryReplayLog`] is the reference, durable variants plug in behind the
/// same trait and are selected at construction time.
///
/// Every method must be safe for concurrent invocation from multiple
/// forwarding workers; implementations serialize access to their internal
/// indices. None of the operations perform network I/O and there is no
/// cancellation concept at this layer; each call runs to completion or
/// fails.
///
/// [`MemoryReplayLog`]: crate::memory::MemoryReplayLog
pub trait ReplayLog: Send + Sync {
    /// Allocates or opens the backing indices. Must be called before any
    /// other operation.
    fn start(&self) -> Result<(), ReplayLogError>;

    /// Safely shuts the log down, releasing the backing indices. Entries
    /// that were never durably persisted are lost.
    fn stop(&self) -> Result<(), ReplayLogError>;

    /// Retrieves the expiry value stored for `tag`. Returns
    /// [`ReplayLogError::EntryNotFound`] when the tag was never inserted.
    fn get(&self, tag: &ReplayTag) -> Result<u32, ReplayLogError>;

    /// Stores a new entry. Returns [`ReplayLogError::ReplayedPacket`] when
    /// the tag already exists, which is the core detection signal for
    /// callers processing packets one at a time. The stored value is never
    /// overwritten.
    fn put(&self, tag: &ReplayTag, expiry: u32) -> Result<(), ReplayLogError>;

    /// Deletes the entry for `tag`, succeeding silently when it is absent.
    fn delete(&self, tag: &ReplayTag) -> Result<(), ReplayLogError>;

    /// Commits a whole batch of packets, returning the set of entries within
    /// it that are replays and recording it on the batch itself.
    ///
    /// Commits are idempotent per batch id: every commit of batches sharing
    /// an id yields the identical [`ReplaySet`], and only the first performs
    /// any insertion. Concurrent commits under one id never interleave their
    /// insertion passes.
    ///
    /// A backing store failure aborts the commit without rolling back the
    /// entries inserted so far. The caller retries the whole batch; entries
    /// that did make it in then simply surface as replays.
    fn put_batch(&self, batch: &mut PacketBatch) -> Result<ReplaySet, ReplayLogError>;
}
