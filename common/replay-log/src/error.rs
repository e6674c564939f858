// Copyright 2026 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayLogError {
    /// An operation other than `start` was invoked before the log was
    /// started or after it was stopped. The caller recovers by starting the
    /// log.
    #[error("the replay log has not been started")]
    NotStarted,

    /// Normal negative result of a lookup, not a fault.
    #[error("the requested entry is not present in the log")]
    EntryNotFound,

    /// The tag is already present in the log: the packet was processed
    /// before. This is the detection signal itself; batch commits translate
    /// it into replay-set membership instead of propagating it.
    #[error("the packet has already been processed")]
    ReplayedPacket,

    /// Unexpected failure of the backing store. Fatal to the current
    /// delivery attempt; the caller should retry the whole batch.
    #[error("replay log backing store failure: {source}")]
    StorageFailure {
        source: Box<dyn Error + Send + Sync>,
    },
}

impl ReplayLogError {
    pub fn storage_failure<E>(source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        ReplayLogError::StorageFailure {
            source: Box::new(source),
        }
    }

    /// True for [`ReplayLogError::ReplayedPacket`], i.e. when an insertion
    /// failed because the packet was seen before.
    pub fn is_replay(&self) -> bool {
        matches!(self, ReplayLogError::ReplayedPacket)
    }
}
