// Copyright 2026 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use nym_replay_log::ReplayLogError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to access the replay log snapshot at '{path}': {source}")]
    SnapshotIoFailure { path: PathBuf, source: io::Error },

    #[error("failed to serialize the replay log snapshot: {source}")]
    SnapshotSerialization { source: bincode::Error },

    #[error("failed to deserialize the replay log snapshot at '{path}': {source}")]
    SnapshotDeserialization {
        path: PathBuf,
        source: bincode::Error,
    },

    #[error("the replay log snapshot at '{path}' uses unsupported format version {version}")]
    UnsupportedSnapshotVersion { path: PathBuf, version: u8 },
}

impl From<PersistenceError> for ReplayLogError {
    fn from(err: PersistenceError) -> Self {
        ReplayLogError::storage_failure(err)
    }
}
