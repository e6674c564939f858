// Copyright 2026 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::error::PersistenceError;
use bincode::Options;
use nym_replay_log::indices::LogIndices;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use std::{fs, io};
use tracing::{debug, error, info};

pub(crate) const CURRENT_SNAPSHOT_VERSION: u8 = 1;

/// Create explicit bincode options for consistent serialization across
/// versions.
fn make_bincode_serializer() -> impl bincode::Options {
    bincode::DefaultOptions::new()
        .with_big_endian()
        .with_varint_encoding()
}

/// On-disk form of the log: both indices together with a format version so
/// incompatible snapshots are rejected rather than misread.
#[derive(Deserialize)]
struct Snapshot {
    version: u8,
    indices: LogIndices,
}

// serialized counterpart of [`Snapshot`] that borrows the live indices
// instead of cloning them for the duration of the flush
#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u8,
    indices: &'a LogIndices,
}

/// Path the snapshot is written to before being moved into its final
/// location. A file left behind under this name did not complete its flush
/// and its data cannot be trusted.
pub(crate) fn temp_flush_path(snapshot_path: &Path) -> PathBuf {
    let mut path = snapshot_path.to_path_buf().into_os_string();
    path.push(".flush");
    PathBuf::from(path)
}

fn io_failure(path: &Path) -> impl FnOnce(io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::SnapshotIoFailure {
        source,
        path: path.to_path_buf(),
    }
}

/// Writes the snapshot for the provided indices, first to the temporary
/// flush location and only then renamed into place, so that a crash mid-write
/// never corrupts the previous snapshot.
pub(crate) fn flush(snapshot_path: &Path, indices: &LogIndices) -> Result<(), PersistenceError> {
    debug!("flushing replay log snapshot to disk...");
    let start = Instant::now();

    if let Some(parent) = snapshot_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_failure(parent))?;
        }
    }

    let data = make_bincode_serializer()
        .serialize(&SnapshotRef {
            version: CURRENT_SNAPSHOT_VERSION,
            indices,
        })
        .map_err(|source| PersistenceError::SnapshotSerialization { source })?;

    let temp_path = temp_flush_path(snapshot_path);
    fs::write(&temp_path, data).map_err(io_failure(&temp_path))?;
    fs::rename(&temp_path, snapshot_path).map_err(io_failure(snapshot_path))?;

    debug!(
        "flushed replay log snapshot to disk in {:?}",
        start.elapsed()
    );
    Ok(())
}

/// Loads the snapshot at `snapshot_path`, returning `None` when none was
/// ever written. A leftover temporary flush file is removed on the way: it
/// belongs to a flush that never completed.
pub(crate) fn load(snapshot_path: &Path) -> Result<Option<LogIndices>, PersistenceError> {
    let temp_path = temp_flush_path(snapshot_path);
    if temp_path.exists() {
        error!(
            "replay log snapshot at '{}' didn't get successfully flushed to disk and its data got corrupted",
            temp_path.display()
        );
        fs::remove_file(&temp_path).map_err(io_failure(&temp_path))?;
    }

    if !snapshot_path.exists() {
        return Ok(None);
    }

    let data = fs::read(snapshot_path).map_err(io_failure(snapshot_path))?;
    let snapshot: Snapshot = make_bincode_serializer().deserialize(&data).map_err(|source| {
        PersistenceError::SnapshotDeserialization {
            source,
            path: snapshot_path.to_path_buf(),
        }
    })?;

    if snapshot.version != CURRENT_SNAPSHOT_VERSION {
        return Err(PersistenceError::UnsupportedSnapshotVersion {
            path: snapshot_path.to_path_buf(),
            version: snapshot.version,
        });
    }

    info!(
        "loaded replay log snapshot with {} entries",
        snapshot.indices.entry_count()
    );
    Ok(Some(snapshot.indices))
}
