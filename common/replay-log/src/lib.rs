// Copyright 2026 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

//! Replay detection for forwarded sphinx packets.
//!
//! Every packet travelling through the forwarder is keyed by the truncated
//! SHA-256 digest of its per-hop shared secret (its [`ReplayTag`]). The
//! [`ReplayLog`] contract answers whether a given key has been processed
//! before; its batch commit makes multi-packet processing idempotent, so a
//! forwarder that crashed mid-batch can resubmit the in-flight batch after
//! restarting and observe the originally computed set of replays without any
//! entry being counted twice.
//!
//! [`MemoryReplayLog`] is the non-durable reference implementation; the
//! sibling persistence crate provides one whose guarantees survive process
//! restarts.

pub mod batch;
pub mod error;
pub mod indices;
pub mod log;
pub mod memory;
pub mod tag;

pub use batch::{BatchEntry, PacketBatch, ReplaySet};
pub use error::ReplayLogError;
pub use log::ReplayLog;
pub use memory::MemoryReplayLog;
pub use tag::{ReplayTag, REPLAY_TAG_SIZE, SHARED_SECRET_SIZE};
