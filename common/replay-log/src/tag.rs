// Copyright 2026 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{self, Debug, Display, Formatter, Write};

/// Number of bytes of the truncated shared-secret digest used as the index
/// key of the replay log.
pub const REPLAY_TAG_SIZE: usize = 20;

/// Size of the per-hop shared secret produced by the ECDH layer.
pub const SHARED_SECRET_SIZE: usize = 32;

/// The first [`REPLAY_TAG_SIZE`] bytes of the SHA-256 digest of a per-hop
/// shared secret, used to detect duplicate sphinx packets.
///
/// The digest algorithm and the truncation length are fixed: a log persisted
/// by one implementation must remain readable by every other.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReplayTag([u8; REPLAY_TAG_SIZE]);

impl ReplayTag {
    /// Derives the replay tag for the provided shared secret.
    ///
    /// Identical secrets always produce identical tags. A collision between
    /// distinct secrets is cryptographically negligible and is not treated
    /// as a separate condition anywhere in the log.
    pub fn from_shared_secret(shared_secret: &[u8; SHARED_SECRET_SIZE]) -> Self {
        let digest = Sha256::digest(shared_secret);

        let mut tag = [0u8; REPLAY_TAG_SIZE];
        tag.copy_from_slice(&digest[..REPLAY_TAG_SIZE]);
        ReplayTag(tag)
    }

    pub fn from_bytes(bytes: [u8; REPLAY_TAG_SIZE]) -> Self {
        ReplayTag(bytes)
    }

    pub fn to_bytes(&self) -> [u8; REPLAY_TAG_SIZE] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; REPLAY_TAG_SIZE] {
        &self.0
    }

    fn to_hex(self) -> String {
        self.0
            .iter()
            .fold(String::with_capacity(self.0.len() * 2), |mut acc, byte| {
                let _ = write!(acc, "{byte:02x}");
                acc
            })
    }
}

impl From<[u8; REPLAY_TAG_SIZE]> for ReplayTag {
    fn from(bytes: [u8; REPLAY_TAG_SIZE]) -> Self {
        ReplayTag(bytes)
    }
}

impl Display for ReplayTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Debug for ReplayTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ReplayTag({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_matches_truncated_sha256() {
        // independently computed: sha256(0x42 * 32)[..20]
        let expected = [
            0x42, 0x5e, 0xd4, 0xe4, 0xa3, 0x6b, 0x30, 0xea, 0x21, 0xb9, 0x0e, 0x21, 0xc7, 0x12,
            0xc6, 0x49, 0xe8, 0x21, 0x4c, 0x29,
        ];

        let tag = ReplayTag::from_shared_secret(&[0x42; SHARED_SECRET_SIZE]);
        assert_eq!(tag.to_bytes(), expected);

        // and sha256(0x00 0x01 .. 0x1f)[..20]
        let mut secret = [0u8; SHARED_SECRET_SIZE];
        for (i, byte) in secret.iter_mut().enumerate() {
            *byte = i as u8;
        }
        let expected = [
            0x63, 0x0d, 0xcd, 0x29, 0x66, 0xc4, 0x33, 0x66, 0x91, 0x12, 0x54, 0x48, 0xbb, 0xb2,
            0x5b, 0x4f, 0xf4, 0x12, 0xa4, 0x9c,
        ];
        assert_eq!(ReplayTag::from_shared_secret(&secret).to_bytes(), expected);
    }

    #[test]
    fn derivation_is_deterministic() {
        let secret = [123u8; SHARED_SECRET_SIZE];
        assert_eq!(
            ReplayTag::from_shared_secret(&secret),
            ReplayTag::from_shared_secret(&secret)
        );
    }

    #[test]
    fn hex_rendering() {
        let tag = ReplayTag::from_shared_secret(&[0x42; SHARED_SECRET_SIZE]);
        assert_eq!(tag.to_string(), "425ed4e4a36b30ea21b90e21c712c649e8214c29");
    }
}
