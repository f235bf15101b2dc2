//! Replay fingerprinting — deterministic identification of runs.
//!
//! - `FeedFingerprint`: content hash of the consumed event sequence.
//! - `ReplayFingerprint`: feed + runner settings + handler name, hashed into
//!   a stable run id for reproducibility checks and artifact naming.

use crate::domain::FeedEvent;
use serde::{Deserialize, Serialize};
use std::fmt;

/// BLAKE3 hex digest of a feed's event sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedFingerprint(pub String);

impl fmt::Display for FeedFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Incremental hasher the replay loop feeds events through.
///
/// Events are absorbed in canonical JSON form, so two feeds with identical
/// event sequences hash identically regardless of how they were built.
#[derive(Debug)]
pub struct FingerprintHasher {
    inner: blake3::Hasher,
}

impl FingerprintHasher {
    pub fn new() -> Self {
        Self {
            inner: blake3::Hasher::new(),
        }
    }

    pub fn absorb(&mut self, event: &FeedEvent) {
        let json = serde_json::to_string(event).expect("FeedEvent must serialize");
        self.inner.update(json.as_bytes());
        self.inner.update(b"\n");
    }

    pub fn finish(self) -> FeedFingerprint {
        FeedFingerprint(self.inner.finalize().to_hex().to_string())
    }
}

impl Default for FingerprintHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete identity of a replay: what ran, over which feed, with which
/// settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayFingerprint {
    pub feed: FeedFingerprint,
    pub handler: String,
    pub record_trace: bool,
    pub max_drawings: usize,
}

impl ReplayFingerprint {
    /// Deterministic run hash over the canonical serialization.
    pub fn hash(&self) -> String {
        let json = serde_json::to_string(self).expect("ReplayFingerprint must serialize");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
