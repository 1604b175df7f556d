// src/cache.rs
//
// Fingerprint cache for failure explanations.

use std::collections::HashMap;
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use crate::llm::client::Explanation;

// Fed to the hasher between the two fields so "ab" + "c" and "a" + "bc"
// cannot collide on the concatenation alone.
const FINGERPRINT_DELIMITER: &str = "::";

/// Stable failure signature over (error message, stack trace).
///
/// Deliberately excludes test title/file/URL: two different tests failing
/// with the identical error and stack share one explanation.
pub fn fingerprint(error_message: &str, stack_trace: &str) -> String {
    let mut h = Sha256::new();
    h.update(error_message.as_bytes());
    h.update(FINGERPRINT_DELIMITER.as_bytes());
    h.update(stack_trace.as_bytes());
    hex::encode(h.finalize())
}

/// Run-scoped map from fingerprint to a validated explanation.
///
/// No eviction: a test run is bounded and failure diversity is small
/// relative to memory. Callers must only `set` explanations that came back
/// from a successful client call, never fallbacks.
#[derive(Default)]
pub struct FingerprintCache {
    map: Mutex<HashMap<String, Explanation>>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, digest: &str) -> Option<Explanation> {
        self.map.lock().unwrap().get(digest).cloned()
    }

    /// Last-write-wins; in practice write-once because callers only set
    /// after a miss.
    pub fn set(&self, digest: String, explanation: Explanation) {
        self.map.lock().unwrap().insert(digest, explanation);
    }

    pub fn has(&self, digest: &str) -> bool {
        self.map.lock().unwrap().contains_key(digest)
    }
}
