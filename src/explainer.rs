// src/explainer.rs
//
// Single entry point used per failed test: cache lookup, payload build,
// client call, fallback.

use crate::cache::{fingerprint, FingerprintCache};
use crate::llm::client::{ExplainClient, Explanation};
use crate::record::{FailurePayload, FailureRecord};

pub struct FailureExplainer {
    cache: FingerprintCache,
    client: ExplainClient,
}

impl FailureExplainer {
    pub fn new(client: ExplainClient) -> Self {
        Self {
            cache: FingerprintCache::new(),
            client,
        }
    }

    /// Total: always resolves to a real or fallback explanation. A failed
    /// client call is swallowed here so one bad diagnosis never aborts
    /// the run, and the fallback is never written to the cache.
    pub fn process_failure(&self, record: &FailureRecord) -> Explanation {
        let digest = fingerprint(&record.error_message, &record.stack_trace);

        if let Some(cached) = self.cache.get(&digest) {
            log::debug!("fingerprint cache hit for {digest}");
            return cached;
        }

        let payload = FailurePayload::from_record(record);
        match self.client.explain(&payload) {
            Ok(explanation) => {
                self.cache.set(digest, explanation.clone());
                explanation
            }
            Err(e) => {
                log::warn!("explanation degraded to fallback: {e}");
                Explanation::fallback()
            }
        }
    }
}
