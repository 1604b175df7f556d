// src/llm/client.rs

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::llm::prompt::build_prompt;
use crate::llm::transport::{HttpTransport, LlmTransport};
use crate::record::FailurePayload;

const MAX_RETRIES: usize = 2;

/// Ordinal confidence attached to a diagnosis, Low < Medium < High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// The structured diagnosis the reasoning service must produce. Extra
/// response fields are tolerated; a missing field, wrong type, or
/// out-of-enum confidence fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub root_cause: String,
    pub likely_reason: String,
    pub suggested_fix: String,
    pub confidence: Confidence,
}

impl Explanation {
    /// Returned when the reasoning service cannot be used. Never cached.
    pub fn fallback() -> Self {
        Self {
            root_cause: "Unable to determine root cause".into(),
            likely_reason: "LLM analysis failed".into(),
            suggested_fix: "Review stack trace and test logs manually".into(),
            confidence: Confidence::Low,
        }
    }
}

/// Model tiers and the trace-length threshold that picks between them.
/// A latency/cost trade-off, not a correctness requirement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub fast_model: String,
    pub capable_model: String,
    pub trace_threshold: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            fast_model: "claude-3-haiku-20240307".into(),
            capable_model: "claude-3-sonnet-20240229".into(),
            trace_threshold: 800,
        }
    }
}

pub struct ExplainClient {
    cfg: ClientConfig,
    transport: Box<dyn LlmTransport>,
}

impl ExplainClient {
    /// Production client. Errors only on missing credential (fatal at
    /// startup, never a runtime condition).
    pub fn new() -> Result<Self, String> {
        let transport = HttpTransport::from_env()?;
        let cfg = load_config().unwrap_or_default();
        Ok(Self::with_transport(cfg, Box::new(transport)))
    }

    pub fn with_transport(cfg: ClientConfig, transport: Box<dyn LlmTransport>) -> Self {
        Self { cfg, transport }
    }

    /// Asks the reasoning service for a diagnosis. Fails only after the
    /// attempt budget is exhausted, wrapping the last underlying error.
    pub fn explain(&self, payload: &FailurePayload) -> Result<Explanation, String> {
        let model = select_model(&self.cfg, &payload.failure.stack_trace);
        let prompt = build_prompt(payload)?;

        let mut last_err = String::new();
        for attempt in 1..=MAX_RETRIES + 1 {
            match self.attempt(model, &prompt) {
                Ok(explanation) => return Ok(explanation),
                Err(e) => {
                    log::debug!("explain attempt {attempt} failed: {e}");
                    last_err = e;
                }
            }
        }

        Err(format!(
            "explain failed after {} attempts: {}",
            MAX_RETRIES + 1,
            last_err
        ))
    }

    fn attempt(
        &self,
        model: &str,
        prompt: &crate::llm::prompt::LlmPrompt,
    ) -> Result<Explanation, String> {
        let raw = self.transport.send(model, prompt)?;
        let cleaned =
            extract_json(&raw).ok_or_else(|| "No JSON object found in LLM response".to_string())?;

        serde_json::from_str::<Explanation>(cleaned)
            .map_err(|e| format!("LLM response does not match explanation schema: {e}"))
    }
}

/// Short traces go to the cheaper/faster tier, long ones to the capable
/// tier.
pub fn select_model<'a>(cfg: &'a ClientConfig, stack_trace: &str) -> &'a str {
    if stack_trace.len() < cfg.trace_threshold {
        &cfg.fast_model
    } else {
        &cfg.capable_model
    }
}

/// Slices the first top-level `{...}` out of the raw model text. The
/// system prompt forbids surrounding prose, but models produce it anyway.
/// The closing brace is searched only after the opening one, so a stray
/// `}` ahead of the object cannot produce an inverted slice.
pub fn extract_json(raw: &str) -> Option<&str> {
    let s = raw.find('{')?;
    let e = raw[s..].rfind('}')?;
    Some(&raw[s..=s + e])
}

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("failsight/llm.json")
}

fn load_config() -> Option<ClientConfig> {
    fs::read_to_string(config_path())
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FailureRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedTransport {
        responses: Mutex<Vec<Result<String, String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<String, String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl LlmTransport for ScriptedTransport {
        fn send(
            &self,
            _model: &str,
            _prompt: &crate::llm::prompt::LlmPrompt,
        ) -> Result<String, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Err("script exhausted".into())
            } else {
                responses.remove(0)
            }
        }
    }

    fn payload_with_trace(trace: &str) -> FailurePayload {
        FailurePayload::from_record(&FailureRecord {
            test_title: "t".into(),
            file: "f".into(),
            error_message: "boom".into(),
            stack_trace: trace.into(),
            ..Default::default()
        })
    }

    const GOOD_BODY: &str = r#"{"root_cause":"a","likely_reason":"b","suggested_fix":"c","confidence":"High"}"#;

    #[test]
    fn short_trace_selects_fast_tier() {
        let cfg = ClientConfig::default();
        let trace = "x".repeat(799);
        assert_eq!(select_model(&cfg, &trace), cfg.fast_model);
    }

    #[test]
    fn trace_at_threshold_selects_capable_tier() {
        let cfg = ClientConfig::default();
        let trace = "x".repeat(800);
        assert_eq!(select_model(&cfg, &trace), cfg.capable_model);
    }

    #[test]
    fn extract_json_tolerates_surrounding_prose() {
        let raw = format!("Sure! Here you go:\n{GOOD_BODY}\nHope that helps.");
        assert_eq!(extract_json(&raw), Some(GOOD_BODY));
    }

    #[test]
    fn extract_json_fails_without_braces() {
        assert_eq!(extract_json("no object here"), None);
    }

    #[test]
    fn extract_json_rejects_closing_brace_before_first_open() {
        // malformed output must consume an attempt, not unwind
        assert_eq!(extract_json("a} b {"), None);
        assert_eq!(extract_json("}"), None);
    }

    #[test]
    fn extract_json_ignores_stray_brace_ahead_of_object() {
        let raw = format!("oops}} then {GOOD_BODY}");
        assert_eq!(extract_json(&raw), Some(GOOD_BODY));
    }

    #[test]
    fn succeeds_on_third_attempt_after_two_failures() {
        let transport = ScriptedTransport::new(vec![
            Err("connection reset".into()),
            Err("connection reset".into()),
            Ok(GOOD_BODY.into()),
        ]);
        let client = ExplainClient::with_transport(ClientConfig::default(), Box::new(transport));

        let out = client.explain(&payload_with_trace("")).unwrap();
        assert_eq!(out.root_cause, "a");
        assert_eq!(out.confidence, Confidence::High);
    }

    #[test]
    fn fails_after_exhausting_all_attempts() {
        let transport = ScriptedTransport::new(vec![
            Err("e1".into()),
            Err("e2".into()),
            Err("e3".into()),
        ]);
        let client = ExplainClient::with_transport(ClientConfig::default(), Box::new(transport));

        let err = client.explain(&payload_with_trace("")).unwrap_err();
        assert!(err.contains("after 3 attempts"));
        assert!(err.contains("e3"));
    }

    #[test]
    fn malformed_braces_consume_a_retry_attempt() {
        let transport =
            ScriptedTransport::new(vec![Ok("a} b {".into()), Ok(GOOD_BODY.into())]);
        let client = ExplainClient::with_transport(ClientConfig::default(), Box::new(transport));

        let out = client.explain(&payload_with_trace("")).unwrap();
        assert_eq!(out.root_cause, "a");
    }

    #[test]
    fn missing_schema_fields_consume_a_retry_attempt() {
        let transport = ScriptedTransport::new(vec![
            Ok(r#"{"root_cause":"x"}"#.into()),
            Ok(GOOD_BODY.into()),
        ]);
        let client = ExplainClient::with_transport(ClientConfig::default(), Box::new(transport));

        let out = client.explain(&payload_with_trace("")).unwrap();
        assert_eq!(out.root_cause, "a");
    }

    #[test]
    fn unknown_confidence_value_is_a_validation_failure() {
        let bad = r#"{"root_cause":"a","likely_reason":"b","suggested_fix":"c","confidence":"Certain"}"#;
        let transport =
            ScriptedTransport::new(vec![Ok(bad.into()), Ok(bad.into()), Ok(bad.into())]);
        let client = ExplainClient::with_transport(ClientConfig::default(), Box::new(transport));

        assert!(client.explain(&payload_with_trace("")).is_err());
    }

    #[test]
    fn confidence_is_ordinal() {
        assert!(Confidence::Low < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::High);
    }
}
