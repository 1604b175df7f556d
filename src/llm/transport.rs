// src/llm/transport.rs
//
// Wire layer for the reasoning service, behind a seam so the pipeline can
// be exercised without network access.

use std::thread;
use std::time::Duration;

use crossbeam_channel::bounded;
use serde_json::Value;

use crate::llm::prompt::LlmPrompt;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One attempt against the reasoning service. Returns the concatenated
/// text content of the model response; any transport, HTTP, or parse
/// problem is an `Err` for that attempt.
pub trait LlmTransport: Send + Sync {
    fn send(&self, model: &str, prompt: &LlmPrompt) -> Result<String, String>;
}

/// First-to-settle race between `f` and a wall-clock timer. The losing
/// computation keeps running on its worker thread; its result is dropped
/// when the channel closes.
pub fn race_timeout<T, F>(timeout: Duration, f: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        let _ = tx.send(f());
    });

    rx.recv_timeout(timeout)
        .map_err(|_| format!("LLM request timed out after {}ms", timeout.as_millis()))
}

pub struct HttpTransport {
    api_key: String,
    base_url: String,
    http: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Fails when no credential is present: no request could ever succeed,
    /// so this surfaces at construction instead of per call.
    pub fn from_env() -> Result<Self, String> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| "ANTHROPIC_API_KEY is not set in environment".to_string())?;

        // Same bound as the race so an abandoned attempt terminates
        // instead of leaking its thread on a dead connection.
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| e.to_string())?;

        Ok(Self {
            api_key,
            base_url: "https://api.anthropic.com/v1/messages".to_string(),
            http,
        })
    }
}

impl LlmTransport for HttpTransport {
    fn send(&self, model: &str, prompt: &LlmPrompt) -> Result<String, String> {
        let http = self.http.clone();
        let api_key = self.api_key.clone();
        let base_url = self.base_url.clone();
        let model = model.to_string();
        let prompt = prompt.clone();

        race_timeout(REQUEST_TIMEOUT, move || {
            send_once(&http, &base_url, &api_key, &model, &prompt)
        })?
    }
}

fn send_once(
    http: &reqwest::blocking::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    prompt: &LlmPrompt,
) -> Result<String, String> {
    let body = serde_json::json!({
        "model": model,
        "max_tokens": 512,
        "system": prompt.system,
        "messages": [
            { "role": "user", "content": prompt.user }
        ]
    });

    let resp = http
        .post(base_url)
        .header("x-api-key", api_key)
        .header("anthropic-version", "2023-06-01")
        .json(&body)
        .send()
        .map_err(|e| e.to_string())?;

    let status = resp.status();
    let json: Value = resp.json().map_err(|e| e.to_string())?;

    if !status.is_success() {
        return Err(format!("LLM error {}: {}", status, json));
    }

    extract_text(&json)
}

/// Joins every text block of the response; non-text blocks are skipped.
fn extract_text(v: &Value) -> Result<String, String> {
    let blocks = v
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| "LLM response parse failure".to_string())?;

    Ok(blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect())
}
