// src/llm/prompt.rs

use crate::record::FailurePayload;

#[derive(Debug, Clone)]
pub struct LlmPrompt {
    pub system: String,
    pub user: String,
}

/* ============================================================
   System prompt (stable, reused)
   ============================================================ */

const SYSTEM_PROMPT: &str = r#"You are a test failure analysis expert.
Given a test failure payload, respond with a JSON object only — no prose, no markdown, no code fences.
The JSON must conform exactly to this structure:
{
  "root_cause": "string",
  "likely_reason": "string",
  "suggested_fix": "string",
  "confidence": "Low" | "Medium" | "High"
}"#;

pub fn build_prompt(payload: &FailurePayload) -> Result<LlmPrompt, String> {
    let user = serde_json::to_string_pretty(payload).map_err(|e| e.to_string())?;

    Ok(LlmPrompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    })
}
