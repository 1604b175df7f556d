// src/record.rs
//
// Failure context captured from the runner and its wire projection.

use chrono::Utc;
use serde::Serialize;

/// Everything known about one failed test at the moment it finished.
/// Built once per failure, never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct FailureRecord {
    pub test_title: String,
    pub file: String,
    pub error_message: String,
    pub stack_trace: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub url: Option<String>,
    pub browser_name: Option<String>,
    pub screenshot_path: Option<String>,
    pub trace_path: Option<String>,
    pub console_errors: Vec<String>,
    pub network_failures: Vec<String>,
}

/// Normalized projection of a [`FailureRecord`] sent to the reasoning
/// service. Always rebuilt from the record, never persisted.
///
/// Absent optionals serialize as explicit `null` so the wire shape stays
/// stable across failures.
#[derive(Debug, Clone, Serialize)]
pub struct FailurePayload {
    pub metadata: PayloadMetadata,
    pub test: PayloadTest,
    pub failure: PayloadFailure,
    #[serde(rename = "browserContext")]
    pub browser_context: PayloadBrowserContext,
    pub artifacts: PayloadArtifacts,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayloadMetadata {
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayloadTest {
    pub title: String,
    pub file: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadFailure {
    pub error_message: String,
    pub stack_trace: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadBrowserContext {
    pub url: Option<String>,
    pub browser_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadArtifacts {
    pub screenshot_path: Option<String>,
    pub trace_path: Option<String>,
    pub console_errors: Vec<String>,
    pub network_failures: Vec<String>,
}

impl FailurePayload {
    pub fn from_record(record: &FailureRecord) -> Self {
        Self {
            metadata: PayloadMetadata {
                timestamp: Utc::now().to_rfc3339(),
            },
            test: PayloadTest {
                title: record.test_title.clone(),
                file: record.file.clone(),
            },
            failure: PayloadFailure {
                error_message: record.error_message.clone(),
                stack_trace: record.stack_trace.clone(),
                expected: record.expected.clone(),
                actual: record.actual.clone(),
            },
            browser_context: PayloadBrowserContext {
                url: record.url.clone(),
                browser_name: record.browser_name.clone(),
            },
            artifacts: PayloadArtifacts {
                screenshot_path: record.screenshot_path.clone(),
                trace_path: record.trace_path.clone(),
                console_errors: record.console_errors.clone(),
                network_failures: record.network_failures.clone(),
            },
        }
    }
}
