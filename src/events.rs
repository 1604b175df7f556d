// src/events.rs
//
// Inbound contract consumed from the test runner.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TestStatus {
    Passed,
    Failed,
    TimedOut,
    Skipped,
    Interrupted,
}

impl TestStatus {
    /// Only these terminal statuses enter the explanation pipeline.
    pub fn is_failure(self) -> bool {
        matches!(self, TestStatus::Failed | TestStatus::TimedOut)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub stack: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
}

/// Per-test completion event. A JSON array of these stands in for the
/// runner's event stream; end of array signals run completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestEndEvent {
    pub title: String,
    pub file: String,
    pub status: TestStatus,
    #[serde(default)]
    pub retry: u32,
    #[serde(default)]
    pub error: Option<TestError>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl TestEndEvent {
    /// First attachment with the given name that carries a path.
    pub fn attachment_path(&self, name: &str) -> Option<String> {
        self.attachments
            .iter()
            .find(|a| a.name == name && a.path.is_some())
            .and_then(|a| a.path.clone())
    }
}
