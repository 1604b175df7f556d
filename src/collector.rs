// src/collector.rs
//
// Subscribes to the runner's lifecycle: per-test completion starts an
// explanation worker without blocking, run completion waits for all of
// them and flushes the report.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use serde::Serialize;

use crate::events::TestEndEvent;
use crate::explainer::FailureExplainer;
use crate::llm::client::Explanation;
use crate::record::FailureRecord;

const REPORTS_DIR: &str = "reports";
const REPORT_FILE: &str = "ai-failure-report.json";

/// One persisted record correlating a failed test with its diagnosis.
/// Entry order follows worker completion order, not declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub test_title: String,
    pub file: String,
    pub retry: u32,
    pub error_message: String,
    pub explanation: Explanation,
}

pub struct RunCollector {
    explainer: Arc<FailureExplainer>,
    entries: Arc<Mutex<Vec<ReportEntry>>>,
    pending: Vec<JoinHandle<()>>,
    report_dir: PathBuf,
}

impl RunCollector {
    pub fn new(explainer: FailureExplainer) -> Self {
        Self::with_report_dir(explainer, REPORTS_DIR)
    }

    pub fn with_report_dir(explainer: FailureExplainer, dir: impl Into<PathBuf>) -> Self {
        Self {
            explainer: Arc::new(explainer),
            entries: Arc::new(Mutex::new(Vec::new())),
            pending: Vec::new(),
            report_dir: dir.into(),
        }
    }

    /// Starts an explanation worker for a failed test and returns
    /// immediately. Non-failure statuses are ignored.
    pub fn on_test_end(&mut self, test: &TestEndEvent) {
        if !test.status.is_failure() {
            return;
        }

        let error_message = test
            .error
            .as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| "Unknown error".to_string());
        let stack_trace = test
            .error
            .as_ref()
            .and_then(|e| e.stack.clone())
            .unwrap_or_default();

        let record = FailureRecord {
            test_title: test.title.clone(),
            file: test.file.clone(),
            error_message: error_message.clone(),
            stack_trace,
            screenshot_path: test.attachment_path("screenshot"),
            trace_path: test.attachment_path("trace"),
            ..Default::default()
        };

        let explainer = Arc::clone(&self.explainer);
        let entries = Arc::clone(&self.entries);
        let title = test.title.clone();
        let file = test.file.clone();
        let retry = test.retry;

        self.pending.push(thread::spawn(move || {
            let explanation = explainer.process_failure(&record);
            entries.lock().unwrap().push(ReportEntry {
                test_title: title,
                file,
                retry,
                error_message,
                explanation,
            });
        }));
    }

    /// Waits for every in-flight worker (panicked ones included) and
    /// flushes the report. A write failure never surfaces: reporting is
    /// best-effort and must not alter the run's outcome.
    pub fn on_run_end(&mut self) {
        for handle in self.pending.drain(..) {
            let _ = handle.join();
        }

        log::debug!(
            "flushing {} report entries to {}",
            self.entries.lock().unwrap().len(),
            self.report_path().display()
        );
        let _ = self.write_report();
    }

    pub fn entries(&self) -> Vec<ReportEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn report_path(&self) -> PathBuf {
        self.report_dir.join(REPORT_FILE)
    }

    fn write_report(&self) -> io::Result<()> {
        fs::create_dir_all(&self.report_dir)?;

        let entries = self.entries.lock().unwrap();
        let text = serde_json::to_string_pretty(&*entries)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        fs::write(self.report_path(), text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TestStatus;

    fn passing(title: &str) -> TestEndEvent {
        TestEndEvent {
            title: title.into(),
            file: "tests/suite.spec.ts".into(),
            status: TestStatus::Passed,
            retry: 0,
            error: None,
            attachments: Vec::new(),
        }
    }

    #[test]
    fn non_failures_start_no_workers() {
        // a client that would panic the test if ever reached
        struct UnreachableTransport;
        impl crate::llm::transport::LlmTransport for UnreachableTransport {
            fn send(
                &self,
                _model: &str,
                _prompt: &crate::llm::prompt::LlmPrompt,
            ) -> Result<String, String> {
                panic!("transport must not be called for passing tests");
            }
        }

        let client = crate::llm::client::ExplainClient::with_transport(
            crate::llm::client::ClientConfig::default(),
            Box::new(UnreachableTransport),
        );
        let mut collector = RunCollector::new(FailureExplainer::new(client));

        collector.on_test_end(&passing("a"));
        collector.on_test_end(&passing("b"));

        assert!(collector.pending.is_empty());
        assert!(collector.entries().is_empty());
    }

    #[test]
    fn panicking_worker_does_not_abort_the_flush() {
        // panics for one failure, answers normally for the other
        struct FlakyTransport;
        impl crate::llm::transport::LlmTransport for FlakyTransport {
            fn send(
                &self,
                _model: &str,
                prompt: &crate::llm::prompt::LlmPrompt,
            ) -> Result<String, String> {
                if prompt.user.contains("explodes") {
                    panic!("transport blew up");
                }
                Ok(r#"{"root_cause":"a","likely_reason":"b","suggested_fix":"c","confidence":"Low"}"#
                    .into())
            }
        }

        let client = crate::llm::client::ExplainClient::with_transport(
            crate::llm::client::ClientConfig::default(),
            Box::new(FlakyTransport),
        );

        let dir = tempfile::tempdir().unwrap();
        let mut collector =
            RunCollector::with_report_dir(FailureExplainer::new(client), dir.path());

        let failing = |title: &str, message: &str| TestEndEvent {
            title: title.into(),
            file: "tests/suite.spec.ts".into(),
            status: TestStatus::Failed,
            retry: 0,
            error: Some(crate::events::TestError {
                message: Some(message.into()),
                stack: None,
            }),
            attachments: Vec::new(),
        };

        collector.on_test_end(&failing("one", "this one explodes"));
        collector.on_test_end(&failing("two", "plain failure"));
        collector.on_run_end();

        // the dead worker's entry is lost, the survivor is flushed
        let raw = std::fs::read_to_string(collector.report_path()).unwrap();
        let report: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entries = report.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["testTitle"], "two");
    }
}
