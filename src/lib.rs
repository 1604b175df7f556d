pub mod cache;
pub mod collector;
pub mod events;
pub mod explainer;
pub mod llm;
pub mod record;

pub use cache::{fingerprint, FingerprintCache};
pub use collector::{ReportEntry, RunCollector};
pub use events::{TestEndEvent, TestStatus};
pub use explainer::FailureExplainer;
pub use llm::client::{ClientConfig, Confidence, ExplainClient, Explanation};
pub use record::{FailurePayload, FailureRecord};
