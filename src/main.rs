use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Parser;

use failsight::{ExplainClient, FailureExplainer, RunCollector, TestEndEvent};

#[derive(Parser)]
#[command(
    name = "failsight",
    version,
    about = "AI-assisted failure diagnosis for automated test runs"
)]
struct Cli {
    /// JSON file holding the runner's per-test completion events
    #[arg(long)]
    events: PathBuf,

    /// Directory the failure report is written into
    #[arg(long, default_value = "reports")]
    report_dir: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    let raw = fs::read_to_string(&cli.events)?;
    let events: Vec<TestEndEvent> = serde_json::from_str(&raw)?;

    // Missing credential is fatal here, before any test event is consumed.
    let client = ExplainClient::new()?;
    let explainer = FailureExplainer::new(client);
    let mut collector = RunCollector::with_report_dir(explainer, &cli.report_dir);

    for event in &events {
        collector.on_test_end(event);
    }
    collector.on_run_end();

    println!(
        "{} failing test(s) diagnosed -> {}",
        collector.entries().len(),
        collector.report_path().display()
    );

    Ok(())
}
