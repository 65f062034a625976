use std::{fs, path::PathBuf};

use clap::Parser;
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spielwerk::plugins::math;
use spielwerk::{AgentDirectory, HistoryEntry, SimulationController};

#[derive(Parser)]
#[command(name = "replay")]
#[command(about = "Replay a scripted simulation scenario and export its artifact")]
struct Args {
    /// Path to the scenario JSON file
    #[arg(short, long)]
    scenario: PathBuf,

    /// Artifact collection file to append to
    #[arg(short, long)]
    collection: PathBuf,
}

#[derive(Deserialize)]
struct Scenario {
    agent: String,
    query: String,
    #[serde(default)]
    calls: Vec<ScriptedCall>,
    final_response: String,
}

#[derive(Deserialize)]
struct ScriptedCall {
    tool: String,
    arguments: serde_json::Value,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let scenario: Scenario = serde_json::from_str(&fs::read_to_string(&args.scenario)?)?;

    let directory = AgentDirectory::new().with_profile(math::demo_agent());
    let mut controller = SimulationController::new(directory);

    controller.select_agent(&scenario.agent)?;
    controller.submit_query(scenario.query)?;

    for call in scenario.calls {
        let call_id = controller.invoke_tool(&call.tool, call.arguments).await?;
        let settled = controller
            .session()
            .history()
            .iter()
            .find(|entry| entry.is_terminal() && entry.call_id() == Some(call_id));
        match settled {
            Some(HistoryEntry::ToolOutput { result, duration_ms, .. }) => {
                println!("{}: {result} ({duration_ms} ms)", call.tool);
            }
            Some(HistoryEntry::ToolError { kind, message, .. }) => {
                println!("{}: {kind}: {message}", call.tool);
            }
            _ => {}
        }
    }

    controller.submit_final_response(scenario.final_response)?;
    let artifact_id = controller.export_artifact(&args.collection)?;
    println!(
        "exported artifact {artifact_id} to {}",
        args.collection.display()
    );
    Ok(())
}
