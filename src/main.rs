use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use tessera_execution::{
  ChannelTransport, ExecutionConfig, ExecutionService, FORM_DEBOUNCE_TIME_MS,
  SharedWorkflowModel, WorkflowEvent,
};
use tessera_plan::{WorkflowGraph, translate};

/// Tessera - translate workflow graphs and follow their executions
#[derive(Parser)]
#[command(name = "tessera")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Print the logical plan for a workflow graph
  Plan {
    /// Path to the workflow graph (JSON)
    graph_file: PathBuf,

    /// Only plan the part of the graph feeding this operator
    #[arg(long)]
    target: Option<String>,
  },

  /// Feed recorded backend events through the execution tracker
  Replay(ReplayArgs),
}

#[derive(Args)]
struct ReplayArgs {
  /// Path to the recorded events, one JSON event per line
  events_file: PathBuf,

  /// Workflow graph to load into the model (JSON)
  #[arg(long)]
  graph: Option<PathBuf>,

  /// Submit an execution with this name before replaying
  #[arg(long)]
  submit: Option<String>,

  /// Submit only the part of the graph feeding this operator
  #[arg(long, requires = "submit")]
  target: Option<String>,

  /// Computing unit to submit to
  #[arg(long)]
  computing_unit: Option<u32>,

  /// Delay before the execute request is sent
  #[arg(long, default_value_t = FORM_DEBOUNCE_TIME_MS)]
  debounce_ms: u64,

  /// Engine version stamped on execute requests
  #[arg(long)]
  engine_version: Option<String>,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  // Logs go to stderr so stdout stays machine readable
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tessera=info,warn")),
    )
    .with_writer(std::io::stderr)
    .init();

  match cli.command {
    Some(Commands::Plan { graph_file, target }) => {
      print_plan(&graph_file, target.as_deref())?;
    }
    Some(Commands::Replay(args)) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async { replay(args).await })?;
    }
    None => {
      println!("tessera - use --help to see available commands");
    }
  }

  Ok(())
}

fn read_graph(path: &Path) -> Result<WorkflowGraph> {
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read graph file: {}", path.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse graph file: {}", path.display()))
}

fn print_plan(graph_file: &Path, target: Option<&str>) -> Result<()> {
  let graph = read_graph(graph_file)?;
  let plan = translate(&graph, target).context("failed to build logical plan")?;

  eprintln!(
    "Planned {} operators and {} links",
    plan.operators.len(),
    plan.links.len()
  );
  println!("{}", serde_json::to_string_pretty(&plan)?);
  Ok(())
}

fn parse_events(content: &str) -> Result<Vec<WorkflowEvent>> {
  content
    .lines()
    .enumerate()
    .filter(|(_, line)| !line.trim().is_empty())
    .map(|(index, line)| {
      serde_json::from_str(line).with_context(|| format!("invalid event on line {}", index + 1))
    })
    .collect()
}

/// Each event causes at most one transition, plus one for a submit reset and
/// one for the disconnect fallback, so the printer can never lag behind.
fn replay_config(
  debounce_ms: u64,
  engine_version: Option<String>,
  event_count: usize,
) -> ExecutionConfig {
  let mut config = ExecutionConfig {
    debounce: Duration::from_millis(debounce_ms),
    state_stream_capacity: event_count + 2,
    ..ExecutionConfig::default()
  };
  if let Some(engine_version) = engine_version {
    config.engine_version = engine_version;
  }
  config
}

async fn replay(args: ReplayArgs) -> Result<()> {
  let graph = match &args.graph {
    Some(path) => read_graph(path)?,
    None => WorkflowGraph::default(),
  };

  let content = tokio::fs::read_to_string(&args.events_file)
    .await
    .with_context(|| format!("failed to read events file: {}", args.events_file.display()))?;
  let events = parse_events(&content)?;

  let config = replay_config(args.debounce_ms, args.engine_version, events.len());

  let (request_tx, mut request_rx) = mpsc::unbounded_channel();
  let model = Arc::new(SharedWorkflowModel::new(graph));
  let mut service =
    ExecutionService::with_config(model, Arc::new(ChannelTransport::new(request_tx)), config);
  service.select_computing_unit(args.computing_unit);

  let printer = tokio::spawn(print_transitions(service.subscribe()));

  if let Some(name) = &args.submit {
    let send = service
      .execute_workflow(name, args.target.as_deref())
      .context("failed to submit workflow")?;
    send.await.context("execute request task failed")?;

    while let Ok(request) = request_rx.try_recv() {
      eprintln!("Sent {}", request.type_name());
      println!("{}", serde_json::to_string(&request)?);
    }
  }

  let (event_tx, event_rx) = mpsc::channel(events.len().max(1));
  for event in events {
    event_tx
      .send(event)
      .await
      .context("event channel closed early")?;
  }
  drop(event_tx);

  service.run(event_rx, CancellationToken::new()).await;

  let final_state = service.execution_state().clone();
  // Closes the transition stream so the printer can finish
  drop(service);
  let transitions = printer.await.context("transition printer failed")?;

  eprintln!("Transitions: {}", transitions);
  eprintln!("Final state: {}", final_state.state());
  Ok(())
}

async fn print_transitions(
  mut transitions: broadcast::Receiver<tessera_execution::StateTransition>,
) -> usize {
  let mut count = 0;
  loop {
    match transitions.recv().await {
      Ok(transition) => match serde_json::to_string(&transition) {
        Ok(line) => {
          println!("{}", line);
          count += 1;
        }
        Err(e) => error!(error = %e, "failed to serialize transition"),
      },
      Err(broadcast::error::RecvError::Lagged(skipped)) => {
        warn!(skipped, "transition printer fell behind");
      }
      Err(broadcast::error::RecvError::Closed) => break,
    }
  }
  count
}
