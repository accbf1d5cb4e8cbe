//! `conductor replay`: Run one orchestration against a recorded chat script.
//!
//! The script stands in for the reasoning backend; tools run for real. The
//! `AgentResult` is printed to stdout as JSON.

use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use conductor_agent::{Orchestrator, ScriptedChat};
use conductor_config::AppConfig;
use conductor_core::event::{DomainEvent, EventBus};
use conductor_core::message::Message;
use conductor_core::{AgentConfig, CancellationToken, TenantScope};
use conductor_tools::ToolExecutor;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// JSON script of chat replies, consumed one per reasoning call
    #[arg(short, long)]
    pub script: PathBuf,

    /// The user message
    #[arg(short, long)]
    pub message: String,

    /// Documents (files or directories) indexed for document_search
    #[arg(short, long)]
    pub documents: Vec<PathBuf>,

    /// Prior conversation as a JSON array of messages
    #[arg(long)]
    pub history: Option<PathBuf>,

    #[arg(long, default_value = "default")]
    pub tenant: String,

    /// Override agent.max_tool_calls
    #[arg(long)]
    pub max_tool_calls: Option<u32>,

    /// Run the calls of one batch concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Pre-fetch retrieval results before the first reasoning call
    #[arg(long)]
    pub retrieval_context: bool,

    /// Print domain events to stderr as JSON lines
    #[arg(long)]
    pub events: bool,
}

impl ReplayArgs {
    /// The configured agent settings with this invocation's overrides.
    fn agent_config(&self, base: &AgentConfig) -> AgentConfig {
        let mut config = base.clone();
        if let Some(max) = self.max_tool_calls {
            config.max_tool_calls = max;
        }
        if self.parallel {
            config.allow_parallel_tool_calls = true;
        }
        if self.retrieval_context {
            config.use_retrieval_context = true;
        }
        config
    }
}

pub async fn run(config: AppConfig, args: ReplayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let script = std::fs::read_to_string(&args.script)
        .map_err(|e| format!("Failed to read script {}: {e}", args.script.display()))?;
    let chat = ScriptedChat::from_json(&script)
        .map_err(|e| format!("Invalid script {}: {e}", args.script.display()))?;

    let history = match &args.history {
        Some(path) => load_history(path)?,
        None => Vec::new(),
    };

    let index = super::load_documents(&args.documents)?;
    let registry = super::build_registry(&config, index)?;
    let executor = ToolExecutor::new(Arc::new(registry)).with_timeout(config.tool_timeout());

    let event_bus = Arc::new(EventBus::default());
    let printer = args.events.then(|| spawn_event_printer(event_bus.subscribe()));

    let mut orchestrator = Orchestrator::new(Arc::new(chat), executor)
        .with_pricing(Arc::new(config.pricing_table()?))
        .with_event_bus(event_bus.clone())
        .with_retrieval_tool(config.tools.retrieval_tool.clone());
    if let Some(model) = &config.telemetry.model {
        orchestrator = orchestrator.with_default_model(model.clone());
    }

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling run");
                cancel.cancel();
            }
        })
    };

    let agent_config = args.agent_config(&config.agent);
    let result = orchestrator
        .run(
            &args.message,
            history,
            &agent_config,
            TenantScope::new(args.tenant.clone()),
            cancel,
        )
        .await;
    interrupt.abort();

    // Closing the last sender ends the printer.
    drop(orchestrator);
    drop(event_bus);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    let result = result?;
    tracing::info!(
        iterations = result.metrics.iteration_count,
        tool_calls = result.tool_calls_executed.len(),
        cost_usd = result.metrics.estimated_cost_usd,
        "Replay finished"
    );
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn load_history(path: &Path) -> Result<Vec<Message>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read history {}: {e}", path.display()))?;
    let messages = serde_json::from_str(&content)
        .map_err(|e| format!("Invalid history {}: {e}", path.display()))?;
    Ok(messages)
}

fn spawn_event_printer(mut rx: broadcast::Receiver<Arc<DomainEvent>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(event.as_ref()) {
                    Ok(line) => eprintln!("{line}"),
                    Err(e) => tracing::warn!(error = %e, "Failed to serialize event"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event printer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
