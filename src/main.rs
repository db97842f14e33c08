//! soulwire CLI - run one prompt through the agent runtime.
//!
//! Rendering is intentionally minimal: text fragments go straight to
//! stdout and approval requests are resolved from stdin-free defaults.
//! Richer presentation layers implement [`UiConsumer`] themselves.

use std::io::Write;
use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use clap::Parser;
use soulwire::agent::{run_agent, AgentLoop, RunOutcome, UiConsumer};
use soulwire::approval::{ApprovalDecision, ApprovalGate};
use soulwire::client::{OpenAiClient, RetryPolicy};
use soulwire::config::Config;
use soulwire::timetravel::TimeTravel;
use soulwire::tools::{Dependencies, EchoTool, SendDmailTool, ToolRegistry};
use soulwire::utils::logging::init_logging;
use soulwire::wire::AgentEvent;

#[derive(Parser)]
#[command(name = "soulwire")]
#[command(version)]
#[command(about = "Agent execution runtime with checkpoints and time travel", long_about = None)]
struct Cli {
    /// The prompt to run through the agent
    prompt: String,

    /// Model identifier (overrides config)
    #[arg(short, long)]
    model: Option<String>,

    /// API base URL for OpenAI-compatible endpoints (overrides config)
    #[arg(long)]
    api_url: Option<String>,

    /// Approve all tool actions without asking
    #[arg(long)]
    auto_approve: bool,
}

/// Minimal consumer: stream text to stdout, approve whatever asks.
struct StdoutConsumer {
    gate: Arc<ApprovalGate>,
}

#[async_trait]
impl UiConsumer for StdoutConsumer {
    async fn handle(&mut self, event: AgentEvent) {
        match event {
            AgentEvent::TextFragment(text) => {
                print!("{}", text);
                let _ = std::io::stdout().flush();
            }
            AgentEvent::ToolResult(result) => {
                if let Some(brief) = match &result.outcome {
                    soulwire::history::ToolOutcome::Ok { brief, .. } => brief.as_deref(),
                    soulwire::history::ToolOutcome::Error { message, .. } => Some(message.as_str()),
                } {
                    eprintln!("[tool {}] {}", result.tool_call_id, brief);
                }
            }
            AgentEvent::ApprovalRequested {
                id, description, ..
            } => {
                // Non-interactive binary: approve and note it on stderr.
                eprintln!("[approval] {}", description);
                self.gate.resolve(id, ApprovalDecision::Approve);
            }
            AgentEvent::CompactionBegin => eprintln!("[compacting history]"),
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::load().context("loading configuration")?;
    init_logging(&config.logging);

    if let Some(model) = cli.model {
        config.agent.model = Some(model);
    }
    if let Some(api_url) = cli.api_url {
        config.client.api_base = Some(api_url);
    }
    if cli.auto_approve {
        config.agent.auto_approve = true;
    }

    let api_key = config
        .client
        .api_key
        .clone()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .context("no API key: set client.api_key in config or OPENAI_API_KEY")?;

    let mut client = OpenAiClient::new(api_key);
    if let Some(base) = &config.client.api_base {
        client = client.with_api_url(base.clone());
    }
    if let Some(model) = &config.agent.model {
        client = client.with_model(model.clone());
    }

    let timetravel = Arc::new(TimeTravel::new());
    let (gate, approval_queue) = ApprovalGate::new();
    gate.set_auto_approve(config.agent.auto_approve);

    let mut deps = Dependencies::new();
    deps.insert(timetravel.clone());
    deps.insert(gate.clone());

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(EchoTool));
    registry.register_with::<SendDmailTool>(&deps)?;

    let retry = RetryPolicy::new()
        .with_max_retries(config.client.max_retries)
        .with_base_delay_ms(config.client.retry_base_delay_ms)
        .with_max_delay_ms(config.client.retry_max_delay_ms);

    let mut agent = AgentLoop::new(Arc::new(registry), gate.clone(), approval_queue, timetravel)
        .with_client(Arc::new(client))
        .with_system_prompt(config.agent.system_prompt.clone())
        .with_retry(retry)
        .with_max_steps(config.agent.max_steps)
        .with_context_budget(config.agent.max_context_tokens, config.agent.reserved_tokens)
        .with_preserve_recent(config.agent.preserve_recent)
        .with_tokens_per_message(config.agent.approx_tokens_per_message)
        .with_workspace(config.agent.workspace.clone());

    let consumer = StdoutConsumer { gate };
    match run_agent(&mut agent, cli.prompt, consumer).await? {
        RunOutcome::Finished { steps, .. } => {
            println!();
            tracing::debug!(steps, "run complete");
        }
        RunOutcome::Cancelled => eprintln!("cancelled"),
    }
    Ok(())
}
