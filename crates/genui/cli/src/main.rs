//! genui - run generations against the offline model
//!
//! Each `--prompt` is one generation on the same thread, so later prompts
//! edit the spec produced by earlier ones. Events go to stdout; logs go
//! to stderr.

use clap::{Parser, ValueEnum};
use futures::StreamExt;
use genui_engine::ComponentCatalog;
use genui_orchestrator::{
    CatalogContext, GenerationEvent, GenerationRequest, OfflineModel, Orchestrator,
};
use genui_storage::{InMemoryThreadStore, ThreadStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;

use config::AppConfig;
use error::{CliError, CliResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    /// Server-sent-events frames
    Sse,
    /// One JSON event per line
    Events,
    /// Only the final spec
    Spec,
}

/// GenUI CLI
#[derive(Parser)]
#[command(name = "genui")]
#[command(about = "Generate UI specs from prompts", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "GENUI_CONFIG")]
    config: Option<String>,

    /// Prompt to generate from; repeat to edit the result
    #[arg(short, long, required = true)]
    prompt: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "sse")]
    output: Output,

    /// Override the attempt bound
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Log level
    #[arg(long, env = "GENUI_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "GENUI_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let mut config =
        AppConfig::load(cli.config.as_deref()).map_err(|e| CliError::Config(e.to_string()))?;
    if let Some(max_attempts) = cli.max_attempts {
        config.generation.max_attempts = max_attempts;
    }

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into());
    if cli.json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let catalog = Arc::new(ComponentCatalog::standard());
    let store = Arc::new(InMemoryThreadStore::new());
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(OfflineModel::new(catalog.clone())?),
        Arc::new(CatalogContext::new(catalog.clone())),
        store.clone(),
        catalog,
        config.generation.clone(),
    )?);

    let thread = store.create_thread(&cli.prompt[0]).await?;
    tracing::info!(thread_id = %thread.thread_id, "Created thread");

    for prompt in &cli.prompt {
        let request = GenerationRequest::new(thread.thread_id.clone(), prompt.clone());
        let mut events = orchestrator.clone().generate(request);
        while let Some(event) = events.next().await {
            match cli.output {
                Output::Sse => print!("{}", event.to_sse_frame()),
                Output::Events => println!("{}", serde_json::to_string(&event)?),
                Output::Spec => {}
            }
            if let GenerationEvent::Error { code, message } = event {
                return Err(CliError::Generation { code, message });
            }
        }
    }

    if cli.output == Output::Spec {
        if let Some(version) = store.get_version(&thread.thread_id, None).await? {
            println!("{}", serde_json::to_string_pretty(&version.spec)?);
        }
    }
    Ok(())
}
