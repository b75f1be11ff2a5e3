mod agents;
mod config;
mod errors;
mod llm_client;
mod models;
mod routes;
mod state;
mod store;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::agents::batch::run_batch;
use crate::agents::invoke::StepRunner;
use crate::agents::pipeline::run_pipeline;
use crate::agents::workflow::Workflow;
use crate::config::{load_candidates, Config, RunConfig};
use crate::llm_client::{LlmClient, LlmInvoker};
use crate::routes::build_router;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "cvreview", version, about = "Reviewed CV-vs-offer analysis with LLM agents")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API
    Serve {
        /// JSON run config used as the default for every request
        #[arg(long)]
        config_path: Option<PathBuf>,
    },
    /// Analyze candidates from a data file and print the results
    Analyze {
        #[arg(long, value_enum, default_value_t = Mode::Graph)]
        mode: Mode,
        /// JSON object or JSON Lines with `cv` and `offer`
        #[arg(long)]
        data_path: PathBuf,
        #[arg(long)]
        config_path: Option<PathBuf>,
        /// Anthropic API key, overrides ANTHROPIC_API_KEY
        #[arg(long)]
        token: Option<String>,
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Analyze, review and retry until accepted
    Graph,
    /// Single analyzer pass
    Pipeline,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve { config_path: None }) {
        Command::Serve { config_path } => serve(config_path.as_deref()).await,
        Command::Analyze {
            mode,
            data_path,
            config_path,
            token,
            concurrency,
        } => {
            let config = Config::from_env(token)?;
            init_tracing(&config.rust_log);
            analyze(
                &config,
                mode,
                &data_path,
                config_path.as_deref(),
                concurrency,
            )
            .await
        }
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), level))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_run_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(path) => RunConfig::load(path),
        None => Ok(RunConfig::default()),
    }
}

fn build_llm(config: &Config, run_config: &RunConfig) -> LlmClient {
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        Duration::from_secs(run_config.call_timeout_secs),
    );
    info!("LLM client initialized (model: {})", llm_client::DEFAULT_MODEL);
    llm
}

async fn serve(config_path: Option<&Path>) -> Result<()> {
    let config = Config::from_env(None)?;
    init_tracing(&config.rust_log);

    info!("Starting cvreview API v{}", env!("CARGO_PKG_VERSION"));

    let run_config = load_run_config(config_path)?;
    let run_defaults = run_config.run_options();
    // Validates max_cycles before the first request.
    Workflow::new(run_config.agent_roles(), run_defaults.clone())?;

    let db = match &config.database_url {
        Some(url) => Some(store::connect(url, config.db_max_connections).await?),
        None => {
            warn!("DATABASE_URL not set; runs will not be persisted");
            None
        }
    };

    let state = AppState {
        db,
        llm: Arc::new(build_llm(&config, &run_config)),
        roles: Arc::new(run_config.agent_roles()),
        run_defaults,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn analyze(
    config: &Config,
    mode: Mode,
    data_path: &Path,
    config_path: Option<&Path>,
    concurrency: usize,
) -> Result<()> {
    let run_config = load_run_config(config_path)?;
    let candidates = load_candidates(data_path)?;
    let llm: Arc<dyn LlmInvoker> = Arc::new(build_llm(config, &run_config));
    info!(
        "Analyzing {} candidate(s) in {:?} mode",
        candidates.len(),
        mode
    );

    let mut failed = 0usize;
    match mode {
        Mode::Graph => {
            let workflow = Arc::new(Workflow::new(
                run_config.agent_roles(),
                run_config.run_options(),
            )?);
            let results = run_batch(workflow, llm, candidates, concurrency).await?;
            for result in results {
                match result {
                    Ok(outcome) => println!("{}\n", outcome.report),
                    Err(e) => {
                        error!("Run failed: {e}");
                        failed += 1;
                    }
                }
            }
        }
        Mode::Pipeline => {
            let roles = run_config.agent_roles();
            let runner = StepRunner::new(llm.as_ref(), run_config.run_options().call_policy);
            for candidate in &candidates {
                match run_pipeline(runner, &roles.analyzer, candidate).await {
                    Ok(analysis) => println!("{}", serde_json::to_string_pretty(&analysis)?),
                    Err(e) => {
                        error!("Pipeline failed for candidate {}: {e}", candidate.id());
                        failed += 1;
                    }
                }
            }
        }
    }

    if failed > 0 {
        bail!("{failed} run(s) failed");
    }
    Ok(())
}
