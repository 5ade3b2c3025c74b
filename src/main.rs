//! Execution engine CLI
//!
//! Serves the execution API, prints the resolved configuration, runs the
//! deployment preflight and hashes plans.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use intent_relay::clock::{SharedClock, SystemClock};
use intent_relay::plan::PlanSigner;
use intent_relay::portfolio::InMemoryPortfolioStore;
use intent_relay::server::{self, AppState};
use intent_relay::{Error, ExecutionConfig, ExecutionService, Plan, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "intent-relay")]
#[command(about = "Execution planning and session-relay engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the execution API
    Serve {
        /// Bind address, overrides the config
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Show the resolved configuration (secrets redacted)
    Config,

    /// Run the deployment preflight once
    Preflight,

    /// Hash a plan JSON file and print its typed data
    PlanHash {
        /// Path to the plan JSON
        plan: PathBuf,
    },
}

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer()))
        .with(filter)
        .init();
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    let config = ExecutionConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind } => run_serve(config, bind).await?,
        Commands::Config => print_json(&config.redacted())?,
        Commands::Preflight => {
            let service = build_service(config)?;
            print_json(&service.preflight().await)?;
        }
        Commands::PlanHash { plan } => run_plan_hash(&config, &plan)?,
    }

    Ok(())
}

fn build_service(config: ExecutionConfig) -> Result<ExecutionService> {
    let clock: SharedClock = Arc::new(SystemClock);
    ExecutionService::from_config(
        Arc::new(config),
        Arc::new(InMemoryPortfolioStore::new()),
        clock,
    )
}

async fn run_serve(mut config: ExecutionConfig, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind_addr = bind;
    }
    let bind_addr = config.server.bind_addr.clone();

    tracing::info!(
        chain_id = config.chain_id,
        router = ?config.router_address,
        adapters = config.allowed_adapters().len(),
        v1_demo = config.v1_demo,
        "Starting execution API"
    );

    let clock: SharedClock = Arc::new(SystemClock);
    let service = Arc::new(build_service(config)?);
    if service.relayer_address().is_none() {
        tracing::warn!("No relayer key configured - session execution disabled");
    }
    let state = Arc::new(AppState::new(service, clock));
    server::serve(&bind_addr, state).await?;
    Ok(())
}

fn run_plan_hash(config: &ExecutionConfig, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let plan: Plan = serde_json::from_str(&content)?;
    let router = config.router_address.ok_or_else(|| {
        Error::InvalidArgument("EXECUTION_ROUTER_ADDRESS is required for typed data".to_string())
    })?;

    let signer = PlanSigner::new(config.chain_id, router);
    print_json(&signer.sign(&plan))
}
