//! Second Brain CLI
//!
//! Runs the HTTP API or initializes the database schema.

use anyhow::Context;
use clap::{Parser, Subcommand};
use second_brain::{
    AiGateway, ApiServer, ApiServerConfig, AppState, BrainService, KnowledgeStore, LibsqlStore,
    Settings,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "second-brain")]
#[command(
    about = "Personal knowledge capture with AI summaries, tagging and recall",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Set log level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Config file (defaults to ./second-brain.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database path or libsql:// URL (overrides config)
    #[arg(long, env = "BRAIN_DB_PATH", global = true)]
    db_path: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server (default)
    Serve {
        /// Server address (overrides config)
        #[arg(long)]
        addr: Option<String>,
    },

    /// Create the database schema and exit
    InitDb,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::new(format!(
        "second_brain={},tower_http={},hyper=warn,libsql=warn,reqwest=warn",
        level.as_str().to_lowercase(),
        level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(db_path) = cli.db_path {
        settings.database.url = db_path;
    }

    match cli.command.unwrap_or(Commands::Serve { addr: None }) {
        Commands::Serve { addr } => {
            if let Some(addr) = addr {
                settings.server.addr = addr
                    .parse()
                    .with_context(|| format!("Invalid address: {}", addr))?;
            }
            serve(settings).await
        }
        Commands::InitDb => {
            let store = open_store(&settings).await?;
            store.init_schema().await?;
            println!("Database initialized at {}", settings.database.url);
            Ok(())
        }
    }
}

async fn open_store(settings: &Settings) -> anyhow::Result<LibsqlStore> {
    let mode = settings.database.connection_mode()?;
    LibsqlStore::open(mode)
        .await
        .with_context(|| format!("Failed to open database {}", settings.database.url))
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    info!("Starting Second Brain v{}", env!("CARGO_PKG_VERSION"));

    let store = open_store(&settings).await?;
    store.init_schema().await?;

    let gateway = AiGateway::from_settings(&settings.ai);
    if !gateway.is_configured() {
        warn!(
            "No API key for {}; summaries, tags and queries will fail until {} is set",
            gateway.provider(),
            settings.ai.provider.api_key_env()
        );
    }

    let brain = BrainService::new(Arc::new(store), gateway, settings.public_base_url.clone());
    let server = ApiServer::new(
        ApiServerConfig {
            addr: settings.server.addr,
        },
        AppState::new(brain),
    );

    server.serve().await
}
