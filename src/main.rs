//! DEX Audit Monitor - real-time Solana DEX event monitor
//!
//! Streams Pump.fun launches and trades plus Raydium and Orca program logs,
//! and scores every new token with an automatic risk audit.
//!
//! Audit scores are heuristics built from incomplete data. They are not
//! investment advice.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use dex_audit_monitor::cli::commands;
use dex_audit_monitor::config::Config;

/// DEX Audit Monitor - multi-DEX event stream with token risk audits
#[derive(Parser)]
#[command(name = "dex-monitor")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml", env = "MONITOR_CONFIG")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to all enabled sources and monitor until Ctrl-C
    Run,

    /// Audit a single token once and print the report
    Audit {
        /// Token mint address
        mint: String,

        /// Token attributes as a JSON object (name, symbol, creatorBalance, ...)
        #[arg(long)]
        data: Option<String>,
    },

    /// Show current configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    init_tracing(cli.json_logs)?;

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };
    info!("Configuration loaded from {}", cli.config);

    // Execute command
    let result = match cli.command {
        Commands::Run => commands::run(&config).await,
        Commands::Audit { mint, data } => commands::audit(&config, &mint, data.as_deref()).await,
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("dex_audit_monitor=info".parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}
