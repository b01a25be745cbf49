use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

use civic_hero::config::{CivicConfig, ServerOverrides};
use civic_hero::logging;

mod cmd;

#[derive(Parser)]
#[command(name = "civic-hero")]
#[command(version, about = "Community issue board: report civic problems, claim and resolve them")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to civic.toml (default: .civic/civic.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database path. Overrides civic.toml and CIVIC_DB_PATH.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to serve on
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Enable dev mode (CORS permissive for a local UI dev server)
        #[arg(long)]
        dev: bool,
    },
    /// Create the database and exit
    Init,
    /// Insert the sample issues (skipped when issues already exist)
    Seed {
        /// Clear existing issues first
        #[arg(long)]
        force: bool,
    },
    /// Delete every issue and comment
    Clear,
    /// Print issues with their category, rank and summary
    List {
        /// Status filter (open, in_progress, closed, ... or all)
        #[arg(long)]
        status: Option<String>,

        /// Priority filter (low, medium, high, urgent or all)
        #[arg(long)]
        priority: Option<String>,

        /// Category id filter (0 for all)
        #[arg(long)]
        category: Option<i64>,

        /// Order by rank instead of newest first
        #[arg(long)]
        rank: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default civic.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Commands::Config {
        command: Some(ConfigCommands::Init { force }),
    } = &cli.command
    {
        return cmd::cmd_config_init(cli.config.as_deref(), *force);
    }

    let mut config = CivicConfig::load(cli.config.as_deref(), cli.verbose)?;
    logging::init_tracing(config.logging(), cli.verbose)?;

    let mut overrides = ServerOverrides {
        db_path: cli.db_path.clone(),
        ..Default::default()
    };
    if let Commands::Serve { port, host, dev } = &cli.command {
        overrides.port = *port;
        overrides.host = host.clone();
        overrides.dev = *dev;
    }
    config.apply_overrides(overrides);

    if !matches!(cli.command, Commands::Config { .. }) {
        for warning in config.validate() {
            warn!("{}", warning);
        }
    }

    match &cli.command {
        Commands::Serve { .. } => cmd::cmd_serve(&config).await?,
        Commands::Init => cmd::cmd_init(&config)?,
        Commands::Seed { force } => cmd::cmd_seed(&config, *force)?,
        Commands::Clear => cmd::cmd_clear(&config)?,
        Commands::List {
            status,
            priority,
            category,
            rank,
            json,
        } => cmd::cmd_list(
            &config,
            &cmd::ListArgs {
                status: status.clone(),
                priority: priority.clone(),
                category: *category,
                rank: *rank,
                json: *json,
            },
        )?,
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    }

    Ok(())
}
