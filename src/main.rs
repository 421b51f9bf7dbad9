use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod core;
mod daemon;
mod error;
mod pricing;
mod providers;
mod sia;

use crate::core::settings::Settings;

#[derive(Parser)]
#[command(name = "sia-host-monitor")]
#[command(author, version, about = "Headless monitor and pricing sync for Sia storage hosts")]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Also send logs to journald
    #[arg(long, global = true)]
    journald: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor daemon
    Daemon,

    /// Show current host status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply pinned host pricing once
    RefreshPricing {
        /// Print the planned update without sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Wallet administration
    Wallet {
        #[command(subcommand)]
        command: cli::wallet::WalletCommand,
    },

    /// Storage folder administration
    Folder {
        #[command(subcommand)]
        command: cli::folder::FolderCommand,
    },

    /// Announce the host on the network
    Announce {
        /// Address to announce instead of the configured one
        #[arg(long)]
        address: Option<String>,
    },

    /// Stop the Sia daemon
    Stop,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(format: LogFormat, journald: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let journald_layer = if journald {
        match tracing_journald::layer() {
            Ok(layer) => Some(layer),
            Err(e) => {
                eprintln!("journald unavailable, logging to stderr only: {}", e);
                None
            }
        }
    } else {
        None
    };

    let json = format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(journald_layer)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(io::stderr)))
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let settings = match path {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    settings.validate()?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    init_logging(cli.log_format, cli.journald);
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Daemon => daemon::run(settings).await,
        Commands::Status { json } => cli::status::run(&settings, json).await,
        Commands::RefreshPricing { dry_run } => cli::refresh_pricing::run(&settings, dry_run).await,
        Commands::Wallet { command } => cli::wallet::run(&settings, command).await,
        Commands::Folder { command } => cli::folder::run(&settings, command).await,
        Commands::Announce { address } => cli::host::announce(&settings, address).await,
        Commands::Stop => cli::host::stop(&settings).await,
        Commands::Completions { .. } => Ok(()),
    }
}
