//! ODC CLI - Command-line client for OneDrive
//!
//! Provides commands for:
//! - Browsing the drive (`ls`, `stat`)
//! - Single and bulk transfers (`get`, `put`, `mget`, `mput`)
//! - Managing remote items (`mv`, `rm`, `mkdir`, `share`)
//! - Hashing local files (`qxh`)
//! - Token storage and account information (`auth`, `whoami`)

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use odc_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    auth::{self, AuthCommand},
    browse::{LsCommand, StatCommand},
    manage::{MkdirCommand, MvCommand, RmCommand, ShareCommand},
    qxh::QxhCommand,
    transfer::{GetCommand, MgetCommand, MputCommand, PutCommand},
    CommandContext,
};
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "odc", version, about = "OneDrive command-line client")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Append logs to this file instead of standard error
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List a remote folder
    Ls(LsCommand),
    /// Show details of a remote item
    Stat(StatCommand),
    /// Download a file
    Get(GetCommand),
    /// Upload a file
    Put(PutCommand),
    /// Download a folder tree
    Mget(MgetCommand),
    /// Upload a directory tree
    Mput(MputCommand),
    /// Move or rename a remote item
    Mv(MvCommand),
    /// Remove a remote item
    Rm(RmCommand),
    /// Create a remote folder
    Mkdir(MkdirCommand),
    /// Create a sharing link
    Share(ShareCommand),
    /// Print the QuickXorHash of local files
    Qxh(QxhCommand),
    /// Show the signed-in user
    Whoami,
    /// Access token storage
    #[command(subcommand)]
    Auth(AuthCommand),
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()),
    };

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::bail!("Invalid configuration: {}", details.join("; "));
    }
    Ok(config)
}

fn init_tracing(verbose: u8, config: &Config, log_file: Option<&Path>) -> Result<()> {
    let level = match verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match log_file.or(config.logging.file.as_deref()) {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

async fn run(command: Commands, ctx: &CommandContext) -> Result<ExitCode> {
    match command {
        Commands::Ls(cmd) => cmd.execute(ctx).await,
        Commands::Stat(cmd) => cmd.execute(ctx).await,
        Commands::Get(cmd) => cmd.execute(ctx).await,
        Commands::Put(cmd) => cmd.execute(ctx).await,
        Commands::Mget(cmd) => cmd.execute(ctx).await,
        Commands::Mput(cmd) => cmd.execute(ctx).await,
        Commands::Mv(cmd) => cmd.execute(ctx).await,
        Commands::Rm(cmd) => cmd.execute(ctx).await,
        Commands::Mkdir(cmd) => cmd.execute(ctx).await,
        Commands::Share(cmd) => cmd.execute(ctx).await,
        Commands::Qxh(cmd) => cmd.execute(ctx).await,
        Commands::Whoami => auth::whoami(ctx).await,
        Commands::Auth(cmd) => cmd.execute(ctx).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let formatter = get_formatter(cli.json);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            formatter.error(&format!("{err:#}"));
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_tracing(cli.verbose, &config, cli.log_file.as_deref()) {
        formatter.error(&format!("{err:#}"));
        return ExitCode::FAILURE;
    }

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = CommandContext::new(config, format);

    match run(cli.command, &ctx).await {
        Ok(code) => code,
        Err(err) => {
            tracing::debug!(error = ?err, "Command failed");
            formatter.error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
