//! Browse commands - `ls` and `stat`

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use super::CommandContext;
use crate::output::{detail_lines, listing_line};

/// List a remote folder
#[derive(Debug, Args)]
pub struct LsCommand {
    /// Remote folder (or file) to list
    #[arg(default_value = "/")]
    pub path: String,

    /// Fetch every page instead of the first one
    #[arg(long)]
    pub all: bool,
}

impl LsCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let drive = ctx.drive()?;
        let mut session = ctx.session(drive).await?;

        let listing = session
            .list(&self.path, self.all)
            .await
            .with_context(|| format!("Failed to list {}", self.path))?;

        if ctx.is_json() {
            fmt.print_json(&serde_json::to_value(&listing)?);
            return Ok(ExitCode::SUCCESS);
        }

        if listing.folders.is_empty() && listing.files.is_empty() && !listing.target.is_folder() {
            println!("{}", listing_line(&listing.target));
            return Ok(ExitCode::SUCCESS);
        }
        for record in listing.folders.iter().chain(&listing.files) {
            println!("{}", listing_line(record));
        }
        if !listing.complete {
            fmt.info("(more items on the server, use --all to list them)");
        }
        Ok(ExitCode::SUCCESS)
    }
}

/// Show details of a remote file or folder
#[derive(Debug, Args)]
pub struct StatCommand {
    pub path: String,
}

impl StatCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let drive = ctx.drive()?;
        let mut session = ctx.session(drive).await?;

        let record = session
            .stat(&self.path)
            .await
            .with_context(|| format!("Failed to stat {}", self.path))?;

        if ctx.is_json() {
            fmt.print_json(&serde_json::to_value(&record)?);
        } else {
            for line in detail_lines(&record) {
                println!("{line}");
            }
        }
        Ok(ExitCode::SUCCESS)
    }
}
