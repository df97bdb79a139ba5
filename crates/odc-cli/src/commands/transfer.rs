//! Transfer commands - `get`, `put`, `mget`, `mput`
//!
//! Single-file commands fail on the first error. The bulk variants keep going
//! and print a summary; any failed item makes the exit code non-zero.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use odc_sync::SyncReport;
use tracing::info;

use super::CommandContext;
use crate::output::{format_size, OutputFormatter};

/// Download one remote file
#[derive(Debug, Args)]
pub struct GetCommand {
    /// Remote file path
    pub remote: String,

    /// Local file or directory
    #[arg(default_value = ".")]
    pub local: PathBuf,
}

impl GetCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let (mut session, engine) = ctx.connect().await?;

        let written = engine
            .get_file(&mut session, &self.remote, &self.local)
            .await
            .with_context(|| format!("Failed to download {}", self.remote))?;

        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({
                "remote": self.remote,
                "local": written.display().to_string(),
            }));
        } else {
            fmt.success(&format!("Downloaded {} to {}", self.remote, written.display()));
        }
        Ok(ExitCode::SUCCESS)
    }
}

/// Upload one local file into a remote folder
#[derive(Debug, Args)]
pub struct PutCommand {
    /// Local file
    pub local: PathBuf,

    /// Remote destination folder
    #[arg(default_value = "/")]
    pub remote_folder: String,
}

impl PutCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let (mut session, engine) = ctx.connect().await?;

        let record = engine
            .put_file(&mut session, &self.local, &self.remote_folder)
            .await
            .with_context(|| format!("Failed to upload {}", self.local.display()))?;

        if ctx.is_json() {
            fmt.print_json(&serde_json::to_value(&record)?);
        } else {
            fmt.success(&format!(
                "Uploaded {} to {} ({})",
                self.local.display(),
                record.path,
                format_size(record.size)
            ));
        }
        Ok(ExitCode::SUCCESS)
    }
}

/// Download a remote folder tree
#[derive(Debug, Args)]
pub struct MgetCommand {
    /// Remote folder
    pub remote_folder: String,

    /// Local destination directory (created if missing)
    pub local: PathBuf,

    /// Maximum folder depth; 1 downloads only the folder's own files
    #[arg(long)]
    pub depth: Option<u32>,

    /// Remote path to leave out (repeatable)
    #[arg(long = "exclude", value_name = "PATH")]
    pub excluded: Vec<String>,
}

impl MgetCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let (mut session, engine) = ctx.connect().await?;
        let depth = self.depth.unwrap_or(ctx.config.listing.max_depth);
        info!(remote = %self.remote_folder, local = %self.local.display(), depth, "Bulk download");

        let report = engine
            .sync_download(
                &mut session,
                &self.remote_folder,
                &self.local,
                depth,
                &self.excluded,
            )
            .await
            .with_context(|| format!("Failed to download {}", self.remote_folder))?;

        print_report(ctx, &*fmt, &report)
    }
}

/// Upload a local directory tree
#[derive(Debug, Args)]
pub struct MputCommand {
    /// Local directory
    pub local: PathBuf,

    /// Remote destination folder (must exist)
    pub remote_folder: String,

    /// Maximum directory depth; 1 uploads only the directory's own files
    #[arg(long)]
    pub depth: Option<u32>,
}

impl MputCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let (mut session, engine) = ctx.connect().await?;
        let depth = self.depth.unwrap_or(ctx.config.listing.max_depth);
        info!(local = %self.local.display(), remote = %self.remote_folder, depth, "Bulk upload");

        let report = engine
            .sync_upload(&mut session, &self.local, &self.remote_folder, depth)
            .await
            .with_context(|| format!("Failed to upload {}", self.local.display()))?;

        print_report(ctx, &*fmt, &report)
    }
}

fn print_report(
    ctx: &CommandContext,
    fmt: &dyn OutputFormatter,
    report: &SyncReport,
) -> Result<ExitCode> {
    if ctx.is_json() {
        fmt.print_json(&serde_json::to_value(report)?);
    } else {
        for warning in &report.warnings {
            fmt.warn(warning);
        }
        for failed in &report.failed {
            fmt.error(&format!("{}: {}", failed.path, failed.error));
        }
        if report.is_success() {
            fmt.success(&report.summary());
        } else {
            fmt.info(&report.summary());
        }
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
