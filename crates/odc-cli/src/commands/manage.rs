//! Remote management commands - `mv`, `rm`, `mkdir`, `share`

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use odc_core::ports::{DeleteOutcome, ShareKind};

use super::CommandContext;

/// Exit code of `rm` when the path does not exist
const EXIT_NOT_FOUND: u8 = 1;
/// Exit code of `rm` when the server answered something unexpected
const EXIT_UNEXPECTED: u8 = 2;

/// Move or rename a remote item
#[derive(Debug, Args)]
pub struct MvCommand {
    pub source: String,

    /// Existing folder to move into, or the new path
    pub destination: String,
}

impl MvCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let drive = ctx.drive()?;
        let mut session = ctx.session(drive).await?;

        let record = session
            .mv(&self.source, &self.destination)
            .await
            .with_context(|| format!("Failed to move {} to {}", self.source, self.destination))?;

        if ctx.is_json() {
            fmt.print_json(&serde_json::to_value(&record)?);
        } else {
            fmt.success(&format!("Moved {} to {}", self.source, record.path));
        }
        Ok(ExitCode::SUCCESS)
    }
}

/// Delete a remote file or folder
#[derive(Debug, Args)]
pub struct RmCommand {
    pub path: String,
}

impl RmCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let drive = ctx.drive()?;
        let mut session = ctx.session(drive).await?;

        let outcome = session
            .rm(&self.path)
            .await
            .with_context(|| format!("Failed to remove {}", self.path))?;

        if ctx.is_json() {
            let status = match outcome {
                DeleteOutcome::Deleted => "deleted".to_string(),
                DeleteOutcome::NotFound => "not_found".to_string(),
                DeleteOutcome::Unexpected(code) => format!("unexpected_{code}"),
            };
            fmt.print_json(&serde_json::json!({"path": self.path, "status": status}));
        }

        Ok(match outcome {
            DeleteOutcome::Deleted => {
                if !ctx.is_json() {
                    fmt.success(&format!("Removed {}", self.path));
                }
                ExitCode::SUCCESS
            }
            DeleteOutcome::NotFound => {
                if !ctx.is_json() {
                    fmt.error(&format!("{} not found", self.path));
                }
                ExitCode::from(EXIT_NOT_FOUND)
            }
            DeleteOutcome::Unexpected(code) => {
                if !ctx.is_json() {
                    fmt.error(&format!("Server answered HTTP {code} removing {}", self.path));
                }
                ExitCode::from(EXIT_UNEXPECTED)
            }
        })
    }
}

/// Create a remote folder
#[derive(Debug, Args)]
pub struct MkdirCommand {
    /// Path of the new folder; its parent must exist
    pub path: String,
}

impl MkdirCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let drive = ctx.drive()?;
        let mut session = ctx.session(drive).await?;

        let record = session
            .mkdir(&self.path)
            .await
            .with_context(|| format!("Failed to create {}", self.path))?;

        if ctx.is_json() {
            fmt.print_json(&serde_json::to_value(&record)?);
        } else {
            fmt.success(&format!("Created {}", record.path));
        }
        Ok(ExitCode::SUCCESS)
    }
}

/// Create an anonymous sharing link
#[derive(Debug, Args)]
pub struct ShareCommand {
    pub path: String,

    /// Allow editing instead of view-only access
    #[arg(long)]
    pub edit: bool,
}

impl ShareCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let drive = ctx.drive()?;
        let mut session = ctx.session(drive).await?;
        let kind = if self.edit {
            ShareKind::Edit
        } else {
            ShareKind::View
        };

        let link = session
            .share(&self.path, kind)
            .await
            .with_context(|| format!("Failed to share {}", self.path))?;

        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({
                "path": self.path,
                "kind": kind.as_str(),
                "link": link,
            }));
        } else {
            println!("{link}");
        }
        Ok(ExitCode::SUCCESS)
    }
}
