//! QuickXorHash of local files

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use odc_sync::hashing::hash_file;

use super::CommandContext;

/// Print the QuickXorHash OneDrive would report for local files
#[derive(Debug, Args)]
pub struct QxhCommand {
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

impl QxhCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let mut hashes = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let hash = hash_file(file)
                .await
                .with_context(|| format!("Failed to hash {}", file.display()))?;
            if !ctx.is_json() {
                println!("{hash}  {}", file.display());
            }
            hashes.push(serde_json::json!({"file": file.display().to_string(), "quickxorhash": hash}));
        }
        if ctx.is_json() {
            fmt.print_json(&serde_json::Value::Array(hashes));
        }
        Ok(ExitCode::SUCCESS)
    }
}
