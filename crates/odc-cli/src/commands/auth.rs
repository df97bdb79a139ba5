//! Auth commands - token storage and `whoami`
//!
//! ODC does not run an OAuth flow. A bearer token obtained elsewhere is
//! stored in the system keyring with `odc auth set-token`, or supplied
//! through `ODC_ACCESS_TOKEN`.

use std::io::BufRead;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Subcommand;
use odc_core::ports::DriveApi;
use tracing::info;

use super::CommandContext;

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Store an access token in the system keyring
    SetToken {
        /// The token; read from standard input when omitted
        token: Option<String>,
    },
    /// Remove the stored access token
    Clear,
}

impl AuthCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let fmt = ctx.formatter();
        let store = ctx.token_store();
        match self {
            AuthCommand::SetToken { token } => {
                let token = match token {
                    Some(token) => token.clone(),
                    None => {
                        let mut line = String::new();
                        std::io::stdin()
                            .lock()
                            .read_line(&mut line)
                            .context("Failed to read token from standard input")?;
                        line
                    }
                };
                store.store(&token)?;
                fmt.success(&format!("Token stored for account '{}'", store.account()));
            }
            AuthCommand::Clear => {
                if store.clear()? {
                    fmt.success(&format!("Token removed for account '{}'", store.account()));
                } else {
                    fmt.info(&format!("No token stored for account '{}'", store.account()));
                }
            }
        }
        Ok(ExitCode::SUCCESS)
    }
}

/// Show the signed-in user
pub async fn whoami(ctx: &CommandContext) -> Result<ExitCode> {
    let fmt = ctx.formatter();
    let drive = ctx.drive()?;
    let user = drive
        .user_info()
        .await
        .context("Failed to fetch user information")?;
    info!(user = %user.principal_name, "Fetched user information");

    if ctx.is_json() {
        fmt.print_json(&serde_json::to_value(&user)?);
    } else {
        fmt.success(&format!("{} <{}>", user.display_name, user.principal_name));
        fmt.info(&format!("Id: {}", user.id));
    }
    Ok(ExitCode::SUCCESS)
}
