//! CLI subcommands
//!
//! Every command receives a [`CommandContext`] holding the loaded
//! configuration and the output format, and returns the process exit code.

use std::sync::Arc;

use anyhow::{Context, Result};
use odc_core::config::Config;
use odc_core::usecases::DriveSession;
use odc_graph::auth::TokenStore;
use odc_graph::GraphDrive;
use odc_sync::{QuickXorHasher, SyncEngine};
use tracing::debug;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

pub mod auth;
pub mod browse;
pub mod manage;
pub mod qxh;
pub mod transfer;

/// State shared by all commands of one invocation
pub struct CommandContext {
    pub config: Config,
    pub format: OutputFormat,
}

impl CommandContext {
    pub fn new(config: Config, format: OutputFormat) -> Self {
        Self { config, format }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.is_json())
    }

    pub fn token_store(&self) -> TokenStore {
        TokenStore::new(self.config.auth.account.clone())
    }

    /// Graph drive for the configured account
    pub fn drive(&self) -> Result<Arc<GraphDrive>> {
        let (token, source) = self.token_store().load()?.context(
            "No access token found. Set ODC_ACCESS_TOKEN or run 'odc auth set-token'",
        )?;
        debug!(?source, base_url = %self.config.graph.base_url, "Connecting to Graph");
        Ok(Arc::new(GraphDrive::from_config(&self.config, token)))
    }

    /// Session rooted at the drive root
    pub async fn session(&self, drive: Arc<GraphDrive>) -> Result<DriveSession> {
        DriveSession::open(drive, Some(self.config.listing.page_size))
            .await
            .context("Failed to open drive")
    }

    /// Drive, session and transfer engine in one go
    pub async fn connect(&self) -> Result<(DriveSession, SyncEngine)> {
        let drive = self.drive()?;
        let engine = SyncEngine::new(drive.clone(), Arc::new(QuickXorHasher));
        let session = self.session(drive).await?;
        Ok((session, engine))
    }
}
