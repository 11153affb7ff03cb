//! Workspace discovery and component wiring shared by all commands.

use anyhow::{Context, Result};
use babel_core::{BabelConfig, SqliteEntryStore, TierTwoCache, TranslationService, load_config};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Resolved workspace and its configuration.
pub struct CliContext {
    workspace: PathBuf,
    config: BabelConfig,
}

impl CliContext {
    /// Loads the configuration of `workspace` (or the current directory) and
    /// applies command-line overrides.
    pub fn load(workspace: Option<PathBuf>, provider: Option<String>) -> Result<Self> {
        let workspace = match workspace {
            Some(path) => path,
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };

        let mut config = load_config(&workspace)
            .with_context(|| format!("Failed to load configuration for {}", workspace.display()))?;
        if let Some(provider) = provider {
            config.inference.provider = provider;
        }

        debug!(
            workspace = %workspace.display(),
            provider = %config.inference.provider,
            "Loaded configuration"
        );
        Ok(Self { workspace, config })
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn config(&self) -> &BabelConfig {
        &self.config
    }

    /// Location of the durable cache database.
    pub fn database_path(&self) -> PathBuf {
        self.config.database_path(&self.workspace)
    }

    /// Builds the full translation service, provider client included.
    pub fn service(&self) -> Result<TranslationService> {
        TranslationService::from_config(&self.config, &self.workspace)
            .context("Failed to initialize translation service")
    }

    /// Opens only the durable tier, for maintenance commands that never call
    /// the provider.
    pub fn tier_two(&self) -> Result<TierTwoCache> {
        let path = self.database_path();
        let store = SqliteEntryStore::open(&path)
            .with_context(|| format!("Failed to open cache database {}", path.display()))?;
        Ok(TierTwoCache::new(Arc::new(store), self.config.cache.tier_two_ttl()))
    }
}
