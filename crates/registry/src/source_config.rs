//! Per-source settings persisted as a JSON file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tanoshi_engine::EngineConfig;
use tokio::fs;
use tokio::sync::RwLock;

use crate::error::{RegistryError, Result};

/// Settings for one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Language code → whether chapters in that language are kept.
    #[serde(default)]
    pub languages: BTreeMap<String, bool>,
}

impl SourceConfig {
    /// Enabled language codes. Empty means no language filter applies.
    pub fn enabled_languages(&self) -> Vec<String> {
        self.languages
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(language, _)| language.clone())
            .collect()
    }

    pub fn with_language(mut self, language: impl Into<String>, enabled: bool) -> Self {
        self.languages.insert(language.into(), enabled);
        self
    }
}

/// File-backed map of source name → [`SourceConfig`].
pub struct SourceConfigStore {
    path: PathBuf,
    sources: RwLock<BTreeMap<String, SourceConfig>>,
}

impl SourceConfigStore {
    /// Open the store at the configured `sources_file`.
    pub async fn from_config(config: &EngineConfig) -> Result<Self> {
        Self::load(config.sources_file.clone()).await
    }

    /// Open the store at `path`. A missing file starts an empty store.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let sources = if path.exists() {
            let content = fs::read_to_string(&path)
                .await
                .map_err(|source| RegistryError::ConfigIo {
                    path: path.clone(),
                    source,
                })?;
            serde_json::from_str(&content).map_err(|source| RegistryError::ConfigFormat {
                path: path.clone(),
                source,
            })?
        } else {
            tracing::debug!(path = %path.display(), "source config not found, starting empty");
            BTreeMap::new()
        };

        Ok(Self {
            path,
            sources: RwLock::new(sources),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn save(&self) -> Result<()> {
        let io_error = |source| RegistryError::ConfigIo {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let content = {
            let sources = self.sources.read().await;
            serde_json::to_string_pretty(&*sources).map_err(|source| {
                RegistryError::ConfigFormat {
                    path: self.path.clone(),
                    source,
                }
            })?
        };
        fs::write(&self.path, content).await.map_err(io_error)?;
        Ok(())
    }

    /// Config for `source`, or the default if none was stored.
    pub async fn get(&self, source: &str) -> SourceConfig {
        self.sources
            .read()
            .await
            .get(source)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the config for `source` and write the file.
    pub async fn set(&self, source: &str, config: SourceConfig) -> Result<()> {
        self.sources
            .write()
            .await
            .insert(source.to_string(), config);
        self.save().await
    }
}
