use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::Result;
use serde::{Deserialize, Serialize};
use tokio::fs;

/// User agent sent when neither session state nor the request overrides it.
pub const DEFAULT_USER_AGENT: &str = concat!("Tanoshi/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Upper bound on memory a single connector's Lua state may allocate.
    #[serde(default)]
    pub memory_limit: Option<usize>,
    /// Applied by the default transport only; the connector chain itself has no deadline.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_connectors_dir")]
    pub connectors_dir: PathBuf,
    #[serde(default = "default_sources_file")]
    pub sources_file: PathBuf,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_connectors_dir() -> PathBuf {
    PathBuf::from("./connectors")
}

fn default_sources_file() -> PathBuf {
    PathBuf::from("./local/sources.json")
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            memory_limit: None,
            request_timeout_secs: None,
            connectors_dir: default_connectors_dir(),
            sources_file: default_sources_file(),
        }
    }
}

impl EngineConfig {
    /// Read the config at `path`, falling back to defaults if it does not exist.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).await?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
