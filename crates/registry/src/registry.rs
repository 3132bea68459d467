use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tanoshi_engine::{Connector, ConnectorEngine};

use crate::error::{RegistryError, Result};

/// Installed connectors, keyed by the name each script reports.
#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: BTreeMap<String, Arc<Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.lua` script in `dir`.
    ///
    /// Scripts that fail to load are skipped. When two scripts report the same
    /// name, the first one in path order is kept.
    pub async fn load_dir(engine: &ConnectorEngine, dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut registry = Self::new();

        for path in script_paths(dir).await? {
            match engine.load_connector(&path).await {
                Ok(connector) => registry.insert(connector),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping connector");
                }
            }
        }

        tracing::info!(dir = %dir.display(), count = registry.len(), "loaded connectors");
        Ok(registry)
    }

    /// Load the scripts in the engine's configured `connectors_dir`.
    pub async fn from_config(engine: &ConnectorEngine) -> Result<Self> {
        Self::load_dir(engine, &engine.config().connectors_dir).await
    }

    /// Add a connector unless one with the same name is already present.
    pub fn insert(&mut self, connector: Connector) {
        if let Some(existing) = self.connectors.get(connector.name()) {
            tracing::warn!(
                name = connector.name(),
                kept = %existing.path().display(),
                ignored = %connector.path().display(),
                "duplicate connector name"
            );
            return;
        }
        self.connectors
            .insert(connector.name().to_string(), Arc::new(connector));
    }

    pub fn get(&self, name: &str) -> Result<Arc<Connector>> {
        self.connectors
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::SourceNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.connectors.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

async fn script_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_dir_error = |source| RegistryError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_dir_error)?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_dir_error)? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "lua") && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tanoshi_engine::EngineConfig;

    fn engine() -> ConnectorEngine {
        ConnectorEngine::with_default_transport(EngineConfig::default()).unwrap()
    }

    fn connector(name: &str) -> String {
        format!(
            r#"
            function name() return "{name}" end
            function base_url() return "https://{name}.test" end
            "#
        )
    }

    #[tokio::test]
    async fn test_load_dir_skips_broken_and_duplicate_scripts() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a_first.lua"), connector("mangadex"))
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("b_second.lua"), connector("mangadex"))
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("c_other.lua"), connector("mangasee"))
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("d_broken.lua"), "function name(")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), "not a script")
            .await
            .unwrap();

        let registry = ConnectorRegistry::load_dir(&engine(), dir.path()).await.unwrap();

        assert_eq!(registry.names(), vec!["mangadex", "mangasee"]);
        assert_eq!(
            registry.get("mangadex").unwrap().path(),
            dir.path().join("a_first.lua").as_path()
        );
    }

    #[tokio::test]
    async fn test_from_config_reads_connectors_dir() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("mangadex.lua"), connector("mangadex"))
            .await
            .unwrap();

        let config = EngineConfig {
            connectors_dir: dir.path().to_path_buf(),
            ..EngineConfig::default()
        };
        let engine = ConnectorEngine::with_default_transport(config).unwrap();
        let registry = ConnectorRegistry::from_config(&engine).await.unwrap();

        assert_eq!(registry.names(), vec!["mangadex"]);
    }

    #[tokio::test]
    async fn test_unknown_source() {
        let registry = ConnectorRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.get("nope"),
            Err(RegistryError::SourceNotFound(name)) if name == "nope"
        ));
    }

    #[tokio::test]
    async fn test_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConnectorRegistry::load_dir(&engine(), dir.path().join("absent")).await;
        assert!(matches!(result, Err(RegistryError::ReadDir { .. })));
    }
}
