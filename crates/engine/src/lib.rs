//! Lua connector runtime for Tanoshi.
//!
//! This crate loads connector scripts that describe how to talk to a manga
//! source, performs the HTTP calls they describe and turns the script's
//! parsed results back into [`tanoshi_types`] records.

pub mod bridge;
pub mod config;
pub mod connector;
pub mod error;
pub mod http;
pub mod protocol;
pub mod sandbox;
pub mod session;

use std::path::Path;
use std::sync::Arc;

pub use crate::config::EngineConfig;
pub use crate::connector::Connector;
pub use crate::error::{Error, ProtocolError, Result, TransportError, TransportErrorKind};
pub use crate::http::{HttpExecutor, ReqwestExecutor};
pub use crate::protocol::Operation;
pub use crate::session::SessionHeaders;

/// Creates connectors that share one transport and configuration.
pub struct ConnectorEngine {
    executor: Arc<dyn HttpExecutor>,
    config: EngineConfig,
}

impl ConnectorEngine {
    pub fn new(executor: Arc<dyn HttpExecutor>, config: EngineConfig) -> Self {
        Self { executor, config }
    }

    /// Engine backed by [`ReqwestExecutor`], honouring the configured request timeout.
    pub fn with_default_transport(config: EngineConfig) -> Result<Self> {
        let executor = match config.request_timeout() {
            Some(timeout) => ReqwestExecutor::with_timeout(timeout)?,
            None => ReqwestExecutor::new(),
        };
        Ok(Self::new(Arc::new(executor), config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn executor(&self) -> Arc<dyn HttpExecutor> {
        self.executor.clone()
    }

    pub async fn load_connector(&self, path: impl AsRef<Path>) -> Result<Connector> {
        Connector::load(path, self.executor.clone(), &self.config).await
    }

    pub fn load_connector_from_source(&self, name: &str, source: &str) -> Result<Connector> {
        Connector::from_source(name, source, self.executor.clone(), &self.config)
    }
}
