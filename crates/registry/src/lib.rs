//! Installed connectors, per-source settings and the catalog they feed.

pub mod catalog;
pub mod error;
pub mod registry;
pub mod service;
pub mod source_config;

pub use crate::catalog::{CatalogStore, MemoryCatalog};
pub use crate::error::{RegistryError, Result};
pub use crate::registry::ConnectorRegistry;
pub use crate::service::CatalogService;
pub use crate::source_config::{SourceConfig, SourceConfigStore};
