//! Catalog records shared between the connector runtime and its collaborators.
//!
//! These are plain value objects. Connectors produce them from parsed site
//! responses, and the persistence layer decides how long they live.

mod filters;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub use filters::{FilterValue, Filters};

/// A series as reported by a content source.
///
/// Identity across sources is `(source, path)`; `id` is assigned by the
/// persistence layer and is `0` until then.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
pub struct Manga {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub source: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub path: String,
    #[serde(default)]
    pub cover_url: String,
    pub last_updated: Option<NaiveDateTime>,
}

/// A chapter of a [`Manga`], ordered within it by `rank`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
pub struct Chapter {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub manga_id: i64,
    #[serde(default)]
    pub source: String,
    pub title: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub rank: i64,
    pub path: String,
    pub uploaded: Option<NaiveDateTime>,
    #[serde(default)]
    pub pages: Vec<Page>,
}

/// A single image of a [`Chapter`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
pub struct Page {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub chapter_id: i64,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub rank: i64,
    pub url: String,
}

/// Login input handed to a connector's `login_request` entry point.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub two_factor: String,
    #[serde(default)]
    pub remember_me: bool,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("two_factor", &"<redacted>")
            .field("remember_me", &self.remember_me)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manga_deserializes_with_defaults() {
        let manga: Manga = serde_json::from_str(
            r#"{"title": "Blame!", "path": "/manga/blame", "status": null, "description": null, "last_updated": null}"#,
        )
        .unwrap();

        assert_eq!(manga.id, 0);
        assert!(manga.source.is_empty());
        assert!(manga.authors.is_empty());
        assert_eq!(manga.path, "/manga/blame");
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let credentials = Credentials {
            username: "reader".to_string(),
            password: "hunter2".to_string(),
            two_factor: "123456".to_string(),
            remember_me: true,
        };

        let printed = format!("{credentials:?}");
        assert!(printed.contains("reader"));
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("123456"));
    }
}
