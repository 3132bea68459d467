//! Persistence side of the runtime: where fetched records end up.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tanoshi_types::{Chapter, Manga};

use crate::error::Result;
use crate::source_config::SourceConfig;

/// Storage the catalog service writes fetched records into.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert manga that are not yet known, keyed by `(source, path)`.
    ///
    /// Returns one record per input, in input order, each carrying its stored id.
    async fn save_manga_batch(&self, manga: Vec<Manga>) -> Result<Vec<Manga>>;

    /// Insert or update a chapter keyed by `(source, path)`.
    async fn save_chapter(&self, chapter: Chapter) -> Result<Chapter>;

    /// Languages the user keeps for `source`. Empty means all.
    async fn enabled_languages(&self, source: &str) -> Result<Vec<String>>;
}

type Key = (String, String);

/// In-memory [`CatalogStore`] assigning sequential ids.
#[derive(Default)]
pub struct MemoryCatalog {
    next_id: AtomicI64,
    manga: DashMap<Key, Manga>,
    chapters: DashMap<Key, Chapter>,
    sources: DashMap<String, SourceConfig>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Store `config` for `source` and drop chapters in languages it no longer enables.
    pub fn apply_source_config(&self, source: &str, config: SourceConfig) {
        let enabled = config.enabled_languages();
        if !enabled.is_empty() {
            let before = self.chapters.len();
            self.chapters.retain(|(chapter_source, _), chapter| {
                chapter_source != source || enabled.contains(&chapter.language)
            });
            let removed = before - self.chapters.len();
            if removed > 0 {
                tracing::info!(source, removed, "removed chapters in disabled languages");
            }
        }
        self.sources.insert(source.to_string(), config);
    }

    pub fn manga(&self, source: &str, path: &str) -> Option<Manga> {
        self.manga
            .get(&(source.to_string(), path.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Chapters of `manga_id`, ordered by rank.
    pub fn chapters_of(&self, manga_id: i64) -> Vec<Chapter> {
        let mut chapters: Vec<Chapter> = self
            .chapters
            .iter()
            .filter(|entry| entry.manga_id == manga_id)
            .map(|entry| entry.value().clone())
            .collect();
        chapters.sort_by_key(|chapter| chapter.rank);
        chapters
    }

    pub fn manga_count(&self) -> usize {
        self.manga.len()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn save_manga_batch(&self, manga: Vec<Manga>) -> Result<Vec<Manga>> {
        let saved = manga
            .into_iter()
            .map(|mut m| {
                let key = (m.source.clone(), m.path.clone());
                self.manga
                    .entry(key)
                    .or_insert_with(|| {
                        m.id = self.allocate_id();
                        m
                    })
                    .value()
                    .clone()
            })
            .collect();
        Ok(saved)
    }

    async fn save_chapter(&self, mut chapter: Chapter) -> Result<Chapter> {
        let key = (chapter.source.clone(), chapter.path.clone());
        chapter.id = match self.chapters.get(&key) {
            Some(existing) => existing.id,
            None => self.allocate_id(),
        };
        self.chapters.insert(key, chapter.clone());
        Ok(chapter)
    }

    async fn enabled_languages(&self, source: &str) -> Result<Vec<String>> {
        Ok(self
            .sources
            .get(source)
            .map(|config| config.enabled_languages())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manga(path: &str) -> Manga {
        Manga {
            source: "mangadex".to_string(),
            path: path.to_string(),
            ..Manga::default()
        }
    }

    fn chapter(path: &str, language: &str) -> Chapter {
        Chapter {
            source: "mangadex".to_string(),
            manga_id: 1,
            path: path.to_string(),
            language: language.to_string(),
            ..Chapter::default()
        }
    }

    #[tokio::test]
    async fn test_save_manga_batch_is_idempotent() {
        let catalog = MemoryCatalog::new();

        let first = catalog
            .save_manga_batch(vec![manga("/a"), manga("/b")])
            .await
            .unwrap();
        let second = catalog
            .save_manga_batch(vec![manga("/b"), manga("/c"), manga("/a")])
            .await
            .unwrap();

        let ids: Vec<_> = second.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![first[1].id, 3, first[0].id]);
        assert_eq!(catalog.manga_count(), 3);
    }

    #[tokio::test]
    async fn test_save_chapter_keeps_id_on_update() {
        let catalog = MemoryCatalog::new();

        let saved = catalog.save_chapter(chapter("/c/1", "en")).await.unwrap();
        let mut updated = chapter("/c/1", "en");
        updated.title = "Renamed".to_string();
        let updated = catalog.save_chapter(updated).await.unwrap();

        assert_eq!(saved.id, updated.id);
        assert_eq!(catalog.chapters_of(1)[0].title, "Renamed");
    }

    #[tokio::test]
    async fn test_apply_source_config_drops_disabled_languages() {
        let catalog = MemoryCatalog::new();
        for (path, language) in [("/c/1", "en"), ("/c/2", "fr"), ("/c/3", "en")] {
            catalog.save_chapter(chapter(path, language)).await.unwrap();
        }

        catalog.apply_source_config("mangadex", SourceConfig::default().with_language("en", true));

        let languages: Vec<_> = catalog
            .chapters_of(1)
            .into_iter()
            .map(|c| c.language)
            .collect();
        assert_eq!(languages, vec!["en", "en"]);
        assert_eq!(
            catalog.enabled_languages("mangadex").await.unwrap(),
            vec!["en"]
        );
    }
}
