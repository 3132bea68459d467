use std::sync::Arc;

use tanoshi_types::{Chapter, Credentials, Filters, Manga};

use crate::catalog::CatalogStore;
use crate::error::Result;
use crate::registry::ConnectorRegistry;

/// Runs connector operations by source name and records the results.
pub struct CatalogService<S> {
    registry: ConnectorRegistry,
    store: Arc<S>,
}

impl<S: CatalogStore> CatalogService<S> {
    pub fn new(registry: ConnectorRegistry, store: Arc<S>) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &ConnectorRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    #[tracing::instrument(skip(self))]
    pub async fn latest_updates(&self, source: &str, page: i64) -> Result<Vec<Manga>> {
        let connector = self.registry.get(source)?;
        let manga = connector.get_latest_updates(page).await?;
        self.store.save_manga_batch(manga).await
    }

    /// Fetch fresh details; the result keeps the caller's id.
    #[tracing::instrument(skip_all, fields(source = %source, id = manga.id))]
    pub async fn refresh_manga(&self, source: &str, manga: &Manga) -> Result<Manga> {
        let connector = self.registry.get(source)?;
        Ok(connector.get_manga_details(manga).await?)
    }

    /// Fetch chapters, keep those in enabled languages and save them against `manga`.
    #[tracing::instrument(skip_all, fields(source = %source, id = manga.id))]
    pub async fn chapters(&self, source: &str, manga: &Manga) -> Result<Vec<Chapter>> {
        let connector = self.registry.get(source)?;
        let chapters = connector.get_chapters(manga).await?;
        let languages = self.store.enabled_languages(source).await?;

        let mut saved = Vec::with_capacity(chapters.len());
        for mut chapter in chapters {
            if !languages.is_empty() && !languages.contains(&chapter.language) {
                tracing::debug!(path = %chapter.path, language = %chapter.language, "skipping chapter");
                continue;
            }
            chapter.manga_id = manga.id;
            saved.push(self.store.save_chapter(chapter).await?);
        }
        Ok(saved)
    }

    #[tracing::instrument(skip_all, fields(source = %source, id = chapter.id))]
    pub async fn chapter(&self, source: &str, chapter: &Chapter) -> Result<Chapter> {
        let connector = self.registry.get(source)?;
        Ok(connector.get_chapter(chapter).await?)
    }

    #[tracing::instrument(skip(self, filters))]
    pub async fn search(&self, source: &str, filters: &Filters) -> Result<Vec<Manga>> {
        let connector = self.registry.get(source)?;
        Ok(connector.fetch_manga(filters).await?)
    }

    #[tracing::instrument(skip(self, credentials))]
    pub async fn login(&self, source: &str, credentials: &Credentials) -> Result<()> {
        let connector = self.registry.get(source)?;
        Ok(connector.login(credentials).await?)
    }
}
