use std::sync::Arc;

use shared::protocol::ImageRecord;

use crate::cache::{CacheSnapshot, CacheStatus, FetchOutcome, PaginatedQueryCache};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedImage {
    pub img_url: Option<String>,
}

impl SelectedImage {
    pub fn is_open(&self) -> bool {
        self.img_url.is_some()
    }

    pub fn original_link(&self) -> Option<&str> {
        self.img_url.as_deref()
    }
}

pub struct GalleryViewModel {
    cache: Arc<PaginatedQueryCache>,
    flattened: Vec<ImageRecord>,
    flattened_revision: Option<u64>,
    selected: SelectedImage,
}

impl GalleryViewModel {
    pub fn new(cache: Arc<PaginatedQueryCache>) -> Self {
        Self {
            cache,
            flattened: Vec::new(),
            flattened_revision: None,
            selected: SelectedImage::default(),
        }
    }

    pub fn cache(&self) -> &Arc<PaginatedQueryCache> {
        &self.cache
    }

    pub async fn fetch_initial(&self) -> FetchOutcome {
        self.cache.fetch_initial().await
    }

    pub async fn fetch_next(&self) -> FetchOutcome {
        self.cache.fetch_next().await
    }

    // Rebuilt only when the cache revision moved.
    pub async fn flattened_images(&mut self) -> &[ImageRecord] {
        let revision = self.cache.revision().await;
        if self.flattened_revision != Some(revision) {
            let (revision, items) = self.cache.items_with_revision().await;
            self.flattened = items;
            self.flattened_revision = Some(revision);
        }
        &self.flattened
    }

    pub async fn status(&self) -> CacheStatus {
        self.cache.status().await
    }

    pub async fn has_more(&self) -> bool {
        self.cache.has_more().await
    }

    pub async fn snapshot(&self) -> CacheSnapshot {
        self.cache.snapshot().await
    }

    pub fn selected(&self) -> &SelectedImage {
        &self.selected
    }

    pub fn select_image(&mut self, url: impl Into<String>) {
        self.selected.img_url = Some(url.into());
    }

    pub async fn select_index(&mut self, index: usize) -> bool {
        let url = match self.flattened_images().await.get(index) {
            Some(record) => record.url.clone(),
            None => return false,
        };
        self.select_image(url);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = SelectedImage::default();
    }
}

#[cfg(test)]
#[path = "tests/view_model_tests.rs"]
mod tests;
