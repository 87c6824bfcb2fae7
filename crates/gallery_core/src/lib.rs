pub mod api;
pub mod cache;
pub mod config;
pub mod draft;
pub mod error;
pub mod upload;
pub mod validation;
pub mod view_model;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

pub use api::{FileHost, GalleryApi, HttpFileHost, HttpGalleryApi};
pub use cache::{
    CacheEvent, CacheInvalidator, CacheSnapshot, CacheStatus, FetchOutcome, PaginatedQueryCache,
};
pub use config::{load_config, GalleryConfig};
pub use draft::{FileBlob, UploadDraft};
pub use error::{ConfigError, FileHostError, GalleryApiError};
pub use upload::{AttachError, Notice, NoticeKind, UploadCoordinator, UploadOutcome};
pub use validation::{validate_draft, DraftField, ValidationErrors, ValidationFailure};
pub use view_model::{GalleryViewModel, SelectedImage};

pub struct GallerySession {
    pub view: GalleryViewModel,
    pub uploads: UploadCoordinator,
}

impl GallerySession {
    pub fn new(api: Arc<dyn GalleryApi>, file_host: Arc<dyn FileHost>) -> Self {
        let cache = PaginatedQueryCache::new(api.clone());
        Self {
            view: GalleryViewModel::new(cache.clone()),
            uploads: UploadCoordinator::new(api, file_host, cache),
        }
    }

    pub fn from_config(config: &GalleryConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::new();
        let api_url = config.api_url()?;
        let api = HttpGalleryApi::new(http.clone(), &api_url).map_err(|source| {
            ConfigError::InvalidUrl {
                field: "api_base_url",
                value: config.api_base_url.clone(),
                source,
            }
        })?;
        let file_host = HttpFileHost::new(
            http,
            config.file_host_endpoint()?,
            config.file_host_api_key.clone(),
        );
        Ok(Self::new(Arc::new(api), Arc::new(file_host)))
    }

    pub fn cache(&self) -> &Arc<PaginatedQueryCache> {
        self.view.cache()
    }
}
