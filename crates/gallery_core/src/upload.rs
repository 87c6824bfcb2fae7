use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use shared::protocol::{CreateImageRequest, ImageRecord};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    api::{FileHost, GalleryApi},
    cache::CacheInvalidator,
    draft::UploadDraft,
    error::{FileHostError, GalleryApiError},
    validation::{validate_draft, validate_file, ValidationErrors, ValidationFailure},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Success(ImageRecord),
    ValidationFailed(ValidationErrors),
    UploadFailed(FileHostError),
    CreateFailed(GalleryApiError),
    /// Another submission from this coordinator has not settled yet.
    Busy,
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn notice(&self) -> Option<Notice> {
        let notice = match self {
            Self::Success(_) => Notice::success(
                "Image registered",
                "Your image was registered successfully.",
            ),
            Self::ValidationFailed(errors)
                if errors.contains(|f| matches!(f, ValidationFailure::MissingFile)) =>
            {
                Notice::error(
                    "Image not added",
                    "You need to add and wait for the image upload before registering.",
                )
            }
            Self::ValidationFailed(errors) => Notice::error("Invalid form", errors.to_string()),
            Self::UploadFailed(err) => Notice::error("Image upload failed", err.to_string()),
            Self::CreateFailed(err) => Notice::error("Failed to register image", err.to_string()),
            Self::Busy => return None,
        };
        Some(notice)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
}

impl Notice {
    fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: title.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachError {
    #[error("{0}")]
    Invalid(ValidationErrors),
    #[error(transparent)]
    Upload(#[from] FileHostError),
}

pub struct UploadCoordinator {
    api: Arc<dyn GalleryApi>,
    file_host: Arc<dyn FileHost>,
    cache: Arc<dyn CacheInvalidator>,
    submitting: AtomicBool,
}

/// Clears the in-flight flag even if the submitting future is dropped.
struct SubmittingGuard<'a>(&'a AtomicBool);

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl UploadCoordinator {
    pub fn new(
        api: Arc<dyn GalleryApi>,
        file_host: Arc<dyn FileHost>,
        cache: Arc<dyn CacheInvalidator>,
    ) -> Self {
        Self {
            api,
            file_host,
            cache,
            submitting: AtomicBool::new(false),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    pub async fn attach_file(&self, draft: &mut UploadDraft) -> Result<String, AttachError> {
        let failures = validate_file(draft.file.as_ref());
        let Some(file) = draft.file.as_ref().filter(|_| failures.is_empty()) else {
            return Err(AttachError::Invalid(ValidationErrors::from_failures(
                failures,
            )));
        };

        let url = self.file_host.upload_file(file).await?;
        info!(name = %file.name, url = %url, "upload: file attached");
        draft.remote_url = Some(url.clone());
        Ok(url)
    }

    // The draft is not reset here; the caller does that once this settles.
    pub async fn submit_upload(&self, draft: &mut UploadDraft) -> UploadOutcome {
        if self.submitting.swap(true, Ordering::AcqRel) {
            return UploadOutcome::Busy;
        }
        let _guard = SubmittingGuard(&self.submitting);

        if let Err(errors) = validate_draft(draft) {
            info!(failures = errors.failures().len(), "upload: draft rejected");
            return UploadOutcome::ValidationFailed(errors);
        }

        let url = match draft.remote_url.clone() {
            Some(url) => url,
            None => {
                let Some(file) = draft.file.as_ref() else {
                    return UploadOutcome::ValidationFailed(ValidationErrors::single(
                        ValidationFailure::MissingFile,
                    ));
                };
                match self.file_host.upload_file(file).await {
                    Ok(url) => {
                        draft.remote_url = Some(url.clone());
                        url
                    }
                    Err(err) => {
                        warn!(error = %err, "upload: file host step failed");
                        return UploadOutcome::UploadFailed(err);
                    }
                }
            }
        };

        let request = CreateImageRequest {
            url,
            title: draft.title.clone(),
            description: draft.description.clone(),
        };
        let record = match self.api.create_image(&request).await {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "upload: create step failed");
                return UploadOutcome::CreateFailed(err);
            }
        };

        self.cache.invalidate().await;
        info!(id = %record.id, "upload: image registered");
        UploadOutcome::Success(record)
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
