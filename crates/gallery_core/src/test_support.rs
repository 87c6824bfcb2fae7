use std::{collections::VecDeque, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use shared::{
    domain::{Cursor, ImageId},
    protocol::{CreateImageRequest, ImagePage, ImageRecord},
};
use tokio::sync::{oneshot, Mutex};

use crate::{
    api::{FileHost, GalleryApi},
    cache::{CacheInvalidator, CacheStatus, PaginatedQueryCache},
    draft::FileBlob,
    error::{FileHostError, GalleryApiError},
};

pub fn record(id: &str) -> ImageRecord {
    ImageRecord {
        id: ImageId::new(id),
        title: format!("title {id}"),
        description: format!("description {id}"),
        url: format!("https://img.example/{id}.png"),
        created_at: Utc.timestamp_opt(1_620_000_000, 0).single().expect("ts"),
    }
}

pub fn page(ids: &[&str], after: Option<&str>) -> ImagePage {
    ImagePage {
        data: ids.iter().map(|id| record(id)).collect(),
        after: after.map(Cursor::new),
    }
}

pub fn png(size: usize) -> FileBlob {
    FileBlob::new("photo.png", "image/png", vec![0; size])
}

struct ScriptedList {
    result: Result<ImagePage, GalleryApiError>,
    gate: Option<oneshot::Receiver<()>>,
}

#[derive(Default)]
pub struct FakeGalleryApi {
    list_script: Mutex<VecDeque<ScriptedList>>,
    pub list_cursors: Mutex<Vec<Option<Cursor>>>,
    create_result: Mutex<Option<Result<ImageRecord, GalleryApiError>>>,
    pub create_requests: Mutex<Vec<CreateImageRequest>>,
}

impl FakeGalleryApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn push_page(&self, page: ImagePage) {
        self.list_script.lock().await.push_back(ScriptedList {
            result: Ok(page),
            gate: None,
        });
    }

    pub async fn push_error(&self, err: GalleryApiError) {
        self.list_script.lock().await.push_back(ScriptedList {
            result: Err(err),
            gate: None,
        });
    }

    /// The returned sender releases the response.
    pub async fn push_gated_page(&self, page: ImagePage) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.list_script.lock().await.push_back(ScriptedList {
            result: Ok(page),
            gate: Some(rx),
        });
        tx
    }

    pub async fn set_create_result(&self, result: Result<ImageRecord, GalleryApiError>) {
        *self.create_result.lock().await = Some(result);
    }

    pub async fn list_calls(&self) -> usize {
        self.list_cursors.lock().await.len()
    }

    pub async fn create_calls(&self) -> usize {
        self.create_requests.lock().await.len()
    }
}

#[async_trait]
impl GalleryApi for FakeGalleryApi {
    async fn list_page(&self, cursor: Option<&Cursor>) -> Result<ImagePage, GalleryApiError> {
        self.list_cursors.lock().await.push(cursor.cloned());
        let scripted = self.list_script.lock().await.pop_front();
        let Some(scripted) = scripted else {
            return Err(GalleryApiError::Network("no scripted page".into()));
        };
        if let Some(gate) = scripted.gate {
            let _ = gate.await;
        }
        scripted.result
    }

    async fn create_image(
        &self,
        request: &CreateImageRequest,
    ) -> Result<ImageRecord, GalleryApiError> {
        self.create_requests.lock().await.push(request.clone());
        match self.create_result.lock().await.clone() {
            Some(result) => result,
            None => Ok(ImageRecord {
                url: request.url.clone(),
                title: request.title.clone(),
                description: request.description.clone(),
                ..record("created")
            }),
        }
    }
}

#[derive(Default)]
pub struct FakeFileHost {
    fail_with: Option<FileHostError>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub uploaded: Mutex<Vec<String>>,
}

impl FakeFileHost {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(err: FileHostError) -> Arc<Self> {
        Arc::new(Self {
            fail_with: Some(err),
            ..Self::default()
        })
    }

    pub fn gated() -> (Arc<Self>, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        let host = Self {
            gate: Mutex::new(Some(rx)),
            ..Self::default()
        };
        (Arc::new(host), tx)
    }

    pub async fn calls(&self) -> usize {
        self.uploaded.lock().await.len()
    }
}

#[async_trait]
impl FileHost for FakeFileHost {
    async fn upload_file(&self, file: &FileBlob) -> Result<String, FileHostError> {
        self.uploaded.lock().await.push(file.name.clone());
        let gate = self.gate.lock().await.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        Ok(format!("https://host.example/{}", file.name))
    }
}

#[derive(Default)]
pub struct CountingInvalidator {
    pub calls: Mutex<usize>,
}

#[async_trait]
impl CacheInvalidator for CountingInvalidator {
    async fn invalidate(&self) {
        *self.calls.lock().await += 1;
    }
}

pub async fn wait_for_status(cache: &PaginatedQueryCache, status: CacheStatus) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while cache.status().await != status {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("cache never reached expected status");
}
