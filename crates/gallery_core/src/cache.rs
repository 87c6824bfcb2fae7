use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::Cursor,
    protocol::{ImagePage, ImageRecord},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{api::GalleryApi, error::GalleryApiError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Idle,
    Loading,
    Ready,
    LoadingMore,
    Error,
}

impl CacheStatus {
    pub fn is_fetching(self) -> bool {
        matches!(self, Self::Loading | Self::LoadingMore)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    StatusChanged(CacheStatus),
    PageAppended { page_index: usize, items: usize },
    Invalidated,
    StaleResponseDiscarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    Skipped,
    Failed(GalleryApiError),
    /// The cache was invalidated while the request was in flight.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub status: CacheStatus,
    pub page_count: usize,
    pub item_count: usize,
    pub has_more: bool,
    pub last_error: Option<GalleryApiError>,
}

#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self);
}

struct CacheState {
    pages: Vec<ImagePage>,
    status: CacheStatus,
    last_error: Option<GalleryApiError>,
    generation: u64,
    revision: u64,
}

impl CacheState {
    fn has_more(&self) -> bool {
        match self.pages.last() {
            Some(page) => page.has_next(),
            None => matches!(self.status, CacheStatus::Idle | CacheStatus::Error),
        }
    }

    fn last_cursor(&self) -> Option<Cursor> {
        self.pages.last().and_then(|page| page.after.clone())
    }
}

// At most one fetch is in flight: the status check at the start of each fetch
// enforces it, and the lock is never held across the network call. Each
// invalidation bumps `generation` so late responses are dropped.
pub struct PaginatedQueryCache {
    api: Arc<dyn GalleryApi>,
    state: Mutex<CacheState>,
    events: broadcast::Sender<CacheEvent>,
}

impl PaginatedQueryCache {
    pub fn new(api: Arc<dyn GalleryApi>) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            api,
            state: Mutex::new(CacheState {
                pages: Vec::new(),
                status: CacheStatus::Idle,
                last_error: None,
                generation: 0,
                revision: 0,
            }),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    // Callers hold the state lock so subscribers see events in state order.
    fn emit(&self, event: CacheEvent) {
        let _ = self.events.send(event);
    }

    pub async fn fetch_initial(&self) -> FetchOutcome {
        let generation = {
            let mut state = self.state.lock().await;
            if !matches!(state.status, CacheStatus::Idle | CacheStatus::Error) {
                debug!(status = ?state.status, "cache: fetch_initial ignored");
                return FetchOutcome::Skipped;
            }
            state.status = CacheStatus::Loading;
            self.emit(CacheEvent::StatusChanged(CacheStatus::Loading));
            state.generation
        };

        let result = self.api.list_page(None).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            info!("cache: dropping initial page that arrived after invalidation");
            self.emit(CacheEvent::StaleResponseDiscarded);
            return FetchOutcome::Discarded;
        }

        match result {
            Ok(page) => {
                let items = page.data.len();
                state.pages = vec![page];
                state.status = CacheStatus::Ready;
                state.last_error = None;
                state.revision += 1;
                info!(items, has_more = state.has_more(), "cache: initial page loaded");
                self.emit(CacheEvent::PageAppended {
                    page_index: 0,
                    items,
                });
                self.emit(CacheEvent::StatusChanged(CacheStatus::Ready));
                FetchOutcome::Applied
            }
            Err(err) => {
                warn!(error = %err, "cache: initial page failed");
                if !state.pages.is_empty() {
                    state.pages.clear();
                    state.revision += 1;
                }
                state.status = CacheStatus::Error;
                state.last_error = Some(err.clone());
                self.emit(CacheEvent::StatusChanged(CacheStatus::Error));
                FetchOutcome::Failed(err)
            }
        }
    }

    // A failure keeps the pages already loaded.
    pub async fn fetch_next(&self) -> FetchOutcome {
        let (generation, cursor) = {
            let mut state = self.state.lock().await;
            if state.status != CacheStatus::Ready {
                debug!(status = ?state.status, "cache: fetch_next ignored");
                return FetchOutcome::Skipped;
            }
            let Some(cursor) = state.last_cursor() else {
                debug!("cache: fetch_next ignored, no further pages");
                return FetchOutcome::Skipped;
            };
            state.status = CacheStatus::LoadingMore;
            self.emit(CacheEvent::StatusChanged(CacheStatus::LoadingMore));
            (state.generation, cursor)
        };

        let result = self.api.list_page(Some(&cursor)).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            info!(cursor = %cursor, "cache: dropping next page that arrived after invalidation");
            self.emit(CacheEvent::StaleResponseDiscarded);
            return FetchOutcome::Discarded;
        }

        state.status = CacheStatus::Ready;
        match result {
            Ok(page) => {
                let items = page.data.len();
                state.pages.push(page);
                state.last_error = None;
                state.revision += 1;
                let page_index = state.pages.len() - 1;
                info!(page_index, items, has_more = state.has_more(), "cache: next page loaded");
                self.emit(CacheEvent::PageAppended { page_index, items });
                self.emit(CacheEvent::StatusChanged(CacheStatus::Ready));
                FetchOutcome::Applied
            }
            Err(err) => {
                warn!(cursor = %cursor, error = %err, "cache: next page failed, keeping loaded pages");
                state.last_error = Some(err.clone());
                self.emit(CacheEvent::StatusChanged(CacheStatus::Ready));
                FetchOutcome::Failed(err)
            }
        }
    }

    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        let previous = state.status;
        state.pages.clear();
        state.status = CacheStatus::Idle;
        state.last_error = None;
        state.generation += 1;
        state.revision += 1;
        info!(previous = ?previous, "cache: invalidated");
        self.emit(CacheEvent::Invalidated);
        self.emit(CacheEvent::StatusChanged(CacheStatus::Idle));
    }

    pub async fn refresh(&self) -> FetchOutcome {
        self.invalidate().await;
        self.fetch_initial().await
    }

    pub async fn status(&self) -> CacheStatus {
        self.state.lock().await.status
    }

    pub async fn has_more(&self) -> bool {
        self.state.lock().await.has_more()
    }

    pub async fn last_error(&self) -> Option<GalleryApiError> {
        self.state.lock().await.last_error.clone()
    }

    pub async fn pages(&self) -> Vec<ImagePage> {
        self.state.lock().await.pages.clone()
    }

    /// Bumped whenever the page sequence changes.
    pub async fn revision(&self) -> u64 {
        self.state.lock().await.revision
    }

    pub async fn items_with_revision(&self) -> (u64, Vec<ImageRecord>) {
        let state = self.state.lock().await;
        let items = state
            .pages
            .iter()
            .flat_map(|page| page.data.iter().cloned())
            .collect();
        (state.revision, items)
    }

    pub async fn snapshot(&self) -> CacheSnapshot {
        let state = self.state.lock().await;
        CacheSnapshot {
            status: state.status,
            page_count: state.pages.len(),
            item_count: state.pages.iter().map(|page| page.data.len()).sum(),
            has_more: state.has_more(),
            last_error: state.last_error.clone(),
        }
    }
}

#[async_trait]
impl CacheInvalidator for PaginatedQueryCache {
    async fn invalidate(&self) {
        PaginatedQueryCache::invalidate(self).await
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
