//! HistoryCache - NOK History Strip
//!
//! ## Responsibilities
//!
//! - Fetch the most recent N NOK records (full replacement, never a diff)
//! - Keep the last good list across transient failures
//! - Fixed-interval background polling tied to a `PollHandle`
//! - NOK image locator derivation

use crate::backend_client::PanelBackend;
use crate::error::Result;
use crate::models::{HistoryItem, Severity};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// HistoryCache instance
pub struct HistoryCache<B: PanelBackend> {
    backend: Arc<B>,
    items: RwLock<Arc<Vec<HistoryItem>>>,
    /// One fetch-and-swap at a time, so a slow older response cannot land last
    refresh_lock: Mutex<()>,
    default_severity: Severity,
}

impl<B: PanelBackend> HistoryCache<B> {
    /// Create new, empty cache
    pub fn new(backend: Arc<B>, default_severity: Severity) -> Self {
        Self {
            backend,
            items: RwLock::new(Arc::new(Vec::new())),
            refresh_lock: Mutex::new(()),
            default_severity,
        }
    }

    /// Fetch the latest `limit` items and replace the cached list
    ///
    /// On failure the previous list is kept and the error returned.
    pub async fn refresh(&self, limit: usize) -> Result<Arc<Vec<HistoryItem>>> {
        let _refresh = self.refresh_lock.lock().await;
        let fetched = match self.backend.nok_list(limit).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    kept = self.items().len(),
                    "NOK history refresh failed, keeping last list"
                );
                return Err(e);
            }
        };

        let items: Arc<Vec<HistoryItem>> = Arc::new(
            fetched
                .into_iter()
                .take(limit)
                .map(|item| HistoryItem::from_nok(item, self.default_severity))
                .collect(),
        );

        *self.items.write().unwrap_or_else(|e| e.into_inner()) = Arc::clone(&items);
        tracing::debug!(count = items.len(), limit = limit, "NOK history refreshed");
        Ok(items)
    }

    /// Last good list
    pub fn items(&self) -> Arc<Vec<HistoryItem>> {
        Arc::clone(&self.items.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Image locator for a history item (no network call)
    pub fn image_url(&self, name: &str) -> String {
        self.backend.nok_image_url(name)
    }

    /// Refresh immediately, then every `period`, until the handle is dropped
    ///
    /// `on_refresh` receives each outcome; failures are non-fatal.
    pub fn start_polling<F>(self: &Arc<Self>, limit: usize, period: Duration, on_refresh: F) -> PollHandle
    where
        F: Fn(Result<Arc<Vec<HistoryItem>>>) + Send + Sync + 'static,
    {
        let cache = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                on_refresh(cache.refresh(limit).await);
            }
        });

        tracing::info!(limit = limit, period_secs = period.as_secs(), "NOK history polling started");
        PollHandle { task: Some(task) }
    }
}

/// Background polling handle - dropping it cancels the timer
pub struct PollHandle {
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Stop polling
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("NOK history polling stopped");
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
