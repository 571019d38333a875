//! Bounded recent-search history.
//!
//! [`SearchHistory`] is the only writer of the history store. Every change
//! made through it is broadcast so observers can re-read the list.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cache::{CacheError, SearchHistoryStore};

pub use crate::cache::SearchRecord;

/// Default number of searches kept.
pub const DEFAULT_MAX_ITEMS: usize = 10;

/// Recent-search manager, capped at `max_items` records.
#[derive(Clone)]
pub struct SearchHistory {
    store: Arc<dyn SearchHistoryStore>,
    max_items: usize,
    changes: Arc<watch::Sender<u64>>,
}

impl SearchHistory {
    pub fn new(store: Arc<dyn SearchHistoryStore>, max_items: usize) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            store,
            max_items,
            changes: Arc::new(changes),
        }
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Record `query` as the most recent search. Blank queries are ignored.
    ///
    /// Re-saving an existing query moves it to the top without duplicating
    /// it. The store never holds more than `max_items` records afterwards.
    pub fn save_search(&self, query: &str) -> Result<(), CacheError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }

        let record = SearchRecord::new(query, Utc::now());
        self.store.insert_and_trim(&record, self.max_items)?;
        debug!(query, "Saved search");
        self.notify();
        Ok(())
    }

    /// Remove one query. Removing an absent query is not an error.
    pub fn delete_search(&self, query: &str) -> Result<(), CacheError> {
        self.store.delete(query)?;
        self.notify();
        Ok(())
    }

    /// Remove every query.
    pub fn clear_history(&self) -> Result<(), CacheError> {
        self.store.delete_all()?;
        self.notify();
        Ok(())
    }

    /// Most recent searches first, at most `limit` (and never more than
    /// the cap).
    pub fn get_recent(&self, limit: usize) -> Result<Vec<SearchRecord>, CacheError> {
        self.store.recent(limit.min(self.max_items))
    }

    /// Query texts of the most recent searches, yielded now and again after
    /// every change made through this manager.
    pub fn observe_recent(&self, limit: usize) -> BoxStream<'static, Vec<String>> {
        let history = self.clone();
        let rx = self.changes.subscribe();

        stream::unfold((rx, true), move |(mut rx, first)| {
            let history = history.clone();
            async move {
                if !first && rx.changed().await.is_err() {
                    return None;
                }
                rx.borrow_and_update();
                Some((history.recent_queries(limit), (rx, false)))
            }
        })
        .boxed()
    }

    fn recent_queries(&self, limit: usize) -> Vec<String> {
        match self.get_recent(limit) {
            Ok(records) => records.into_iter().map(|r| r.query).collect(),
            Err(e) => {
                warn!(error = %e, "Failed to read search history");
                Vec::new()
            }
        }
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version += 1);
    }
}
