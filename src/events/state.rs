//! Event List State
//!
//! Owns the current event index and search filter for one user and rebuilds
//! them when the record store changes.
//!
//! # Rebuild rules
//!
//! ```text
//! on_store_changed()  visible → rebuild now
//!                     hidden  → mark pending (repeated signals coalesce)
//! set_visible(true)   pending or never built → one rebuild
//! ```
//!
//! A rebuild fetches and aggregates outside the lock, then swaps the new
//! index in under the write lock, so readers see either the old or the new
//! index and never a partial one.

use crate::error::CoreError;
use crate::events::{AggregationStats, Aggregator, AggregatorConfig, NutEvent, SearchIndex};
use crate::store::{RecordStore, StoreChanged};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;

/// What `on_store_changed` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// Index rebuilt immediately
    Rebuilt,
    /// Surface hidden; rebuild deferred until it becomes visible
    Deferred,
}

/// Summary of the current index
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStatus {
    /// Number of completed rebuilds
    pub generation: u64,
    /// When the current index was built (ms), 0 if never
    pub built_at: i64,
    /// Aggregation stats of the current index
    pub stats: AggregationStats,
    /// Events in the full index
    pub total_events: usize,
    /// Events matching the current filter
    pub filtered_events: usize,
    /// A rebuild is pending until the surface becomes visible
    pub needs_update: bool,
    /// Whether the consuming surface is visible
    pub visible: bool,
}

#[derive(Debug)]
struct ListInner {
    search: SearchIndex,
    query: String,
    stats: AggregationStats,
    generation: u64,
    built_at: i64,
    visible: bool,
    needs_update: bool,
}

/// Current event index for one user, rebuilt on store changes
pub struct EventListState {
    store: Arc<dyn RecordStore>,
    aggregator: Aggregator,
    user_id: String,
    inner: RwLock<ListInner>,
    /// Serializes rebuilds so an older snapshot never replaces a newer one
    rebuild_lock: Mutex<()>,
}

impl EventListState {
    /// Create state for `user_id`. The surface starts visible with an empty index.
    pub fn new(store: Arc<dyn RecordStore>, user_id: impl Into<String>, bucket_minutes: i64) -> Self {
        let user_id = user_id.into();
        let aggregator = Aggregator::new(AggregatorConfig {
            bucket_minutes,
            user_id: Some(user_id.clone()),
        });
        Self {
            store,
            aggregator,
            user_id,
            inner: RwLock::new(ListInner {
                search: SearchIndex::default(),
                query: String::new(),
                stats: AggregationStats::default(),
                generation: 0,
                built_at: 0,
                visible: true,
                needs_update: false,
            }),
            rebuild_lock: Mutex::new(()),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Entry point for store change signals
    pub async fn on_store_changed(&self) -> RebuildOutcome {
        {
            let mut inner = self.inner.write().await;
            if !inner.visible {
                inner.needs_update = true;
                tracing::debug!(user_id = %self.user_id, "Store changed while hidden; rebuild deferred");
                return RebuildOutcome::Deferred;
            }
        }
        self.rebuild().await;
        RebuildOutcome::Rebuilt
    }

    /// Record surface visibility; becoming visible runs any deferred rebuild
    pub async fn set_visible(&self, visible: bool) {
        let run = {
            let mut inner = self.inner.write().await;
            inner.visible = visible;
            visible && (inner.needs_update || inner.generation == 0)
        };
        if run {
            self.rebuild().await;
        }
    }

    /// Fetch, aggregate and swap in a new index. Store failures yield an empty index.
    pub async fn rebuild(&self) -> IndexStatus {
        let _guard = self.rebuild_lock.lock().await;

        let records = match self.store.fetch_all_for_user(&self.user_id).await {
            Ok(records) => records,
            Err(e) => {
                let err = CoreError::from(e);
                tracing::error!(user_id = %self.user_id, error = %err, "Treating record store as empty");
                Vec::new()
            }
        };

        let (index, stats) = self.aggregator.build_index_with_stats(&records);

        let mut inner = self.inner.write().await;
        inner.search.reset(index);
        let query = inner.query.clone();
        inner.search.apply_filter(&query);
        inner.stats = stats;
        inner.generation += 1;
        inner.built_at = Utc::now().timestamp_millis();
        inner.needs_update = false;

        tracing::info!(
            user_id = %self.user_id,
            generation = inner.generation,
            events = inner.search.full().len(),
            "Event index rebuilt"
        );
        Self::status_of(&inner)
    }

    /// Apply a search query and return matching events in index order
    pub async fn apply_filter(&self, query: &str) -> Vec<(String, NutEvent)> {
        let mut inner = self.inner.write().await;
        inner.query = query.to_string();
        inner.search.apply_filter(query).to_vec()
    }

    /// Events matching the current filter
    pub async fn events(&self) -> Vec<(String, NutEvent)> {
        self.inner.read().await.search.filtered().to_vec()
    }

    /// Look up one event in the full index
    pub async fn get(&self, key: &str) -> Option<NutEvent> {
        self.inner.read().await.search.get(key).cloned()
    }

    pub async fn status(&self) -> IndexStatus {
        Self::status_of(&*self.inner.read().await)
    }

    fn status_of(inner: &ListInner) -> IndexStatus {
        IndexStatus {
            generation: inner.generation,
            built_at: inner.built_at,
            stats: inner.stats.clone(),
            total_events: inner.search.full().len(),
            filtered_events: inner.search.filtered().len(),
            needs_update: inner.needs_update,
            visible: inner.visible,
        }
    }

    /// Spawn a task that rebuilds on every change signal
    ///
    /// Signals that pile up while a rebuild runs are drained and handled
    /// as one.
    pub fn spawn_change_listener(
        self: Arc<Self>,
        mut rx: broadcast::Receiver<StoreChanged>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(StoreChanged) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        let mut coalesced = 0usize;
                        while let Ok(StoreChanged) | Err(broadcast::error::TryRecvError::Lagged(_)) =
                            rx.try_recv()
                        {
                            coalesced += 1;
                        }
                        if coalesced > 0 {
                            tracing::debug!(coalesced, "Coalesced store change signals");
                        }
                        self.on_store_changed().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::debug!("Store change channel closed; listener exiting");
                        break;
                    }
                }
            }
        })
    }
}
