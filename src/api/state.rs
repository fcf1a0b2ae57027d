//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::config::{ApiConfig, Config};
use crate::events::EventListState;
use crate::graph::GraphRenderer;
use crate::store::{ChangeNotifier, RecordStore};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Record store read by the event index and graph
    pub store: Arc<dyn RecordStore>,
    /// Publishes store changes after writes
    pub notifier: ChangeNotifier,
    /// Current event index for the configured user
    pub events: Arc<EventListState>,
    /// Graph renderer with configured geometry
    pub renderer: Arc<GraphRenderer>,
    /// User whose records are served
    pub user_id: Arc<str>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: &Config) -> Self {
        let events = EventListState::new(
            Arc::clone(&store),
            config.events.user_id.clone(),
            config.events.bucket_minutes,
        );
        Self {
            store,
            notifier: ChangeNotifier::new(config.events.change_channel_capacity),
            events: Arc::new(events),
            renderer: Arc::new(GraphRenderer::new(config.graph.clone())),
            user_id: Arc::from(config.events.user_id.as_str()),
            config: Arc::new(config.api.clone()),
            start_time: Instant::now(),
        }
    }

    /// Build the initial index and start rebuilding on store changes
    pub async fn start_event_index(&self) -> JoinHandle<()> {
        self.events.rebuild().await;
        Arc::clone(&self.events).spawn_change_listener(self.notifier.subscribe())
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
