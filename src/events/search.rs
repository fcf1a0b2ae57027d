//! Search Index - incremental substring filter over the event list
//!
//! Keeps the last filter string and its result. When the next query still
//! contains the previous one (the user kept typing), only the previous
//! result can match, so only that subset is rescanned.

use crate::events::{EventIndex, NutEvent};

/// Filtered view over a sorted event index
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    /// Full index in aggregator order
    full: EventIndex,
    /// Lower-cased filter applied to produce `filtered`
    filter: String,
    /// Members of `full` matching `filter`, in the same order
    filtered: EventIndex,
}

impl SearchIndex {
    /// Create a search index showing the full list
    pub fn new(full: EventIndex) -> Self {
        Self {
            filtered: full.clone(),
            full,
            filter: String::new(),
        }
    }

    /// Replace the underlying list and clear the filter
    pub fn reset(&mut self, full: EventIndex) {
        self.filtered = full.clone();
        self.full = full;
        self.filter.clear();
    }

    /// Apply a query and return the matching events in aggregator order
    pub fn apply_filter(&mut self, query: &str) -> &[(String, NutEvent)] {
        let query = query.to_lowercase();

        if query.is_empty() {
            self.filtered = self.full.clone();
        } else if !self.filter.is_empty() && query.contains(&self.filter) {
            // Narrowing: anything filtered out before cannot match now
            self.filtered.retain(|(_, event)| event.matches_lowercase(&query));
        } else {
            self.filtered = self
                .full
                .iter()
                .filter(|(_, event)| event.matches_lowercase(&query))
                .cloned()
                .collect();
        }

        tracing::trace!(
            query = %query,
            matched = self.filtered.len(),
            total = self.full.len(),
            "Applied event filter"
        );
        self.filter = query;
        &self.filtered
    }

    /// Current filter (lower-cased)
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Result of the last applied filter
    pub fn filtered(&self) -> &[(String, NutEvent)] {
        &self.filtered
    }

    /// Full index
    pub fn full(&self) -> &[(String, NutEvent)] {
        &self.full
    }

    /// Look up an event by key in the full index
    pub fn get(&self, key: &str) -> Option<&NutEvent> {
        self.full
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, event)| event)
    }
}
