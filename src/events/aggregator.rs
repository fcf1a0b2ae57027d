//! NutEvent Aggregator - groups records into composite events
//!
//! Maps each record to an aggregation key and merges records sharing a key
//! into one [`NutEvent`].
//!
//! # Key derivation
//!
//! ```text
//! bolus referenced by a wizard's bolus_id  → key of that wizard
//! record with event_key                    → event_key (trimmed)
//! meal / workout                           → "meal:{title}:{location}" (lower-cased)
//! wizard / bolus without either            → "insulin@{bucket start ms}"
//! glucose / basal                          → not an event
//! ```
//!
//! The snapshot is ordered by `(timestamp, id)` before scanning, so the same
//! record set always yields the same index regardless of input order.

use crate::error::CoreError;
use crate::events::NutEvent;
use crate::store::{ClinicalRecord, RecordKind, RecordType};
use serde::Serialize;
use std::collections::HashMap;

/// Ordered `(key, event)` pairs, most recent first
pub type EventIndex = Vec<(String, NutEvent)>;

/// Configuration for the aggregator
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Width of the time bucket used for untitled insulin entries
    pub bucket_minutes: i64,
    /// Only aggregate records of this user, if set
    pub user_id: Option<String>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            bucket_minutes: 5,
            user_id: None,
        }
    }
}

/// Statistics from one aggregation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregationStats {
    /// Records merged into events
    pub aggregated: usize,
    /// Records dropped as malformed
    pub malformed: usize,
    /// Records that are not events (glucose, basal) or belong to another user
    pub ignored: usize,
    /// Distinct events produced
    pub events: usize,
}

/// Groups clinical records into NutEvents
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Build the sorted event index from a record snapshot
    pub fn build_index(&self, records: &[ClinicalRecord]) -> EventIndex {
        self.build_index_with_stats(records).0
    }

    /// Build the index and report what happened to each record
    pub fn build_index_with_stats(
        &self,
        records: &[ClinicalRecord],
    ) -> (EventIndex, AggregationStats) {
        let mut stats = AggregationStats::default();

        let mut candidates: Vec<&ClinicalRecord> = Vec::with_capacity(records.len());
        for record in records {
            match self.admit(record) {
                Ok(true) => candidates.push(record),
                Ok(false) => stats.ignored += 1,
                Err(e) => {
                    stats.malformed += 1;
                    tracing::warn!(error = %e, "Dropping record from event index");
                }
            }
        }

        candidates.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.id.cmp(&b.id))
        });

        // Pass 1: everything except bolus; collect wizard → bolus links
        let mut keys: Vec<Option<String>> = vec![None; candidates.len()];
        let mut bolus_links: HashMap<&str, String> = HashMap::new();
        for (slot, record) in candidates.iter().enumerate() {
            if record.record_type() == RecordType::Bolus {
                continue;
            }
            match self.derive_key(record) {
                Ok(key) => {
                    if let RecordKind::Wizard {
                        bolus_id: Some(bolus_id),
                        ..
                    } = &record.kind
                    {
                        if !bolus_id.is_empty() {
                            bolus_links
                                .entry(bolus_id.as_str())
                                .or_insert_with(|| key.clone());
                        }
                    }
                    keys[slot] = Some(key);
                }
                Err(e) => {
                    stats.malformed += 1;
                    tracing::warn!(error = %e, "Dropping record from event index");
                }
            }
        }

        // Pass 2: bolus records follow their wizard when linked
        for (slot, record) in candidates.iter().enumerate() {
            if record.record_type() != RecordType::Bolus {
                continue;
            }
            let key = match bolus_links.get(record.id.as_str()) {
                Some(key) => Ok(key.clone()),
                None => self.derive_key(record),
            };
            match key {
                Ok(key) => keys[slot] = Some(key),
                Err(e) => {
                    stats.malformed += 1;
                    tracing::warn!(error = %e, "Dropping record from event index");
                }
            }
        }

        let mut events: HashMap<String, NutEvent> = HashMap::new();
        for (record, key) in candidates.into_iter().zip(keys) {
            let Some(key) = key else { continue };
            stats.aggregated += 1;
            match events.get_mut(&key) {
                Some(existing) => existing.add_record(record.clone()),
                None => {
                    events.insert(key.clone(), NutEvent::new(key, record.clone()));
                }
            }
        }

        let mut index: EventIndex = events.into_iter().collect();
        index.sort_by(|(key_a, a), (key_b, b)| {
            b.most_recent()
                .cmp(&a.most_recent())
                .then_with(|| key_a.cmp(key_b))
        });

        stats.events = index.len();
        tracing::debug!(
            aggregated = stats.aggregated,
            malformed = stats.malformed,
            ignored = stats.ignored,
            events = stats.events,
            "Built event index"
        );

        (index, stats)
    }

    /// Ok(true) = aggregate, Ok(false) = not an event for this user, Err = malformed
    fn admit(&self, record: &ClinicalRecord) -> Result<bool, CoreError> {
        if record.id.trim().is_empty() {
            return Err(CoreError::malformed(&record.id, "missing id"));
        }
        if record.user_id.trim().is_empty() {
            return Err(CoreError::malformed(&record.id, "missing user id"));
        }
        if let Some(user_id) = &self.config.user_id {
            if &record.user_id != user_id {
                return Ok(false);
            }
        }
        match record.record_type() {
            RecordType::Glucose | RecordType::Basal => {
                tracing::trace!(id = %record.id, kind = %record.record_type(), "Not an event record");
                Ok(false)
            }
            _ => Ok(true),
        }
    }

    /// Aggregation key for a record, ignoring wizard links
    pub fn derive_key(&self, record: &ClinicalRecord) -> Result<String, CoreError> {
        if let Some(event_key) = record.event_key.as_deref().map(str::trim) {
            if !event_key.is_empty() {
                return Ok(event_key.to_string());
            }
        }

        match record.record_type() {
            RecordType::Meal | RecordType::Workout => {
                let title = normalize(record.title().unwrap_or_default());
                if title.is_empty() {
                    return Err(CoreError::malformed(&record.id, "missing title"));
                }
                let location = normalize(record.location().unwrap_or_default());
                Ok(format!("{}:{}:{}", record.record_type(), title, location))
            }
            RecordType::Wizard | RecordType::Bolus => {
                Ok(format!("insulin@{}", self.bucket_start(record.timestamp)))
            }
            other => Err(CoreError::malformed(
                &record.id,
                format!("{} records do not form events", other),
            )),
        }
    }

    fn bucket_start(&self, timestamp: i64) -> i64 {
        let width = self.config.bucket_minutes.max(1) * 60 * 1000;
        timestamp.div_euclid(width) * width
    }
}

/// Build an index with the default configuration
pub fn build_index(records: &[ClinicalRecord]) -> EventIndex {
    Aggregator::default().build_index(records)
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: i64 = 60 * 1000;

    fn meal(id: &str, ts: i64, title: &str, location: &str) -> ClinicalRecord {
        ClinicalRecord::new(
            id,
            "u1",
            ts,
            RecordKind::Meal {
                title: Some(title.to_string()),
                notes: None,
                location: Some(location.to_string()),
                carb_input: Some(30.0),
                photo_urls: vec![],
            },
        )
    }

    fn wizard(id: &str, ts: i64, bolus_id: Option<&str>) -> ClinicalRecord {
        ClinicalRecord::new(
            id,
            "u1",
            ts,
            RecordKind::Wizard {
                carb_input: Some(45.0),
                bolus_id: bolus_id.map(str::to_string),
                recommended_net: Some(4.5),
                notes: None,
            },
        )
    }

    fn bolus(id: &str, ts: i64) -> ClinicalRecord {
        ClinicalRecord::new(
            id,
            "u1",
            ts,
            RecordKind::Bolus {
                normal: Some(4.0),
                extended: None,
                duration_ms: None,
            },
        )
    }

    fn glucose(id: &str, ts: i64) -> ClinicalRecord {
        ClinicalRecord::new(
            id,
            "u1",
            ts,
            RecordKind::Glucose {
                value: Some(120.0),
                units: Default::default(),
                source: None,
            },
        )
    }

    fn sample_records() -> Vec<ClinicalRecord> {
        vec![
            meal("m1", 1_000 * MIN, "Oatmeal", "Home"),
            meal("m2", 2_000 * MIN, " oatmeal ", "home"),
            meal("m3", 1_500 * MIN, "Pizza", "Tony's"),
            wizard("w1", 1_500 * MIN, Some("b1")).event_key("pizza-night"),
            bolus("b1", 1_501 * MIN),
            wizard("w2", 3_000 * MIN, None),
            bolus("b2", 3_001 * MIN),
            bolus("b3", 9_000 * MIN).event_key("A"),
            meal("m4", 8_000 * MIN, "Snack", "").event_key("A"),
            glucose("g1", 1_200 * MIN),
        ]
    }

    #[test]
    fn test_meal_and_bolus_share_key() {
        let records = vec![
            meal("m", 100, "Lunch", "").event_key("A"),
            bolus("b", 105).event_key("A"),
        ];
        let index = build_index(&records);
        assert_eq!(index.len(), 1);
        let (key, event) = &index[0];
        assert_eq!(key, "A");
        assert_eq!(event.item_count(), 2);
        assert_eq!(event.most_recent(), 105);
    }

    #[test]
    fn test_title_location_grouping_is_normalized() {
        let index = build_index(&sample_records());
        let (_, oatmeal) = index
            .iter()
            .find(|(key, _)| key == "meal:oatmeal:home")
            .expect("oatmeal event");
        assert_eq!(oatmeal.item_count(), 2);
        assert_eq!(oatmeal.title(), "Oatmeal");
    }

    #[test]
    fn test_bolus_follows_wizard_link() {
        let index = build_index(&sample_records());
        let (_, pizza_night) = index
            .iter()
            .find(|(key, _)| key == "pizza-night")
            .expect("linked event");
        let ids: Vec<&str> = pizza_night.items().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["w1", "b1"]);
    }

    #[test]
    fn test_bolus_link_beats_event_key() {
        let records = vec![
            wizard("w", 100, Some("b")).event_key("dinner"),
            bolus("b", 200).event_key("other"),
        ];
        let index = build_index(&records);
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].0, "dinner");
    }

    #[test]
    fn test_unlinked_insulin_uses_time_bucket() {
        let index = build_index(&sample_records());
        let bucket = (3_000 * MIN / (5 * MIN)) * 5 * MIN;
        let key = format!("insulin@{}", bucket);
        let (_, event) = index.iter().find(|(k, _)| *k == key).expect("bucket event");
        assert_eq!(event.item_count(), 2);
    }

    #[test]
    fn test_sorted_by_most_recent_descending() {
        let index = build_index(&sample_records());
        let recents: Vec<i64> = index.iter().map(|(_, e)| e.most_recent()).collect();
        let mut sorted = recents.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(recents, sorted);
        assert_eq!(index[0].0, "A");
    }

    #[test]
    fn test_most_recent_is_max_item_timestamp() {
        for (_, event) in build_index(&sample_records()) {
            let max = event.items().iter().map(|r| r.timestamp).max().unwrap();
            assert_eq!(event.most_recent(), max);
            assert!(event.item_count() > 0);
        }
    }

    #[test]
    fn test_permutation_invariance() {
        let records = sample_records();
        let expected = build_index(&records);

        let mut reversed = records.clone();
        reversed.reverse();
        assert_eq!(build_index(&reversed), expected);

        // Deterministic rotation shuffles
        for shift in 1..records.len() {
            let mut rotated = records.clone();
            rotated.rotate_left(shift);
            rotated.swap(0, records.len() - 1);
            assert_eq!(build_index(&rotated), expected, "shift {}", shift);
        }
    }

    #[test]
    fn test_reaggregation_is_idempotent() {
        let first = build_index(&sample_records());
        let items: Vec<ClinicalRecord> = first
            .iter()
            .flat_map(|(_, event)| event.items().iter().cloned())
            .collect();
        assert_eq!(build_index(&items), first);
    }

    #[test]
    fn test_duplicates_are_merged_not_replaced() {
        let records = vec![
            meal("m1", 100, "Toast", ""),
            meal("m1", 100, "Toast", ""),
        ];
        let index = build_index(&records);
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].1.item_count(), 2);
    }

    #[test]
    fn test_malformed_records_are_dropped() {
        let mut no_id = meal("", 100, "Toast", "");
        no_id.id = "  ".to_string();
        let mut no_user = meal("m2", 100, "Toast", "");
        no_user.user_id.clear();
        let untitled = meal("m3", 100, "", "");

        let aggregator = Aggregator::default();
        let (index, stats) = aggregator.build_index_with_stats(&[
            no_id,
            no_user,
            untitled,
            meal("ok", 200, "Toast", ""),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(stats.malformed, 3);
        assert_eq!(stats.aggregated, 1);
    }

    #[test]
    fn test_user_filter_and_non_event_types() {
        let mut other = meal("x", 100, "Toast", "");
        other.user_id = "u2".to_string();
        let aggregator = Aggregator::new(AggregatorConfig {
            user_id: Some("u1".to_string()),
            ..Default::default()
        });
        let (index, stats) =
            aggregator.build_index_with_stats(&[other, glucose("g", 1), meal("m", 2, "Toast", "")]);
        assert_eq!(index.len(), 1);
        assert_eq!(stats.ignored, 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(build_index(&[]).is_empty());
    }
}
