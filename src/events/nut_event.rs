//! NutEvent - one real-world occurrence made of one or more records

use crate::store::{ClinicalRecord, RecordType};
use serde::Serialize;

/// What kind of occurrence a NutEvent represents
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NutEventKind {
    Meal,
    Workout,
    /// Wizard/bolus entries with no meal or workout attached
    Insulin,
}

impl NutEventKind {
    fn for_record(record_type: RecordType) -> Self {
        match record_type {
            RecordType::Workout => NutEventKind::Workout,
            RecordType::Meal => NutEventKind::Meal,
            _ => NutEventKind::Insulin,
        }
    }
}

/// Aggregate of records judged to be the same real-world event
///
/// `items` is never empty and only grows; `most_recent` always equals the
/// largest item timestamp.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NutEvent {
    key: String,
    kind: NutEventKind,
    title: String,
    location: String,
    most_recent: i64,
    items: Vec<ClinicalRecord>,
}

impl NutEvent {
    /// Create an event seeded with its first record
    pub fn new(key: impl Into<String>, first: ClinicalRecord) -> Self {
        let mut event = Self {
            key: key.into(),
            kind: NutEventKind::for_record(first.record_type()),
            title: String::new(),
            location: String::new(),
            most_recent: first.timestamp,
            items: Vec::with_capacity(1),
        };
        event.adopt_labels(&first);
        event.items.push(first);
        event
    }

    /// Append a record. The key never changes; duplicates are kept, not replaced.
    pub fn add_record(&mut self, record: ClinicalRecord) {
        self.most_recent = self.most_recent.max(record.timestamp);
        // A meal or workout joining an insulin-only event names it
        if self.kind == NutEventKind::Insulin {
            let kind = NutEventKind::for_record(record.record_type());
            if kind != NutEventKind::Insulin {
                self.kind = kind;
            }
        }
        self.adopt_labels(&record);
        self.items.push(record);
    }

    fn adopt_labels(&mut self, record: &ClinicalRecord) {
        if self.title.is_empty() {
            if let Some(title) = record.title() {
                self.title = title.trim().to_string();
            }
        }
        if self.location.is_empty() {
            if let Some(location) = record.location() {
                self.location = location.trim().to_string();
            }
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> NutEventKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn most_recent(&self) -> i64 {
        self.most_recent
    }

    pub fn items(&self) -> &[ClinicalRecord] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Total carbs logged across meal and wizard items
    pub fn total_carbs(&self) -> f64 {
        use crate::store::RecordKind;
        self.items
            .iter()
            .filter_map(|item| match &item.kind {
                RecordKind::Meal { carb_input, .. } | RecordKind::Wizard { carb_input, .. } => {
                    *carb_input
                }
                _ => None,
            })
            .sum()
    }

    /// True if the title, location, or any item's title/notes/location
    /// contains `needle_lower` (already lower-cased)
    pub fn matches_lowercase(&self, needle_lower: &str) -> bool {
        if needle_lower.is_empty() {
            return true;
        }
        let hit = |text: &str| text.to_lowercase().contains(needle_lower);
        hit(&self.title)
            || hit(&self.location)
            || self
                .items
                .iter()
                .any(|item| item.text_fields().any(|field| hit(field)))
    }

    /// Case-insensitive substring search over the event's text
    pub fn contains_search_string(&self, query: &str) -> bool {
        self.matches_lowercase(&query.to_lowercase())
    }

    /// Local photo references (`file_` prefix) used by any item
    pub fn local_photo_urls(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .flat_map(|item| item.photo_urls().iter())
            .map(String::as_str)
            .filter(|url| url.starts_with(super::photos::LOCAL_PHOTO_PREFIX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordKind;

    fn meal(id: &str, ts: i64, title: &str, notes: &str) -> ClinicalRecord {
        ClinicalRecord::new(
            id,
            "u1",
            ts,
            RecordKind::Meal {
                title: Some(title.to_string()),
                notes: Some(notes.to_string()),
                location: Some("Home".to_string()),
                carb_input: Some(30.0),
                photo_urls: vec!["file_1.jpg".to_string(), "https://x/2.jpg".to_string()],
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

    #[test]
    fn test_most_recent_tracks_max() {
        let mut event = NutEvent::new("k", meal("a", 200, "Oatmeal", ""));
        event.add_record(meal("b", 100, "Oatmeal", ""));
        assert_eq!(event.most_recent(), 200);
        event.add_record(meal("c", 300, "Oatmeal", ""));
        assert_eq!(event.most_recent(), 300);
        assert_eq!(event.item_count(), 3);
        assert_eq!(event.key(), "k");
    }

    #[test]
    fn test_insulin_event_takes_meal_labels() {
        let mut event = NutEvent::new("A", bolus("b1", 105));
        assert_eq!(event.kind(), NutEventKind::Insulin);
        assert_eq!(event.title(), "");

        event.add_record(meal("m1", 100, "Pasta", ""));
        assert_eq!(event.kind(), NutEventKind::Meal);
        assert_eq!(event.title(), "Pasta");
        assert_eq!(event.location(), "Home");
    }

    #[test]
    fn test_search_matches_any_item_text() {
        let mut event = NutEvent::new("k", meal("a", 1, "Oatmeal", "plain"));
        event.add_record(meal("b", 2, "Oatmeal", "With Blueberries"));

        assert!(event.contains_search_string("blueberr"));
        assert!(event.contains_search_string("OATMEAL"));
        assert!(event.contains_search_string("home"));
        assert!(!event.contains_search_string("pizza"));
    }

    #[test]
    fn test_total_carbs_and_photos() {
        let mut event = NutEvent::new("k", meal("a", 1, "Oatmeal", ""));
        event.add_record(meal("b", 2, "Oatmeal", ""));
        assert_eq!(event.total_carbs(), 60.0);
        let photos: Vec<&str> = event.local_photo_urls().collect();
        assert_eq!(photos, vec!["file_1.jpg", "file_1.jpg"]);
    }
}
