//! Nut Events
//!
//! Groups meal, workout, wizard and bolus records into composite events and
//! keeps a searchable list of them.
//!
//! ```text
//! RecordStore ──► Aggregator ──► EventIndex ──► SearchIndex ──► presentation
//!                     ▲
//!             EventListState (rebuild on StoreChanged)
//! ```

pub mod aggregator;
pub mod nut_event;
pub mod photos;
pub mod search;
pub mod state;

pub use aggregator::{build_index, AggregationStats, Aggregator, AggregatorConfig, EventIndex};
pub use nut_event::{NutEvent, NutEventKind};
pub use photos::{find_orphan_photos, find_orphans_in_store, PhotoError, LOCAL_PHOTO_PREFIX};
pub use search::SearchIndex;
pub use state::{EventListState, IndexStatus, RebuildOutcome};
