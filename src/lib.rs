//! # Nutshell
//!
//! Diabetes logbook core: turns a flat stream of clinical records (glucose
//! readings, meals, insulin wizard calculations, boluses, basal rates and
//! workouts) into an event list and a time-aligned graph model.
//!
//! ## Modules
//!
//! - [`store`]: Record model and the record store abstraction (SQLite, in-memory)
//! - [`events`]: Event aggregation, incremental search and the live event list
//! - [`graph`]: Time window, layout bands and the layered graph pipeline
//! - [`import`]: CSV and Apple Health import
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nutshell::events::build_index;
//! use nutshell::graph::{GraphRenderer, TimeWindow};
//! use nutshell::store::{ClinicalRecord, RecordKind};
//!
//! let records = vec![ClinicalRecord::new(
//!     "m1",
//!     "default",
//!     1_700_000_000_000,
//!     RecordKind::Meal {
//!         title: Some("Oatmeal".to_string()),
//!         notes: None,
//!         location: Some("Home".to_string()),
//!         carb_input: Some(45.0),
//!         photo_urls: vec![],
//!     },
//! )];
//!
//! let index = build_index(&records);
//! println!("{} events", index.len());
//!
//! let window = TimeWindow::new(1_699_990_000_000, 6.0 * 3600.0, 800.0);
//! let frame = GraphRenderer::default().render(&records, window, 400.0);
//! println!("{} primitives", frame.primitive_count());
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod graph;
pub mod import;
pub mod store;

pub use store::{
    open_store, ChangeNotifier, ClinicalRecord, MemoryRecordStore, RecordKind, RecordStore,
    RecordType, SqliteRecordStore, StoreChanged, StoreError, StoreResult,
};

pub use error::CoreError;

pub use events::{
    build_index, Aggregator, AggregatorConfig, EventIndex, EventListState, NutEvent,
    NutEventKind, SearchIndex,
};

pub use graph::{GraphFrame, GraphLayout, GraphRenderer, LayerKind, Primitive, TimeWindow};

pub use import::{AppleHealthImporter, CsvImportResult, CsvRecordImporter, ImportError};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError};
