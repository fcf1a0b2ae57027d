//! Anomalies raised inside the event and graph pipelines
//!
//! None of these are fatal: the pipelines log them and carry on with a
//! smaller (possibly empty) result.

use crate::store::{RecordType, StoreError};
use thiserror::Error;

/// Recoverable anomalies in the core pipelines
#[derive(Error, Debug)]
pub enum CoreError {
    /// Record is missing an identity or required field; it is dropped
    #[error("Malformed record {id:?}: {reason}")]
    MalformedRecord { id: String, reason: String },

    /// Record of an unexpected type reached a graph layer; it is skipped
    #[error("Type mismatch: {layer} layer cannot load {found} record {id:?}")]
    TypeMismatch {
        layer: &'static str,
        found: RecordType,
        id: String,
    },

    /// Upstream fetch failed; treated as an empty record set
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl CoreError {
    pub fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::MalformedRecord {
            id: id.into(),
            reason: reason.into(),
        }
    }
}
