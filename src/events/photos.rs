//! Orphaned local photo detection
//!
//! Meal items reference photos either remotely or as local files named with
//! the `file_` prefix. Local files no event references any more are orphans.

use crate::events::{Aggregator, AggregatorConfig, NutEvent};
use crate::store::{RecordStore, StoreError};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Errors from an orphan scan; any of them means nothing may be deleted
#[derive(Error, Debug)]
pub enum PhotoError {
    #[error("Cannot read records: {0}")]
    Store(#[from] StoreError),

    #[error("Cannot list photo directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Prefix of photo references stored on the device
pub const LOCAL_PHOTO_PREFIX: &str = "file_";

/// File names in `directory_entries` not referenced by any event
///
/// Returned sorted for stable output.
pub fn find_orphan_photos<'a, I>(events: I, directory_entries: &[String]) -> Vec<String>
where
    I: IntoIterator<Item = &'a NutEvent>,
{
    let referenced: HashSet<&str> = events
        .into_iter()
        .flat_map(|event| event.local_photo_urls())
        .collect();

    let mut orphans: Vec<String> = directory_entries
        .iter()
        .filter(|name| !referenced.contains(name.as_str()))
        .cloned()
        .collect();
    orphans.sort();
    orphans
}

/// Orphans in `dir` for `user_id`, read straight from the store
///
/// A failed read is an error rather than an empty record set, so a store
/// outage never makes every photo look orphaned.
pub async fn find_orphans_in_store(
    store: &dyn RecordStore,
    user_id: &str,
    bucket_minutes: i64,
    dir: &Path,
) -> Result<Vec<String>, PhotoError> {
    let records = store.fetch_all_for_user(user_id).await?;
    let index = Aggregator::new(AggregatorConfig {
        bucket_minutes,
        user_id: Some(user_id.to_string()),
    })
    .build_index(&records);
    let entries = list_photo_dir(dir)?;
    Ok(find_orphan_photos(index.iter().map(|(_, e)| e), &entries))
}

/// List file names in a photo directory; a missing directory has no photos
pub fn list_photo_dir(dir: &Path) -> std::io::Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    Ok(names)
}

/// Delete orphaned photos from `dir`, returning how many were removed
pub fn delete_orphans(dir: &Path, orphans: &[String]) -> usize {
    let mut removed = 0;
    for name in orphans {
        let path = dir.join(name);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(photo = %name, "Deleted orphaned photo");
                removed += 1;
            }
            Err(e) => tracing::warn!(photo = %name, error = %e, "Failed to delete orphaned photo"),
        }
    }
    removed
}
