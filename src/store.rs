//! Shared persistence primitives for the memory stores.
//!
//! Two storage shapes are used:
//! - append-only JSONL streams (outcomes, metrics): one record per line,
//!   written with a single append so concurrent writers never interleave
//!   partial records;
//! - rewrite-in-place documents (skill catalog, profile, working buffer):
//!   written to a temp file then atomically renamed. Concurrent rewrites
//!   are last-writer-wins.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::Result;

/// Current schema version for all persisted record families.
pub const SCHEMA_VERSION: u32 = 1;

pub(crate) fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Implemented by every persisted record so reads can validate the
/// schema version instead of silently accepting outdated records.
pub trait VersionedRecord {
    fn schema_version(&self) -> u32;
}

/// Append one record as a single JSONL line.
pub(crate) async fn append_jsonl<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let line = serde_json::to_string(record)?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;

    // One write per record keeps concurrent appenders line-atomic.
    file.write_all(format!("{}\n", line).as_bytes()).await?;
    file.flush().await?;

    debug!(path = %path.display(), "Appended record");
    Ok(())
}

/// Read all valid records from a JSONL file.
///
/// A missing file is an empty store. Malformed lines and records with an
/// unsupported schema version are skipped with a warning.
pub(crate) async fn read_jsonl<T>(path: &Path) -> Result<Vec<T>>
where
    T: DeserializeOwned + VersionedRecord,
{
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path).await?;
    let mut records = Vec::new();

    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        match serde_json::from_str::<T>(line) {
            Ok(record) if record.schema_version() == SCHEMA_VERSION => records.push(record),
            Ok(record) => warn!(
                path = %path.display(),
                version = record.schema_version(),
                "Skipping record with unsupported schema version"
            ),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping malformed record line"),
        }
    }

    Ok(records)
}

/// Write content to a temp file, sync, then atomically rename over the
/// target. A failed write never truncates the existing file.
pub(crate) async fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, content).await?;

    let tmp_clone = tmp_path.clone();
    let sync_result = tokio::task::spawn_blocking(move || {
        std::fs::File::open(&tmp_clone).and_then(|file| file.sync_all())
    })
    .await;

    match sync_result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Failed to sync temp file to disk"),
        Err(e) => warn!(error = %e, "Sync task failed"),
    }

    fs::rename(&tmp_path, path).await?;

    debug!(path = %path.display(), "Atomic write completed");
    Ok(())
}
