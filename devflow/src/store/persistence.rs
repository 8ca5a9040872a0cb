//! Durable record persistence for the artifact store.
//!
//! One JSON record file per artifact, written atomically (temp file +
//! rename) so a crash mid-write never leaves a torn record behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

use crate::core::Artifact;
use crate::errors::DevflowError;

const RECORD_EXTENSION: &str = "json";

/// Returns the record path for an artifact id under the store root.
#[must_use]
pub(crate) fn record_path(root: &Path, id: Uuid) -> PathBuf {
    root.join(format!("{id}.{RECORD_EXTENSION}"))
}

/// Writes `content` to `path` atomically and synchronously.
///
/// The data is flushed to a sibling temp file, fsynced, then renamed into
/// place; the parent directory is synced afterwards so the rename itself is
/// durable before this returns.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("record path has no parent"))?;
    let tmp_name = format!(
        ".{}.tmp-{}",
        path.file_name().and_then(|v| v.to_str()).unwrap_or("record"),
        std::process::id(),
    );
    let tmp_path = parent.join(tmp_name);

    {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)?;
    sync_dir(parent)?;
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Persists one artifact record under the store root.
pub(crate) fn write_record(root: &Path, artifact: &Artifact) -> Result<(), DevflowError> {
    let bytes = serde_json::to_vec_pretty(artifact)?;
    atomic_write(&record_path(root, artifact.id), &bytes)?;
    Ok(())
}

/// Deletes one artifact record; missing files are not an error.
pub(crate) fn delete_record(root: &Path, id: Uuid) -> Result<(), DevflowError> {
    match fs::remove_file(record_path(root, id)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Loads every artifact record under the store root.
///
/// Unreadable or unparseable files are skipped with a warning so one bad
/// record cannot take the whole store down.
pub(crate) fn load_records(root: &Path) -> Result<Vec<Artifact>, DevflowError> {
    let mut artifacts = Vec::new();

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
            continue;
        }

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable artifact record");
                continue;
            }
        };
        match serde_json::from_slice::<Artifact>(&bytes) {
            Ok(artifact) => artifacts.push(artifact),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unparseable artifact record");
            }
        }
    }

    Ok(artifacts)
}
