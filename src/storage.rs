//! # Persistence Sink
//!
//! Writes an accumulated audio buffer to durable storage as a single flat
//! file. The artifact is the raw concatenated byte payload with no header;
//! encoding, sample rate, and channel count are not embedded and must be
//! recorded out-of-band if they are needed later.
//!
//! ## Naming:
//! Artifacts are named `<prefix><yyyymmdd_HHMMSS>_<fragment>.raw`, where the
//! fragment is the first segment of a fresh UUID. The timestamp keeps files
//! sortable and human-readable; the fragment keeps concurrent sessions from
//! colliding inside one second.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Extension for raw, headerless audio artifacts.
const RAW_EXTENSION: &str = "raw";

/// A successfully persisted capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    /// Where the artifact landed
    pub path: PathBuf,
    /// Exact byte length of the written file
    pub total_bytes: u64,
}

/// Write one capture to `dir`, creating the directory on demand.
///
/// An empty buffer still produces a (zero-byte) file: an empty capture is a
/// valid terminal artifact, not a skip condition.
///
/// ## Errors:
/// Any directory-creation or write failure surfaces as
/// [`AppError::Persistence`] with the offending path in the message.
pub fn write_raw(dir: &Path, prefix: &str, data: &[u8]) -> AppResult<SavedArtifact> {
    fs::create_dir_all(dir).map_err(|err| {
        AppError::Persistence(format!(
            "could not create storage directory {}: {}",
            dir.display(),
            err
        ))
    })?;

    let path = dir.join(artifact_filename(prefix));
    fs::write(&path, data).map_err(|err| {
        AppError::Persistence(format!("could not write {}: {}", path.display(), err))
    })?;

    debug!(path = %path.display(), bytes = data.len(), "wrote capture artifact");

    Ok(SavedArtifact {
        path,
        total_bytes: data.len() as u64,
    })
}

/// Timestamp-derived, collision-resistant artifact name.
fn artifact_filename(prefix: &str) -> String {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let fragment = Uuid::new_v4()
        .to_string()
        .chars()
        .take(8)
        .collect::<String>();
    format!("{}{}_{}.{}", prefix, stamp, fragment, RAW_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn scratch_dir() -> PathBuf {
        env::temp_dir().join(format!("capture-test-{}", Uuid::new_v4()))
    }

    #[test]
    fn test_write_creates_dir_and_reports_exact_size() {
        let dir = scratch_dir();
        let data = vec![7u8; 10_000];

        let saved = write_raw(&dir, "", &data).unwrap();
        assert_eq!(saved.total_bytes, 10_000);

        let on_disk = fs::read(&saved.path).unwrap();
        assert_eq!(on_disk, data);
        assert_eq!(on_disk.len() as u64, saved.total_bytes);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_empty_buffer_still_writes_a_file() {
        let dir = scratch_dir();

        let saved = write_raw(&dir, "", &[]).unwrap();
        assert_eq!(saved.total_bytes, 0);
        assert!(saved.path.exists());
        assert_eq!(fs::metadata(&saved.path).unwrap().len(), 0);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_filenames_do_not_collide() {
        let dir = scratch_dir();

        let first = write_raw(&dir, "received_", b"a").unwrap();
        let second = write_raw(&dir, "received_", b"b").unwrap();
        assert_ne!(first.path, second.path);

        let name = first.path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("received_"));
        assert!(name.ends_with(".raw"));

        fs::remove_dir_all(&dir).unwrap();
    }
}
