//! Reading and writing the lock file.
//!
//! A write replaces the whole file or leaves the previous one in place.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::storage::snapshot::{Snapshot, SnapshotFormatError};

/// Errors raised while accessing the lock file.
#[derive(Debug, Error)]
pub enum LockfileError {
    /// The file could not be read or written.
    #[error("failed to access lock file {}: {source}", path.display())]
    Io {
        /// The lock file path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The file content is not a valid snapshot.
    #[error("invalid lock file {}: {source}", path.display())]
    Format {
        /// The lock file path.
        path: PathBuf,
        /// The underlying error.
        source: SnapshotFormatError,
    },
}

/// Reads the snapshot at `path`.
///
/// Returns `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or is not a valid
/// snapshot.
pub fn read(path: &Path) -> Result<Option<Snapshot>, LockfileError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("no lock file at {}", path.display());
            return Ok(None);
        }
        Err(source) => {
            return Err(LockfileError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    Snapshot::from_slice(&bytes)
        .map(Some)
        .map_err(|source| LockfileError::Format {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes the snapshot to `path`.
///
/// The snapshot is written to a temporary file in the same directory and then
/// renamed over `path`.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be serialized or the file cannot be
/// written.
pub fn write(path: &Path, snapshot: &Snapshot) -> Result<(), LockfileError> {
    let bytes = snapshot.to_bytes().map_err(|source| LockfileError::Format {
        path: path.to_path_buf(),
        source,
    })?;

    let io_error = |source: io::Error| LockfileError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
    file.write_all(&bytes).map_err(io_error)?;
    file.as_file().sync_all().map_err(io_error)?;
    file.persist(path).map_err(|e| io_error(e.error))?;

    debug!(
        count = snapshot.requirements().len(),
        "wrote lock file {}",
        path.display()
    );
    Ok(())
}
