//! Local filesystem helpers used by the on-disk formats.
//!
//! Every file this crate produces goes through [`write_atomic`]: the payload
//! is written to a temporary sibling, synced, and renamed into place, so a
//! reader never observes a half-written recording segment or NPZ archive.
//! Reads go through [`read_all_bytes`], which maps a missing file to
//! [`StorageError::NotFound`] so callers can report it separately from other
//! I/O failures.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use snafu::{Backtrace, IntoError, prelude::*};

/// General result type used by storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    /// The specified path was not found.
    #[snafu(display("Path not found: {path}"))]
    NotFound {
        /// The path that was not found.
        path: String,
        /// Underlying I/O error.
        source: io::Error,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// The target path already exists and overwriting was not requested.
    #[snafu(display("Path already exists: {path}"))]
    AlreadyExists {
        /// The path that was found to already exist.
        path: String,
        /// The backtrace captured when the error occurred.
        backtrace: Backtrace,
    },

    /// Any other I/O error on the local filesystem.
    #[snafu(display("Local I/O error at {path}: {source}"))]
    OtherIo {
        /// The path where the I/O error occurred.
        path: String,
        /// Underlying I/O error with platform-specific details.
        source: io::Error,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },
}

fn map_io(path: &Path, source: io::Error) -> StorageError {
    let path = path.display().to_string();
    if source.kind() == io::ErrorKind::NotFound {
        NotFoundSnafu { path }.into_error(source)
    } else {
        OtherIoSnafu { path }.into_error(source)
    }
}

fn create_parent_dir(abs: &Path) -> StorageResult<()> {
    if let Some(parent) = abs.parent() {
        if parent.as_os_str().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(parent).context(OtherIoSnafu {
            path: parent.display().to_string(),
        })?;
    }
    Ok(())
}

/// Removes a temporary file on drop unless disarmed.
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            // Best-effort; the caller is already returning another error.
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Write `contents` to `path` with write-then-rename semantics.
///
/// Parent directories are created as needed. The temporary file lives next
/// to the target (same name with a `.tmp` extension) and is removed if any
/// step before the rename fails.
///
/// # Errors
///
/// Returns [`StorageError::OtherIo`] when any filesystem call fails.
pub fn write_atomic(path: &Path, contents: &[u8]) -> StorageResult<()> {
    create_parent_dir(path)?;

    let tmp_path = path.with_extension("tmp");
    let mut guard = TempFileGuard::new(tmp_path.clone());

    {
        let tmp_display = || tmp_path.display().to_string();
        let mut file = fs::File::create(&tmp_path).context(OtherIoSnafu {
            path: tmp_display(),
        })?;
        file.write_all(contents).context(OtherIoSnafu {
            path: tmp_display(),
        })?;
        file.sync_all().context(OtherIoSnafu {
            path: tmp_display(),
        })?;
    }

    fs::rename(&tmp_path, path).context(OtherIoSnafu {
        path: path.display().to_string(),
    })?;

    guard.disarm();
    Ok(())
}

/// Read the whole file at `path` into memory.
///
/// # Errors
///
/// [`StorageError::NotFound`] when the file does not exist, otherwise
/// [`StorageError::OtherIo`].
pub fn read_all_bytes(path: &Path) -> StorageResult<Vec<u8>> {
    fs::read(path).map_err(|e| map_io(path, e))
}

/// Prepare an empty directory at `path`.
///
/// When the directory already exists it is removed first if `overwrite` is
/// set; otherwise [`StorageError::AlreadyExists`] is returned.
pub fn prepare_empty_dir(path: &Path, overwrite: bool) -> StorageResult<()> {
    if path.exists() {
        ensure!(
            overwrite,
            AlreadyExistsSnafu {
                path: path.display().to_string(),
            }
        );
        fs::remove_dir_all(path).context(OtherIoSnafu {
            path: path.display().to_string(),
        })?;
    }

    fs::create_dir_all(path).context(OtherIoSnafu {
        path: path.display().to_string(),
    })?;
    Ok(())
}
