//! Error types for geotag extraction.
//!
//! Absence of EXIF data is never an error here — derived attributes model
//! it with `Option`. Errors are reserved for the input source itself:
//! a path that cannot be opened, or a handle that fails mid-read.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for geotag operations.
#[derive(Error, Debug)]
pub enum GeotagError {
    /// The input path does not exist
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// The input path exists but could not be opened or read
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An already-open handle failed during the EXIF read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for geotag results.
pub type Result<T> = std::result::Result<T, GeotagError>;
