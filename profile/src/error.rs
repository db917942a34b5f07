//! Error types for the profile loader

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for profile operations
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Errors raised while loading or applying profile files
#[derive(Error, Debug)]
pub enum ProfileError {
    /// A present profile could not be read
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A profile is not valid in the supported shell dialect
    #[error("parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// `source` / `.` nested deeper than the configured limit
    #[error("source depth limit ({limit}) exceeded at {}", path.display())]
    SourceDepth { path: PathBuf, limit: usize },
}
