//! Error types for the tools.

use std::path::PathBuf;

use relic_core::data::DataLoadError;
use thiserror::Error;

/// Errors raised while reading or loading content files.
#[derive(Debug, Error)]
pub enum ToolsError {
    /// Failed to read a file or directory.
    #[error("Failed to read '{}': {source}", .path.display())]
    IoError {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// File extension is neither `.ron` nor `.json`.
    #[error("Unsupported file extension: '{}'", .0.display())]
    UnsupportedFormat(PathBuf),

    /// A file's content failed to parse, validate or register.
    #[error("{}: {source}", .path.display())]
    Content {
        /// Offending file.
        path: PathBuf,
        /// Underlying content error.
        #[source]
        source: DataLoadError,
    },
}

impl ToolsError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::IoError { path, source }
    }

    pub(crate) fn content(path: impl Into<PathBuf>) -> impl FnOnce(DataLoadError) -> Self {
        let path = path.into();
        move |source| Self::Content { path, source }
    }
}

/// Result type for tool operations.
pub type ToolsResult<T> = Result<T, ToolsError>;
