//! Error types for cairn.
//!
//! This module defines all error types used throughout the library.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`CairnError`].
pub type Result<T> = std::result::Result<T, CairnError>;

/// Errors that can occur while building or persisting a LOD hierarchy.
#[derive(Error, Debug)]
pub enum CairnError {
    /// Error loading a mesh from a file.
    #[error("failed to load mesh from {}: {message}", path.display())]
    Load {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving a mesh to a file.
    #[error("failed to save mesh to {}: {message}", path.display())]
    Save {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// The graph partitioning backend rejected the problem or failed.
    #[error("graph partitioning failed: {0}")]
    Partition(String),

    /// The input mesh is too small or malformed for the requested operation.
    #[error("degenerate input mesh: {details}")]
    DegenerateInput {
        /// Description of what is missing or malformed.
        details: String,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
