//! Error types for playlist porting

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while porting a playlist
#[derive(Error, Debug)]
pub enum PlaylistError {
    #[error("File not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Unrecognized format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to copy '{}': {source}", .path.display())]
    CopyFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Playlist has no '{0}' column (is the text encoding right?)")]
    MissingColumn(String),

    #[error("Unknown text encoding: {0}")]
    UnknownEncoding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed tab-delimited playlist: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, PlaylistError>;
