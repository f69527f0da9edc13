//! Error types for flowsmith-graph

use thiserror::Error;

/// Result type alias for flowsmith-graph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in flowsmith-graph
#[derive(Error, Debug)]
pub enum Error {
    /// Input table could not be read
    #[error("failed to read input table: {0}")]
    Table(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
