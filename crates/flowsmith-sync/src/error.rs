//! Error types for flowsmith-sync

use thiserror::Error;

/// Result type alias for flowsmith-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while synchronizing a graph with the remote
/// platform
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport failure (connection, timeout, protocol)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status after retries were
    /// exhausted
    #[error("API request failed with status {status}: {body}")]
    Api {
        /// HTTP status code of the last response
        status: u16,
        /// Response body, useful for diagnosing malformed payloads
        body: String,
    },

    /// Bearer credential could not be acquired or refreshed
    #[error("credential error: {message}")]
    Credential {
        /// Description of what went wrong
        message: String,
    },

    /// The API answered successfully but the body was not shaped as
    /// expected
    #[error("malformed API response: {message}")]
    Response {
        /// Description of the missing or malformed field
        message: String,
    },

    /// The flow's designated first page could not be resolved remotely.
    /// A flow without a start page is unusable, so this aborts the
    /// flow's upload.
    #[error("first page '{page}' not found in flow")]
    StartPageMissing {
        /// Display name of the unresolvable page
        page: String,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
