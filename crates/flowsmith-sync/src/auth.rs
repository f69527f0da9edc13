//! Bearer credential acquisition
//!
//! The engine only needs two operations: get a bearer token, and get a
//! fresh one after the platform rejects the current one. How tokens are
//! actually minted (service-account exchange, metadata server, gcloud)
//! stays behind the [`TokenProvider`] seam.

use async_trait::async_trait;

use crate::error::Result;

/// Source of bearer tokens for the remote API.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Produce a bearer token. Called once up front and again whenever
    /// the platform answers 401; implementations should return a fresh
    /// credential on each call.
    async fn fetch_token(&self) -> Result<String>;
}

/// A fixed, pre-acquired token. Suitable for short-lived runs and tests;
/// a refresh returns the same value.
#[derive(Debug, Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    /// Wrap an already-acquired bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn fetch_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}
