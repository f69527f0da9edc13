//! Synchronization configuration
//!
//! Every recognized option lives here with an explicit default; nothing
//! is read from the environment by this crate. Loading values from CLI
//! flags or env vars is the caller's concern.

use std::time::Duration;

/// How many times a remote call is attempted before the last error
/// propagates.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Configuration for one synchronization engine instance.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Cloud project identifier
    pub project_id: String,
    /// Regional location of the agent, e.g. `us-central1`
    pub location: String,
    /// Agent identifier within the project/location
    pub agent_id: String,
    /// URI of the shared dispatcher webhook target
    pub dispatcher_url: String,
    /// Optional single static header for the dispatcher, as `Key=Value`
    pub dispatcher_header: Option<String>,
    /// Override for the API root (emulators, tests). When unset the
    /// regional production endpoint is derived from `location`.
    pub endpoint: Option<String>,
    /// Attempt ceiling for every remote call
    pub max_attempts: u32,
    /// Base unit of the exponential backoff; attempt `n` sleeps
    /// `base * 2^n` before retrying
    pub backoff_base: Duration,
    /// Wait applied on rate limiting when the server names no interval
    pub rate_limit_wait: Duration,
    /// Pause between consecutive flow uploads, as rate-limit courtesy
    pub upload_delay: Duration,
}

impl SyncConfig {
    /// Create a configuration with defaults for everything optional.
    pub fn new(
        project_id: impl Into<String>,
        location: impl Into<String>,
        agent_id: impl Into<String>,
        dispatcher_url: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            location: location.into(),
            agent_id: agent_id.into(),
            dispatcher_url: dispatcher_url.into(),
            dispatcher_header: None,
            endpoint: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: Duration::from_secs(1),
            rate_limit_wait: Duration::from_secs(5),
            upload_delay: Duration::from_secs(1),
        }
    }

    /// Set the dispatcher header (`Key=Value`).
    pub fn with_dispatcher_header(mut self, header: impl Into<String>) -> Self {
        self.dispatcher_header = Some(header.into());
        self
    }

    /// Point the engine at a non-production API root.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Override the retry timing (backoff base and rate-limit wait).
    pub fn with_retry_timing(mut self, backoff_base: Duration, rate_limit_wait: Duration) -> Self {
        self.backoff_base = backoff_base;
        self.rate_limit_wait = rate_limit_wait;
        self
    }

    /// Override the pause between consecutive flow uploads.
    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = delay;
        self
    }

    /// Root of the versioned API, without any resource path.
    pub fn api_root(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}-dialogflow.googleapis.com/v3", self.location),
        }
    }

    /// Base URL of the configured agent's resource collections.
    pub fn agent_url(&self) -> String {
        format!(
            "{}/projects/{}/locations/{}/agents/{}",
            self.api_root(),
            self.project_id,
            self.location,
            self.agent_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::new("proj", "us-central1", "agent-1", "https://hooks.test/df");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff_base, Duration::from_secs(1));
        assert_eq!(config.rate_limit_wait, Duration::from_secs(5));
        assert_eq!(config.upload_delay, Duration::from_secs(1));
        assert!(config.dispatcher_header.is_none());
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn test_regional_api_root() {
        let config = SyncConfig::new("proj", "europe-west1", "agent-1", "https://hooks.test/df");
        assert_eq!(
            config.api_root(),
            "https://europe-west1-dialogflow.googleapis.com/v3"
        );
        assert_eq!(
            config.agent_url(),
            "https://europe-west1-dialogflow.googleapis.com/v3/projects/proj/locations/europe-west1/agents/agent-1"
        );
    }

    #[test]
    fn test_endpoint_override() {
        let config = SyncConfig::new("proj", "us-central1", "agent-1", "https://hooks.test/df")
            .with_endpoint("http://127.0.0.1:8085/v3/");
        assert_eq!(config.api_root(), "http://127.0.0.1:8085/v3");
    }
}
