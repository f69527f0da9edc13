//! Remote resource cache
//!
//! In-memory index of already-resolved remote identifiers, keyed by
//! display name. Lives for one synchronization run; never persisted.
//! Webhooks are additionally keyed by target URI, since the same display
//! name must not collide across different targets.

use std::collections::HashMap;

/// Run-lifetime cache of remote resource identifiers.
#[derive(Debug, Default)]
pub struct ResourceCache {
    flows: HashMap<String, String>,
    webhooks: HashMap<String, String>,
}

fn webhook_key(display_name: &str, uri: &str) -> String {
    format!("{display_name}::{uri}")
}

impl ResourceCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Previously resolved flow identifier, if any.
    pub fn flow(&self, display_name: &str) -> Option<&str> {
        self.flows.get(display_name).map(String::as_str)
    }

    /// Remember a resolved flow identifier.
    pub fn store_flow(&mut self, display_name: &str, resource: &str) {
        self.flows
            .insert(display_name.to_string(), resource.to_string());
    }

    /// Previously resolved webhook identifier for this name/target pair,
    /// if any.
    pub fn webhook(&self, display_name: &str, uri: &str) -> Option<&str> {
        self.webhooks
            .get(&webhook_key(display_name, uri))
            .map(String::as_str)
    }

    /// Remember a resolved webhook identifier for a name/target pair.
    pub fn store_webhook(&mut self, display_name: &str, uri: &str, resource: &str) {
        self.webhooks
            .insert(webhook_key(display_name, uri), resource.to_string());
    }
}
