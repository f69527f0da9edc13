//! Flow graph data model
//!
//! The compiler's output and the synchronization engine's input. The
//! graph is persisted as a JSON document between the two stages, so every
//! type here round-trips through serde.
//!
//! # Document shape
//!
//! ```json
//! {
//!   "pages": {"Welcome": {"prompts": ["Hi!"], "chips": ["Yes"], "metadata": {}}},
//!   "intents": {"greet": {"training_phrases": ["hello"]}},
//!   "routes": [{"page": "Welcome", "intent": "greet", "next_page": "Menu",
//!               "webhook_action": null, "parameters": null}],
//!   "end_pages": ["Goodbye"],
//!   "first_page": "Welcome",
//!   "webhooks": {"fetch_orders": "Fetch orders for the user"},
//!   "metadata": {"source_file": "orders.csv", "has_step_info": false}
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A conversational page: prompts shown on entry plus quick-reply chips.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    /// Distinct bot prompts in first-appearance order
    #[serde(default)]
    pub prompts: Vec<String>,
    /// Distinct suggested chips in first-appearance order
    #[serde(default)]
    pub chips: Vec<String>,
    /// Free-form metadata such as step markers
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// A recognizable user input pattern backed by training phrases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentEntry {
    /// Distinct training phrases in first-appearance order
    #[serde(default)]
    pub training_phrases: Vec<String>,
}

/// A transition out of a page, triggered by an intent.
///
/// `next_page: None` denotes termination; such routes are never
/// materialized as remote transition routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Owning page display name
    pub page: String,
    /// Triggering intent display name
    pub intent: String,
    /// Target page display name, or `None` for termination
    pub next_page: Option<String>,
    /// Webhook tag fired on this transition, if any
    pub webhook_action: Option<String>,
    /// Session parameters set on this transition, if any
    pub parameters: Option<BTreeMap<String, String>>,
}

/// Provenance metadata carried alongside the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMetadata {
    /// Basename of the table the graph was compiled from
    pub source_file: String,
    /// Whether the source table carried Step / Next Step columns
    pub has_step_info: bool,
}

/// A compiled flow graph: pages, intents, routes, webhook tags, end
/// states, and the designated first page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowGraph {
    /// Pages keyed by display name
    pub pages: BTreeMap<String, PageEntry>,
    /// Intents keyed by display name
    pub intents: BTreeMap<String, IntentEntry>,
    /// Routes in emission order
    pub routes: Vec<RouteEntry>,
    /// Pages classified as end states
    pub end_pages: Vec<String>,
    /// First page of the flow, excluding conventional start placeholders
    pub first_page: Option<String>,
    /// Webhook tag -> original action description
    pub webhooks: BTreeMap<String, String>,
    /// Provenance metadata
    pub metadata: GraphMetadata,
}

impl FlowGraph {
    /// Create an empty graph with the given provenance.
    pub fn new(source_file: &str, has_step_info: bool) -> Self {
        Self {
            metadata: GraphMetadata {
                source_file: source_file.to_string(),
                has_step_info,
            },
            ..Self::default()
        }
    }

    /// Routes that actually transition somewhere (valid targets only).
    pub fn valid_routes(&self) -> impl Iterator<Item = &RouteEntry> {
        self.routes.iter().filter(|r| r.next_page.is_some())
    }

    /// Whether any route carries a webhook action or the graph declares
    /// webhook tags. Decides whether a dispatcher webhook is needed.
    pub fn needs_dispatcher(&self) -> bool {
        self.routes.iter().any(|r| r.webhook_action.is_some()) || !self.webhooks.is_empty()
    }

    /// Serialize the graph document as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the graph document to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    /// Load a graph document from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
