//! Synchronization engine
//!
//! Upserts a compiled flow graph into the remote platform with
//! lookup-or-create semantics. Every operation is idempotent: re-running
//! an upload against a live agent reuses existing resources by display
//! name instead of creating duplicates.
//!
//! Execution is strictly sequential. Lookup-then-create is inherently
//! racy under concurrency, so nothing here is parallelized across flows
//! or within a flow's resource upserts.

use std::collections::{BTreeMap, HashMap};

use serde_json::json;

use flowsmith_graph::{FlowGraph, RouteEntry};

use crate::auth::TokenProvider;
use crate::cache::ResourceCache;
use crate::client::{ApiClient, resource_name};
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::payload::{self, SetParameterAction, TransitionRoute, TriggerFulfillment};

/// Display name of the shared webhook that receives every action tag.
pub const DISPATCHER_DISPLAY_NAME: &str = "Dispatcher";

/// Result of one successful flow upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Display name the flow was uploaded under
    pub flow_name: String,
    /// Pages upserted
    pub pages: usize,
    /// Intents upserted
    pub intents: usize,
    /// Transition routes applied to pages
    pub routes_applied: usize,
    /// Terminating routes skipped (end states)
    pub routes_skipped: usize,
}

/// One flow that failed to upload.
#[derive(Debug, Clone)]
pub struct FlowFailure {
    /// Source file of the failed graph
    pub source_file: String,
    /// Diagnostic message
    pub message: String,
}

/// Accumulated results of a multi-graph upload.
#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    /// Flows uploaded successfully
    pub succeeded: Vec<UploadOutcome>,
    /// Flows that failed, with diagnostics
    pub failed: Vec<FlowFailure>,
}

/// Derive a human-readable flow display name from a source identifier:
/// `student_onboarding.csv` becomes `Student Onboarding`.
pub fn derive_flow_name(source_file: &str) -> String {
    let stem = std::path::Path::new(source_file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_file.to_string());
    stem.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a `Key=Value` header description into its pair. Without an
/// equals sign there is no header.
fn parse_header_pair(header: Option<&str>) -> Option<(String, String)> {
    let (key, value) = header?.split_once('=')?;
    Some((key.trim().to_string(), value.trim().to_string()))
}

/// Idempotent uploader for flow graphs.
///
/// Owns the HTTP client, the bearer credential, and the run-lifetime
/// resource cache; one instance per synchronization run.
pub struct SyncEngine {
    config: SyncConfig,
    client: ApiClient,
    cache: ResourceCache,
}

impl SyncEngine {
    /// Create an engine from a configuration and a token source.
    pub fn new(config: SyncConfig, tokens: Box<dyn TokenProvider>) -> Self {
        let client = ApiClient::new(tokens, &config);
        Self {
            config,
            client,
            cache: ResourceCache::new(),
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Look up a flow by display name, creating it when absent. Cached
    /// for the rest of the run.
    pub async fn upsert_flow(&mut self, display_name: &str) -> Result<String> {
        if let Some(resource) = self.cache.flow(display_name) {
            return Ok(resource.to_string());
        }

        let flows_url = format!("{}/flows", self.config.agent_url());
        let flows = self.client.list_by_name(&flows_url, "flows").await?;
        let resource = match flows.get(display_name) {
            Some(existing) => existing.clone(),
            None => {
                let response = self
                    .client
                    .post(&flows_url, json!({"displayName": display_name}))
                    .await?;
                resource_name(&response)?
            }
        };

        self.cache.store_flow(display_name, &resource);
        Ok(resource)
    }

    /// Look up a webhook by display name, creating it when absent.
    ///
    /// On a name match the existing remote configuration is trusted and
    /// left untouched; URI and headers are only sent on create.
    pub async fn upsert_webhook(
        &mut self,
        display_name: &str,
        uri: &str,
        header: Option<(String, String)>,
    ) -> Result<String> {
        if let Some(resource) = self.cache.webhook(display_name, uri) {
            return Ok(resource.to_string());
        }

        let webhooks_url = format!("{}/webhooks", self.config.agent_url());
        let webhooks = self.client.list_by_name(&webhooks_url, "webhooks").await?;
        let resource = match webhooks.get(display_name) {
            Some(existing) => {
                tracing::info!(
                    webhook = display_name,
                    "webhook already exists, using existing configuration"
                );
                existing.clone()
            }
            None => {
                let mut web_service = json!({"uri": uri});
                if let Some((key, value)) = header {
                    web_service["requestHeaders"] = json!({key: value});
                }
                let body = json!({
                    "displayName": display_name,
                    "genericWebService": web_service,
                });
                let response = self.client.post(&webhooks_url, body).await?;
                resource_name(&response)?
            }
        };

        self.cache.store_webhook(display_name, uri, &resource);
        Ok(resource)
    }

    /// Look up an intent by display name, replacing its training phrases
    /// on match and creating it otherwise.
    ///
    /// `index` is the display-name index of existing intents; newly
    /// created intents are added to it so later upserts see them.
    pub async fn upsert_intent(
        &mut self,
        display_name: &str,
        phrases: &[String],
        index: &mut HashMap<String, String>,
    ) -> Result<String> {
        if let Some(existing) = index.get(display_name).cloned() {
            let url = format!("{}/{}", self.config.api_root(), existing);
            self.client
                .patch(
                    &url,
                    "trainingPhrases",
                    json!({"trainingPhrases": payload::training_phrases(phrases)}),
                )
                .await?;
            return Ok(existing);
        }

        let body = json!({
            "displayName": display_name,
            "trainingPhrases": payload::training_phrases(phrases),
        });
        let response = self
            .client
            .post(&format!("{}/intents", self.config.agent_url()), body)
            .await?;
        let resource = resource_name(&response)?;
        index.insert(display_name.to_string(), resource.clone());
        Ok(resource)
    }

    /// Look up a page by display name under `flow_url`, patching only
    /// its entry fulfillment on match and creating it otherwise.
    pub async fn upsert_page(
        &mut self,
        flow_url: &str,
        display_name: &str,
        prompts: &[String],
        chips: &[String],
        index: &mut HashMap<String, String>,
    ) -> Result<String> {
        let fulfillment = payload::entry_fulfillment(prompts, chips);

        if let Some(existing) = index.get(display_name).cloned() {
            let url = format!("{}/{}", self.config.api_root(), existing);
            self.client
                .patch(&url, "entryFulfillment", json!({"entryFulfillment": fulfillment}))
                .await?;
            return Ok(existing);
        }

        let body = json!({
            "displayName": display_name,
            "entryFulfillment": fulfillment,
        });
        let response = self
            .client
            .post(&format!("{flow_url}/pages"), body)
            .await?;
        let resource = resource_name(&response)?;
        index.insert(display_name.to_string(), resource.clone());
        Ok(resource)
    }

    /// Replace the flow's root transition with a single unconditional
    /// route to `first_page`.
    ///
    /// A flow without a start page is unusable, so an unresolvable page
    /// is an error rather than a skipped route.
    pub async fn set_flow_start_route(&mut self, flow_url: &str, first_page: &str) -> Result<()> {
        let pages = self
            .client
            .list_by_name(&format!("{flow_url}/pages"), "pages")
            .await?;
        let target = pages.get(first_page).ok_or_else(|| Error::StartPageMissing {
            page: first_page.to_string(),
        })?;
        self.client
            .patch(flow_url, "transitionRoutes", payload::start_route(target))
            .await?;
        Ok(())
    }

    /// Compose the remote payload for one valid route.
    ///
    /// Intent and target page references are always present. A trigger
    /// fulfillment is attached only when the route carries a webhook
    /// action (and a dispatcher exists) and/or at least one non-empty
    /// parameter.
    pub fn compose_route(
        route: &RouteEntry,
        intent_resource: &str,
        target_resource: &str,
        dispatcher: Option<&str>,
    ) -> TransitionRoute {
        let mut fulfillment = TriggerFulfillment::default();
        if let (Some(tag), Some(dispatcher)) = (&route.webhook_action, dispatcher) {
            fulfillment.webhook = Some(dispatcher.to_string());
            fulfillment.tag = Some(tag.clone());
        }
        if let Some(parameters) = &route.parameters {
            fulfillment.set_parameter_actions = parameters
                .iter()
                .filter(|(key, value)| !key.is_empty() && !value.is_empty())
                .map(|(key, value)| SetParameterAction {
                    parameter: key.clone(),
                    value: value.clone(),
                })
                .collect();
        }

        TransitionRoute {
            intent: intent_resource.to_string(),
            target_page: target_resource.to_string(),
            trigger_fulfillment: if fulfillment.is_empty() {
                None
            } else {
                Some(fulfillment)
            },
        }
    }

    /// Upload one graph end to end: flow, dispatcher webhook, pages,
    /// intents, per-page transition routes, and the start route.
    ///
    /// When `flow_name` is not given it is derived from the graph's
    /// source file.
    pub async fn upload_flow(
        &mut self,
        graph: &FlowGraph,
        flow_name: Option<&str>,
    ) -> Result<UploadOutcome> {
        let flow_name = flow_name
            .map(str::to_string)
            .unwrap_or_else(|| derive_flow_name(&graph.metadata.source_file));
        tracing::info!(
            flow = %flow_name,
            source = %graph.metadata.source_file,
            "uploading flow"
        );
        if !graph.end_pages.is_empty() {
            tracing::info!(count = graph.end_pages.len(), "flow contains end state pages");
        }

        let flow_resource = self.upsert_flow(&flow_name).await?;
        let flow_url = format!("{}/{}", self.config.api_root(), flow_resource);

        let dispatcher = if graph.needs_dispatcher() {
            let header = parse_header_pair(self.config.dispatcher_header.as_deref());
            let uri = self.config.dispatcher_url.clone();
            let resource = self
                .upsert_webhook(DISPATCHER_DISPLAY_NAME, &uri, header)
                .await?;
            tracing::info!(uri = %uri, "dispatcher webhook configured");
            Some(resource)
        } else {
            tracing::info!("no webhooks needed for this flow");
            None
        };

        let mut intents_index = self
            .client
            .list_by_name(&format!("{}/intents", self.config.agent_url()), "intents")
            .await?;
        let mut pages_index = self
            .client
            .list_by_name(&format!("{flow_url}/pages"), "pages")
            .await?;

        let mut page_ids: BTreeMap<String, String> = BTreeMap::new();
        for (page, entry) in &graph.pages {
            let resource = self
                .upsert_page(&flow_url, page, &entry.prompts, &entry.chips, &mut pages_index)
                .await?;
            page_ids.insert(page.clone(), resource);
        }

        let mut intent_ids: BTreeMap<String, String> = BTreeMap::new();
        for (name, entry) in &graph.intents {
            let resource = self
                .upsert_intent(name, &entry.training_phrases, &mut intents_index)
                .await?;
            intent_ids.insert(name.clone(), resource);
        }

        // Group valid routes by owning page; terminating routes are end
        // states and never reach the platform.
        let mut routes_by_page: BTreeMap<&str, Vec<&RouteEntry>> = BTreeMap::new();
        let mut routes_skipped = 0usize;
        for route in &graph.routes {
            if route.next_page.is_none() {
                routes_skipped += 1;
                tracing::debug!(page = %route.page, "skipping terminating route");
                continue;
            }
            routes_by_page
                .entry(route.page.as_str())
                .or_default()
                .push(route);
        }
        tracing::info!(
            valid = graph.routes.len() - routes_skipped,
            skipped = routes_skipped,
            "processing transition routes"
        );

        let mut routes_applied = 0usize;
        for (&page, routes) in &routes_by_page {
            let Some(page_resource) = page_ids.get(page) else {
                tracing::warn!(page, "page not found among created pages, skipping its routes");
                continue;
            };

            let mut transition_routes = Vec::new();
            for &route in routes {
                let Some(intent_resource) = intent_ids.get(&route.intent) else {
                    tracing::warn!(intent = %route.intent, "intent not found, skipping route");
                    continue;
                };
                let Some(target) = route.next_page.as_deref() else {
                    continue;
                };
                let Some(target_resource) = page_ids.get(target) else {
                    tracing::warn!(page = target, "target page not found, skipping route");
                    continue;
                };
                transition_routes.push(Self::compose_route(
                    route,
                    intent_resource,
                    target_resource,
                    dispatcher.as_deref(),
                ));
            }

            if transition_routes.is_empty() {
                tracing::info!(page, "page is an end state (no outgoing routes)");
                continue;
            }

            routes_applied += transition_routes.len();
            let patch_url = format!("{}/{}", self.config.api_root(), page_resource);
            self.client
                .patch(
                    &patch_url,
                    "transitionRoutes",
                    json!({"transitionRoutes": transition_routes}),
                )
                .await?;
            tracing::info!(page, "updated page transition routes");
        }

        if let Some(first_page) = &graph.first_page {
            self.set_flow_start_route(&flow_url, first_page).await?;
            tracing::info!(page = %first_page, "set flow start route");
        }

        tracing::info!(flow = %flow_name, "flow uploaded");
        Ok(UploadOutcome {
            flow_name,
            pages: graph.pages.len(),
            intents: graph.intents.len(),
            routes_applied,
            routes_skipped,
        })
    }

    /// Upload several graphs sequentially with the configured
    /// inter-upload pause, accumulating per-flow results. One flow's
    /// failure never aborts the rest.
    pub async fn upload_graphs(&mut self, graphs: &[FlowGraph]) -> UploadReport {
        let mut report = UploadReport::default();
        for (i, graph) in graphs.iter().enumerate() {
            if i > 0 && !self.config.upload_delay.is_zero() {
                tokio::time::sleep(self.config.upload_delay).await;
            }
            match self.upload_flow(graph, None).await {
                Ok(outcome) => report.succeeded.push(outcome),
                Err(e) => {
                    tracing::error!(
                        source = %graph.metadata.source_file,
                        "flow upload failed: {e}"
                    );
                    report.failed.push(FlowFailure {
                        source_file: graph.metadata.source_file.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
        tracing::info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            total = graphs.len(),
            "upload complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn route(webhook: Option<&str>, parameters: Option<BTreeMap<String, String>>) -> RouteEntry {
        RouteEntry {
            page: "Menu".to_string(),
            intent: "pick".to_string(),
            next_page: Some("Orders".to_string()),
            webhook_action: webhook.map(str::to_string),
            parameters,
        }
    }

    #[test]
    fn test_compose_route_without_fulfillment() {
        let composed = SyncEngine::compose_route(&route(None, None), "i1", "p1", None);
        assert_eq!(composed.intent, "i1");
        assert_eq!(composed.target_page, "p1");
        assert!(composed.trigger_fulfillment.is_none());
    }

    #[test]
    fn test_compose_route_webhook_requires_dispatcher() {
        // An action tag without a dispatcher webhook cannot fire.
        let composed =
            SyncEngine::compose_route(&route(Some("fetch_orders"), None), "i1", "p1", None);
        assert!(composed.trigger_fulfillment.is_none());

        let composed =
            SyncEngine::compose_route(&route(Some("fetch_orders"), None), "i1", "p1", Some("w1"));
        let fulfillment = composed.trigger_fulfillment.unwrap();
        assert_eq!(fulfillment.webhook.as_deref(), Some("w1"));
        assert_eq!(fulfillment.tag.as_deref(), Some("fetch_orders"));
    }

    #[test]
    fn test_compose_route_drops_empty_parameters() {
        let mut parameters = BTreeMap::new();
        parameters.insert("city".to_string(), "SFO".to_string());
        parameters.insert("empty".to_string(), String::new());
        let composed =
            SyncEngine::compose_route(&route(None, Some(parameters)), "i1", "p1", None);
        let fulfillment = composed.trigger_fulfillment.unwrap();
        assert_eq!(fulfillment.set_parameter_actions.len(), 1);
        assert_eq!(fulfillment.set_parameter_actions[0].parameter, "city");
    }

    #[test]
    fn test_compose_route_all_parameters_empty_means_no_fulfillment() {
        let mut parameters = BTreeMap::new();
        parameters.insert("a".to_string(), String::new());
        let composed =
            SyncEngine::compose_route(&route(None, Some(parameters)), "i1", "p1", None);
        assert!(composed.trigger_fulfillment.is_none());
    }

    #[test]
    fn test_derive_flow_name() {
        assert_eq!(derive_flow_name("student_onboarding.csv"), "Student Onboarding");
        assert_eq!(derive_flow_name("orders.json"), "Orders");
        assert_eq!(derive_flow_name("support flow.csv"), "Support Flow");
    }

    #[test]
    fn test_parse_header_pair() {
        assert_eq!(
            parse_header_pair(Some("X-Api-Key = secret")),
            Some(("X-Api-Key".to_string(), "secret".to_string()))
        );
        assert_eq!(parse_header_pair(Some("no-equals")), None);
        assert_eq!(parse_header_pair(None), None);
    }
}
