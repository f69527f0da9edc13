//! Remote API payloads
//!
//! Builders for the JSON bodies the platform expects: entry fulfillment
//! (text plus chips rich content), training phrases, and transition
//! routes. Kept separate from the engine so payload shapes can be tested
//! without a network.

use serde::Serialize;
use serde_json::{Value, json};

/// Text message carrying a page's prompts.
fn text_message(prompts: &[String]) -> Value {
    json!({"text": {"text": prompts}})
}

/// Rich-content message rendering chips as quick replies.
fn chips_message(chips: &[String]) -> Value {
    let options: Vec<Value> = chips.iter().map(|c| json!({"text": c})).collect();
    json!({
        "payload": {
            "richContent": [[{"type": "chips", "options": options}]]
        }
    })
}

/// Entry fulfillment for a page: a text message when prompts exist plus
/// a chips message when chips exist.
pub fn entry_fulfillment(prompts: &[String], chips: &[String]) -> Value {
    let mut messages = Vec::new();
    if !prompts.is_empty() {
        messages.push(text_message(prompts));
    }
    if !chips.is_empty() {
        messages.push(chips_message(chips));
    }
    json!({"messages": messages})
}

/// Training phrases payload; empty phrases are dropped.
pub fn training_phrases(phrases: &[String]) -> Value {
    let entries: Vec<Value> = phrases
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| json!({"repeatCount": 1, "parts": [{"text": p}]}))
        .collect();
    Value::Array(entries)
}

/// The flow's root transition: one unconditional route to the first
/// page.
pub fn start_route(target_page: &str) -> Value {
    json!({
        "transitionRoutes": [{"condition": "true", "targetPage": target_page}]
    })
}

/// An action setting one session parameter on a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetParameterAction {
    /// Parameter display name
    pub parameter: String,
    /// Value assigned to the parameter
    pub value: String,
}

/// Fulfillment fired when a transition route matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerFulfillment {
    /// Shared dispatcher webhook resource, when an action fires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook: Option<String>,
    /// Action tag routed through the dispatcher
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Session parameters set by this transition
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub set_parameter_actions: Vec<SetParameterAction>,
}

impl TriggerFulfillment {
    /// Whether the fulfillment carries anything worth sending.
    pub fn is_empty(&self) -> bool {
        self.webhook.is_none() && self.tag.is_none() && self.set_parameter_actions.is_empty()
    }
}

/// One transition route on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRoute {
    /// Triggering intent resource identifier
    pub intent: String,
    /// Target page resource identifier
    pub target_page: String,
    /// Attached only when a webhook action or parameter exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_fulfillment: Option<TriggerFulfillment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_fulfillment_with_prompts_and_chips() {
        let value = entry_fulfillment(
            &["Hi!".to_string()],
            &["Yes".to_string(), "No".to_string()],
        );
        let messages = value["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["text"]["text"][0], "Hi!");
        let chips = &messages[1]["payload"]["richContent"][0][0];
        assert_eq!(chips["type"], "chips");
        assert_eq!(chips["options"][1]["text"], "No");
    }

    #[test]
    fn test_entry_fulfillment_without_chips() {
        let value = entry_fulfillment(&["Hi!".to_string()], &[]);
        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_training_phrases_drop_empty() {
        let value = training_phrases(&["hello".to_string(), String::new()]);
        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["parts"][0]["text"], "hello");
        assert_eq!(entries[0]["repeatCount"], 1);
    }

    #[test]
    fn test_route_serialization_skips_empty_fulfillment() {
        let route = TransitionRoute {
            intent: "agents/a/intents/i1".to_string(),
            target_page: "agents/a/flows/f/pages/p1".to_string(),
            trigger_fulfillment: None,
        };
        let value = serde_json::to_value(&route).unwrap();
        assert!(value.get("triggerFulfillment").is_none());
        assert_eq!(value["targetPage"], "agents/a/flows/f/pages/p1");
    }

    #[test]
    fn test_route_serialization_with_webhook_and_params() {
        let route = TransitionRoute {
            intent: "i1".to_string(),
            target_page: "p1".to_string(),
            trigger_fulfillment: Some(TriggerFulfillment {
                webhook: Some("w1".to_string()),
                tag: Some("fetch_orders".to_string()),
                set_parameter_actions: vec![SetParameterAction {
                    parameter: "city".to_string(),
                    value: "SFO".to_string(),
                }],
            }),
        };
        let value = serde_json::to_value(&route).unwrap();
        let fulfillment = &value["triggerFulfillment"];
        assert_eq!(fulfillment["webhook"], "w1");
        assert_eq!(fulfillment["tag"], "fetch_orders");
        assert_eq!(fulfillment["setParameterActions"][0]["parameter"], "city");
    }

    #[test]
    fn test_start_route_shape() {
        let value = start_route("agents/a/flows/f/pages/p1");
        assert_eq!(value["transitionRoutes"][0]["condition"], "true");
        assert_eq!(
            value["transitionRoutes"][0]["targetPage"],
            "agents/a/flows/f/pages/p1"
        );
    }
}
