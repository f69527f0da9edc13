//! Remote API client
//!
//! A thin JSON-over-REST client wrapping every call in the retry
//! protocol: exponential backoff for transient failures, credential
//! refresh on 401, server-directed waits on 429, and full-body logging
//! for 400s. After the attempt ceiling the last error propagates to the
//! caller.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::auth::TokenProvider;
use crate::config::SyncConfig;
use crate::error::{Error, Result};

/// JSON API client with retry, backoff, and credential-refresh handling.
///
/// The bearer token and the HTTP connection pool are owned by one client
/// instance; nothing here is shared across engines.
pub struct ApiClient {
    http: reqwest::Client,
    tokens: Box<dyn TokenProvider>,
    bearer: Option<String>,
    max_attempts: u32,
    backoff_base: Duration,
    rate_limit_wait: Duration,
}

impl ApiClient {
    /// Create a client using the retry timing from `config`.
    pub fn new(tokens: Box<dyn TokenProvider>, config: &SyncConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            tokens,
            bearer: None,
            max_attempts: config.max_attempts,
            backoff_base: config.backoff_base,
            rate_limit_wait: config.rate_limit_wait,
        }
    }

    /// GET a resource collection or object.
    pub async fn get(&mut self, url: &str) -> Result<Value> {
        self.request(Method::GET, url, None, None).await
    }

    /// POST a create request.
    pub async fn post(&mut self, url: &str, body: Value) -> Result<Value> {
        self.request(Method::POST, url, None, Some(body)).await
    }

    /// PATCH a resource, replacing exactly the fields named by
    /// `update_mask`.
    pub async fn patch(&mut self, url: &str, update_mask: &str, body: Value) -> Result<Value> {
        self.request(Method::PATCH, url, Some(("updateMask", update_mask)), Some(body))
            .await
    }

    /// List a collection and index the items by display name.
    ///
    /// `key` is the collection field in the response body (`"flows"`,
    /// `"pages"`, ...). Items without a `displayName`/`name` pair are
    /// ignored.
    pub async fn list_by_name(&mut self, url: &str, key: &str) -> Result<HashMap<String, String>> {
        let body = self.get(url).await?;
        let mut index = HashMap::new();
        if let Some(items) = body.get(key).and_then(Value::as_array) {
            for item in items {
                let display_name = item.get("displayName").and_then(Value::as_str);
                let name = item.get("name").and_then(Value::as_str);
                if let (Some(display_name), Some(name)) = (display_name, name) {
                    index.insert(display_name.to_string(), name.to_string());
                }
            }
        }
        Ok(index)
    }

    async fn bearer_token(&mut self) -> Result<String> {
        match &self.bearer {
            Some(token) => Ok(token.clone()),
            None => {
                let token = self.tokens.fetch_token().await?;
                self.bearer = Some(token.clone());
                Ok(token)
            }
        }
    }

    async fn request(
        &mut self,
        method: Method,
        url: &str,
        query: Option<(&str, &str)>,
        body: Option<Value>,
    ) -> Result<Value> {
        let mut last_error: Option<Error> = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.backoff_base * 2u32.pow(attempt)).await;
            }

            let token = self.bearer_token().await?;
            let mut request = self.http.request(method.clone(), url).bearer_auth(&token);
            if let Some((key, value)) = query {
                request = request.query(&[(key, value)]);
            }
            if let Some(body) = &body {
                request = request.json(body);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(attempt = attempt + 1, url, "request failed: {e}");
                    last_error = Some(e.into());
                    continue;
                }
            };
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && attempt + 1 < self.max_attempts {
                tracing::info!("refreshing bearer credential");
                let fresh = self.tokens.fetch_token().await?;
                self.bearer = Some(fresh);
                last_error = Some(Error::Api {
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                });
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let wait = retry_after(&response).unwrap_or(self.rate_limit_wait);
                tracing::warn!("rate limited, waiting {:?}", wait);
                last_error = Some(Error::Api {
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                });
                tokio::time::sleep(wait).await;
                continue;
            }

            if status.is_success() {
                let text = response.text().await?;
                if text.trim().is_empty() {
                    return Ok(Value::Null);
                }
                return Ok(serde_json::from_str(&text)?);
            }

            let body_text = response.text().await.unwrap_or_default();
            if status == StatusCode::BAD_REQUEST {
                // Malformed payloads are the most actionable failure
                // class, so the full response body goes to the log.
                tracing::error!(url, "bad request details: {body_text}");
            }
            last_error = Some(Error::Api {
                status: status.as_u16(),
                body: body_text,
            });
        }

        Err(last_error.unwrap_or(Error::Response {
            message: "request retries exhausted".to_string(),
        }))
    }
}

/// Seconds the server asked us to wait, from the `Retry-After` header.
fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Extract the opaque resource identifier from a create/read response.
pub fn resource_name(value: &Value) -> Result<String> {
    value
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::Response {
            message: "response is missing the resource name".to_string(),
        })
}
