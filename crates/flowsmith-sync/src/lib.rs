//! Flowsmith Synchronization Engine
//!
//! This crate uploads compiled flow graphs into a remote
//! conversational-agent platform:
//! - Lookup-or-create upserts for flows, webhooks, intents, and pages
//! - Transition-route composition with webhook and parameter fulfillment
//! - Retry/backoff with credential refresh and rate-limit handling
//! - A run-lifetime cache that keeps re-runs duplicate-free
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  FlowGraph  │────▶│    Sync     │────▶│   Remote    │
//! │ (document)  │     │   Engine    │     │  REST API   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use flowsmith_graph::FlowGraph;
//! use flowsmith_sync::{StaticToken, SyncConfig, SyncEngine};
//!
//! let config = SyncConfig::new("my-project", "us-central1", "agent-1",
//!                              "https://hooks.example.com/dispatch");
//! let mut engine = SyncEngine::new(config, Box::new(StaticToken::new(token)));
//! let graph = FlowGraph::load("flows/orders.json")?;
//! let outcome = engine.upload_flow(&graph, None).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod payload;

pub use auth::{StaticToken, TokenProvider};
pub use config::SyncConfig;
pub use engine::{FlowFailure, SyncEngine, UploadOutcome, UploadReport, derive_flow_name};
pub use error::{Error, Result};
