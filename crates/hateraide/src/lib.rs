//! # hateraide
//!
//! Client-side moderation for the HaterAide feed.
//!
//! The crate reconciles moderation decisions for feed replies from three
//! sources: actions pushed live over a WebSocket, a batch analysis payload
//! fetched once per view, and the sentiment label each reply carries. One
//! pure resolver turns those into a single decision per reply.
//!
//! - [`channel`]: the self-reconnecting push channel and its listener registry
//! - [`moderation`]: data model, resolver, decision store and backend fetches
//! - [`content`]: the feed content model
//! - [`view`]: per-render presentation with user reveals
//! - [`config`]: endpoint and reconnect configuration
//!
//! ## Example
//!
//! ```no_run
//! use hateraide::channel::ModerationChannel;
//! use hateraide::common::websocket::tungstenite_client::TungsteniteClient;
//! use hateraide::config::Config;
//! use hateraide::moderation::ModerationStore;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = Config::default();
//! let channel = ModerationChannel::new(
//!     TungsteniteClient::new(),
//!     config.endpoints.push.clone(),
//!     config.channel_options(),
//! );
//! let store = ModerationStore::new(
//!     reqwest::Client::new(),
//!     config.endpoints.analysis.clone(),
//!     config.endpoints.snapshot.clone(),
//! );
//! let report = store.activate(&channel).await;
//! if !report.is_complete() {
//!     // keep going with whatever loaded; live updates still arrive
//! }
//! println!("{:?}", store.get("r1"));
//! # }
//! ```

#![warn(missing_docs)]

pub mod channel;
pub mod config;
pub mod content;
pub mod moderation;
pub mod view;

/// Transport plumbing shared with the backend client
pub use hateraide_common as common;
