//! Client configuration
//!
//! Configuration is a small KDL document. Every node is optional and falls
//! back to the local development backend:
//!
//! ```kdl
//! base "http://localhost:8000"
//! push "ws://localhost:8000/ws"
//! analysis "http://localhost:8000/reply_analyzer_results.json"
//! snapshot "http://localhost:8000/api/moderation-actions"
//! feed "http://localhost:8000/api/mock-data"
//! health "http://localhost:8000/health"
//! reconnect-delay-ms 5000
//! ```
//!
//! `base` derives every endpoint from one backend origin; nodes after it
//! override individual endpoints.

use crate::channel::{ChannelOptions, DEFAULT_RECONNECT_DELAY};
use miette::{IntoDiagnostic, Result, miette};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default backend origin
pub const DEFAULT_BASE: &str = "http://localhost:8000";

const PUSH_PATH: &str = "/ws";
const ANALYSIS_PATH: &str = "/reply_analyzer_results.json";
const SNAPSHOT_PATH: &str = "/api/moderation-actions";
const FEED_PATH: &str = "/api/mock-data";
const HEALTH_PATH: &str = "/health";

/// Backend endpoints the client talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// WebSocket push channel
    pub push: Url,
    /// Batch analysis payload
    pub analysis: Url,
    /// Snapshot of applied moderation actions
    pub snapshot: Url,
    /// Mock feed
    pub feed: Url,
    /// Health check endpoint
    pub health: Url,
}

impl Endpoints {
    /// Derive every endpoint from a backend origin
    ///
    /// The push endpoint swaps `http`/`https` for `ws`/`wss`.
    pub fn from_base(base: &Url) -> Result<Self> {
        let join = |path: &str| {
            base.join(path)
                .map_err(|e| miette!("Invalid endpoint path {} for base {}: {}", path, base, e))
        };

        let mut push = join(PUSH_PATH)?;
        let scheme = match base.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(miette!("Unsupported base url scheme: {}", other)),
        };
        push.set_scheme(scheme)
            .map_err(|_| miette!("Cannot derive websocket url from {}", base))?;

        Ok(Self {
            push,
            analysis: join(ANALYSIS_PATH)?,
            snapshot: join(SNAPSHOT_PATH)?,
            feed: join(FEED_PATH)?,
            health: join(HEALTH_PATH)?,
        })
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        let base = Url::parse(DEFAULT_BASE).expect("valid url");
        Self::from_base(&base).expect("valid default endpoints")
    }
}

/// Full client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend endpoints
    pub endpoints: Endpoints,
    /// Fixed delay between reconnect attempts
    pub reconnect_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl Config {
    /// Parse a KDL configuration document
    pub fn from_kdl(text: &str) -> Result<Self> {
        let doc = text
            .parse::<kdl::KdlDocument>()
            .map_err(|e| miette!("Failed to parse KDL: {}", e))?;

        let mut config = Config::default();

        for node in doc.nodes() {
            match node.name().value() {
                "base" => {
                    let base = parse_url(node)?;
                    config.endpoints = Endpoints::from_base(&base)?;
                }
                "push" => config.endpoints.push = parse_url(node)?,
                "analysis" => config.endpoints.analysis = parse_url(node)?,
                "snapshot" => config.endpoints.snapshot = parse_url(node)?,
                "feed" => config.endpoints.feed = parse_url(node)?,
                "health" => config.endpoints.health = parse_url(node)?,
                "reconnect-delay-ms" => {
                    let ms = node
                        .entries()
                        .get(0)
                        .and_then(|e| e.value().as_integer())
                        .ok_or_else(|| miette!("reconnect-delay-ms expects an integer value"))?;
                    let ms = u64::try_from(ms)
                        .map_err(|_| miette!("reconnect-delay-ms must not be negative"))?;
                    config.reconnect_delay = Duration::from_millis(ms);
                }
                other => {
                    return Err(miette!("Unknown config node: {}", other));
                }
            }
        }

        Ok(config)
    }

    /// Read and parse a KDL configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).into_diagnostic()?;
        Self::from_kdl(&text)
    }

    /// Channel options implied by this configuration
    pub fn channel_options(&self) -> ChannelOptions {
        ChannelOptions::builder()
            .reconnect_delay(self.reconnect_delay)
            .build()
    }
}

fn parse_url(node: &kdl::KdlNode) -> Result<Url> {
    let name = node.name().value();
    let val = node
        .entries()
        .get(0)
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| miette!("{} expects a string value", name))?;
    Url::parse(val).map_err(|e| miette!("{} is not a valid url ({}): {}", name, val, e))
}
