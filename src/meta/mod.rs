//! Meta (Facebook) Ads integration.
//!
//! Lead-generation webhooks plus a read-only view of the connected ad
//! account via the Graph API. Demo tokens are served by a deterministic
//! in-process data source instead of the network.
//!
//! Modules:
//! - account: connection state + fetch methods (`MetaAccountService`)
//! - account_store: on-disk persistence of the connection
//! - client: live Graph API data source
//! - demo: simulated data source for demo tokens
//! - poller: background lead sync from lead forms
//! - source: the `MetaDataSource` seam and source selection
//! - types: Graph API object mirrors
//! - webhook: challenge verification + lead normalization

pub mod account;
pub mod account_store;
pub mod client;
pub mod demo;
pub mod poller;
pub mod source;
pub mod types;
pub mod webhook;

use serde::{Deserialize, Serialize};

/// Graph API host. Versioned paths are appended per request.
pub const GRAPH_API_BASE: &str = "https://graph.facebook.com";

/// Access tokens with this prefix are served by the demo data source.
pub const DEMO_TOKEN_PREFIX: &str = "demo_";

/// Meta integration configuration stored in ~/.crmdesk/config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaConfig {
    /// Enables the background lead-form poller.
    #[serde(default)]
    pub enabled: bool,
    /// Secret echoed back by Meta during webhook subscription.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_token: Option<String>,
    #[serde(default = "default_graph_version")]
    pub graph_version: String,
    /// Facebook page whose lead forms the poller reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    #[serde(default = "default_poll_interval_minutes")]
    pub poll_interval_minutes: u32,
    /// Artificial latency applied to demo responses.
    #[serde(default = "default_demo_delay_ms")]
    pub demo_delay_ms: u64,
}

fn default_graph_version() -> String {
    "v20.0".to_string()
}

fn default_poll_interval_minutes() -> u32 {
    15
}

fn default_demo_delay_ms() -> u64 {
    800
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            verify_token: None,
            graph_version: default_graph_version(),
            page_id: None,
            poll_interval_minutes: default_poll_interval_minutes(),
            demo_delay_ms: default_demo_delay_ms(),
        }
    }
}

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum MetaApiError {
    #[error("Not connected")]
    NotConnected,
    #[error("Access token is required")]
    MissingToken,
    #[error("Access token has expired or is invalid. Please reconnect your Meta account.")]
    TokenExpired,
    #[error("Missing ads_read permission. Please reconnect and grant ads_read access.")]
    MissingAdsRead,
    #[error(
        "Missing business_management permission. Please reconnect and grant business_management access."
    )]
    MissingBusinessManagement,
    #[error("Meta API error {code}: {message}")]
    Graph { code: i64, message: String },
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected Graph API response: {0}")]
    Parse(String),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl MetaApiError {
    /// Map a Graph API `{error: {code, message}}` body to an error, using
    /// curated text for the codes users can fix themselves.
    pub fn from_graph(code: i64, message: impl Into<String>) -> Self {
        match code {
            190 => MetaApiError::TokenExpired,
            100 => MetaApiError::MissingAdsRead,
            200 => MetaApiError::MissingBusinessManagement,
            _ => MetaApiError::Graph {
                code,
                message: message.into(),
            },
        }
    }

    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            MetaApiError::NotConnected
                | MetaApiError::MissingToken
                | MetaApiError::TokenExpired
                | MetaApiError::MissingAdsRead
                | MetaApiError::MissingBusinessManagement
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_graph_codes_get_curated_messages() {
        assert!(matches!(
            MetaApiError::from_graph(190, "Error validating access token"),
            MetaApiError::TokenExpired
        ));
        assert!(matches!(
            MetaApiError::from_graph(100, "x"),
            MetaApiError::MissingAdsRead
        ));
        assert!(matches!(
            MetaApiError::from_graph(200, "x"),
            MetaApiError::MissingBusinessManagement
        ));
    }

    #[test]
    fn test_unknown_graph_code_passes_message_through() {
        let err = MetaApiError::from_graph(4, "Application request limit reached");
        assert_eq!(
            err.to_string(),
            "Meta API error 4: Application request limit reached"
        );
        assert!(!err.requires_user_action());
    }

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: MetaConfig = serde_json::from_str("{}").unwrap();
        assert!(!config.enabled);
        assert_eq!(config.graph_version, "v20.0");
        assert_eq!(config.poll_interval_minutes, 15);
        assert!(config.verify_token.is_none());
    }
}
