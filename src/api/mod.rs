//! Client for the CRM REST backend.
//!
//! `BaseApi` owns transport concerns (URL building, bearer auth, status
//! checks). `CrmApi` layers one method per resource or action on top.

pub mod base;
pub mod crm;

pub use base::BaseApi;
pub use crm::CrmApi;

use serde::{Deserialize, Serialize};

/// REST backend configuration stored in ~/.crmdesk/config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token sent as `Authorization`; omitted when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:3001/api".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
        }
    }
}
