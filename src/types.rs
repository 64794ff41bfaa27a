use serde::{Deserialize, Serialize};

use crate::api::ApiConfig;
use crate::meta::MetaConfig;

/// Contents of ~/.crmdesk/config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Address the webhook server listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Fill the stores with demo fixtures at startup.
    #[serde(default = "default_true")]
    pub seed_demo_data: bool,
    #[serde(default)]
    pub meta: MetaConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            seed_demo_data: true,
            meta: MetaConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8787");
        assert!(config.seed_demo_data);
        assert!(!config.meta.enabled);
        assert_eq!(config.meta.graph_version, "v20.0");
        assert_eq!(config.api.base_url, "http://localhost:3001/api");
    }

    #[test]
    fn test_partial_meta_section() {
        let config: Config = serde_json::from_str(
            r#"{"seedDemoData": false, "meta": {"verifyToken": "abc", "pageId": "123"}}"#,
        )
        .unwrap();
        assert!(!config.seed_demo_data);
        assert_eq!(config.meta.verify_token.as_deref(), Some("abc"));
        assert_eq!(config.meta.page_id.as_deref(), Some("123"));
        assert_eq!(config.meta.poll_interval_minutes, 15);
    }
}
