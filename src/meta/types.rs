//! Mirrors of the Graph API objects the CRM reads.
//!
//! Field names follow the Graph API (snake_case) so responses deserialize
//! directly. Everything beyond `id` is optional on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Graph list envelope (`{"data": [...], "paging": {...}}`). Paging is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// The user behind an access token (`/me`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaAdAccount {
    pub id: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// 1 = active, 2 = disabled, see Graph docs for the rest.
    #[serde(default)]
    pub account_status: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaCampaign {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub objective: Option<String>,
    /// Minor currency units, as a string (Graph API convention).
    #[serde(default)]
    pub daily_budget: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaAdSet {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub daily_budget: Option<String>,
    #[serde(default)]
    pub targeting: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaAd {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub adset_id: Option<String>,
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub creative: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaLeadForm {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub leads_count: Option<u64>,
    #[serde(default)]
    pub created_time: Option<String>,
}

/// One answered question on a lead form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaFieldData {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl MetaFieldData {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            values: vec![value.to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaLead {
    pub id: String,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub ad_id: Option<String>,
    #[serde(default)]
    pub ad_name: Option<String>,
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub campaign_name: Option<String>,
    #[serde(default)]
    pub form_id: Option<String>,
    #[serde(default)]
    pub field_data: Vec<MetaFieldData>,
}

/// Connection state for the Meta account, persisted while connected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaAccount {
    #[serde(default)]
    pub is_connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<MetaUser>,
    #[serde(default)]
    pub ad_accounts: Vec<MetaAdAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<DateTime<Utc>>,
}

impl MetaAccount {
    /// Connected with a usable token.
    pub fn is_usable(&self) -> bool {
        self.is_connected
            && self
                .access_token
                .as_deref()
                .is_some_and(|t| !t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_deserializes_from_graph_shape() {
        let json = r#"{
            "id": "1234",
            "created_time": "2024-05-01T10:00:00+0000",
            "campaign_id": "c1",
            "field_data": [
                {"name": "full_name", "values": ["Ada Lovelace"]},
                {"name": "email", "values": ["ada@example.com"]}
            ]
        }"#;
        let lead: MetaLead = serde_json::from_str(json).unwrap();
        assert_eq!(lead.field_data.len(), 2);
        assert_eq!(lead.field_data[0].values, vec!["Ada Lovelace"]);
        assert!(lead.ad_id.is_none());
    }

    #[test]
    fn test_account_state_uses_camel_case_keys() {
        let account = MetaAccount {
            is_connected: true,
            access_token: Some("demo_token".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&account).unwrap();
        assert_eq!(value["isConnected"], true);
        assert_eq!(value["accessToken"], "demo_token");
        assert!(value.get("lastSynced").is_none());
    }

    #[test]
    fn test_blank_token_is_not_usable() {
        let account = MetaAccount {
            is_connected: true,
            access_token: Some("  ".into()),
            ..Default::default()
        };
        assert!(!account.is_usable());
    }
}
