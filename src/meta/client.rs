//! Live Graph API data source.
//!
//! Plain GET requests with `access_token` and `fields` query parameters.
//! Any body carrying an `error` object is mapped through
//! `MetaApiError::from_graph`, regardless of HTTP status.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::source::{MetaDataSource, SourceKind};
use super::types::{
    GraphList, MetaAd, MetaAdAccount, MetaAdSet, MetaCampaign, MetaLead, MetaLeadForm, MetaUser,
};
use super::{MetaApiError, GRAPH_API_BASE};
use crate::api::base::push_segments;

const USER_FIELDS: &str = "id,name";
const AD_ACCOUNT_FIELDS: &str = "id,account_id,name,account_status,currency";
const CAMPAIGN_FIELDS: &str = "id,name,status,objective,daily_budget,created_time";
const AD_SET_FIELDS: &str = "id,name,status,campaign_id,daily_budget,targeting";
const AD_FIELDS: &str = "id,name,status,adset_id,campaign_id,creative";
const LEAD_FIELDS: &str = "id,created_time,ad_id,ad_name,campaign_id,campaign_name,form_id,field_data";
const LEAD_FORM_FIELDS: &str = "id,name,status,leads_count,created_time";

pub struct GraphClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GraphClient {
    pub fn new(access_token: &str, graph_version: &str) -> Self {
        Self::with_base_url(&format!("{}/{}", GRAPH_API_BASE, graph_version), access_token)
    }

    /// Point the client at a different host (used by tests).
    pub fn with_base_url(base_url: &str, access_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn endpoint(&self, segments: &[&str], fields: &str) -> Result<url::Url, MetaApiError> {
        let bad_url = |e: String| {
            MetaApiError::Parse(format!("bad Graph URL for {}: {}", segments.join("/"), e))
        };
        let mut url = url::Url::parse(&self.base_url).map_err(|e| bad_url(e.to_string()))?;
        push_segments(&mut url, segments).map_err(bad_url)?;
        url.query_pairs_mut()
            .append_pair("access_token", &self.access_token)
            .append_pair("fields", fields);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        fields: &str,
    ) -> Result<T, MetaApiError> {
        let path = segments.join("/");
        let url = self.endpoint(segments, fields)?;
        let resp = self.client.get(url).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;

        let value = parse_graph_response(status, &body).inspect_err(|e| {
            log::warn!("Meta Graph request {} failed: {}", path, e);
        })?;

        serde_json::from_value(value)
            .map_err(|e| MetaApiError::Parse(format!("{} response: {}", path, e)))
    }

    async fn list<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        fields: &str,
    ) -> Result<Vec<T>, MetaApiError> {
        let list: GraphList<T> = self.get(segments, fields).await?;
        Ok(list.data)
    }
}

/// Turn a raw Graph response into JSON, surfacing `{error: {...}}` bodies.
pub fn parse_graph_response(status: u16, body: &str) -> Result<Value, MetaApiError> {
    let ok = (200..300).contains(&status);
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) if !ok => {
            return Err(MetaApiError::Graph {
                code: i64::from(status),
                message: body.trim().to_string(),
            })
        }
        Err(e) => return Err(MetaApiError::Parse(e.to_string())),
    };

    if let Some(error) = value.get("error") {
        let code = error
            .get("code")
            .and_then(Value::as_i64)
            .unwrap_or(i64::from(status));
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error");
        return Err(MetaApiError::from_graph(code, message));
    }

    if !ok {
        return Err(MetaApiError::Graph {
            code: i64::from(status),
            message: format!("HTTP {}", status),
        });
    }

    Ok(value)
}

#[async_trait]
impl MetaDataSource for GraphClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Live
    }

    async fn me(&self) -> Result<MetaUser, MetaApiError> {
        self.get(&["me"], USER_FIELDS).await
    }

    async fn ad_accounts(&self) -> Result<Vec<MetaAdAccount>, MetaApiError> {
        self.list(&["me", "adaccounts"], AD_ACCOUNT_FIELDS).await
    }

    async fn campaigns(&self, ad_account_id: &str) -> Result<Vec<MetaCampaign>, MetaApiError> {
        self.list(&[ad_account_id, "campaigns"], CAMPAIGN_FIELDS)
            .await
    }

    async fn ad_sets(&self, campaign_id: &str) -> Result<Vec<MetaAdSet>, MetaApiError> {
        self.list(&[campaign_id, "adsets"], AD_SET_FIELDS).await
    }

    async fn ads(&self, campaign_id: &str) -> Result<Vec<MetaAd>, MetaApiError> {
        self.list(&[campaign_id, "ads"], AD_FIELDS).await
    }

    async fn leads(&self, form_id: &str) -> Result<Vec<MetaLead>, MetaApiError> {
        self.list(&[form_id, "leads"], LEAD_FIELDS).await
    }

    async fn lead_forms(&self, page_id: &str) -> Result<Vec<MetaLeadForm>, MetaApiError> {
        self.list(&[page_id, "leadgen_forms"], LEAD_FORM_FIELDS)
            .await
    }
}
