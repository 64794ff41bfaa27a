//! The data-source seam between the account service and the Graph API.
//!
//! The demo/live decision is made once, here, when a token is bound.
//! Callers never inspect the token prefix themselves.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::client::GraphClient;
use super::demo::DemoDataSource;
use super::types::{MetaAd, MetaAdAccount, MetaAdSet, MetaCampaign, MetaLead, MetaLeadForm, MetaUser};
use super::{MetaApiError, MetaConfig, DEMO_TOKEN_PREFIX};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Live,
    Demo,
}

/// Read access to the objects behind one access token.
#[async_trait]
pub trait MetaDataSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn me(&self) -> Result<MetaUser, MetaApiError>;

    async fn ad_accounts(&self) -> Result<Vec<MetaAdAccount>, MetaApiError>;

    async fn campaigns(&self, ad_account_id: &str) -> Result<Vec<MetaCampaign>, MetaApiError>;

    async fn ad_sets(&self, campaign_id: &str) -> Result<Vec<MetaAdSet>, MetaApiError>;

    async fn ads(&self, campaign_id: &str) -> Result<Vec<MetaAd>, MetaApiError>;

    async fn leads(&self, form_id: &str) -> Result<Vec<MetaLead>, MetaApiError>;

    async fn lead_forms(&self, page_id: &str) -> Result<Vec<MetaLeadForm>, MetaApiError>;
}

pub fn is_demo_token(token: &str) -> bool {
    token.starts_with(DEMO_TOKEN_PREFIX)
}

/// Pick the data source for a token.
pub fn select_source(access_token: &str, config: &MetaConfig) -> Arc<dyn MetaDataSource> {
    if is_demo_token(access_token) {
        log::info!("Meta: demo token detected, using simulated data source");
        Arc::new(DemoDataSource::new(config.demo_delay_ms))
    } else {
        Arc::new(GraphClient::new(access_token, &config.graph_version))
    }
}
