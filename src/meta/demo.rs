//! Simulated Graph API responses for demo tokens.
//!
//! Output depends only on the ids passed in, so repeated calls return the
//! same objects. Every call sleeps for the configured delay first.

use std::time::Duration;

use async_trait::async_trait;

use super::source::{MetaDataSource, SourceKind};
use super::types::{
    MetaAd, MetaAdAccount, MetaAdSet, MetaCampaign, MetaFieldData, MetaLead, MetaLeadForm,
    MetaUser,
};
use super::MetaApiError;

const DEMO_CAMPAIGNS: &[(&str, &str, &str, &str)] = &[
    ("Spring Lead Generation", "ACTIVE", "OUTCOME_LEADS", "5000"),
    ("Product Launch Awareness", "ACTIVE", "OUTCOME_AWARENESS", "12000"),
    ("Retargeting - Website Visitors", "PAUSED", "OUTCOME_SALES", "3500"),
];

const DEMO_PEOPLE: &[(&str, &str, &str, &str)] = &[
    ("Sarah Johnson", "sarah.johnson@example.com", "+1 555 0101", "Brightline Media"),
    ("Michael Chen", "m.chen@example.com", "+1 555 0102", "Northwind Traders"),
    ("Emily Rodriguez", "emily.r@example.com", "+1 555 0103", "Vertex Labs"),
    ("David Kim", "dkim@example.com", "+1 555 0104", "Harbor Logistics"),
    ("Priya Patel", "priya.patel@example.com", "+1 555 0105", "Lumen Health"),
];

pub struct DemoDataSource {
    delay: Duration,
}

impl DemoDataSource {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
        }
    }

    async fn simulate_latency(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl MetaDataSource for DemoDataSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Demo
    }

    async fn me(&self) -> Result<MetaUser, MetaApiError> {
        self.simulate_latency().await;
        Ok(MetaUser {
            id: "demo_user_1".to_string(),
            name: Some("Demo User".to_string()),
        })
    }

    async fn ad_accounts(&self) -> Result<Vec<MetaAdAccount>, MetaApiError> {
        self.simulate_latency().await;
        Ok(vec![
            MetaAdAccount {
                id: "act_1000000001".to_string(),
                account_id: Some("1000000001".to_string()),
                name: Some("Demo Business Account".to_string()),
                account_status: Some(1),
                currency: Some("USD".to_string()),
            },
            MetaAdAccount {
                id: "act_1000000002".to_string(),
                account_id: Some("1000000002".to_string()),
                name: Some("Demo Agency Account".to_string()),
                account_status: Some(1),
                currency: Some("EUR".to_string()),
            },
        ])
    }

    async fn campaigns(&self, ad_account_id: &str) -> Result<Vec<MetaCampaign>, MetaApiError> {
        self.simulate_latency().await;
        Ok(DEMO_CAMPAIGNS
            .iter()
            .enumerate()
            .map(|(i, (name, status, objective, budget))| MetaCampaign {
                id: format!("{}_campaign_{}", ad_account_id, i + 1),
                name: Some(name.to_string()),
                status: Some(status.to_string()),
                objective: Some(objective.to_string()),
                daily_budget: Some(budget.to_string()),
                created_time: Some(format!("2024-0{}-01T09:00:00+0000", i + 1)),
            })
            .collect())
    }

    async fn ad_sets(&self, campaign_id: &str) -> Result<Vec<MetaAdSet>, MetaApiError> {
        self.simulate_latency().await;
        Ok((1..=2)
            .map(|n| MetaAdSet {
                id: format!("{}_adset_{}", campaign_id, n),
                name: Some(format!("Ad Set {}", n)),
                status: Some("ACTIVE".to_string()),
                campaign_id: Some(campaign_id.to_string()),
                daily_budget: Some("2500".to_string()),
                targeting: Some(serde_json::json!({
                    "age_min": 25,
                    "age_max": 55,
                    "geo_locations": {"countries": ["US"]}
                })),
            })
            .collect())
    }

    async fn ads(&self, campaign_id: &str) -> Result<Vec<MetaAd>, MetaApiError> {
        self.simulate_latency().await;
        Ok((1..=3)
            .map(|n| MetaAd {
                id: format!("{}_ad_{}", campaign_id, n),
                name: Some(format!("Creative Variant {}", n)),
                status: Some(if n == 3 { "PAUSED" } else { "ACTIVE" }.to_string()),
                adset_id: Some(format!("{}_adset_{}", campaign_id, (n + 1) / 2)),
                campaign_id: Some(campaign_id.to_string()),
                creative: None,
            })
            .collect())
    }

    async fn leads(&self, form_id: &str) -> Result<Vec<MetaLead>, MetaApiError> {
        self.simulate_latency().await;
        Ok(DEMO_PEOPLE
            .iter()
            .enumerate()
            .map(|(i, (name, email, phone, company))| MetaLead {
                id: format!("{}_lead_{}", form_id, i + 1),
                created_time: Some(format!("2024-06-{:02}T14:30:00+0000", i + 1)),
                ad_id: Some("demo_ad_1".to_string()),
                ad_name: Some("Creative Variant 1".to_string()),
                campaign_id: Some("demo_campaign_1".to_string()),
                campaign_name: Some(DEMO_CAMPAIGNS[0].0.to_string()),
                form_id: Some(form_id.to_string()),
                field_data: vec![
                    MetaFieldData::new("full_name", name),
                    MetaFieldData::new("email", email),
                    MetaFieldData::new("phone_number", phone),
                    MetaFieldData::new("company_name", company),
                ],
            })
            .collect())
    }

    async fn lead_forms(&self, page_id: &str) -> Result<Vec<MetaLeadForm>, MetaApiError> {
        self.simulate_latency().await;
        Ok(vec![
            MetaLeadForm {
                id: format!("{}_form_1", page_id),
                name: Some("Free Consultation Request".to_string()),
                status: Some("ACTIVE".to_string()),
                leads_count: Some(DEMO_PEOPLE.len() as u64),
                created_time: Some("2024-03-15T12:00:00+0000".to_string()),
            },
            MetaLeadForm {
                id: format!("{}_form_2", page_id),
                name: Some("Newsletter Signup".to_string()),
                status: Some("ARCHIVED".to_string()),
                leads_count: Some(0),
                created_time: Some("2023-11-02T08:00:00+0000".to_string()),
            },
        ])
    }
}
