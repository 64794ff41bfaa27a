//! Background Meta lead sync.
//!
//! Pulls leads from the configured page's lead forms so leads missed by the
//! webhook (endpoint down, subscription not yet verified) still reach the
//! CRM. Imports go through the same derived ids as the webhook, so a lead
//! seen by both paths is stored once.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::account::MetaAccountService;
use super::webhook::transform_lead_data;
use super::MetaApiError;
use crate::state::AppState;
use crate::store::{ImportOutcome, LeadStore};

pub const SYNC_TAGS: [&str; 2] = ["Meta Ad", "Ads Sync"];

const ARCHIVED_STATUS: &str = "ARCHIVED";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub forms: usize,
    pub imported: usize,
    pub duplicates: usize,
}

pub async fn run_meta_poller(state: Arc<AppState>) {
    tokio::time::sleep(Duration::from_secs(30)).await;

    loop {
        let (enabled, page_id, poll_interval) = {
            let config = state.config.read();
            (
                config.meta.enabled,
                config.meta.page_id.clone(),
                config.meta.poll_interval_minutes,
            )
        };

        let page_id = match page_id {
            Some(id) if enabled && state.meta.is_connected() => id,
            _ => {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(300)) => {},
                    _ = state.meta_poller_wake.notified() => {
                        log::info!("Meta poller: woken by sync signal (disabled path)");
                    },
                }
                continue;
            }
        };

        log::info!("Meta poller: syncing lead forms for page {}", page_id);
        match sync_page_leads(&state.meta, &state.store.leads, &page_id).await {
            Ok(report) => log::info!(
                "Meta poller: {} form(s), {} new lead(s), {} already imported",
                report.forms,
                report.imported,
                report.duplicates
            ),
            Err(e) => log::warn!("Meta poller: sync failed: {}", e),
        }

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(u64::from(poll_interval.max(1)) * 60)) => {},
            _ = state.meta_poller_wake.notified() => {
                log::info!("Meta poller: woken by manual sync signal");
            },
        }
    }
}

/// Import every lead from the page's non-archived lead forms.
pub async fn sync_page_leads(
    meta: &MetaAccountService,
    leads: &LeadStore,
    page_id: &str,
) -> Result<SyncReport, MetaApiError> {
    let forms = meta.fetch_lead_forms(page_id).await?;
    let mut report = SyncReport::default();

    for form in forms
        .iter()
        .filter(|f| f.status.as_deref() != Some(ARCHIVED_STATUS))
    {
        report.forms += 1;
        for meta_lead in meta.fetch_leads(&form.id).await? {
            let mut lead = transform_lead_data(&meta_lead, meta_lead.campaign_id.as_deref());
            lead.tags = SYNC_TAGS.iter().map(|t| t.to_string()).collect();
            match leads.import(lead) {
                ImportOutcome::Created(_) => report.imported += 1,
                ImportOutcome::Duplicate => report.duplicates += 1,
            }
        }
    }

    meta.mark_synced();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::MetaConfig;

    fn service() -> MetaAccountService {
        MetaAccountService::new(
            MetaConfig {
                demo_delay_ms: 0,
                ..Default::default()
            },
            None,
        )
    }

    #[tokio::test]
    async fn test_sync_requires_connection() {
        let leads = LeadStore::new(Vec::new());
        let err = sync_page_leads(&service(), &leads, "page_1").await.unwrap_err();
        assert!(matches!(err, MetaApiError::NotConnected));
    }

    #[tokio::test]
    async fn test_demo_sync_imports_once() {
        let meta = service();
        meta.connect_account("demo_sync").await.unwrap();
        let leads = LeadStore::new(Vec::new());

        let first = sync_page_leads(&meta, &leads, "page_1").await.unwrap();
        assert_eq!(
            first,
            SyncReport {
                forms: 1,
                imported: 5,
                duplicates: 0
            }
        );

        let second = sync_page_leads(&meta, &leads, "page_1").await.unwrap();
        assert_eq!(second.imported, 0);
        assert_eq!(second.duplicates, 5);
        assert_eq!(leads.len(), 5);

        let lead = leads.get("imported_page_1_form_1_lead_1").unwrap();
        assert_eq!(lead.first_name, "Sarah");
        assert_eq!(lead.company, "Brightline Media");
        assert_eq!(lead.tags, vec!["Meta Ad", "Ads Sync"]);
        assert_eq!(lead.source.as_deref(), Some("Meta Ad - Campaign demo_campaign_1"));
    }
}
