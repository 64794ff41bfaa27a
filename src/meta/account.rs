//! Connected Meta ad account and the fetch methods that hang off it.
//!
//! Holds the connection state and the data source bound to its token.
//! Every fetch requires a usable connection; the data source decides
//! whether the answer comes from the Graph API or the demo fixtures.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use super::account_store;
use super::source::{select_source, MetaDataSource, SourceKind};
use super::types::{MetaAccount, MetaAd, MetaAdAccount, MetaAdSet, MetaCampaign, MetaLead, MetaLeadForm};
use super::{MetaApiError, MetaConfig};

#[derive(Default)]
struct Connection {
    account: MetaAccount,
    source: Option<Arc<dyn MetaDataSource>>,
}

pub struct MetaAccountService {
    config: MetaConfig,
    /// Where the connection is persisted; `None` keeps it in memory only.
    store_path: Option<PathBuf>,
    connection: RwLock<Connection>,
}

impl MetaAccountService {
    /// Create the service, restoring a persisted connection if one exists.
    pub fn new(config: MetaConfig, store_path: Option<PathBuf>) -> Self {
        let mut connection = Connection::default();

        if let Some(path) = store_path.as_deref() {
            match account_store::load_account(path) {
                Ok(Some(account)) => {
                    if let Some(token) = account.access_token.as_deref() {
                        connection.source = Some(select_source(token, &config));
                    }
                    log::info!(
                        "Meta: restored connection with {} ad account(s)",
                        account.ad_accounts.len()
                    );
                    connection.account = account;
                }
                Ok(None) => {}
                Err(e) => log::warn!("Meta: ignoring unreadable account state: {}", e),
            }
        }

        Self {
            config,
            store_path,
            connection: RwLock::new(connection),
        }
    }

    pub fn snapshot(&self) -> MetaAccount {
        self.connection.read().account.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.read().account.is_usable()
    }

    pub fn source_kind(&self) -> Option<SourceKind> {
        self.connection.read().source.as_ref().map(|s| s.kind())
    }

    /// Validate the token, load its ad accounts, and mark the account connected.
    pub async fn connect_account(&self, access_token: &str) -> Result<MetaAccount, MetaApiError> {
        let token = access_token.trim();
        if token.is_empty() {
            return Err(MetaApiError::MissingToken);
        }

        let source = select_source(token, &self.config);
        let user = source.me().await?;
        let ad_accounts = source.ad_accounts().await?;

        let account = MetaAccount {
            is_connected: true,
            access_token: Some(token.to_string()),
            user: Some(user),
            ad_accounts,
            last_synced: Some(Utc::now()),
        };

        self.bind(account.clone(), source);
        self.persist(&account);

        log::info!(
            "Meta: connected with {} ad account(s)",
            account.ad_accounts.len()
        );
        Ok(account)
    }

    /// Forget the connection and its persisted copy.
    pub fn disconnect_account(&self) -> Result<(), MetaApiError> {
        {
            let mut guard = self.connection.write();
            *guard = Connection::default();
        }
        if let Some(path) = self.store_path.as_deref() {
            account_store::delete_account(path)?;
        }
        log::info!("Meta: disconnected");
        Ok(())
    }

    pub async fn refresh_ad_accounts(&self) -> Result<Vec<MetaAdAccount>, MetaApiError> {
        let (token, source) = {
            let guard = self.connection.read();
            match (&guard.account.access_token, &guard.source) {
                (Some(token), Some(source)) if guard.account.is_usable() => {
                    (token.clone(), source.clone())
                }
                _ => return Err(MetaApiError::NotConnected),
            }
        };
        let ad_accounts = source.ad_accounts().await?;

        let account = {
            let mut guard = self.connection.write();
            // A disconnect or reconnect may have raced the fetch.
            if !guard.account.is_usable()
                || guard.account.access_token.as_deref() != Some(token.as_str())
            {
                log::info!("Meta: dropping ad account refresh for a replaced connection");
                return Err(MetaApiError::NotConnected);
            }
            guard.account.ad_accounts = ad_accounts.clone();
            guard.account.last_synced = Some(Utc::now());
            guard.account.clone()
        };
        self.persist(&account);

        Ok(ad_accounts)
    }

    pub async fn fetch_campaigns(&self, ad_account_id: &str) -> Result<Vec<MetaCampaign>, MetaApiError> {
        self.active_source()?.campaigns(ad_account_id).await
    }

    pub async fn fetch_ad_sets(&self, campaign_id: &str) -> Result<Vec<MetaAdSet>, MetaApiError> {
        self.active_source()?.ad_sets(campaign_id).await
    }

    pub async fn fetch_ads(&self, campaign_id: &str) -> Result<Vec<MetaAd>, MetaApiError> {
        self.active_source()?.ads(campaign_id).await
    }

    pub async fn fetch_leads(&self, form_id: &str) -> Result<Vec<MetaLead>, MetaApiError> {
        self.active_source()?.leads(form_id).await
    }

    pub async fn fetch_lead_forms(&self, page_id: &str) -> Result<Vec<MetaLeadForm>, MetaApiError> {
        self.active_source()?.lead_forms(page_id).await
    }

    /// Stamp `last_synced` after a successful lead sync.
    pub fn mark_synced(&self) {
        let account = {
            let mut guard = self.connection.write();
            if !guard.account.is_usable() {
                return;
            }
            guard.account.last_synced = Some(Utc::now());
            guard.account.clone()
        };
        self.persist(&account);
    }

    fn bind(&self, account: MetaAccount, source: Arc<dyn MetaDataSource>) {
        let mut guard = self.connection.write();
        guard.account = account;
        guard.source = Some(source);
    }

    fn active_source(&self) -> Result<Arc<dyn MetaDataSource>, MetaApiError> {
        let guard = self.connection.read();
        if !guard.account.is_usable() {
            return Err(MetaApiError::NotConnected);
        }
        guard.source.clone().ok_or(MetaApiError::NotConnected)
    }

    fn persist(&self, account: &MetaAccount) {
        if let Some(path) = self.store_path.as_deref() {
            if let Err(e) = account_store::save_account(path, account) {
                log::warn!("Meta: failed to persist account state: {}", e);
            }
        }
    }
}
