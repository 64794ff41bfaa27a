use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Notify;

use crate::api::CrmApi;
use crate::error::CrmError;
use crate::meta::account::MetaAccountService;
use crate::meta::account_store;
use crate::meta::webhook::MetaWebhookHandler;
use crate::store::CrmStore;
use crate::types::Config;

/// Shared state for the server and the background poller.
pub struct AppState {
    pub config: RwLock<Config>,
    pub store: Arc<CrmStore>,
    pub meta: Arc<MetaAccountService>,
    pub webhook: Arc<MetaWebhookHandler>,
    pub api: CrmApi,
    /// Wakes the Meta poller for an immediate sync.
    pub meta_poller_wake: Notify,
    /// File that config updates are written back to; `None` keeps them in memory.
    config_file: Option<PathBuf>,
}

impl AppState {
    /// Build state from an already-resolved config.
    pub fn new(config: Config, meta_account_path: Option<PathBuf>) -> Result<Self, CrmError> {
        let store = Arc::new(if config.seed_demo_data {
            CrmStore::seeded()
        } else {
            CrmStore::empty()
        });

        if config.meta.verify_token.is_none() {
            log::warn!("No Meta verify token configured; webhook subscriptions will be refused");
        }

        let meta = Arc::new(MetaAccountService::new(config.meta.clone(), meta_account_path));
        let webhook = Arc::new(MetaWebhookHandler::new(
            config.meta.verify_token.clone(),
            store.clone(),
        ));
        let api = CrmApi::new(&config.api)?;

        Ok(Self {
            config: RwLock::new(config),
            store,
            meta,
            webhook,
            api,
            meta_poller_wake: Notify::new(),
            config_file: None,
        })
    }

    pub fn with_config_file(mut self, path: PathBuf) -> Self {
        self.config_file = Some(path);
        self
    }

    /// Load config from disk and the environment, then build state.
    pub fn load() -> Result<Self, CrmError> {
        let mut config = load_config().unwrap_or_else(|e| {
            log::warn!("Using default config: {}", e);
            Config::default()
        });
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        let state = Self::new(config, account_store::default_account_path())?;
        Ok(match config_path() {
            Ok(path) => state.with_config_file(path),
            Err(e) => {
                log::warn!("Config changes will not be saved: {}", e);
                state
            }
        })
    }
}

/// ~/.crmdesk/config.json
pub fn config_path() -> Result<PathBuf, CrmError> {
    let home = dirs::home_dir()
        .ok_or_else(|| CrmError::Configuration("Could not find home directory".to_string()))?;
    Ok(home.join(".crmdesk").join("config.json"))
}

/// Read the config file. A missing file yields the defaults.
pub fn load_config() -> Result<Config, CrmError> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config, CrmError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| CrmError::Configuration(format!("Failed to parse {}: {}", path.display(), e)))
}

pub fn save_config_to(path: &Path, config: &Config) -> Result<(), CrmError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

/// Environment variables win over the file.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(bind) = set("CRMDESK_BIND") {
        config.bind_addr = bind;
    }
    if let Some(token) = set("CRMDESK_VERIFY_TOKEN") {
        config.meta.verify_token = Some(token);
    }
    if let Some(url) = set("CRMDESK_API_URL") {
        config.api.base_url = url;
    }
    if let Some(token) = set("CRMDESK_API_TOKEN") {
        config.api.token = Some(token);
    }
}

/// Apply `mutator` to the config file, if the state has one, and then to
/// the in-memory copy. A failed write leaves memory untouched.
///
/// The file is rewritten from its own contents, so environment overrides
/// held in memory are never persisted.
pub fn create_or_update_config(
    state: &AppState,
    mutator: impl Fn(&mut Config),
) -> Result<Config, CrmError> {
    if let Some(path) = state.config_file.as_deref() {
        let mut on_disk = load_config_from(path)?;
        mutator(&mut on_disk);
        save_config_to(path, &on_disk)?;
    }

    let mut guard = state.config.write();
    mutator(&mut *guard);
    Ok(guard.clone())
}
