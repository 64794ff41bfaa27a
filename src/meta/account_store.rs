//! Meta connection persistence.
//!
//! The connected account (including its access token) is written to
//! ~/.crmdesk/meta_account.json with owner-only permissions. Only connected
//! state is ever written; disconnecting removes the file.

use std::path::{Path, PathBuf};

use super::types::MetaAccount;
use super::MetaApiError;

const ACCOUNT_FILE: &str = "meta_account.json";

/// Default location of the persisted connection.
pub fn default_account_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".crmdesk").join(ACCOUNT_FILE))
}

/// Load a persisted connection. Missing or disconnected state yields `None`.
pub fn load_account(path: &Path) -> Result<Option<MetaAccount>, MetaApiError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let account: MetaAccount = serde_json::from_str(&content)?;
    Ok(account.is_usable().then_some(account))
}

/// Persist a connected account, replacing any previous file atomically.
pub fn save_account(path: &Path, account: &MetaAccount) -> Result<(), MetaApiError> {
    if !account.is_usable() {
        return delete_account(path);
    }

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
            }
        }
    }

    let content = serde_json::to_string_pretty(account)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Remove the persisted connection if present.
pub fn delete_account(path: &Path) -> Result<(), MetaApiError> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> MetaAccount {
        MetaAccount {
            is_connected: true,
            access_token: Some("demo_persist".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(ACCOUNT_FILE);

        save_account(&path, &connected()).unwrap();
        let loaded = load_account(&path).unwrap().unwrap();
        assert_eq!(loaded.access_token.as_deref(), Some("demo_persist"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_saving_disconnected_state_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ACCOUNT_FILE);
        save_account(&path, &connected()).unwrap();

        save_account(&path, &MetaAccount::default()).unwrap();
        assert!(!path.exists());
        assert!(load_account(&path).unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ACCOUNT_FILE);
        save_account(&path, &connected()).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
