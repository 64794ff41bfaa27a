use serde::{Deserialize, Serialize};

use super::{new_id, require, trimmed, Collection, Record, Snapshot};
use crate::error::CrmError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

impl Record for Account {
    const KIND: &'static str = "Account";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDraft {
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

pub struct AccountStore {
    rows: Collection<Account>,
}

impl AccountStore {
    pub fn new(seed: Vec<Account>) -> Self {
        Self {
            rows: Collection::new(seed),
        }
    }

    pub fn snapshot(&self) -> Snapshot<Account> {
        self.rows.snapshot()
    }

    pub fn get(&self, id: &str) -> Option<Account> {
        self.rows.get(id)
    }

    pub fn create(&self, draft: AccountDraft) -> Result<(Account, Snapshot<Account>), CrmError> {
        require("account name", &draft.name)?;
        let account = Account {
            id: new_id("account"),
            name: draft.name.trim().to_string(),
            industry: trimmed(draft.industry),
            phone: trimmed(draft.phone),
            website: trimmed(draft.website),
            owner_id: trimmed(draft.owner_id),
        };
        let snapshot = self.rows.prepend(account.clone());
        Ok((account, snapshot))
    }

    pub fn update(&self, id: &str, draft: AccountDraft) -> Result<Snapshot<Account>, CrmError> {
        require("account name", &draft.name)?;
        self.rows.modify(id, |account| {
            account.name = draft.name.trim().to_string();
            account.industry = trimmed(draft.industry);
            account.phone = trimmed(draft.phone);
            account.website = trimmed(draft.website);
            account.owner_id = trimmed(draft.owner_id);
        })
    }

    pub fn delete(&self, id: &str) -> Result<Snapshot<Account>, CrmError> {
        self.rows.remove(id)
    }

    pub fn search(&self, query: &str) -> Vec<Account> {
        let needle = query.trim().to_lowercase();
        self.rows.filter(|a| {
            a.name.to_lowercase().contains(&needle)
                || a
                    .industry
                    .as_deref()
                    .is_some_and(|i| i.to_lowercase().contains(&needle))
        })
    }
}
