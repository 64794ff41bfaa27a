//! In-memory CRM entity stores.
//!
//! Each store owns an `Arc<Vec<T>>` snapshot behind a lock. Mutations build
//! a new vector and swap it in, so a snapshot handed out earlier never
//! changes underneath its holder. Nothing here is persisted.

pub mod accounts;
pub mod contacts;
pub mod deals;
pub mod leads;
pub mod seed;
pub mod tasks;

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use regex::Regex;

use crate::error::CrmError;

pub use accounts::{Account, AccountDraft, AccountStore};
pub use contacts::{Contact, ContactDraft, ContactStore};
pub use deals::{Deal, DealDraft, DealStage, DealStore};
pub use leads::{ImportOutcome, Lead, LeadDraft, LeadStatus, LeadStore};
pub use tasks::{RelatedKind, RelatedTo, Task, TaskDraft, TaskPriority, TaskStatus, TaskStore};

/// Immutable view of a collection at one point in time.
pub type Snapshot<T> = Arc<Vec<T>>;

/// A row addressable by a string id.
pub trait Record: Clone + Send + Sync + 'static {
    const KIND: &'static str;

    fn id(&self) -> &str;
}

/// Copy-on-write vector of records. Newest rows sit at the front.
pub struct Collection<T: Record> {
    rows: RwLock<Snapshot<T>>,
}

impl<T: Record> Collection<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self {
            rows: RwLock::new(Arc::new(rows)),
        }
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.rows.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.rows.read().iter().find(|r| r.id() == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.read().iter().any(|r| r.id() == id)
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    pub fn filter(&self, mut pred: impl FnMut(&T) -> bool) -> Vec<T> {
        self.rows.read().iter().filter(|r| pred(*r)).cloned().collect()
    }

    pub fn prepend(&self, row: T) -> Snapshot<T> {
        let mut guard = self.rows.write();
        let mut rows = Vec::with_capacity(guard.len() + 1);
        rows.push(row);
        rows.extend(guard.iter().cloned());
        commit(&mut guard, rows)
    }

    /// Prepend unless a row with the same id exists. Check and insert happen
    /// under one write lock.
    pub fn prepend_if_absent(&self, row: T) -> Option<Snapshot<T>> {
        let mut guard = self.rows.write();
        if guard.iter().any(|r| r.id() == row.id()) {
            return None;
        }
        let mut rows = Vec::with_capacity(guard.len() + 1);
        rows.push(row);
        rows.extend(guard.iter().cloned());
        Some(commit(&mut guard, rows))
    }

    pub fn modify(&self, id: &str, f: impl FnOnce(&mut T)) -> Result<Snapshot<T>, CrmError> {
        let mut guard = self.rows.write();
        let index = guard
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| CrmError::not_found(T::KIND, id))?;
        let mut rows: Vec<T> = guard.iter().cloned().collect();
        f(&mut rows[index]);
        Ok(commit(&mut guard, rows))
    }

    /// Apply `f` to every matching row. Returns the count touched and the
    /// resulting snapshot.
    pub fn modify_where(
        &self,
        mut pred: impl FnMut(&T) -> bool,
        mut f: impl FnMut(&mut T),
    ) -> (usize, Snapshot<T>) {
        let mut guard = self.rows.write();
        if !guard.iter().any(|r| pred(r)) {
            return (0, guard.clone());
        }
        let mut touched = 0;
        let mut rows: Vec<T> = guard.iter().cloned().collect();
        for row in rows.iter_mut() {
            if pred(&*row) {
                f(row);
                touched += 1;
            }
        }
        (touched, commit(&mut guard, rows))
    }

    pub fn remove(&self, id: &str) -> Result<Snapshot<T>, CrmError> {
        let mut guard = self.rows.write();
        if !guard.iter().any(|r| r.id() == id) {
            return Err(CrmError::not_found(T::KIND, id));
        }
        let rows = guard.iter().filter(|r| r.id() != id).cloned().collect();
        Ok(commit(&mut guard, rows))
    }
}

fn commit<T>(slot: &mut Snapshot<T>, rows: Vec<T>) -> Snapshot<T> {
    *slot = Arc::new(rows);
    slot.clone()
}

/// All entity stores backing one CRM session.
pub struct CrmStore {
    pub leads: LeadStore,
    pub contacts: ContactStore,
    pub accounts: AccountStore,
    pub deals: DealStore,
    pub tasks: TaskStore,
}

impl CrmStore {
    pub fn empty() -> Self {
        Self {
            leads: LeadStore::new(Vec::new()),
            contacts: ContactStore::new(Vec::new()),
            accounts: AccountStore::new(Vec::new()),
            deals: DealStore::new(Vec::new()),
            tasks: TaskStore::new(Vec::new()),
        }
    }

    /// Stores pre-filled with the demo fixtures.
    pub fn seeded() -> Self {
        Self {
            leads: LeadStore::new(seed::leads()),
            contacts: ContactStore::new(seed::contacts()),
            accounts: AccountStore::new(seed::accounts()),
            deals: DealStore::new(seed::deals()),
            tasks: TaskStore::new(seed::tasks()),
        }
    }

    /// Create a deal, caching the owning account's name on it.
    pub fn create_deal(&self, draft: DealDraft) -> Result<(Deal, Snapshot<Deal>), CrmError> {
        let account_name = self.account_name_for(draft.account_id.as_deref())?;
        self.deals.create(draft, account_name)
    }

    /// Update a deal. Moving it to another account re-resolves the cached name.
    pub fn update_deal(&self, id: &str, draft: DealDraft) -> Result<Snapshot<Deal>, CrmError> {
        let account_name = self.account_name_for(draft.account_id.as_deref())?;
        self.deals.update(id, draft, account_name)
    }

    fn account_name_for(&self, account_id: Option<&str>) -> Result<Option<String>, CrmError> {
        match account_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => self
                .accounts
                .get(id)
                .map(|account| Some(account.name))
                .ok_or_else(|| CrmError::not_found(Account::KIND, id)),
            None => Ok(None),
        }
    }

    /// Update an account and refresh the name cached on its deals.
    pub fn update_account(&self, id: &str, draft: AccountDraft) -> Result<Snapshot<Account>, CrmError> {
        let snapshot = self.accounts.update(id, draft)?;
        if let Some(account) = snapshot.iter().find(|a| a.id == id) {
            let (touched, _) = self.deals.refresh_account_name(id, &account.name);
            if touched > 0 {
                log::debug!("Refreshed account name on {} deal(s)", touched);
            }
        }
        Ok(snapshot)
    }
}

// ---------------------------------------------------------------------------
// Form validation
// ---------------------------------------------------------------------------

pub(crate) fn require(field: &str, value: &str) -> Result<(), CrmError> {
    if value.trim().is_empty() {
        return Err(CrmError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

pub(crate) fn validate_email(email: &str) -> Result<(), CrmError> {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL_RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
    if !re.is_match(email.trim()) {
        return Err(CrmError::Validation(format!("invalid email address: {}", email)));
    }
    Ok(())
}

pub(crate) fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

pub(crate) fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: String,
        n: u32,
    }

    impl Record for Row {
        const KIND: &'static str = "Row";

        fn id(&self) -> &str {
            &self.id
        }
    }

    fn row(id: &str, n: u32) -> Row {
        Row { id: id.into(), n }
    }

    #[test]
    fn test_earlier_snapshot_is_unaffected_by_mutation() {
        let rows = Collection::new(vec![row("a", 1)]);
        let before = rows.snapshot();

        rows.modify("a", |r| r.n = 2).unwrap();
        rows.prepend(row("b", 3));

        assert_eq!(before.len(), 1);
        assert_eq!(before[0].n, 1);
        let after = rows.snapshot();
        assert_eq!(after[0].id, "b");
        assert_eq!(after[1].n, 2);
    }

    #[test]
    fn test_missing_id_is_not_found() {
        let rows: Collection<Row> = Collection::new(Vec::new());
        let err = rows.remove("nope").unwrap_err();
        assert_eq!(err.to_string(), "Row not found: nope");
    }

    #[test]
    fn test_prepend_if_absent_rejects_duplicates() {
        let rows = Collection::new(vec![row("a", 1)]);
        assert!(rows.prepend_if_absent(row("a", 9)).is_none());
        assert_eq!(rows.get("a").unwrap().n, 1);
        assert!(rows.prepend_if_absent(row("b", 2)).is_some());
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_modify_where_counts_rows() {
        let rows = Collection::new(vec![row("a", 1), row("b", 1), row("c", 2)]);
        let (touched, snapshot) = rows.modify_where(|r| r.n == 1, |r| r.n = 5);
        assert_eq!(touched, 2);
        assert_eq!(snapshot.iter().filter(|r| r.n == 5).count(), 2);
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("jane@acme.io").is_ok());
        assert!(validate_email("jane@acme").is_err());
        assert!(validate_email("not an email").is_err());
    }

    #[test]
    fn test_create_deal_caches_account_name_and_rename_refreshes_it() {
        let store = CrmStore::empty();
        let (account, _) = store
            .accounts
            .create(AccountDraft {
                name: "Acme Corp".into(),
                ..Default::default()
            })
            .unwrap();
        let (deal, _) = store
            .create_deal(DealDraft {
                name: "Acme renewal".into(),
                account_id: Some(account.id.clone()),
                value: 12_000.0,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(deal.account_name.as_deref(), Some("Acme Corp"));

        store
            .update_account(
                &account.id,
                AccountDraft {
                    name: "Acme Holdings".into(),
                    ..Default::default()
                },
            )
            .unwrap();
        let refreshed = store.deals.get(&deal.id).unwrap();
        assert_eq!(refreshed.account_name.as_deref(), Some("Acme Holdings"));
    }

    #[test]
    fn test_reassigning_a_deal_resolves_the_new_account_name() {
        let store = CrmStore::empty();
        let account = |name: &str| {
            store
                .accounts
                .create(AccountDraft {
                    name: name.into(),
                    ..Default::default()
                })
                .unwrap()
                .0
        };
        let acme = account("Acme Corp");
        let globex = account("Globex");
        let (deal, _) = store
            .create_deal(DealDraft {
                name: "Pilot".into(),
                account_id: Some(acme.id.clone()),
                ..Default::default()
            })
            .unwrap();

        store
            .update_deal(
                &deal.id,
                DealDraft {
                    name: "Pilot".into(),
                    account_id: Some(globex.id.clone()),
                    ..Default::default()
                },
            )
            .unwrap();
        let moved = store.deals.get(&deal.id).unwrap();
        assert_eq!(moved.account_id.as_deref(), Some(globex.id.as_str()));
        assert_eq!(moved.account_name.as_deref(), Some("Globex"));

        let err = store
            .update_deal(
                &deal.id,
                DealDraft {
                    name: "Pilot".into(),
                    account_id: Some("ghost".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, CrmError::NotFound { kind: "Account", .. }));
        let unchanged = store.deals.get(&deal.id).unwrap();
        assert_eq!(unchanged.account_name.as_deref(), Some("Globex"));
    }

    #[test]
    fn test_create_deal_with_unknown_account_fails() {
        let store = CrmStore::empty();
        let err = store
            .create_deal(DealDraft {
                name: "Orphan".into(),
                account_id: Some("missing".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, CrmError::NotFound { kind: "Account", .. }));
        assert!(store.deals.is_empty());
    }
}
