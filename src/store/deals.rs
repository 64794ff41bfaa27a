//! Deals and the Kanban stage board.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{new_id, require, trimmed, Collection, Record, Snapshot};
use crate::error::CrmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DealStage {
    #[default]
    Prospecting,
    Qualification,
    Proposal,
    Negotiation,
    #[serde(rename = "Closed Won")]
    ClosedWon,
    #[serde(rename = "Closed Lost")]
    ClosedLost,
}

impl DealStage {
    /// Board columns, left to right.
    pub const ALL: [DealStage; 6] = [
        DealStage::Prospecting,
        DealStage::Qualification,
        DealStage::Proposal,
        DealStage::Negotiation,
        DealStage::ClosedWon,
        DealStage::ClosedLost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DealStage::Prospecting => "Prospecting",
            DealStage::Qualification => "Qualification",
            DealStage::Proposal => "Proposal",
            DealStage::Negotiation => "Negotiation",
            DealStage::ClosedWon => "Closed Won",
            DealStage::ClosedLost => "Closed Lost",
        }
    }
}

impl fmt::Display for DealStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub account_id: Option<String>,
    /// Display copy of the account name, refreshed by `CrmStore::update_account`.
    #[serde(default)]
    pub account_name: Option<String>,
    pub stage: DealStage,
    pub value: f64,
    #[serde(default)]
    pub close_date: Option<NaiveDate>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

impl Record for Deal {
    const KIND: &'static str = "Deal";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealDraft {
    pub name: String,
    /// Owning account. Its name is resolved by `CrmStore`, never taken from the caller.
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub stage: Option<DealStage>,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub close_date: Option<NaiveDate>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

impl DealDraft {
    fn validate(&self) -> Result<(), CrmError> {
        require("deal name", &self.name)?;
        if self.value < 0.0 {
            return Err(CrmError::Validation("deal value cannot be negative".into()));
        }
        Ok(())
    }
}

/// Count and value of the deals in one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTotal {
    pub stage: DealStage,
    pub count: usize,
    pub value: f64,
}

pub struct DealStore {
    rows: Collection<Deal>,
}

impl DealStore {
    pub fn new(seed: Vec<Deal>) -> Self {
        Self {
            rows: Collection::new(seed),
        }
    }

    pub fn snapshot(&self) -> Snapshot<Deal> {
        self.rows.snapshot()
    }

    pub fn get(&self, id: &str) -> Option<Deal> {
        self.rows.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert a deal. `account_name` must already be resolved from `draft.account_id`.
    pub(super) fn create(
        &self,
        draft: DealDraft,
        account_name: Option<String>,
    ) -> Result<(Deal, Snapshot<Deal>), CrmError> {
        draft.validate()?;
        let deal = Deal {
            id: new_id("deal"),
            name: draft.name.trim().to_string(),
            account_id: trimmed(draft.account_id),
            account_name,
            stage: draft.stage.unwrap_or_default(),
            value: draft.value,
            close_date: draft.close_date,
            owner_id: trimmed(draft.owner_id),
        };
        let snapshot = self.rows.prepend(deal.clone());
        Ok((deal, snapshot))
    }

    /// Rewrite a deal. The account only changes when `draft.account_id` is set,
    /// and `account_name` must be the name resolved for it.
    pub(super) fn update(
        &self,
        id: &str,
        draft: DealDraft,
        account_name: Option<String>,
    ) -> Result<Snapshot<Deal>, CrmError> {
        draft.validate()?;
        self.rows.modify(id, |deal| {
            deal.name = draft.name.trim().to_string();
            if draft.account_id.is_some() {
                deal.account_id = trimmed(draft.account_id);
                deal.account_name = account_name;
            }
            if let Some(stage) = draft.stage {
                deal.stage = stage;
            }
            deal.value = draft.value;
            deal.close_date = draft.close_date;
            deal.owner_id = trimmed(draft.owner_id);
        })
    }

    pub fn delete(&self, id: &str) -> Result<Snapshot<Deal>, CrmError> {
        self.rows.remove(id)
    }

    /// Drop a deal into another board column.
    pub fn move_stage(&self, id: &str, stage: DealStage) -> Result<Snapshot<Deal>, CrmError> {
        self.rows.modify(id, |deal| deal.stage = stage)
    }

    pub fn by_stage(&self) -> Vec<(DealStage, Vec<Deal>)> {
        let snapshot = self.snapshot();
        DealStage::ALL
            .into_iter()
            .map(|stage| {
                let column = snapshot.iter().filter(|d| d.stage == stage).cloned().collect();
                (stage, column)
            })
            .collect()
    }

    pub fn stage_totals(&self) -> Vec<StageTotal> {
        self.by_stage()
            .into_iter()
            .map(|(stage, deals)| StageTotal {
                stage,
                count: deals.len(),
                value: deals.iter().map(|d| d.value).sum(),
            })
            .collect()
    }

    /// Rewrite the cached account name on every deal for `account_id`.
    pub fn refresh_account_name(&self, account_id: &str, name: &str) -> (usize, Snapshot<Deal>) {
        self.rows.modify_where(
            |deal| deal.account_id.as_deref() == Some(account_id),
            |deal| deal.account_name = Some(name.to_string()),
        )
    }
}
