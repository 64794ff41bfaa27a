//! Leads and the sales pipeline they move through.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, require, trimmed, validate_email, Collection, Record, Snapshot};
use crate::error::CrmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Proposal,
    Negotiation,
    #[serde(rename = "Closed-Won")]
    ClosedWon,
    Lost,
}

impl LeadStatus {
    /// Pipeline columns, left to right.
    pub const ALL: [LeadStatus; 7] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::Proposal,
        LeadStatus::Negotiation,
        LeadStatus::ClosedWon,
        LeadStatus::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::Contacted => "Contacted",
            LeadStatus::Qualified => "Qualified",
            LeadStatus::Proposal => "Proposal",
            LeadStatus::Negotiation => "Negotiation",
            LeadStatus::ClosedWon => "Closed-Won",
            LeadStatus::Lost => "Lost",
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, LeadStatus::ClosedWon | LeadStatus::Lost)
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CrmError::Validation(format!("unknown lead status: {}", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub status: LeadStatus,
    pub value: f64,
    pub score: u8,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub owner_avatar: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

impl Record for Lead {
    const KIND: &'static str = "Lead";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Fields captured by the lead create/edit form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDraft {
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub company: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub status: Option<LeadStatus>,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub score: Option<u8>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub owner_avatar: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LeadDraft {
    fn validate(&self) -> Result<(), CrmError> {
        require("first name", &self.first_name)?;
        require("email", &self.email)?;
        validate_email(&self.email)?;
        if self.value < 0.0 {
            return Err(CrmError::Validation("value cannot be negative".into()));
        }
        if self.score.is_some_and(|s| s > 100) {
            return Err(CrmError::Validation("score must be between 0 and 100".into()));
        }
        Ok(())
    }
}

/// Result of inserting an externally sourced lead.
#[derive(Debug, Clone)]
pub enum ImportOutcome {
    Created(Snapshot<Lead>),
    /// A lead with the same id is already present; nothing was written.
    Duplicate,
}

impl ImportOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, ImportOutcome::Duplicate)
    }
}

pub struct LeadStore {
    rows: Collection<Lead>,
}

impl LeadStore {
    pub fn new(seed: Vec<Lead>) -> Self {
        Self {
            rows: Collection::new(seed),
        }
    }

    pub fn snapshot(&self) -> Snapshot<Lead> {
        self.rows.snapshot()
    }

    pub fn get(&self, id: &str) -> Option<Lead> {
        self.rows.get(id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn create(&self, draft: LeadDraft) -> Result<(Lead, Snapshot<Lead>), CrmError> {
        draft.validate()?;
        let lead = Lead {
            id: new_id("lead"),
            first_name: draft.first_name.trim().to_string(),
            last_name: draft.last_name.trim().to_string(),
            company: draft.company.trim().to_string(),
            email: draft.email.trim().to_string(),
            phone: draft.phone.trim().to_string(),
            status: draft.status.unwrap_or_default(),
            value: draft.value,
            score: draft.score.unwrap_or(50),
            owner_id: trimmed(draft.owner_id),
            owner_name: trimmed(draft.owner_name),
            owner_avatar: trimmed(draft.owner_avatar),
            source: Some("Manual".to_string()),
            tags: Vec::new(),
            notes: trimmed(draft.notes),
            created_at: Utc::now(),
        };
        let snapshot = self.rows.prepend(lead.clone());
        Ok((lead, snapshot))
    }

    pub fn update(&self, id: &str, draft: LeadDraft) -> Result<Snapshot<Lead>, CrmError> {
        draft.validate()?;
        self.rows.modify(id, |lead| {
            lead.first_name = draft.first_name.trim().to_string();
            lead.last_name = draft.last_name.trim().to_string();
            lead.company = draft.company.trim().to_string();
            lead.email = draft.email.trim().to_string();
            lead.phone = draft.phone.trim().to_string();
            if let Some(status) = draft.status {
                lead.status = status;
            }
            lead.value = draft.value;
            if let Some(score) = draft.score {
                lead.score = score;
            }
            lead.owner_id = trimmed(draft.owner_id);
            lead.owner_name = trimmed(draft.owner_name);
            lead.owner_avatar = trimmed(draft.owner_avatar);
            lead.notes = trimmed(draft.notes);
        })
    }

    pub fn delete(&self, id: &str) -> Result<Snapshot<Lead>, CrmError> {
        self.rows.remove(id)
    }

    /// Move a lead to another pipeline column (drag and drop).
    pub fn set_status(&self, id: &str, status: LeadStatus) -> Result<Snapshot<Lead>, CrmError> {
        self.rows.modify(id, |lead| lead.status = status)
    }

    /// Insert a lead produced by an integration, keyed by its derived id.
    pub fn import(&self, lead: Lead) -> ImportOutcome {
        let id = lead.id.clone();
        match self.rows.prepend_if_absent(lead) {
            Some(snapshot) => ImportOutcome::Created(snapshot),
            None => {
                log::info!("Lead {} already imported, skipping", id);
                ImportOutcome::Duplicate
            }
        }
    }

    /// Case-insensitive match on name, company, or email.
    pub fn search(&self, query: &str) -> Vec<Lead> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.snapshot().to_vec();
        }
        self.rows.filter(|lead| {
            lead.full_name().to_lowercase().contains(&needle)
                || lead.company.to_lowercase().contains(&needle)
                || lead.email.to_lowercase().contains(&needle)
        })
    }

    /// Leads grouped into pipeline columns, in column order.
    pub fn by_status(&self) -> Vec<(LeadStatus, Vec<Lead>)> {
        let snapshot = self.snapshot();
        LeadStatus::ALL
            .into_iter()
            .map(|status| {
                let column = snapshot
                    .iter()
                    .filter(|lead| lead.status == status)
                    .cloned()
                    .collect();
                (status, column)
            })
            .collect()
    }

    /// Total value of leads still open in the pipeline.
    pub fn pipeline_value(&self) -> f64 {
        self.snapshot()
            .iter()
            .filter(|lead| lead.status.is_open())
            .map(|lead| lead.value)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(first: &str, email: &str) -> LeadDraft {
        LeadDraft {
            first_name: first.into(),
            last_name: "Stone".into(),
            company: "Quarry Co".into(),
            email: email.into(),
            value: 1_000.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_status_serializes_with_hyphen() {
        assert_eq!(
            serde_json::to_string(&LeadStatus::ClosedWon).unwrap(),
            "\"Closed-Won\""
        );
        assert_eq!("closed-won".parse::<LeadStatus>().unwrap(), LeadStatus::ClosedWon);
        assert!("Archived".parse::<LeadStatus>().is_err());
    }

    #[test]
    fn test_create_applies_defaults() {
        let store = LeadStore::new(Vec::new());
        let (lead, snapshot) = store.create(draft("Emma", "emma@quarry.co")).unwrap();
        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.score, 50);
        assert_eq!(snapshot[0].id, lead.id);
    }

    #[test]
    fn test_invalid_form_is_not_stored() {
        let store = LeadStore::new(Vec::new());
        assert!(matches!(
            store.create(draft("", "emma@quarry.co")),
            Err(CrmError::Validation(_))
        ));
        assert!(matches!(
            store.create(draft("Emma", "emma-at-quarry")),
            Err(CrmError::Validation(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_drag_drop_status_change() {
        let store = LeadStore::new(Vec::new());
        let (lead, _) = store.create(draft("Emma", "emma@quarry.co")).unwrap();
        store.set_status(&lead.id, LeadStatus::Negotiation).unwrap();

        let columns = store.by_status();
        let negotiation = columns
            .iter()
            .find(|(status, _)| *status == LeadStatus::Negotiation)
            .unwrap();
        assert_eq!(negotiation.1.len(), 1);
        assert_eq!(columns.len(), LeadStatus::ALL.len());
    }

    #[test]
    fn test_pipeline_value_excludes_closed() {
        let store = LeadStore::new(Vec::new());
        let (won, _) = store.create(draft("Won", "won@quarry.co")).unwrap();
        store.create(draft("Open", "open@quarry.co")).unwrap();
        store.set_status(&won.id, LeadStatus::ClosedWon).unwrap();
        assert_eq!(store.pipeline_value(), 1_000.0);
    }

    #[test]
    fn test_search_matches_company_case_insensitively() {
        let store = LeadStore::new(Vec::new());
        store.create(draft("Emma", "emma@quarry.co")).unwrap();
        assert_eq!(store.search("QUARRY").len(), 1);
        assert!(store.search("nomatch").is_empty());
    }
}
