//! Contacts: people with tags and free-form custom fields.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, require, trimmed, validate_email, Collection, Record, Snapshot};
use crate::error::CrmError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// As entered.
    pub phone: String,
    /// Digits only, with a leading `+` kept when present.
    pub normalized_phone: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Contact {
    const KIND: &'static str = "Contact";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDraft {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, serde_json::Value>,
}

impl ContactDraft {
    fn validate(&self) -> Result<(), CrmError> {
        require("name", &self.name)?;
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            validate_email(email)?;
        }
        Ok(())
    }
}

/// Reduce a phone number to its dialable digits.
///
/// Example: "+1 (555) 010-2030" → "+15550102030"
pub fn normalize_phone(raw: &str) -> String {
    let raw = raw.trim();
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if raw.starts_with('+') && !digits.is_empty() {
        format!("+{}", digits)
    } else {
        digits
    }
}

fn clean_tags(tags: Vec<String>) -> BTreeSet<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

pub struct ContactStore {
    rows: Collection<Contact>,
}

impl ContactStore {
    pub fn new(seed: Vec<Contact>) -> Self {
        Self {
            rows: Collection::new(seed),
        }
    }

    pub fn snapshot(&self) -> Snapshot<Contact> {
        self.rows.snapshot()
    }

    pub fn get(&self, id: &str) -> Option<Contact> {
        self.rows.get(id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn create(&self, draft: ContactDraft) -> Result<(Contact, Snapshot<Contact>), CrmError> {
        draft.validate()?;
        let now = Utc::now();
        let contact = Contact {
            id: new_id("contact"),
            name: draft.name.trim().to_string(),
            email: trimmed(draft.email),
            normalized_phone: normalize_phone(&draft.phone),
            phone: draft.phone.trim().to_string(),
            tags: clean_tags(draft.tags),
            source: trimmed(draft.source),
            custom_fields: draft.custom_fields,
            created_at: now,
            updated_at: now,
        };
        let snapshot = self.rows.prepend(contact.clone());
        Ok((contact, snapshot))
    }

    pub fn update(&self, id: &str, draft: ContactDraft) -> Result<Snapshot<Contact>, CrmError> {
        draft.validate()?;
        self.rows.modify(id, |contact| {
            contact.name = draft.name.trim().to_string();
            contact.email = trimmed(draft.email);
            contact.normalized_phone = normalize_phone(&draft.phone);
            contact.phone = draft.phone.trim().to_string();
            contact.tags = clean_tags(draft.tags);
            contact.source = trimmed(draft.source);
            contact.custom_fields = draft.custom_fields;
            contact.updated_at = Utc::now();
        })
    }

    pub fn delete(&self, id: &str) -> Result<Snapshot<Contact>, CrmError> {
        self.rows.remove(id)
    }

    pub fn add_tag(&self, id: &str, tag: &str) -> Result<Snapshot<Contact>, CrmError> {
        require("tag", tag)?;
        let tag = tag.trim().to_string();
        self.rows.modify(id, |contact| {
            if contact.tags.insert(tag) {
                contact.updated_at = Utc::now();
            }
        })
    }

    pub fn remove_tag(&self, id: &str, tag: &str) -> Result<Snapshot<Contact>, CrmError> {
        self.rows.modify(id, |contact| {
            if contact.tags.remove(tag.trim()) {
                contact.updated_at = Utc::now();
            }
        })
    }

    /// Set a custom field; `Value::Null` removes it.
    pub fn set_custom_field(
        &self,
        id: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<Snapshot<Contact>, CrmError> {
        require("field name", key)?;
        let key = key.trim().to_string();
        self.rows.modify(id, |contact| {
            if value.is_null() {
                contact.custom_fields.remove(&key);
            } else {
                contact.custom_fields.insert(key, value);
            }
            contact.updated_at = Utc::now();
        })
    }

    pub fn with_tag(&self, tag: &str) -> Vec<Contact> {
        self.rows.filter(|c| c.tags.contains(tag))
    }

    /// Match on name, email, or phone digits.
    pub fn search(&self, query: &str) -> Vec<Contact> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.snapshot().to_vec();
        }
        let digits = normalize_phone(&needle);
        let digits = digits.trim_start_matches('+');
        self.rows.filter(|c| {
            c.name.to_lowercase().contains(&needle)
                || c
                    .email
                    .as_deref()
                    .is_some_and(|e| e.to_lowercase().contains(&needle))
                || (!digits.is_empty() && c.normalized_phone.contains(digits))
        })
    }
}
