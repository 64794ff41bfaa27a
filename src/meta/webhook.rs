//! Meta lead-generation webhook: subscription handshake and lead import.
//!
//! Meta first verifies the endpoint with a GET carrying `hub.mode`,
//! `hub.verify_token`, and `hub.challenge`. After that it POSTs
//! `{object: "page", entry: [{changes: [{field: "leadgen", value}]}]}`
//! for every form submission.
//!
//! A delivery is processed change by change and stops at the first failure.
//! Changes handled before the failure stay imported and the whole delivery
//! is reported as failed, so Meta's redelivery relies on the lead store
//! skipping ids it has already seen.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{MetaFieldData, MetaLead};
use crate::store::{CrmStore, ImportOutcome, Lead, LeadStatus};

const SUBSCRIBE_MODE: &str = "subscribe";
const LEADGEN_FIELD: &str = "leadgen";
const PAGE_OBJECT: &str = "page";

pub const WEBHOOK_TAGS: [&str; 2] = ["Meta Ad", "Webhook"];

/// Field names mapped onto lead columns; anything else lands in notes.
const MAPPED_FIELDS: &[&str] = &[
    "full_name",
    "first_name",
    "last_name",
    "email",
    "phone_number",
    "phone",
    "company_name",
    "company",
];

// ============================================================================
// Verification handshake
// ============================================================================

/// Query string of the subscription GET.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode", default)]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token", default)]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge", default)]
    pub challenge: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerificationFailure {
    #[error("Missing parameters")]
    MissingParameters,
    #[error("Verification failed")]
    VerificationFailed,
}

/// Check a subscription request. Returns the challenge to echo on success.
///
/// `expected_token` of `None` means no secret is configured, and every
/// request with parameters fails verification.
pub fn verify_webhook_challenge(
    query: &VerifyQuery,
    expected_token: Option<&str>,
) -> Result<String, VerificationFailure> {
    let (Some(mode), Some(token)) = (query.mode.as_deref(), query.verify_token.as_deref()) else {
        log::warn!("Meta webhook verification: missing parameters");
        return Err(VerificationFailure::MissingParameters);
    };

    match expected_token {
        Some(expected) if mode == SUBSCRIBE_MODE && token == expected => {
            log::info!("Meta webhook verified");
            Ok(query.challenge.clone().unwrap_or_default())
        }
        None => {
            log::warn!("Meta webhook verification: no verify token configured");
            Err(VerificationFailure::VerificationFailed)
        }
        Some(_) => {
            log::warn!("Meta webhook verification failed (mode={})", mode);
            Err(VerificationFailure::VerificationFailed)
        }
    }
}

// ============================================================================
// Notification payload
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WebhookEntry {
    #[serde(default, deserialize_with = "opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: Value,
}

/// `value` of a `leadgen` change.
#[derive(Debug, Clone, Deserialize)]
pub struct LeadgenValue {
    #[serde(deserialize_with = "id")]
    pub leadgen_id: String,
    #[serde(default, deserialize_with = "opt_id")]
    pub form_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub campaign_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub ad_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub page_id: Option<String>,
    #[serde(default)]
    pub created_time: Option<i64>,
}

/// Graph ids arrive as strings, but Meta's test tool sends numbers.
fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected an id, got {}", other))),
    }
}

fn opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(de::Error::custom(format!("expected an id, got {}", other))),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Unsupported webhook object: {0}")]
    UnsupportedObject(String),
    #[error("Malformed leadgen change in entry {entry}: {reason}")]
    MalformedChange { entry: usize, reason: String },
    #[error("Lead {lead_id} rejected: {reason}")]
    LeadRejected { lead_id: String, reason: String },
}

/// What one delivery did to the lead store.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookOutcome {
    /// Ids of leads created by this delivery.
    pub imported: Vec<String>,
    /// Ids that were already present and left untouched.
    pub duplicates: Vec<String>,
    /// Changes for fields other than `leadgen`.
    pub skipped_changes: usize,
}

// ============================================================================
// Handler
// ============================================================================

pub struct MetaWebhookHandler {
    verify_token: Option<String>,
    store: Arc<CrmStore>,
}

impl MetaWebhookHandler {
    pub fn new(verify_token: Option<String>, store: Arc<CrmStore>) -> Self {
        Self {
            verify_token: verify_token.filter(|t| !t.is_empty()),
            store,
        }
    }

    pub fn verify(&self, query: &VerifyQuery) -> Result<String, VerificationFailure> {
        verify_webhook_challenge(query, self.verify_token.as_deref())
    }

    /// Process every `leadgen` change in a delivery, stopping at the first
    /// failure.
    pub fn handle_webhook(&self, payload: &WebhookPayload) -> Result<WebhookOutcome, WebhookError> {
        if payload.object != PAGE_OBJECT {
            return Err(WebhookError::UnsupportedObject(payload.object.clone()));
        }

        let mut outcome = WebhookOutcome::default();

        for (index, entry) in payload.entry.iter().enumerate() {
            for change in &entry.changes {
                if change.field != LEADGEN_FIELD {
                    outcome.skipped_changes += 1;
                    continue;
                }

                let value: LeadgenValue = serde_json::from_value(change.value.clone())
                    .map_err(|e| WebhookError::MalformedChange {
                        entry: index,
                        reason: e.to_string(),
                    })
                    .inspect_err(|e| log::error!("Meta webhook aborted: {}", e))?;

                log::info!(
                    "Meta leadgen event: lead={} form={} campaign={}",
                    value.leadgen_id,
                    value.form_id.as_deref().unwrap_or("-"),
                    value.campaign_id.as_deref().unwrap_or("-"),
                );

                let lead = process_lead(
                    &value.leadgen_id,
                    value.form_id.as_deref(),
                    value.campaign_id.as_deref(),
                )
                .inspect_err(|e| log::error!("Meta webhook aborted: {}", e))?;

                let lead_id = lead.id.clone();
                match self.store.leads.import(lead) {
                    ImportOutcome::Created(_) => outcome.imported.push(lead_id),
                    ImportOutcome::Duplicate => outcome.duplicates.push(lead_id),
                }
            }
        }

        Ok(outcome)
    }
}

/// Build the CRM lead for a leadgen notification.
///
/// The payload is synthesized from the notification ids; the full answer set
/// lives behind `GET /{leadgen_id}` on the Graph API.
pub fn process_lead(
    lead_id: &str,
    form_id: Option<&str>,
    campaign_id: Option<&str>,
) -> Result<Lead, WebhookError> {
    let lead_id = lead_id.trim();
    if lead_id.is_empty() {
        return Err(WebhookError::LeadRejected {
            lead_id: String::new(),
            reason: "empty leadgen id".to_string(),
        });
    }

    let lead_data = MetaLead {
        id: lead_id.to_string(),
        created_time: Some(Utc::now().format("%Y-%m-%dT%H:%M:%S%z").to_string()),
        campaign_id: campaign_id.map(str::to_string),
        form_id: form_id.map(str::to_string),
        field_data: vec![
            MetaFieldData::new("full_name", "Meta Lead"),
            MetaFieldData::new("email", &format!("lead.{}@example.com", lead_id)),
            MetaFieldData::new("phone_number", "+1 555 0100"),
        ],
        ..Default::default()
    };

    Ok(transform_lead_data(&lead_data, campaign_id))
}

/// Flatten a Meta lead's `field_data` into a CRM lead.
pub fn transform_lead_data(lead_data: &MetaLead, campaign_id: Option<&str>) -> Lead {
    let fields: HashMap<&str, &str> = lead_data
        .field_data
        .iter()
        .filter_map(|f| f.values.first().map(|v| (f.name.as_str(), v.trim())))
        .filter(|(_, v)| !v.is_empty())
        .collect();
    let field = |names: &[&str]| names.iter().find_map(|n| fields.get(n).map(|v| v.to_string()));

    let (mut first_name, mut last_name) = split_full_name(field(&["full_name"]).as_deref().unwrap_or(""));
    if let Some(first) = field(&["first_name"]) {
        first_name = first;
    }
    if let Some(last) = field(&["last_name"]) {
        last_name = last;
    }
    if first_name.is_empty() {
        first_name = "Unknown".to_string();
    }

    let campaign = campaign_id
        .or(lead_data.campaign_id.as_deref())
        .unwrap_or("unknown");

    Lead {
        id: format!("imported_{}", lead_data.id),
        first_name,
        last_name,
        company: field(&["company_name", "company"]).unwrap_or_else(|| "Unknown".to_string()),
        email: field(&["email"]).unwrap_or_default(),
        phone: field(&["phone_number", "phone"]).unwrap_or_default(),
        status: LeadStatus::New,
        value: 0.0,
        score: 50,
        owner_id: None,
        owner_name: None,
        owner_avatar: None,
        source: Some(format!("Meta Ad - Campaign {}", campaign)),
        tags: WEBHOOK_TAGS.iter().map(|t| t.to_string()).collect(),
        notes: extra_fields_note(lead_data),
        created_at: lead_data
            .created_time
            .as_deref()
            .and_then(parse_graph_time)
            .unwrap_or_else(Utc::now),
    }
}

/// "Ada King Lovelace" → ("Ada", "King Lovelace")
fn split_full_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

fn extra_fields_note(lead_data: &MetaLead) -> Option<String> {
    let lines: Vec<String> = lead_data
        .field_data
        .iter()
        .filter(|f| !MAPPED_FIELDS.contains(&f.name.as_str()) && !f.values.is_empty())
        .map(|f| format!("{}: {}", f.name, f.values.join(", ")))
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Graph timestamps look like `2024-05-01T10:00:00+0000`.
fn parse_graph_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TOKEN: &str = "s3cret";

    fn query(mode: Option<&str>, token: Option<&str>, challenge: Option<&str>) -> VerifyQuery {
        VerifyQuery {
            mode: mode.map(str::to_string),
            verify_token: token.map(str::to_string),
            challenge: challenge.map(str::to_string),
        }
    }

    fn handler() -> (MetaWebhookHandler, Arc<CrmStore>) {
        let store = Arc::new(CrmStore::empty());
        (
            MetaWebhookHandler::new(Some(TOKEN.to_string()), store.clone()),
            store,
        )
    }

    fn payload(changes: Value) -> WebhookPayload {
        serde_json::from_value(json!({
            "object": "page",
            "entry": [{"id": "page_1", "time": 1717200000, "changes": changes}]
        }))
        .unwrap()
    }

    #[test]
    fn test_verify_with_correct_token_echoes_challenge() {
        let result = verify_webhook_challenge(&query(Some("subscribe"), Some(TOKEN), Some("abc")), Some(TOKEN));
        assert_eq!(result, Ok("abc".to_string()));
    }

    #[test]
    fn test_verify_with_wrong_token_fails() {
        let result = verify_webhook_challenge(&query(Some("subscribe"), Some("wrong"), None), Some(TOKEN));
        assert_eq!(result, Err(VerificationFailure::VerificationFailed));
        assert_eq!(result.unwrap_err().to_string(), "Verification failed");
    }

    #[test]
    fn test_verify_with_no_parameters() {
        let result = verify_webhook_challenge(&VerifyQuery::default(), Some(TOKEN));
        assert_eq!(result.unwrap_err().to_string(), "Missing parameters");
    }

    #[test]
    fn test_verify_rejects_other_modes_and_unconfigured_secret() {
        assert_eq!(
            verify_webhook_challenge(&query(Some("unsubscribe"), Some(TOKEN), Some("abc")), Some(TOKEN)),
            Err(VerificationFailure::VerificationFailed)
        );
        assert_eq!(
            verify_webhook_challenge(&query(Some("subscribe"), Some(TOKEN), Some("abc")), None),
            Err(VerificationFailure::VerificationFailed)
        );
    }

    #[test]
    fn test_verify_query_parses_hub_keys() {
        let q: VerifyQuery = serde_json::from_value(json!({
            "hub.mode": "subscribe",
            "hub.verify_token": TOKEN,
            "hub.challenge": "1158201444"
        }))
        .unwrap();
        assert_eq!(q.challenge.as_deref(), Some("1158201444"));
    }

    #[test]
    fn test_transform_splits_full_name_and_tags_lead() {
        let data = MetaLead {
            id: "998".into(),
            field_data: vec![
                MetaFieldData::new("full_name", "John Doe"),
                MetaFieldData::new("email", "j@x.com"),
            ],
            ..Default::default()
        };
        let lead = transform_lead_data(&data, Some("c42"));

        assert_eq!(lead.id, "imported_998");
        assert_eq!(lead.first_name, "John");
        assert_eq!(lead.last_name, "Doe");
        assert_eq!(lead.email, "j@x.com");
        assert!(lead.tags.contains(&"Meta Ad".to_string()));
        assert!(lead.tags.contains(&"Webhook".to_string()));
        assert_eq!(lead.source.as_deref(), Some("Meta Ad - Campaign c42"));
        assert_eq!(lead.company, "Unknown");
        assert_eq!(lead.status, LeadStatus::New);
    }

    #[test]
    fn test_transform_prefers_explicit_name_fields_and_keeps_extras() {
        let data = MetaLead {
            id: "7".into(),
            created_time: Some("2024-05-01T10:00:00+0000".into()),
            campaign_id: Some("from_lead".into()),
            field_data: vec![
                MetaFieldData::new("full_name", "Ada King Lovelace"),
                MetaFieldData::new("last_name", "Lovelace"),
                MetaFieldData::new("job_title", "Analyst"),
                MetaFieldData {
                    name: "phone_number".into(),
                    values: vec![],
                },
            ],
            ..Default::default()
        };
        let lead = transform_lead_data(&data, None);

        assert_eq!(lead.first_name, "Ada");
        assert_eq!(lead.last_name, "Lovelace");
        assert_eq!(lead.phone, "");
        assert_eq!(lead.notes.as_deref(), Some("job_title: Analyst"));
        assert_eq!(lead.source.as_deref(), Some("Meta Ad - Campaign from_lead"));
        assert_eq!(lead.created_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn test_transform_with_no_fields_uses_defaults() {
        let lead = transform_lead_data(&MetaLead { id: "1".into(), ..Default::default() }, None);
        assert_eq!(lead.first_name, "Unknown");
        assert_eq!(lead.last_name, "");
        assert_eq!(lead.source.as_deref(), Some("Meta Ad - Campaign unknown"));
    }

    #[test]
    fn test_process_lead_derives_the_same_id_every_time() {
        let first = process_lead("555", Some("f1"), Some("c1")).unwrap();
        let second = process_lead("555", Some("f1"), Some("c1")).unwrap();
        assert_eq!(first.id, "imported_555");
        assert_eq!(first.id, second.id);
        assert!(process_lead("  ", None, None).is_err());
    }

    #[test]
    fn test_replayed_delivery_creates_one_lead() {
        let (handler, store) = handler();
        let delivery = payload(json!([
            {"field": "leadgen", "value": {"leadgen_id": "555", "form_id": "f1", "campaign_id": "c1"}}
        ]));

        let first = handler.handle_webhook(&delivery).unwrap();
        let second = handler.handle_webhook(&delivery).unwrap();

        assert_eq!(first.imported, vec!["imported_555"]);
        assert!(second.imported.is_empty());
        assert_eq!(second.duplicates, vec!["imported_555"]);
        assert_eq!(
            store.leads.snapshot().iter().filter(|l| l.id == "imported_555").count(),
            1
        );
    }

    #[test]
    fn test_only_leadgen_changes_are_processed() {
        let (handler, store) = handler();
        let delivery = payload(json!([
            {"field": "leadgen", "value": {"leadgen_id": 4455, "form_id": 77, "page_id": "page_1"}},
            {"field": "feed", "value": {"item": "status", "verb": "add"}}
        ]));

        let outcome = handler.handle_webhook(&delivery).unwrap();
        assert_eq!(outcome.imported, vec!["imported_4455"]);
        assert_eq!(outcome.skipped_changes, 1);
        assert_eq!(store.leads.len(), 1);
    }

    #[test]
    fn test_non_page_object_is_rejected() {
        let (handler, _) = handler();
        let delivery: WebhookPayload =
            serde_json::from_value(json!({"object": "instagram", "entry": []})).unwrap();
        assert!(matches!(
            handler.handle_webhook(&delivery),
            Err(WebhookError::UnsupportedObject(o)) if o == "instagram"
        ));
    }

    #[test]
    fn test_malformed_change_fails_whole_delivery_without_rollback() {
        let (handler, store) = handler();
        let delivery = payload(json!([
            {"field": "leadgen", "value": {"leadgen_id": "1"}},
            {"field": "leadgen", "value": {"form_id": "f_missing_lead"}},
            {"field": "leadgen", "value": {"leadgen_id": "3"}}
        ]));

        let err = handler.handle_webhook(&delivery).unwrap_err();
        assert!(matches!(err, WebhookError::MalformedChange { entry: 0, .. }));
        // The lead before the failure stays; the one after it never runs.
        assert!(store.leads.get("imported_1").is_some());
        assert!(store.leads.get("imported_3").is_none());
    }
}
