//! Demo fixtures loaded when `seedDemoData` is enabled.
//!
//! Ids and timestamps are fixed so a fresh session always looks the same.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};

use super::contacts::normalize_phone;
use super::{
    Account, Contact, Deal, DealStage, Lead, LeadStatus, RelatedKind, RelatedTo, Task,
    TaskPriority, TaskStatus,
};

/// 2024-06-01T00:00:00Z
const SEED_EPOCH: i64 = 1_717_200_000;

fn at(days: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(SEED_EPOCH + days * 86_400, 0).unwrap_or_default()
}

fn date(month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2024, month, day)
}

pub fn leads() -> Vec<Lead> {
    let rows: [(&str, &str, &str, &str, LeadStatus, f64, u8, &str); 6] = [
        ("John", "Smith", "Acme Corp", "john.smith@acme.com", LeadStatus::New, 15_000.0, 62, "Alex Morgan"),
        ("Lisa", "Wong", "Globex", "lisa.wong@globex.com", LeadStatus::Contacted, 28_000.0, 71, "Alex Morgan"),
        ("Carlos", "Mendes", "Initech", "carlos@initech.io", LeadStatus::Qualified, 9_500.0, 80, "Jordan Lee"),
        ("Aisha", "Bello", "Umbrella Health", "aisha.bello@umbrella.health", LeadStatus::Proposal, 42_000.0, 88, "Jordan Lee"),
        ("Tom", "Becker", "Stark Supply", "tbecker@starksupply.com", LeadStatus::Negotiation, 67_500.0, 91, "Alex Morgan"),
        ("Nina", "Kowalski", "Wayne Freight", "nina.k@waynefreight.com", LeadStatus::Lost, 12_000.0, 34, "Jordan Lee"),
    ];

    rows.into_iter()
        .enumerate()
        .map(|(i, (first, last, company, email, status, value, score, owner))| Lead {
            id: format!("lead-{}", i + 1),
            first_name: first.to_string(),
            last_name: last.to_string(),
            company: company.to_string(),
            email: email.to_string(),
            phone: format!("+1 555 01{:02}", i + 10),
            status,
            value,
            score,
            owner_id: Some(owner_id(owner)),
            owner_name: Some(owner.to_string()),
            owner_avatar: None,
            source: Some("Website".to_string()),
            tags: Vec::new(),
            notes: None,
            created_at: at(i as i64),
        })
        .collect()
}

pub fn contacts() -> Vec<Contact> {
    let rows: [(&str, &str, &str, &[&str], &str); 4] = [
        ("Margaret Hamilton", "margaret@apollo.dev", "+1 (555) 201-0001", &["vip", "engineering"], "Referral"),
        ("Alan Turing", "alan@bletchley.uk", "+44 20 7946 0018", &["advisor"], "Conference"),
        ("Katherine Johnson", "kjohnson@langley.gov", "555-201-0003", &[], "Website"),
        ("Linus Pauling", "linus@caltech.edu", "+1 555 201 0004", &["newsletter"], "Meta Ad"),
    ];

    rows.into_iter()
        .enumerate()
        .map(|(i, (name, email, phone, tags, source))| {
            let tags: BTreeSet<String> = tags.iter().map(|t| t.to_string()).collect();
            let mut custom_fields = BTreeMap::new();
            if i == 0 {
                custom_fields.insert("preferredChannel".to_string(), serde_json::json!("email"));
            }
            Contact {
                id: format!("contact-{}", i + 1),
                name: name.to_string(),
                email: Some(email.to_string()),
                phone: phone.to_string(),
                normalized_phone: normalize_phone(phone),
                tags,
                source: Some(source.to_string()),
                custom_fields,
                created_at: at(i as i64),
                updated_at: at(i as i64 + 2),
            }
        })
        .collect()
}

pub fn accounts() -> Vec<Account> {
    let rows: [(&str, &str, &str, &str); 3] = [
        ("Acme Corp", "Manufacturing", "+1 555 300 0001", "https://acme.example.com"),
        ("Globex", "Energy", "+1 555 300 0002", "https://globex.example.com"),
        ("Initech", "Software", "+1 555 300 0003", "https://initech.example.com"),
    ];

    rows.into_iter()
        .enumerate()
        .map(|(i, (name, industry, phone, website))| Account {
            id: format!("account-{}", i + 1),
            name: name.to_string(),
            industry: Some(industry.to_string()),
            phone: Some(phone.to_string()),
            website: Some(website.to_string()),
            owner_id: Some(owner_id(if i % 2 == 0 { "Alex Morgan" } else { "Jordan Lee" })),
        })
        .collect()
}

pub fn deals() -> Vec<Deal> {
    let accounts = accounts();
    let rows: [(&str, usize, DealStage, f64, Option<NaiveDate>); 5] = [
        ("Acme plant rollout", 0, DealStage::Prospecting, 48_000.0, date(7, 15)),
        ("Globex analytics pilot", 1, DealStage::Qualification, 22_500.0, date(7, 30)),
        ("Initech seat expansion", 2, DealStage::Proposal, 18_000.0, date(8, 10)),
        ("Acme service contract", 0, DealStage::Negotiation, 96_000.0, date(6, 28)),
        ("Globex renewal", 1, DealStage::ClosedWon, 35_000.0, date(5, 31)),
    ];

    rows.into_iter()
        .enumerate()
        .map(|(i, (name, account_index, stage, value, close_date))| {
            let account = &accounts[account_index];
            Deal {
                id: format!("deal-{}", i + 1),
                name: name.to_string(),
                account_id: Some(account.id.clone()),
                account_name: Some(account.name.clone()),
                stage,
                value,
                close_date,
                owner_id: account.owner_id.clone(),
            }
        })
        .collect()
}

pub fn tasks() -> Vec<Task> {
    vec![
        Task {
            id: "task-1".to_string(),
            title: "Send pricing to Aisha".to_string(),
            description: Some("Include the multi-site discount".to_string()),
            due_date: date(6, 5),
            priority: TaskPriority::High,
            status: TaskStatus::Pending,
            assigned_to_id: Some(owner_id("Jordan Lee")),
            related_to: Some(RelatedTo {
                kind: RelatedKind::Lead,
                id: "lead-4".to_string(),
                name: "Aisha Bello".to_string(),
            }),
        },
        Task {
            id: "task-2".to_string(),
            title: "Contract review call".to_string(),
            description: None,
            due_date: date(6, 20),
            priority: TaskPriority::Medium,
            status: TaskStatus::InProgress,
            assigned_to_id: Some(owner_id("Alex Morgan")),
            related_to: Some(RelatedTo {
                kind: RelatedKind::Deal,
                id: "deal-4".to_string(),
                name: "Acme service contract".to_string(),
            }),
        },
        Task {
            id: "task-3".to_string(),
            title: "Update CRM import mapping".to_string(),
            description: None,
            due_date: None,
            priority: TaskPriority::Low,
            status: TaskStatus::Completed,
            assigned_to_id: None,
            related_to: None,
        },
    ]
}

fn owner_id(name: &str) -> String {
    format!("user-{}", name.to_lowercase().replace(' ', "-"))
}
