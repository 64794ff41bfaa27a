//! Follow-up tasks, optionally linked to another CRM record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{new_id, require, trimmed, Collection, Record, Snapshot};
use crate::error::CrmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskPriority {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelatedKind {
    Lead,
    Contact,
    Account,
    Deal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedTo {
    #[serde(rename = "type")]
    pub kind: RelatedKind,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    #[serde(default)]
    pub assigned_to_id: Option<String>,
    #[serde(default)]
    pub related_to: Option<RelatedTo>,
}

impl Task {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != TaskStatus::Completed && self.due_date.is_some_and(|due| due < today)
    }
}

impl Record for Task {
    const KIND: &'static str = "Task";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub assigned_to_id: Option<String>,
    #[serde(default)]
    pub related_to: Option<RelatedTo>,
}

pub struct TaskStore {
    rows: Collection<Task>,
}

impl TaskStore {
    pub fn new(seed: Vec<Task>) -> Self {
        Self {
            rows: Collection::new(seed),
        }
    }

    pub fn snapshot(&self) -> Snapshot<Task> {
        self.rows.snapshot()
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.rows.get(id)
    }

    pub fn create(&self, draft: TaskDraft) -> Result<(Task, Snapshot<Task>), CrmError> {
        require("task title", &draft.title)?;
        let task = Task {
            id: new_id("task"),
            title: draft.title.trim().to_string(),
            description: trimmed(draft.description),
            due_date: draft.due_date,
            priority: draft.priority.unwrap_or_default(),
            status: draft.status.unwrap_or_default(),
            assigned_to_id: trimmed(draft.assigned_to_id),
            related_to: draft.related_to,
        };
        let snapshot = self.rows.prepend(task.clone());
        Ok((task, snapshot))
    }

    pub fn update(&self, id: &str, draft: TaskDraft) -> Result<Snapshot<Task>, CrmError> {
        require("task title", &draft.title)?;
        self.rows.modify(id, |task| {
            task.title = draft.title.trim().to_string();
            task.description = trimmed(draft.description);
            task.due_date = draft.due_date;
            if let Some(priority) = draft.priority {
                task.priority = priority;
            }
            if let Some(status) = draft.status {
                task.status = status;
            }
            task.assigned_to_id = trimmed(draft.assigned_to_id);
            task.related_to = draft.related_to;
        })
    }

    pub fn delete(&self, id: &str) -> Result<Snapshot<Task>, CrmError> {
        self.rows.remove(id)
    }

    pub fn set_status(&self, id: &str, status: TaskStatus) -> Result<Snapshot<Task>, CrmError> {
        self.rows.modify(id, |task| task.status = status)
    }

    pub fn complete(&self, id: &str) -> Result<Snapshot<Task>, CrmError> {
        self.set_status(id, TaskStatus::Completed)
    }

    pub fn overdue(&self, today: NaiveDate) -> Vec<Task> {
        self.rows.filter(|task| task.is_overdue(today))
    }

    pub fn for_related(&self, kind: RelatedKind, id: &str) -> Vec<Task> {
        self.rows.filter(|task| {
            task.related_to
                .as_ref()
                .is_some_and(|r| r.kind == kind && r.id == id)
        })
    }
}
