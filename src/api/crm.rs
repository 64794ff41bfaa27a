//! Resource and action calls against the CRM backend.
//!
//! CRUD goes through [`Resource`]; everything else is a named action that
//! POSTs or PUTs to a sub-path of its resource.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use super::{ApiConfig, BaseApi};
use crate::error::CrmError;
use crate::store::{DealStage, LeadStatus, TaskStatus};

/// CRUD over one collection endpoint, e.g. `/leads` and `/leads/{id}`.
pub struct Resource<'a> {
    api: &'a BaseApi,
    name: &'static str,
}

impl Resource<'_> {
    pub async fn list<T: DeserializeOwned>(&self, params: &[(&str, String)]) -> Result<T, CrmError> {
        self.api.get(&[self.name], params).await
    }

    pub async fn get<T: DeserializeOwned>(&self, id: &str) -> Result<T, CrmError> {
        self.api.get(&[self.name, id], &[]).await
    }

    pub async fn create<B, T>(&self, body: &B) -> Result<T, CrmError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.api.post(&[self.name], body).await
    }

    pub async fn update<B, T>(&self, id: &str, body: &B) -> Result<T, CrmError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.api.put(&[self.name, id], body).await
    }

    pub async fn delete(&self, id: &str) -> Result<Value, CrmError> {
        self.api.delete(&[self.name, id]).await
    }
}

pub struct CrmApi {
    base: BaseApi,
}

impl CrmApi {
    pub fn new(config: &ApiConfig) -> Result<Self, CrmError> {
        Ok(Self {
            base: BaseApi::new(config)?,
        })
    }

    pub fn base(&self) -> &BaseApi {
        &self.base
    }

    fn resource(&self, name: &'static str) -> Resource<'_> {
        Resource {
            api: &self.base,
            name,
        }
    }

    pub fn leads(&self) -> Resource<'_> {
        self.resource("leads")
    }

    pub fn contacts(&self) -> Resource<'_> {
        self.resource("contacts")
    }

    pub fn accounts(&self) -> Resource<'_> {
        self.resource("accounts")
    }

    pub fn deals(&self) -> Resource<'_> {
        self.resource("deals")
    }

    pub fn tasks(&self) -> Resource<'_> {
        self.resource("tasks")
    }

    pub fn campaigns(&self) -> Resource<'_> {
        self.resource("campaigns")
    }

    pub fn invoices(&self) -> Resource<'_> {
        self.resource("invoices")
    }

    pub fn notifications(&self) -> Resource<'_> {
        self.resource("notifications")
    }

    pub fn templates(&self) -> Resource<'_> {
        self.resource("templates")
    }

    // ---------------------------------------------------------------------
    // Resource actions
    // ---------------------------------------------------------------------

    pub async fn update_lead_status(&self, id: &str, status: LeadStatus) -> Result<Value, CrmError> {
        self.base
            .put(&["leads", id, "status"], &json!({ "status": status }))
            .await
    }

    /// Turn a qualified lead into a contact (and optionally a deal).
    pub async fn convert_lead(&self, id: &str, options: &Value) -> Result<Value, CrmError> {
        self.base.post(&["leads", id, "convert"], options).await
    }

    pub async fn import_leads<L: Serialize>(&self, leads: &[L]) -> Result<Value, CrmError> {
        self.base.post(&["leads", "import"], &json!({ "leads": leads })).await
    }

    pub async fn move_deal_stage(&self, id: &str, stage: DealStage) -> Result<Value, CrmError> {
        self.base
            .put(&["deals", id, "stage"], &json!({ "stage": stage }))
            .await
    }

    pub async fn update_task_status(&self, id: &str, status: TaskStatus) -> Result<Value, CrmError> {
        self.base
            .put(&["tasks", id, "status"], &json!({ "status": status }))
            .await
    }

    pub async fn complete_task(&self, id: &str) -> Result<Value, CrmError> {
        self.base
            .put(&["tasks", id, "complete"], &json!({}))
            .await
    }

    pub async fn send_campaign(&self, id: &str) -> Result<Value, CrmError> {
        self.base
            .post(&["campaigns", id, "send"], &json!({}))
            .await
    }

    pub async fn mark_notification_read(&self, id: &str) -> Result<Value, CrmError> {
        self.base
            .put(&["notifications", id, "read"], &json!({}))
            .await
    }

    pub async fn mark_all_notifications_read(&self) -> Result<Value, CrmError> {
        self.base.put(&["notifications", "read-all"], &json!({})).await
    }

    // ---------------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------------

    pub async fn settings(&self) -> Result<Value, CrmError> {
        self.base.get(&["settings"], &[]).await
    }

    pub async fn update_settings(&self, settings: &Value) -> Result<Value, CrmError> {
        self.base.put(&["settings"], settings).await
    }

    // ---------------------------------------------------------------------
    // Auth
    // ---------------------------------------------------------------------

    /// Sign in and keep the returned `token` for later calls.
    pub async fn login(&self, email: &str, password: &str) -> Result<Value, CrmError> {
        let session: Value = self
            .base
            .post(&["auth", "login"], &json!({ "email": email, "password": password }))
            .await?;
        if let Some(token) = session.get("token").and_then(Value::as_str) {
            self.base.set_token(Some(token.to_string()));
        }
        Ok(session)
    }

    /// Sign out. The local token is dropped even if the backend call fails.
    pub async fn logout(&self) -> Result<Value, CrmError> {
        let result = self.base.post(&["auth", "logout"], &json!({})).await;
        self.base.set_token(None);
        result
    }

    pub async fn me(&self) -> Result<Value, CrmError> {
        self.base.get(&["auth", "me"], &[]).await
    }

    pub async fn refresh_token(&self) -> Result<Value, CrmError> {
        let session: Value = self.base.post(&["auth", "refresh"], &json!({})).await?;
        if let Some(token) = session.get("token").and_then(Value::as_str) {
            self.base.set_token(Some(token.to_string()));
        }
        Ok(session)
    }

    // ---------------------------------------------------------------------
    // AI assist
    // ---------------------------------------------------------------------

    pub async fn score_lead(&self, lead_id: &str) -> Result<Value, CrmError> {
        self.base
            .post(&["ai", "score-lead"], &json!({ "leadId": lead_id }))
            .await
    }

    pub async fn draft_email(&self, context: &Value) -> Result<Value, CrmError> {
        self.base.post(&["ai", "draft-email"], context).await
    }

    pub async fn insights(&self) -> Result<Value, CrmError> {
        self.base.get(&["ai", "insights"], &[]).await
    }

    // ---------------------------------------------------------------------
    // Meta Ads
    // ---------------------------------------------------------------------

    pub async fn meta_connect(&self, access_token: &str) -> Result<Value, CrmError> {
        self.base
            .post(&["meta", "connect"], &json!({ "accessToken": access_token }))
            .await
    }

    pub async fn meta_sync_leads(&self, form_id: Option<&str>) -> Result<Value, CrmError> {
        self.base
            .post(&["meta", "sync-leads"], &json!({ "formId": form_id }))
            .await
    }

    pub async fn meta_ad_accounts(&self) -> Result<Value, CrmError> {
        self.base.get(&["meta", "ad-accounts"], &[]).await
    }
}
