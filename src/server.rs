//! HTTP surface: the Meta webhook endpoint plus a few operator routes.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::{CrmError, ErrorBody};
use crate::meta::poller::sync_page_leads;
use crate::meta::webhook::{VerifyQuery, WebhookError, WebhookPayload};
use crate::meta::MetaApiError;
use crate::state::{create_or_update_config, AppState};

pub const WEBHOOK_PATH: &str = "/webhooks/meta";

/// `CrmError` rendered as a JSON error response.
pub struct ApiError(CrmError);

impl<E: Into<CrmError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CrmError::Validation(_) | CrmError::Meta(MetaApiError::MissingToken) => {
                StatusCode::BAD_REQUEST
            }
            CrmError::NotFound { .. } => StatusCode::NOT_FOUND,
            CrmError::Meta(MetaApiError::NotConnected) => StatusCode::CONFLICT,
            CrmError::Meta(e) if e.requires_user_action() => StatusCode::UNAUTHORIZED,
            CrmError::Network(_) | CrmError::Http { .. } | CrmError::Meta(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, get(verify_webhook).post(receive_webhook))
        .route("/health", get(health))
        .route("/leads", get(list_leads))
        .route("/meta/account", get(meta_account))
        .route("/meta/connect", post(meta_connect))
        .route("/meta/disconnect", post(meta_disconnect))
        .route("/meta/sync", post(meta_sync))
        .with_state(state)
}

pub async fn run_server(state: Arc<AppState>) -> Result<(), CrmError> {
    let bind_addr = state.config.read().bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    log::info!("Listening on http://{}", bind_addr);
    log::info!("Meta webhook endpoint: http://{}{}", bind_addr, WEBHOOK_PATH);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}

/// GET /webhooks/meta
async fn verify_webhook(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VerifyQuery>,
) -> (StatusCode, String) {
    match state.webhook.verify(&query) {
        Ok(challenge) => (StatusCode::OK, challenge),
        Err(failure) => (StatusCode::FORBIDDEN, failure.to_string()),
    }
}

/// POST /webhooks/meta
///
/// Answers only 200, 404 or 500, so the body is parsed here rather than by
/// an extractor with its own rejection codes.
async fn receive_webhook(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            log::error!("Meta webhook aborted: unreadable payload: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": format!("Invalid webhook payload: {}", e) })),
            )
                .into_response();
        }
    };

    match state.webhook.handle_webhook(&payload) {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "imported": outcome.imported,
                "duplicates": outcome.duplicates,
            })),
        )
            .into_response(),
        Err(e @ WebhookError::UnsupportedObject(_)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": e.to_string() })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "leads": state.store.leads.len(),
        "metaConnected": state.meta.is_connected(),
    }))
}

#[derive(Debug, Deserialize)]
struct LeadQuery {
    #[serde(default)]
    q: Option<String>,
}

async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeadQuery>,
) -> Json<serde_json::Value> {
    let leads = state.store.leads.search(query.q.as_deref().unwrap_or(""));
    Json(json!({ "leads": leads }))
}

/// Connection state with the token stripped.
async fn meta_account(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let mut account = state.meta.snapshot();
    account.access_token = None;
    Json(json!({ "account": account, "source": state.meta.source_kind() }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectRequest {
    access_token: String,
    /// Page whose lead forms the poller should read; enables the poller.
    #[serde(default)]
    page_id: Option<String>,
}

async fn meta_connect(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConnectRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut account = state.meta.connect_account(&request.access_token).await?;

    // The connection is already bound and persisted, so a config failure
    // is reported in the body instead of failing the request.
    let mut page_saved = false;
    if let Some(page_id) = request.page_id.filter(|p| !p.trim().is_empty()) {
        match create_or_update_config(&state, |config| {
            config.meta.page_id = Some(page_id.clone());
            config.meta.enabled = true;
        }) {
            Ok(_) => {
                page_saved = true;
                state.meta_poller_wake.notify_one();
            }
            Err(e) => log::warn!("Meta: connected, but page {} was not saved: {}", page_id, e),
        }
    }

    account.access_token = None;
    Ok(Json(json!({ "account": account, "pageSaved": page_saved })))
}

async fn meta_disconnect(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.meta.disconnect_account()?;
    Ok(Json(json!({ "success": true })))
}

/// Sync the configured page's lead forms now.
async fn meta_sync(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    let page_id = state
        .config
        .read()
        .meta
        .page_id
        .clone()
        .ok_or_else(|| CrmError::Validation("No Meta page configured".to_string()))?;

    let report = sync_page_leads(&state.meta, &state.store.leads, &page_id).await?;
    Ok(Json(json!({ "report": report })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Config;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const TOKEN: &str = "hook_secret";

    fn config(page_id: Option<&str>) -> Config {
        let mut config = Config {
            seed_demo_data: false,
            ..Default::default()
        };
        config.meta.verify_token = Some(TOKEN.to_string());
        config.meta.demo_delay_ms = 0;
        config.meta.page_id = page_id.map(str::to_string);
        config
    }

    fn state(page_id: Option<&str>) -> Arc<AppState> {
        Arc::new(AppState::new(config(page_id), None).unwrap())
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_verification_handshake() {
        let app = router(state(None));

        let uri = format!(
            "/webhooks/meta?hub.mode=subscribe&hub.verify_token={}&hub.challenge=1158201444",
            TOKEN
        );
        let (status, body) = send(app.clone(), get_req(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "1158201444");

        let (status, body) = send(
            app.clone(),
            get_req("/webhooks/meta?hub.mode=subscribe&hub.verify_token=nope"),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, "Verification failed");

        let (status, body) = send(app, get_req("/webhooks/meta")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, "Missing parameters");
    }

    #[tokio::test]
    async fn test_lead_notification_lands_in_store() {
        let state = state(None);
        let app = router(state.clone());
        let payload = json!({
            "object": "page",
            "entry": [{"id": "p1", "time": 1717200000, "changes": [
                {"field": "leadgen", "value": {"leadgen_id": "444", "form_id": "f1", "campaign_id": "c9"}}
            ]}]
        });

        let (status, body) = send(app.clone(), post_json(WEBHOOK_PATH, payload.clone())).await;
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["imported"][0], "imported_444");

        // Meta redelivers on timeouts.
        let (status, _) = send(app.clone(), post_json(WEBHOOK_PATH, payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.store.leads.len(), 1);

        let (_, body) = send(app, get_req("/leads?q=meta")).await;
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["leads"][0]["source"], "Meta Ad - Campaign c9");
    }

    #[tokio::test]
    async fn test_webhook_status_codes() {
        let app = router(state(None));

        let (status, _) = send(
            app.clone(),
            post_json(WEBHOOK_PATH, json!({"object": "user", "entry": []})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let broken = json!({
            "object": "page",
            "entry": [{"changes": [{"field": "leadgen", "value": {"form_id": "f1"}}]}]
        });
        let (status, body) = send(app, post_json(WEBHOOK_PATH, broken)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("Malformed leadgen change"));
    }

    #[tokio::test]
    async fn test_unreadable_webhook_bodies_are_server_errors() {
        let state = state(None);
        let app = router(state.clone());

        let (status, body) = send(
            app.clone(),
            Request::builder()
                .method("POST")
                .uri(WEBHOOK_PATH)
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid webhook payload"));

        let (status, _) = send(
            app.clone(),
            post_json(WEBHOOK_PATH, json!({"object": "page", "entry": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        // Content type is not checked; a valid body still goes through.
        let (status, _) = send(
            app,
            Request::builder()
                .method("POST")
                .uri(WEBHOOK_PATH)
                .header("content-type", "text/plain")
                .body(Body::from(r#"{"object":"page","entry":[]}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(state.store.leads.is_empty());
    }

    #[tokio::test]
    async fn test_meta_routes_with_demo_token() {
        let state = state(Some("page_7"));
        let app = router(state.clone());

        let (status, body) = send(app.clone(), post_json("/meta/sync", json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.contains("Not connected"));

        let (status, body) = send(
            app.clone(),
            post_json("/meta/connect", json!({"accessToken": "demo_route"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("demo_route"));

        let (status, body) = send(app.clone(), post_json("/meta/sync", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["report"]["imported"], 5);
        assert_eq!(state.store.leads.len(), 5);

        let (_, body) = send(app.clone(), get_req("/health")).await;
        assert!(body.contains("\"metaConnected\":true"));

        send(app.clone(), post_json("/meta/disconnect", json!({}))).await;
        let (_, body) = send(app, get_req("/meta/account")).await;
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["account"]["isConnected"], false);
    }

    #[tokio::test]
    async fn test_connect_survives_a_failed_page_save() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "").unwrap();
        let state = Arc::new(
            AppState::new(config(None), None)
                .unwrap()
                .with_config_file(blocker.join("config.json")),
        );
        let app = router(state.clone());

        let (status, body) = send(
            app,
            post_json(
                "/meta/connect",
                json!({"accessToken": "demo_page", "pageId": "page_5"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["pageSaved"], false);
        assert_eq!(body["account"]["isConnected"], true);
        assert!(state.meta.is_connected());
        assert!(state.config.read().meta.page_id.is_none());
    }

    #[tokio::test]
    async fn test_connect_with_page_enables_poller_config() {
        let state = state(None);
        let app = router(state.clone());

        let (status, body) = send(
            app,
            post_json(
                "/meta/connect",
                json!({"accessToken": "demo_page", "pageId": "page_5"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"pageSaved\":true"));
        let config = state.config.read();
        assert_eq!(config.meta.page_id.as_deref(), Some("page_5"));
        assert!(config.meta.enabled);
    }

    #[tokio::test]
    async fn test_connect_with_blank_token_is_bad_request() {
        let app = router(state(None));
        let (status, body) = send(app, post_json("/meta/connect", json!({"accessToken": " "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("requiresUserAction"));
    }
}
