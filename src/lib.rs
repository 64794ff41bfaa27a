pub mod api;
pub mod error;
pub mod meta;
pub mod server;
pub mod state;
pub mod store;
pub mod types;

use std::sync::Arc;

use error::CrmError;
use state::AppState;

/// Load state, start the Meta lead poller, and serve until Ctrl-C.
pub async fn run() -> Result<(), CrmError> {
    let state = Arc::new(AppState::load()?);

    {
        let config = state.config.read();
        log::info!(
            "crmdesk starting (demo data: {}, Meta poller: {}, CRM API: {})",
            config.seed_demo_data,
            if config.meta.enabled { "on" } else { "off" },
            config.api.base_url,
        );
    }
    if state.api.base().has_token() {
        log::info!("CRM API token configured");
    }

    tokio::spawn(meta::poller::run_meta_poller(state.clone()));

    server::run_server(state).await
}

#[cfg(test)]
pub mod test_utils {
    /// Serve `router` on an ephemeral local port and return its base URL.
    pub async fn serve(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }
}
