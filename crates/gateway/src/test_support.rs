//! Router harness for handler tests, backed by the seeded in-memory store

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{create_router, AppState};
use textspace_common::{
    auth::WorkspaceRole, config::AppConfig, functions, MemoryStore, WorkspaceStore,
};

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<dyn WorkspaceStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_token_lifetime(3600, 300)
    }

    /// Workspace tokens live `expiration_secs` and are refreshed inside `refresh_secs`
    pub fn with_token_lifetime(expiration_secs: u64, refresh_secs: u64) -> Self {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = Some("test_user_secret".to_string());
        config.auth.workspace_token_secret = Some("test_workspace_secret".to_string());
        config.auth.workspace_token_expiration_secs = expiration_secs;
        config.auth.workspace_token_refresh_secs = refresh_secs;
        config.rate_limit.enabled = false;
        config.observability.metrics_port = 0;

        let store: Arc<dyn WorkspaceStore> = Arc::new(MemoryStore::with_demo_data());
        let state = AppState::new(Arc::new(config), store.clone()).unwrap();

        Self { state, store }
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    pub fn user_token(&self, user_id: &str) -> String {
        self.state.jwt.generate_token(user_id).unwrap()
    }

    pub fn workspace_token(&self, user_id: &str, workspace_id: &str, role: WorkspaceRole) -> String {
        self.state
            .workspace_tokens
            .issue(user_id, workspace_id, role)
            .unwrap()
    }

    /// Token whose lifetime ran out two minutes ago
    pub fn expired_workspace_token(
        &self,
        user_id: &str,
        workspace_id: &str,
        role: WorkspaceRole,
    ) -> String {
        let lifetime = self.state.config.auth.workspace_token_expiration_secs as i64;
        let issued_at = Utc::now() - Duration::seconds(lifetime + 120);
        self.state
            .workspace_tokens
            .issue_at(user_id, workspace_id, role, issued_at)
            .unwrap()
    }

    /// Id of the newest text in a workspace
    pub async fn first_text_id(&self, workspace_id: &str) -> Uuid {
        self.store.list_texts(workspace_id).await.unwrap()[0].id
    }

    /// POST a function call and return the status with the decoded envelope
    pub async fn call(&self, function: &str, bearer: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut request = Request::post(functions::path(function))
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = request.body(Body::from(body.to_string())).unwrap();

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// Serve the router on an ephemeral local port and return its base URL
    pub async fn spawn(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = self.router();

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("http://{}", addr)
    }
}
