//! Client for the Textspace gateway
//!
//! `ApiClient` keeps the caller's id token and the workspace tokens handed out
//! by the gateway. Secured calls pick the stored token for the target
//! workspace and store whatever refreshed tokens come back. `TextService` and
//! `CommentService` wrap it with typed operations.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::WorkspaceTokenMap;
use crate::db::models::{Comment, Text};
use crate::errors::{AppError, ErrorCode, Result};
use crate::functions::{self, *};
use crate::rpc::Envelope;

/// Gateway client holding the id token and the stored workspace tokens
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    id_token: RwLock<Option<String>>,
    tokens: RwLock<WorkspaceTokenMap>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            id_token: RwLock::new(None),
            tokens: RwLock::new(WorkspaceTokenMap::new()),
        })
    }

    /// Set the id token sent as the Bearer credential
    pub async fn set_id_token(&self, token: impl Into<String>) {
        *self.id_token.write().await = Some(token.into());
    }

    /// Merge workspace tokens into the store
    pub async fn store_tokens(&self, tokens: WorkspaceTokenMap) {
        self.tokens.write().await.extend(tokens);
    }

    pub async fn stored_tokens(&self) -> WorkspaceTokenMap {
        self.tokens.read().await.clone()
    }

    /// Forget the id token and every workspace token
    pub async fn clear_tokens(&self) {
        *self.id_token.write().await = None;
        self.tokens.write().await.clear();
    }

    /// Call a function that needs no workspace token
    pub async fn call<T: DeserializeOwned>(&self, function: &str, data: Value) -> Result<T> {
        self.post(function, data).await
    }

    /// Call a function under the stored token of `workspace_id`
    pub async fn call_secured<T: DeserializeOwned>(
        &self,
        function: &str,
        workspace_id: &str,
        data: Value,
    ) -> Result<T> {
        let token = self
            .tokens
            .read()
            .await
            .get(workspace_id)
            .map(|entry| entry.token.clone())
            .ok_or_else(|| AppError::InvalidWorkspaceToken {
                message: format!("No workspace token stored for {}", workspace_id),
            })?;

        let mut body = match data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => {
                return Err(AppError::InvalidInput {
                    message: "Function data must be a JSON object".to_string(),
                    field: None,
                })
            }
        };
        body.insert("workspaceToken".to_string(), Value::String(token));

        self.post(function, Value::Object(body)).await
    }

    /// Fetch tokens for every workspace of the current user and store them
    pub async fn refresh_workspace_tokens(&self) -> Result<Vec<WorkspaceSummary>> {
        let data: WorkspacesData = self.call(GET_WORKSPACE_TOKENS, json!({})).await?;
        Ok(data.workspaces)
    }

    async fn post<T: DeserializeOwned>(&self, function: &str, body: Value) -> Result<T> {
        let url = format!("{}{}", self.base_url, functions::path(function));

        let mut request = self.http.post(&url).json(&body);
        if let Some(token) = self.id_token.read().await.as_deref() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        let envelope: Envelope<T> =
            serde_json::from_slice(&bytes).map_err(|e| AppError::Remote {
                code: ErrorCode::UpstreamError,
                message: format!("Unexpected reply from {} (HTTP {}): {}", function, status, e),
            })?;

        if let Some(tokens) = envelope.workspace_tokens.clone() {
            self.store_tokens(tokens).await;
        }

        if !envelope.success {
            tracing::debug!(function, status = status.as_u16(), "Function call failed");
        }

        envelope.into_result()
    }
}

/// Typed text operations
#[derive(Clone)]
pub struct TextService {
    client: Arc<ApiClient>,
}

impl TextService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn create_text(
        &self,
        workspace_id: &str,
        title: Option<&str>,
        content: &str,
    ) -> Result<Text> {
        let data: TextData = self
            .client
            .call_secured(
                CREATE_TEXT,
                workspace_id,
                json!({ "title": title, "content": content }),
            )
            .await?;
        Ok(data.text)
    }

    pub async fn get_texts(&self, workspace_id: &str) -> Result<Vec<Text>> {
        let data: TextsData = self
            .client
            .call_secured(GET_TEXTS, workspace_id, json!({}))
            .await?;
        Ok(data.texts)
    }

    pub async fn update_text(
        &self,
        workspace_id: &str,
        text_id: Uuid,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Text> {
        let data: TextData = self
            .client
            .call_secured(
                UPDATE_TEXT,
                workspace_id,
                json!({ "textId": text_id, "title": title, "content": content }),
            )
            .await?;
        Ok(data.text)
    }

    pub async fn delete_text(&self, workspace_id: &str, text_id: Uuid) -> Result<bool> {
        let data: DeletedData = self
            .client
            .call_secured(DELETE_TEXT, workspace_id, json!({ "textId": text_id }))
            .await?;
        Ok(data.deleted)
    }
}

/// Typed comment operations
#[derive(Clone)]
pub struct CommentService {
    client: Arc<ApiClient>,
}

impl CommentService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn create_comment(
        &self,
        workspace_id: &str,
        text_id: Uuid,
        content: &str,
    ) -> Result<Comment> {
        let data: CommentData = self
            .client
            .call_secured(
                CREATE_COMMENT,
                workspace_id,
                json!({ "textId": text_id, "content": content }),
            )
            .await?;
        Ok(data.comment)
    }

    pub async fn get_comments(&self, workspace_id: &str, text_id: Uuid) -> Result<Vec<Comment>> {
        let data: CommentsData = self
            .client
            .call_secured(GET_COMMENTS, workspace_id, json!({ "textId": text_id }))
            .await?;
        Ok(data.comments)
    }

    pub async fn delete_comment(&self, workspace_id: &str, comment_id: Uuid) -> Result<bool> {
        let data: DeletedData = self
            .client
            .call_secured(
                DELETE_COMMENT,
                workspace_id,
                json!({ "commentId": comment_id }),
            )
            .await?;
        Ok(data.deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{WorkspaceRole, WorkspaceTokenEntry};

    fn entry(token: &str) -> WorkspaceTokenEntry {
        WorkspaceTokenEntry {
            role: WorkspaceRole::Editor,
            token: token.to_string(),
        }
    }

    #[tokio::test]
    async fn test_store_merges_and_clear_forgets() {
        let client = ApiClient::new("http://localhost:8080/", Duration::from_secs(5)).unwrap();

        let mut first = WorkspaceTokenMap::new();
        first.insert("ws-1".into(), entry("a"));
        first.insert("ws-2".into(), entry("b"));
        client.store_tokens(first).await;

        let mut refreshed = WorkspaceTokenMap::new();
        refreshed.insert("ws-1".into(), entry("c"));
        client.store_tokens(refreshed).await;

        let stored = client.stored_tokens().await;
        assert_eq!(stored.len(), 2);
        assert_eq!(stored["ws-1"].token, "c");
        assert_eq!(stored["ws-2"].token, "b");

        client.set_id_token("id").await;
        client.clear_tokens().await;
        assert!(client.stored_tokens().await.is_empty());
        assert!(client.id_token.read().await.is_none());
    }

    #[tokio::test]
    async fn test_secured_call_needs_stored_token() {
        let client = ApiClient::new("http://localhost:8080", Duration::from_secs(5)).unwrap();
        let err = client
            .call_secured::<TextsData>(GET_TEXTS, "ws-unknown", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidWorkspaceToken);
    }

    #[tokio::test]
    async fn test_secured_call_rejects_non_object_data() {
        let client = ApiClient::new("http://localhost:8080", Duration::from_secs(5)).unwrap();
        let mut tokens = WorkspaceTokenMap::new();
        tokens.insert("ws-1".into(), entry("a"));
        client.store_tokens(tokens).await;

        let err = client
            .call_secured::<TextsData>(GET_TEXTS, "ws-1", json!([1, 2]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }
}
