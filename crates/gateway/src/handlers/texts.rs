//! Text functions

use axum::extract::State;
use serde::Deserialize;
use validator::Validate;

use super::{check_workspace, parse_id};
use crate::AppState;
use textspace_common::{
    auth::{AuthContext, WorkspaceRole},
    db::{NewText, TextChanges},
    errors::AppError,
    functions::{DeletedData, TextData, TextsData},
    metrics,
    rpc::{Payload, Reply, RpcResult},
    DEFAULT_TEXT_TITLE,
};

/// Create text request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTextRequest {
    pub workspace_token: String,

    #[validate(length(max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 50000))]
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTextsRequest {
    pub workspace_token: String,
}

/// Update text request; absent fields stay as they are
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTextRequest {
    pub workspace_token: String,

    pub text_id: String,

    #[validate(length(max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 50000))]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTextRequest {
    pub workspace_token: String,
    pub text_id: String,
}

fn blank_content() -> AppError {
    AppError::InvalidInput {
        message: "content cannot be blank".to_string(),
        field: Some("content".to_string()),
    }
}

/// Trimmed title, `Untitled` when blank
fn normalize_title(title: Option<&str>) -> String {
    title
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or(DEFAULT_TEXT_TITLE)
        .to_string()
}

/// Create a text in the token's workspace
pub async fn create_text(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Payload,
) -> RpcResult<TextData> {
    let request: CreateTextRequest = payload.require(&["workspaceToken", "content"])?;
    let access = check_workspace(&state, &auth, &request.workspace_token, WorkspaceRole::Editor)?;

    Reply::new(&access)
        .run(async move {
            request.validate()?;
            if request.content.trim().is_empty() {
                return Err(blank_content());
            }

            let new_text = NewText {
                title: normalize_title(request.title.as_deref()),
                content: request.content,
                created_by: access.user_id.clone(),
            };
            let text = state.store.create_text(&access.workspace_id, new_text).await?;

            metrics::record_created("text");
            tracing::info!(
                text_id = %text.id,
                workspace_id = %access.workspace_id,
                user_id = %access.user_id,
                "Text created"
            );

            Ok(TextData { text })
        })
        .await
}

/// List the texts of the token's workspace, newest first
pub async fn get_texts(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Payload,
) -> RpcResult<TextsData> {
    let request: GetTextsRequest = payload.require(&["workspaceToken"])?;
    let access = check_workspace(&state, &auth, &request.workspace_token, WorkspaceRole::Editor)?;

    Reply::new(&access)
        .run(async move {
            let texts = state.store.list_texts(&access.workspace_id).await?;

            tracing::info!(
                workspace_id = %access.workspace_id,
                user_id = %access.user_id,
                count = texts.len(),
                "Texts listed"
            );

            Ok(TextsData { texts })
        })
        .await
}

/// Change the title and/or content of a text
pub async fn update_text(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Payload,
) -> RpcResult<TextData> {
    let request: UpdateTextRequest = payload.require(&["workspaceToken", "textId"])?;
    let access = check_workspace(&state, &auth, &request.workspace_token, WorkspaceRole::Editor)?;

    Reply::new(&access)
        .run(async move {
            request.validate()?;
            let text_id = parse_id("Text", &request.text_id)?;

            let changes = TextChanges {
                title: request.title.as_deref().map(|title| normalize_title(Some(title))),
                content: request.content,
            };
            if changes.is_empty() {
                return Err(AppError::InvalidInput {
                    message: "nothing to update: provide title or content".to_string(),
                    field: None,
                });
            }
            if changes.content.as_deref().is_some_and(|c| c.trim().is_empty()) {
                return Err(blank_content());
            }

            let text = state
                .store
                .update_text(&access.workspace_id, text_id, changes)
                .await?
                .ok_or_else(|| AppError::not_found("Text", text_id))?;

            tracing::info!(
                text_id = %text.id,
                workspace_id = %access.workspace_id,
                user_id = %access.user_id,
                "Text updated"
            );

            Ok(TextData { text })
        })
        .await
}

/// Delete a text and its comments
pub async fn delete_text(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Payload,
) -> RpcResult<DeletedData> {
    let request: DeleteTextRequest = payload.require(&["workspaceToken", "textId"])?;
    let access = check_workspace(&state, &auth, &request.workspace_token, WorkspaceRole::Admin)?;

    Reply::new(&access)
        .run(async move {
            let text_id = parse_id("Text", &request.text_id)?;
            let deleted = state.store.delete_text(&access.workspace_id, text_id).await?;
            if !deleted {
                return Err(AppError::not_found("Text", text_id));
            }

            metrics::record_deleted("text");
            tracing::info!(
                text_id = %text_id,
                workspace_id = %access.workspace_id,
                user_id = %access.user_id,
                "Text deleted"
            );

            Ok(DeletedData { deleted: true })
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestApp;
    use axum::http::StatusCode;
    use serde_json::json;
    use uuid::Uuid;
    use textspace_common::db::{DEMO_ADMIN_WORKSPACE, DEMO_EDITOR_WORKSPACE, DEMO_USER_ID};
    use textspace_common::functions::{CREATE_TEXT, DELETE_TEXT, GET_TEXTS, UPDATE_TEXT};

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title(None), "Untitled");
        assert_eq!(normalize_title(Some("   ")), "Untitled");
        assert_eq!(normalize_title(Some("  Notes ")), "Notes");
    }

    #[tokio::test]
    async fn test_create_text_returns_record() {
        let app = TestApp::new();
        let token = app.workspace_token(DEMO_USER_ID, DEMO_EDITOR_WORKSPACE, WorkspaceRole::Editor);

        let (status, body) = app
            .call(
                CREATE_TEXT,
                Some(&app.user_token(DEMO_USER_ID)),
                json!({ "workspaceToken": token, "content": "Hello" }),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let text = &body["data"]["text"];
        assert!(Uuid::parse_str(text["id"].as_str().unwrap()).is_ok());
        assert_eq!(text["title"], "Untitled");
        assert_eq!(text["content"], "Hello");
        assert_eq!(text["workspace_id"], DEMO_EDITOR_WORKSPACE);
        assert_eq!(text["created_by"], DEMO_USER_ID);
        assert!(text["created_at"].is_string());
        assert!(text["updated_at"].is_string());
        assert_eq!(
            body["workspace_tokens"][DEMO_EDITOR_WORKSPACE]["role"],
            "editor"
        );
    }

    #[tokio::test]
    async fn test_create_text_rejects_blank_and_long_input() {
        let app = TestApp::new();
        let user = app.user_token(DEMO_USER_ID);
        let token = app.workspace_token(DEMO_USER_ID, DEMO_ADMIN_WORKSPACE, WorkspaceRole::Admin);

        let (status, body) = app
            .call(CREATE_TEXT, Some(&user), json!({ "workspaceToken": token, "content": "   " }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_INPUT");
        assert!(body["workspace_tokens"][DEMO_ADMIN_WORKSPACE].is_object());

        let (_, body) = app
            .call(
                CREATE_TEXT,
                Some(&user),
                json!({ "workspaceToken": token, "title": "t".repeat(201), "content": "x" }),
            )
            .await;
        assert_eq!(body["error"]["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_missing_field_and_missing_auth() {
        let app = TestApp::new();
        let token = app.workspace_token(DEMO_USER_ID, DEMO_ADMIN_WORKSPACE, WorkspaceRole::Admin);

        let (_, body) = app
            .call(
                CREATE_TEXT,
                Some(&app.user_token(DEMO_USER_ID)),
                json!({ "workspaceToken": token }),
            )
            .await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "MISSING_FIELD");

        let (status, body) = app
            .call(GET_TEXTS, None, json!({ "workspaceToken": token }))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_listing_is_scoped_to_workspace() {
        let app = TestApp::new();
        let user = app.user_token(DEMO_USER_ID);
        let admin = app.workspace_token(DEMO_USER_ID, DEMO_ADMIN_WORKSPACE, WorkspaceRole::Admin);
        let editor =
            app.workspace_token(DEMO_USER_ID, DEMO_EDITOR_WORKSPACE, WorkspaceRole::Editor);

        app.call(
            CREATE_TEXT,
            Some(&user),
            json!({ "workspaceToken": editor, "title": "Elsewhere", "content": "x" }),
        )
        .await;

        let (_, body) = app
            .call(GET_TEXTS, Some(&user), json!({ "workspaceToken": admin }))
            .await;
        let texts = body["data"]["texts"].as_array().unwrap();
        assert_eq!(texts.len(), 3);
        assert!(texts.iter().all(|t| t["workspace_id"] == DEMO_ADMIN_WORKSPACE));
        assert_eq!(texts[0]["title"], "Technical test");

        let (_, body) = app
            .call(GET_TEXTS, Some(&user), json!({ "workspaceToken": editor }))
            .await;
        let texts = body["data"]["texts"].as_array().unwrap();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0]["title"], "Elsewhere");
    }

    #[tokio::test]
    async fn test_update_text() {
        let app = TestApp::new();
        let user = app.user_token(DEMO_USER_ID);
        let token = app.workspace_token(DEMO_USER_ID, DEMO_ADMIN_WORKSPACE, WorkspaceRole::Admin);
        let text_id = app.first_text_id(DEMO_ADMIN_WORKSPACE).await;

        let (_, body) = app
            .call(
                UPDATE_TEXT,
                Some(&user),
                json!({ "workspaceToken": token, "textId": text_id, "title": " Renamed " }),
            )
            .await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["text"]["title"], "Renamed");

        let (_, body) = app
            .call(UPDATE_TEXT, Some(&user), json!({ "workspaceToken": token, "textId": text_id }))
            .await;
        assert_eq!(body["error"]["code"], "INVALID_INPUT");

        let (status, body) = app
            .call(
                UPDATE_TEXT,
                Some(&user),
                json!({ "workspaceToken": token, "textId": Uuid::new_v4(), "content": "x" }),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_delete_text_needs_admin_and_existing_id() {
        let app = TestApp::new();
        let user = app.user_token(DEMO_USER_ID);
        let text_id = app.first_text_id(DEMO_ADMIN_WORKSPACE).await;

        // Editor token for the same workspace
        let editor =
            app.workspace_token(DEMO_USER_ID, DEMO_ADMIN_WORKSPACE, WorkspaceRole::Editor);
        let (status, body) = app
            .call(DELETE_TEXT, Some(&user), json!({ "workspaceToken": editor, "textId": text_id }))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "PERMISSION_DENIED");

        let admin = app.workspace_token(DEMO_USER_ID, DEMO_ADMIN_WORKSPACE, WorkspaceRole::Admin);
        let (_, body) = app
            .call(DELETE_TEXT, Some(&user), json!({ "workspaceToken": admin, "textId": text_id }))
            .await;
        assert_eq!(body["data"]["deleted"], true);

        let (status, body) = app
            .call(DELETE_TEXT, Some(&user), json!({ "workspaceToken": admin, "textId": text_id }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_malformed_id_is_not_found() {
        let app = TestApp::new();
        let token = app.workspace_token(DEMO_USER_ID, DEMO_ADMIN_WORKSPACE, WorkspaceRole::Admin);

        let (status, body) = app
            .call(
                DELETE_TEXT,
                Some(&app.user_token(DEMO_USER_ID)),
                json!({ "workspaceToken": token, "textId": "not-a-uuid" }),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert!(body["workspace_tokens"][DEMO_ADMIN_WORKSPACE].is_object());
    }

    #[tokio::test]
    async fn test_expired_workspace_token_is_rejected() {
        let app = TestApp::new();
        let token =
            app.expired_workspace_token(DEMO_USER_ID, DEMO_ADMIN_WORKSPACE, WorkspaceRole::Admin);

        let (status, body) = app
            .call(
                GET_TEXTS,
                Some(&app.user_token(DEMO_USER_ID)),
                json!({ "workspaceToken": token }),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "WORKSPACE_TOKEN_EXPIRED");
        assert!(body.get("workspace_tokens").is_none());
    }

    #[tokio::test]
    async fn test_token_of_other_user_is_rejected() {
        let app = TestApp::new();
        let token = app.workspace_token("someone-else", DEMO_ADMIN_WORKSPACE, WorkspaceRole::Admin);

        let (_, body) = app
            .call(
                GET_TEXTS,
                Some(&app.user_token(DEMO_USER_ID)),
                json!({ "workspaceToken": token }),
            )
            .await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "INVALID_WORKSPACE_TOKEN");
        assert!(body.get("workspace_tokens").is_none());
    }

    #[tokio::test]
    async fn test_near_expiry_token_comes_back_refreshed() {
        let app = TestApp::with_token_lifetime(60, 300);
        let token = app.workspace_token(DEMO_USER_ID, DEMO_ADMIN_WORKSPACE, WorkspaceRole::Admin);

        let (_, body) = app
            .call(
                GET_TEXTS,
                Some(&app.user_token(DEMO_USER_ID)),
                json!({ "workspaceToken": token }),
            )
            .await;
        assert_eq!(body["success"], true);
        let returned = body["workspace_tokens"][DEMO_ADMIN_WORKSPACE]["token"]
            .as_str()
            .unwrap();
        assert_ne!(returned, token);
    }
}
