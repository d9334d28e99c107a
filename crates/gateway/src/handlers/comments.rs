//! Comment functions

use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use super::{check_workspace, parse_id};
use crate::AppState;
use textspace_common::{
    auth::{AuthContext, WorkspaceRole},
    db::NewComment,
    errors::AppError,
    functions::{CommentData, CommentsData, DeletedData},
    metrics,
    rpc::{Payload, Reply, RpcResult},
    MAX_COMMENT_LENGTH,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub workspace_token: String,
    pub text_id: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCommentsRequest {
    pub workspace_token: String,
    pub text_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCommentRequest {
    pub workspace_token: String,
    pub comment_id: String,
}

/// Length is checked on the raw input, the stored content is trimmed
fn comment_content(raw: &str) -> Result<String, AppError> {
    if raw.chars().count() > MAX_COMMENT_LENGTH {
        return Err(AppError::InputTooLong {
            field: "content".to_string(),
            max: MAX_COMMENT_LENGTH,
        });
    }

    let content = raw.trim();
    if content.is_empty() {
        return Err(AppError::InvalidInput {
            message: "comment cannot be blank".to_string(),
            field: Some("content".to_string()),
        });
    }

    Ok(content.to_string())
}

/// Comment on a text of the token's workspace
pub async fn create_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Payload,
) -> RpcResult<CommentData> {
    let request: CreateCommentRequest =
        payload.require(&["workspaceToken", "textId", "content"])?;
    let access = check_workspace(&state, &auth, &request.workspace_token, WorkspaceRole::Editor)?;

    Reply::new(&access)
        .run(async move {
            let content = comment_content(&request.content)?;
            let text_id = parse_id("Text", &request.text_id)?;

            if state
                .store
                .find_text(&access.workspace_id, text_id)
                .await?
                .is_none()
            {
                return Err(AppError::not_found("Text", text_id));
            }

            let comment = state
                .store
                .create_comment(
                    &access.workspace_id,
                    NewComment {
                        text_id,
                        content,
                        created_by: access.user_id.clone(),
                    },
                )
                .await?;

            metrics::record_created("comment");
            tracing::info!(
                comment_id = %comment.id,
                text_id = %text_id,
                user_id = %access.user_id,
                "Comment created"
            );

            Ok(CommentData { comment })
        })
        .await
}

/// List the comments on a text, newest first
pub async fn get_comments(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Payload,
) -> RpcResult<CommentsData> {
    let request: GetCommentsRequest = payload.require(&["workspaceToken", "textId"])?;
    let access = check_workspace(&state, &auth, &request.workspace_token, WorkspaceRole::Editor)?;

    Reply::new(&access)
        .run(async move {
            // A malformed id matches no text, like an unknown one
            let comments = match Uuid::parse_str(&request.text_id) {
                Ok(text_id) => state.store.list_comments(&access.workspace_id, text_id).await?,
                Err(_) => Vec::new(),
            };

            tracing::info!(
                text_id = %request.text_id,
                user_id = %access.user_id,
                count = comments.len(),
                "Comments listed"
            );

            Ok(CommentsData { comments })
        })
        .await
}

/// Delete a comment
pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Payload,
) -> RpcResult<DeletedData> {
    let request: DeleteCommentRequest = payload.require(&["workspaceToken", "commentId"])?;
    let access = check_workspace(&state, &auth, &request.workspace_token, WorkspaceRole::Admin)?;

    Reply::new(&access)
        .run(async move {
            let comment_id = parse_id("Comment", &request.comment_id)?;
            let deleted = state
                .store
                .delete_comment(&access.workspace_id, comment_id)
                .await?;
            if !deleted {
                return Err(AppError::not_found("Comment", comment_id));
            }

            metrics::record_deleted("comment");
            tracing::info!(
                comment_id = %comment_id,
                user_id = %access.user_id,
                "Comment deleted"
            );

            Ok(DeletedData { deleted: true })
        })
        .await
}
