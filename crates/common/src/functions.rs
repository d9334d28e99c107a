//! Names and reply data of the remote-callable functions

use serde::{Deserialize, Serialize};

use crate::auth::WorkspaceRole;
use crate::db::models::{Comment, Text};

pub const CREATE_TEXT: &str = "createText";
pub const GET_TEXTS: &str = "getTexts";
pub const UPDATE_TEXT: &str = "updateText";
pub const DELETE_TEXT: &str = "deleteText";
pub const CREATE_COMMENT: &str = "createComment";
pub const GET_COMMENTS: &str = "getComments";
pub const DELETE_COMMENT: &str = "deleteComment";
pub const GET_WORKSPACE_TOKENS: &str = "getWorkspaceTokens";

/// Path of a function on the gateway
pub fn path(function: &str) -> String {
    format!("/v1/{}", function)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextData {
    pub text: Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextsData {
    pub texts: Vec<Text>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentData {
    pub comment: Comment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentsData {
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedData {
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkspaceSummary {
    pub workspace_id: String,
    pub role: WorkspaceRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspacesData {
    pub workspaces: Vec<WorkspaceSummary>,
}
