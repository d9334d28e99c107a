//! Storage contract shared by the PostgreSQL repository and the in-memory store

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::WorkspaceRole;
use crate::db::models::{Comment, Text, WorkspaceMember};
use crate::errors::Result;

/// Fields of a text to create
#[derive(Debug, Clone)]
pub struct NewText {
    pub title: String,
    pub content: String,
    pub created_by: String,
}

/// Partial update of a text; `None` leaves the field untouched
#[derive(Debug, Clone, Default)]
pub struct TextChanges {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl TextChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

/// Fields of a comment to create
#[derive(Debug, Clone)]
pub struct NewComment {
    pub text_id: Uuid,
    pub content: String,
    pub created_by: String,
}

/// Workspace-scoped persistence for texts, comments, and memberships.
///
/// Every record operation takes the workspace id resolved from a verified
/// workspace token and never touches rows of another workspace.
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    /// Texts of a workspace, newest first
    async fn list_texts(&self, workspace_id: &str) -> Result<Vec<Text>>;

    async fn find_text(&self, workspace_id: &str, id: Uuid) -> Result<Option<Text>>;

    async fn create_text(&self, workspace_id: &str, text: NewText) -> Result<Text>;

    /// Apply `changes` and bump `updated_at`; `None` when the text is not in the workspace
    async fn update_text(
        &self,
        workspace_id: &str,
        id: Uuid,
        changes: TextChanges,
    ) -> Result<Option<Text>>;

    /// Delete a text and its comments; `false` when nothing matched
    async fn delete_text(&self, workspace_id: &str, id: Uuid) -> Result<bool>;

    /// Comments on a text, newest first
    async fn list_comments(&self, workspace_id: &str, text_id: Uuid) -> Result<Vec<Comment>>;

    async fn create_comment(&self, workspace_id: &str, comment: NewComment) -> Result<Comment>;

    async fn delete_comment(&self, workspace_id: &str, id: Uuid) -> Result<bool>;

    /// Workspaces a user belongs to
    async fn list_memberships(&self, user_id: &str) -> Result<Vec<WorkspaceMember>>;

    /// Insert a membership or change its role
    async fn add_member(
        &self,
        workspace_id: &str,
        user_id: &str,
        role: WorkspaceRole,
    ) -> Result<WorkspaceMember>;

    /// Check the backing store is reachable
    async fn ping(&self) -> Result<()>;
}
