//! PostgreSQL-backed `WorkspaceStore`
//!
//! Every query filters on the workspace id so rows of other workspaces are
//! never read, changed, or deleted.

use crate::auth::WorkspaceRole;
use crate::db::models::*;
use crate::db::store::{NewComment, NewText, TextChanges, WorkspaceStore};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }
}

#[async_trait]
impl WorkspaceStore for Repository {
    // ========================================================================
    // Text Operations
    // ========================================================================

    async fn list_texts(&self, workspace_id: &str) -> Result<Vec<Text>> {
        TextEntity::find()
            .filter(TextColumn::WorkspaceId.eq(workspace_id))
            .order_by_desc(TextColumn::CreatedAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn find_text(&self, workspace_id: &str, id: Uuid) -> Result<Option<Text>> {
        TextEntity::find_by_id(id)
            .filter(TextColumn::WorkspaceId.eq(workspace_id))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn create_text(&self, workspace_id: &str, text: NewText) -> Result<Text> {
        let now = chrono::Utc::now();

        let model = TextActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_id.to_string()),
            title: Set(text.title),
            content: Set(text.content),
            created_by: Set(text.created_by),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        model.insert(self.conn()).await.map_err(Into::into)
    }

    async fn update_text(
        &self,
        workspace_id: &str,
        id: Uuid,
        changes: TextChanges,
    ) -> Result<Option<Text>> {
        let Some(existing) = self.find_text(workspace_id, id).await? else {
            return Ok(None);
        };

        let mut text: TextActiveModel = existing.into();

        if let Some(title) = changes.title {
            text.title = Set(title);
        }

        if let Some(content) = changes.content {
            text.content = Set(content);
        }

        text.updated_at = Set(chrono::Utc::now().into());

        let updated = text.update(self.conn()).await?;
        Ok(Some(updated))
    }

    async fn delete_text(&self, workspace_id: &str, id: Uuid) -> Result<bool> {
        // Comments go with the text through ON DELETE CASCADE
        let result = TextEntity::delete_many()
            .filter(TextColumn::Id.eq(id))
            .filter(TextColumn::WorkspaceId.eq(workspace_id))
            .exec(self.conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Comment Operations
    // ========================================================================

    async fn list_comments(&self, workspace_id: &str, text_id: Uuid) -> Result<Vec<Comment>> {
        CommentEntity::find()
            .filter(CommentColumn::WorkspaceId.eq(workspace_id))
            .filter(CommentColumn::TextId.eq(text_id))
            .order_by_desc(CommentColumn::CreatedAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn create_comment(&self, workspace_id: &str, comment: NewComment) -> Result<Comment> {
        let now = chrono::Utc::now();

        let model = CommentActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_id.to_string()),
            text_id: Set(comment.text_id),
            content: Set(comment.content),
            created_by: Set(comment.created_by),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        model.insert(self.conn()).await.map_err(Into::into)
    }

    async fn delete_comment(&self, workspace_id: &str, id: Uuid) -> Result<bool> {
        let result = CommentEntity::delete_many()
            .filter(CommentColumn::Id.eq(id))
            .filter(CommentColumn::WorkspaceId.eq(workspace_id))
            .exec(self.conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Membership Operations
    // ========================================================================

    async fn list_memberships(&self, user_id: &str) -> Result<Vec<WorkspaceMember>> {
        WorkspaceMemberEntity::find()
            .filter(WorkspaceMemberColumn::UserId.eq(user_id))
            .order_by_asc(WorkspaceMemberColumn::WorkspaceId)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn add_member(
        &self,
        workspace_id: &str,
        user_id: &str,
        role: WorkspaceRole,
    ) -> Result<WorkspaceMember> {
        let member = WorkspaceMemberActiveModel {
            workspace_id: Set(workspace_id.to_string()),
            user_id: Set(user_id.to_string()),
            role: Set(role.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        WorkspaceMemberEntity::insert(member)
            .on_conflict(
                OnConflict::columns([
                    WorkspaceMemberColumn::WorkspaceId,
                    WorkspaceMemberColumn::UserId,
                ])
                .update_column(WorkspaceMemberColumn::Role)
                .to_owned(),
            )
            .exec(self.conn())
            .await?;

        WorkspaceMemberEntity::find_by_id((workspace_id.to_string(), user_id.to_string()))
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::Internal {
                message: format!(
                    "Membership of {} in {} vanished after upsert",
                    user_id, workspace_id
                ),
            })
    }

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}
