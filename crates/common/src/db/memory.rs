//! In-process `WorkspaceStore`
//!
//! Backs the gateway when `database.url` is `memory://` and the handler tests.
//! Optionally seeded with the demo workspaces, texts, and comment.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::WorkspaceRole;
use crate::db::models::{Comment, Text, WorkspaceMember};
use crate::db::store::{NewComment, NewText, TextChanges, WorkspaceStore};
use crate::errors::Result;

/// Demo user owning the seeded workspaces
pub const DEMO_USER_ID: &str = "demo-user-123";

/// Demo workspace where the demo user is admin
pub const DEMO_ADMIN_WORKSPACE: &str = "demo-workspace-123";

/// Demo workspace where the demo user is editor
pub const DEMO_EDITOR_WORKSPACE: &str = "demo-workspace-456";

#[derive(Default)]
struct Tables {
    texts: Vec<Text>,
    comments: Vec<Comment>,
    members: Vec<WorkspaceMember>,
}

/// Store keeping every table in memory behind one lock
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

/// Newest first; ties keep the latest insert in front
fn newest_first<T, F>(rows: impl DoubleEndedIterator<Item = T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> DateTimeWithTimeZone,
{
    let mut rows: Vec<T> = rows.rev().collect();
    rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    rows
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the demo workspaces, texts, and comment
    pub fn with_demo_data() -> Self {
        let now = Utc::now();
        let text = |title: &str, content: &str, age: Duration| {
            let at: DateTimeWithTimeZone = (now - age).into();
            Text {
                id: Uuid::new_v4(),
                workspace_id: DEMO_ADMIN_WORKSPACE.to_string(),
                title: title.to_string(),
                content: content.to_string(),
                created_by: DEMO_USER_ID.to_string(),
                created_at: at,
                updated_at: at,
            }
        };

        let texts = vec![
            text(
                "First demo text",
                "An example text stored in the system, used to exercise the services end to end.",
                Duration::days(1),
            ),
            text(
                "Second example",
                "Another text to show the list and the basic CRUD functions.",
                Duration::hours(1),
            ),
            text(
                "Technical test",
                "This text shows the services, storage, and handlers working together.",
                Duration::zero(),
            ),
        ];

        let comment_at: DateTimeWithTimeZone = (now - Duration::minutes(30)).into();
        let comments = vec![Comment {
            id: Uuid::new_v4(),
            workspace_id: DEMO_ADMIN_WORKSPACE.to_string(),
            text_id: texts[0].id,
            content: "First demo comment".to_string(),
            created_by: DEMO_USER_ID.to_string(),
            created_at: comment_at,
            updated_at: comment_at,
        }];

        let member = |workspace_id: &str, role: WorkspaceRole| WorkspaceMember {
            workspace_id: workspace_id.to_string(),
            user_id: DEMO_USER_ID.to_string(),
            role: role.to_string(),
            created_at: now.into(),
        };

        let members = vec![
            member(DEMO_ADMIN_WORKSPACE, WorkspaceRole::Admin),
            member(DEMO_EDITOR_WORKSPACE, WorkspaceRole::Editor),
        ];

        Self {
            tables: RwLock::new(Tables {
                texts,
                comments,
                members,
            }),
        }
    }
}

#[async_trait]
impl WorkspaceStore for MemoryStore {
    async fn list_texts(&self, workspace_id: &str) -> Result<Vec<Text>> {
        let tables = self.tables.read().await;
        let rows = tables
            .texts
            .iter()
            .filter(|t| t.workspace_id == workspace_id)
            .cloned();
        Ok(newest_first(rows, |t| t.created_at))
    }

    async fn find_text(&self, workspace_id: &str, id: Uuid) -> Result<Option<Text>> {
        let tables = self.tables.read().await;
        Ok(tables
            .texts
            .iter()
            .find(|t| t.id == id && t.workspace_id == workspace_id)
            .cloned())
    }

    async fn create_text(&self, workspace_id: &str, text: NewText) -> Result<Text> {
        let at = now();
        let row = Text {
            id: Uuid::new_v4(),
            workspace_id: workspace_id.to_string(),
            title: text.title,
            content: text.content,
            created_by: text.created_by,
            created_at: at,
            updated_at: at,
        };

        self.tables.write().await.texts.push(row.clone());
        Ok(row)
    }

    async fn update_text(
        &self,
        workspace_id: &str,
        id: Uuid,
        changes: TextChanges,
    ) -> Result<Option<Text>> {
        let mut tables = self.tables.write().await;
        let Some(text) = tables
            .texts
            .iter_mut()
            .find(|t| t.id == id && t.workspace_id == workspace_id)
        else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            text.title = title;
        }
        if let Some(content) = changes.content {
            text.content = content;
        }
        text.updated_at = now();

        Ok(Some(text.clone()))
    }

    async fn delete_text(&self, workspace_id: &str, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.texts.len();
        tables
            .texts
            .retain(|t| !(t.id == id && t.workspace_id == workspace_id));
        let deleted = tables.texts.len() < before;

        if deleted {
            tables.comments.retain(|c| c.text_id != id);
        }

        Ok(deleted)
    }

    async fn list_comments(&self, workspace_id: &str, text_id: Uuid) -> Result<Vec<Comment>> {
        let tables = self.tables.read().await;
        let rows = tables
            .comments
            .iter()
            .filter(|c| c.workspace_id == workspace_id && c.text_id == text_id)
            .cloned();
        Ok(newest_first(rows, |c| c.created_at))
    }

    async fn create_comment(&self, workspace_id: &str, comment: NewComment) -> Result<Comment> {
        let at = now();
        let row = Comment {
            id: Uuid::new_v4(),
            workspace_id: workspace_id.to_string(),
            text_id: comment.text_id,
            content: comment.content,
            created_by: comment.created_by,
            created_at: at,
            updated_at: at,
        };

        self.tables.write().await.comments.push(row.clone());
        Ok(row)
    }

    async fn delete_comment(&self, workspace_id: &str, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.comments.len();
        tables
            .comments
            .retain(|c| !(c.id == id && c.workspace_id == workspace_id));
        Ok(tables.comments.len() < before)
    }

    async fn list_memberships(&self, user_id: &str) -> Result<Vec<WorkspaceMember>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<WorkspaceMember> = tables
            .members
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.workspace_id.cmp(&b.workspace_id));
        Ok(rows)
    }

    async fn add_member(
        &self,
        workspace_id: &str,
        user_id: &str,
        role: WorkspaceRole,
    ) -> Result<WorkspaceMember> {
        let mut tables = self.tables.write().await;

        if let Some(member) = tables
            .members
            .iter_mut()
            .find(|m| m.workspace_id == workspace_id && m.user_id == user_id)
        {
            member.role = role.to_string();
            return Ok(member.clone());
        }

        let member = WorkspaceMember {
            workspace_id: workspace_id.to_string(),
            user_id: user_id.to_string(),
            role: role.to_string(),
            created_at: now(),
        };
        tables.members.push(member.clone());
        Ok(member)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
