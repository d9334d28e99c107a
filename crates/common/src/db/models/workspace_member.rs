//! Workspace membership entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::auth::WorkspaceRole;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "workspace_members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub workspace_id: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,

    /// `editor` or `admin`
    pub role: String,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Parsed role of this member
    pub fn role(&self) -> crate::errors::Result<WorkspaceRole> {
        self.role.parse()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
