//! SeaORM entity models
//!
//! Database entities for Textspace

mod comment;
mod text;
mod workspace_member;

pub use text::{
    Entity as TextEntity,
    Model as Text,
    ActiveModel as TextActiveModel,
    Column as TextColumn,
};

pub use comment::{
    Entity as CommentEntity,
    Model as Comment,
    ActiveModel as CommentActiveModel,
    Column as CommentColumn,
};

pub use workspace_member::{
    Entity as WorkspaceMemberEntity,
    Model as WorkspaceMember,
    ActiveModel as WorkspaceMemberActiveModel,
    Column as WorkspaceMemberColumn,
};
