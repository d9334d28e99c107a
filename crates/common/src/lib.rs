//! Textspace Common Library
//!
//! Shared code for the Textspace gateway and its clients including:
//! - Database models and the workspace store
//! - Workspace token issuing and verification
//! - Error types and reply envelopes
//! - Configuration management
//! - Metrics and observability
//! - The gateway client

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod functions;
pub mod metrics;
pub mod rpc;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use db::{MemoryStore, Repository, WorkspaceStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Longest accepted comment, in characters
pub const MAX_COMMENT_LENGTH: usize = 500;

/// Longest accepted text title, in characters
pub const MAX_TEXT_TITLE_LENGTH: usize = 200;

/// Longest accepted text body, in characters
pub const MAX_TEXT_CONTENT_LENGTH: usize = 50_000;

/// Title given to texts created without one
pub const DEFAULT_TEXT_TITLE: &str = "Untitled";
