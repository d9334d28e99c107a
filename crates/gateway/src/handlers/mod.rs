//! Function handlers

pub mod comments;
pub mod health;
pub mod texts;
pub mod workspaces;

use textspace_common::{
    auth::{AuthContext, WorkspaceAccess, WorkspaceRole},
    errors::{AppError, Result},
    metrics,
};
use uuid::Uuid;

use crate::AppState;

/// Verify the workspace token presented by the caller for an action needing `required`
pub(crate) fn check_workspace(
    state: &AppState,
    auth: &AuthContext,
    workspace_token: &str,
    required: WorkspaceRole,
) -> Result<WorkspaceAccess> {
    let access = state
        .workspace_tokens
        .verify(workspace_token, &auth.user_id, required)
        .inspect_err(|e| {
            tracing::warn!(
                user_id = %auth.user_id,
                request_id = %auth.request_id,
                error = %e,
                "Workspace token rejected"
            );
        })?;

    if access.refreshed {
        metrics::record_tokens_issued(1, "refreshed");
    }

    Ok(access)
}

/// Record id from a request; a malformed id names no record
pub(crate) fn parse_id(resource_type: &str, raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found(resource_type, raw))
}
