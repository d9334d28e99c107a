//! Workspace token issuing

use axum::extract::State;

use crate::AppState;
use textspace_common::{
    auth::{AuthContext, WorkspaceTokenEntry, WorkspaceTokenMap},
    functions::{WorkspaceSummary, WorkspacesData},
    metrics,
    rpc::{Envelope, RpcResult},
};

/// Issue a fresh token for every workspace the caller belongs to
pub async fn get_workspace_tokens(
    State(state): State<AppState>,
    auth: AuthContext,
) -> RpcResult<WorkspacesData> {
    let memberships = state.store.list_memberships(&auth.user_id).await?;

    let mut tokens = WorkspaceTokenMap::new();
    let mut workspaces = Vec::with_capacity(memberships.len());

    for member in memberships {
        let role = match member.role() {
            Ok(role) => role,
            Err(e) => {
                tracing::warn!(
                    workspace_id = %member.workspace_id,
                    user_id = %auth.user_id,
                    error = %e,
                    "Skipping membership with unknown role"
                );
                continue;
            }
        };

        let token = state
            .workspace_tokens
            .issue(&auth.user_id, &member.workspace_id, role)?;
        tokens.insert(member.workspace_id.clone(), WorkspaceTokenEntry { role, token });
        workspaces.push(WorkspaceSummary {
            workspace_id: member.workspace_id,
            role,
        });
    }

    metrics::record_tokens_issued(tokens.len(), "issued");
    tracing::info!(
        user_id = %auth.user_id,
        request_id = %auth.request_id,
        count = tokens.len(),
        "Workspace tokens issued"
    );

    Ok(Envelope::success(WorkspacesData { workspaces }, Some(tokens)))
}
