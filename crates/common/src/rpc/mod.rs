//! Function-call plumbing shared by the gateway and the client
//!
//! Provides:
//! - The `{ success, data, error, workspace_tokens }` envelope
//! - The `Payload` extractor and required-field checks
//! - `Reply`, which attaches workspace tokens to every answer given under
//!   a verified workspace token

use std::future::Future;

use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::{WorkspaceAccess, WorkspaceTokenMap};
use crate::errors::{AppError, ErrorDetails, Result};

/// Reply body of every function
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_tokens: Option<WorkspaceTokenMap>,
}

impl<T> Envelope<T> {
    pub fn success(data: T, workspace_tokens: Option<WorkspaceTokenMap>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            workspace_tokens,
        }
    }

    pub fn failure(error: ErrorDetails, workspace_tokens: Option<WorkspaceTokenMap>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            workspace_tokens,
        }
    }

    /// Unwrap a received envelope into its data or the reported error
    pub fn into_result(self) -> Result<T> {
        match (self.success, self.data, self.error) {
            (true, Some(data), _) => Ok(data),
            (_, _, Some(error)) => Err(error.into()),
            _ => Err(AppError::Internal {
                message: "Envelope carries neither data nor error".to_string(),
            }),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Error reply, carrying workspace tokens once the token has been verified
#[derive(Debug)]
pub struct RpcError {
    pub error: AppError,
    pub workspace_tokens: Option<WorkspaceTokenMap>,
}

impl From<AppError> for RpcError {
    fn from(error: AppError) -> Self {
        Self {
            error,
            workspace_tokens: None,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        self.error.into_envelope_response(self.workspace_tokens)
    }
}

/// Handler result type
pub type RpcResult<T> = std::result::Result<Envelope<T>, RpcError>;

/// Builds replies for a call made under a verified workspace token
#[derive(Debug, Clone)]
pub struct Reply {
    workspace_tokens: WorkspaceTokenMap,
}

impl Reply {
    pub fn new(access: &WorkspaceAccess) -> Self {
        Self::with_tokens(access.workspace_tokens())
    }

    pub fn with_tokens(workspace_tokens: WorkspaceTokenMap) -> Self {
        Self { workspace_tokens }
    }

    pub fn success<T>(&self, data: T) -> Envelope<T> {
        Envelope::success(data, Some(self.workspace_tokens.clone()))
    }

    pub fn fail(&self, error: AppError) -> RpcError {
        RpcError {
            error,
            workspace_tokens: Some(self.workspace_tokens.clone()),
        }
    }

    /// Run the body of a call; both outcomes carry the workspace tokens
    pub async fn run<T, F>(self, body: F) -> RpcResult<T>
    where
        F: Future<Output = Result<T>>,
    {
        match body.await {
            Ok(data) => Ok(self.success(data)),
            Err(error) => Err(self.fail(error)),
        }
    }
}

/// JSON object body of a function call
#[derive(Debug, Clone, Default)]
pub struct Payload(pub Map<String, Value>);

impl Payload {
    /// Check `fields` are present, then deserialize into the typed request
    pub fn require<T: DeserializeOwned>(self, fields: &[&str]) -> Result<T> {
        require_fields(&self.0, fields)?;
        serde_json::from_value(Value::Object(self.0)).map_err(|e| AppError::InvalidInput {
            message: e.to_string(),
            field: None,
        })
    }
}

/// Fail with `MissingField` on the first absent, null, or empty field
pub fn require_fields(payload: &Map<String, Value>, fields: &[&str]) -> Result<()> {
    for field in fields {
        let missing = match payload.get(*field) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        };

        if missing {
            return Err(AppError::MissingField {
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|e| AppError::InvalidInput {
                message: e.body_text(),
                field: None,
            })?;

        match value {
            Value::Object(map) => Ok(Payload(map)),
            _ => Err(AppError::InvalidInput {
                message: "Payload must be a JSON object".to_string(),
                field: None,
            }),
        }
    }
}
