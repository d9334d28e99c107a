//! Authentication and authorization utilities
//!
//! Provides:
//! - User token (JWT) validation and the `AuthContext` extractor
//! - Workspace token issuing, verification, and refresh
//! - Workspace roles

use crate::errors::{AppError, Result};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Role a user holds inside a workspace, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceRole {
    Editor,
    Admin,
}

impl WorkspaceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceRole::Editor => "editor",
            WorkspaceRole::Admin => "admin",
        }
    }

    /// Whether this role may perform an action requiring `required`
    pub fn satisfies(&self, required: WorkspaceRole) -> bool {
        *self >= required
    }
}

impl fmt::Display for WorkspaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkspaceRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "editor" => Ok(WorkspaceRole::Editor),
            "admin" => Ok(WorkspaceRole::Admin),
            other => Err(AppError::InvalidInput {
                message: format!("Unknown workspace role: {}", other),
                field: Some("role".to_string()),
            }),
        }
    }
}

/// A workspace token together with the role it asserts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkspaceTokenEntry {
    pub role: WorkspaceRole,
    pub token: String,
}

/// Workspace tokens keyed by workspace id
pub type WorkspaceTokenMap = BTreeMap<String, WorkspaceTokenEntry>;

/// Kind of a signed token; user and workspace tokens may share a secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Id,
    Workspace,
}

/// HS256 with no expiry leeway
fn strict_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

/// Extracted authentication context available to handlers
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Authenticated user ID (token subject)
    pub user_id: String,

    /// Request ID for tracing
    pub request_id: String,
}

/// User token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct UserClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Always `id`
    pub typ: TokenKind,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// User token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Generate a new user token
    pub fn generate_token(&self, user_id: &str) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = UserClaims {
            sub: user_id.to_string(),
            typ: TokenKind::Id,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a user token
    pub fn validate_token(&self, token: &str) -> Result<UserClaims> {
        let claims = decode::<UserClaims>(token, &self.decoding_key, &strict_validation())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::Unauthenticated {
                    message: "Auth token expired".to_string(),
                },
                _ => AppError::Unauthenticated {
                    message: "Invalid auth token".to_string(),
                },
            })?;

        if claims.typ != TokenKind::Id {
            return Err(AppError::Unauthenticated {
                message: "Invalid auth token".to_string(),
            });
        }

        Ok(claims)
    }
}

/// Workspace token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkspaceClaims {
    /// Subject (user ID)
    pub sub: String,

    pub workspace_id: String,

    pub role: WorkspaceRole,

    /// Always `workspace`
    pub typ: TokenKind,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Token ID, unique per issue
    pub jti: String,
}

/// Outcome of a successful workspace token check
#[derive(Debug, Clone)]
pub struct WorkspaceAccess {
    pub workspace_id: String,
    pub user_id: String,
    pub role: WorkspaceRole,

    /// Token to hand back to the caller, refreshed when close to expiry
    pub token: String,

    pub refreshed: bool,
}

impl WorkspaceAccess {
    /// Token map to attach to every reply made under this access
    pub fn workspace_tokens(&self) -> WorkspaceTokenMap {
        let mut tokens = WorkspaceTokenMap::new();
        tokens.insert(
            self.workspace_id.clone(),
            WorkspaceTokenEntry {
                role: self.role,
                token: self.token.clone(),
            },
        );
        tokens
    }
}

/// Issues and verifies workspace tokens
pub struct WorkspaceTokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
    refresh_window_secs: i64,
}

impl WorkspaceTokenManager {
    pub fn new(secret: &str, expiration_secs: u64, refresh_window_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
            refresh_window_secs: refresh_window_secs as i64,
        }
    }

    /// Issue a token asserting `role` for `user_id` in `workspace_id`
    pub fn issue(&self, user_id: &str, workspace_id: &str, role: WorkspaceRole) -> Result<String> {
        self.issue_at(user_id, workspace_id, role, Utc::now())
    }

    /// Issue a token whose lifetime starts at `issued_at`
    pub fn issue_at(
        &self,
        user_id: &str,
        workspace_id: &str,
        role: WorkspaceRole,
        issued_at: DateTime<Utc>,
    ) -> Result<String> {
        let exp = issued_at + Duration::seconds(self.expiration_secs);

        let claims = WorkspaceClaims {
            sub: user_id.to_string(),
            workspace_id: workspace_id.to_string(),
            role,
            typ: TokenKind::Workspace,
            exp: exp.timestamp(),
            iat: issued_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to issue workspace token: {}", e),
        })
    }

    /// Decode a workspace token without checking who presents it
    pub fn decode(&self, token: &str) -> Result<WorkspaceClaims> {
        let claims = decode::<WorkspaceClaims>(token, &self.decoding_key, &strict_validation())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::WorkspaceTokenExpired,
                _ => AppError::InvalidWorkspaceToken {
                    message: e.to_string(),
                },
            })?;

        if claims.typ != TokenKind::Workspace {
            return Err(AppError::InvalidWorkspaceToken {
                message: "not a workspace token".to_string(),
            });
        }

        Ok(claims)
    }

    /// Check that `token` belongs to `user_id` and grants at least `required`
    pub fn verify(
        &self,
        token: &str,
        user_id: &str,
        required: WorkspaceRole,
    ) -> Result<WorkspaceAccess> {
        let claims = self.decode(token)?;

        if claims.sub != user_id {
            return Err(AppError::InvalidWorkspaceToken {
                message: "token was issued to another user".to_string(),
            });
        }

        if !claims.role.satisfies(required) {
            return Err(AppError::PermissionDenied {
                required: required.to_string(),
                actual: claims.role.to_string(),
            });
        }

        let remaining = claims.exp - Utc::now().timestamp();
        let (token, refreshed) = if remaining < self.refresh_window_secs {
            tracing::debug!(
                workspace_id = %claims.workspace_id,
                user_id = %user_id,
                remaining_secs = remaining,
                "Refreshing workspace token"
            );
            (self.issue(user_id, &claims.workspace_id, claims.role)?, true)
        } else {
            (token.to_string(), false)
        };

        Ok(WorkspaceAccess {
            workspace_id: claims.workspace_id,
            user_id: claims.sub,
            role: claims.role,
            token,
            refreshed,
        })
    }
}

/// Extract the token from a Bearer Authorization header
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Axum extractor for AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
    Arc<JwtManager>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        // Extract request ID
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthenticated {
                message: "Missing Authorization header".to_string(),
            })?;

        let token = extract_bearer(auth_header).ok_or_else(|| AppError::Unauthenticated {
            message: "Authorization header must carry a Bearer token".to_string(),
        })?;

        let jwt = Arc::<JwtManager>::from_ref(state);
        let claims = jwt.validate_token(token)?;

        Ok(AuthContext {
            user_id: claims.sub,
            request_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> WorkspaceTokenManager {
        WorkspaceTokenManager::new("workspace_secret", 3600, 300)
    }

    #[test]
    fn test_role_ordering() {
        assert!(WorkspaceRole::Admin.satisfies(WorkspaceRole::Editor));
        assert!(WorkspaceRole::Admin.satisfies(WorkspaceRole::Admin));
        assert!(!WorkspaceRole::Editor.satisfies(WorkspaceRole::Admin));
        assert_eq!("admin".parse::<WorkspaceRole>().unwrap(), WorkspaceRole::Admin);
        assert!("owner".parse::<WorkspaceRole>().is_err());
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("abc.def"), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_user_token_roundtrip() {
        let jwt = JwtManager::new("test_secret", 3600);
        let token = jwt.generate_token("user-1").unwrap();
        let claims = jwt.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "user-1");

        let other = JwtManager::new("other_secret", 3600);
        let err = other.validate_token(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated { .. }));
    }

    #[test]
    fn test_verify_workspace_token() {
        let tokens = manager();
        let token = tokens.issue("user-1", "ws-1", WorkspaceRole::Editor).unwrap();

        let access = tokens.verify(&token, "user-1", WorkspaceRole::Editor).unwrap();
        assert_eq!(access.workspace_id, "ws-1");
        assert_eq!(access.role, WorkspaceRole::Editor);
        assert!(!access.refreshed);
        assert_eq!(access.token, token);

        let map = access.workspace_tokens();
        assert_eq!(map["ws-1"].token, token);
        assert_eq!(map["ws-1"].role, WorkspaceRole::Editor);
    }

    #[test]
    fn test_verify_rejects_insufficient_role() {
        let tokens = manager();
        let token = tokens.issue("user-1", "ws-1", WorkspaceRole::Editor).unwrap();

        let err = tokens.verify(&token, "user-1", WorkspaceRole::Admin).unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied { .. }));
    }

    #[test]
    fn test_verify_rejects_other_user() {
        let tokens = manager();
        let token = tokens.issue("user-1", "ws-1", WorkspaceRole::Admin).unwrap();

        let err = tokens.verify(&token, "user-2", WorkspaceRole::Editor).unwrap_err();
        assert!(matches!(err, AppError::InvalidWorkspaceToken { .. }));
    }

    #[test]
    fn test_verify_rejects_garbage_and_foreign_secret() {
        let tokens = manager();
        let err = tokens.verify("not-a-token", "user-1", WorkspaceRole::Editor).unwrap_err();
        assert!(matches!(err, AppError::InvalidWorkspaceToken { .. }));

        let foreign = WorkspaceTokenManager::new("someone_else", 3600, 300)
            .issue("user-1", "ws-1", WorkspaceRole::Admin)
            .unwrap();
        let err = tokens.verify(&foreign, "user-1", WorkspaceRole::Editor).unwrap_err();
        assert!(matches!(err, AppError::InvalidWorkspaceToken { .. }));
    }

    #[test]
    fn test_recently_expired_workspace_token() {
        // 3600s lifetime started 3630s ago: expired 30s ago, inside the refresh window
        let tokens = manager();
        let token = tokens
            .issue_at(
                "user-1",
                "ws-1",
                WorkspaceRole::Admin,
                Utc::now() - Duration::seconds(3630),
            )
            .unwrap();

        let err = tokens.verify(&token, "user-1", WorkspaceRole::Editor).unwrap_err();
        assert!(matches!(err, AppError::WorkspaceTokenExpired));
    }

    #[test]
    fn test_token_kinds_are_not_interchangeable() {
        // Same secret for both kinds
        let jwt = JwtManager::new("shared", 3600);
        let tokens = WorkspaceTokenManager::new("shared", 3600, 300);

        let workspace_token = tokens.issue("user-1", "ws-1", WorkspaceRole::Editor).unwrap();
        let err = jwt.validate_token(&workspace_token).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated { .. }));

        let id_token = jwt.generate_token("user-1").unwrap();
        let err = tokens.verify(&id_token, "user-1", WorkspaceRole::Editor).unwrap_err();
        assert!(matches!(err, AppError::InvalidWorkspaceToken { .. }));
    }

    #[test]
    fn test_near_expiry_token_is_refreshed() {
        // Issued for 60s, refresh window of 300s
        let tokens = WorkspaceTokenManager::new("workspace_secret", 60, 300);
        let token = tokens.issue("user-1", "ws-1", WorkspaceRole::Admin).unwrap();

        let access = tokens.verify(&token, "user-1", WorkspaceRole::Editor).unwrap();
        assert!(access.refreshed);
        assert_ne!(access.token, token);

        let claims = tokens.decode(&access.token).unwrap();
        assert_eq!(claims.workspace_id, "ws-1");
        assert_eq!(claims.role, WorkspaceRole::Admin);
    }
}
