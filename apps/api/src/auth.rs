//! JWT authentication module.
//!
//! Validates admin bearer tokens for the order routes. Tokens are issued
//! elsewhere; [`JwtManager::generate_access_token`] exists for operators and
//! tests.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Role allowed to read and export orders.
pub const ADMIN_ROLE: &str = "admin";

const ACCESS_TOKEN: &str = "access";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Role name, `admin` for the order routes
    pub role: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    /// Token type, only `access` is accepted
    pub token_type: String,
}

/// Why a token was not accepted.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Expected access token")]
    WrongTokenType,

    #[error("Failed to generate token: {0}")]
    Encode(String),
}

/// The authenticated admin, inserted into request extensions by
/// [`require_admin`].
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub subject: String,
}

/// JWT token manager.
pub struct JwtManager {
    secret: String,
    access_lifetime_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager.
    pub fn new(secret: String, access_lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            access_lifetime_secs,
        }
    }

    /// Generate an access token.
    pub fn generate_access_token(&self, subject: &str, role: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_lifetime_secs);

        let claims = Claims {
            sub: subject.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: ACCESS_TOKEN.to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Encode(e.to_string()))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::default();

        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::Invalid(e.to_string()),
        })?;

        Ok(token_data.claims)
    }

    /// Validate that a token is an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.validate_token(token)?;

        if claims.token_type != ACCESS_TOKEN {
            return Err(AuthError::WrongTokenType);
        }

        Ok(claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Admin gate for the order routes.
///
/// | Request | Result |
/// |---------|--------|
/// | no / malformed `Authorization` header | 401 |
/// | invalid, expired or non-access token | 401 |
/// | valid token, role other than `admin` | 403 |
/// | valid admin token | passes, [`AdminUser`] in extensions |
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token);

    let Some(token) = token else {
        warn!(uri = %req.uri(), "Admin request without bearer token");
        return Err(ApiError::unauthorized("Authentication required"));
    };

    let claims = state.jwt.validate_access_token(token).map_err(|e| {
        warn!(uri = %req.uri(), error = %e, "Admin token rejected");
        ApiError::unauthorized(e.to_string())
    })?;

    if claims.role != ADMIN_ROLE {
        warn!(subject = %claims.sub, role = %claims.role, "Admin role required");
        return Err(ApiError::forbidden("Admin role required"));
    }

    debug!(subject = %claims.sub, "Admin authenticated");
    req.extensions_mut().insert(AdminUser {
        subject: claims.sub,
    });

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret".to_string(), 3600);

        let token = manager.generate_access_token("user-001", ADMIN_ROLE).unwrap();
        let claims = manager.validate_access_token(&token).unwrap();

        assert_eq!(claims.sub, "user-001");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.token_type, "access");
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let issuer = JwtManager::new("issuer-secret".to_string(), 3600);
        let verifier = JwtManager::new("other-secret".to_string(), 3600);

        let token = issuer.generate_access_token("user-001", ADMIN_ROLE).unwrap();
        assert!(matches!(
            verifier.validate_access_token(&token),
            Err(AuthError::Invalid(_))
        ));
    }

    #[test]
    fn test_expired_token() {
        // Well past the default 60 s leeway.
        let manager = JwtManager::new("test-secret".to_string(), -600);

        let token = manager.generate_access_token("user-001", ADMIN_ROLE).unwrap();
        assert!(matches!(
            manager.validate_access_token(&token),
            Err(AuthError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_require_admin_exposes_subject_to_handlers() {
        use axum::body::Body;
        use axum::routing::get;
        use axum::{middleware, Extension, Router};
        use http_body_util::BodyExt;
        use shopfront_db::MemoryStore;
        use tower::ServiceExt;

        use crate::config::ApiConfig;

        let config = ApiConfig::from_lookup(|key| match key {
            "JWT_SECRET" => Some("test-secret".to_string()),
            "SHOPFRONT_STORE" => Some("memory".to_string()),
            _ => None,
        })
        .unwrap();
        let state = AppState::memory(MemoryStore::new(), config);
        let token = state.jwt.generate_access_token("ops-7", ADMIN_ROLE).unwrap();

        let app = Router::new()
            .route(
                "/whoami",
                get(|Extension(admin): Extension<AdminUser>| async move { admin.subject }),
            )
            .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
            .with_state(state);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/whoami")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"ops-7");
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic dXNlcg=="), None);
    }
}
