//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Shopfront API                          │
//! │                                                                         │
//! │  Handler                                                               │
//! │  Result<T, ApiError>                                                   │
//! │       │                                                                 │
//! │       ├── CheckoutError::Validation  ──► 400 VALIDATION_ERROR + errors │
//! │       ├── CheckoutError::NotFound    ──► 404 NOT_FOUND                 │
//! │       ├── CheckoutError::Conflict    ──► 409 INSUFFICIENT_STOCK        │
//! │       ├── CheckoutError::Persistence ──► 500 INTERNAL_ERROR (opaque,   │
//! │       │                                   detail only in the log)      │
//! │       ├── auth gate                  ──► 401 UNAUTHORIZED / 403        │
//! │       ├── JSON body rejection        ──► 400 VALIDATION_ERROR (body)   │
//! │       └── body over the limit        ──► 413 PAYLOAD_TOO_LARGE         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Response Body
//! ```json
//! {
//!   "code": "VALIDATION_ERROR",
//!   "message": "Invalid request: buyer.name is required",
//!   "errors": [{ "field": "buyer.name", "message": "buyer.name is required" }]
//! }
//! ```

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use shopfront_core::FieldError;
use shopfront_db::{CheckoutError, DbError};

/// The message every persistence failure is reported with.
pub const PERSISTENCE_MESSAGE: &str = "Could not create the order";

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Missing or invalid bearer token (401)
    Unauthorized,

    /// Authenticated but not allowed (403)
    Forbidden,

    /// Resource not found (404)
    NotFound,

    /// Stock does not cover the request (409)
    InsufficientStock,

    /// Request body over the configured limit (413)
    PayloadTooLarge,

    /// Internal server error (500)
    InternalError,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InsufficientStock => StatusCode::CONFLICT,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error returned from handlers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Per-field detail, validation errors only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            errors: None,
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{resource} not found: {id}"))
    }

    /// Creates a single-field validation error.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        ApiError {
            code: ErrorCode::ValidationError,
            message: format!("Invalid request: {message}"),
            errors: Some(vec![FieldError {
                field: field.to_string(),
                message,
            }]),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    /// Creates an internal error. The detail is logged, never returned.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        error!(error = %detail, "Internal error");
        ApiError::new(ErrorCode::InternalError, "Internal server error")
    }
}

/// Converts checkout errors to API errors.
impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Validation(errors) => ApiError {
                code: ErrorCode::ValidationError,
                message: errors.to_string(),
                errors: Some(errors.field_errors()),
            },
            CheckoutError::NotFound { product_id } => ApiError::not_found("Product", product_id),
            err @ CheckoutError::Conflict { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            // Already logged by the checkout service.
            CheckoutError::Persistence(_) => {
                ApiError::new(ErrorCode::InternalError, PERSISTENCE_MESSAGE)
            }
        }
    }
}

/// Converts database errors from read paths to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, id),
            other => ApiError::internal(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::new(ErrorCode::PayloadTooLarge, "Request body too large");
        }
        match json_data_error(&rejection) {
            Some((field, message)) => ApiError::invalid_field(&field, message),
            None => ApiError::invalid_field("body", rejection.body_text()),
        }
    }
}

/// Field path and message of a JSON body that parsed but did not fit the
/// request type, e.g. `items[0].productId`.
fn json_data_error(rejection: &JsonRejection) -> Option<(String, String)> {
    let JsonRejection::JsonDataError(err) = rejection else {
        return None;
    };

    let mut source = std::error::Error::source(err);
    while let Some(e) = source {
        if let Some(path_err) = e.downcast_ref::<serde_path_to_error::Error<serde_json::Error>>() {
            let field = path_err.path().to_string();
            if field == "." {
                return None;
            }
            return Some((field, path_err.inner().to_string()));
        }
        source = e.source();
    }
    None
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::invalid_field("id", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::invalid_field("query", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use shopfront_core::{ValidationError, ValidationErrors};

    use super::*;

    #[test]
    fn test_checkout_error_mapping() {
        let err: ApiError = CheckoutError::NotFound { product_id: 99999 }.into();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(err.message.contains("99999"));

        let err: ApiError = CheckoutError::Conflict {
            product_id: 3,
            name: "Mug".to_string(),
            available: 0,
            requested: 1,
        }
        .into();
        assert_eq!(err.code.status(), StatusCode::CONFLICT);
        assert!(err.message.contains("Mug"));

        let err: ApiError = CheckoutError::Persistence(DbError::LockTimeout).into();
        assert_eq!(err.code, ErrorCode::InternalError);
        assert_eq!(err.message, PERSISTENCE_MESSAGE);
    }

    #[test]
    fn test_validation_body_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.push(ValidationError::Required {
            field: "items".to_string(),
        });
        let err: ApiError = CheckoutError::Validation(errors).into();

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["errors"][0]["field"], "items");
    }

    #[test]
    fn test_non_validation_body_has_no_errors_key() {
        let json = serde_json::to_value(ApiError::forbidden("Admin role required")).unwrap();
        assert_eq!(json["code"], "FORBIDDEN");
        assert!(json.get("errors").is_none());
    }
}
