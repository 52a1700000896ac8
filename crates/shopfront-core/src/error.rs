//! # Error Types
//!
//! Domain-specific error types for shopfront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shopfront-core errors (this file)                                     │
//! │  ├── CoreError         - Stock / catalog rule violations               │
//! │  ├── ValidationError   - One bad field                                 │
//! │  └── ValidationErrors  - Every bad field of one request                │
//! │                                                                         │
//! │  shopfront-db errors (separate crate)                                  │
//! │  ├── DbError           - Database operation failures                   │
//! │  └── CheckoutError     - What a checkout attempt returns               │
//! │                                                                         │
//! │  API errors (in app)                                                   │
//! │  └── ApiError          - What the HTTP client sees (serialized)        │
//! │                                                                         │
//! │  Flow: ValidationErrors → CheckoutError → ApiError → Client            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A requested product does not exist.
    ///
    /// ## When This Occurs
    /// - Product ID doesn't exist in database
    /// - Product was soft-deleted
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// Insufficient stock to complete the checkout.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (Mug x5)
    ///      │
    ///      ▼
    /// Locked stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Mug", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Client sees: 409 "Insufficient stock for Mug: available 3, requested 5"
    /// ```
    ///
    /// `requested` is the total demand for the product across every line of
    /// the request, not just the line that tipped it over.
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i64,
        name: String,
        available: i64,
        requested: i64,
    },

    /// The order total does not fit in an i64 cent amount.
    #[error("Order total exceeds the supported amount")]
    AmountOverflow,

    /// Validation error (wraps ValidationErrors).
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

// =============================================================================
// Validation Error
// =============================================================================

/// A single input validation failure, tied to one field path
/// (`buyer.name`, `items[2].quantity`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed e-mail, unreadable body).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// The field path this error refers to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

/// Serialized shape of one field error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl From<&ValidationError> for FieldError {
    fn from(err: &ValidationError) -> Self {
        FieldError {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

/// Every validation failure found in one request.
///
/// Validation does not stop at the first bad field, so a client can fix
/// the whole form in one round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        ValidationErrors(Vec::new())
    }

    pub fn push(&mut self, err: ValidationError) {
        self.0.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// Returns true if any error refers to `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field() == field)
    }

    pub fn field_errors(&self) -> Vec<FieldError> {
        self.0.iter().map(FieldError::from).collect()
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Invalid request: ")?;
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationError> for ValidationErrors {
    fn from(err: ValidationError) -> Self {
        ValidationErrors(vec![err])
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: 7,
            name: "Ceramic Mug".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Ceramic Mug: available 3, requested 5"
        );
        assert_eq!(
            CoreError::ProductNotFound(99999).to_string(),
            "Product not found: 99999"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "buyer.name".to_string(),
        };
        assert_eq!(err.to_string(), "buyer.name is required");
        assert_eq!(err.field(), "buyer.name");

        let err = ValidationError::TooShort {
            field: "buyer.phone".to_string(),
            min: 6,
        };
        assert_eq!(err.to_string(), "buyer.phone must be at least 6 characters");
    }

    #[test]
    fn test_validation_errors_collects_fields() {
        let mut errors = ValidationErrors::new();
        assert!(errors.clone().into_result().is_ok());

        errors.push(ValidationError::Required {
            field: "items".to_string(),
        });
        errors.push(ValidationError::MustBePositive {
            field: "items[0].quantity".to_string(),
        });

        assert_eq!(errors.len(), 2);
        assert!(errors.has_field("items[0].quantity"));
        assert_eq!(
            errors.to_string(),
            "Invalid request: items is required; items[0].quantity must be positive"
        );

        let fields = errors.field_errors();
        assert_eq!(fields[0].field, "items");
        assert_eq!(fields[1].message, "items[0].quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let errors: ValidationErrors = ValidationError::Required {
            field: "buyer.name".to_string(),
        }
        .into();
        let core_err: CoreError = errors.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
