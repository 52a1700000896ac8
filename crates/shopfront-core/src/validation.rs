//! # Validation Module
//!
//! Checkout request validation. Runs before any transaction is opened, so a
//! rejected request has no side effects at all.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (serde)                                       │
//! │  ├── Body must be JSON with the right shapes                           │
//! │  └── Missing buyer / items default so they surface below               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── buyer.name / buyer.email / buyer.phone                            │
//! │  └── items non-empty, bounded, positive ids and quantities             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (PostgreSQL)                                        │
//! │  ├── CHECK (stock_quantity >= 0), CHECK (quantity > 0)                 │
//! │  ├── UNIQUE (order_number)                                             │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shopfront_core::types::{Buyer, CheckoutLine, CheckoutRequest};
//! use shopfront_core::validation::validate_checkout;
//!
//! let request = CheckoutRequest {
//!     buyer: Buyer { name: "  Ana Ruiz ".into(), email: None, phone: Some("".into()) },
//!     items: vec![CheckoutLine::new(1, 2)],
//! };
//! let valid = validate_checkout(&request).unwrap();
//! assert_eq!(valid.buyer.name, "Ana Ruiz");
//! assert_eq!(valid.buyer.phone, None);
//! ```

use validator::ValidateEmail;

use crate::error::{ValidationError, ValidationErrors};
use crate::types::{Buyer, CheckoutLine, CheckoutRequest, ValidatedCheckout};
use crate::{MAX_CHECKOUT_LINES, MAX_ITEM_QUANTITY, MIN_BUYER_NAME_LEN, MIN_BUYER_PHONE_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_BUYER_NAME_LEN: usize = 200;
const MAX_EMAIL_LEN: usize = 254;
const MAX_PHONE_LEN: usize = 32;

// =============================================================================
// Request Validator
// =============================================================================

/// Validates a whole checkout request, collecting every field error.
///
/// ## User Workflow
/// ```text
/// POST /api/checkout
///      │
///      ▼
/// validate_checkout(&request) ← THIS FUNCTION
///      │
///      ├── any field bad? → 400 { errors: [{ field, message }, ...] }
///      │
///      └── OK → ValidatedCheckout (trimmed buyer, lines) → CheckoutService
/// ```
pub fn validate_checkout(request: &CheckoutRequest) -> Result<ValidatedCheckout, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = collect(&mut errors, validate_buyer_name(&request.buyer.name));
    let email = collect(&mut errors, validate_email(request.buyer.email.as_deref()));
    let phone = collect(&mut errors, validate_phone(request.buyer.phone.as_deref()));

    validate_lines(&request.items, &mut errors);

    errors.into_result()?;

    Ok(ValidatedCheckout {
        buyer: Buyer {
            name: name.unwrap_or_default(),
            email: email.flatten(),
            phone: phone.flatten(),
        },
        lines: request.items.clone(),
    })
}

fn collect<T>(errors: &mut ValidationErrors, result: ValidationResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            errors.push(err);
            None
        }
    }
}

// =============================================================================
// Buyer Validators
// =============================================================================

/// Validates the buyer's name.
///
/// ## Rules
/// - Trimmed before checking
/// - Required, at least 2 and at most 200 characters
///
/// ## Returns
/// The trimmed name.
pub fn validate_buyer_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "buyer.name".to_string(),
        });
    }

    let len = name.chars().count();
    if len < MIN_BUYER_NAME_LEN {
        return Err(ValidationError::TooShort {
            field: "buyer.name".to_string(),
            min: MIN_BUYER_NAME_LEN,
        });
    }

    if len > MAX_BUYER_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "buyer.name".to_string(),
            max: MAX_BUYER_NAME_LEN,
        });
    }

    Ok(name.to_string())
}

/// Validates an optional e-mail address.
///
/// Absent or blank is fine (`Ok(None)`); anything else must be a
/// syntactically valid address.
///
/// ```rust
/// use shopfront_core::validation::validate_email;
///
/// assert_eq!(validate_email(None), Ok(None));
/// assert_eq!(validate_email(Some("  ")), Ok(None));
/// assert!(validate_email(Some("ana@example.com")).is_ok());
/// assert!(validate_email(Some("not-an-email")).is_err());
/// ```
pub fn validate_email(email: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(email) = non_blank(email) else {
        return Ok(None);
    };

    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(ValidationError::TooLong {
            field: "buyer.email".to_string(),
            max: MAX_EMAIL_LEN,
        });
    }

    let email = email.to_string();
    if !email.validate_email() {
        return Err(ValidationError::InvalidFormat {
            field: "buyer.email".to_string(),
            reason: "must be a valid e-mail address".to_string(),
        });
    }

    Ok(Some(email))
}

/// Validates an optional phone number: at least 6 characters when present.
pub fn validate_phone(phone: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(phone) = non_blank(phone) else {
        return Ok(None);
    };

    let len = phone.chars().count();
    if len < MIN_BUYER_PHONE_LEN {
        return Err(ValidationError::TooShort {
            field: "buyer.phone".to_string(),
            min: MIN_BUYER_PHONE_LEN,
        });
    }

    if len > MAX_PHONE_LEN {
        return Err(ValidationError::TooLong {
            field: "buyer.phone".to_string(),
            max: MAX_PHONE_LEN,
        });
    }

    Ok(Some(phone.to_string()))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// Line Validators
// =============================================================================

/// Validates the requested lines, pushing one error per bad field.
///
/// ## Rules
/// - At least one line, at most [`MAX_CHECKOUT_LINES`]
/// - `productId` > 0
/// - `quantity` between 1 and [`MAX_ITEM_QUANTITY`]
pub fn validate_lines(lines: &[CheckoutLine], errors: &mut ValidationErrors) {
    if lines.is_empty() {
        errors.push(ValidationError::Required {
            field: "items".to_string(),
        });
        return;
    }

    if lines.len() > MAX_CHECKOUT_LINES {
        errors.push(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_CHECKOUT_LINES as i64,
        });
        return;
    }

    for (index, line) in lines.iter().enumerate() {
        if let Err(err) = validate_product_id(index, line.product_id) {
            errors.push(err);
        }
        if let Err(err) = validate_quantity(index, line.quantity) {
            errors.push(err);
        }
    }
}

/// Validates the product id of line `index`.
pub fn validate_product_id(index: usize, product_id: i64) -> ValidationResult<()> {
    if product_id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: format!("items[{index}].productId"),
        });
    }

    Ok(())
}

/// Validates the quantity of line `index`.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(index: usize, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: format!("items[{index}].quantity"),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: format!("items[{index}].quantity"),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, items: Vec<CheckoutLine>) -> CheckoutRequest {
        CheckoutRequest {
            buyer: Buyer {
                name: name.to_string(),
                email: None,
                phone: None,
            },
            items,
        }
    }

    #[test]
    fn test_validate_buyer_name() {
        assert_eq!(validate_buyer_name("  Ana  ").unwrap(), "Ana");
        assert!(validate_buyer_name("Al").is_ok());

        assert!(matches!(
            validate_buyer_name("   "),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_buyer_name(" A "),
            Err(ValidationError::TooShort { min: 2, .. })
        ));
        assert!(validate_buyer_name(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(
            validate_email(Some(" ana@example.com ")).unwrap(),
            Some("ana@example.com".to_string())
        );
        assert_eq!(validate_email(Some("")).unwrap(), None);

        let err = validate_email(Some("ana@")).unwrap_err();
        assert_eq!(err.field(), "buyer.email");
    }

    #[test]
    fn test_validate_phone() {
        assert_eq!(validate_phone(None).unwrap(), None);
        assert_eq!(
            validate_phone(Some("555-0100")).unwrap(),
            Some("555-0100".to_string())
        );
        assert!(matches!(
            validate_phone(Some("12345")),
            Err(ValidationError::TooShort { min: 6, .. })
        ));
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(0, 1).is_ok());
        assert!(validate_quantity(0, 999).is_ok());

        assert!(validate_quantity(0, 0).is_err());
        assert!(validate_quantity(0, -1).is_err());
        assert!(validate_quantity(0, 1000).is_err());
        assert_eq!(
            validate_quantity(3, 0).unwrap_err().field(),
            "items[3].quantity"
        );
    }

    #[test]
    fn test_empty_items_rejected() {
        let errors = validate_checkout(&request("Ana", vec![])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.has_field("items"));
    }

    #[test]
    fn test_too_many_lines_rejected() {
        let lines = vec![CheckoutLine::new(1, 1); MAX_CHECKOUT_LINES + 1];
        let errors = validate_checkout(&request("Ana", lines)).unwrap_err();
        assert!(errors.has_field("items"));
    }

    #[test]
    fn test_all_field_errors_are_reported_together() {
        let mut req = request(
            "A",
            vec![CheckoutLine::new(0, 1), CheckoutLine::new(5, 0)],
        );
        req.buyer.email = Some("nope".to_string());
        req.buyer.phone = Some("123".to_string());

        let errors = validate_checkout(&req).unwrap_err();
        assert!(errors.has_field("buyer.name"));
        assert!(errors.has_field("buyer.email"));
        assert!(errors.has_field("buyer.phone"));
        assert!(errors.has_field("items[0].productId"));
        assert!(errors.has_field("items[1].quantity"));
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn test_valid_request_is_normalized() {
        let mut req = request(" Ana Ruiz ", vec![CheckoutLine::new(7, 2)]);
        req.buyer.email = Some("  ".to_string());
        req.buyer.phone = Some(" 5550100 ".to_string());

        let valid = validate_checkout(&req).unwrap();
        assert_eq!(valid.buyer.name, "Ana Ruiz");
        assert_eq!(valid.buyer.email, None);
        assert_eq!(valid.buyer.phone.as_deref(), Some("5550100"));
        assert_eq!(valid.lines, vec![CheckoutLine::new(7, 2)]);
    }
}
