//! # Order Numbers
//!
//! Human-readable order identifiers of the form `ORD-YYYYMMDD-<order id>`.
//!
//! The id part is the order's own generated primary key, so the number can
//! only be built after the order row exists. Checkout therefore inserts the
//! order, then updates the same row with its number, inside one transaction.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use shopfront_core::OrderNumber;
//!
//! let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
//! let number = OrderNumber::new(date, 1042);
//! assert_eq!(number.to_string(), "ORD-20250307-1042");
//! assert_eq!("ORD-20250307-1042".parse::<OrderNumber>().unwrap(), number);
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::ValidationError;

const PREFIX: &str = "ORD";
const DATE_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderNumber {
    date: NaiveDate,
    order_id: i64,
}

impl OrderNumber {
    pub const fn new(date: NaiveDate, order_id: i64) -> Self {
        OrderNumber { date, order_id }
    }

    /// The processing date encoded in the number.
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    pub const fn order_id(&self) -> i64 {
        self.order_id
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            PREFIX,
            self.date.format(DATE_FORMAT),
            self.order_id
        )
    }
}

impl FromStr for OrderNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "orderNumber".to_string(),
            reason: reason.to_string(),
        };

        let mut parts = s.splitn(3, '-');
        let (Some(prefix), Some(date), Some(id)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("expected ORD-YYYYMMDD-<id>"));
        };

        if prefix != PREFIX {
            return Err(invalid("must start with ORD-"));
        }

        if date.len() != 8 {
            return Err(invalid("date must be YYYYMMDD"));
        }
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|_| invalid("date must be YYYYMMDD"))?;

        if !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("order id must be a positive integer"));
        }
        let order_id: i64 = id
            .parse()
            .map_err(|_| invalid("order id must be a positive integer"))?;
        if order_id <= 0 {
            return Err(invalid("order id must be a positive integer"));
        }

        Ok(OrderNumber { date, order_id })
    }
}
