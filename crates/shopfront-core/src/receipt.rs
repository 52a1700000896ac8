//! # Purchase Receipt
//!
//! Renders a committed order as a printable plain-text receipt.
//!
//! ```text
//! PURCHASE RECEIPT
//! ========================================
//! Order:  ORD-20250307-12
//! Date:   2025-03-07 14:05 UTC
//! Buyer:  Ana Ruiz
//! Email:  ana@example.com
//! ----------------------------------------
//! 1. Ceramic Mug x2 - $8.00
//! 2. Green Tea x1 - $3.50
//! ----------------------------------------
//! TOTAL                             $19.50
//! ```

use std::fmt::Write;

use crate::types::{Order, OrderDetail};

const WIDTH: usize = 40;

/// Renders `detail` as receipt text. Always ends with a newline.
pub fn render_receipt(detail: &OrderDetail) -> String {
    let order = &detail.order;
    let rule = "-".repeat(WIDTH);
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "PURCHASE RECEIPT");
    let _ = writeln!(out, "{}", "=".repeat(WIDTH));
    let _ = writeln!(out, "Order:  {}", display_number(order));
    let _ = writeln!(
        out,
        "Date:   {}",
        order.created_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(out, "Buyer:  {}", order.buyer_name);
    if let Some(email) = &order.buyer_email {
        let _ = writeln!(out, "Email:  {email}");
    }
    if let Some(phone) = &order.buyer_phone {
        let _ = writeln!(out, "Phone:  {phone}");
    }
    let _ = writeln!(out, "{rule}");

    for (index, item) in detail.items.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} x{} - {}",
            index + 1,
            item.product_name,
            item.quantity,
            item.unit_price()
        );
    }

    let _ = writeln!(out, "{rule}");
    let total = order.total().to_string();
    let label = "TOTAL";
    let pad = WIDTH.saturating_sub(label.len() + total.len()).max(1);
    let _ = writeln!(out, "{label}{}{total}", " ".repeat(pad));

    out
}

/// Download file name for an order's receipt: `<order_number>.txt`.
pub fn receipt_file_name(order: &Order) -> String {
    format!("{}.txt", display_number(order))
}

fn display_number(order: &Order) -> String {
    order
        .order_number
        .clone()
        .unwrap_or_else(|| format!("order-{}", order.id))
}
