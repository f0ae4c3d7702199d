//! Derived-value maintenance for bills.
//!
//! Every write that affects a bill goes through this crate so that, within
//! one database transaction:
//! - a new bill receives the next number from the atomic counter,
//! - a new line receives `service.price * quantity` unless its total is fixed,
//! - the bill amount is recomputed from the lines currently stored.

pub mod amount;
pub mod bills;
pub mod error;
pub mod line_total;
pub mod lines;
pub mod money;
pub mod numbering;

#[cfg(test)]
mod testing;

pub use bills::{BillChanges, BillDetail, NewBill, create_bill, delete_bill, get_bill, update_bill};
pub use error::{BillingError, Result, is_lock_contention};
pub use line_total::LineTotal;
pub use lines::{
    BillLineChanges, LineChange, NewBillLine, add_line, delete_line, lines_of_bill,
    update_line,
};
pub use money::{ensure_non_negative, ensure_storable, validate_amount};
pub use numbering::{format_bill_number, parse_sequence, resync_sequence};
