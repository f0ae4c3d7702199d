use rust_decimal::Decimal;

use crate::error::{BillingError, Result};
use crate::money::ensure_storable;

/// How the total of a bill line is obtained when the line is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineTotal {
    /// Compute `unit price * quantity` from the referenced service.
    #[default]
    Pending,
    /// Keep the given total, a zero included.
    Fixed(Decimal),
}

impl LineTotal {
    /// Resolves the total to store for a line of `quantity` units at `unit_price`.
    ///
    /// Fails when the product overflows or does not fit the `total` column.
    pub fn resolve(self, unit_price: Decimal, quantity: i16) -> Result<Decimal> {
        let total = match self {
            LineTotal::Pending => unit_price
                .checked_mul(Decimal::from(quantity))
                .ok_or(BillingError::AmountOutOfRange {
                    field: "total",
                    value: unit_price,
                })?,
            LineTotal::Fixed(total) => total,
        };
        ensure_storable("total", total)?;
        Ok(total)
    }
}

impl From<Option<Decimal>> for LineTotal {
    fn from(total: Option<Decimal>) -> Self {
        total.map_or(LineTotal::Pending, LineTotal::Fixed)
    }
}
