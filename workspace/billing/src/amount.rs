use model::entities::{bill, bill_line};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::{debug, instrument, trace};

use crate::error::{BillingError, Result};
use crate::money::ensure_storable;

/// Sums line totals. The sum must fit the `amount` column.
pub fn sum_totals(lines: &[bill_line::Model]) -> Result<Decimal> {
    let amount = lines.iter().try_fold(Decimal::ZERO, |sum, line| {
        sum.checked_add(line.total).ok_or(BillingError::AmountOutOfRange {
            field: "amount",
            value: line.total,
        })
    })?;
    ensure_storable("amount", amount)?;
    Ok(amount)
}

/// Recomputes `bill.amount` from the lines currently stored for the bill and
/// writes it back when it changed.
///
/// Called after every line mutation and every bill save, inside the
/// transaction of the triggering write.
#[instrument(skip(db, bill), fields(bill_id = bill.id))]
pub async fn recompute_bill_amount<C: ConnectionTrait>(
    db: &C,
    bill: bill::Model,
) -> Result<bill::Model> {
    trace!("Loading lines of bill {}", bill.id);
    let lines = bill_line::Entity::find()
        .filter(bill_line::Column::BillId.eq(bill.id))
        .all(db)
        .await?;

    let amount = sum_totals(&lines)?;
    if amount == bill.amount {
        trace!("Amount of bill {} unchanged at {}", bill.id, amount);
        return Ok(bill);
    }

    debug!(
        "Amount of bill {} changes from {} to {} over {} lines",
        bill.id,
        bill.amount,
        amount,
        lines.len()
    );
    let mut active: bill::ActiveModel = bill.into();
    active.amount = Set(amount);
    Ok(active.update(db).await?)
}

/// Like [`recompute_bill_amount`], looking the bill up first.
pub async fn recompute_bill_amount_by_id<C: ConnectionTrait>(
    db: &C,
    bill_id: i32,
) -> Result<bill::Model> {
    let bill = bill::Entity::find_by_id(bill_id)
        .one(db)
        .await?
        .ok_or(BillingError::BillNotFound(bill_id))?;
    recompute_bill_amount(db, bill).await
}
