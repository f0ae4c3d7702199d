use model::entities::{bill, bill_line, service};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::amount::recompute_bill_amount;
use crate::error::{BillingError, Result};
use crate::line_total::LineTotal;
use crate::money::validate_amount;

/// A line to add to a bill.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBillLine {
    pub service_id: i32,
    pub quantity: i32,
    pub total: LineTotal,
}

impl NewBillLine {
    /// A line whose total is computed from the service price.
    pub fn new(service_id: i32, quantity: i32) -> Self {
        Self {
            service_id,
            quantity,
            total: LineTotal::Pending,
        }
    }

    /// A line whose total is fixed by the caller.
    pub fn with_total(service_id: i32, quantity: i32, total: Decimal) -> Self {
        Self {
            service_id,
            quantity,
            total: LineTotal::Fixed(total),
        }
    }
}

/// Changes to an existing line.
///
/// The stored total is left alone unless `total` fixes a new one or
/// `recompute_total` asks for `service.price * quantity` to be applied again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillLineChanges {
    pub service_id: Option<i32>,
    pub quantity: Option<i32>,
    pub total: Option<Decimal>,
    pub recompute_total: bool,
}

/// A written line together with its bill, amount already recomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct LineChange {
    pub line: bill_line::Model,
    pub bill: bill::Model,
}

pub(crate) fn validate_quantity(quantity: i32) -> Result<i16> {
    i16::try_from(quantity)
        .ok()
        .filter(|quantity| *quantity > 0)
        .ok_or(BillingError::InvalidQuantity(quantity))
}

async fn find_service<C: ConnectionTrait>(db: &C, service_id: i32) -> Result<service::Model> {
    service::Entity::find_by_id(service_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            warn!("Bill line refers to non-existent service_id: {}", service_id);
            BillingError::ServiceNotFound(service_id)
        })
}

async fn find_bill<C: ConnectionTrait>(db: &C, bill_id: i32) -> Result<bill::Model> {
    bill::Entity::find_by_id(bill_id)
        .one(db)
        .await?
        .ok_or(BillingError::BillNotFound(bill_id))
}

/// Inserts a line without touching the bill amount. The caller recomputes it
/// before committing.
pub(crate) async fn insert_line<C: ConnectionTrait>(
    db: &C,
    bill_id: i32,
    new_line: NewBillLine,
) -> Result<bill_line::Model> {
    let quantity = validate_quantity(new_line.quantity)?;
    if let LineTotal::Fixed(total) = new_line.total {
        validate_amount("total", total)?;
    }

    let service = find_service(db, new_line.service_id).await?;
    let total = new_line.total.resolve(service.price, quantity)?;
    debug!(
        "Line of {} x {} ({}) on bill {} totals {}",
        quantity, service.reference, service.price, bill_id, total
    );

    let line = bill_line::ActiveModel {
        bill_id: Set(bill_id),
        service_id: Set(service.id),
        quantity: Set(quantity),
        total: Set(total),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(line)
}

/// Lines of a bill, in insertion order.
pub async fn lines_of_bill<C: ConnectionTrait>(db: &C, bill_id: i32) -> Result<Vec<bill_line::Model>> {
    Ok(bill_line::Entity::find()
        .filter(bill_line::Column::BillId.eq(bill_id))
        .order_by_asc(bill_line::Column::Id)
        .all(db)
        .await?)
}

/// Adds a line to a bill and refreshes the bill amount.
#[instrument(skip(db))]
pub async fn add_line(
    db: &DatabaseConnection,
    bill_id: i32,
    new_line: NewBillLine,
) -> Result<LineChange> {
    trace!("Entering add_line for bill_id: {}", bill_id);
    let txn = db.begin().await?;

    let bill = find_bill(&txn, bill_id).await?;
    let line = insert_line(&txn, bill.id, new_line).await?;
    let bill = recompute_bill_amount(&txn, bill).await?;

    txn.commit().await?;
    info!(
        "Added line {} to bill {}, amount is now {}",
        line.id, bill.number, bill.amount
    );
    Ok(LineChange { line, bill })
}

/// Applies changes to a line and refreshes the bill amount.
#[instrument(skip(db))]
pub async fn update_line(
    db: &DatabaseConnection,
    line_id: i32,
    changes: BillLineChanges,
) -> Result<LineChange> {
    trace!("Entering update_line for line_id: {}", line_id);
    let txn = db.begin().await?;

    let existing = bill_line::Entity::find_by_id(line_id)
        .one(&txn)
        .await?
        .ok_or(BillingError::BillLineNotFound(line_id))?;

    let quantity = match changes.quantity {
        Some(quantity) => validate_quantity(quantity)?,
        None => existing.quantity,
    };
    let service_id = changes.service_id.unwrap_or(existing.service_id);

    let total = match (changes.total, changes.recompute_total) {
        (Some(total), _) => {
            validate_amount("total", total)?;
            total
        }
        (None, true) => {
            let service = find_service(&txn, service_id).await?;
            LineTotal::Pending.resolve(service.price, quantity)?
        }
        (None, false) => existing.total,
    };

    // A changed service must exist even when the total is kept
    if service_id != existing.service_id {
        find_service(&txn, service_id).await?;
    }

    let bill_id = existing.bill_id;
    let mut active: bill_line::ActiveModel = existing.into();
    active.service_id = Set(service_id);
    active.quantity = Set(quantity);
    active.total = Set(total);
    let line = active.update(&txn).await?;

    let bill = find_bill(&txn, bill_id).await?;
    let bill = recompute_bill_amount(&txn, bill).await?;

    txn.commit().await?;
    info!(
        "Updated line {} of bill {}, amount is now {}",
        line.id, bill.number, bill.amount
    );
    Ok(LineChange { line, bill })
}

/// Deletes a line and refreshes the amount of the bill it belonged to.
#[instrument(skip(db))]
pub async fn delete_line(db: &DatabaseConnection, line_id: i32) -> Result<bill::Model> {
    trace!("Entering delete_line for line_id: {}", line_id);
    let txn = db.begin().await?;

    let line = bill_line::Entity::find_by_id(line_id)
        .one(&txn)
        .await?
        .ok_or(BillingError::BillLineNotFound(line_id))?;
    let bill_id = line.bill_id;
    line.delete(&txn).await?;

    let bill = find_bill(&txn, bill_id).await?;
    let bill = recompute_bill_amount(&txn, bill).await?;

    txn.commit().await?;
    info!(
        "Deleted line {} of bill {}, amount is now {}",
        line_id, bill.number, bill.amount
    );
    Ok(bill)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bills::{NewBill, create_bill};
    use crate::testing::{insert_coworker, insert_service, january_2025, setup_db};

    async fn empty_bill(db: &DatabaseConnection) -> bill::Model {
        let coworker = insert_coworker(db, "ada").await;
        create_bill(db, NewBill::for_coworker(coworker.id), january_2025())
            .await
            .unwrap()
            .bill
    }

    #[tokio::test]
    async fn test_line_total_is_price_times_quantity() {
        let db = setup_db().await;
        let bill = empty_bill(&db).await;

        for (price, quantity) in [(Decimal::new(10, 0), 3), (Decimal::new(1999, 2), 7), (Decimal::ZERO, 4)] {
            let service = insert_service(&db, "SRV", price).await;
            let change = add_line(&db, bill.id, NewBillLine::new(service.id, quantity))
                .await
                .unwrap();
            assert_eq!(change.line.total, price * Decimal::from(quantity));
        }
    }

    #[tokio::test]
    async fn test_fixed_total_overrides_price() {
        let db = setup_db().await;
        let bill = empty_bill(&db).await;
        let desk = insert_service(&db, "DESK", Decimal::new(10, 0)).await;

        let change = add_line(&db, bill.id, NewBillLine::with_total(desk.id, 3, Decimal::new(25, 0)))
            .await
            .unwrap();

        assert_eq!(change.line.total, Decimal::new(25, 0));
        assert_eq!(change.bill.amount, Decimal::new(25, 0));
    }

    #[tokio::test]
    async fn test_amount_follows_every_line_mutation() {
        let db = setup_db().await;
        let bill = empty_bill(&db).await;
        let desk = insert_service(&db, "DESK", Decimal::new(10, 0)).await;
        let room = insert_service(&db, "ROOM", Decimal::new(45, 0)).await;

        let first = add_line(&db, bill.id, NewBillLine::new(desk.id, 3)).await.unwrap();
        assert_eq!(first.bill.amount, Decimal::new(30, 0));

        let second = add_line(&db, bill.id, NewBillLine::new(room.id, 2)).await.unwrap();
        assert_eq!(second.bill.amount, Decimal::new(120, 0));

        let updated = update_line(
            &db,
            first.line.id,
            BillLineChanges {
                total: Some(Decimal::new(15, 0)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.bill.amount, Decimal::new(105, 0));

        let bill = delete_line(&db, second.line.id).await.unwrap();
        assert_eq!(bill.amount, Decimal::new(15, 0));

        let bill = delete_line(&db, first.line.id).await.unwrap();
        assert_eq!(bill.amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_quantity_change_keeps_total_unless_recomputed() {
        let db = setup_db().await;
        let bill = empty_bill(&db).await;
        let desk = insert_service(&db, "DESK", Decimal::new(10, 0)).await;
        let line = add_line(&db, bill.id, NewBillLine::new(desk.id, 3)).await.unwrap().line;

        let kept = update_line(
            &db,
            line.id,
            BillLineChanges {
                quantity: Some(5),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(kept.line.quantity, 5);
        assert_eq!(kept.line.total, Decimal::new(30, 0));

        let recomputed = update_line(
            &db,
            line.id,
            BillLineChanges {
                recompute_total: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(recomputed.line.total, Decimal::new(50, 0));
        assert_eq!(recomputed.bill.amount, Decimal::new(50, 0));
    }

    #[tokio::test]
    async fn test_invalid_quantities_are_rejected() {
        let db = setup_db().await;
        let bill = empty_bill(&db).await;
        let desk = insert_service(&db, "DESK", Decimal::new(10, 0)).await;

        for quantity in [0, -1, i32::from(i16::MAX) + 1] {
            let result = add_line(&db, bill.id, NewBillLine::new(desk.id, quantity)).await;
            assert!(
                matches!(result, Err(BillingError::InvalidQuantity(q)) if q == quantity),
                "quantity {quantity} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_negative_fixed_total_is_rejected() {
        let db = setup_db().await;
        let bill = empty_bill(&db).await;
        let desk = insert_service(&db, "DESK", Decimal::new(10, 0)).await;

        let result = add_line(&db, bill.id, NewBillLine::with_total(desk.id, 1, Decimal::new(-1, 0))).await;
        assert!(matches!(result, Err(BillingError::NegativeAmount { field: "total", .. })));
    }

    #[tokio::test]
    async fn test_missing_references_are_rejected() {
        let db = setup_db().await;
        let bill = empty_bill(&db).await;
        let desk = insert_service(&db, "DESK", Decimal::new(10, 0)).await;

        let missing_service = add_line(&db, bill.id, NewBillLine::new(999, 1)).await;
        assert!(matches!(missing_service, Err(BillingError::ServiceNotFound(999))));

        let missing_bill = add_line(&db, 999, NewBillLine::new(desk.id, 1)).await;
        assert!(matches!(missing_bill, Err(BillingError::BillNotFound(999))));

        let missing_line = delete_line(&db, 999).await;
        assert!(matches!(missing_line, Err(BillingError::BillLineNotFound(999))));

        // Nothing was written by the failed attempts
        assert!(lines_of_bill(&db, bill.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_price_times_quantity_overflow_is_rejected() {
        let db = setup_db().await;
        let bill = empty_bill(&db).await;
        let huge = insert_service(&db, "HUGE", Decimal::from_i128_with_scale(5 * 10_i128.pow(28), 0)).await;

        let result = add_line(&db, bill.id, NewBillLine::new(huge.id, 2)).await;
        assert!(matches!(result, Err(BillingError::AmountOutOfRange { field: "total", .. })));
        assert!(lines_of_bill(&db, bill.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fixed_totals_that_overflow_the_amount_are_rejected() {
        let db = setup_db().await;
        let bill = empty_bill(&db).await;
        let desk = insert_service(&db, "DESK", Decimal::new(10, 0)).await;

        let huge = Decimal::from_i128_with_scale(5 * 10_i128.pow(28), 0);
        let result = add_line(&db, bill.id, NewBillLine::with_total(desk.id, 1, huge)).await;
        assert!(matches!(result, Err(BillingError::AmountOutOfRange { field: "total", .. })));

        // Each line fits its column, their sum does not fit the bill amount
        let large = Decimal::new(600_000_000_000, 0);
        add_line(&db, bill.id, NewBillLine::with_total(desk.id, 1, large)).await.unwrap();
        let result = add_line(&db, bill.id, NewBillLine::with_total(desk.id, 1, large)).await;
        assert!(matches!(result, Err(BillingError::AmountOutOfRange { field: "amount", .. })));

        let lines = lines_of_bill(&db, bill.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        let stored = bill::Entity::find_by_id(bill.id).one(&db).await.unwrap().unwrap();
        assert_eq!(stored.amount, large);
    }

    #[tokio::test]
    async fn test_recomputed_total_out_of_range_is_rejected() {
        let db = setup_db().await;
        let bill = empty_bill(&db).await;
        let pricey = insert_service(&db, "GOLD", Decimal::new(100_000_000_000, 0)).await;

        let change = add_line(&db, bill.id, NewBillLine::new(pricey.id, 1)).await.unwrap();
        let changes = BillLineChanges {
            quantity: Some(10),
            recompute_total: true,
            ..Default::default()
        };
        let result = update_line(&db, change.line.id, changes).await;
        assert!(matches!(result, Err(BillingError::AmountOutOfRange { field: "total", .. })));
    }
}
