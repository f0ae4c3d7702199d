use chrono::NaiveDate;
use model::entities::{bill, bill_line, user};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::amount::recompute_bill_amount;
use crate::error::{BillingError, Result};
use crate::lines::{NewBillLine, insert_line, lines_of_bill};
use crate::numbering::{format_bill_number, next_sequence};

/// A bill to create, optionally with its first lines.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBill {
    pub user_id: i32,
    pub is_paid: bool,
    pub lines: Vec<NewBillLine>,
}

impl NewBill {
    /// An unpaid bill without lines.
    pub fn for_coworker(user_id: i32) -> Self {
        Self {
            user_id,
            is_paid: false,
            lines: Vec::new(),
        }
    }
}

/// Operator-editable fields of a bill. Number, date and amount are not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillChanges {
    pub user_id: Option<i32>,
    pub is_paid: Option<bool>,
}

/// A bill with its coworker and lines.
#[derive(Debug, Clone, PartialEq)]
pub struct BillDetail {
    pub bill: bill::Model,
    pub coworker: Option<user::Model>,
    pub lines: Vec<bill_line::Model>,
}

impl BillDetail {
    pub fn coworker_name(&self) -> String {
        self.coworker
            .as_ref()
            .map(user::Model::full_name)
            .unwrap_or_default()
    }
}

async fn find_coworker<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<user::Model> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            warn!("Bill refers to non-existent user_id: {}", user_id);
            BillingError::CoworkerNotFound(user_id)
        })
}

async fn load_detail<C: ConnectionTrait>(db: &C, bill: bill::Model) -> Result<BillDetail> {
    let coworker = user::Entity::find_by_id(bill.user_id).one(db).await?;
    let lines = lines_of_bill(db, bill.id).await?;
    Ok(BillDetail {
        bill,
        coworker,
        lines,
    })
}

/// Loads a bill with its coworker and lines.
#[instrument(skip(db))]
pub async fn get_bill<C: ConnectionTrait>(db: &C, bill_id: i32) -> Result<BillDetail> {
    let bill = bill::Entity::find_by_id(bill_id)
        .one(db)
        .await?
        .ok_or(BillingError::BillNotFound(bill_id))?;
    load_detail(db, bill).await
}

/// Creates a bill dated `today`, numbers it and inserts its initial lines,
/// all in one transaction. A failure anywhere rolls the counter back, so no
/// number is consumed.
#[instrument(skip(db, new_bill), fields(user_id = new_bill.user_id, lines = new_bill.lines.len()))]
pub async fn create_bill(
    db: &DatabaseConnection,
    new_bill: NewBill,
    today: NaiveDate,
) -> Result<BillDetail> {
    trace!("Entering create_bill");
    let txn = db.begin().await?;

    // Write first so SQLite takes the write lock up front and queues
    // concurrent creations instead of failing a read-to-write upgrade
    let sequence = next_sequence(&txn).await?;
    let coworker = find_coworker(&txn, new_bill.user_id).await?;
    let number = format_bill_number(today, sequence);
    debug!("Numbering new bill for {} as {}", coworker.username, number);

    let bill = bill::ActiveModel {
        user_id: Set(coworker.id),
        number: Set(number.clone()),
        is_paid: Set(new_bill.is_paid),
        billing_date: Set(today),
        amount: Set(Decimal::ZERO),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|error| BillingError::from_bill_insert(error, &number))?;

    let mut lines = Vec::with_capacity(new_bill.lines.len());
    for new_line in new_bill.lines {
        lines.push(insert_line(&txn, bill.id, new_line).await?);
    }
    let bill = recompute_bill_amount(&txn, bill).await?;

    txn.commit().await?;
    info!(
        "Created bill {} for coworker {} with {} lines, amount {}",
        bill.number,
        coworker.id,
        lines.len(),
        bill.amount
    );

    Ok(BillDetail {
        bill,
        coworker: Some(coworker),
        lines,
    })
}

/// Saves operator changes to a bill and refreshes its amount. The number and
/// billing date are never touched.
#[instrument(skip(db))]
pub async fn update_bill(
    db: &DatabaseConnection,
    bill_id: i32,
    changes: BillChanges,
) -> Result<BillDetail> {
    trace!("Entering update_bill for bill_id: {}", bill_id);
    let txn = db.begin().await?;

    let existing = bill::Entity::find_by_id(bill_id)
        .one(&txn)
        .await?
        .ok_or(BillingError::BillNotFound(bill_id))?;

    let unchanged = existing.clone();
    let mut active: bill::ActiveModel = existing.into();
    if let Some(user_id) = changes.user_id {
        let coworker = find_coworker(&txn, user_id).await?;
        debug!("Reassigning bill {} to coworker {}", bill_id, coworker.id);
        active.user_id = Set(coworker.id);
    }
    if let Some(is_paid) = changes.is_paid {
        debug!("Marking bill {} as paid: {}", bill_id, is_paid);
        active.is_paid = Set(is_paid);
    }

    let bill = if active.is_changed() {
        active.update(&txn).await?
    } else {
        unchanged
    };
    let bill = recompute_bill_amount(&txn, bill).await?;
    let detail = load_detail(&txn, bill).await?;

    txn.commit().await?;
    info!("Updated bill {}", detail.bill.number);
    Ok(detail)
}

/// Deletes a bill together with its lines.
#[instrument(skip(db))]
pub async fn delete_bill(db: &DatabaseConnection, bill_id: i32) -> Result<()> {
    trace!("Entering delete_bill for bill_id: {}", bill_id);
    let txn = db.begin().await?;

    let lines = bill_line::Entity::delete_many()
        .filter(bill_line::Column::BillId.eq(bill_id))
        .exec(&txn)
        .await?;
    let bills = bill::Entity::delete_by_id(bill_id).exec(&txn).await?;
    if bills.rows_affected == 0 {
        return Err(BillingError::BillNotFound(bill_id));
    }

    txn.commit().await?;
    info!(
        "Deleted bill {} and {} lines",
        bill_id, lines.rows_affected
    );
    Ok(())
}
