//! Bill numbers.
//!
//! Every bill is numbered `F<YYYYMM><NNN>` where `YYYYMM` is the month the
//! bill was created in and `NNN` a global sequence that never resets. The
//! sequence is zero-padded to three digits and keeps growing past 999
//! (`F2025011000`), so parsing reads every digit after the month prefix.
//!
//! Sequence values come from the single-row `bill_sequences` counter, which is
//! bumped with one atomic `UPDATE` inside the bill-creation transaction.

use chrono::NaiveDate;
use model::entities::{bill, bill_sequence};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{debug, info, instrument, trace};

use crate::error::{BillingError, Result};

/// Id of the only row in `bill_sequences`.
pub const SEQUENCE_ID: i32 = 1;

const PREFIX: char = 'F';
/// `F` followed by `YYYYMM`.
const PREFIX_LEN: usize = 7;
const MIN_SEQUENCE_DIGITS: usize = 3;

/// Formats the number of a bill created on `date` with the given sequence value.
pub fn format_bill_number(date: NaiveDate, sequence: i64) -> String {
    format!(
        "{}{}{:0width$}",
        PREFIX,
        date.format("%Y%m"),
        sequence,
        width = MIN_SEQUENCE_DIGITS
    )
}

/// Extracts the sequence value from a bill number.
pub fn parse_sequence(number: &str) -> Result<i64> {
    let malformed = || BillingError::MalformedBillNumber(number.to_string());

    if !number.starts_with(PREFIX) || !number.is_ascii() {
        return Err(malformed());
    }
    if number.len() < PREFIX_LEN + MIN_SEQUENCE_DIGITS {
        return Err(malformed());
    }

    let (month, sequence) = number[1..].split_at(PREFIX_LEN - 1);
    if !month.bytes().all(|b| b.is_ascii_digit()) || !sequence.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    sequence.parse::<i64>().map_err(|_| malformed())
}

/// Reserves the next sequence value.
///
/// Must run inside the transaction that inserts the bill: the counter row
/// stays locked until that transaction ends, so two concurrent creations can
/// never observe the same value.
#[instrument(skip(db))]
pub async fn next_sequence<C: ConnectionTrait>(db: &C) -> Result<i64> {
    trace!("Bumping bill sequence counter");
    let result = bill_sequence::Entity::update_many()
        .col_expr(
            bill_sequence::Column::LastValue,
            Expr::col(bill_sequence::Column::LastValue).add(1),
        )
        .filter(bill_sequence::Column::Id.eq(SEQUENCE_ID))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(BillingError::SequenceMissing);
    }

    let counter = bill_sequence::Entity::find_by_id(SEQUENCE_ID)
        .one(db)
        .await?
        .ok_or(BillingError::SequenceMissing)?;

    debug!("Reserved bill sequence {}", counter.last_value);
    Ok(counter.last_value)
}

/// Derives the next sequence value from the stored bills alone: the bill with
/// the highest id carries the latest sequence. With no bill at all the first
/// value is 1.
#[instrument(skip(db))]
pub async fn derive_next_sequence<C: ConnectionTrait>(db: &C) -> Result<i64> {
    let latest = bill::Entity::find()
        .order_by_desc(bill::Column::Id)
        .one(db)
        .await?;

    match latest {
        Some(bill) => {
            debug!("Latest bill is {} ({})", bill.id, bill.number);
            Ok(parse_sequence(&bill.number)? + 1)
        }
        None => {
            debug!("No bill stored yet, sequence starts at 1");
            Ok(1)
        }
    }
}

/// Realigns the counter with the stored bills, creating the counter row when
/// it is missing. The counter is never moved backwards. Returns the value the
/// next bill will receive.
#[instrument(skip(db))]
pub async fn resync_sequence<C: ConnectionTrait>(db: &C) -> Result<i64> {
    let derived_last = derive_next_sequence(db).await? - 1;

    let next = match bill_sequence::Entity::find_by_id(SEQUENCE_ID).one(db).await? {
        Some(counter) if counter.last_value >= derived_last => {
            debug!("Counter at {} is ahead of stored bills, keeping it", counter.last_value);
            counter.last_value + 1
        }
        Some(counter) => {
            let mut active: bill_sequence::ActiveModel = counter.into();
            active.last_value = Set(derived_last);
            active.update(db).await?;
            derived_last + 1
        }
        None => {
            bill_sequence::ActiveModel {
                id: Set(SEQUENCE_ID),
                last_value: Set(derived_last),
            }
            .insert(db)
            .await?;
            derived_last + 1
        }
    };

    info!("Bill sequence resynchronised, next value is {}", next);
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{insert_bill_row, insert_coworker, setup_db};

    fn date(year: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, 15).unwrap()
    }

    #[test]
    fn test_format_pads_to_three_digits() {
        assert_eq!(format_bill_number(date(2025, 1), 1), "F202501001");
        assert_eq!(format_bill_number(date(2024, 11), 42), "F202411042");
    }

    #[test]
    fn test_format_widens_past_999() {
        assert_eq!(format_bill_number(date(2025, 1), 999), "F202501999");
        assert_eq!(format_bill_number(date(2025, 1), 1000), "F2025011000");
    }

    #[test]
    fn test_parse_sequence() {
        assert_eq!(parse_sequence("F202501001").unwrap(), 1);
        assert_eq!(parse_sequence("F202512137").unwrap(), 137);
        assert_eq!(parse_sequence("F2025011000").unwrap(), 1000);
    }

    #[test]
    fn test_parse_rejects_malformed_numbers() {
        for number in ["", "F", "X202501001", "F20250101", "F2025AB001", "F202501ABC", "F202501-01"] {
            assert!(
                matches!(parse_sequence(number), Err(BillingError::MalformedBillNumber(_))),
                "{number:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_next_sequence_is_monotonic() {
        let db = setup_db().await;

        assert_eq!(next_sequence(&db).await.unwrap(), 1);
        assert_eq!(next_sequence(&db).await.unwrap(), 2);
        assert_eq!(next_sequence(&db).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_next_sequence_without_counter_row() {
        let db = setup_db().await;
        bill_sequence::Entity::delete_by_id(SEQUENCE_ID).exec(&db).await.unwrap();

        let result = next_sequence(&db).await;
        assert!(matches!(result, Err(BillingError::SequenceMissing)));
    }

    #[tokio::test]
    async fn test_derive_next_sequence_from_latest_bill() {
        let db = setup_db().await;
        assert_eq!(derive_next_sequence(&db).await.unwrap(), 1);

        let coworker = insert_coworker(&db, "ada").await;
        insert_bill_row(&db, coworker.id, "F202411007").await;
        insert_bill_row(&db, coworker.id, "F202501012").await;

        assert_eq!(derive_next_sequence(&db).await.unwrap(), 13);
    }

    #[tokio::test]
    async fn test_resync_moves_counter_forward_only() {
        let db = setup_db().await;
        let coworker = insert_coworker(&db, "ada").await;
        insert_bill_row(&db, coworker.id, "F202501041").await;

        assert_eq!(resync_sequence(&db).await.unwrap(), 42);
        assert_eq!(next_sequence(&db).await.unwrap(), 42);

        // Counter is now ahead of the stored bills and must stay there
        next_sequence(&db).await.unwrap();
        assert_eq!(resync_sequence(&db).await.unwrap(), 44);
    }

    #[tokio::test]
    async fn test_resync_recreates_missing_counter() {
        let db = setup_db().await;
        bill_sequence::Entity::delete_by_id(SEQUENCE_ID).exec(&db).await.unwrap();

        assert_eq!(resync_sequence(&db).await.unwrap(), 1);
        assert_eq!(next_sequence(&db).await.unwrap(), 1);
    }
}
