use crate::entities::counter;
use crate::errors::ServiceError;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ConnectionTrait, EntityTrait, Set, TransactionTrait,
};

const STORE_CODE_KEY: &str = "store";

pub fn order_counter_key(date: NaiveDate) -> String {
    format!("order:{}", date.format("%Y%m%d"))
}

/// `ORD-YYYYMMDD-NNN`; the sequence widens past 999 rather than wrapping.
pub fn format_order_number(date: NaiveDate, seq: i64) -> String {
    format!("ORD-{}-{:03}", date.format("%Y%m%d"), seq)
}

/// `STRNNNN`
pub fn format_store_code(seq: i64) -> String {
    format!("STR{:04}", seq)
}

/// Atomically increments the named counter and returns the new value.
///
/// The upsert and the read-back run in one transaction so the row lock taken
/// by the upsert covers the read.
pub async fn next_sequence<C>(db: &C, key: &str) -> Result<i64, ServiceError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    let now = Utc::now();

    let row = counter::ActiveModel {
        key: Set(key.to_string()),
        seq: Set(1),
        updated_at: Set(now),
    };

    counter::Entity::insert(row)
        .on_conflict(
            OnConflict::column(counter::Column::Key)
                .value(
                    counter::Column::Seq,
                    Expr::col((counter::Entity, counter::Column::Seq)).add(1),
                )
                .value(counter::Column::UpdatedAt, Expr::value(now))
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

    let current = counter::Entity::find_by_id(key.to_string())
        .one(&txn)
        .await?
        .ok_or_else(|| ServiceError::InternalError(format!("counter {} missing after upsert", key)))?;

    txn.commit().await?;
    Ok(current.seq)
}

pub async fn next_order_number<C>(db: &C, at: DateTime<Utc>) -> Result<String, ServiceError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let date = at.date_naive();
    let seq = next_sequence(db, &order_counter_key(date)).await?;
    Ok(format_order_number(date, seq))
}

pub async fn next_store_code<C>(db: &C) -> Result<String, ServiceError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let seq = next_sequence(db, STORE_CODE_KEY).await?;
    Ok(format_store_code(seq))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(format_order_number(date, 1), "ORD-20240309-001");
        assert_eq!(format_order_number(date, 42), "ORD-20240309-042");
        assert_eq!(format_order_number(date, 1234), "ORD-20240309-1234");
        assert_eq!(order_counter_key(date), "order:20240309");
    }

    #[test]
    fn store_code_format() {
        assert_eq!(format_store_code(1), "STR0001");
        assert_eq!(format_store_code(987), "STR0987");
    }
}
