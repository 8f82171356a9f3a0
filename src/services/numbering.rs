use chrono::{DateTime, Datelike, Utc};
use sea_orm::sea_query::LockType;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QuerySelect, Set};

use crate::{
    entity::counters::{ActiveModel as CounterActive, Entity as Counters},
    error::AppResult,
    lifecycle::DocumentKind,
};

pub const QUOTE_COUNTER: &str = "devis";
pub const INVOICE_COUNTER: &str = "facture";
pub const CREDIT_NOTE_COUNTER: &str = "avoir";

/// Increments the named counter under a row lock held by the caller's
/// transaction; a rollback gives the number back.
pub async fn next_value<C: ConnectionTrait>(conn: &C, name: &str) -> AppResult<i64> {
    let row = Counters::find_by_id(name.to_string())
        .lock(LockType::Update)
        .one(conn)
        .await?;

    let value = match row {
        Some(row) => {
            let next = row.value + 1;
            let mut active: CounterActive = row.into();
            active.value = Set(next);
            active.update(conn).await?;
            next
        }
        None => {
            CounterActive {
                name: Set(name.to_string()),
                value: Set(1),
            }
            .insert(conn)
            .await?;
            1
        }
    };

    Ok(value)
}

pub fn format_quote_id(seq: i64) -> String {
    format!("D-{seq:03}")
}

pub fn format_document_number(kind: DocumentKind, year: i32, seq: i64) -> String {
    let prefix = match kind {
        DocumentKind::Invoice => "F",
        DocumentKind::CreditNote => "A",
    };
    format!("{prefix}-{year}-{seq:04}")
}

pub async fn next_quote_id<C: ConnectionTrait>(conn: &C) -> AppResult<String> {
    let seq = next_value(conn, QUOTE_COUNTER).await?;
    Ok(format_quote_id(seq))
}

pub async fn next_document_number<C: ConnectionTrait>(
    conn: &C,
    kind: DocumentKind,
    now: DateTime<Utc>,
) -> AppResult<String> {
    let counter = match kind {
        DocumentKind::Invoice => INVOICE_COUNTER,
        DocumentKind::CreditNote => CREDIT_NOTE_COUNTER,
    };
    let seq = next_value(conn, counter).await?;
    Ok(format_document_number(kind, now.year(), seq))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_zero_padded() {
        assert_eq!(format_quote_id(1), "D-001");
        assert_eq!(format_quote_id(1234), "D-1234");
        assert_eq!(
            format_document_number(DocumentKind::Invoice, 2025, 7),
            "F-2025-0007"
        );
        assert_eq!(
            format_document_number(DocumentKind::CreditNote, 2025, 12),
            "A-2025-0012"
        );
    }
}
