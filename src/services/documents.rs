use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::{
    entities::{
        document_number::{self, format_document_number},
        transaction::TransactionKind,
        DocumentNumber,
    },
    errors::ServiceError,
};

/// Allocate the next document number for `kind` in `year`.
///
/// Must be called on the same transaction that inserts the document being
/// numbered: a rollback then also rolls the sequence back, so committed
/// numbers stay gapless per (kind, year).
pub async fn next_document_number<C: ConnectionTrait>(
    conn: &C,
    kind: TransactionKind,
    year: i32,
) -> Result<String, ServiceError> {
    let existing = DocumentNumber::find()
        .filter(document_number::Column::Kind.eq(kind))
        .filter(document_number::Column::Year.eq(year))
        .one(conn)
        .await?;

    let value = match existing {
        Some(row) => {
            let next = row.last_value + 1;
            let mut active: document_number::ActiveModel = row.into();
            active.last_value = Set(next);
            active.update(conn).await?;
            next
        }
        None => {
            let active = document_number::ActiveModel {
                kind: Set(kind),
                year: Set(year),
                last_value: Set(1),
                ..Default::default()
            };
            active.insert(conn).await?;
            1
        }
    };

    Ok(format_document_number(kind, year, value))
}
