use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::transaction::TransactionKind;

/// Per-kind, per-year document number sequence.
///
/// One row per (kind, year); `last_value` is the highest sequence number
/// handed out so far. Rows are only ever touched inside the transaction that
/// creates the document they number.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "document_numbers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub kind: TransactionKind,

    pub year: i32,

    pub last_value: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Render a document number in its canonical `PREFIX-YEAR-SEQ` form.
pub fn format_document_number(kind: TransactionKind, year: i32, value: i64) -> String {
    format!("{}-{}-{:06}", kind.document_prefix(), year, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_purchase_numbers_with_po_prefix() {
        assert_eq!(
            format_document_number(TransactionKind::Purchase, 2026, 42),
            "PO-2026-000042"
        );
    }

    #[test]
    fn formats_sale_numbers_with_inv_prefix() {
        assert_eq!(
            format_document_number(TransactionKind::Sale, 2026, 123456),
            "INV-2026-123456"
        );
    }

    #[test]
    fn pads_to_six_digits_without_truncating_larger_values() {
        assert_eq!(
            format_document_number(TransactionKind::Sale, 2030, 1_234_567),
            "INV-2030-1234567"
        );
    }
}
