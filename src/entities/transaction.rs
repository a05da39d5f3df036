use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Direction of a stock movement: purchases receive stock, sales release it.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    #[sea_orm(string_value = "purchase")]
    Purchase,
    #[sea_orm(string_value = "sale")]
    Sale,
}

impl TransactionKind {
    /// Document number prefix used when rendering this kind's numbers.
    pub fn document_prefix(&self) -> &'static str {
        match self {
            TransactionKind::Purchase => "PO",
            TransactionKind::Sale => "INV",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Purchase => write!(f, "purchase"),
            TransactionKind::Sale => write!(f, "sale"),
        }
    }
}

/// Transaction header: one purchase order or sales invoice.
///
/// Primary keys are 64-bit sequences; responses serialize them as strings so
/// JSON consumers never round them through a double.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub kind: TransactionKind,

    /// Allocated document number, e.g. `PO-2026-000042`
    pub document_number: String,

    /// The customer (sales) or supplier (purchases) involved
    pub partner_id: Uuid,

    /// Sum of all line totals
    pub total_amount: Decimal,

    pub notes: Option<String>,

    /// User who recorded the transaction
    pub created_by: Option<Uuid>,

    /// Soft-delete flag
    pub deleted: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::partner::Entity",
        from = "Column::PartnerId",
        to = "super::partner::Column::Id"
    )]
    Partner,
    #[sea_orm(has_many = "super::transaction_item::Entity")]
    Items,
}

impl Related<super::partner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Partner.def()
    }
}

impl Related<super::transaction_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
