use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// Append-only usage history. The unique (discount_id, booking_id) pair is
/// the idempotency key: a replayed payment event inserts nothing.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "discount_usages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub discount_id: i64,
    pub customer_id: i64,
    pub booking_id: i64,
    pub amount_cents: i64,
    pub used_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
