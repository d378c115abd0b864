use crate::entities::customer_loyalty::LoyaltyTier;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "discount_type")]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` is percent points off the subtotal, optionally capped.
    #[sea_orm(string_value = "percentage")]
    Percentage,
    /// `value` is a flat amount in cents, never more than the subtotal.
    #[sea_orm(string_value = "fixed")]
    Fixed,
}

/// `used_count` must equal the number of rows in `discount_usages` for this
/// discount; both change together inside the reconciliation transaction.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "discounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub code: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub max_discount_cents: Option<i64>,
    pub minimum_amount_cents: i64,
    pub usage_limit: Option<i64>,
    pub used_count: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_active: bool,
    pub new_customers_only: bool,
    pub existing_customers_only: bool,
    pub min_tier: Option<LoyaltyTier>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
