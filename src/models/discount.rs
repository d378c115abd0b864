use crate::entities::{discount_entity, DiscountType, LoyaltyTier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateDiscountRequest {
    pub code: String,
    pub customer_id: Option<i64>,
    pub subtotal_cents: i64,
}

/// Advisory quote. Nothing is reserved by validating; usage is recorded only
/// when the payment that consumes the code is reconciled.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DiscountQuoteResponse {
    pub code: String,
    pub discount_cents: i64,
    pub final_amount_cents: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDiscountRequest {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub max_discount_cents: Option<i64>,
    #[serde(default)]
    pub minimum_amount_cents: i64,
    pub usage_limit: Option<i64>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    #[serde(default)]
    pub new_customers_only: bool,
    #[serde(default)]
    pub existing_customers_only: bool,
    pub min_tier: Option<LoyaltyTier>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DiscountResponse {
    pub id: i64,
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
}

impl From<discount_entity::Model> for DiscountResponse {
    fn from(m: discount_entity::Model) -> Self {
        Self {
            id: m.id,
            code: m.code,
            discount_type: m.discount_type,
            value: m.value,
            max_discount_cents: m.max_discount_cents,
            minimum_amount_cents: m.minimum_amount_cents,
            usage_limit: m.usage_limit,
            used_count: m.used_count,
            valid_from: m.valid_from,
            valid_until: m.valid_until,
            is_active: m.is_active,
            new_customers_only: m.new_customers_only,
            existing_customers_only: m.existing_customers_only,
            min_tier: m.min_tier,
        }
    }
}
