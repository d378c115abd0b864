use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    ToSchema,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "loyalty_tier")]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyTier {
    #[sea_orm(string_value = "bronze")]
    Bronze,
    #[sea_orm(string_value = "silver")]
    Silver,
    #[sea_orm(string_value = "gold")]
    Gold,
    #[sea_orm(string_value = "platinum")]
    Platinum,
    #[sea_orm(string_value = "diamond")]
    Diamond,
}

impl LoyaltyTier {
    pub fn badge_name(self) -> &'static str {
        match self {
            LoyaltyTier::Bronze => "Bronze Member",
            LoyaltyTier::Silver => "Silver Member",
            LoyaltyTier::Gold => "Gold Member",
            LoyaltyTier::Platinum => "Platinum Member",
            LoyaltyTier::Diamond => "Diamond Member",
        }
    }
}

impl std::fmt::Display for LoyaltyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoyaltyTier::Bronze => write!(f, "bronze"),
            LoyaltyTier::Silver => write!(f, "silver"),
            LoyaltyTier::Gold => write!(f, "gold"),
            LoyaltyTier::Platinum => write!(f, "platinum"),
            LoyaltyTier::Diamond => write!(f, "diamond"),
        }
    }
}

/// Accumulated per-customer state; upserted lazily on the first reconciled
/// payment and only ever updated additively after that.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "customer_loyalty")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub customer_id: i64,
    pub points: i64,
    pub total_spent_cents: i64,
    pub total_bookings: i64,
    pub tier: LoyaltyTier,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
