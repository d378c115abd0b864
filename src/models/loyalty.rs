use crate::entities::{
    customer_loyalty_entity, loyalty_badge_entity, loyalty_reward_entity, LoyaltyTier,
    MilestoneKind, RewardType,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BadgeResponse {
    pub name: String,
    pub awarded_at: DateTime<Utc>,
}

impl From<loyalty_badge_entity::Model> for BadgeResponse {
    fn from(m: loyalty_badge_entity::Model) -> Self {
        Self {
            name: m.name,
            awarded_at: m.awarded_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RewardResponse {
    pub milestone_kind: MilestoneKind,
    pub threshold: i64,
    pub reward_type: RewardType,
    pub reward_value: i64,
    pub earned_at: DateTime<Utc>,
}

impl From<loyalty_reward_entity::Model> for RewardResponse {
    fn from(m: loyalty_reward_entity::Model) -> Self {
        Self {
            milestone_kind: m.milestone_kind,
            threshold: m.threshold,
            reward_type: m.reward_type,
            reward_value: m.reward_value,
            earned_at: m.earned_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoyaltyResponse {
    pub customer_id: i64,
    pub points: i64,
    pub total_spent_cents: i64,
    pub total_bookings: i64,
    pub tier: LoyaltyTier,
    pub badges: Vec<BadgeResponse>,
    pub rewards: Vec<RewardResponse>,
}

impl LoyaltyResponse {
    /// Zero state for customers with no reconciled payments yet.
    pub fn empty(customer_id: i64) -> Self {
        Self {
            customer_id,
            points: 0,
            total_spent_cents: 0,
            total_bookings: 0,
            tier: LoyaltyTier::Bronze,
            badges: Vec::new(),
            rewards: Vec::new(),
        }
    }

    pub fn from_parts(
        m: customer_loyalty_entity::Model,
        badges: Vec<loyalty_badge_entity::Model>,
        rewards: Vec<loyalty_reward_entity::Model>,
    ) -> Self {
        Self {
            customer_id: m.customer_id,
            points: m.points,
            total_spent_cents: m.total_spent_cents,
            total_bookings: m.total_bookings,
            tier: m.tier,
            badges: badges.into_iter().map(BadgeResponse::from).collect(),
            rewards: rewards.into_iter().map(RewardResponse::from).collect(),
        }
    }
}
