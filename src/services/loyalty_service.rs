use crate::entities::{
    customer_loyalty_entity, loyalty_badge_entity, loyalty_reward_entity, LoyaltyTier,
    MilestoneKind, RewardType,
};
use crate::error::AppResult;
use crate::models::LoyaltyResponse;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

/// Both the booking-count and spend thresholds must be met to advance.
pub fn tier_for(total_bookings: i64, total_spent_cents: i64) -> LoyaltyTier {
    const THRESHOLDS: [(LoyaltyTier, i64, i64); 4] = [
        (LoyaltyTier::Diamond, 50, 200_000),
        (LoyaltyTier::Platinum, 30, 100_000),
        (LoyaltyTier::Gold, 15, 50_000),
        (LoyaltyTier::Silver, 5, 20_000),
    ];
    for (tier, bookings, spent) in THRESHOLDS {
        if total_bookings >= bookings && total_spent_cents >= spent {
            return tier;
        }
    }
    LoyaltyTier::Bronze
}

/// floor(dollars * points_per_dollar), computed in cents.
pub fn points_for(amount_cents: i64, points_per_dollar: i64) -> i64 {
    amount_cents * points_per_dollar / 100
}

pub const BOOKING_MILESTONES: [(i64, i64); 5] =
    [(5, 50), (10, 100), (25, 250), (50, 500), (100, 1000)];

pub const SPEND_MILESTONES: [(i64, i64); 5] = [
    (10_000, 500),
    (25_000, 1_000),
    (50_000, 2_500),
    (100_000, 5_000),
    (200_000, 10_000),
];

/// Thresholds crossed by moving from `old` to `new`.
pub fn crossed<const N: usize>(old: i64, new: i64, milestones: [(i64, i64); N]) -> Vec<(i64, i64)> {
    milestones
        .into_iter()
        .filter(|(threshold, _)| old < *threshold && new >= *threshold)
        .collect()
}

/// Badge names earned by this credit. Insertion is additionally guarded by
/// the unique (customer_id, name) index, so a replay awards nothing twice.
pub fn badges_to_award(
    old_bookings: i64,
    old_spent: i64,
    new_bookings: i64,
    new_spent: i64,
    old_tier: LoyaltyTier,
    new_tier: LoyaltyTier,
) -> Vec<&'static str> {
    let mut names = Vec::new();
    if new_tier > old_tier {
        names.push(new_tier.badge_name());
    }
    if old_bookings < 1 && new_bookings >= 1 {
        names.push("First Booking");
    }
    if old_bookings < 5 && new_bookings >= 5 {
        names.push("Regular");
    }
    if old_bookings < 10 && new_bookings >= 10 {
        names.push("Loyal");
    }
    if old_spent < 50_000 && new_spent >= 50_000 {
        names.push("Big Spender");
    }
    names
}

#[derive(Debug)]
pub struct CreditOutcome {
    pub points_earned: i64,
    pub total_bookings: i64,
    pub total_spent_cents: i64,
    pub tier: LoyaltyTier,
}

#[derive(Clone)]
pub struct LoyaltyService {
    pool: DatabaseConnection,
    points_per_dollar: i64,
}

impl LoyaltyService {
    pub fn new(pool: DatabaseConnection, points_per_dollar: i64) -> Self {
        Self {
            pool,
            points_per_dollar,
        }
    }

    pub async fn get_loyalty(&self, customer_id: i64) -> AppResult<LoyaltyResponse> {
        let Some(row) = customer_loyalty_entity::Entity::find()
            .filter(customer_loyalty_entity::Column::CustomerId.eq(customer_id))
            .one(&self.pool)
            .await?
        else {
            return Ok(LoyaltyResponse::empty(customer_id));
        };

        let badges = loyalty_badge_entity::Entity::find()
            .filter(loyalty_badge_entity::Column::CustomerId.eq(customer_id))
            .order_by_asc(loyalty_badge_entity::Column::AwardedAt)
            .all(&self.pool)
            .await?;
        let rewards = loyalty_reward_entity::Entity::find()
            .filter(loyalty_reward_entity::Column::CustomerId.eq(customer_id))
            .order_by_asc(loyalty_reward_entity::Column::EarnedAt)
            .all(&self.pool)
            .await?;

        Ok(LoyaltyResponse::from_parts(row, badges, rewards))
    }

    /// Credits one reconciled successful payment. Runs inside the
    /// reconciler's transaction so loyalty state can never drift from the
    /// booking/discount updates of the same event.
    pub async fn credit_within<C: ConnectionTrait>(
        &self,
        txn: &C,
        customer_id: i64,
        amount_cents: i64,
    ) -> AppResult<CreditOutcome> {
        // Lazy upsert of the zero row, then a locked read to serialize
        // concurrent credits for the same customer.
        let seed = customer_loyalty_entity::Entity::insert(customer_loyalty_entity::ActiveModel {
            customer_id: Set(customer_id),
            points: Set(0),
            total_spent_cents: Set(0),
            total_bookings: Set(0),
            tier: Set(LoyaltyTier::Bronze),
            created_at: Set(Some(Utc::now())),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(customer_loyalty_entity::Column::CustomerId)
                .do_nothing()
                .to_owned(),
        )
        .exec(txn)
        .await;
        match seed {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e.into()),
        }

        let row = customer_loyalty_entity::Entity::find()
            .filter(customer_loyalty_entity::Column::CustomerId.eq(customer_id))
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| {
                crate::error::AppError::InternalError(format!(
                    "Loyalty row missing for customer {customer_id} after upsert"
                ))
            })?;

        let old_bookings = row.total_bookings;
        let old_spent = row.total_spent_cents;
        let old_tier = row.tier;
        let old_points = row.points;

        let points_earned = points_for(amount_cents, self.points_per_dollar);
        let new_bookings = old_bookings + 1;
        let new_spent = old_spent + amount_cents;
        let new_tier = tier_for(new_bookings, new_spent);

        let mut active: customer_loyalty_entity::ActiveModel = row.into();
        active.points = Set(old_points + points_earned);
        active.total_bookings = Set(new_bookings);
        active.total_spent_cents = Set(new_spent);
        active.tier = Set(new_tier);
        active.updated_at = Set(Some(Utc::now()));
        active.update(txn).await?;

        for name in badges_to_award(
            old_bookings,
            old_spent,
            new_bookings,
            new_spent,
            old_tier,
            new_tier,
        ) {
            self.award_badge(txn, customer_id, name).await?;
        }

        for (threshold, points) in crossed(old_bookings, new_bookings, BOOKING_MILESTONES) {
            self.record_reward(
                txn,
                customer_id,
                MilestoneKind::Bookings,
                threshold,
                RewardType::Points,
                points,
            )
            .await?;
        }
        for (threshold, discount) in crossed(old_spent, new_spent, SPEND_MILESTONES) {
            self.record_reward(
                txn,
                customer_id,
                MilestoneKind::Spending,
                threshold,
                RewardType::Discount,
                discount,
            )
            .await?;
        }

        Ok(CreditOutcome {
            points_earned,
            total_bookings: new_bookings,
            total_spent_cents: new_spent,
            tier: new_tier,
        })
    }

    async fn award_badge<C: ConnectionTrait>(
        &self,
        txn: &C,
        customer_id: i64,
        name: &str,
    ) -> AppResult<()> {
        let insert = loyalty_badge_entity::Entity::insert(loyalty_badge_entity::ActiveModel {
            customer_id: Set(customer_id),
            name: Set(name.to_string()),
            awarded_at: Set(Utc::now()),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::columns([
                loyalty_badge_entity::Column::CustomerId,
                loyalty_badge_entity::Column::Name,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec(txn)
        .await;
        match insert {
            Ok(_) => {
                log::info!("Awarded badge \"{name}\" to customer {customer_id}");
                Ok(())
            }
            Err(DbErr::RecordNotInserted) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn record_reward<C: ConnectionTrait>(
        &self,
        txn: &C,
        customer_id: i64,
        kind: MilestoneKind,
        threshold: i64,
        reward_type: RewardType,
        reward_value: i64,
    ) -> AppResult<()> {
        let insert = loyalty_reward_entity::Entity::insert(loyalty_reward_entity::ActiveModel {
            customer_id: Set(customer_id),
            milestone_kind: Set(kind),
            threshold: Set(threshold),
            reward_type: Set(reward_type),
            reward_value: Set(reward_value),
            earned_at: Set(Utc::now()),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::columns([
                loyalty_reward_entity::Column::CustomerId,
                loyalty_reward_entity::Column::MilestoneKind,
                loyalty_reward_entity::Column::Threshold,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec(txn)
        .await;
        match insert {
            Ok(_) => Ok(()),
            Err(DbErr::RecordNotInserted) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn loyalty_row(
        points: i64,
        bookings: i64,
        spent: i64,
        tier: LoyaltyTier,
    ) -> customer_loyalty_entity::Model {
        customer_loyalty_entity::Model {
            id: 7,
            customer_id: 42,
            points,
            total_spent_cents: spent,
            total_bookings: bookings,
            tier,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn tier_requires_both_axes() {
        assert_eq!(tier_for(0, 0), LoyaltyTier::Bronze);
        // Enough bookings, not enough spend.
        assert_eq!(tier_for(5, 19_999), LoyaltyTier::Bronze);
        // Enough spend, not enough bookings.
        assert_eq!(tier_for(4, 1_000_000), LoyaltyTier::Bronze);
        assert_eq!(tier_for(5, 20_000), LoyaltyTier::Silver);
        assert_eq!(tier_for(15, 50_000), LoyaltyTier::Gold);
        assert_eq!(tier_for(30, 100_000), LoyaltyTier::Platinum);
        assert_eq!(tier_for(50, 200_000), LoyaltyTier::Diamond);
        assert_eq!(tier_for(500, 9_999_999), LoyaltyTier::Diamond);
    }

    #[test]
    fn tier_is_monotonic_in_both_inputs() {
        let samples = [0, 1, 4, 5, 14, 15, 29, 30, 49, 50, 80];
        let spends = [0, 19_999, 20_000, 49_999, 50_000, 100_000, 200_000, 300_000];
        for (i, &b) in samples.iter().enumerate() {
            for (j, &s) in spends.iter().enumerate() {
                let here = tier_for(b, s);
                if i + 1 < samples.len() {
                    assert!(tier_for(samples[i + 1], s) >= here);
                }
                if j + 1 < spends.len() {
                    assert!(tier_for(b, spends[j + 1]) >= here);
                }
            }
        }
    }

    #[test]
    fn points_are_floored_per_dollar() {
        assert_eq!(points_for(5_000, 1), 50);
        assert_eq!(points_for(5_099, 1), 50);
        assert_eq!(points_for(5_099, 2), 101);
        assert_eq!(points_for(99, 1), 0);
    }

    #[test]
    fn fifth_booking_reaching_silver_awards_regular_and_tier_badge() {
        // Customer at 4 bookings / $180 completes a $50 paid booking.
        let (old_b, old_s) = (4, 18_000);
        let (new_b, new_s) = (5, 23_000);
        let old_tier = tier_for(old_b, old_s);
        let new_tier = tier_for(new_b, new_s);
        assert_eq!(old_tier, LoyaltyTier::Bronze);
        assert_eq!(new_tier, LoyaltyTier::Silver);

        let badges = badges_to_award(old_b, old_s, new_b, new_s, old_tier, new_tier);
        assert!(badges.contains(&"Regular"));
        assert!(badges.contains(&"Silver Member"));
        assert_eq!(badges.len(), 2);
    }

    #[test]
    fn first_booking_badge_only_on_first() {
        let badges = badges_to_award(0, 0, 1, 5_000, LoyaltyTier::Bronze, LoyaltyTier::Bronze);
        assert_eq!(badges, vec!["First Booking"]);
        let badges = badges_to_award(1, 5_000, 2, 10_000, LoyaltyTier::Bronze, LoyaltyTier::Bronze);
        assert!(badges.is_empty());
    }

    #[test]
    fn big_spender_badge_on_crossing_500() {
        let badges = badges_to_award(
            7,
            48_000,
            8,
            53_000,
            LoyaltyTier::Silver,
            LoyaltyTier::Gold,
        );
        assert!(badges.contains(&"Big Spender"));
        assert!(badges.contains(&"Gold Member"));
    }

    #[test]
    fn crossing_collects_each_threshold_once() {
        assert_eq!(crossed(4, 5, BOOKING_MILESTONES), vec![(5, 50)]);
        assert!(crossed(5, 6, BOOKING_MILESTONES).is_empty());
        // A large payment can cross several spend milestones at once.
        assert_eq!(
            crossed(9_000, 60_000, SPEND_MILESTONES),
            vec![(10_000, 500), (25_000, 1_000), (50_000, 2_500)]
        );
    }

    #[tokio::test]
    async fn fifth_paid_booking_credits_points_badges_and_milestone() {
        // Customer at 4 bookings / $180 completes a $50 payment: 50 points,
        // silver tier, two badge inserts and the 5-booking milestone. The
        // statement order is seed upsert (exists), locked read, counter
        // update, then one insert per badge and milestone.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::RecordNotInserted])
            .append_query_results([
                vec![loyalty_row(180, 4, 18_000, LoyaltyTier::Bronze)],
                vec![loyalty_row(230, 5, 23_000, LoyaltyTier::Silver)],
            ])
            .append_query_results([vec![loyalty_badge_entity::Model {
                id: 1,
                customer_id: 42,
                name: "Silver Member".to_string(),
                awarded_at: Utc::now(),
            }]])
            .append_query_results([vec![loyalty_badge_entity::Model {
                id: 2,
                customer_id: 42,
                name: "Regular".to_string(),
                awarded_at: Utc::now(),
            }]])
            .append_query_results([vec![loyalty_reward_entity::Model {
                id: 1,
                customer_id: 42,
                milestone_kind: MilestoneKind::Bookings,
                threshold: 5,
                reward_type: RewardType::Points,
                reward_value: 50,
                earned_at: Utc::now(),
            }]])
            .into_connection();

        let svc = LoyaltyService::new(db.clone(), 1);
        let outcome = svc.credit_within(&db, 42, 5_000).await.unwrap();
        assert_eq!(outcome.points_earned, 50);
        assert_eq!(outcome.total_bookings, 5);
        assert_eq!(outcome.total_spent_cents, 23_000);
        assert_eq!(outcome.tier, LoyaltyTier::Silver);
    }

    #[tokio::test]
    async fn redelivered_badge_insert_is_tolerated() {
        // First-ever booking, but the "First Booking" badge row already
        // exists from an earlier delivery of the same event. The conflict
        // target swallows the insert and the credit still succeeds.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![loyalty_row(0, 0, 0, LoyaltyTier::Bronze)],
                vec![loyalty_row(0, 0, 0, LoyaltyTier::Bronze)],
                vec![loyalty_row(50, 1, 5_000, LoyaltyTier::Bronze)],
            ])
            .append_query_errors([DbErr::RecordNotInserted])
            .into_connection();

        let svc = LoyaltyService::new(db.clone(), 1);
        let outcome = svc.credit_within(&db, 42, 5_000).await.unwrap();
        assert_eq!(outcome.points_earned, 50);
        assert_eq!(outcome.tier, LoyaltyTier::Bronze);
    }
}
