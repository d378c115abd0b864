use crate::entities::{
    booking_entity, customer_loyalty_entity, discount_entity, discount_usage_entity, DiscountType,
    LoyaltyTier,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateDiscountRequest, DiscountQuoteResponse, DiscountResponse, ValidateDiscountRequest,
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, Set, SqlErr,
};

/// What the validator knows about the requesting customer. Anonymous
/// requests count as new customers at bronze tier with no prior usage.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomerContext {
    pub is_existing: bool,
    pub tier: Option<LoyaltyTier>,
    pub already_used: bool,
}

/// Fail-fast rule chain; the first failing check wins and is reported.
/// Validation is advisory and writes nothing — usage is recorded only at
/// payment reconciliation.
pub fn validate_rules(
    discount: &discount_entity::Model,
    now: DateTime<Utc>,
    subtotal_cents: i64,
    customer: CustomerContext,
) -> AppResult<()> {
    if !discount.is_active {
        return Err(AppError::ValidationError(
            "Discount code is not active".to_string(),
        ));
    }
    if now < discount.valid_from {
        return Err(AppError::ValidationError(
            "Discount code is not yet valid".to_string(),
        ));
    }
    if now > discount.valid_until {
        return Err(AppError::ValidationError(
            "Discount code has expired".to_string(),
        ));
    }
    if let Some(limit) = discount.usage_limit {
        if discount.used_count >= limit {
            return Err(AppError::ValidationError(
                "Discount code usage limit reached".to_string(),
            ));
        }
    }
    if subtotal_cents < discount.minimum_amount_cents {
        return Err(AppError::ValidationError(format!(
            "Subtotal is below the minimum amount of {} cents for this code",
            discount.minimum_amount_cents
        )));
    }
    if discount.new_customers_only && customer.is_existing {
        return Err(AppError::ValidationError(
            "Discount code is for new customers only".to_string(),
        ));
    }
    if discount.existing_customers_only && !customer.is_existing {
        return Err(AppError::ValidationError(
            "Discount code is for existing customers only".to_string(),
        ));
    }
    if let Some(min_tier) = discount.min_tier {
        if customer.tier.unwrap_or(LoyaltyTier::Bronze) < min_tier {
            return Err(AppError::ValidationError(format!(
                "Discount code requires {min_tier} tier or above"
            )));
        }
    }
    if customer.already_used {
        return Err(AppError::Conflict(
            "Discount code already used by this customer".to_string(),
        ));
    }
    Ok(())
}

/// Discount amount in cents; never negative and never above the subtotal.
pub fn discount_amount(discount: &discount_entity::Model, subtotal_cents: i64) -> i64 {
    let raw = match discount.discount_type {
        DiscountType::Percentage => {
            let pct = subtotal_cents * discount.value / 100;
            match discount.max_discount_cents {
                Some(cap) => pct.min(cap),
                None => pct,
            }
        }
        DiscountType::Fixed => discount.value.min(subtotal_cents),
    };
    raw.clamp(0, subtotal_cents)
}

#[derive(Clone)]
pub struct DiscountService {
    pool: DatabaseConnection,
}

impl DiscountService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// Advisory validation: returns the quoted amount without reserving the
    /// code. The single-use guarantee is enforced only at reconciliation.
    pub async fn validate_discount(
        &self,
        req: &ValidateDiscountRequest,
    ) -> AppResult<DiscountQuoteResponse> {
        let discount = self.find_by_code(&req.code).await?;
        let customer = self
            .customer_context(discount.id, req.customer_id)
            .await?;

        validate_rules(&discount, Utc::now(), req.subtotal_cents, customer)?;
        let amount = discount_amount(&discount, req.subtotal_cents);

        Ok(DiscountQuoteResponse {
            code: discount.code,
            discount_cents: amount,
            final_amount_cents: req.subtotal_cents - amount,
        })
    }

    /// Commit path, called by the payment reconciler inside its transaction.
    /// Appends the usage row and increments `used_count` exactly once per
    /// (discount, booking); a replayed event inserts nothing and skips the
    /// increment.
    pub async fn apply_within<C: ConnectionTrait>(
        &self,
        txn: &C,
        code: &str,
        customer_id: i64,
        booking_id: i64,
        amount_cents: i64,
    ) -> AppResult<()> {
        use sea_orm::sea_query::ExprTrait;

        let discount = discount_entity::Entity::find()
            .filter(discount_entity::Column::Code.eq(code))
            .one(txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Discount code {code} not found")))?;

        let insert = discount_usage_entity::Entity::insert(discount_usage_entity::ActiveModel {
            discount_id: Set(discount.id),
            customer_id: Set(customer_id),
            booking_id: Set(booking_id),
            amount_cents: Set(amount_cents),
            used_at: Set(Utc::now()),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::columns([
                discount_usage_entity::Column::DiscountId,
                discount_usage_entity::Column::BookingId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec(txn)
        .await;

        match insert {
            Ok(_) => {}
            // Conflict target hit: this usage is already on record.
            Err(DbErr::RecordNotInserted) => {
                log::info!(
                    "Usage of discount {} for booking {} already recorded, skipping",
                    code,
                    booking_id
                );
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        // Conditional increment keeps used_count == usage rows and serializes
        // the usage-limit check on the storage side.
        let update = discount_entity::Entity::update_many()
            .col_expr(
                discount_entity::Column::UsedCount,
                Expr::col(discount_entity::Column::UsedCount).add(1),
            )
            .col_expr(
                discount_entity::Column::UpdatedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(discount_entity::Column::Id.eq(discount.id))
            .filter(
                Condition::any()
                    .add(discount_entity::Column::UsageLimit.is_null())
                    .add(
                        Expr::col(discount_entity::Column::UsedCount)
                            .lt(Expr::col(discount_entity::Column::UsageLimit)),
                    ),
            )
            .exec(txn)
            .await?;

        if update.rows_affected == 0 {
            return Err(AppError::Conflict(
                "Discount code usage limit reached".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn create_discount(&self, req: CreateDiscountRequest) -> AppResult<DiscountResponse> {
        if req.valid_until < req.valid_from {
            return Err(AppError::ValidationError(
                "valid_until is before valid_from".to_string(),
            ));
        }
        if req.value <= 0 {
            return Err(AppError::ValidationError(
                "Discount value must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let inserted = discount_entity::ActiveModel {
            code: Set(req.code),
            discount_type: Set(req.discount_type),
            value: Set(req.value),
            max_discount_cents: Set(req.max_discount_cents),
            minimum_amount_cents: Set(req.minimum_amount_cents),
            usage_limit: Set(req.usage_limit),
            used_count: Set(0),
            valid_from: Set(req.valid_from),
            valid_until: Set(req.valid_until),
            is_active: Set(true),
            new_customers_only: Set(req.new_customers_only),
            existing_customers_only: Set(req.existing_customers_only),
            min_tier: Set(req.min_tier),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&self.pool)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("Discount code already exists".to_string())
            }
            _ => AppError::DatabaseError(e),
        })?;

        Ok(DiscountResponse::from(inserted))
    }

    pub async fn list_discounts(&self) -> AppResult<Vec<DiscountResponse>> {
        let discounts = discount_entity::Entity::find().all(&self.pool).await?;
        Ok(discounts.into_iter().map(DiscountResponse::from).collect())
    }

    async fn find_by_code(&self, code: &str) -> AppResult<discount_entity::Model> {
        discount_entity::Entity::find()
            .filter(discount_entity::Column::Code.eq(code))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::ValidationError("Invalid discount code".to_string()))
    }

    async fn customer_context(
        &self,
        discount_id: i64,
        customer_id: Option<i64>,
    ) -> AppResult<CustomerContext> {
        let Some(customer_id) = customer_id else {
            return Ok(CustomerContext::default());
        };

        let prior_bookings = booking_entity::Entity::find()
            .filter(booking_entity::Column::CustomerId.eq(customer_id))
            .count(&self.pool)
            .await?;

        let tier = customer_loyalty_entity::Entity::find()
            .filter(customer_loyalty_entity::Column::CustomerId.eq(customer_id))
            .one(&self.pool)
            .await?
            .map(|l| l.tier);

        let already_used = discount_usage_entity::Entity::find()
            .filter(discount_usage_entity::Column::DiscountId.eq(discount_id))
            .filter(discount_usage_entity::Column::CustomerId.eq(customer_id))
            .count(&self.pool)
            .await?
            > 0;

        Ok(CustomerContext {
            is_existing: prior_bookings > 0,
            tier,
            already_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn base_discount() -> discount_entity::Model {
        let now = Utc::now();
        discount_entity::Model {
            id: 1,
            code: "SAVE15".to_string(),
            discount_type: DiscountType::Fixed,
            value: 1500,
            max_discount_cents: None,
            minimum_amount_cents: 7500,
            usage_limit: None,
            used_count: 0,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            is_active: true,
            new_customers_only: false,
            existing_customers_only: false,
            min_tier: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn save15_below_minimum_fails_with_minimum_reason() {
        let d = base_discount();
        let err = validate_rules(&d, Utc::now(), 5000, CustomerContext::default()).unwrap_err();
        match err {
            AppError::ValidationError(msg) => assert!(msg.contains("minimum amount")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn save15_on_100_dollars_gives_15_off() {
        let d = base_discount();
        assert!(validate_rules(&d, Utc::now(), 10000, CustomerContext::default()).is_ok());
        let amount = discount_amount(&d, 10000);
        assert_eq!(amount, 1500);
        assert_eq!(10000 - amount, 8500);
    }

    #[test]
    fn fixed_discount_never_exceeds_subtotal() {
        let mut d = base_discount();
        d.minimum_amount_cents = 0;
        d.value = 99999;
        assert_eq!(discount_amount(&d, 1200), 1200);
    }

    #[test]
    fn percentage_discount_respects_cap() {
        let mut d = base_discount();
        d.discount_type = DiscountType::Percentage;
        d.value = 20;
        d.max_discount_cents = Some(1000);
        // 20% of $100 is $20, capped to $10.
        assert_eq!(discount_amount(&d, 10000), 1000);
        d.max_discount_cents = None;
        assert_eq!(discount_amount(&d, 10000), 2000);
    }

    #[test]
    fn inactive_code_fails_before_window_checks() {
        let mut d = base_discount();
        d.is_active = false;
        d.valid_until = Utc::now() - Duration::days(2); // also expired
        let err = validate_rules(&d, Utc::now(), 10000, CustomerContext::default()).unwrap_err();
        match err {
            AppError::ValidationError(msg) => assert!(msg.contains("not active")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn expired_and_not_yet_valid_windows() {
        let mut d = base_discount();
        d.valid_until = Utc::now() - Duration::hours(1);
        assert!(matches!(
            validate_rules(&d, Utc::now(), 10000, CustomerContext::default()),
            Err(AppError::ValidationError(msg)) if msg.contains("expired")
        ));

        let mut d = base_discount();
        d.valid_from = Utc::now() + Duration::hours(1);
        assert!(matches!(
            validate_rules(&d, Utc::now(), 10000, CustomerContext::default()),
            Err(AppError::ValidationError(msg)) if msg.contains("not yet valid")
        ));
    }

    #[test]
    fn usage_limit_reached_fails() {
        let mut d = base_discount();
        d.usage_limit = Some(10);
        d.used_count = 10;
        assert!(matches!(
            validate_rules(&d, Utc::now(), 10000, CustomerContext::default()),
            Err(AppError::ValidationError(msg)) if msg.contains("usage limit")
        ));
    }

    #[test]
    fn customer_restrictions() {
        let mut d = base_discount();
        d.new_customers_only = true;
        let existing = CustomerContext {
            is_existing: true,
            ..Default::default()
        };
        assert!(matches!(
            validate_rules(&d, Utc::now(), 10000, existing),
            Err(AppError::ValidationError(msg)) if msg.contains("new customers")
        ));

        let mut d = base_discount();
        d.existing_customers_only = true;
        assert!(matches!(
            validate_rules(&d, Utc::now(), 10000, CustomerContext::default()),
            Err(AppError::ValidationError(msg)) if msg.contains("existing customers")
        ));
    }

    #[test]
    fn tier_restriction_uses_bronze_for_unknown_customers() {
        let mut d = base_discount();
        d.min_tier = Some(LoyaltyTier::Gold);
        assert!(validate_rules(&d, Utc::now(), 10000, CustomerContext::default()).is_err());

        let gold = CustomerContext {
            tier: Some(LoyaltyTier::Gold),
            ..Default::default()
        };
        assert!(validate_rules(&d, Utc::now(), 10000, gold).is_ok());

        let diamond = CustomerContext {
            tier: Some(LoyaltyTier::Diamond),
            ..Default::default()
        };
        assert!(validate_rules(&d, Utc::now(), 10000, diamond).is_ok());
    }

    #[test]
    fn repeat_use_by_same_customer_is_a_conflict() {
        let d = base_discount();
        let used = CustomerContext {
            already_used: true,
            ..Default::default()
        };
        assert!(matches!(
            validate_rules(&d, Utc::now(), 10000, used),
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn replayed_usage_insert_skips_the_count_increment() {
        // Redelivered success event: the usage row is already on record, so
        // the conflict-target insert comes back RecordNotInserted. No result
        // is queued for the increment, so reaching it would fail; a clean Ok
        // proves the replay stopped at the usage insert.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![base_discount()]])
            .append_query_errors([DbErr::RecordNotInserted])
            .into_connection();

        let svc = DiscountService::new(db.clone());
        svc.apply_within(&db, "SAVE15", 42, 5, 1_500).await.unwrap();
    }

    #[tokio::test]
    async fn usage_limit_exhausted_at_commit_is_a_conflict() {
        // The usage row inserts, but the guarded increment matches zero rows
        // because used_count already reached usage_limit.
        let mut d = base_discount();
        d.usage_limit = Some(100);
        d.used_count = 100;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![d]])
            .append_query_results([vec![discount_usage_entity::Model {
                id: 1,
                discount_id: 1,
                customer_id: 42,
                booking_id: 5,
                amount_cents: 1_500,
                used_at: Utc::now(),
            }]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let svc = DiscountService::new(db.clone());
        let err = svc
            .apply_within(&db, "SAVE15", 42, 5, 1_500)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg.contains("usage limit")));
    }
}
