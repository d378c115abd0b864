use crate::entities::{
    booking_entity, payment_transaction_entity, service_entity, BookingStatus, PaymentStatus,
    TransactionStatus,
};
use crate::error::{AppError, AppResult};
use crate::external::{
    GatewayClient, GatewayEvent, NotificationEvent, NotificationService, PaymentEventData,
};
use crate::models::{CreateIntentRequest, CreateIntentResponse, ValidateDiscountRequest};
use crate::services::{DiscountService, LoyaltyService};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set, SqlErr, TransactionTrait,
};

/// What reconciling one delivery did. Duplicates and unknown event kinds are
/// acknowledged, not retried.
#[derive(Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Processed,
    Duplicate,
    Ignored,
}

#[derive(Clone)]
pub struct PaymentService {
    pool: DatabaseConnection,
    gateway: GatewayClient,
    discount_service: DiscountService,
    loyalty_service: LoyaltyService,
    notifier: NotificationService,
}

impl PaymentService {
    pub fn new(
        pool: DatabaseConnection,
        gateway: GatewayClient,
        discount_service: DiscountService,
        loyalty_service: LoyaltyService,
        notifier: NotificationService,
    ) -> Self {
        Self {
            pool,
            gateway,
            discount_service,
            loyalty_service,
            notifier,
        }
    }

    /// Creates a gateway payment intent for a booking and records the pending
    /// transaction. The discount quote here is advisory; usage is committed
    /// only when the success event is reconciled.
    pub async fn create_intent(&self, req: CreateIntentRequest) -> AppResult<CreateIntentResponse> {
        let booking = booking_entity::Entity::find_by_id(req.booking_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", req.booking_id)))?;

        if booking.status == BookingStatus::Cancelled {
            return Err(AppError::ValidationError(
                "Cannot pay for a cancelled booking".to_string(),
            ));
        }
        if booking.payment_status == PaymentStatus::Paid {
            return Err(AppError::ValidationError(
                "Booking is already paid".to_string(),
            ));
        }

        let service = service_entity::Entity::find_by_id(booking.service_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Service {} not found", booking.service_id))
            })?;
        let subtotal = service.price_cents;

        let discount_applied = match req.discount_code.as_deref() {
            Some(code) => {
                let quote = self
                    .discount_service
                    .validate_discount(&ValidateDiscountRequest {
                        code: code.to_string(),
                        customer_id: booking.customer_id,
                        subtotal_cents: subtotal,
                    })
                    .await?;
                quote.discount_cents
            }
            None => 0,
        };
        let amount = subtotal - discount_applied;

        let intent = self
            .gateway
            .create_payment_intent(
                amount,
                booking.id,
                booking.customer_id,
                req.discount_code.as_deref(),
            )
            .await?;

        let now = Utc::now();
        payment_transaction_entity::ActiveModel {
            booking_id: Set(booking.id),
            customer_id: Set(booking.customer_id),
            gateway_intent_id: Set(intent.id.clone()),
            amount_cents: Set(amount),
            status: Set(TransactionStatus::Pending),
            points_earned: Set(0),
            discount_applied_cents: Set(discount_applied),
            discount_code: Set(req.discount_code.clone()),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&self.pool)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("Payment intent already recorded".to_string())
            }
            _ => AppError::DatabaseError(e),
        })?;

        log::info!(
            "Created payment intent {} for booking {} (amount {}, discount {})",
            intent.id,
            booking.id,
            amount,
            discount_applied
        );

        Ok(CreateIntentResponse {
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
            amount_cents: amount,
            discount_applied_cents: discount_applied,
        })
    }

    /// Drives booking, discount and loyalty state from one gateway delivery.
    /// Deliveries are at-least-once; the conditional status flip keyed on
    /// gateway_intent_id makes every redelivery a no-op.
    pub async fn reconcile_event(&self, event: GatewayEvent) -> AppResult<ReconcileOutcome> {
        match event {
            GatewayEvent::PaymentSucceeded(data) => self.handle_success(data).await,
            GatewayEvent::PaymentFailed(data) => self.handle_failure(data).await,
            GatewayEvent::Unknown => {
                log::info!("Ignoring unhandled gateway event type");
                Ok(ReconcileOutcome::Ignored)
            }
        }
    }

    async fn handle_success(&self, data: PaymentEventData) -> AppResult<ReconcileOutcome> {
        let txn = self.pool.begin().await?;

        let Some(tx) = self
            .claim_transaction(&txn, &data.id, TransactionStatus::Succeeded)
            .await?
        else {
            txn.commit().await?;
            return Ok(ReconcileOutcome::Duplicate);
        };

        // Confirm the booking unless it was cancelled in the meantime.
        let booking_update = booking_entity::Entity::update_many()
            .col_expr(
                booking_entity::Column::Status,
                BookingStatus::Confirmed.as_enum(),
            )
            .col_expr(
                booking_entity::Column::PaymentStatus,
                PaymentStatus::Paid.as_enum(),
            )
            .col_expr(
                booking_entity::Column::UpdatedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(booking_entity::Column::Id.eq(tx.booking_id))
            .filter(booking_entity::Column::Status.ne(BookingStatus::Cancelled))
            .exec(&txn)
            .await?;
        if booking_update.rows_affected == 0 {
            log::warn!(
                "Payment {} succeeded for cancelled or missing booking {}",
                data.id,
                tx.booking_id
            );
        }

        if let (Some(code), Some(customer_id)) = (tx.discount_code.as_deref(), tx.customer_id) {
            if tx.discount_applied_cents > 0 {
                self.discount_service
                    .apply_within(
                        &txn,
                        code,
                        customer_id,
                        tx.booking_id,
                        tx.discount_applied_cents,
                    )
                    .await?;
            }
        }

        if let Some(customer_id) = tx.customer_id {
            let outcome = self
                .loyalty_service
                .credit_within(&txn, customer_id, tx.amount_cents)
                .await?;

            payment_transaction_entity::Entity::update_many()
                .col_expr(
                    payment_transaction_entity::Column::PointsEarned,
                    Expr::value(outcome.points_earned),
                )
                .filter(payment_transaction_entity::Column::Id.eq(tx.id))
                .exec(&txn)
                .await?;

            log::info!(
                "Credited {} points to customer {customer_id} (tier {})",
                outcome.points_earned,
                outcome.tier
            );
        }

        txn.commit().await?;

        self.notifier.notify(NotificationEvent::BookingConfirmed {
            booking_id: tx.booking_id,
        });
        log::info!(
            "Reconciled payment_succeeded for intent {} (booking {})",
            data.id,
            tx.booking_id
        );
        Ok(ReconcileOutcome::Processed)
    }

    async fn handle_failure(&self, data: PaymentEventData) -> AppResult<ReconcileOutcome> {
        let txn = self.pool.begin().await?;

        let Some(tx) = self
            .claim_transaction(&txn, &data.id, TransactionStatus::Failed)
            .await?
        else {
            txn.commit().await?;
            return Ok(ReconcileOutcome::Duplicate);
        };

        // The booking stays pending and keeps its slot; only the payment axis
        // moves.
        booking_entity::Entity::update_many()
            .col_expr(
                booking_entity::Column::PaymentStatus,
                PaymentStatus::Failed.as_enum(),
            )
            .col_expr(
                booking_entity::Column::UpdatedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(booking_entity::Column::Id.eq(tx.booking_id))
            .filter(booking_entity::Column::PaymentStatus.eq(PaymentStatus::Pending))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        log::info!(
            "Reconciled payment_failed for intent {} (booking {})",
            data.id,
            tx.booking_id
        );
        Ok(ReconcileOutcome::Processed)
    }

    /// Conditional pending -> terminal flip on the intent id. Returns the
    /// claimed transaction, or `None` when another delivery already took it.
    async fn claim_transaction<C: ConnectionTrait>(
        &self,
        txn: &C,
        gateway_intent_id: &str,
        to: TransactionStatus,
    ) -> AppResult<Option<payment_transaction_entity::Model>> {
        let flip = payment_transaction_entity::Entity::update_many()
            .col_expr(payment_transaction_entity::Column::Status, to.as_enum())
            .col_expr(
                payment_transaction_entity::Column::UpdatedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(payment_transaction_entity::Column::GatewayIntentId.eq(gateway_intent_id))
            .filter(payment_transaction_entity::Column::Status.eq(TransactionStatus::Pending))
            .exec(txn)
            .await?;

        let tx = payment_transaction_entity::Entity::find()
            .filter(payment_transaction_entity::Column::GatewayIntentId.eq(gateway_intent_id))
            .one(txn)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No payment transaction for intent {gateway_intent_id}"
                ))
            })?;

        if flip.rows_affected == 0 {
            log::info!(
                "Duplicate delivery for intent {gateway_intent_id} (already {:?}), no-op",
                tx.status
            );
            return Ok(None);
        }
        Ok(Some(tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GatewayConfig, NotificationConfig};
    use crate::external::gateway::EventMetadata;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn tx_row(status: TransactionStatus) -> payment_transaction_entity::Model {
        payment_transaction_entity::Model {
            id: 1,
            booking_id: 5,
            customer_id: Some(42),
            gateway_intent_id: "pi_123".to_string(),
            amount_cents: 5_000,
            status,
            points_earned: 0,
            discount_applied_cents: 0,
            discount_code: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn payment_service(pool: DatabaseConnection) -> PaymentService {
        let gateway = GatewayClient::new(GatewayConfig {
            base_url: "http://localhost:0".to_string(),
            secret_key: "sk_test".to_string(),
            webhook_secret: "whsec".to_string(),
            request_timeout_secs: 1,
        })
        .unwrap();
        PaymentService::new(
            pool.clone(),
            gateway,
            DiscountService::new(pool.clone()),
            LoyaltyService::new(pool, 1),
            NotificationService::new(NotificationConfig::default()),
        )
    }

    fn event(id: &str) -> PaymentEventData {
        PaymentEventData {
            id: id.to_string(),
            amount: 5_000,
            metadata: EventMetadata::default(),
        }
    }

    #[tokio::test]
    async fn duplicate_success_event_is_a_noop() {
        // The conditional flip hits zero rows because the transaction already
        // succeeded; nothing else runs.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![tx_row(TransactionStatus::Succeeded)]])
            .into_connection();

        let svc = payment_service(db);
        let outcome = svc
            .reconcile_event(GatewayEvent::PaymentSucceeded(event("pi_123")))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Duplicate);
    }

    #[tokio::test]
    async fn unknown_intent_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([Vec::<payment_transaction_entity::Model>::new()])
            .into_connection();

        let svc = payment_service(db);
        let err = svc
            .reconcile_event(GatewayEvent::PaymentSucceeded(event("pi_unknown")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn failure_event_flips_payment_axis_only() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // claim flip, then the booking payment_status update
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .append_query_results([vec![tx_row(TransactionStatus::Failed)]])
            .into_connection();

        let svc = payment_service(db);
        let outcome = svc
            .reconcile_event(GatewayEvent::PaymentFailed(event("pi_123")))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Processed);
    }

    #[tokio::test]
    async fn unhandled_event_kinds_are_ignored() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let svc = payment_service(db);
        let outcome = svc.reconcile_event(GatewayEvent::Unknown).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Ignored);
    }
}
