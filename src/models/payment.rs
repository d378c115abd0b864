use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateIntentRequest {
    pub booking_id: i64,
    pub discount_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateIntentResponse {
    pub payment_intent_id: String,
    pub client_secret: String,
    pub amount_cents: i64,
    pub discount_applied_cents: i64,
}
