use crate::entities::service_entity;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub service_id: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AvailableSlotsResponse {
    pub date: NaiveDate,
    pub service_id: i64,
    /// Free grid times as "HH:MM", ascending.
    pub slots: Vec<String>,
}

impl AvailableSlotsResponse {
    pub fn new(date: NaiveDate, service_id: i64, slots: &[NaiveTime]) -> Self {
        Self {
            date,
            service_id,
            slots: slots.iter().map(|t| t.format("%H:%M").to_string()).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ServiceResponse {
    pub id: i64,
    pub name: String,
    pub duration_minutes: i32,
    pub price_cents: i64,
}

impl From<service_entity::Model> for ServiceResponse {
    fn from(m: service_entity::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            duration_minutes: m.duration_minutes,
            price_cents: m.price_cents,
        }
    }
}
