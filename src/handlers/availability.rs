use crate::models::{AvailabilityQuery, AvailableSlotsResponse};
use crate::services::AvailabilityService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/availability",
    tag = "availability",
    params(
        ("date" = String, Query, description = "Calendar day, YYYY-MM-DD"),
        ("service_id" = i64, Query, description = "Service id")
    ),
    responses(
        (status = 200, description = "Free slots for the date", body = AvailableSlotsResponse),
        (status = 404, description = "Unknown service")
    )
)]
pub async fn get_available_slots(
    availability_service: web::Data<AvailabilityService>,
    query: web::Query<AvailabilityQuery>,
) -> Result<HttpResponse> {
    match availability_service
        .get_available_slots(query.date, query.service_id)
        .await
    {
        Ok(slots) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": AvailableSlotsResponse::new(query.date, query.service_id, &slots)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn availability_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/availability", web::get().to(get_available_slots));
}
