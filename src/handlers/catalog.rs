use crate::models::ServiceResponse;
use crate::services::AvailabilityService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/services",
    tag = "catalog",
    responses(
        (status = 200, description = "Bookable treatments", body = [ServiceResponse])
    )
)]
pub async fn list_services(
    availability_service: web::Data<AvailabilityService>,
) -> Result<HttpResponse> {
    match availability_service.list_services().await {
        Ok(services) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": services
                .into_iter()
                .map(ServiceResponse::from)
                .collect::<Vec<_>>()
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn catalog_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/services", web::get().to(list_services));
}
