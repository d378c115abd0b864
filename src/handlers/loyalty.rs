use crate::models::LoyaltyResponse;
use crate::services::LoyaltyService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/loyalty/{customer_id}",
    tag = "loyalty",
    params(("customer_id" = i64, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Points, tier, badges and milestone rewards", body = LoyaltyResponse)
    )
)]
pub async fn get_loyalty(
    loyalty_service: web::Data<LoyaltyService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match loyalty_service.get_loyalty(path.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn loyalty_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/loyalty/{customer_id}", web::get().to(get_loyalty));
}
