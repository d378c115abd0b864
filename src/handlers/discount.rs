use crate::models::{
    CreateDiscountRequest, DiscountQuoteResponse, DiscountResponse, ValidateDiscountRequest,
};
use crate::services::DiscountService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/discounts/validate",
    tag = "discount",
    request_body = ValidateDiscountRequest,
    responses(
        (status = 200, description = "Quote for the code, nothing reserved", body = DiscountQuoteResponse),
        (status = 400, description = "Code fails a validation rule"),
        (status = 409, description = "Code already used by this customer")
    )
)]
pub async fn validate_discount(
    discount_service: web::Data<DiscountService>,
    request: web::Json<ValidateDiscountRequest>,
) -> Result<HttpResponse> {
    match discount_service.validate_discount(&request).await {
        Ok(quote) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": quote
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/discounts",
    tag = "discount",
    request_body = CreateDiscountRequest,
    responses(
        (status = 200, description = "Discount created", body = DiscountResponse),
        (status = 409, description = "Code already exists")
    )
)]
pub async fn create_discount(
    discount_service: web::Data<DiscountService>,
    request: web::Json<CreateDiscountRequest>,
) -> Result<HttpResponse> {
    match discount_service.create_discount(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/discounts",
    tag = "discount",
    responses(
        (status = 200, description = "All discount codes", body = [DiscountResponse])
    )
)]
pub async fn list_discounts(
    discount_service: web::Data<DiscountService>,
) -> Result<HttpResponse> {
    match discount_service.list_discounts().await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn discount_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/discounts")
            .route("", web::post().to(create_discount))
            .route("", web::get().to(list_discounts))
            .route("/validate", web::post().to(validate_discount)),
    );
}
