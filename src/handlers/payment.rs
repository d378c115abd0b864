use crate::models::{CreateIntentRequest, CreateIntentResponse};
use crate::services::PaymentService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/payments/intent",
    tag = "payment",
    request_body = CreateIntentRequest,
    responses(
        (status = 200, description = "Gateway intent created", body = CreateIntentResponse),
        (status = 400, description = "Booking not payable"),
        (status = 502, description = "Payment gateway unreachable")
    )
)]
pub async fn create_intent(
    payment_service: web::Data<PaymentService>,
    request: web::Json<CreateIntentRequest>,
) -> Result<HttpResponse> {
    match payment_service.create_intent(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn payment_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/payments/intent", web::post().to(create_intent));
}
