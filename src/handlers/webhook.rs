use crate::external::{GatewayClient, GatewayEvent};
use crate::services::{PaymentService, ReconcileOutcome};
use actix_web::{HttpRequest, HttpResponse, Result, web};
use log::{error, info, warn};
use serde_json::json;

/// Payment gateway webhook receiver.
///
/// Always acknowledges with 200 once the signature checks out, including for
/// replayed and unrecognized events, so the gateway stops retrying. Only a bad
/// signature is rejected.
pub async fn payment_webhook(
    req: HttpRequest,
    body: web::Bytes,
    gateway: web::Data<GatewayClient>,
    payment_service: web::Data<PaymentService>,
) -> Result<HttpResponse> {
    let signature = match req.headers().get("X-Gateway-Signature") {
        Some(sig) => sig.to_str().unwrap_or(""),
        None => {
            warn!("Missing X-Gateway-Signature header");
            return Ok(HttpResponse::Unauthorized().json(json!({
                "error": "Missing X-Gateway-Signature header"
            })));
        }
    };

    if !gateway.verify_webhook_signature(&body, signature) {
        warn!("Webhook signature verification failed");
        return Ok(HttpResponse::Unauthorized().json(json!({
            "error": "Invalid signature"
        })));
    }

    let event: GatewayEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            error!("Malformed webhook payload: {e}");
            return Ok(HttpResponse::BadRequest().json(json!({
                "error": "Malformed payload"
            })));
        }
    };

    match payment_service.reconcile_event(event).await {
        Ok(ReconcileOutcome::Processed) => {
            info!("Webhook event processed");
        }
        Ok(ReconcileOutcome::Duplicate) => {
            info!("Webhook event already processed, acknowledging replay");
        }
        Ok(ReconcileOutcome::Ignored) => {
            info!("Unhandled webhook event type, acknowledging");
        }
        Err(e) => {
            // Acknowledge anyway; the failure is logged and the transaction
            // state is unchanged, so a later replay can still land.
            error!("Failed to process webhook event: {e}");
            return Ok(HttpResponse::Ok().json(json!({
                "received": true,
                "error": format!("Processing failed: {}", e)
            })));
        }
    }

    Ok(HttpResponse::Ok().json(json!({
        "received": true
    })))
}

pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/webhook").route("/payments", web::post().to(payment_webhook)));
}
