use crate::config::GatewayConfig;
use crate::error::{AppError, AppResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Closed metadata record attached to payment events. The reconciler keys on
/// the intent id; these fields are informational.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventMetadata {
    pub booking_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub discount_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEventData {
    /// Gateway intent id; the idempotency key for reconciliation.
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub metadata: EventMetadata,
}

/// The gateway delivers events at least once; unknown kinds are acknowledged
/// without processing.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GatewayEvent {
    PaymentSucceeded(PaymentEventData),
    PaymentFailed(PaymentEventData),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct GatewayIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: i64,
    pub status: String,
}

#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    config: GatewayConfig,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build gateway client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a payment intent at the gateway. Timed-out or unreachable
    /// calls surface as `ExternalUnavailable`; nothing is retried here.
    pub async fn create_payment_intent(
        &self,
        amount_cents: i64,
        booking_id: i64,
        customer_id: Option<i64>,
        discount_code: Option<&str>,
    ) -> AppResult<GatewayIntent> {
        let url = format!("{}/v1/payment_intents", self.config.base_url);

        let mut params = vec![
            ("amount", amount_cents.to_string()),
            ("currency", "usd".to_string()),
            ("metadata[booking_id]", booking_id.to_string()),
        ];
        if let Some(cid) = customer_id {
            params.push(("metadata[customer_id]", cid.to_string()));
        }
        if let Some(code) = discount_code {
            params.push(("metadata[discount_code]", code.to_string()));
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(map_transport_err)?;

        if response.status().is_success() {
            let intent: GatewayIntent = response.json().await?;
            Ok(intent)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            Err(AppError::ExternalUnavailable(format!(
                "Failed to create payment intent: {error_text}"
            )))
        }
    }

    /// Boolean signature gate over the raw webhook body: HMAC-SHA256 keyed by
    /// the webhook secret, base64 in the signature header.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> bool {
        let Ok(expected) = BASE64.decode(signature.trim()) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(self.config.webhook_secret.as_bytes()) else {
            return false;
        };
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    }
}

fn map_transport_err(e: reqwest::Error) -> AppError {
    if e.is_timeout() || e.is_connect() {
        AppError::ExternalUnavailable(format!("Payment gateway unreachable: {e}"))
    } else {
        AppError::ReqwestError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_secret(secret: &str) -> GatewayClient {
        GatewayClient::new(GatewayConfig {
            base_url: "http://localhost:0".to_string(),
            secret_key: "sk_test".to_string(),
            webhook_secret: secret.to_string(),
            request_timeout_secs: 1,
        })
        .unwrap()
    }

    fn sign(secret: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        BASE64.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_valid_signature() {
        let client = client_with_secret("whsec_123");
        let body = br#"{"type":"payment_succeeded"}"#;
        let sig = sign("whsec_123", body);
        assert!(client.verify_webhook_signature(body, &sig));
    }

    #[test]
    fn rejects_wrong_secret_and_garbage() {
        let client = client_with_secret("whsec_123");
        let body = br#"{"type":"payment_succeeded"}"#;
        let sig = sign("whsec_other", body);
        assert!(!client.verify_webhook_signature(body, &sig));
        assert!(!client.verify_webhook_signature(body, "not base64 !!!"));
    }

    #[test]
    fn parses_payment_succeeded_event() {
        let body = r#"{
            "type": "payment_succeeded",
            "data": {
                "id": "pi_123",
                "amount": 5000,
                "metadata": {"booking_id": 7, "discount_code": "SAVE15"}
            }
        }"#;
        let event: GatewayEvent = serde_json::from_str(body).unwrap();
        match event {
            GatewayEvent::PaymentSucceeded(data) => {
                assert_eq!(data.id, "pi_123");
                assert_eq!(data.amount, 5000);
                assert_eq!(data.metadata.booking_id, Some(7));
                assert_eq!(data.metadata.discount_code.as_deref(), Some("SAVE15"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_event_types_parse_as_unknown() {
        let body = r#"{"type": "charge_disputed", "data": {"id": "ch_1", "amount": 1}}"#;
        let event: GatewayEvent = serde_json::from_str(body).unwrap();
        assert!(matches!(event, GatewayEvent::Unknown));
    }

    #[test]
    fn missing_metadata_defaults_to_empty() {
        let body = r#"{"type": "payment_failed", "data": {"id": "pi_9", "amount": 100}}"#;
        let event: GatewayEvent = serde_json::from_str(body).unwrap();
        match event {
            GatewayEvent::PaymentFailed(data) => {
                assert!(data.metadata.booking_id.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
