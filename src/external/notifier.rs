use crate::config::NotificationConfig;
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    BookingCreated {
        booking_id: i64,
        customer_phone: String,
        date: String,
        time: String,
    },
    BookingConfirmed {
        booking_id: i64,
    },
    BookingCancelled {
        booking_id: i64,
    },
}

/// Fire-and-forget delivery to the notification collaborator. Failures are
/// logged and swallowed; they never roll back a booking or payment change.
#[derive(Clone)]
pub struct NotificationService {
    client: Client,
    config: NotificationConfig,
}

impl NotificationService {
    pub fn new(config: NotificationConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn notify(&self, event: NotificationEvent) {
        if !self.config.enabled || self.config.webhook_url.is_empty() {
            return;
        }
        let client = self.client.clone();
        let url = self.config.webhook_url.clone();
        tokio::spawn(async move {
            match client.post(&url).json(&event).send().await {
                Ok(resp) if resp.status().is_success() => {
                    log::debug!("Notification delivered: {event:?}");
                }
                Ok(resp) => {
                    log::warn!("Notification endpoint returned {}: {event:?}", resp.status());
                }
                Err(e) => {
                    log::warn!("Failed to deliver notification: {e}");
                }
            }
        });
    }
}
