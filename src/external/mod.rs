pub mod gateway;
pub mod notifier;

pub use gateway::{GatewayClient, GatewayEvent, PaymentEventData};
pub use notifier::{NotificationEvent, NotificationService};
