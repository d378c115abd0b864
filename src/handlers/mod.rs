pub mod availability;
pub mod booking;
pub mod catalog;
pub mod discount;
pub mod loyalty;
pub mod payment;
pub mod webhook;

pub use availability::availability_config;
pub use booking::booking_config;
pub use catalog::catalog_config;
pub use discount::discount_config;
pub use loyalty::loyalty_config;
pub use payment::payment_config;
pub use webhook::webhook_config;
