pub mod availability_service;
pub mod booking_service;
pub mod discount_service;
pub mod loyalty_service;
pub mod payment_service;

pub use availability_service::*;
pub use booking_service::*;
pub use discount_service::*;
pub use loyalty_service::*;
pub use payment_service::*;
