pub mod availability;
pub mod booking;
pub mod discount;
pub mod loyalty;
pub mod payment;

pub use availability::*;
pub use booking::*;
pub use discount::*;
pub use loyalty::*;
pub use payment::*;
