pub mod bookings;
pub mod customer_loyalty;
pub mod discount_usages;
pub mod discounts;
pub mod loyalty_badges;
pub mod loyalty_rewards;
pub mod payment_transactions;
pub mod services;

pub use bookings as booking_entity;
pub use customer_loyalty as customer_loyalty_entity;
pub use discount_usages as discount_usage_entity;
pub use discounts as discount_entity;
pub use loyalty_badges as loyalty_badge_entity;
pub use loyalty_rewards as loyalty_reward_entity;
pub use payment_transactions as payment_transaction_entity;
pub use services as service_entity;

pub use bookings::{BookingStatus, PaymentStatus};
pub use customer_loyalty::LoyaltyTier;
pub use discounts::DiscountType;
pub use loyalty_rewards::{MilestoneKind, RewardType};
pub use payment_transactions::TransactionStatus;
