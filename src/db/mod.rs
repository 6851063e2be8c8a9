//! Database access layer

pub mod audit;
pub mod payment_orders;
pub mod plans;
pub mod subscriptions;
