pub mod alert;
pub mod bridge;
pub mod metrics;
pub mod store;
