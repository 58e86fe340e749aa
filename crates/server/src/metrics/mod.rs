pub mod exposition;
pub mod hub_metrics;

pub use hub_metrics::HubMetrics;
