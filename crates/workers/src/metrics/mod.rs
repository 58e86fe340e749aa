pub mod bridge_metrics;
pub mod exposition;

pub use bridge_metrics::BridgeMetrics;
