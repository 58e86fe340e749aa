use async_trait::async_trait;
use pulse_common::LiveMessage;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SinkError {
    #[error("live sink closed")]
    Closed,
    #[error("encode: {0}")]
    Encode(String),
}

/// Where the bridge pushes live messages; the broadcast hub in production.
#[async_trait]
pub trait LiveSink: Send + Sync {
    async fn publish(&self, message: LiveMessage) -> Result<(), SinkError>;
}
