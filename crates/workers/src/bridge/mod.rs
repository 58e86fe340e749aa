mod connection;
mod handler;
mod sink;
mod source;
mod stream_bridge;

pub use connection::{connect_jetstream, create_pull_consumer, ensure_stream};
pub use handler::{decode_alert, decode_metric, HandleError};
pub use sink::{LiveSink, SinkError};
pub use source::{Acker, BusError, ChannelSource, Delivery, EventSource, JetStreamSource};
pub use stream_bridge::{BridgeConfig, BridgeError, StreamBridge};
