pub mod alert;
pub mod clock;
pub mod envelope;
pub mod nats_config;
pub mod retry;
pub mod rule;
pub mod sample;

pub use alert::{AckError, Alert};
pub use clock::{Clock, ManualClock, SystemClock};
pub use envelope::LiveMessage;
pub use rule::{MetricType, Operator, ParseEnumError, Rule, Severity};
pub use sample::{MetricSample, ValidationError};
