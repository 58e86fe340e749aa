use serde::{Deserialize, Serialize};

use crate::alert::Alert;
use crate::sample::MetricSample;

/// Frame pushed to dashboard connections, one JSON object per message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum LiveMessage {
    Metric(MetricSample),
    Alert(Alert),
}

impl LiveMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Metric(_) => "metric",
            Self::Alert(_) => "alert",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
