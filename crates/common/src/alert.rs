use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rule::{MetricType, Severity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    /// None for alerts produced by another service and relayed from the bus.
    #[serde(default)]
    pub rule_id: Option<String>,
    pub service_name: String,
    pub alert_type: MetricType,
    pub severity: Severity,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub acknowledged_by: Option<String>,
    #[serde(default)]
    pub acknowledged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AckError {
    #[error("alert {0} is already acknowledged")]
    AlreadyAcknowledged(String),
    #[error("acknowledging actor must not be empty")]
    EmptyActor,
}

impl Alert {
    /// Acknowledgment is one-way; a second call leaves the record untouched.
    pub fn acknowledge(&mut self, actor: &str, at: DateTime<Utc>) -> Result<(), AckError> {
        if actor.trim().is_empty() {
            return Err(AckError::EmptyActor);
        }
        if self.acknowledged {
            return Err(AckError::AlreadyAcknowledged(self.id.clone()));
        }
        self.acknowledged = true;
        self.acknowledged_by = Some(actor.to_string());
        self.acknowledged_at = Some(at);
        Ok(())
    }
}
