use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rule::MetricType;

/// One per-service observation as published on the metrics stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub service_name: String,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub latency_p95_ms: f64,
    pub error_rate: f64,
    pub request_count: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("service name must not be empty")]
    EmptyService,
    #[error("{field} is not a finite number")]
    NotFinite { field: &'static str },
    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl MetricSample {
    pub fn value_of(&self, metric: MetricType) -> f64 {
        match metric {
            MetricType::Cpu => self.cpu_usage,
            MetricType::Memory => self.memory_usage,
            MetricType::Latency => self.latency_p95_ms,
            MetricType::ErrorRate => self.error_rate,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.service_name.trim().is_empty() {
            return Err(ValidationError::EmptyService);
        }
        check_range("cpu_usage", self.cpu_usage, 0.0, 100.0)?;
        check_range("memory_usage", self.memory_usage, 0.0, 100.0)?;
        check_range("latency_p95_ms", self.latency_p95_ms, 0.0, f64::MAX)?;
        check_range("error_rate", self.error_rate, 0.0, 1.0)?;
        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field });
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
