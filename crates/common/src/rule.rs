use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub service_name: String,
    pub metric_type: MetricType,
    pub threshold: f64,
    pub operator: Operator,
    pub severity: Severity,
    pub enabled: bool,
    pub cooldown_secs: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rule {
    pub fn cooldown(&self) -> Duration {
        i64::try_from(self.cooldown_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Cpu,
    Memory,
    Latency,
    ErrorRate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "==")]
    Equal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Memory => "memory",
            Self::Latency => "latency",
            Self::ErrorRate => "error_rate",
        }
    }
}

impl Operator {
    /// Exact comparison on the raw floats. `==` is intentionally not
    /// epsilon-tolerant.
    #[allow(clippy::float_cmp)]
    pub fn compare(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::GreaterOrEqual => value >= threshold,
            Self::LessThan => value < threshold,
            Self::LessOrEqual => value <= threshold,
            Self::Equal => value == threshold,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::Equal => "==",
        }
    }
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(Self::Cpu),
            "memory" => Ok(Self::Memory),
            "latency" => Ok(Self::Latency),
            "error_rate" => Ok(Self::ErrorRate),
            other => Err(ParseEnumError::new("metric type", other)),
        }
    }
}

impl FromStr for Operator {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" => Ok(Self::GreaterThan),
            ">=" => Ok(Self::GreaterOrEqual),
            "<" => Ok(Self::LessThan),
            "<=" => Ok(Self::LessOrEqual),
            "==" => Ok(Self::Equal),
            other => Err(ParseEnumError::new("operator", other)),
        }
    }
}

impl FromStr for Severity {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            other => Err(ParseEnumError::new("severity", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_greater_than() {
        assert!(Operator::GreaterThan.compare(10.0, 5.0));
        assert!(!Operator::GreaterThan.compare(5.0, 5.0));
    }

    #[test]
    fn operator_less_than() {
        assert!(Operator::LessThan.compare(1.0, 5.0));
        assert!(!Operator::LessThan.compare(10.0, 5.0));
    }

    #[test]
    fn operator_boundaries() {
        assert!(Operator::GreaterOrEqual.compare(5.0, 5.0));
        assert!(Operator::LessOrEqual.compare(5.0, 5.0));
    }

    #[test]
    fn equal_is_exact() {
        assert!(Operator::Equal.compare(0.5, 0.5));
        assert!(!Operator::Equal.compare(0.1 + 0.2, 0.3));
    }

    #[test]
    fn operator_serializes_as_symbol() {
        let json = serde_json::to_string(&Operator::GreaterOrEqual).unwrap();
        assert_eq!(json, "\">=\"");
        let op: Operator = serde_json::from_str("\"<\"").unwrap();
        assert_eq!(op, Operator::LessThan);
    }

    #[test]
    fn enums_round_trip_through_str() {
        for m in [MetricType::Cpu, MetricType::Memory, MetricType::Latency, MetricType::ErrorRate] {
            assert_eq!(m.as_str().parse::<MetricType>().unwrap(), m);
        }
        assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("==".parse::<Operator>().unwrap(), Operator::Equal);
    }

    #[test]
    fn unknown_values_rejected() {
        let err = "disk".parse::<MetricType>().unwrap_err();
        assert!(err.to_string().contains("metric type"));
        assert!("!=".parse::<Operator>().is_err());
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn cooldown_saturates() {
        let mut rule = Rule {
            id: "r".into(),
            name: "n".into(),
            description: String::new(),
            service_name: "s".into(),
            metric_type: MetricType::Cpu,
            threshold: 1.0,
            operator: Operator::GreaterThan,
            severity: Severity::Info,
            enabled: true,
            cooldown_secs: 60,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(rule.cooldown(), Duration::seconds(60));
        rule.cooldown_secs = u64::MAX;
        assert_eq!(rule.cooldown(), Duration::MAX);
    }
}
