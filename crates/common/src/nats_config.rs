pub const METRICS_STREAM: &str = "PULSE_METRICS";
pub const METRICS_SUBJECT: &str = "pulse.metrics.>";
pub const METRICS_SUBJECT_PREFIX: &str = "pulse.metrics";
pub const METRICS_CONSUMER: &str = "pulse-hub-metrics";

pub const ALERTS_STREAM: &str = "PULSE_ALERTS";
pub const ALERTS_SUBJECT: &str = "pulse.alerts.>";
pub const ALERTS_SUBJECT_PREFIX: &str = "pulse.alerts";
pub const ALERTS_CONSUMER: &str = "pulse-hub-alerts";

pub fn metrics_subject_for(service_name: &str) -> String {
    format!("{METRICS_SUBJECT_PREFIX}.{service_name}")
}

pub fn alerts_subject_for(service_name: &str) -> String {
    format!("{ALERTS_SUBJECT_PREFIX}.{service_name}")
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub name: String,
    pub subjects: Vec<String>,
    pub consumer: String,
    pub max_bytes: i64,
    pub max_age_secs: u64,
    pub max_deliver: i64,
}

impl StreamConfig {
    pub fn metrics() -> Self {
        Self {
            name: METRICS_STREAM.into(),
            subjects: vec![METRICS_SUBJECT.into()],
            consumer: METRICS_CONSUMER.into(),
            max_bytes: 1_073_741_824,
            max_age_secs: 86400,
            max_deliver: 5,
        }
    }

    pub fn alerts() -> Self {
        Self {
            name: ALERTS_STREAM.into(),
            subjects: vec![ALERTS_SUBJECT.into()],
            consumer: ALERTS_CONSUMER.into(),
            max_bytes: 268_435_456,
            max_age_secs: 86400 * 7,
            max_deliver: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_format() {
        assert_eq!(metrics_subject_for("checkout"), "pulse.metrics.checkout");
        assert_eq!(alerts_subject_for("checkout"), "pulse.alerts.checkout");
    }

    #[test]
    fn streams_do_not_overlap() {
        let m = StreamConfig::metrics();
        let a = StreamConfig::alerts();
        assert_ne!(m.name, a.name);
        assert_ne!(m.consumer, a.consumer);
        assert_eq!(m.subjects, vec!["pulse.metrics.>".to_string()]);
        assert_eq!(a.subjects, vec!["pulse.alerts.>".to_string()]);
    }
}
