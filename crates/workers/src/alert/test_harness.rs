use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use pulse_common::{Alert, ManualClock, MetricSample, Rule};

use crate::alert::evaluator::Evaluator;

/// One replayed sample, observed `offset_secs` after the harness start.
pub struct Step {
    pub offset_secs: i64,
    pub sample: MetricSample,
}

pub struct HarnessResult {
    pub alerts: Vec<Alert>,
    pub fired_per_step: Vec<usize>,
    pub rejected: usize,
}

impl HarnessResult {
    pub fn fired_count(&self) -> usize {
        self.alerts.len()
    }
}

/// Replays samples through an evaluator driven by a manual clock, so cooldown
/// behaviour can be checked without waiting on wall time.
pub fn run_harness(rules: Vec<Rule>, start: DateTime<Utc>, steps: Vec<Step>) -> HarnessResult {
    let clock = Arc::new(ManualClock::new(start));
    let evaluator = Evaluator::new(rules, clock.clone());

    let mut alerts = Vec::new();
    let mut fired_per_step = Vec::with_capacity(steps.len());
    let mut rejected = 0;

    for step in &steps {
        clock.set(start + Duration::seconds(step.offset_secs));
        match evaluator.evaluate(&step.sample) {
            Ok(fired) => {
                fired_per_step.push(fired.len());
                alerts.extend(fired);
            }
            Err(_) => {
                fired_per_step.push(0);
                rejected += 1;
            }
        }
    }

    HarnessResult {
        alerts,
        fired_per_step,
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pulse_common::{MetricType, Operator, Severity};

    fn start() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn memory_rule(cooldown_secs: u64) -> Rule {
        Rule {
            id: "r-mem".into(),
            name: "High memory".into(),
            description: String::new(),
            service_name: "payments".into(),
            metric_type: MetricType::Memory,
            threshold: 80.0,
            operator: Operator::GreaterThan,
            severity: Severity::Warning,
            enabled: true,
            cooldown_secs,
            created_at: start(),
            updated_at: start(),
        }
    }

    fn step(offset_secs: i64, service: &str, memory: f64) -> Step {
        Step {
            offset_secs,
            sample: MetricSample {
                service_name: service.into(),
                cpu_usage: 10.0,
                memory_usage: memory,
                latency_p95_ms: 20.0,
                error_rate: 0.0,
                request_count: 1,
                timestamp: start(),
            },
        }
    }

    #[test]
    fn sustained_breach_fires_once_per_cooldown() {
        let steps = (0..10).map(|i| step(i * 10, "payments", 90.0)).collect();
        let result = run_harness(vec![memory_rule(60)], start(), steps);
        assert_eq!(result.fired_per_step, vec![1, 0, 0, 0, 0, 0, 1, 0, 0, 0]);
        assert_eq!(result.fired_count(), 2);
    }

    #[test]
    fn no_breach_no_alerts() {
        let steps = vec![step(0, "payments", 50.0), step(5, "payments", 79.9)];
        let result = run_harness(vec![memory_rule(60)], start(), steps);
        assert_eq!(result.fired_count(), 0);
    }

    #[test]
    fn recovery_does_not_reset_cooldown() {
        let steps = vec![
            step(0, "payments", 90.0),
            step(10, "payments", 40.0),
            step(20, "payments", 90.0),
        ];
        let result = run_harness(vec![memory_rule(60)], start(), steps);
        assert_eq!(result.fired_per_step, vec![1, 0, 0]);
    }

    #[test]
    fn services_do_not_share_rules() {
        let steps = vec![step(0, "search", 99.0), step(1, "payments", 99.0)];
        let result = run_harness(vec![memory_rule(60)], start(), steps);
        assert_eq!(result.fired_per_step, vec![0, 1]);
        assert_eq!(result.alerts[0].service_name, "payments");
    }

    #[test]
    fn invalid_samples_are_counted() {
        let steps = vec![step(0, "payments", 140.0), step(1, "payments", 90.0)];
        let result = run_harness(vec![memory_rule(60)], start(), steps);
        assert_eq!(result.rejected, 1);
        assert_eq!(result.fired_count(), 1);
    }
}
