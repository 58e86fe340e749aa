use pulse_common::Rule;

pub fn render_message(rule: &Rule, service_name: &str, value: f64) -> String {
    format!(
        "{}: {} {} {} on {} (observed {})",
        rule.name, rule.metric_type, rule.operator, rule.threshold, service_name, value
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pulse_common::{MetricType, Operator, Severity};

    #[test]
    fn message_is_deterministic() {
        let rule = Rule {
            id: "r-1".into(),
            name: "checkout cpu".into(),
            description: String::new(),
            service_name: "checkout".into(),
            metric_type: MetricType::Cpu,
            threshold: 90.0,
            operator: Operator::GreaterThan,
            severity: Severity::Critical,
            enabled: true,
            cooldown_secs: 60,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(
            render_message(&rule, "checkout", 95.5),
            "checkout cpu: cpu > 90 on checkout (observed 95.5)"
        );
        assert_eq!(
            render_message(&rule, "checkout", 95.5),
            render_message(&rule, "checkout", 95.5)
        );
    }
}
