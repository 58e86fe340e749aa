use pulse_common::{Alert, MetricSample};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HandleError {
    #[error("decode: {0}")]
    Decode(String),
    #[error("invalid: {0}")]
    Invalid(String),
}

/// Decoding only; range checks happen when the evaluator sees the sample.
pub fn decode_metric(payload: &[u8]) -> Result<MetricSample, HandleError> {
    serde_json::from_slice(payload).map_err(|e| HandleError::Decode(e.to_string()))
}

pub fn decode_alert(payload: &[u8]) -> Result<Alert, HandleError> {
    let alert: Alert =
        serde_json::from_slice(payload).map_err(|e| HandleError::Decode(e.to_string()))?;
    if alert.id.trim().is_empty() {
        return Err(HandleError::Invalid("alert id is empty".into()));
    }
    if alert.service_name.trim().is_empty() {
        return Err(HandleError::Invalid("service_name is empty".into()));
    }
    if !alert.value.is_finite() || !alert.threshold.is_finite() {
        return Err(HandleError::Invalid("value and threshold must be finite".into()));
    }
    Ok(alert)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metric_json(cpu: f64) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "service_name": "checkout",
            "cpu_usage": cpu,
            "memory_usage": 40.0,
            "latency_p95_ms": 120.0,
            "error_rate": 0.01,
            "request_count": 300,
            "timestamp": "2024-01-01T00:00:00Z"
        }))
        .unwrap()
    }

    fn alert_json(id: &str, service: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": id,
            "service_name": service,
            "alert_type": "latency",
            "severity": "warning",
            "message": "p95 latency high",
            "value": 900.0,
            "threshold": 500.0,
            "timestamp": "2024-01-01T00:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn decodes_valid_metric() {
        let sample = decode_metric(&metric_json(55.0)).unwrap();
        assert_eq!(sample.service_name, "checkout");
        assert_eq!(sample.cpu_usage, 55.0);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode_metric(b"{not json"), Err(HandleError::Decode(_))));
        assert!(matches!(decode_alert(&[0xFF, 0xFE]), Err(HandleError::Decode(_))));
    }

    #[test]
    fn out_of_range_metric_still_decodes() {
        let sample = decode_metric(&metric_json(101.0)).unwrap();
        assert!(sample.validate().is_err());
    }

    #[test]
    fn decodes_external_alert_without_ack_fields() {
        let alert = decode_alert(&alert_json("ext-1", "search")).unwrap();
        assert_eq!(alert.id, "ext-1");
        assert!(alert.rule_id.is_none());
        assert!(!alert.acknowledged);
    }

    #[test]
    fn rejects_alert_without_service() {
        assert!(matches!(decode_alert(&alert_json("ext-1", " ")), Err(HandleError::Invalid(_))));
    }
}
