use std::fmt::Write;

use super::bridge_metrics::BridgeMetrics;

pub fn render_prometheus(m: &BridgeMetrics) -> String {
    let mut out = String::with_capacity(1024);

    write_counter(&mut out, "pulse_bridge_metrics_received_total", m.metrics_received_val());
    write_counter(&mut out, "pulse_bridge_metrics_invalid_total", m.metrics_invalid_val());
    write_counter(&mut out, "pulse_bridge_alerts_fired_total", m.alerts_fired_val());
    write_counter(&mut out, "pulse_bridge_alerts_persisted_total", m.alerts_persisted_val());
    write_counter(&mut out, "pulse_bridge_alerts_persist_failed_total", m.alerts_persist_failed_val());
    write_counter(
        &mut out,
        "pulse_bridge_external_alerts_forwarded_total",
        m.external_alerts_forwarded_val(),
    );
    write_counter(
        &mut out,
        "pulse_bridge_external_alerts_invalid_total",
        m.external_alerts_invalid_val(),
    );
    write_counter(&mut out, "pulse_bridge_bus_errors_total", m.bus_errors_val());
    write_counter(&mut out, "pulse_bridge_ack_errors_total", m.ack_errors_val());

    let (sum, count) = m.processing_latency_vals();
    write_summary(&mut out, "pulse_bridge_processing_latency_us", sum, count);

    out
}

pub fn write_counter(out: &mut String, name: &str, val: u64) {
    let _ = writeln!(out, "# TYPE {name} counter");
    let _ = writeln!(out, "{name} {val}");
}

pub fn write_gauge(out: &mut String, name: &str, val: u64) {
    let _ = writeln!(out, "# TYPE {name} gauge");
    let _ = writeln!(out, "{name} {val}");
}

pub fn write_summary(out: &mut String, name: &str, sum: u64, count: u64) {
    let _ = writeln!(out, "# TYPE {name} summary");
    let _ = writeln!(out, "{name}_sum {sum}");
    let _ = writeln!(out, "{name}_count {count}");
}
