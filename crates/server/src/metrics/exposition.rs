use pulse_workers::metrics::exposition::{self as bridge_exposition, write_counter, write_gauge};
use pulse_workers::metrics::BridgeMetrics;

use super::hub_metrics::HubMetrics;

pub fn render_prometheus(hub: &HubMetrics, bridge: &BridgeMetrics) -> String {
    let mut out = String::with_capacity(2048);

    write_gauge(&mut out, "pulse_hub_clients_connected", hub.clients_connected_val());
    write_counter(&mut out, "pulse_hub_clients_registered_total", hub.clients_registered_val());
    write_counter(&mut out, "pulse_hub_clients_unregistered_total", hub.clients_unregistered_val());
    write_counter(&mut out, "pulse_hub_clients_evicted_total", hub.clients_evicted_val());
    write_counter(&mut out, "pulse_hub_messages_broadcast_total", hub.messages_broadcast_val());
    write_counter(&mut out, "pulse_hub_frames_delivered_total", hub.frames_delivered_val());
    write_counter(&mut out, "pulse_hub_frames_dropped_total", hub.frames_dropped_val());

    out.push_str(&bridge_exposition::render_prometheus(bridge));
    out
}
