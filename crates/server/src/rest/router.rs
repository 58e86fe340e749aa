use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use pulse_common::Clock;
use pulse_workers::alert::Evaluator;
use pulse_workers::metrics::BridgeMetrics;
use pulse_workers::store::Store;

use super::{alerts, health, hub, metrics, rules, ws};
use crate::hub::HubHandle;
use crate::metrics::HubMetrics;
use crate::middleware::require_token;

#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub evaluator: Arc<Evaluator>,
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub hub_metrics: Arc<HubMetrics>,
    pub bridge_metrics: Arc<BridgeMetrics>,
    pub api_token: Option<Arc<str>>,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/v1/ws", get(ws::ws_upgrade))
        .route("/v1/hub", get(hub::snapshot))
        .route("/v1/rules", get(rules::list_rules).post(rules::create_rule))
        .route("/v1/rules/reload", post(rules::reload_rules))
        .route(
            "/v1/rules/{rule_id}",
            get(rules::get_rule)
                .put(rules::update_rule)
                .delete(rules::delete_rule),
        )
        .route("/v1/alerts", get(alerts::list_alerts))
        .route("/v1/alerts/{alert_id}", get(alerts::get_alert))
        .route("/v1/alerts/{alert_id}/ack", post(alerts::acknowledge_alert))
        .route_layer(from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/ready", get(health::ready))
        .route("/metrics", get(metrics::metrics))
        .merge(api)
        .with_state(state)
}
