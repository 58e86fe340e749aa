use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::{TimeZone, Utc};
use pulse_common::{Alert, ManualClock, MetricType, Severity};
use pulse_server::hub::{Hub, HubConfig};
use pulse_server::metrics::HubMetrics;
use pulse_server::rest::{router, AppState, RuleResponse};
use pulse_workers::alert::Evaluator;
use pulse_workers::metrics::BridgeMetrics;
use pulse_workers::store::{InMemoryStore, Store};
use serde_json::{json, Value};
use tokio::sync::watch;
use tower::ServiceExt;

struct TestApp {
    state: AppState,
    store: Arc<InMemoryStore>,
    shutdown: watch::Sender<bool>,
}

impl TestApp {
    fn app(&self) -> axum::Router {
        router(self.state.clone())
    }
}

fn test_app(api_token: Option<&str>) -> TestApp {
    let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
    let store = Arc::new(InMemoryStore::new());
    let (shutdown, shutdown_rx) = watch::channel(false);
    let hub_metrics = HubMetrics::new();
    let (hub, _task) = Hub::spawn(HubConfig::default(), hub_metrics.clone(), shutdown_rx);

    let state = AppState {
        hub,
        evaluator: Arc::new(Evaluator::new(Vec::new(), clock.clone())),
        store: store.clone(),
        clock,
        hub_metrics,
        bridge_metrics: BridgeMetrics::new(),
        api_token: api_token.map(Arc::from),
    };
    TestApp {
        state,
        store,
        shutdown,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn cpu_rule_body() -> Value {
    json!({
        "name": "checkout cpu",
        "service_name": "checkout",
        "metric_type": "cpu",
        "operator": ">",
        "threshold": 90.0,
        "severity": "critical",
        "cooldown_secs": 60
    })
}

fn alert(id: &str, service: &str, severity: Severity, offset_secs: i64) -> Alert {
    Alert {
        id: id.into(),
        rule_id: Some("r-1".into()),
        service_name: service.into(),
        alert_type: MetricType::Cpu,
        severity,
        message: "checkout cpu: cpu > 90 on checkout (observed 95)".into(),
        value: 95.0,
        threshold: 90.0,
        timestamp: Utc.timestamp_opt(1_700_000_000 + offset_secs, 0).unwrap(),
        acknowledged: false,
        acknowledged_by: None,
        acknowledged_at: None,
    }
}

#[tokio::test]
async fn healthz_returns_ok() {
    let t = test_app(None);
    let resp = t.app().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn ready_reflects_hub_state() {
    let t = test_app(None);
    let resp = t.app().oneshot(get("/ready")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    t.shutdown.send(true).unwrap();
    // The snapshot fails only after the coordinator has stopped.
    while t.state.hub.snapshot().await.is_ok() {
        tokio::task::yield_now().await;
    }
    let resp = t.app().oneshot(get("/ready")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn metrics_endpoint_renders_prometheus() {
    let t = test_app(None);
    let resp = t.app().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("pulse_hub_clients_connected 0"));
    assert!(text.contains("pulse_bridge_alerts_fired_total 0"));
}

#[tokio::test]
async fn create_then_get_rule() {
    let t = test_app(None);
    let resp = t
        .app()
        .oneshot(send_json("POST", "/v1/rules", cpu_rule_body()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: RuleResponse = body_json(resp).await;
    assert_eq!(created.rule.service_name, "checkout");
    assert_eq!(created.rule.cooldown_secs, 60);
    assert!(created.rule.enabled);
    assert!(!created.cooling_down);
    assert!(created.last_fired_at.is_none());

    let resp = t
        .app()
        .oneshot(get(&format!("/v1/rules/{}", created.rule.id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let stored = t.store.get_rules().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(t.state.evaluator.rules().len(), 1);
}

#[tokio::test]
async fn invalid_rule_fields_are_rejected() {
    let t = test_app(None);
    for (field, value) in [
        ("metric_type", json!("disk")),
        ("operator", json!("~=")),
        ("severity", json!("urgent")),
        ("service_name", json!("  ")),
    ] {
        let mut body = cpu_rule_body();
        body[field] = value;
        let resp = t
            .app()
            .oneshot(send_json("POST", "/v1/rules", body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "field {field}");
    }
    assert!(t.store.get_rules().await.unwrap().is_empty());
}

#[tokio::test]
async fn update_and_delete_rule() {
    let t = test_app(None);
    let resp = t
        .app()
        .oneshot(send_json("POST", "/v1/rules", cpu_rule_body()))
        .await
        .unwrap();
    let created: RuleResponse = body_json(resp).await;
    let uri = format!("/v1/rules/{}", created.rule.id);

    let resp = t
        .app()
        .oneshot(send_json("PUT", &uri, json!({"threshold": 75.0, "enabled": false})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: RuleResponse = body_json(resp).await;
    assert_eq!(updated.rule.threshold, 75.0);
    assert!(!updated.rule.enabled);
    assert_eq!(updated.rule.created_at, created.rule.created_at);

    let resp = t
        .app()
        .oneshot(Request::builder().method("DELETE").uri(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = t.app().oneshot(get(&uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = t
        .app()
        .oneshot(Request::builder().method("DELETE").uri(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_missing_rule_is_not_found() {
    let t = test_app(None);
    let resp = t
        .app()
        .oneshot(send_json("PUT", "/v1/rules/nope", json!({"threshold": 1.0})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reload_pulls_rules_from_store() {
    let t = test_app(None);
    let resp = t
        .app()
        .oneshot(send_json("POST", "/v1/rules", cpu_rule_body()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    t.state.evaluator.load_rules(Vec::new());

    let resp = t
        .app()
        .oneshot(Request::builder().method("POST").uri("/v1/rules/reload").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["loaded"], 1);
    assert_eq!(t.state.evaluator.rules().len(), 1);
}

#[tokio::test]
async fn list_alerts_filters_and_pages() {
    let t = test_app(None);
    t.store.put_alert(&alert("a-1", "checkout", Severity::Critical, 0)).await.unwrap();
    t.store.put_alert(&alert("a-2", "search", Severity::Warning, 10)).await.unwrap();
    t.store.put_alert(&alert("a-3", "checkout", Severity::Warning, 20)).await.unwrap();

    let resp = t.app().oneshot(get("/v1/alerts")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let all: Vec<Alert> = body_json(resp).await;
    let ids: Vec<&str> = all.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["a-3", "a-2", "a-1"]);

    let resp = t
        .app()
        .oneshot(get("/v1/alerts?service=checkout&severity=warning"))
        .await
        .unwrap();
    let filtered: Vec<Alert> = body_json(resp).await;
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, "a-3");

    let resp = t.app().oneshot(get("/v1/alerts?limit=1&offset=1")).await.unwrap();
    let page: Vec<Alert> = body_json(resp).await;
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, "a-2");

    let resp = t.app().oneshot(get("/v1/alerts?severity=urgent")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn acknowledge_is_one_way() {
    let t = test_app(None);
    t.store.put_alert(&alert("a-1", "checkout", Severity::Critical, 0)).await.unwrap();

    let resp = t
        .app()
        .oneshot(send_json("POST", "/v1/alerts/a-1/ack", json!({"actor": "alice"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let acked: Alert = body_json(resp).await;
    assert!(acked.acknowledged);
    assert_eq!(acked.acknowledged_by.as_deref(), Some("alice"));

    let resp = t
        .app()
        .oneshot(send_json("POST", "/v1/alerts/a-1/ack", json!({"actor": "bob"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = t.app().oneshot(get("/v1/alerts/a-1")).await.unwrap();
    let stored: Alert = body_json(resp).await;
    assert_eq!(stored.acknowledged_by.as_deref(), Some("alice"));

    let resp = t.app().oneshot(get("/v1/alerts?acknowledged=false")).await.unwrap();
    let open: Vec<Alert> = body_json(resp).await;
    assert!(open.is_empty());
}

#[tokio::test]
async fn acknowledge_unknown_or_blank() {
    let t = test_app(None);
    let resp = t
        .app()
        .oneshot(send_json("POST", "/v1/alerts/nope/ack", json!({"actor": "alice"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    t.store.put_alert(&alert("a-1", "checkout", Severity::Info, 0)).await.unwrap();
    let resp = t
        .app()
        .oneshot(send_json("POST", "/v1/alerts/a-1/ack", json!({"actor": " "})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn hub_snapshot_endpoint() {
    let t = test_app(None);
    let _sub = t.state.hub.register().await.unwrap();
    let resp = t.app().oneshot(get("/v1/hub")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["connected"], 1);
    assert_eq!(body["clients"][0]["state"], "registered");
}

#[tokio::test]
async fn token_required_when_configured() {
    let t = test_app(Some("s3cret"));

    let resp = t.app().oneshot(get("/v1/rules")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = t
        .app()
        .oneshot(
            Request::builder()
                .uri("/v1/rules")
                .header(header::AUTHORIZATION, "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = t
        .app()
        .oneshot(
            Request::builder()
                .uri("/v1/rules")
                .header(header::AUTHORIZATION, "Bearer s3cret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = t.app().oneshot(get("/v1/rules?token=s3cret")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = t.app().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
