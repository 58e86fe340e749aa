use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use pulse_common::{MetricType, Operator, Rule, Severity};
use serde::{Deserialize, Serialize};

use super::error::store_status;
use super::AppState;

const DEFAULT_COOLDOWN_SECS: u64 = 300;

#[derive(Deserialize)]
pub struct CreateRuleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub service_name: String,
    pub metric_type: String,
    pub operator: String,
    pub threshold: f64,
    pub severity: Option<String>,
    pub enabled: Option<bool>,
    pub cooldown_secs: Option<u64>,
}

#[derive(Deserialize)]
pub struct UpdateRuleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub service_name: Option<String>,
    pub metric_type: Option<String>,
    pub operator: Option<String>,
    pub threshold: Option<f64>,
    pub severity: Option<String>,
    pub enabled: Option<bool>,
    pub cooldown_secs: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RuleResponse {
    #[serde(flatten)]
    pub rule: Rule,
    pub last_fired_at: Option<DateTime<Utc>>,
    pub cooling_down: bool,
}

#[derive(Serialize)]
pub struct ReloadResponse {
    pub loaded: usize,
}

fn to_response(state: &AppState, rule: Rule) -> RuleResponse {
    RuleResponse {
        last_fired_at: state.evaluator.state_of(&rule.id).last_fired_at(),
        cooling_down: state.evaluator.cooling_down(&rule),
        rule,
    }
}

fn parse_field<T: std::str::FromStr>(raw: &str) -> Result<T, StatusCode> {
    raw.parse().map_err(|_| StatusCode::BAD_REQUEST)
}

fn validate(rule: &Rule) -> Result<(), StatusCode> {
    if rule.name.trim().is_empty() || rule.service_name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    if !rule.threshold.is_finite() {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(())
}

pub async fn list_rules(State(state): State<AppState>) -> Json<Vec<RuleResponse>> {
    let rules = state.evaluator.rules();
    Json(
        rules
            .iter()
            .cloned()
            .map(|r| to_response(&state, r))
            .collect(),
    )
}

pub async fn get_rule(
    State(state): State<AppState>,
    Path(rule_id): Path<String>,
) -> Result<Json<RuleResponse>, StatusCode> {
    state
        .evaluator
        .rule(&rule_id)
        .map(|r| Json(to_response(&state, r)))
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn create_rule(
    State(state): State<AppState>,
    Json(body): Json<CreateRuleRequest>,
) -> Result<(StatusCode, Json<RuleResponse>), StatusCode> {
    let now = state.clock.now();
    let rule = Rule {
        id: uuid::Uuid::new_v4().to_string(),
        name: body.name,
        description: body.description,
        service_name: body.service_name,
        metric_type: parse_field::<MetricType>(&body.metric_type)?,
        threshold: body.threshold,
        operator: parse_field::<Operator>(&body.operator)?,
        severity: match body.severity.as_deref() {
            Some(s) => parse_field::<Severity>(s)?,
            None => Severity::Warning,
        },
        enabled: body.enabled.unwrap_or(true),
        cooldown_secs: body.cooldown_secs.unwrap_or(DEFAULT_COOLDOWN_SECS),
        created_at: now,
        updated_at: now,
    };
    validate(&rule)?;

    state.store.put_rule(&rule).await.map_err(store_status)?;
    state.evaluator.upsert_rule(rule.clone());
    tracing::info!(rule_id = %rule.id, service = %rule.service_name, "rule created");

    Ok((StatusCode::CREATED, Json(to_response(&state, rule))))
}

pub async fn update_rule(
    State(state): State<AppState>,
    Path(rule_id): Path<String>,
    Json(body): Json<UpdateRuleRequest>,
) -> Result<Json<RuleResponse>, StatusCode> {
    let existing = state.evaluator.rule(&rule_id).ok_or(StatusCode::NOT_FOUND)?;

    let updated = Rule {
        id: existing.id,
        name: body.name.unwrap_or(existing.name),
        description: body.description.unwrap_or(existing.description),
        service_name: body.service_name.unwrap_or(existing.service_name),
        metric_type: match body.metric_type.as_deref() {
            Some(m) => parse_field(m)?,
            None => existing.metric_type,
        },
        threshold: body.threshold.unwrap_or(existing.threshold),
        operator: match body.operator.as_deref() {
            Some(o) => parse_field(o)?,
            None => existing.operator,
        },
        severity: match body.severity.as_deref() {
            Some(s) => parse_field(s)?,
            None => existing.severity,
        },
        enabled: body.enabled.unwrap_or(existing.enabled),
        cooldown_secs: body.cooldown_secs.unwrap_or(existing.cooldown_secs),
        created_at: existing.created_at,
        updated_at: state.clock.now(),
    };
    validate(&updated)?;

    state.store.put_rule(&updated).await.map_err(store_status)?;
    state.evaluator.upsert_rule(updated.clone());
    tracing::info!(rule_id = %updated.id, enabled = updated.enabled, "rule updated");

    Ok(Json(to_response(&state, updated)))
}

pub async fn delete_rule(
    State(state): State<AppState>,
    Path(rule_id): Path<String>,
) -> StatusCode {
    let in_store = match state.store.delete_rule(&rule_id).await {
        Ok(()) => true,
        Err(pulse_workers::store::StoreError::NotFound(_)) => false,
        Err(e) => return store_status(e),
    };
    let in_evaluator = state.evaluator.remove_rule(&rule_id);

    if in_store || in_evaluator {
        tracing::info!(rule_id = %rule_id, "rule deleted");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Replaces the active rule set with what the store holds.
pub async fn reload_rules(
    State(state): State<AppState>,
) -> Result<Json<ReloadResponse>, StatusCode> {
    let rules = state.store.get_rules().await.map_err(store_status)?;
    let loaded = rules.len();
    state.evaluator.load_rules(rules);
    Ok(Json(ReloadResponse { loaded }))
}
