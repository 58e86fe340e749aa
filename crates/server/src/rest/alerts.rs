use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use pulse_common::{Alert, Severity};
use pulse_workers::store::AlertFilter;
use serde::Deserialize;

use super::error::store_status;
use super::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AlertQuery {
    pub service: Option<String>,
    pub severity: Option<String>,
    pub acknowledged: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl AlertQuery {
    fn into_filter(self) -> Result<AlertFilter, StatusCode> {
        let severity = match self.severity.as_deref() {
            Some(s) => Some(s.parse::<Severity>().map_err(|_| StatusCode::BAD_REQUEST)?),
            None => None,
        };
        Ok(AlertFilter {
            service: self.service.filter(|s| !s.is_empty()),
            severity,
            acknowledged: self.acknowledged,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

#[derive(Deserialize)]
pub struct AckRequest {
    pub actor: String,
}

pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertQuery>,
) -> Result<Json<Vec<Alert>>, StatusCode> {
    let filter = query.into_filter()?;
    state
        .store
        .list_alerts(&filter)
        .await
        .map(Json)
        .map_err(store_status)
}

pub async fn get_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
) -> Result<Json<Alert>, StatusCode> {
    state
        .store
        .get_alert(&alert_id)
        .await
        .map(Json)
        .map_err(store_status)
}

/// One-way: a second acknowledgment is a conflict and leaves the first
/// actor and time in place.
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
    Json(body): Json<AckRequest>,
) -> Result<Json<Alert>, StatusCode> {
    let actor = body.actor.trim();
    if actor.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let alert = state
        .store
        .acknowledge_alert(&alert_id, actor, state.clock.now())
        .await
        .map_err(store_status)?;
    tracing::info!(alert_id = %alert.id, actor = %actor, "alert acknowledged");
    Ok(Json(alert))
}
