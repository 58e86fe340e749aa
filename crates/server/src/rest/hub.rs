use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::AppState;
use crate::hub::HubSnapshot;

pub async fn snapshot(State(state): State<AppState>) -> Result<Json<HubSnapshot>, StatusCode> {
    state
        .hub
        .snapshot()
        .await
        .map(Json)
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)
}
