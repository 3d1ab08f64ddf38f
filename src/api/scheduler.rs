use std::time::Duration;

use axum::{Json, extract::State};
use serde::Deserialize;

use super::error::ApiError;
use crate::{app::AppState, scheduler::SchedulerState};

#[derive(Debug, Deserialize)]
pub(crate) struct IntervalRequest {
    #[serde(default)]
    interval_minutes: Option<u64>,
}

impl IntervalRequest {
    fn interval(&self, fallback: Duration) -> Duration {
        self.interval_minutes
            .map_or(fallback, |minutes| Duration::from_secs(minutes.saturating_mul(60)))
    }
}

pub(crate) async fn state(State(state): State<AppState>) -> Json<SchedulerState> {
    Json(state.scheduler().state())
}

/// 間隔を省略すると直近の間隔（未変更なら設定値）で開始する。
pub(crate) async fn start(
    State(state): State<AppState>,
    request: Option<Json<IntervalRequest>>,
) -> Result<Json<SchedulerState>, ApiError> {
    let fallback = Duration::from_secs(state.scheduler().state().interval_seconds);
    let interval = request.map_or(fallback, |Json(request)| request.interval(fallback));
    Ok(Json(state.scheduler().start(interval)?))
}

pub(crate) async fn stop(State(state): State<AppState>) -> Result<Json<SchedulerState>, ApiError> {
    Ok(Json(state.scheduler().stop()?))
}

pub(crate) async fn reconfigure(
    State(state): State<AppState>,
    Json(request): Json<IntervalRequest>,
) -> Result<Json<SchedulerState>, ApiError> {
    let minutes = request.interval_minutes.ok_or_else(|| {
        ApiError::bad_request("invalid_interval", "interval_minutes is required")
    })?;
    let interval = Duration::from_secs(minutes.saturating_mul(60));
    Ok(Json(state.scheduler().reconfigure(interval)?))
}
