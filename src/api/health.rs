use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::error;

use crate::app::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct HealthReport {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    backend: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl HealthReport {
    fn ready(backend: &'static str) -> Self {
        Self {
            status: "ready",
            backend: Some(backend),
            detail: None,
        }
    }

    fn degraded(backend: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status: "degraded",
            backend: Some(backend),
            detail: Some(detail.into()),
        }
    }
}

/// リポジトリと writer の両方が応答すれば ready。
pub(crate) async fn ready(
    State(state): State<AppState>,
) -> Result<Json<HealthReport>, (StatusCode, Json<HealthReport>)> {
    let dao = state.dao();

    if let Err(error) = dao.ping().await {
        state.telemetry().record_ready_probe(false);
        error!(error = %format!("{error:#}"), backend = dao.backend(), "repository readiness check failed");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthReport::degraded(
                dao.backend(),
                format!("repository: {error:#}"),
            )),
        ));
    }

    if let Err(error) = state.generator().health_check().await {
        state.telemetry().record_ready_probe(false);
        error!(error = %format!("{error:#}"), "writer readiness check failed");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthReport::degraded(
                dao.backend(),
                format!("writer: {error:#}"),
            )),
        ));
    }

    state.telemetry().record_ready_probe(true);
    Ok(Json(HealthReport::ready(dao.backend())))
}

pub(crate) async fn live(State(state): State<AppState>) -> Json<HealthReport> {
    state.telemetry().record_live_probe();
    Json(HealthReport {
        status: "live",
        backend: None,
        detail: None,
    })
}
