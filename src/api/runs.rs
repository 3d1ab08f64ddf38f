use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ApiError;
use crate::{
    app::AppState,
    store::{RunRecord, RunStats},
};

const DEFAULT_STATS_WINDOW_HOURS: u32 = 24;
const MAX_STATS_WINDOW_HOURS: u32 = 24 * 365;
const DEFAULT_RUN_LIMIT: u32 = 20;
const MAX_RUN_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub(crate) struct StatsQuery {
    hours: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RunsQuery {
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RunList {
    runs: Vec<RunRecord>,
}

pub(crate) async fn stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<RunStats>, ApiError> {
    let hours = query
        .hours
        .unwrap_or(DEFAULT_STATS_WINDOW_HOURS)
        .clamp(1, MAX_STATS_WINDOW_HOURS);
    state
        .scheduler()
        .ledger()
        .stats(hours)
        .await
        .map(Json)
        .map_err(|err| ApiError::internal(&err))
}

/// 開始が新しい順のラン。
pub(crate) async fn list(
    State(state): State<AppState>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<RunList>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_RUN_LIMIT).clamp(1, MAX_RUN_LIMIT);
    let runs = state
        .scheduler()
        .ledger()
        .recent_runs(limit)
        .await
        .map_err(|err| ApiError::internal(&err))?;
    Ok(Json(RunList { runs }))
}

pub(crate) async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RunRecord>, ApiError> {
    state
        .scheduler()
        .ledger()
        .get_run(id)
        .await
        .map_err(|err| ApiError::internal(&err))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("run {id} not found")))
}

/// 閾値を超えて pending のままのラン。
pub(crate) async fn stale(State(state): State<AppState>) -> Result<Json<RunList>, ApiError> {
    let runs = state
        .scheduler()
        .ledger()
        .stale_runs()
        .await
        .map_err(|err| ApiError::internal(&err))?;
    Ok(Json(RunList { runs }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use chrono::Utc;
    use serde_json::json;

    use crate::api::test_support::{send, test_app};
    use crate::classification::Theme;
    use crate::pipeline::orchestrator::test_support::ScriptedGenerator;
    use crate::store::{BlogDao, RunRecord, RunTrigger};

    #[tokio::test]
    async fn stats_count_runs_and_posts() {
        let generator = ScriptedGenerator::new(vec![
            Ok("# A\n\nBitcoin ETF flows.".to_string()),
            Err(anyhow::anyhow!("writer down")),
        ]);
        let app = test_app(Arc::new(generator));
        send(&app.router, "POST", "/v1/generate", Some(json!({}))).await;
        send(&app.router, "POST", "/v1/generate", Some(json!({}))).await;

        let (status, body) = send(&app.router, "GET", "/v1/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["window_hours"], 24);
        assert_eq!(body["total_runs"], 2);
        assert_eq!(body["succeeded"], 1);
        assert_eq!(body["failed"], 1);
        assert_eq!(body["total_posts"], 1);
        assert_eq!(body["themes"]["blockchain"], 1);

        let (_, body) = send(&app.router, "GET", "/v1/runs?limit=1", None).await;
        let runs = body["runs"].as_array().expect("runs");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0]["status"], "failed");
    }

    #[tokio::test]
    async fn stale_lists_old_pending_runs() {
        let app = test_app(Arc::new(ScriptedGenerator::always("# A\n\nB")));
        let mut old = RunRecord::pending(Theme::Genai, None, RunTrigger::Scheduled);
        old.started_at = Utc::now() - chrono::Duration::hours(5);
        app.dao.insert_run(&old).await.expect("insert");

        let (status, body) = send(&app.router, "GET", "/v1/runs/stale", None).await;
        assert_eq!(status, StatusCode::OK);
        let runs = body["runs"].as_array().expect("runs");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0]["id"], old.id.to_string());
    }

    #[tokio::test]
    async fn single_run_is_fetched_by_id() {
        let app = test_app(Arc::new(ScriptedGenerator::always("# A\n\nBitcoin ETF flows.")));
        let (_, created) = send(&app.router, "POST", "/v1/generate", Some(json!({}))).await;
        let run_id = created["run_id"].as_str().expect("run id").to_string();

        let (status, body) = send(&app.router, "GET", &format!("/v1/runs/{run_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "succeeded");
        assert_eq!(body["artifact_id"], created["post"]["id"]);

        let missing = uuid::Uuid::new_v4();
        let (status, body) = send(&app.router, "GET", &format!("/v1/runs/{missing}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "not_found");
    }
}
