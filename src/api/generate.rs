use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{error::ApiError, parse_theme};
use crate::{app::AppState, scheduler::RunOutcome, store::Artifact};

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateRequest {
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    theme: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateResponse {
    run_id: Uuid,
    corrected: bool,
    post: Artifact,
}

/// 手動生成。実行が終わるまで待ち、記録済みの結果を返す。
pub(crate) async fn generate(
    State(state): State<AppState>,
    Json(payload): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<GenerateResponse>), ApiError> {
    state.telemetry().record_manual_generate_invocation();
    let theme = parse_theme(payload.theme.as_deref())?;

    match state.scheduler().trigger_now(payload.topic, theme).await? {
        RunOutcome::Succeeded { run_id, artifact } => {
            info!(%run_id, post_id = %artifact.id, "manual generation completed");
            Ok((
                StatusCode::CREATED,
                Json(GenerateResponse {
                    run_id,
                    corrected: artifact.was_corrected(),
                    post: artifact,
                }),
            ))
        }
        RunOutcome::Failed { error, .. } => Err(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::http::StatusCode;
    use serde_json::json;
    use tokio::sync::Notify;

    use crate::api::test_support::{send, test_app};
    use crate::pipeline::orchestrator::test_support::ScriptedGenerator;
    use crate::pipeline::{ContentGenerator, GenerationRequest};
    use crate::store::RunStatus;

    const DEFI_POST: &str = "# DeFi Today\n\nSmart contracts and DeFi protocols power Web3.\n\nMeta Description: On-chain finance.";

    #[tokio::test]
    async fn generate_returns_created_post_with_correction() {
        let app = test_app(Arc::new(ScriptedGenerator::always(DEFI_POST)));

        let (status, body) = send(
            &app.router,
            "POST",
            "/v1/generate",
            Some(json!({"topic": "LLM news", "theme": "genai"})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["corrected"], true);
        assert_eq!(body["post"]["requested_theme"], "genai");
        assert_eq!(body["post"]["effective_theme"], "blockchain");
        assert_eq!(body["post"]["title"], "DeFi Today");
        assert_eq!(body["post"]["meta_description"], "On-chain finance.");
        assert_eq!(app.dao.post_count().await, 1);
    }

    #[tokio::test]
    async fn unknown_theme_is_bad_request() {
        let app = test_app(Arc::new(ScriptedGenerator::always(DEFI_POST)));
        let (status, body) = send(
            &app.router,
            "POST",
            "/v1/generate",
            Some(json!({"theme": "cooking"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "unknown_theme");
        assert!(app.dao.all_runs().await.is_empty());
    }

    #[tokio::test]
    async fn writer_failure_is_bad_gateway_and_recorded() {
        let generator = ScriptedGenerator::new(vec![Err(anyhow::anyhow!("upstream 503"))]);
        let app = test_app(Arc::new(generator));

        let (status, body) = send(&app.router, "POST", "/v1/generate", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "generation_failure");

        let runs = app.dao.all_runs().await;
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn persistence_failure_is_internal_error() {
        let app = test_app(Arc::new(ScriptedGenerator::always(DEFI_POST)));
        app.dao.set_fail_post_writes(true);

        let (status, body) = send(&app.router, "POST", "/v1/generate", Some(json!({}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "persistence_failure");
    }

    struct GatedGenerator {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ContentGenerator for GatedGenerator {
        async fn generate(&self, _request: &GenerationRequest) -> anyhow::Result<String> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(DEFI_POST.to_string())
        }
    }

    #[tokio::test]
    async fn concurrent_generate_is_conflict() {
        let generator = Arc::new(GatedGenerator {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let app = test_app(Arc::clone(&generator) as Arc<dyn ContentGenerator>);

        let router = app.router.clone();
        let first = tokio::spawn(async move {
            send(&router, "POST", "/v1/generate", Some(json!({}))).await
        });
        generator.entered.notified().await;

        let (status, body) = send(&app.router, "POST", "/v1/generate", Some(json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "run_in_progress");

        generator.release.notify_one();
        let (status, _) = first.await.expect("join");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(app.dao.all_runs().await.len(), 1);
    }
}
