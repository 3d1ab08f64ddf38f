pub(crate) mod error;
pub(crate) mod generate;
pub(crate) mod health;
pub(crate) mod metrics;
pub(crate) mod posts;
pub(crate) mod runs;
pub(crate) mod scheduler;

use std::str::FromStr;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use self::error::ApiError;
use crate::app::AppState;
use crate::classification::Theme;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/metrics", get(metrics::exporter))
        .route("/v1/generate", post(generate::generate))
        .route("/v1/posts", get(posts::list))
        .route("/v1/posts/{id}", get(posts::get).patch(posts::set_published))
        .route("/v1/stats", get(runs::stats))
        .route("/v1/runs", get(runs::list))
        .route("/v1/runs/stale", get(runs::stale))
        .route("/v1/runs/{id}", get(runs::get))
        .route("/v1/scheduler", get(scheduler::state))
        .route("/v1/scheduler/start", post(scheduler::start))
        .route("/v1/scheduler/stop", post(scheduler::stop))
        .route("/v1/scheduler/interval", put(scheduler::reconfigure))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 空文字は未指定として扱う。
pub(crate) fn parse_theme(raw: Option<&str>) -> Result<Option<Theme>, ApiError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => Theme::from_str(value)
            .map(Some)
            .map_err(|err| ApiError::bad_request("unknown_theme", err.to_string())),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::app::{ComponentRegistry, build_router};
    use crate::config::Config;
    use crate::observability::Telemetry;
    use crate::pipeline::ContentGenerator;
    use crate::store::InMemoryBlogDao;

    pub(crate) struct TestApp {
        pub(crate) router: Router,
        pub(crate) registry: Arc<ComponentRegistry>,
        pub(crate) dao: Arc<InMemoryBlogDao>,
    }

    pub(crate) fn test_app(generator: Arc<dyn ContentGenerator>) -> TestApp {
        let dao = Arc::new(InMemoryBlogDao::new());
        let registry = Arc::new(ComponentRegistry::from_parts(
            Config::in_memory("http://writer.invalid/").with_theme_rng_seed(9),
            Telemetry::without_tracing().expect("telemetry"),
            Arc::clone(&dao) as Arc<dyn crate::store::BlogDao>,
            generator,
        ));
        TestApp {
            router: build_router(Arc::clone(&registry)),
            registry,
            dao,
        }
    }

    pub(crate) async fn send(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("router responds");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, json)
    }
}
