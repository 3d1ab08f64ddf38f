pub mod shutdown;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tracing::info;

use crate::{
    api,
    classification::TagNormalizer,
    clients::{WriterClient, WriterConfig},
    config::{Config, StorageBackend},
    observability::Telemetry,
    pipeline::{ContentGenerator, PipelineOrchestrator, ThemeRng},
    scheduler::{RunLedger, Scheduler},
    store::{BlogDao, InMemoryBlogDao, PgBlogDao},
};

#[derive(Clone)]
pub(crate) struct AppState {
    registry: Arc<ComponentRegistry>,
}

/// プロセス内で共有するコンポーネント一式。
pub struct ComponentRegistry {
    config: Arc<Config>,
    telemetry: Telemetry,
    scheduler: Scheduler,
    dao: Arc<dyn BlogDao>,
    generator: Arc<dyn ContentGenerator>,
}

impl AppState {
    pub(crate) fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self { registry }
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.registry.telemetry
    }

    pub(crate) fn scheduler(&self) -> &Scheduler {
        &self.registry.scheduler
    }

    pub(crate) fn dao(&self) -> Arc<dyn BlogDao> {
        Arc::clone(&self.registry.dao)
    }

    pub(crate) fn generator(&self) -> Arc<dyn ContentGenerator> {
        Arc::clone(&self.registry.generator)
    }
}

impl ComponentRegistry {
    /// 構成情報から依存をまとめて初期化する。
    ///
    /// # Errors
    /// Telemetry の初期化、DB 接続、HTTP クライアント構築のいずれかが失敗した場合。
    pub async fn build(config: Config) -> Result<Self> {
        let telemetry = Telemetry::new()?;
        let dao: Arc<dyn BlogDao> = match config.storage_backend() {
            StorageBackend::Postgres => {
                let dsn = config
                    .db_dsn()
                    .context("AUTOBLOG_DB_DSN is required for postgres storage")?;
                Arc::new(PgBlogDao::connect(&config, dsn).await?)
            }
            StorageBackend::Memory => Arc::new(InMemoryBlogDao::new()),
        };
        info!(backend = dao.backend(), "repository ready");

        let writer = WriterClient::new(WriterConfig {
            base_url: config.writer_base_url().to_string(),
            connect_timeout: config.writer_connect_timeout(),
            total_timeout: config.generation_timeout(),
            service_token: config.writer_service_token().map(str::to_string),
        })?;

        Ok(Self::from_parts(config, telemetry, dao, Arc::new(writer)))
    }

    /// 生成器とリポジトリを差し替えて組み立てる（テストや別バックエンド用）。
    #[must_use]
    pub fn from_parts(
        config: Config,
        telemetry: Telemetry,
        dao: Arc<dyn BlogDao>,
        generator: Arc<dyn ContentGenerator>,
    ) -> Self {
        let config = Arc::new(config);
        let metrics = telemetry.metrics();
        let pipeline = PipelineOrchestrator::builder(
            Arc::clone(&generator),
            Arc::clone(&dao),
            Arc::clone(&metrics),
        )
            .with_normalizer(TagNormalizer::new(
                config.tag_min_count(),
                config.tag_max_count(),
            ))
            .with_rng(ThemeRng::from_optional_seed(config.theme_rng_seed()))
            .with_generation_timeout(config.generation_timeout())
            .build();
        let ledger = RunLedger::new(
            Arc::clone(&dao),
            config.run_stale_after(),
            Arc::clone(&metrics),
        );
        let scheduler = Scheduler::new(
            Arc::new(pipeline),
            Arc::new(ledger),
            metrics,
            config.scheduler_interval(),
        );

        Self {
            config,
            telemetry,
            scheduler,
            dao,
            generator,
        }
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    #[must_use]
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }
}

pub fn build_router(registry: Arc<ComponentRegistry>) -> Router {
    let state = AppState::new(registry);
    api::router(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registry_builds_with_memory_backend() {
        let config = Config::in_memory("http://localhost:18080/");
        let registry = ComponentRegistry::build(config)
            .await
            .expect("registry builds");

        let state = registry.scheduler().state();
        assert!(!state.enabled);
        assert!(!state.is_running);
        assert_eq!(state.interval_seconds, 1440 * 60);
        assert_eq!(registry.config().storage_backend(), StorageBackend::Memory);
        assert!(
            registry
                .telemetry()
                .render_prometheus()
                .contains("autoblog_scheduler_enabled")
        );
    }
}
