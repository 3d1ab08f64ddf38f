/// PgBlogDao - BlogDaoトレイトのPostgreSQL実装
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, postgres::PgPoolOptions};
use uuid::Uuid;

use super::dao_trait::BlogDao;
use super::post::PostQueries;
use super::run::RunQueries;
use super::schema::ensure_schema;
use crate::config::Config;
use crate::store::models::{
    Artifact, Pagination, PostFilter, RunCompletion, RunRecord, RunStats,
};

#[derive(Debug, Clone)]
pub struct PgBlogDao {
    pool: PgPool,
}

impl PgBlogDao {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 設定からプールを作り、スキーマを用意する。
    ///
    /// # Errors
    /// 接続やスキーマ適用に失敗した場合はエラーを返す。
    pub async fn connect(config: &Config, dsn: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections())
            .min_connections(config.db_min_connections())
            .acquire_timeout(config.db_acquire_timeout())
            .idle_timeout(Some(Duration::from_secs(600)))
            .connect(dsn)
            .await
            .context("failed to connect to PostgreSQL")?;
        ensure_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BlogDao for PgBlogDao {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("database ping failed")?;
        Ok(())
    }

    async fn save_post(&self, post: &Artifact) -> anyhow::Result<Uuid> {
        PostQueries::save(&self.pool, post).await
    }

    async fn get_post(&self, id: Uuid) -> anyhow::Result<Option<Artifact>> {
        PostQueries::get(&self.pool, id).await
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        pagination: Pagination,
    ) -> anyhow::Result<Vec<Artifact>> {
        PostQueries::list(&self.pool, filter, pagination).await
    }

    async fn set_published(&self, id: Uuid, published: bool) -> anyhow::Result<Option<Artifact>> {
        PostQueries::set_published(&self.pool, id, published).await
    }

    async fn insert_run(&self, record: &RunRecord) -> anyhow::Result<()> {
        RunQueries::insert(&self.pool, record).await
    }

    async fn finalize_run(&self, id: Uuid, completion: &RunCompletion) -> anyhow::Result<()> {
        RunQueries::finalize(&self.pool, id, completion).await
    }

    async fn get_run(&self, id: Uuid) -> anyhow::Result<Option<RunRecord>> {
        RunQueries::get(&self.pool, id).await
    }

    async fn list_runs(&self, limit: u32) -> anyhow::Result<Vec<RunRecord>> {
        RunQueries::list(&self.pool, limit).await
    }

    async fn find_stale_runs(
        &self,
        started_before: DateTime<Utc>,
    ) -> anyhow::Result<Vec<RunRecord>> {
        RunQueries::find_stale(&self.pool, started_before).await
    }

    async fn run_stats(&self, since: DateTime<Utc>, window_hours: u32) -> anyhow::Result<RunStats> {
        RunQueries::stats(&self.pool, since, window_hours).await
    }
}
