use anyhow::{Context, Result};
use sqlx::{Executor, PgPool};

/// テーブル定義。タグの一意性は書き込み時に検証し、DB制約にはしない。
const SCHEMA_STATEMENTS: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS blog_posts (
        id UUID PRIMARY KEY,
        title TEXT NOT NULL,
        slug TEXT NOT NULL,
        topic TEXT NOT NULL,
        content TEXT NOT NULL,
        meta_description TEXT,
        requested_theme TEXT NOT NULL,
        effective_theme TEXT NOT NULL,
        tags TEXT[] NOT NULL DEFAULT '{}',
        word_count INTEGER NOT NULL,
        published BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_blog_posts_created_at ON blog_posts (created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_blog_posts_effective_theme ON blog_posts (effective_theme)",
    r"
    CREATE TABLE IF NOT EXISTS blog_runs (
        id UUID PRIMARY KEY,
        requested_theme TEXT NOT NULL,
        requested_topic TEXT,
        status TEXT NOT NULL CHECK (status IN ('pending', 'succeeded', 'failed')),
        error_message TEXT,
        artifact_id UUID REFERENCES blog_posts (id),
        trigger_source TEXT NOT NULL,
        started_at TIMESTAMPTZ NOT NULL,
        finished_at TIMESTAMPTZ,
        CHECK ((status = 'succeeded') = (artifact_id IS NOT NULL))
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_blog_runs_started_at ON blog_runs (started_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_blog_runs_pending ON blog_runs (started_at) WHERE status = 'pending'",
];

/// 起動時にテーブルを用意する。既存テーブルには触れない。
pub(crate) async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        pool.execute(*statement)
            .await
            .with_context(|| format!("failed to apply schema statement: {}", statement.trim()))?;
    }
    tracing::info!(statements = SCHEMA_STATEMENTS.len(), "database schema ensured");
    Ok(())
}
