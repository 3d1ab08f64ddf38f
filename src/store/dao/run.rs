use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::types::{RunStatus, RunTrigger};
use crate::classification::Theme;
use crate::store::models::{RunCompletion, RunRecord, RunStats};

const RUN_COLUMNS: &str = "id, requested_theme, requested_topic, status, error_message, \
     artifact_id, trigger_source, started_at, finished_at";

pub(crate) struct RunQueries;

impl RunQueries {
    pub async fn insert(pool: &PgPool, record: &RunRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO blog_runs (
                id, requested_theme, requested_topic, status, error_message,
                artifact_id, trigger_source, started_at, finished_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(record.id)
        .bind(record.requested_theme.as_str())
        .bind(record.requested_topic.as_deref())
        .bind(record.status.as_ref())
        .bind(record.error_message.as_deref())
        .bind(record.artifact_id)
        .bind(record.trigger.as_ref())
        .bind(record.started_at)
        .bind(record.finished_at)
        .execute(pool)
        .await
        .with_context(|| format!("failed to insert run record {}", record.id))?;
        Ok(())
    }

    /// pending の行だけを更新する。0行なら二重終端か存在しないラン。
    pub async fn finalize(pool: &PgPool, id: Uuid, completion: &RunCompletion) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE blog_runs
            SET status = $2,
                error_message = $3,
                artifact_id = $4,
                finished_at = NOW()
            WHERE id = $1 AND status = 'pending'
            ",
        )
        .bind(id)
        .bind(completion.status().as_ref())
        .bind(completion.error_message())
        .bind(completion.artifact_id())
        .execute(pool)
        .await
        .with_context(|| format!("failed to finalize run {id}"))?;

        if result.rows_affected() == 0 {
            bail!("run {id} is not pending (missing or already finalized)");
        }
        Ok(())
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<RunRecord>> {
        let row = sqlx::query(&format!("SELECT {RUN_COLUMNS} FROM blog_runs WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch run record")?;
        row.as_ref().map(run_from_row).transpose()
    }

    pub async fn list(pool: &PgPool, limit: u32) -> Result<Vec<RunRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {RUN_COLUMNS} FROM blog_runs ORDER BY started_at DESC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await
        .context("failed to list run records")?;
        rows.iter().map(run_from_row).collect()
    }

    pub async fn find_stale(pool: &PgPool, started_before: DateTime<Utc>) -> Result<Vec<RunRecord>> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {RUN_COLUMNS}
            FROM blog_runs
            WHERE status = 'pending' AND started_at < $1
            ORDER BY started_at ASC
            "
        ))
        .bind(started_before)
        .fetch_all(pool)
        .await
        .context("failed to query stale runs")?;
        rows.iter().map(run_from_row).collect()
    }

    pub async fn stats(pool: &PgPool, since: DateTime<Utc>, window_hours: u32) -> Result<RunStats> {
        let status_rows = sqlx::query(
            r"
            SELECT status, COUNT(*) AS count
            FROM blog_runs
            WHERE started_at >= $1
            GROUP BY status
            ",
        )
        .bind(since)
        .fetch_all(pool)
        .await
        .context("failed to count runs by status")?;

        let (mut succeeded, mut failed, mut pending) = (0_u64, 0_u64, 0_u64);
        for row in &status_rows {
            let status: String = row.try_get("status")?;
            let count = non_negative(row.try_get("count")?)?;
            match RunStatus::from_db(&status)? {
                RunStatus::Succeeded => succeeded = count,
                RunStatus::Failed => failed = count,
                RunStatus::Pending => pending = count,
            }
        }

        let theme_rows = sqlx::query(
            r"
            SELECT effective_theme, COUNT(*) AS count
            FROM blog_posts
            WHERE created_at >= $1
            GROUP BY effective_theme
            ",
        )
        .bind(since)
        .fetch_all(pool)
        .await
        .context("failed to count posts by theme")?;

        let mut themes = BTreeMap::new();
        for row in &theme_rows {
            let theme: String = row.try_get("effective_theme")?;
            let count = non_negative(row.try_get("count")?)?;
            themes.insert(theme.parse::<Theme>()?, count);
        }

        Ok(RunStats::from_counts(
            window_hours,
            succeeded,
            failed,
            pending,
            themes,
        ))
    }
}

fn non_negative(count: i64) -> Result<u64> {
    u64::try_from(count).context("negative COUNT(*)")
}

fn run_from_row(row: &PgRow) -> Result<RunRecord> {
    let requested_theme: String = row.try_get("requested_theme")?;
    let status: String = row.try_get("status")?;
    let trigger: String = row.try_get("trigger_source")?;

    Ok(RunRecord {
        id: row.try_get("id")?,
        requested_theme: requested_theme.parse()?,
        requested_topic: row.try_get("requested_topic")?,
        status: RunStatus::from_db(&status)?,
        error_message: row.try_get("error_message")?,
        artifact_id: row.try_get("artifact_id")?,
        trigger: RunTrigger::from_db(&trigger)?,
        started_at: row.try_get("started_at")?,
        finished_at: row.try_get("finished_at")?,
    })
}
