//! 生成試行の記録。すべてのランは pending で始まり、ちょうど1回だけ終端状態に書き換わる。
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crate::classification::Theme;
use crate::observability::Metrics;
use crate::store::{BlogDao, RunCompletion, RunRecord, RunStats, RunTrigger};

/// pending のランへの参照。終端記録で消費されるので二重終端はコンパイルできない。
#[derive(Debug)]
#[must_use = "a started run must be finished with record_success or record_failure"]
pub struct RunHandle {
    id: Uuid,
    started: Instant,
}

impl RunHandle {
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }
}

pub struct RunLedger {
    dao: Arc<dyn BlogDao>,
    stale_after: Duration,
    metrics: Arc<Metrics>,
}

impl RunLedger {
    #[must_use]
    pub fn new(dao: Arc<dyn BlogDao>, stale_after: Duration, metrics: Arc<Metrics>) -> Self {
        Self {
            dao,
            stale_after,
            metrics,
        }
    }

    /// pending のランを書き込む。失敗したらランは始めない。
    ///
    /// # Errors
    /// リポジトリへの書き込みに失敗した場合。
    pub async fn record_start(
        &self,
        theme: Theme,
        topic: Option<&str>,
        trigger: RunTrigger,
    ) -> Result<RunHandle> {
        let record = RunRecord::pending(theme, topic.map(str::to_string), trigger);
        self.dao
            .insert_run(&record)
            .await
            .with_context(|| format!("failed to record start of run {}", record.id))?;
        self.metrics.runs_started.inc();
        info!(
            run_id = %record.id,
            theme = %theme,
            trigger = trigger.as_ref(),
            "run started"
        );
        Ok(RunHandle {
            id: record.id,
            started: Instant::now(),
        })
    }

    pub async fn record_success(&self, handle: RunHandle, artifact_id: Uuid) {
        self.metrics.runs_succeeded.inc();
        self.finish(handle, RunCompletion::Succeeded { artifact_id })
            .await;
    }

    pub async fn record_failure(&self, handle: RunHandle, message: &str) {
        self.metrics.runs_failed.inc();
        self.finish(
            handle,
            RunCompletion::Failed {
                message: message.to_string(),
            },
        )
        .await;
    }

    async fn finish(&self, handle: RunHandle, completion: RunCompletion) {
        let elapsed = handle.started.elapsed();
        self.metrics.run_duration.observe(elapsed.as_secs_f64());
        match self.dao.finalize_run(handle.id, &completion).await {
            Ok(()) => info!(
                run_id = %handle.id,
                status = completion.status().as_ref(),
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "run finished"
            ),
            Err(err) => {
                // pending のまま残り、stale_runs で見える
                self.metrics.ledger_write_failures.inc();
                error!(
                    run_id = %handle.id,
                    status = completion.status().as_ref(),
                    error = %format!("{err:#}"),
                    "failed to record run outcome"
                );
            }
        }
    }

    /// 閾値より古い pending ラン。解決はしない。
    ///
    /// # Errors
    /// リポジトリの読み出しに失敗した場合。
    pub async fn stale_runs(&self) -> Result<Vec<RunRecord>> {
        let threshold = chrono::Duration::from_std(self.stale_after)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
        self.dao.find_stale_runs(threshold).await
    }

    /// # Errors
    /// リポジトリの読み出しに失敗した場合。
    pub async fn recent_runs(&self, limit: u32) -> Result<Vec<RunRecord>> {
        self.dao.list_runs(limit).await
    }

    /// # Errors
    /// リポジトリの読み出しに失敗した場合。
    pub async fn stats(&self, window_hours: u32) -> Result<RunStats> {
        let since = Utc::now()
            .checked_sub_signed(chrono::Duration::hours(i64::from(window_hours)))
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
        self.dao.run_stats(since, window_hours).await
    }

    /// # Errors
    /// リポジトリの読み出しに失敗した場合。
    pub async fn get_run(&self, id: Uuid) -> Result<Option<RunRecord>> {
        self.dao.get_run(id).await
    }
}
