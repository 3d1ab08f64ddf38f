use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::classification::Theme;
use crate::observability::Metrics;
use crate::pipeline::{PipelineError, PipelineOrchestrator};
use crate::scheduler::cadence::IntervalCadence;
use crate::scheduler::daemon::{Arming, DaemonHandle, spawn_interval_daemon};
use crate::scheduler::gate::RunGate;
use crate::scheduler::ledger::RunLedger;
use crate::store::{Artifact, RunTrigger};

const DRAIN_POLL: Duration = Duration::from_millis(50);

/// 呼び出し側に返すスケジューラのエラー。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("a generation run is already in progress")]
    RunInProgress,
    #[error("scheduler is already running")]
    AlreadyRunning,
    #[error("scheduler is not running")]
    NotRunning,
    #[error("interval must be greater than zero")]
    InvalidInterval,
    #[error("run ledger unavailable: {0}")]
    Ledger(String),
}

impl SchedulerError {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SchedulerError::RunInProgress => "run_in_progress",
            SchedulerError::AlreadyRunning => "already_running",
            SchedulerError::NotRunning => "not_running",
            SchedulerError::InvalidInterval => "invalid_interval",
            SchedulerError::Ledger(_) => "ledger_unavailable",
        }
    }
}

/// ランが失敗した理由。台帳には `to_string()` が記録される。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunFailure {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("run aborted: {0}")]
    Aborted(String),
}

impl RunFailure {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RunFailure::Pipeline(err) => err.kind(),
            RunFailure::Aborted(_) => "run_aborted",
        }
    }
}

/// 記録まで終わった1回のランの結果。
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Succeeded { run_id: Uuid, artifact: Artifact },
    Failed { run_id: Uuid, error: RunFailure },
}

impl RunOutcome {
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        match self {
            RunOutcome::Succeeded { run_id, .. } | RunOutcome::Failed { run_id, .. } => *run_id,
        }
    }
}

/// スケジューラのスナップショット。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerState {
    pub enabled: bool,
    pub is_running: bool,
    pub interval_seconds: u64,
    pub next_fire_at: Option<DateTime<Utc>>,
}

struct Control {
    interval: Duration,
    daemon: Option<DaemonHandle>,
    next_fire_at: Option<DateTime<Utc>>,
    // デーモンを起動するたびに増やす。停止済みデーモンの遅れた書き込みを無視するため
    generation: u64,
}

struct SchedulerInner {
    pipeline: Arc<PipelineOrchestrator>,
    ledger: Arc<RunLedger>,
    gate: Arc<RunGate>,
    metrics: Arc<Metrics>,
    control: Mutex<Control>,
}

/// 定期実行と手動実行を1本化するスケジューラ。プロセスに1つ。
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        pipeline: Arc<PipelineOrchestrator>,
        ledger: Arc<RunLedger>,
        metrics: Arc<Metrics>,
        interval: Duration,
    ) -> Self {
        metrics.scheduler_enabled.set(0.0);
        Self {
            inner: Arc::new(SchedulerInner {
                pipeline,
                ledger,
                gate: Arc::new(RunGate::new(Arc::clone(&metrics))),
                metrics,
                control: Mutex::new(Control {
                    interval,
                    daemon: None,
                    next_fire_at: None,
                    generation: 0,
                }),
            }),
        }
    }

    pub fn ledger(&self) -> Arc<RunLedger> {
        Arc::clone(&self.inner.ledger)
    }

    fn control(&self) -> MutexGuard<'_, Control> {
        self.inner
            .control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// 定期実行を開始する。最初の発火は `now + interval`。
    ///
    /// # Errors
    /// 間隔が 0 なら `InvalidInterval`、既に動作中なら `AlreadyRunning`。
    pub fn start(&self, interval: Duration) -> Result<SchedulerState, SchedulerError> {
        let cadence = IntervalCadence::new(interval).ok_or(SchedulerError::InvalidInterval)?;
        let state = {
            let mut control = self.control();
            if control.daemon.is_some() {
                return Err(SchedulerError::AlreadyRunning);
            }
            let arming = Arming::from_now(cadence);
            control.generation += 1;
            control.interval = interval;
            control.next_fire_at = Some(arming.next_fire_at);
            control.daemon = Some(spawn_interval_daemon(
                self.clone(),
                arming,
                control.generation,
            ));
            self.snapshot(&control)
        };
        self.inner.metrics.scheduler_enabled.set(1.0);
        info!(interval_seconds = interval.as_secs(), "scheduler started");
        Ok(state)
    }

    /// 以降の発火を止める。実行中のランはそのまま完了・記録される。
    ///
    /// # Errors
    /// 動作していなければ `NotRunning`。
    pub fn stop(&self) -> Result<SchedulerState, SchedulerError> {
        {
            let mut control = self.control();
            let daemon = control.daemon.take().ok_or(SchedulerError::NotRunning)?;
            daemon.cancel();
            control.next_fire_at = None;
        }
        self.inner.metrics.scheduler_enabled.set(0.0);
        info!("scheduler stopped");
        Ok(self.state())
    }

    /// 間隔を変える。動作中なら次回発火を `now + interval` に張り直す。
    ///
    /// # Errors
    /// 間隔が 0 なら `InvalidInterval`。
    pub fn reconfigure(&self, interval: Duration) -> Result<SchedulerState, SchedulerError> {
        let cadence = IntervalCadence::new(interval).ok_or(SchedulerError::InvalidInterval)?;
        let state = {
            let mut control = self.control();
            control.interval = interval;
            if let Some(daemon) = control.daemon.as_ref() {
                let arming = Arming::from_now(cadence);
                daemon.rearm(arming);
                control.next_fire_at = Some(arming.next_fire_at);
            }
            self.snapshot(&control)
        };
        info!(interval_seconds = interval.as_secs(), "scheduler interval updated");
        Ok(state)
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.snapshot(&self.control())
    }

    fn snapshot(&self, control: &Control) -> SchedulerState {
        let enabled = control.daemon.is_some();
        SchedulerState {
            enabled,
            is_running: self.inner.gate.is_executing(),
            interval_seconds: control.interval.as_secs(),
            next_fire_at: if enabled { control.next_fire_at } else { None },
        }
    }

    pub(crate) fn set_next_fire(&self, generation: u64, next: Option<DateTime<Utc>>) {
        let mut control = self.control();
        if control.generation == generation && control.daemon.is_some() {
            control.next_fire_at = next;
        }
    }

    /// 今すぐ1回実行する。停止中でも実行できる。
    ///
    /// # Errors
    /// 実行中なら `RunInProgress`、開始記録が書けなければ `Ledger`。
    pub async fn trigger_now(
        &self,
        topic: Option<String>,
        theme: Option<Theme>,
    ) -> Result<RunOutcome, SchedulerError> {
        self.execute(RunTrigger::Manual, topic, theme).await
    }

    /// 定期発火1回分。実行中ならスキップする。
    pub(crate) async fn tick(&self) -> Result<RunOutcome, SchedulerError> {
        let result = self.execute(RunTrigger::Scheduled, None, None).await;
        if matches!(result, Err(SchedulerError::RunInProgress)) {
            self.inner.metrics.runs_skipped.inc();
            info!("previous run still executing; skipping scheduled tick");
        }
        result
    }

    /// 停止し、実行中のランを最大 `grace` だけ待つ。待ち切れたら `true`。
    pub async fn shutdown(&self, grace: Duration) -> bool {
        // 停止済みなら NotRunning が返るだけ
        let _ = self.stop();
        let deadline = Instant::now() + grace;
        while self.inner.gate.is_executing() {
            if Instant::now() >= deadline {
                warn!(
                    grace_seconds = grace.as_secs(),
                    "in-flight run did not finish before shutdown grace elapsed"
                );
                return false;
            }
            sleep(DRAIN_POLL).await;
        }
        true
    }

    async fn execute(
        &self,
        trigger: RunTrigger,
        topic: Option<String>,
        theme: Option<Theme>,
    ) -> Result<RunOutcome, SchedulerError> {
        let permit = self
            .inner
            .gate
            .try_acquire()
            .ok_or(SchedulerError::RunInProgress)?;
        let inner = Arc::clone(&self.inner);
        // 呼び出し側が途中で諦めても、記録と実行権の解放は最後まで行う
        let task = tokio::spawn(async move {
            let _permit = permit;
            inner.run_once(trigger, topic, theme).await
        });
        match task.await {
            Ok(result) => result,
            Err(join_err) => Err(SchedulerError::Ledger(format!(
                "run bookkeeping aborted: {join_err}"
            ))),
        }
    }
}

impl SchedulerInner {
    async fn run_once(
        &self,
        trigger: RunTrigger,
        topic: Option<String>,
        theme: Option<Theme>,
    ) -> Result<RunOutcome, SchedulerError> {
        let request = self.pipeline.resolve_request(topic, theme);
        let handle = self
            .ledger
            .record_start(request.theme, Some(&request.topic), trigger)
            .await
            .map_err(|err| {
                error!(error = %format!("{err:#}"), "could not record run start; run not started");
                SchedulerError::Ledger(format!("{err:#}"))
            })?;
        let run_id = handle.id();

        let pipeline = Arc::clone(&self.pipeline);
        let worker = tokio::spawn(async move { pipeline.run_resolved(request).await });

        let outcome = match worker.await {
            Ok(Ok(artifact)) => {
                self.ledger.record_success(handle, artifact.id).await;
                RunOutcome::Succeeded { run_id, artifact }
            }
            Ok(Err(err)) => {
                let failure = RunFailure::from(err);
                warn!(%run_id, kind = failure.kind(), error = %failure, "run failed");
                self.ledger.record_failure(handle, &failure.to_string()).await;
                RunOutcome::Failed {
                    run_id,
                    error: failure,
                }
            }
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    panic_message(join_err.into_panic())
                } else {
                    join_err.to_string()
                };
                let failure = RunFailure::Aborted(reason);
                error!(%run_id, error = %failure, "run worker aborted");
                self.ledger.record_failure(handle, &failure.to_string()).await;
                RunOutcome::Failed {
                    run_id,
                    error: failure,
                }
            }
        };
        Ok(outcome)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
