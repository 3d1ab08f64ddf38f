use chrono::{DateTime, Utc};
use tokio::{sync::watch, task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::scheduler::{
    Scheduler, SchedulerError,
    cadence::{IntervalCadence, duration_until},
};

/// デーモンが次に待つ発火時刻と、その後に使う間隔。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Arming {
    pub(crate) cadence: IntervalCadence,
    pub(crate) next_fire_at: DateTime<Utc>,
}

impl Arming {
    pub(crate) fn from_now(cadence: IntervalCadence) -> Self {
        Self {
            cadence,
            next_fire_at: cadence.next_fire_from(Utc::now()),
        }
    }
}

/// 起動中のデーモンを止めたり間隔を変えたりするためのハンドル。
#[derive(Debug)]
pub(crate) struct DaemonHandle {
    cancel: CancellationToken,
    arming_tx: watch::Sender<Arming>,
    _join: JoinHandle<()>,
}

impl DaemonHandle {
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    /// 保留中の発火を `arming` に張り直させる。
    pub(crate) fn rearm(&self, arming: Arming) {
        // 受信側はデーモンが持つので、終了済みの場合だけ失敗する
        let _ = self.arming_tx.send(arming);
    }
}

pub(crate) fn spawn_interval_daemon(
    scheduler: Scheduler,
    arming: Arming,
    generation: u64,
) -> DaemonHandle {
    let cancel = CancellationToken::new();
    let (arming_tx, arming_rx) = watch::channel(arming);
    let daemon = IntervalDaemon {
        scheduler,
        cancel: cancel.clone(),
        arming_rx,
        generation,
    };
    DaemonHandle {
        cancel,
        arming_tx,
        _join: tokio::spawn(daemon.run()),
    }
}

struct IntervalDaemon {
    scheduler: Scheduler,
    cancel: CancellationToken,
    arming_rx: watch::Receiver<Arming>,
    generation: u64,
}

impl IntervalDaemon {
    async fn run(mut self) {
        let mut arming = *self.arming_rx.borrow_and_update();
        loop {
            let wait = duration_until(arming.next_fire_at, Utc::now());
            info!(
                next_fire_utc = %arming.next_fire_at.to_rfc3339(),
                wait_seconds = wait.as_secs(),
                interval_seconds = arming.cadence.interval().as_secs(),
                "scheduled next generation run"
            );

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                changed = self.arming_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    arming = *self.arming_rx.borrow_and_update();
                    // 発火直後の書き込みと競合しても張り直した時刻に揃える
                    self.scheduler
                        .set_next_fire(self.generation, Some(arming.next_fire_at));
                    info!(
                        interval_seconds = arming.cadence.interval().as_secs(),
                        "interval changed; re-arming"
                    );
                }
                () = sleep(wait) => {
                    self.fire();
                    arming = Arming::from_now(arming.cadence);
                    self.scheduler
                        .set_next_fire(self.generation, Some(arming.next_fire_at));
                }
            }
        }
        info!("interval daemon stopped");
    }

    fn fire(&self) {
        // 実行中も停止・再設定を受け付けるため tick は別タスクで走らせる
        let scheduler = self.scheduler.clone();
        tokio::spawn(async move {
            match scheduler.tick().await {
                Ok(_) | Err(SchedulerError::RunInProgress) => {}
                Err(err) => error!(error = %err, "scheduled run could not start"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn arming_from_now_is_one_interval_ahead() {
        let cadence = IntervalCadence::new(Duration::from_secs(90)).expect("non-zero");
        let before = Utc::now();
        let arming = Arming::from_now(cadence);
        let ahead = arming.next_fire_at - before;
        assert!(ahead >= chrono::Duration::seconds(90));
        assert!(ahead < chrono::Duration::seconds(95));
    }
}
