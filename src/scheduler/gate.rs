use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::observability::Metrics;

/// 同時に1件だけ実行させるためのフラグ。定期実行と手動実行で共有する。
#[derive(Debug)]
pub(crate) struct RunGate {
    executing: AtomicBool,
    metrics: Arc<Metrics>,
}

impl RunGate {
    pub(crate) fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            executing: AtomicBool::new(false),
            metrics,
        }
    }

    /// 実行中でなければ実行権を取る。
    pub(crate) fn try_acquire(self: &Arc<Self>) -> Option<RunPermit> {
        self.executing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.metrics.run_executing.set(1.0);
        Some(RunPermit {
            gate: Arc::clone(self),
        })
    }

    pub(crate) fn is_executing(&self) -> bool {
        self.executing.load(Ordering::Acquire)
    }
}

/// drop で実行中フラグを下ろす。パニック時も同じ。
#[derive(Debug)]
pub(crate) struct RunPermit {
    gate: Arc<RunGate>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.gate.metrics.run_executing.set(0.0);
        self.gate.executing.store(false, Ordering::Release);
    }
}
