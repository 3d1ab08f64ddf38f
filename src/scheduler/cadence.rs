use std::time::Duration;

use chrono::{DateTime, Utc};

/// 固定間隔の発火タイミング。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IntervalCadence {
    interval: Duration,
}

impl IntervalCadence {
    /// 間隔が 0 なら `None`。
    pub(crate) fn new(interval: Duration) -> Option<Self> {
        (!interval.is_zero()).then_some(Self { interval })
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    pub(crate) fn next_fire_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.interval)
            .ok()
            .and_then(|step| now.checked_add_signed(step))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

pub(crate) fn duration_until(next: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (next - now).to_std().unwrap_or(Duration::ZERO)
}
