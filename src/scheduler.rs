pub(crate) mod cadence;
pub(crate) mod daemon;
pub(crate) mod gate;
pub mod jobs;
pub mod ledger;

pub use jobs::{RunFailure, RunOutcome, Scheduler, SchedulerError, SchedulerState};
pub use ledger::{RunHandle, RunLedger};
