pub mod cadence;
pub mod daemon;

pub use cadence::{Clock, MinuteCadence, SystemClock};
pub use daemon::{CycleScheduler, SchedulerSummary};
