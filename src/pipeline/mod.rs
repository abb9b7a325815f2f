//! One fetch → flatten → format → forward pass.

pub mod cycle;
pub mod ports;
pub mod report;

pub use cycle::{CycleError, CycleRunner};
pub use ports::{EventSink, StatsSource};
pub use report::{CycleOutcome, CycleReport};
