// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Durations and millisecond timestamps stay within i64/u64
    clippy::cast_precision_loss,      // Acceptable for jitter and display
    clippy::missing_errors_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. SinkError in sender module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod domain;
pub mod flatten;
pub mod pipeline;
pub mod reliability;
pub mod scheduler;
pub mod sender;
pub mod source;

// Re-export main types for easy access
pub use app::{App, Config};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
