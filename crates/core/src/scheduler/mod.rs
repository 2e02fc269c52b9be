//! Move scheduling.
//!
//! Move requests are queued and handed to the mover one at a time:
//! - **Admission**: driven by a periodic tick, strictly FIFO, one job at a time
//! - **Progress**: the active job's destination is probed on every tick
//! - **Completion**: reported asynchronously by the mover, then the record
//!   expires after the configured timeout

mod config;
mod queue;
mod service;
mod types;

pub use config::SchedulerConfig;
pub use queue::MoveScheduler;
pub use service::{Collaborators, MoveService};
pub use types::{
    CompletedMove, CompletedResult, ProgressTarget, ServiceStatus, SubmitOutcome, SubmitRequest,
};
