//! Background job control.
//!
//! Ingestion and album download runs are detached from the request that
//! starts them. A persisted flag per job family guarantees that at most one
//! run is active at a time, and every run is recorded in the job history.

mod guard;
mod launcher;

pub use guard::{GuardError, JobLease, JobStateGuard};
pub use launcher::{JobLauncher, StartJobError};
