//! Batch jobs: load datasets, resolve the epoch, compute, then publish.
//!
//! Each job computes its complete output before anything is published, so a
//! failed run leaves the sink untouched.

pub mod apr;
pub mod emissions;
pub mod history;
pub mod orchestrator;
pub mod partners;
pub mod pools;
pub mod revenue;
pub mod snapshots;
pub mod votes;

pub use orchestrator::{
    Collaborators, Job, JobContext, JobOutput, JobSettings, Orchestrator, RunReport,
};
pub use history::overlay_epochs;
pub use snapshots::{fetch_all, keep_successes, SnapshotResult};
