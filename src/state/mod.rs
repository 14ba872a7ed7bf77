//! State module for tracking indexing progress
//!
//! # Components
//!
//! - `SiteStatus`: lifecycle status of a site (INDEXING, INDEXED, FAILED)
//! - `RunState`: process-wide Idle/Running flag with compare-and-set transitions
//! - `RunContext`: cancellation context created per run and passed to every task

mod run_state;
mod site_status;

// Re-export main types
pub use run_state::{RunContext, RunGuard, RunState};
pub use site_status::SiteStatus;
