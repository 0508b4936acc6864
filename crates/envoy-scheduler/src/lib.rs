//! Cron-driven re-entry into the agent loop.
//!
//! [`engine::SchedulerEngine`] polls `envoy_store::Store` every second for
//! enabled [`envoy_store::ScheduledTask`] rows whose cron expression has a
//! due occurrence, and fires each one under a synthetic session
//! (`envoy_core::types::SessionId::synthetic_for_run`) via
//! [`envoy_agent::run_turn`]. At most one run per task is ever in flight —
//! enforced by `Store::task_has_running_run`.

pub mod engine;
pub mod error;

pub use engine::SchedulerEngine;
pub use error::{Result, SchedulerError};
