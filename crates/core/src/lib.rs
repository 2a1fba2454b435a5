//! EBS core data models.
//!
//! This crate defines the task store used by evidence-based scheduling:
//! tasks, their ledgers of recorded time, and the snapshot schema.

#![warn(missing_docs)]

mod error;
mod record;
mod store;
mod task;

pub mod timestamp;

pub use error::{ensure_positive_hours, CoreError, Result};
pub use record::TaskRecord;
pub use store::{Store, TaskUpdate, DEFAULT_VELOCITY};
pub use task::{normalize_name, Task, TimeSegment};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
