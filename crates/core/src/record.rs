//! On-disk task record and the legacy schema upgrade.
//!
//! Snapshots written before per-segment tracking carry only a flat
//! `actual_hours` total and no `time_segments` list. Those records are
//! upgraded exactly once, while deserializing.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::task::{Task, TimeSegment};
use crate::Time;

/// A task as it appears in the snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Task name
    pub name: String,

    /// Estimated effort
    pub estimated_hours: f64,

    /// Derived total. Written for readers of the file; only trusted when
    /// upgrading a legacy record.
    #[serde(default)]
    pub actual_hours: Option<f64>,

    /// Recorded segments; `None` marks a legacy record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_segments: Option<Vec<TimeSegment>>,

    /// Creation time
    #[serde(with = "crate::timestamp")]
    pub start_time: Time,

    /// Last segment or completion stamp
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::timestamp::option"
    )]
    pub end_time: Option<Time>,

    /// Finished flag
    #[serde(default)]
    pub completed: bool,
}

impl TaskRecord {
    /// Turn a raw record into a task, migrating legacy totals.
    ///
    /// A legacy `actual_hours` becomes a single segment stamped with the
    /// record's `end_time`, or `now` when there is none. Non-positive legacy
    /// totals carry no usable evidence and are dropped. Names are trimmed the
    /// same way user input is, so lookups find hand-edited entries.
    pub fn upgrade(self, now: Time) -> Task {
        let time_segments = match self.time_segments {
            Some(segments) => segments,
            None => match self.actual_hours {
                Some(hours) if hours > 0.0 => {
                    tracing::debug!(task = %self.name, hours, "Migrating legacy actual_hours into a segment");
                    vec![TimeSegment {
                        hours,
                        timestamp: self.end_time.unwrap_or(now),
                    }]
                }
                Some(hours) => {
                    tracing::warn!(task = %self.name, hours, "Dropping non-positive legacy actual_hours");
                    Vec::new()
                }
                None => Vec::new(),
            },
        };

        Task {
            name: self.name.trim().to_string(),
            estimated_hours: self.estimated_hours,
            time_segments,
            start_time: self.start_time,
            end_time: self.end_time,
            completed: self.completed,
        }
    }
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        record.upgrade(Utc::now())
    }
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        Self {
            actual_hours: task.actual_hours(),
            name: task.name,
            estimated_hours: task.estimated_hours,
            time_segments: Some(task.time_segments),
            start_time: task.start_time,
            end_time: task.end_time,
            completed: task.completed,
        }
    }
}
