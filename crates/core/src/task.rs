//! Task model - a unit of estimated work and the time recorded against it.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive_hours, CoreError, Result};
use crate::record::TaskRecord;
use crate::Time;

/// One recorded interval of work.
///
/// Segments are never merged; each one stays addressable by its position in
/// the task's ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSegment {
    /// Hours worked
    pub hours: f64,

    /// When the segment was recorded
    #[serde(with = "crate::timestamp")]
    pub timestamp: Time,
}

/// A task carries an estimate and the ledger of time spent on it.
///
/// The spent total is always derived from `time_segments`; there is no
/// separately writable "actual hours" value to drift out of sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TaskRecord", into = "TaskRecord")]
pub struct Task {
    pub(crate) name: String,
    pub(crate) estimated_hours: f64,
    pub(crate) time_segments: Vec<TimeSegment>,
    pub(crate) start_time: Time,
    pub(crate) end_time: Option<Time>,
    pub(crate) completed: bool,
}

impl Task {
    /// Create a new, unfinished task with an empty ledger.
    pub fn new(name: &str, estimated_hours: f64, now: Time) -> Result<Self> {
        let name = normalize_name(name)?;
        ensure_positive_hours("estimated hours", estimated_hours)?;

        Ok(Self {
            name,
            estimated_hours,
            time_segments: Vec::new(),
            start_time: now,
            end_time: None,
            completed: false,
        })
    }

    /// Task name (unique within a store).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Estimated effort in hours.
    pub fn estimated_hours(&self) -> f64 {
        self.estimated_hours
    }

    /// Recorded segments, oldest first.
    pub fn segments(&self) -> &[TimeSegment] {
        &self.time_segments
    }

    /// When the task was created.
    pub fn start_time(&self) -> Time {
        self.start_time
    }

    /// Last segment or completion stamp.
    pub fn end_time(&self) -> Option<Time> {
        self.end_time
    }

    /// Whether the task was explicitly finished.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Sum of all recorded hours; 0 for an empty ledger.
    pub fn total_hours(&self) -> f64 {
        self.time_segments.iter().map(|s| s.hours).sum()
    }

    /// Sum of recorded hours, or `None` when nothing has been recorded.
    pub fn actual_hours(&self) -> Option<f64> {
        if self.time_segments.is_empty() {
            None
        } else {
            Some(self.total_hours())
        }
    }

    /// Whether this task is evidence for velocity: finished, with time recorded.
    pub fn is_calibrated(&self) -> bool {
        self.completed && !self.time_segments.is_empty()
    }

    /// Estimated over actual hours, for calibrated tasks only.
    pub fn velocity_ratio(&self) -> Option<f64> {
        if self.is_calibrated() {
            Some(self.estimated_hours / self.total_hours())
        } else {
            None
        }
    }

    /// Append a segment and stamp `end_time`.
    pub fn add_segment(&mut self, hours: f64, now: Time) -> Result<&TimeSegment> {
        ensure_positive_hours("hours", hours)?;
        ensure_usable_ratio(&self.name, self.estimated_hours, self.total_hours() + hours)?;

        self.time_segments.push(TimeSegment {
            hours,
            timestamp: now,
        });
        self.end_time = Some(now);

        Ok(&self.time_segments[self.time_segments.len() - 1])
    }

    /// Remove the segment at `index`.
    ///
    /// `end_time` moves to `now` only while segments remain, so clearing the
    /// ledger keeps the last completion stamp.
    pub fn delete_segment(&mut self, index: usize, now: Time) -> Result<TimeSegment> {
        if index >= self.time_segments.len() {
            return Err(CoreError::SegmentOutOfRange {
                task: self.name.clone(),
                index,
                len: self.time_segments.len(),
            });
        }

        let remaining: f64 = self
            .time_segments
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, s)| s.hours)
            .sum();
        ensure_usable_ratio(&self.name, self.estimated_hours, remaining)?;

        let removed = self.time_segments.remove(index);
        if !self.time_segments.is_empty() {
            self.end_time = Some(now);
        }
        Ok(removed)
    }

    /// Mark the task finished.
    pub fn finish(&mut self, now: Time) -> Result<()> {
        if self.completed {
            return Err(CoreError::validation(format!(
                "task '{}' is already completed",
                self.name
            )));
        }
        ensure_usable_ratio(&self.name, self.estimated_hours, self.total_hours())?;
        self.completed = true;
        self.end_time = Some(now);
        Ok(())
    }

    pub(crate) fn set_estimate(&mut self, estimated_hours: f64) -> Result<()> {
        ensure_positive_hours("estimated hours", estimated_hours)?;
        ensure_usable_ratio(&self.name, estimated_hours, self.total_hours())?;
        self.estimated_hours = estimated_hours;
        Ok(())
    }
}

/// Check that `total` recorded hours against `estimated` still yield a usable
/// velocity ratio. An empty ledger (`total == 0`) is always fine.
pub(crate) fn ensure_usable_ratio(name: &str, estimated: f64, total: f64) -> Result<()> {
    if total == 0.0 {
        return Ok(());
    }
    let ratio = estimated / total;
    if total.is_finite() && ratio.is_finite() && ratio > 0.0 {
        Ok(())
    } else {
        Err(CoreError::validation(format!(
            "task '{name}': {estimated} h estimated against {total} h recorded is out of range"
        )))
    }
}

/// Trim a user-supplied name and reject blanks.
pub fn normalize_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::validation("task name must not be empty"));
    }
    Ok(name.to_string())
}
