//! Estimation analytics: completion rate, per-task error and velocity trend.

use std::fmt;

use ebs_core::{Store, Task, DEFAULT_VELOCITY};
use serde::ser::{Serialize, Serializer};

/// How far one finished task landed from its estimate.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EstimationError {
    /// Task name
    pub name: String,
    /// Estimated hours
    pub estimated: f64,
    /// Recorded hours
    pub actual: f64,
    /// `(estimated - actual) / estimated * 100`; positive when the task took
    /// less time than estimated, negative on overrun
    pub error_pct: f64,
}

/// Per-task `estimated / actual` ratios of finished tasks with recorded time,
/// in store order.
///
/// Computed lazily from the store on every pass; clone it to iterate again.
#[derive(Clone)]
pub struct VelocityTrend<'a> {
    tasks: std::slice::Iter<'a, Task>,
}

impl<'a> VelocityTrend<'a> {
    /// Trend over a store's tasks.
    pub fn new(store: &'a Store) -> Self {
        Self {
            tasks: store.tasks().iter(),
        }
    }
}

impl Iterator for VelocityTrend<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        self.tasks.by_ref().find_map(Task::velocity_ratio)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.tasks.size_hint().1)
    }
}

impl fmt::Debug for VelocityTrend<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl Serialize for VelocityTrend<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.clone())
    }
}

/// Summary of a store for reporting.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Report<'a> {
    /// Store velocity, or the default when there is no evidence yet
    pub avg_velocity: f64,
    /// Percentage of tasks marked completed
    pub completion_rate: f64,
    /// Number of tasks
    pub total_tasks: usize,
    /// Number of completed tasks
    pub completed_tasks: usize,
    /// Number of tasks not yet completed
    pub pending_tasks: usize,
    /// Estimation error of each finished task with recorded time
    pub errors: Vec<EstimationError>,
    /// Velocity ratio sequence over the same tasks
    pub velocity_trend: VelocityTrend<'a>,
}

/// Computes reports. Never mutates the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct Analyzer;

impl Analyzer {
    /// Create a new analyzer.
    pub fn new() -> Self {
        Self
    }

    /// Analyze a store.
    pub fn analyze<'a>(&self, store: &'a Store) -> Report<'a> {
        let total_tasks = store.tasks().len();
        let completed_tasks = store.tasks().iter().filter(|t| t.is_completed()).count();

        let completion_rate = if total_tasks > 0 {
            completed_tasks as f64 / total_tasks as f64 * 100.0
        } else {
            0.0
        };

        let errors: Vec<_> = store.calibrated().map(estimation_error).collect();

        let avg_velocity = if errors.is_empty() {
            DEFAULT_VELOCITY
        } else {
            store.velocity()
        };

        Report {
            avg_velocity,
            completion_rate,
            total_tasks,
            completed_tasks,
            pending_tasks: total_tasks - completed_tasks,
            errors,
            velocity_trend: self.velocity_trend(store),
        }
    }

    /// Velocity ratios of finished tasks, oldest first.
    pub fn velocity_trend<'a>(&self, store: &'a Store) -> VelocityTrend<'a> {
        VelocityTrend::new(store)
    }
}

fn estimation_error(task: &Task) -> EstimationError {
    let estimated = task.estimated_hours();
    let actual = task.total_hours();
    let error_pct = if estimated > 0.0 {
        (estimated - actual) / estimated * 100.0
    } else {
        0.0
    };

    EstimationError {
        name: task.name().to_string(),
        estimated,
        actual,
        error_pct,
    }
}
