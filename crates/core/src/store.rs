//! The task store - every tracked task plus the current velocity.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive_hours, CoreError, Result};
use crate::task::{ensure_usable_ratio, normalize_name, Task, TimeSegment};
use crate::Time;

/// Velocity used until a task has been finished with recorded time.
pub const DEFAULT_VELOCITY: f64 = 1.0;

fn default_velocity() -> f64 {
    DEFAULT_VELOCITY
}

/// Changes applied by a single "modify" action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    /// Rename the task
    pub new_name: Option<String>,

    /// Replace the estimate
    pub estimated_hours: Option<f64>,
}

impl TaskUpdate {
    /// Whether the update carries no changes.
    pub fn is_empty(&self) -> bool {
        self.new_name.is_none() && self.estimated_hours.is_none()
    }
}

/// In-memory task collection.
///
/// Task order is insertion order, which is also display order. Names are
/// unique (case-sensitive) at all times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    #[serde(default)]
    tasks: Vec<Task>,

    #[serde(default = "default_velocity")]
    velocity: f64,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            velocity: DEFAULT_VELOCITY,
        }
    }
}

impl Store {
    /// Create an empty store with the default velocity.
    pub fn new() -> Self {
        Self::default()
    }

    /// All tasks in display order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Current velocity.
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Replace the velocity.
    pub fn set_velocity(&mut self, velocity: f64) -> Result<()> {
        if !(velocity.is_finite() && velocity > 0.0) {
            return Err(CoreError::validation(format!(
                "velocity must be a positive number, got {velocity}"
            )));
        }
        self.velocity = velocity;
        Ok(())
    }

    /// Look up a task by name.
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.position(name).map(|i| &self.tasks[i])
    }

    /// Whether a task with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Finished tasks with recorded time, in store order.
    ///
    /// These are the only tasks that count as velocity evidence.
    pub fn calibrated(&self) -> impl Iterator<Item = &Task> + Clone + '_ {
        self.tasks.iter().filter(|t| t.is_calibrated())
    }

    /// Tasks that can still be finished.
    pub fn unfinished(&self) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.iter().filter(|t| !t.is_completed())
    }

    /// Case-insensitive substring search over task names.
    pub fn search<'a>(&'a self, pattern: &str) -> impl Iterator<Item = &'a Task> + 'a {
        let needle = pattern.trim().to_lowercase();
        self.tasks
            .iter()
            .filter(move |t| t.name.to_lowercase().contains(&needle))
    }

    /// Add a new task.
    pub fn add_task(&mut self, name: &str, estimated_hours: f64, now: Time) -> Result<&Task> {
        let task = Task::new(name, estimated_hours, now)?;
        if self.contains(&task.name) {
            return Err(CoreError::validation(format!(
                "task '{}' already exists",
                task.name
            )));
        }
        self.tasks.push(task);
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    /// Rename a task. Returns `false` when the name is unchanged.
    pub fn rename_task(&mut self, old_name: &str, new_name: &str) -> Result<bool> {
        self.modify_task(
            old_name,
            &TaskUpdate {
                new_name: Some(new_name.to_string()),
                estimated_hours: None,
            },
        )
    }

    /// Replace a task's estimate.
    pub fn set_estimate(&mut self, name: &str, estimated_hours: f64) -> Result<()> {
        self.modify_task(
            name,
            &TaskUpdate {
                new_name: None,
                estimated_hours: Some(estimated_hours),
            },
        )
        .map(|_| ())
    }

    /// Apply a rename and/or estimate change.
    ///
    /// Everything is validated before anything is written, so a rejected
    /// update leaves the store untouched. Returns whether anything changed.
    pub fn modify_task(&mut self, name: &str, update: &TaskUpdate) -> Result<bool> {
        let index = self.require(name)?;

        let new_name = match &update.new_name {
            Some(raw) => {
                let candidate = normalize_name(raw)?;
                if candidate == self.tasks[index].name {
                    None
                } else if self.contains(&candidate) {
                    return Err(CoreError::validation(format!(
                        "task '{candidate}' already exists"
                    )));
                } else {
                    Some(candidate)
                }
            }
            None => None,
        };

        if let Some(hours) = update.estimated_hours {
            ensure_positive_hours("estimated hours", hours)?;
            let task = &self.tasks[index];
            ensure_usable_ratio(&task.name, hours, task.total_hours())?;
        }

        let task = &mut self.tasks[index];
        let mut changed = false;
        if let Some(new_name) = new_name {
            task.name = new_name;
            changed = true;
        }
        if let Some(hours) = update.estimated_hours {
            if task.estimated_hours != hours {
                task.set_estimate(hours)?;
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Remove a task and its whole ledger.
    pub fn delete_task(&mut self, name: &str) -> Result<Task> {
        let index = self.require(name)?;
        Ok(self.tasks.remove(index))
    }

    /// Record time against a task.
    pub fn add_segment(&mut self, name: &str, hours: f64, now: Time) -> Result<TimeSegment> {
        let index = self.require(name)?;
        self.tasks[index].add_segment(hours, now).cloned()
    }

    /// Remove one recorded segment (0-based index).
    pub fn delete_segment(&mut self, name: &str, index: usize, now: Time) -> Result<TimeSegment> {
        let task = self.require(name)?;
        self.tasks[task].delete_segment(index, now)
    }

    /// Mark a task finished.
    pub fn finish_task(&mut self, name: &str, now: Time) -> Result<&Task> {
        let index = self.require(name)?;
        self.tasks[index].finish(now)?;
        Ok(&self.tasks[index])
    }

    /// Check the invariants a freshly loaded snapshot must satisfy.
    pub fn validate(&self) -> Result<()> {
        if !(self.velocity.is_finite() && self.velocity > 0.0) {
            return Err(CoreError::InvalidSnapshot(format!(
                "velocity must be positive, got {}",
                self.velocity
            )));
        }

        let mut seen = HashSet::new();
        for task in &self.tasks {
            if task.name.trim().is_empty() {
                return Err(CoreError::InvalidSnapshot("task with empty name".to_string()));
            }
            if !seen.insert(task.name.as_str()) {
                return Err(CoreError::InvalidSnapshot(format!(
                    "duplicate task name '{}'",
                    task.name
                )));
            }
            if !(task.estimated_hours.is_finite() && task.estimated_hours > 0.0) {
                return Err(CoreError::InvalidSnapshot(format!(
                    "task '{}' has non-positive estimate {}",
                    task.name, task.estimated_hours
                )));
            }
            if let Some(bad) = task
                .time_segments
                .iter()
                .find(|s| !(s.hours.is_finite() && s.hours > 0.0))
            {
                return Err(CoreError::InvalidSnapshot(format!(
                    "task '{}' has a segment of {} hours",
                    task.name, bad.hours
                )));
            }
            ensure_usable_ratio(&task.name, task.estimated_hours, task.total_hours())
                .map_err(|e| CoreError::InvalidSnapshot(e.to_string()))?;
        }
        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.tasks.iter().position(|t| t.name == name)
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| CoreError::TaskNotFound(name.trim().to_string()))
    }
}
