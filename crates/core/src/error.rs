//! Errors raised by the task model.

/// Result alias for model operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while mutating or validating the model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    /// Bad or missing input: empty name, non-positive hours, duplicate name
    #[error("Invalid input: {0}")]
    Validation(String),

    /// No task with this name
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Segment position outside the task's ledger
    #[error("Task '{task}' has no segment at index {index} ({len} recorded)")]
    SegmentOutOfRange {
        /// Task name
        task: String,
        /// Requested index (0-based)
        index: usize,
        /// Number of segments on the task
        len: usize,
    },

    /// A loaded snapshot violates a model invariant
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl CoreError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Check that an hour value is a positive, finite number.
pub fn ensure_positive_hours(field: &str, hours: f64) -> Result<()> {
    if hours.is_finite() && hours > 0.0 {
        Ok(())
    } else {
        Err(CoreError::validation(format!(
            "{field} must be a positive number, got {hours}"
        )))
    }
}
