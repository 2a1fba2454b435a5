//! Duration prediction from velocity.

use ebs_core::{ensure_positive_hours, CoreError, Result, Store};

/// Turns an estimate into an expected actual duration.
#[derive(Debug, Clone, Copy)]
pub struct Predictor {
    velocity: f64,
}

impl Predictor {
    /// Predict with an explicit velocity.
    pub fn new(velocity: f64) -> Self {
        Self { velocity }
    }

    /// Predict with the store's current velocity.
    pub fn from_store(store: &Store) -> Self {
        Self::new(store.velocity())
    }

    /// Velocity used for predictions.
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Expected actual hours for `requested_hours` of estimated work.
    pub fn predict(&self, requested_hours: f64) -> Result<f64> {
        ensure_positive_hours("requested hours", requested_hours)?;
        let predicted = requested_hours / self.velocity;
        if !predicted.is_finite() {
            return Err(CoreError::Validation(format!(
                "{requested_hours} h at velocity {} is out of range",
                self.velocity
            )));
        }
        Ok(predicted)
    }
}
