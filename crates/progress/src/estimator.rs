//! Velocity estimation.

use ebs_core::Store;
use tracing::{debug, warn};

/// Derives the store's velocity from finished work.
///
/// Velocity is the arithmetic mean of per-task `estimated / actual` ratios
/// over finished tasks with recorded time. Every task weighs the same
/// regardless of its size; this is not a ratio of sums.
#[derive(Debug, Clone, Copy, Default)]
pub struct VelocityEstimator;

impl VelocityEstimator {
    /// Create an estimator.
    pub fn new() -> Self {
        Self
    }

    /// Mean ratio over the calibration set, or `None` if it is empty.
    ///
    /// The mean is accumulated incrementally so very large ratios cannot
    /// overflow an intermediate sum. Ratios that are not finite and positive
    /// are skipped.
    pub fn estimate(&self, store: &Store) -> Option<f64> {
        let (mean, count) = store
            .calibrated()
            .filter_map(|t| t.velocity_ratio())
            .filter(|ratio| ratio.is_finite() && *ratio > 0.0)
            .fold((0.0_f64, 0usize), |(mean, count), ratio| {
                let count = count + 1;
                (mean + (ratio - mean) / count as f64, count)
            });

        (count > 0).then_some(mean)
    }

    /// Refresh `store.velocity`.
    ///
    /// With no evidence the current velocity is kept as is. Returns the new
    /// value when one was computed. Never fails: an unusable estimate leaves
    /// the current velocity in place.
    pub fn recompute(&self, store: &mut Store) -> Option<f64> {
        let Some(velocity) = self.estimate(store) else {
            debug!(velocity = store.velocity(), "No finished tasks with recorded time, keeping velocity");
            return None;
        };

        if let Err(e) = store.set_velocity(velocity) {
            warn!(error = %e, velocity = store.velocity(), "Keeping velocity");
            return None;
        }
        debug!(velocity, "Recomputed velocity");
        Some(velocity)
    }
}
