//! Evidence-based scheduling engine.
//!
//! Velocity estimation, duration prediction, estimation analytics and the
//! [`TaskTracker`] service tying them to persistent storage.

#![warn(missing_docs)]

pub mod analyzer;
pub mod error;
pub mod estimator;
pub mod predictor;
pub mod tracker;

pub use analyzer::{Analyzer, EstimationError, Report, VelocityTrend};
pub use error::{ErrorKind, Result, TrackerError};
pub use estimator::VelocityEstimator;
pub use predictor::Predictor;
pub use tracker::TaskTracker;
