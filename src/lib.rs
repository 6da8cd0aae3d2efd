//! # Predictive vs. Direct Joint Tracking
//!
//! Closed-loop comparison of two ways to drive a 3-joint robot arm from a
//! noisy, continuously sampled reference motion:
//!
//! - **Direct**: map each sensed sample straight to a command.
//! - **Predictive**: fit a harmonic regression model to the recent history
//!   window every tick and command its one-step-ahead forecast.
//!
//! Both paths go through the same scaling, joint-limit clamping and velocity
//! rate limiting, and the loop reports RMSE, lag and smoothness for each.
//!
//! ## Key Components
//! - [`MotionSource`]: synthetic ground-truth motion plus magnitude-scaled noise
//! - [`HarmonicModel`]: least-squares harmonic series with analytic derivatives
//! - [`CommandMapper`]: scale, clamp and rate-limit joint commands
//! - [`ArmGeometry`]: planar forward kinematics of the 3-link chain
//! - [`TrajectoryLoop`]: the externally driven tick loop and its metrics
//!
//! ## Example
//! ```
//! use arm_tracking::{Joint, Strategy, TrackingBuilder};
//!
//! let mut sim = TrackingBuilder::<f64>::new()
//!     .window_size(50)
//!     .noise_level(0.05)
//!     .seed(7)
//!     .build()
//!     .unwrap();
//!
//! for _ in 0..100 {
//!     sim.tick();
//! }
//!
//! let snapshot = sim.snapshot().unwrap();
//! let elbow = snapshot.get(Joint::Elbow, Strategy::Direct);
//! assert!(elbow.rmse.is_finite());
//! ```

use num_traits::Float;

pub mod driver;
pub mod error;
pub mod joint;
pub mod kinematics;
pub mod mapper;
pub mod metrics;
pub mod motion;
pub mod regression;
pub mod tracking;

pub use driver::LoopDriver;
pub use error::{ConfigError, ConfigResult, JointSetError};
pub use joint::{Joint, JointSet};
pub use kinematics::{ArmGeometry, ArmPose, Point2};
pub use mapper::{CommandMapper, JointLimits, MapperConfig};
pub use metrics::{JointMetrics, PerformanceSnapshot, Strategy, StrategyMetrics};
pub use motion::{JointMotion, MotionProfile, MotionSource, Oscillation, Waveform};
pub use regression::{FitStatus, HarmonicModel};
pub use tracking::{
    HistoryWindow, LoopDiagnostics, LoopPhase, TickOutcome, TrackingBuilder, TrackingConfig,
    TrajectoryLoop, MIN_TRACKING_SAMPLES,
};

/// Convert an `f64` constant into the working float type
pub(crate) fn cast<T: Float>(value: f64) -> T {
    T::from(value).unwrap_or_else(T::nan)
}
