//! Closed-loop comparison of predictive and direct joint tracking
//!
//! Every [`tick`](TrajectoryLoop::tick):
//! 1. sample the reference motion and append it to the history window,
//! 2. **direct**: map the fresh sample and rate-limit it against the previous
//!    direct command,
//! 3. **predictive**: once the window holds [`MIN_TRACKING_SAMPLES`] samples,
//!    refit one harmonic model per joint on the whole window, forecast one
//!    step ahead, then map and rate-limit the forecast. Before that a zero
//!    placeholder is recorded,
//! 4. advance simulated time by `dt`.
//!
//! The loop is driven from outside; it never blocks, sleeps or fails once
//! constructed.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use core::fmt;
use num_traits::Float;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::vec_deque::{self, VecDeque};
use tracing::{debug, info, trace};

use crate::cast;
use crate::error::{ConfigError, ConfigResult};
use crate::joint::{Joint, JointSet};
use crate::kinematics::{ArmGeometry, ArmPose};
use crate::mapper::{CommandMapper, JointLimits, MapperConfig};
use crate::metrics::{JointMetrics, PerformanceSnapshot, Strategy};
use crate::motion::{validate_noise_level, MotionProfile, MotionSource};
use crate::regression::{coefficient_count, FitStatus, HarmonicModel};

/// History length at which regression and metrics become available
pub const MIN_TRACKING_SAMPLES: usize = 10;

// ============================================================================
// History window
// ============================================================================

/// Fixed-capacity reference history plus both command histories
///
/// Oldest entries are evicted first once `capacity` is reached. A zero
/// capacity window stays empty.
#[derive(Debug, Clone)]
pub struct HistoryWindow<T> {
    capacity: usize,
    times: VecDeque<T>,
    reference: VecDeque<JointSet<T>>,
    predictive: VecDeque<JointSet<T>>,
    direct: VecDeque<JointSet<T>>,
}

fn push_bounded<V>(buffer: &mut VecDeque<V>, capacity: usize, value: V) {
    if capacity == 0 {
        return;
    }
    while buffer.len() >= capacity {
        buffer.pop_front();
    }
    buffer.push_back(value);
}

impl<T: Float> HistoryWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            times: VecDeque::with_capacity(capacity),
            reference: VecDeque::with_capacity(capacity),
            predictive: VecDeque::with_capacity(capacity),
            direct: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a timestamped reference sample
    pub fn push_reference(&mut self, time: T, sample: JointSet<T>) {
        push_bounded(&mut self.times, self.capacity, time);
        push_bounded(&mut self.reference, self.capacity, sample);
    }

    /// Append a command for `strategy`
    pub fn push_output(&mut self, strategy: Strategy, command: JointSet<T>) {
        let buffer = match strategy {
            Strategy::Predictive => &mut self.predictive,
            Strategy::Direct => &mut self.direct,
        };
        push_bounded(buffer, self.capacity, command);
    }

    /// Number of reference samples held
    pub fn len(&self) -> usize {
        self.reference.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reference.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.reference.len() == self.capacity
    }

    /// Sample timestamps, oldest first
    pub fn times(&self) -> vec_deque::Iter<'_, T> {
        self.times.iter()
    }

    /// Reference samples, oldest first
    pub fn reference(&self) -> vec_deque::Iter<'_, JointSet<T>> {
        self.reference.iter()
    }

    /// Commands issued by `strategy`, oldest first
    pub fn output(&self, strategy: Strategy) -> vec_deque::Iter<'_, JointSet<T>> {
        match strategy {
            Strategy::Predictive => self.predictive.iter(),
            Strategy::Direct => self.direct.iter(),
        }
    }

    pub fn latest_output(&self, strategy: Strategy) -> Option<&JointSet<T>> {
        self.output(strategy).next_back()
    }

    pub fn time_series(&self) -> Vec<T> {
        self.times.iter().copied().collect()
    }

    /// One joint's reference angles
    pub fn reference_series(&self, joint: Joint) -> Vec<T> {
        self.reference.iter().map(|s| s[joint]).collect()
    }

    /// One joint's commands for `strategy`
    pub fn output_series(&self, strategy: Strategy, joint: Joint) -> Vec<T> {
        self.output(strategy).map(|s| s[joint]).collect()
    }

    pub fn clear(&mut self) {
        self.times.clear();
        self.reference.clear();
        self.predictive.clear();
        self.direct.clear();
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Loop configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct TrackingConfig<T> {
    /// History capacity (samples)
    pub window_size: usize,
    /// Control period (time units)
    pub dt: T,
    /// Harmonic pairs in the regression model; `1 + 2 * harmonics` must not
    /// exceed [`MIN_TRACKING_SAMPLES`]
    pub harmonics: usize,
    /// Relative sensor noise (std dev as a fraction of |angle|)
    pub noise_level: T,
    /// Seed for the noise generator; `None` draws from OS entropy
    pub seed: Option<u64>,
    /// Ground-truth reference motion
    pub profile: MotionProfile<T>,
    /// Scaling, joint limits and velocity limits
    pub mapper: MapperConfig<T>,
    /// Link lengths used for endpoint queries
    pub geometry: ArmGeometry<T>,
}

impl<T: Float> Default for TrackingConfig<T> {
    fn default() -> Self {
        Self {
            window_size: 50,
            dt: cast(0.05),
            harmonics: 3,
            noise_level: cast(0.05),
            seed: None,
            profile: MotionProfile::default(),
            mapper: MapperConfig::default(),
            geometry: ArmGeometry::default(),
        }
    }
}

impl<T: Float> TrackingConfig<T> {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.window_size < MIN_TRACKING_SAMPLES {
            return Err(ConfigError::WindowTooSmall {
                window_size: self.window_size,
                minimum: MIN_TRACKING_SAMPLES,
            });
        }
        if coefficient_count(self.harmonics).map_or(true, |n| n > MIN_TRACKING_SAMPLES) {
            return Err(ConfigError::TooManyHarmonics {
                harmonics: self.harmonics,
                minimum: MIN_TRACKING_SAMPLES,
            });
        }
        if !self.dt.is_finite() || self.dt <= T::zero() {
            return Err(ConfigError::InvalidTimeStep(
                self.dt.to_f64().unwrap_or(f64::NAN),
            ));
        }
        validate_noise_level(self.noise_level)?;
        self.mapper.validate()?;
        self.geometry.validate()
    }
}

/// Fluent construction of a [`TrajectoryLoop`]
pub struct TrackingBuilder<T> {
    config: TrackingConfig<T>,
}

impl<T: Float> TrackingBuilder<T> {
    pub fn new() -> Self {
        Self {
            config: TrackingConfig::default(),
        }
    }

    pub fn window_size(mut self, window_size: usize) -> Self {
        self.config.window_size = window_size;
        self
    }

    pub fn dt(mut self, dt: T) -> Self {
        self.config.dt = dt;
        self
    }

    pub fn harmonics(mut self, harmonics: usize) -> Self {
        self.config.harmonics = harmonics;
        self
    }

    pub fn noise_level(mut self, noise_level: T) -> Self {
        self.config.noise_level = noise_level;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn profile(mut self, profile: MotionProfile<T>) -> Self {
        self.config.profile = profile;
        self
    }

    pub fn scale(mut self, joint: Joint, scale: T) -> Self {
        self.config.mapper.scale[joint] = scale;
        self
    }

    pub fn joint_limits(mut self, joint: Joint, min: T, max: T) -> Self {
        self.config.mapper.limits[joint] = JointLimits::new(min, max);
        self
    }

    pub fn velocity_limit(mut self, joint: Joint, max_velocity: T) -> Self {
        self.config.mapper.max_velocity[joint] = max_velocity;
        self
    }

    pub fn geometry(mut self, geometry: ArmGeometry<T>) -> Self {
        self.config.geometry = geometry;
        self
    }

    /// Validated configuration without building a loop
    pub fn config(self) -> ConfigResult<TrackingConfig<T>> {
        self.config.validate()?;
        Ok(self.config)
    }

    pub fn build(self) -> ConfigResult<TrajectoryLoop<T>> {
        TrajectoryLoop::new(self.config)
    }

    /// Build with an injected random source for sensor noise
    pub fn build_with_rng<R: Rng>(self, rng: R) -> ConfigResult<TrajectoryLoop<T, R>> {
        TrajectoryLoop::with_rng(self.config, rng)
    }
}

impl<T: Float> Default for TrackingBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Loop state and reporting
// ============================================================================

/// Lifecycle of the predictive strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum LoopPhase {
    /// Not enough history for regression; predictive commands are zero
    Warming,
    /// Regression refit and forecast every tick
    Tracking,
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct TickOutcome<T> {
    /// Time the reference was sampled at
    pub time: T,
    /// Sensed reference angles
    pub reference: JointSet<T>,
    /// Direct command issued
    pub direct: JointSet<T>,
    /// Predictive command issued (zero while warming)
    pub predictive: JointSet<T>,
    /// One-step-ahead forecast, when a model was fitted
    pub forecast: Option<JointSet<T>>,
    /// Per-joint fit outcome, when a model was fitted
    pub fit_status: Option<JointSet<FitStatus>>,
    /// Phase after this tick
    pub phase: LoopPhase,
}

/// Running counters for the loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct LoopDiagnostics {
    /// Ticks executed
    pub ticks: u64,
    /// Per-joint regression fits attempted
    pub fits: u64,
    /// Fits that fell back to a zero model
    pub degenerate_fits: u64,
    /// Ticks where the direct command hit a velocity bound
    pub direct_rate_limited: u64,
    /// Ticks where the predictive command hit a velocity bound
    pub predictive_rate_limited: u64,
}

impl fmt::Display for LoopDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loop Diagnostics:\n\
             Ticks: {}\n\
             Fits: {} ({} degenerate)\n\
             Rate-limited ticks - Predictive: {}  Direct: {}",
            self.ticks,
            self.fits,
            self.degenerate_fits,
            self.predictive_rate_limited,
            self.direct_rate_limited
        )
    }
}

// ============================================================================
// Trajectory loop
// ============================================================================

/// Orchestrates sampling, regression, mapping and metrics
#[derive(Debug, Clone)]
pub struct TrajectoryLoop<T, R = StdRng> {
    config: TrackingConfig<T>,
    source: MotionSource<T, R>,
    mapper: CommandMapper<T>,
    history: HistoryWindow<T>,
    previous_direct: JointSet<T>,
    previous_predictive: JointSet<T>,
    time: T,
    phase: LoopPhase,
    diagnostics: LoopDiagnostics,
}

impl<T: Float> TrajectoryLoop<T, StdRng> {
    /// Create a loop whose noise generator follows `config.seed`
    pub fn new(config: TrackingConfig<T>) -> ConfigResult<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<T: Float, R: Rng> TrajectoryLoop<T, R> {
    /// Create a loop drawing sensor noise from `rng`
    pub fn with_rng(config: TrackingConfig<T>, rng: R) -> ConfigResult<Self> {
        config.validate()?;
        debug!(
            window_size = config.window_size,
            harmonics = config.harmonics,
            dt = config.dt.to_f64(),
            noise_level = config.noise_level.to_f64(),
            "trajectory loop configured"
        );
        Ok(Self {
            source: MotionSource::new(config.profile.clone(), config.noise_level, rng),
            mapper: CommandMapper::new(config.mapper),
            history: HistoryWindow::new(config.window_size),
            previous_direct: JointSet::zero(),
            previous_predictive: JointSet::zero(),
            time: T::zero(),
            phase: LoopPhase::Warming,
            diagnostics: LoopDiagnostics::default(),
            config,
        })
    }

    /// Advance one control period
    pub fn tick(&mut self) -> TickOutcome<T> {
        let now = self.time;
        let dt = self.config.dt;
        self.diagnostics.ticks += 1;

        let reference = self.source.sample(now);
        self.history.push_reference(now, reference);

        let target = self.mapper.map_reference(&reference);
        let (direct, limited) = self
            .mapper
            .rate_limit_report(&self.previous_direct, &target, dt);
        if limited.iter().any(|(_, &hit)| hit) {
            self.diagnostics.direct_rate_limited += 1;
        }
        self.history.push_output(Strategy::Direct, direct);
        self.previous_direct = direct;

        if self.phase == LoopPhase::Warming && self.history.len() >= MIN_TRACKING_SAMPLES {
            self.phase = LoopPhase::Tracking;
            info!(
                samples = self.history.len(),
                time = now.to_f64(),
                "regression window ready, predictive tracking started"
            );
        }

        let (predictive, forecast, fit_status) = match self.phase {
            LoopPhase::Warming => (JointSet::zero(), None, None),
            LoopPhase::Tracking => {
                let models = self.fit_models();
                let fit_status = models.clone().map(|_, model| model.status());
                let forecast = models.map(|_, model| model.predict(now + dt));

                self.diagnostics.fits += Joint::ALL.len() as u64;
                self.diagnostics.degenerate_fits += fit_status
                    .iter()
                    .filter(|(_, status)| **status == FitStatus::Degenerate)
                    .count() as u64;

                let target = self.mapper.map_reference(&forecast);
                let (command, limited) =
                    self.mapper
                        .rate_limit_report(&self.previous_predictive, &target, dt);
                if limited.iter().any(|(_, &hit)| hit) {
                    self.diagnostics.predictive_rate_limited += 1;
                }
                self.previous_predictive = command;
                (command, Some(forecast), Some(fit_status))
            }
        };
        self.history.push_output(Strategy::Predictive, predictive);

        self.time = now + dt;
        trace!(time = now.to_f64(), phase = ?self.phase, "tick");

        TickOutcome {
            time: now,
            reference,
            direct,
            predictive,
            forecast,
            fit_status,
            phase: self.phase,
        }
    }

    /// Fit one harmonic model per joint on the current window
    pub fn fit_models(&self) -> JointSet<HarmonicModel<T>> {
        let times = self.history.time_series();
        let harmonics = self.config.harmonics;
        JointSet::from_fn(|joint| {
            HarmonicModel::fit(&times, &self.history.reference_series(joint), harmonics)
        })
    }

    /// Metrics over the current window; `None` until it holds
    /// [`MIN_TRACKING_SAMPLES`] samples
    pub fn snapshot(&self) -> Option<PerformanceSnapshot<T>> {
        if self.history.len() < MIN_TRACKING_SAMPLES {
            return None;
        }
        let dt = self.config.dt;
        let joints = JointSet::from_fn(|joint| {
            JointMetrics::compute(
                &self.history.reference_series(joint),
                &self.history.output_series(Strategy::Predictive, joint),
                &self.history.output_series(Strategy::Direct, joint),
                dt,
            )
        });
        Some(PerformanceSnapshot { joints })
    }

    /// Arm pose for the latest command of `strategy`
    pub fn endpoints(&self, strategy: Strategy) -> Option<ArmPose<T>> {
        self.history
            .latest_output(strategy)
            .map(|angles| self.config.geometry.endpoints(angles))
    }

    pub fn noise_level(&self) -> T {
        self.source.noise_level()
    }

    /// Change the sensor noise level; applies from the next tick
    pub fn set_noise_level(&mut self, noise_level: T) -> ConfigResult<()> {
        self.source.set_noise_level(noise_level)?;
        self.config.noise_level = noise_level;
        Ok(())
    }

    /// Clear history, command state, time and diagnostics
    pub fn reset(&mut self) {
        self.history.clear();
        self.previous_direct = JointSet::zero();
        self.previous_predictive = JointSet::zero();
        self.time = T::zero();
        self.phase = LoopPhase::Warming;
        self.diagnostics = LoopDiagnostics::default();
    }

    pub fn history(&self) -> &HistoryWindow<T> {
        &self.history
    }

    /// Simulated time of the next sample
    pub fn time(&self) -> T {
        self.time
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn diagnostics(&self) -> LoopDiagnostics {
        self.diagnostics
    }

    pub fn config(&self) -> &TrackingConfig<T> {
        &self.config
    }

    pub fn mapper(&self) -> &CommandMapper<T> {
        &self.mapper
    }

    pub fn source(&self) -> &MotionSource<T, R> {
        &self.source
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_loop(window_size: usize) -> TrajectoryLoop<f64> {
        TrackingBuilder::new()
            .window_size(window_size)
            .noise_level(0.0)
            .seed(1)
            .build()
            .unwrap()
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut window = HistoryWindow::new(10);
        for i in 0..13 {
            window.push_reference(i as f64, JointSet::splat(i as f64));
            window.push_output(Strategy::Direct, JointSet::splat(-(i as f64)));
        }
        assert_eq!(window.len(), 10);
        assert!(window.is_full());
        let expected: Vec<f64> = (3..13).map(|i| i as f64).collect();
        assert_eq!(window.time_series(), expected);
        assert_eq!(window.reference_series(Joint::Elbow), expected);
        assert_eq!(window.latest_output(Strategy::Direct), Some(&JointSet::splat(-12.0)));
        assert_eq!(window.latest_output(Strategy::Predictive), None);
    }

    #[test]
    fn test_zero_capacity_window_stays_empty() {
        let mut window = HistoryWindow::<f64>::new(0);
        for i in 0..5 {
            window.push_reference(i as f64, JointSet::splat(1.0));
            window.push_output(Strategy::Predictive, JointSet::zero());
        }
        assert_eq!(window.len(), 0);
        assert!(window.is_empty());
        assert!(window.is_full());
        assert_eq!(window.latest_output(Strategy::Predictive), None);
    }

    #[test]
    fn test_config_validation() {
        assert!(TrackingConfig::<f64>::default().validate().is_ok());
        assert_eq!(
            TrackingBuilder::<f64>::new().window_size(9).config(),
            Err(ConfigError::WindowTooSmall {
                window_size: 9,
                minimum: MIN_TRACKING_SAMPLES
            })
        );
        assert_eq!(
            TrackingBuilder::<f64>::new().dt(0.0).config(),
            Err(ConfigError::InvalidTimeStep(0.0))
        );
        assert!(TrackingBuilder::<f64>::new().harmonics(4).config().is_ok());
        assert!(TrackingBuilder::<f64>::new().harmonics(0).config().is_ok());
        assert_eq!(
            TrackingBuilder::<f64>::new().harmonics(5).config(),
            Err(ConfigError::TooManyHarmonics {
                harmonics: 5,
                minimum: MIN_TRACKING_SAMPLES
            })
        );
        assert!(TrackingBuilder::<f64>::new()
            .harmonics(30)
            .noise_level(0.0)
            .build()
            .is_err());
        assert!(TrackingBuilder::<f64>::new()
            .harmonics(usize::MAX)
            .build()
            .is_err());
        assert!(TrackingBuilder::<f64>::new().noise_level(-0.01).build().is_err());
        assert!(TrackingBuilder::<f64>::new()
            .joint_limits(Joint::Wrist, 60.0, -60.0)
            .build()
            .is_err());
        assert!(TrackingBuilder::<f64>::new()
            .geometry(ArmGeometry::new(1.0, 0.8, -0.3))
            .build()
            .is_err());
    }

    #[test]
    fn test_warming_then_tracking() {
        let mut sim = quiet_loop(50);
        for i in 0..9 {
            let outcome = sim.tick();
            assert_eq!(outcome.phase, LoopPhase::Warming, "tick {i}");
            assert_eq!(outcome.predictive, JointSet::zero());
            assert!(outcome.forecast.is_none());
            assert!(sim.snapshot().is_none());
        }
        let outcome = sim.tick();
        assert_eq!(outcome.phase, LoopPhase::Tracking);
        assert!(outcome.forecast.is_some());
        assert_eq!(outcome.fit_status, Some(JointSet::splat(FitStatus::Fitted)));
        assert!(sim.snapshot().is_some());
    }

    #[test]
    fn test_time_advances_by_dt() {
        let mut sim = quiet_loop(20);
        let first = sim.tick();
        let second = sim.tick();
        assert_eq!(first.time, 0.0);
        assert!((second.time - 0.05).abs() < 1e-12);
        assert!((sim.time() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_sequences_stay_aligned() {
        let mut sim = quiet_loop(15);
        for _ in 0..40 {
            sim.tick();
            let history = sim.history();
            assert_eq!(history.output(Strategy::Direct).len(), history.len());
            assert_eq!(history.output(Strategy::Predictive).len(), history.len());
            assert_eq!(history.times().len(), history.len());
        }
        assert_eq!(sim.history().len(), 15);
    }

    #[test]
    fn test_reset_returns_to_warming() {
        let mut sim = quiet_loop(20);
        for _ in 0..25 {
            sim.tick();
        }
        assert_eq!(sim.phase(), LoopPhase::Tracking);
        assert_eq!(sim.diagnostics().ticks, 25);
        assert_eq!(sim.diagnostics().fits, 16 * 3);

        sim.reset();
        assert_eq!(sim.phase(), LoopPhase::Warming);
        assert!(sim.history().is_empty());
        assert_eq!(sim.time(), 0.0);
        assert_eq!(sim.diagnostics(), LoopDiagnostics::default());
        assert!(sim.endpoints(Strategy::Direct).is_none());
    }

    #[test]
    fn test_noise_level_update() {
        let mut sim = quiet_loop(20);
        assert!(sim.set_noise_level(0.1).is_ok());
        assert_eq!(sim.noise_level(), 0.1);
        assert_eq!(sim.config().noise_level, 0.1);
        assert!(sim.set_noise_level(-1.0).is_err());
        assert_eq!(sim.noise_level(), 0.1);
    }

    #[test]
    fn test_diagnostics_display() {
        let mut sim = quiet_loop(20);
        for _ in 0..12 {
            sim.tick();
        }
        let text = sim.diagnostics().to_string();
        assert!(text.contains("Ticks: 12"));
        assert!(text.contains("Fits: 9 (0 degenerate)"));
    }
}
