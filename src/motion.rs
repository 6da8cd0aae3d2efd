//! Synthetic reference motion
//!
//! [`MotionSource`] stands in for the motion sensor on the reference body.
//! Each joint follows a fixed superposition of sinusoids (the ground truth the
//! trackers must follow) and every reading is disturbed by zero-mean Gaussian
//! noise whose standard deviation scales with the magnitude of the true angle.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use num_traits::Float;
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::debug;

use crate::cast;
use crate::error::{ConfigError, ConfigResult};
use crate::joint::JointSet;

/// Shape of a single periodic term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum Waveform {
    Sine,
    Cosine,
}

/// `amplitude * wave(angular_frequency * t)`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct Oscillation<T> {
    pub waveform: Waveform,
    /// Peak deflection (degrees)
    pub amplitude: T,
    /// Angular frequency (rad per time unit)
    pub angular_frequency: T,
}

impl<T: Float> Oscillation<T> {
    pub fn sine(amplitude: T, angular_frequency: T) -> Self {
        Self {
            waveform: Waveform::Sine,
            amplitude,
            angular_frequency,
        }
    }

    pub fn cosine(amplitude: T, angular_frequency: T) -> Self {
        Self {
            waveform: Waveform::Cosine,
            amplitude,
            angular_frequency,
        }
    }

    pub fn value(&self, t: T) -> T {
        let phase = self.angular_frequency * t;
        match self.waveform {
            Waveform::Sine => self.amplitude * phase.sin(),
            Waveform::Cosine => self.amplitude * phase.cos(),
        }
    }
}

/// Ground-truth trajectory of one joint: a constant offset plus oscillations
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct JointMotion<T> {
    pub offset: T,
    pub terms: Vec<Oscillation<T>>,
}

impl<T: Float> JointMotion<T> {
    pub fn new(offset: T, terms: Vec<Oscillation<T>>) -> Self {
        Self { offset, terms }
    }

    pub fn value(&self, t: T) -> T {
        self.terms
            .iter()
            .fold(self.offset, |acc, term| acc + term.value(t))
    }
}

/// Ground-truth motion for the whole arm
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct MotionProfile<T> {
    pub joints: JointSet<JointMotion<T>>,
}

impl<T: Float> MotionProfile<T> {
    pub fn new(joints: JointSet<JointMotion<T>>) -> Self {
        Self { joints }
    }

    /// Noiseless joint angles at time `t`
    pub fn evaluate(&self, t: T) -> JointSet<T> {
        JointSet::new(
            self.joints.shoulder.value(t),
            self.joints.elbow.value(t),
            self.joints.wrist.value(t),
        )
    }
}

impl<T: Float> Default for MotionProfile<T> {
    /// Slow shoulder sweep, periodic elbow flexion around 45°, small wrist roll
    fn default() -> Self {
        let c = cast::<T>;
        Self::new(JointSet::new(
            JointMotion::new(
                T::zero(),
                vec![
                    Oscillation::sine(c(30.0), c(0.5)),
                    Oscillation::sine(c(15.0), c(0.3)),
                ],
            ),
            JointMotion::new(
                c(45.0),
                vec![
                    Oscillation::sine(c(30.0), c(0.8)),
                    Oscillation::cosine(c(10.0), c(0.6)),
                ],
            ),
            JointMotion::new(
                T::zero(),
                vec![
                    Oscillation::sine(c(20.0), c(1.2)),
                    Oscillation::cosine(c(5.0), c(0.9)),
                ],
            ),
        ))
    }
}

/// Noisy sampler of a [`MotionProfile`]
///
/// The random source is injected so runs can be reproduced with a seeded
/// generator.
#[derive(Debug, Clone)]
pub struct MotionSource<T, R> {
    profile: MotionProfile<T>,
    noise_level: T,
    rng: R,
}

impl<T: Float, R: Rng> MotionSource<T, R> {
    pub fn new(profile: MotionProfile<T>, noise_level: T, rng: R) -> Self {
        Self {
            profile,
            noise_level,
            rng,
        }
    }

    /// Ground truth without sensor noise
    pub fn base(&self, t: T) -> JointSet<T> {
        self.profile.evaluate(t)
    }

    /// Sensor reading at time `t`
    ///
    /// Each joint gets independent noise with standard deviation
    /// `noise_level * |base|`.
    pub fn sample(&mut self, t: T) -> JointSet<T> {
        let base = self.base(t);
        let noise_level = self.noise_level;
        let rng = &mut self.rng;
        base.map(|_, value| {
            let std_dev = noise_level * value.abs();
            if std_dev > T::zero() {
                let z: f64 = rng.sample(StandardNormal);
                value + std_dev * cast(z)
            } else {
                value
            }
        })
    }

    pub fn noise_level(&self) -> T {
        self.noise_level
    }

    /// Change the relative noise level; read on the next sample
    pub fn set_noise_level(&mut self, noise_level: T) -> ConfigResult<()> {
        validate_noise_level(noise_level)?;
        debug!(
            from = self.noise_level.to_f64(),
            to = noise_level.to_f64(),
            "noise level changed"
        );
        self.noise_level = noise_level;
        Ok(())
    }

    pub fn profile(&self) -> &MotionProfile<T> {
        &self.profile
    }
}

pub(crate) fn validate_noise_level<T: Float>(noise_level: T) -> ConfigResult<()> {
    if noise_level < T::zero() || !noise_level.is_finite() {
        return Err(ConfigError::InvalidNoiseLevel(
            noise_level.to_f64().unwrap_or(f64::NAN),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_profile_values() {
        let profile = MotionProfile::<f64>::default();
        let at_zero = profile.evaluate(0.0);
        assert_abs_diff_eq!(at_zero.shoulder, 0.0);
        assert_abs_diff_eq!(at_zero.elbow, 55.0);
        assert_abs_diff_eq!(at_zero.wrist, 5.0);

        let t = 1.3;
        let expected_elbow = 45.0 + 30.0 * (0.8 * t).sin() + 10.0 * (0.6 * t).cos();
        assert_abs_diff_eq!(profile.evaluate(t).elbow, expected_elbow, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_noise_returns_ground_truth() {
        let mut source = MotionSource::new(MotionProfile::default(), 0.0, StdRng::seed_from_u64(1));
        for i in 0..20 {
            let t = i as f64 * 0.05;
            assert_eq!(source.sample(t), source.base(t));
        }
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let mut a = MotionSource::new(MotionProfile::default(), 0.1, StdRng::seed_from_u64(42));
        let mut b = MotionSource::new(MotionProfile::default(), 0.1, StdRng::seed_from_u64(42));
        for i in 0..20 {
            let t = i as f64 * 0.05;
            assert_eq!(a.sample(t), b.sample(t));
        }
    }

    #[test]
    fn test_noise_scales_with_magnitude() {
        // The shoulder is exactly zero at t = 0, so it stays noise-free.
        let mut source = MotionSource::new(MotionProfile::default(), 0.2, StdRng::seed_from_u64(7));
        let mut elbow_moved = false;
        for _ in 0..10 {
            let sample = source.sample(0.0);
            assert_eq!(sample.shoulder, 0.0);
            elbow_moved |= sample.elbow != 55.0;
        }
        assert!(elbow_moved);
    }

    #[test]
    fn test_noise_std_matches_level_times_magnitude() {
        // Elbow base is 55° at t = 0, so the noise std should be 0.2 * 55 = 11.
        let mut source =
            MotionSource::new(MotionProfile::<f64>::default(), 0.2, StdRng::seed_from_u64(99));
        let n = 2000;
        let readings: Vec<f64> = (0..n).map(|_| source.sample(0.0).elbow).collect();
        let mean = readings.iter().sum::<f64>() / n as f64;
        let variance = readings.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        assert_abs_diff_eq!(mean, 55.0, epsilon = 1.0);
        assert_abs_diff_eq!(variance.sqrt(), 11.0, epsilon = 1.0);
    }

    #[test]
    fn test_set_noise_level_validation() {
        let mut source =
            MotionSource::new(MotionProfile::<f64>::default(), 0.05, StdRng::seed_from_u64(0));
        assert!(source.set_noise_level(0.15).is_ok());
        assert_eq!(source.noise_level(), 0.15);
        assert_eq!(
            source.set_noise_level(-0.1),
            Err(ConfigError::InvalidNoiseLevel(-0.1))
        );
        assert!(source.set_noise_level(f64::NAN).is_err());
        assert_eq!(source.noise_level(), 0.15);
    }
}
