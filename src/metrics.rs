//! Comparative tracking metrics
//!
//! All metrics compare a commanded output sequence against the reference
//! sequence it was meant to follow, over equal-length windows:
//!
//! - **RMSE**: root mean squared difference.
//! - **Lag**: offset of the peak of the full cross-correlation, converted to
//!   milliseconds. Integer samples only, so it is a coarse diagnostic.
//! - **Jerk**: mean absolute second difference of the output, a smoothness
//!   proxy rather than a physical third derivative.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use core::fmt;
use num_traits::Float;

use crate::cast;
use crate::joint::{Joint, JointSet};

/// Command strategy being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Strategy {
    /// Rate-limited mapping of a one-step-ahead regression forecast
    Predictive,
    /// Rate-limited mapping of the latest sensed sample
    Direct,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Predictive => f.write_str("predictive"),
            Strategy::Direct => f.write_str("direct"),
        }
    }
}

/// Root mean squared difference over the common prefix of `a` and `b`
pub fn rmse<T: Float>(a: &[T], b: &[T]) -> T {
    let n = a.len().min(b.len());
    if n == 0 {
        return T::zero();
    }
    let sum = a
        .iter()
        .zip(b)
        .fold(T::zero(), |acc, (&x, &y)| acc + (x - y) * (x - y));
    (sum / cast(n as f64)).sqrt()
}

/// Full discrete cross-correlation
///
/// Entry `i` holds `Σⱼ a[j + k]·v[j]` for lag `k = i - (v.len() - 1)`,
/// summing over the indices where both sequences are defined.
pub fn cross_correlation<T: Float>(a: &[T], v: &[T]) -> Vec<T> {
    if a.is_empty() || v.is_empty() {
        return Vec::new();
    }
    let offset = v.len() as isize - 1;
    (0..a.len() + v.len() - 1)
        .map(|i| {
            let k = i as isize - offset;
            v.iter()
                .enumerate()
                .filter_map(|(j, &vj)| {
                    let idx = j as isize + k;
                    (idx >= 0 && (idx as usize) < a.len()).then(|| a[idx as usize] * vj)
                })
                .fold(T::zero(), |acc, x| acc + x)
        })
        .collect()
}

/// Lag (in samples) at the first cross-correlation peak
///
/// Negative when `output` trails `reference`.
pub fn lag_samples<T: Float>(reference: &[T], output: &[T]) -> isize {
    let correlation = cross_correlation(reference, output);
    let Some(first) = correlation.first() else {
        return 0;
    };
    let (peak, _) = correlation
        .iter()
        .enumerate()
        .skip(1)
        .fold((0, *first), |(best_i, best), (i, &c)| {
            if c > best {
                (i, c)
            } else {
                (best_i, best)
            }
        });
    peak as isize - (output.len() as isize - 1)
}

/// Mean absolute second-order difference; zero for fewer than three samples
pub fn mean_abs_second_difference<T: Float>(values: &[T]) -> T {
    if values.len() <= 2 {
        return T::zero();
    }
    let two = cast::<T>(2.0);
    let sum = values
        .windows(3)
        .fold(T::zero(), |acc, w| acc + (w[2] - two * w[1] + w[0]).abs());
    sum / cast((values.len() - 2) as f64)
}

/// Error, lag and smoothness of one strategy on one joint
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct StrategyMetrics<T> {
    pub rmse: T,
    /// Unsigned lag estimate (milliseconds)
    pub lag_ms: T,
    pub jerk: T,
}

impl<T: Float> StrategyMetrics<T> {
    /// Metrics of `output` against `reference` sampled every `dt` time units
    pub fn compute(reference: &[T], output: &[T], dt: T) -> Self {
        let lag = lag_samples(reference, output).unsigned_abs();
        Self {
            rmse: rmse(reference, output),
            lag_ms: cast::<T>(lag as f64) * dt * cast(1000.0),
            jerk: mean_abs_second_difference(output),
        }
    }
}

/// Both strategies on one joint
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct JointMetrics<T> {
    pub predictive: StrategyMetrics<T>,
    pub direct: StrategyMetrics<T>,
    /// Length of the common suffix the metrics were computed over
    pub samples: usize,
}

impl<T: Float> JointMetrics<T> {
    /// Compare both outputs over the longest common suffix of all three
    /// sequences
    pub fn compute(reference: &[T], predictive: &[T], direct: &[T], dt: T) -> Self {
        let m = reference.len().min(predictive.len()).min(direct.len());
        let reference = &reference[reference.len() - m..];
        let predictive = &predictive[predictive.len() - m..];
        let direct = &direct[direct.len() - m..];
        Self {
            predictive: StrategyMetrics::compute(reference, predictive, dt),
            direct: StrategyMetrics::compute(reference, direct, dt),
            samples: m,
        }
    }

    pub fn get(&self, strategy: Strategy) -> &StrategyMetrics<T> {
        match strategy {
            Strategy::Predictive => &self.predictive,
            Strategy::Direct => &self.direct,
        }
    }

    /// Relative RMSE reduction of the predictive path over the direct one
    /// (percent); `None` when the direct RMSE is zero
    pub fn improvement_percent(&self) -> Option<T> {
        if self.direct.rmse <= T::zero() {
            return None;
        }
        Some((self.direct.rmse - self.predictive.rmse) / self.direct.rmse * cast(100.0))
    }
}

/// Per-joint comparison of the two strategies over the current window
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct PerformanceSnapshot<T> {
    pub joints: JointSet<JointMetrics<T>>,
}

impl<T: Float> PerformanceSnapshot<T> {
    pub fn joint(&self, joint: Joint) -> &JointMetrics<T> {
        &self.joints[joint]
    }

    pub fn get(&self, joint: Joint, strategy: Strategy) -> &StrategyMetrics<T> {
        self.joints[joint].get(strategy)
    }

    /// See [`JointMetrics::improvement_percent`]
    pub fn improvement_percent(&self, joint: Joint) -> Option<T> {
        self.joints[joint].improvement_percent()
    }

    /// Mean RMSE across joints for one strategy
    pub fn mean_rmse(&self, strategy: Strategy) -> T {
        let sum = self
            .joints
            .iter()
            .fold(T::zero(), |acc, (_, m)| acc + m.get(strategy).rmse);
        sum / cast(Joint::ALL.len() as f64)
    }
}

impl<T: Float + fmt::Display> fmt::Display for PerformanceSnapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tracking Performance:")?;
        for (joint, m) in self.joints.iter() {
            write!(
                f,
                "\n  {} ({} samples):\n    RMSE - Predictive: {:.2}°  Direct: {:.2}°\n    Lag  - Predictive: {:.0} ms  Direct: {:.0} ms\n    Jerk - Predictive: {:.3}  Direct: {:.3}",
                joint,
                m.samples,
                m.predictive.rmse,
                m.direct.rmse,
                m.predictive.lag_ms,
                m.direct.lag_ms,
                m.predictive.jerk,
                m.direct.jerk,
            )?;
            if let Some(improvement) = m.improvement_percent() {
                write!(f, "\n    Improvement: {:.1}%", improvement)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rmse_identity_and_offset() {
        let reference = [1.0, -2.0, 3.5, 0.0];
        assert_eq!(rmse(&reference, &reference), 0.0);

        let shifted: Vec<f64> = reference.iter().map(|x| x + 2.0).collect();
        assert_abs_diff_eq!(rmse(&reference, &shifted), 2.0, epsilon = 1e-12);
        assert_eq!(rmse::<f64>(&[], &[]), 0.0);
    }

    #[test]
    fn test_cross_correlation_full_mode() {
        // Matches the conventional "full" ordering: lags -(m-1)..=(n-1).
        let c = cross_correlation(&[1.0, 2.0, 3.0], &[0.0, 1.0, 0.5]);
        let expected = [0.5, 2.0, 3.5, 3.0, 0.0];
        assert_eq!(c.len(), expected.len());
        for (got, want) in c.iter().zip(expected) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_lag_of_shifted_pulse() {
        let mut reference = vec![0.0; 20];
        let mut delayed = vec![0.0; 20];
        reference[5] = 1.0;
        delayed[8] = 1.0;
        assert_eq!(lag_samples(&reference, &delayed), -3);
        assert_eq!(lag_samples(&delayed, &reference), 3);

        let metrics = StrategyMetrics::compute(&reference, &delayed, 0.05);
        assert_abs_diff_eq!(metrics.lag_ms, 150.0, epsilon = 1e-9);
    }

    #[test]
    fn test_identical_sequences_have_zero_lag() {
        let signal: Vec<f64> = (0..30).map(|i| (i as f64 * 0.4).sin() + 0.1 * i as f64).collect();
        assert_eq!(lag_samples(&signal, &signal), 0);
    }

    #[test]
    fn test_second_difference() {
        assert_abs_diff_eq!(mean_abs_second_difference(&[0.0, 1.0, 4.0, 9.0, 16.0]), 2.0);
        assert_abs_diff_eq!(mean_abs_second_difference(&[0.0, 1.0, 0.0, 1.0]), 2.0);
        assert_eq!(mean_abs_second_difference(&[1.0, 5.0]), 0.0);
        assert_eq!(mean_abs_second_difference(&[3.0, 3.0, 3.0, 3.0]), 0.0);
    }

    #[test]
    fn test_joint_metrics_use_common_suffix() {
        let reference = [9.0, 9.0, 1.0, 2.0, 3.0];
        let predictive = [1.0, 2.0, 3.0];
        let direct = [0.0, 1.0, 2.0, 2.0];
        let m = JointMetrics::compute(&reference, &predictive, &direct, 0.05);
        assert_eq!(m.samples, 3);
        assert_eq!(m.predictive.rmse, 0.0);
        assert_abs_diff_eq!(m.direct.rmse, (1.0_f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(m.improvement_percent().unwrap(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_improvement_undefined_for_perfect_direct() {
        let signal = [1.0, 2.0, 3.0, 4.0];
        let m = JointMetrics::compute(&signal, &[0.0; 4], &signal, 0.05);
        assert_eq!(m.improvement_percent(), None);
    }

    #[test]
    fn test_snapshot_display() {
        let signal = [1.0, 2.0, 4.0, 7.0];
        let m = JointMetrics::compute(&signal, &signal, &[0.0, 2.0, 4.0, 7.0], 0.05);
        let snapshot = PerformanceSnapshot {
            joints: JointSet::splat(m),
        };
        let text = snapshot.to_string();
        assert!(text.starts_with("Tracking Performance:"));
        assert!(text.contains("shoulder (4 samples)"));
        assert!(text.contains("Improvement: 100.0%"));
        assert_abs_diff_eq!(snapshot.mean_rmse(Strategy::Direct), 0.5, epsilon = 1e-12);
        assert_eq!(
            snapshot.improvement_percent(Joint::Wrist),
            snapshot.joint(Joint::Wrist).improvement_percent()
        );
    }
}
