//! Sliding-window harmonic regression
//!
//! A [`HarmonicModel`] is a truncated Fourier series
//!
//! ```text
//! x(t) = c₀ + Σₖ [ aₖ cos(kωt) + bₖ sin(kωt) ],   k = 1..H
//! ```
//!
//! fitted by least squares to a window of samples. The fundamental ω is
//! re-anchored on every fit so that one period spans the window:
//! `ω = 2π / max(span, 1)` with `span = t_last - t_first`.
//!
//! Fitting is a pure function of its inputs and never fails. When there is
//! not enough data, or the design matrix is singular or badly conditioned,
//! the model falls back to all-zero coefficients and reports why through
//! [`FitStatus`].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use nalgebra::{DMatrix, DVector};
use num_traits::Float;
use tracing::{debug, warn};

use crate::cast;

/// Smallest accepted ratio of smallest to largest singular value
pub const MIN_RECIPROCAL_CONDITION: f64 = 1e-10;

/// How a model's coefficients were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum FitStatus {
    /// Least-squares solution of a well-conditioned system
    Fitted,
    /// Never fitted, or fewer than two usable points
    Skipped,
    /// System was underdetermined, singular or held non-finite data
    Degenerate,
}

/// Fitted harmonic series for one joint
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct HarmonicModel<T> {
    omega: T,
    /// `[c₀, a₁, b₁, …, a_H, b_H]`
    coeffs: Vec<T>,
    status: FitStatus,
}

impl<T: Float> HarmonicModel<T> {
    /// Model that was never fitted; predicts zero everywhere
    pub fn unfitted(harmonics: usize) -> Self {
        Self::fallback(T::zero(), coefficient_count(harmonics), FitStatus::Skipped)
    }

    /// Least-squares fit of `harmonics` cosine/sine pairs to `(times, values)`
    ///
    /// When the input cannot support `1 + 2 * harmonics` coefficients the
    /// zero model keeps only its constant term.
    pub fn fit(times: &[T], values: &[T], harmonics: usize) -> Self {
        if times.len() != values.len() {
            warn!(
                times = times.len(),
                values = values.len(),
                "mismatched regression input, fit skipped"
            );
            return Self::fallback(T::zero(), None, FitStatus::Skipped);
        }
        if times.len() < 2 {
            return Self::fallback(T::zero(), None, FitStatus::Skipped);
        }

        let span = times[times.len() - 1] - times[0];
        let omega = cast::<T>(core::f64::consts::TAU) / span.max(T::one());
        let Some(n_coeffs) = coefficient_count(harmonics) else {
            warn!(harmonics, "harmonic count overflows the coefficient vector");
            return Self::fallback(omega, None, FitStatus::Degenerate);
        };

        if times.len() < n_coeffs {
            debug!(
                points = times.len(),
                coefficients = n_coeffs,
                "underdetermined harmonic fit"
            );
            return Self::fallback(omega, None, FitStatus::Degenerate);
        }

        let omega_f = omega.to_f64().unwrap_or(f64::NAN);
        let design = DMatrix::from_fn(times.len(), n_coeffs, |row, col| {
            let t = times[row].to_f64().unwrap_or(f64::NAN);
            basis(col, omega_f * t)
        });
        let rhs = DVector::from_iterator(
            values.len(),
            values.iter().map(|v| v.to_f64().unwrap_or(f64::NAN)),
        );

        if design.iter().chain(rhs.iter()).any(|x| !x.is_finite()) {
            debug!(points = times.len(), "non-finite regression input");
            return Self::fallback(omega, Some(n_coeffs), FitStatus::Degenerate);
        }

        let svd = design.svd(true, true);
        let (s_min, s_max) = svd
            .singular_values
            .iter()
            .fold((f64::INFINITY, 0.0_f64), |(lo, hi), &s| (lo.min(s), hi.max(s)));
        if s_max <= 0.0 || s_min / s_max < MIN_RECIPROCAL_CONDITION {
            debug!(
                points = times.len(),
                rcond = s_min / s_max,
                "ill-conditioned harmonic fit"
            );
            return Self::fallback(omega, Some(n_coeffs), FitStatus::Degenerate);
        }

        match svd.solve(&rhs, 0.0) {
            Ok(solution) if solution.iter().all(|c| c.is_finite()) => Self {
                omega,
                coeffs: solution.iter().map(|&c| cast(c)).collect(),
                status: FitStatus::Fitted,
            },
            _ => {
                debug!(points = times.len(), "least-squares solve failed");
                Self::fallback(omega, Some(n_coeffs), FitStatus::Degenerate)
            }
        }
    }

    /// Zero model; `None` keeps only the constant term
    fn fallback(omega: T, n_coeffs: Option<usize>, status: FitStatus) -> Self {
        Self {
            omega,
            coeffs: vec![T::zero(); n_coeffs.unwrap_or(1)],
            status,
        }
    }

    /// Series value at `t`
    pub fn predict(&self, t: T) -> T {
        self.pairs().fold(self.coeffs[0], |acc, (k, a, b)| {
            let phase = k * self.omega * t;
            acc + a * phase.cos() + b * phase.sin()
        })
    }

    /// Exact first derivative at `t`
    pub fn predict_velocity(&self, t: T) -> T {
        self.pairs().fold(T::zero(), |acc, (k, a, b)| {
            let kw = k * self.omega;
            let phase = kw * t;
            acc - kw * a * phase.sin() + kw * b * phase.cos()
        })
    }

    /// Exact second derivative at `t`
    pub fn predict_acceleration(&self, t: T) -> T {
        self.pairs().fold(T::zero(), |acc, (k, a, b)| {
            let kw = k * self.omega;
            let phase = kw * t;
            acc - kw * kw * (a * phase.cos() + b * phase.sin())
        })
    }

    /// `(k, aₖ, bₖ)` for k = 1..H
    fn pairs(&self) -> impl Iterator<Item = (T, T, T)> + '_ {
        self.coeffs[1..]
            .chunks_exact(2)
            .enumerate()
            .map(|(i, pair)| (cast::<T>((i + 1) as f64), pair[0], pair[1]))
    }

    /// Fundamental angular frequency
    pub fn omega(&self) -> T {
        self.omega
    }

    pub fn coefficients(&self) -> &[T] {
        &self.coeffs
    }

    pub fn harmonics(&self) -> usize {
        (self.coeffs.len() - 1) / 2
    }

    pub fn status(&self) -> FitStatus {
        self.status
    }

    /// True when a fit was attempted but fell back to zeros
    pub fn is_degenerate(&self) -> bool {
        self.status == FitStatus::Degenerate
    }
}

/// Length of `[c₀, a₁, b₁, …, a_H, b_H]`; `None` on overflow
pub(crate) fn coefficient_count(harmonics: usize) -> Option<usize> {
    harmonics.checked_mul(2)?.checked_add(1)
}

/// Column `col` of a design-matrix row at phase `x = ωt`
fn basis(col: usize, x: f64) -> f64 {
    if col == 0 {
        return 1.0;
    }
    let k = ((col + 1) / 2) as f64;
    if col % 2 == 1 {
        (k * x).cos()
    } else {
        (k * x).sin()
    }
}
