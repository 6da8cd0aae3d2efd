//! Reference-to-robot command mapping
//!
//! Two stages, applied per joint:
//! 1. **Mapping**: scale the reference angle to compensate for the size
//!    difference between reference body and robot, then clamp into the
//!    joint's mechanical range.
//! 2. **Rate limiting**: bound the change from the previously commanded angle
//!    to `max_velocity * dt`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use num_traits::Float;

use crate::cast;
use crate::error::{ConfigError, ConfigResult};
use crate::joint::{Joint, JointSet};

/// Closed mechanical range of a joint (degrees)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct JointLimits<T> {
    pub min: T,
    pub max: T,
}

impl<T: Float> JointLimits<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: T) -> T {
        if value > self.max {
            self.max
        } else if value < self.min {
            self.min
        } else {
            value
        }
    }

    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Mapping and rate-limit parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct MapperConfig<T> {
    /// Reference-to-robot scale factor
    pub scale: JointSet<T>,
    /// Mechanical joint range
    pub limits: JointSet<JointLimits<T>>,
    /// Maximum command rate (degrees per time unit)
    pub max_velocity: JointSet<T>,
}

impl<T: Float> Default for MapperConfig<T> {
    fn default() -> Self {
        let c = cast::<T>;
        Self {
            scale: JointSet::new(c(0.8), c(0.9), c(1.0)),
            limits: JointSet::new(
                JointLimits::new(c(-90.0), c(90.0)),
                JointLimits::new(c(0.0), c(150.0)),
                JointLimits::new(c(-60.0), c(60.0)),
            ),
            max_velocity: JointSet::new(c(50.0), c(80.0), c(100.0)),
        }
    }
}

impl<T: Float> MapperConfig<T> {
    pub fn validate(&self) -> ConfigResult<()> {
        let f = |v: T| v.to_f64().unwrap_or(f64::NAN);
        for joint in Joint::ALL {
            let limits = self.limits[joint];
            if !limits.min.is_finite() || !limits.max.is_finite() || limits.min > limits.max {
                return Err(ConfigError::InvalidJointLimits {
                    joint,
                    min: f(limits.min),
                    max: f(limits.max),
                });
            }
            let limit = self.max_velocity[joint];
            if !limit.is_finite() || limit <= T::zero() {
                return Err(ConfigError::InvalidVelocityLimit {
                    joint,
                    limit: f(limit),
                });
            }
            let scale = self.scale[joint];
            if !scale.is_finite() {
                return Err(ConfigError::InvalidScale {
                    joint,
                    scale: f(scale),
                });
            }
        }
        Ok(())
    }
}

/// Stateless reference-to-command mapper
///
/// The previous command is owned by the caller and passed in on every
/// [`rate_limit`](CommandMapper::rate_limit).
#[derive(Debug, Clone, Copy)]
pub struct CommandMapper<T> {
    config: MapperConfig<T>,
}

impl<T: Float> CommandMapper<T> {
    pub fn new(config: MapperConfig<T>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MapperConfig<T> {
        &self.config
    }

    /// Scale then clamp every joint into its range
    pub fn map_reference(&self, reference: &JointSet<T>) -> JointSet<T> {
        reference.map(|joint, angle| {
            self.config.limits[joint].clamp(angle * self.config.scale[joint])
        })
    }

    /// Bound the per-joint step from `previous` to `max_velocity * dt`
    pub fn rate_limit(&self, previous: &JointSet<T>, target: &JointSet<T>, dt: T) -> JointSet<T> {
        self.rate_limit_report(previous, target, dt).0
    }

    /// Like [`rate_limit`](Self::rate_limit), also reporting which joints hit
    /// their velocity bound
    pub fn rate_limit_report(
        &self,
        previous: &JointSet<T>,
        target: &JointSet<T>,
        dt: T,
    ) -> (JointSet<T>, JointSet<bool>) {
        let stepped = previous.zip_with(*target, |joint, prev, goal| {
            let max_change = self.config.max_velocity[joint] * dt;
            let change = goal - prev;

            if change.abs() > max_change {
                let sign = if change > T::zero() {
                    T::one()
                } else {
                    -T::one()
                };
                (prev + sign * max_change, true)
            } else {
                (goal, false)
            }
        });
        (stepped.map(|_, (value, _)| value), stepped.map(|_, (_, hit)| hit))
    }
}
