//! Error types

use crate::joint::Joint;
use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Rejected configuration values.
///
/// A running loop never fails; every check happens when a configuration is
/// built or a setting is changed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// History window cannot reach the regression threshold
    #[error("window size {window_size} is below the minimum of {minimum} samples")]
    WindowTooSmall { window_size: usize, minimum: usize },

    /// Regression model needs more coefficients than the first tracking
    /// window holds
    #[error("{harmonics} harmonics cannot be fitted from the first {minimum} samples")]
    TooManyHarmonics { harmonics: usize, minimum: usize },

    /// Control period must be positive and finite
    #[error("time step must be positive and finite, got {0}")]
    InvalidTimeStep(f64),

    /// Noise level must be non-negative and finite
    #[error("noise level must be non-negative and finite, got {0}")]
    InvalidNoiseLevel(f64),

    /// Joint limit interval is empty or not finite
    #[error("invalid limits for {joint}: [{min}, {max}]")]
    InvalidJointLimits { joint: Joint, min: f64, max: f64 },

    /// Velocity limit must be positive and finite
    #[error("velocity limit for {joint} must be positive and finite, got {limit}")]
    InvalidVelocityLimit { joint: Joint, limit: f64 },

    /// Scale factor must be finite
    #[error("scale factor for {joint} must be finite, got {scale}")]
    InvalidScale { joint: Joint, scale: f64 },

    /// Link lengths must be positive and finite
    #[error("link {index} length must be positive and finite, got {length}")]
    InvalidLinkLength { index: usize, length: f64 },
}

/// Errors building a [`JointSet`](crate::joint::JointSet) from named values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JointSetError {
    /// Name does not match any known joint
    #[error("unknown joint '{0}'")]
    UnknownJoint(String),

    /// Joint given more than once
    #[error("joint {0} given more than once")]
    DuplicateJoint(Joint),

    /// Joint absent from the input
    #[error("joint {0} is missing")]
    MissingJoint(Joint),
}
