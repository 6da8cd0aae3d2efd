//! Planar forward kinematics of the 3-link arm
//!
//! The shoulder sits at the origin. Each link's orientation is the sum of
//! its own joint angle and every joint angle before it, so the links form an
//! open chain: shoulder → elbow → wrist → end effector.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use num_traits::Float;

use crate::cast;
use crate::error::{ConfigError, ConfigResult};
use crate::joint::JointSet;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct Point2<T> {
    pub x: T,
    pub y: T,
}

impl<T: Float> Point2<T> {
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self::new(T::zero(), T::zero())
    }

    pub fn distance(&self, other: &Self) -> T {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Point `length` away along heading `angle` (radians)
    fn advance(&self, length: T, angle: T) -> Self {
        Self::new(self.x + length * angle.cos(), self.y + length * angle.sin())
    }
}

/// Link lengths of the arm
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct ArmGeometry<T> {
    /// Shoulder → elbow
    pub upper_arm: T,
    /// Elbow → wrist
    pub forearm: T,
    /// Wrist → end effector
    pub hand: T,
}

impl<T: Float> Default for ArmGeometry<T> {
    fn default() -> Self {
        Self {
            upper_arm: T::one(),
            forearm: cast(0.8),
            hand: cast(0.3),
        }
    }
}

impl<T: Float> ArmGeometry<T> {
    pub fn new(upper_arm: T, forearm: T, hand: T) -> Self {
        Self {
            upper_arm,
            forearm,
            hand,
        }
    }

    /// Distance from shoulder to end effector with the arm fully stretched
    pub fn reach(&self) -> T {
        self.upper_arm + self.forearm + self.hand
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for (index, length) in [self.upper_arm, self.forearm, self.hand].into_iter().enumerate() {
            if !length.is_finite() || length <= T::zero() {
                return Err(ConfigError::InvalidLinkLength {
                    index: index + 1,
                    length: length.to_f64().unwrap_or(f64::NAN),
                });
            }
        }
        Ok(())
    }

    /// Joint and end-effector positions for angles given in degrees
    pub fn endpoints(&self, angles: &JointSet<T>) -> ArmPose<T> {
        let theta1 = angles.shoulder.to_radians();
        let theta12 = theta1 + angles.elbow.to_radians();
        let theta123 = theta12 + angles.wrist.to_radians();

        let shoulder = Point2::origin();
        let elbow = shoulder.advance(self.upper_arm, theta1);
        let wrist = elbow.advance(self.forearm, theta12);
        let end = wrist.advance(self.hand, theta123);

        ArmPose {
            shoulder,
            elbow,
            wrist,
            end,
        }
    }
}

/// Positions of every joint along the chain
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct ArmPose<T> {
    pub shoulder: Point2<T>,
    pub elbow: Point2<T>,
    pub wrist: Point2<T>,
    pub end: Point2<T>,
}

impl<T: Float> ArmPose<T> {
    /// Chain points from base to tip
    pub fn points(&self) -> [Point2<T>; 4] {
        [self.shoulder, self.elbow, self.wrist, self.end]
    }
}
