//! Joint identifiers and the fixed three-joint value set
//!
//! Every angle-bearing quantity in the crate (reference samples, commands,
//! limits, scale factors) is a [`JointSet`]: exactly one value for each of
//! shoulder, elbow and wrist. Building one from loosely named input goes
//! through [`JointSet::from_named`], which rejects unknown, duplicate and
//! missing joints up front.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use core::fmt;
use core::ops::{Index, IndexMut};
use core::str::FromStr;
use num_traits::Float;

use crate::error::JointSetError;

/// Arm joint identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Joint {
    Shoulder,
    Elbow,
    Wrist,
}

impl Joint {
    /// All joints, base of the chain first
    pub const ALL: [Joint; 3] = [Joint::Shoulder, Joint::Elbow, Joint::Wrist];

    pub fn name(self) -> &'static str {
        match self {
            Joint::Shoulder => "shoulder",
            Joint::Elbow => "elbow",
            Joint::Wrist => "wrist",
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Joint {
    type Err = JointSetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Joint::ALL
            .into_iter()
            .find(|joint| joint.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| JointSetError::UnknownJoint(s.to_string()))
    }
}

/// One value per joint
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct JointSet<T> {
    pub shoulder: T,
    pub elbow: T,
    pub wrist: T,
}

impl<T> JointSet<T> {
    pub const fn new(shoulder: T, elbow: T, wrist: T) -> Self {
        Self {
            shoulder,
            elbow,
            wrist,
        }
    }

    /// Build by evaluating `f` for every joint
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(Joint) -> T,
    {
        Self {
            shoulder: f(Joint::Shoulder),
            elbow: f(Joint::Elbow),
            wrist: f(Joint::Wrist),
        }
    }

    /// Build from `(name, value)` pairs, requiring each joint exactly once
    pub fn from_named<'a, I>(pairs: I) -> Result<Self, JointSetError>
    where
        I: IntoIterator<Item = (&'a str, T)>,
    {
        let mut slots: [Option<T>; 3] = [None, None, None];
        for (name, value) in pairs {
            let joint: Joint = name.parse()?;
            let slot = &mut slots[joint as usize];
            if slot.is_some() {
                return Err(JointSetError::DuplicateJoint(joint));
            }
            *slot = Some(value);
        }
        let [shoulder, elbow, wrist] = slots;
        Ok(Self {
            shoulder: shoulder.ok_or(JointSetError::MissingJoint(Joint::Shoulder))?,
            elbow: elbow.ok_or(JointSetError::MissingJoint(Joint::Elbow))?,
            wrist: wrist.ok_or(JointSetError::MissingJoint(Joint::Wrist))?,
        })
    }

    /// Apply `f` to every joint value
    pub fn map<U, F>(self, mut f: F) -> JointSet<U>
    where
        F: FnMut(Joint, T) -> U,
    {
        JointSet {
            shoulder: f(Joint::Shoulder, self.shoulder),
            elbow: f(Joint::Elbow, self.elbow),
            wrist: f(Joint::Wrist, self.wrist),
        }
    }

    /// Combine two sets joint by joint
    pub fn zip_with<U, V, F>(self, other: JointSet<U>, mut f: F) -> JointSet<V>
    where
        F: FnMut(Joint, T, U) -> V,
    {
        JointSet {
            shoulder: f(Joint::Shoulder, self.shoulder, other.shoulder),
            elbow: f(Joint::Elbow, self.elbow, other.elbow),
            wrist: f(Joint::Wrist, self.wrist, other.wrist),
        }
    }

    /// Joint/value pairs in [`Joint::ALL`] order
    pub fn iter(&self) -> impl Iterator<Item = (Joint, &T)> + '_ {
        Joint::ALL.into_iter().map(move |joint| (joint, &self[joint]))
    }
}

impl<T: Clone> JointSet<T> {
    /// Same value for every joint
    pub fn splat(value: T) -> Self {
        Self {
            shoulder: value.clone(),
            elbow: value.clone(),
            wrist: value,
        }
    }
}

impl<T: Float> JointSet<T> {
    pub fn zero() -> Self {
        Self::splat(T::zero())
    }

    /// True when every value is finite
    pub fn is_finite(&self) -> bool {
        self.iter().all(|(_, value)| value.is_finite())
    }
}

impl<T> Index<Joint> for JointSet<T> {
    type Output = T;

    fn index(&self, joint: Joint) -> &T {
        match joint {
            Joint::Shoulder => &self.shoulder,
            Joint::Elbow => &self.elbow,
            Joint::Wrist => &self.wrist,
        }
    }
}

impl<T> IndexMut<Joint> for JointSet<T> {
    fn index_mut(&mut self, joint: Joint) -> &mut T {
        match joint {
            Joint::Shoulder => &mut self.shoulder,
            Joint::Elbow => &mut self.elbow,
            Joint::Wrist => &mut self.wrist,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_parse_case_insensitive() {
        assert_eq!("Elbow".parse::<Joint>(), Ok(Joint::Elbow));
        assert_eq!(" wrist ".parse::<Joint>(), Ok(Joint::Wrist));
        assert_eq!(
            "knee".parse::<Joint>(),
            Err(JointSetError::UnknownJoint("knee".to_string()))
        );
    }

    #[test]
    fn test_from_named_complete() {
        let set =
            JointSet::from_named([("wrist", 3.0), ("shoulder", 1.0), ("elbow", 2.0)]).unwrap();
        assert_eq!(set, JointSet::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_from_named_rejects_bad_input() {
        assert_eq!(
            JointSet::from_named([("shoulder", 1.0), ("elbow", 2.0)]),
            Err(JointSetError::MissingJoint(Joint::Wrist))
        );
        assert_eq!(
            JointSet::from_named([("shoulder", 1.0), ("shoulder", 2.0), ("wrist", 0.0)]),
            Err(JointSetError::DuplicateJoint(Joint::Shoulder))
        );
        assert!(matches!(
            JointSet::from_named([("shoulder", 1.0), ("elbow", 2.0), ("wrist", 3.0), ("hip", 4.0)]),
            Err(JointSetError::UnknownJoint(_))
        ));
    }

    #[test]
    fn test_index_and_map() {
        let mut set = JointSet::new(1.0, 2.0, 3.0);
        set[Joint::Elbow] = 20.0;
        assert_eq!(set[Joint::Elbow], 20.0);

        let doubled = set.map(|_, v| v * 2.0);
        assert_eq!(doubled, JointSet::new(2.0, 40.0, 6.0));

        let diff = doubled.zip_with(set, |_, a, b| a - b);
        assert_eq!(diff, set);

        let names: Vec<&str> = set.iter().map(|(joint, _)| joint.name()).collect();
        assert_eq!(names, ["shoulder", "elbow", "wrist"]);
    }
}
