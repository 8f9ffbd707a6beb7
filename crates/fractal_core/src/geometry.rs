//! Geometry/orientation table: the five canonical child placements.
//!
//! ```text
//!            up (0)
//!             │   forward (3)
//!             │  /
//!  left (2) ──r── right (1)
//!            /
//!       back (4)
//! ```
//!
//! Each child is rotated so that its own local up axis points away from the
//! parent along its direction: `rotations[i] * Y == directions[i]`.

use std::f32::consts::FRAC_PI_2;

use glam::{Quat, Vec3};

use crate::constants::BRANCHING_FACTOR;
use crate::error::{FractalError, Result};

/// Tolerance used when validating unit vectors and quaternions.
const UNIT_TOLERANCE: f32 = 1e-4;

/// Fixed lookup of child offset directions and orientations.
///
/// Shared read-only between every structure: build it once at startup and
/// hand out `Arc` clones.
#[derive(Clone, Debug, PartialEq)]
pub struct GeometryTable {
  directions: [Vec3; BRANCHING_FACTOR],
  rotations: [Quat; BRANCHING_FACTOR],
}

impl GeometryTable {
  /// Build a table from explicit entries, validating each one.
  pub fn new(
    directions: [Vec3; BRANCHING_FACTOR],
    rotations: [Quat; BRANCHING_FACTOR],
  ) -> Result<Self> {
    for slot in 0..BRANCHING_FACTOR {
      let direction = directions[slot];
      let rotation = rotations[slot];
      if !direction.is_finite() || (direction.length() - 1.0).abs() > UNIT_TOLERANCE {
        return Err(FractalError::InvalidGeometry {
          slot,
          reason: "direction must be a finite unit vector",
        });
      }
      if !rotation.is_finite() || (rotation.length() - 1.0).abs() > UNIT_TOLERANCE {
        return Err(FractalError::InvalidGeometry {
          slot,
          reason: "rotation must be a finite unit quaternion",
        });
      }
    }
    Ok(Self {
      directions,
      rotations,
    })
  }

  /// The canonical table: up, right, left, forward, back.
  pub fn canonical() -> Self {
    Self {
      directions: [Vec3::Y, Vec3::X, Vec3::NEG_X, Vec3::Z, Vec3::NEG_Z],
      rotations: [
        Quat::IDENTITY,
        Quat::from_rotation_z(-FRAC_PI_2),
        Quat::from_rotation_z(FRAC_PI_2),
        Quat::from_rotation_x(FRAC_PI_2),
        Quat::from_rotation_x(-FRAC_PI_2),
      ],
    }
  }

  /// Offset direction for child `slot`.
  #[inline]
  pub fn direction(&self, slot: usize) -> Vec3 {
    self.directions[slot]
  }

  /// Static orientation for child `slot`.
  #[inline]
  pub fn rotation(&self, slot: usize) -> Quat {
    self.rotations[slot]
  }

  /// `(direction, rotation)` pair for child `slot`.
  #[inline]
  pub fn entry(&self, slot: usize) -> (Vec3, Quat) {
    (self.directions[slot], self.rotations[slot])
  }

  pub fn directions(&self) -> &[Vec3; BRANCHING_FACTOR] {
    &self.directions
  }

  pub fn rotations(&self) -> &[Quat; BRANCHING_FACTOR] {
    &self.rotations
  }
}

impl Default for GeometryTable {
  fn default() -> Self {
    Self::canonical()
  }
}

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;
