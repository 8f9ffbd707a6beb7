//! Core data types for fractal propagation.

use glam::{Mat3, Quat, Vec3};

/// One element of the fractal.
///
/// `direction` and `rotation` are fixed at setup. `spin_angle` is the only
/// state carried from frame to frame; the world transform is rebuilt from it
/// every frame instead of accumulating quaternion products.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FractalPart {
  /// Unit offset direction from the parent, in parent space.
  pub direction: Vec3,
  /// Static orientation relative to the parent.
  pub rotation: Quat,
  /// Accumulated spin around the local up axis, in radians.
  pub spin_angle: f32,
  /// World-space position, derived each frame.
  pub world_position: Vec3,
  /// World-space orientation, derived each frame.
  pub world_rotation: Quat,
}

impl FractalPart {
  /// Root part: identity placement, no spin.
  pub const ROOT: Self = Self {
    direction: Vec3::ZERO,
    rotation: Quat::IDENTITY,
    spin_angle: 0.0,
    world_position: Vec3::ZERO,
    world_rotation: Quat::IDENTITY,
  };

  /// Create a part with the given fixed local placement.
  pub fn new(direction: Vec3, rotation: Quat) -> Self {
    Self {
      direction,
      rotation,
      ..Self::ROOT
    }
  }

  /// Spin-only rotation re-derived from the stored angle.
  #[inline]
  pub fn spin_rotation(&self) -> Quat {
    Quat::from_rotation_y(self.spin_angle)
  }
}

impl Default for FractalPart {
  fn default() -> Self {
    Self::ROOT
  }
}

/// Packed 3×4 instance transform: scaled rotation columns plus translation.
///
/// Layout matches a column-major `float3x4` (48 bytes), the format the
/// instanced draw reads per instance.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "bytemuck", derive(bytemuck::Pod, bytemuck::Zeroable))]
pub struct InstanceMatrix {
  pub x_axis: Vec3,
  pub y_axis: Vec3,
  pub z_axis: Vec3,
  pub translation: Vec3,
}

impl InstanceMatrix {
  /// Size of one packed matrix in bytes.
  pub const STRIDE: usize = 12 * 4;

  /// All-zero matrix (collapses the instance to a point at the origin).
  pub const ZERO: Self = Self {
    x_axis: Vec3::ZERO,
    y_axis: Vec3::ZERO,
    z_axis: Vec3::ZERO,
    translation: Vec3::ZERO,
  };

  /// Pack rotation, uniform scale and translation.
  #[inline]
  pub fn from_rotation_scale_translation(rotation: Quat, scale: f32, translation: Vec3) -> Self {
    let r = Mat3::from_quat(rotation) * scale;
    Self {
      x_axis: r.x_axis,
      y_axis: r.y_axis,
      z_axis: r.z_axis,
      translation,
    }
  }

  /// Transform a point by this matrix.
  #[inline]
  pub fn transform_point3(&self, point: Vec3) -> Vec3 {
    self.x_axis * point.x + self.y_axis * point.y + self.z_axis * point.z + self.translation
  }

  /// Columns as a flat float array (column-major).
  pub fn to_cols_array(&self) -> [f32; 12] {
    [
      self.x_axis.x,
      self.x_axis.y,
      self.x_axis.z,
      self.y_axis.x,
      self.y_axis.y,
      self.y_axis.z,
      self.z_axis.x,
      self.z_axis.y,
      self.z_axis.z,
      self.translation.x,
      self.translation.y,
      self.translation.z,
    ]
  }
}

/// External placement of the whole structure, supplied every frame by the
/// owning context.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
  /// Root world position.
  pub position: Vec3,
  /// Root world orientation (before spin).
  pub rotation: Quat,
  /// Uniform scale of the root.
  pub scale: f32,
}

impl Placement {
  pub const IDENTITY: Self = Self {
    position: Vec3::ZERO,
    rotation: Quat::IDENTITY,
    scale: 1.0,
  };

  pub fn new(position: Vec3, rotation: Quat, scale: f32) -> Self {
    Self {
      position,
      rotation,
      scale,
    }
  }

  pub fn from_translation(position: Vec3) -> Self {
    Self {
      position,
      ..Self::IDENTITY
    }
  }

  pub fn with_rotation(mut self, rotation: Quat) -> Self {
    self.rotation = rotation;
    self
  }

  pub fn with_scale(mut self, scale: f32) -> Self {
    self.scale = scale;
    self
  }
}

impl Default for Placement {
  fn default() -> Self {
    Self::IDENTITY
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
