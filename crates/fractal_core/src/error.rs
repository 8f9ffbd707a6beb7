//! Error type shared by setup, teardown and publication.
//!
//! Nothing in the per-frame propagation path returns an error: the per-node
//! math is total for finite inputs. Errors only come from configuration,
//! resource allocation, and calling the frame API out of order.

use thiserror::Error;

use crate::constants::{MAX_DEPTH, MIN_DEPTH};

/// Errors reported to the owning context.
#[derive(Debug, Error)]
pub enum FractalError {
  /// Depth outside `MIN_DEPTH..=MAX_DEPTH`.
  #[error(
    "depth {depth} is outside the supported range {min}..={max}",
    min = MIN_DEPTH,
    max = MAX_DEPTH
  )]
  InvalidDepth { depth: usize },

  /// A level buffer does not hold the node count its index implies.
  #[error("level {level} holds {actual} entries but must hold {expected}")]
  LevelLength {
    level: usize,
    expected: usize,
    actual: usize,
  },

  /// Geometry table entry is not a unit direction / unit quaternion.
  #[error("geometry entry {slot} is invalid: {reason}")]
  InvalidGeometry { slot: usize, reason: &'static str },

  /// Any other rejected configuration value.
  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  /// Level storage could not be reserved.
  #[error("failed to allocate {bytes} bytes for level {level}")]
  Allocation { level: usize, bytes: usize },

  /// The bounded worker pool could not be created.
  #[error("failed to build worker pool: {0}")]
  WorkerPool(#[from] rayon::ThreadPoolBuildError),

  /// A GPU-visible instance buffer could not be created.
  #[error("failed to create instance buffer for level {level}: {reason}")]
  Gpu { level: usize, reason: String },

  /// `advance`/`publish` called before `initialize` or after `shutdown`.
  #[error("fractal is not initialized")]
  NotInitialized,

  /// `publish` called while the current frame is not complete.
  #[error("frame data is not ready for publication")]
  FrameNotReady,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FractalError>;
