//! fractal_core - Engine independent fractal transform propagation
//!
//! Animates a self-similar structure of rigid transforms (branching factor
//! 5, depth 1..=8) without a scene graph. Each depth level is a flat buffer;
//! every frame the root is advanced serially and the levels below are
//! derived one after the other, each level in parallel, then packed into
//! per-level instance matrix buffers for one instanced draw per level.
//!
//! # Features
//!
//! - **Flat level storage**: child `c` of parent `p` at `p * 5 + c`
//! - **Drift-free rotation**: spin kept as an angle, re-derived every frame
//! - **Ordered parallelism**: per-level rayon stages chained by completion
//!   tokens, one blocking join per frame
//! - **Engine-agnostic publishing**: `InstanceBackend` trait with a headless
//!   recording backend (wgpu lives in `fractal_wgpu`)
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fractal_core::{Fractal, FractalConfig, GeometryTable, Placement};
//! use fractal_core::publish::{InstancePublisher, RecordingBackend};
//!
//! let geometry = Arc::new(GeometryTable::canonical());
//! let mut publisher = InstancePublisher::new(RecordingBackend::new());
//! let mut fractal =
//!     Fractal::initialize_with(FractalConfig::new().with_depth(6), geometry, &mut publisher)?;
//!
//! fractal.advance(1.0 / 60.0, Placement::IDENTITY)?;
//! fractal.publish(&mut publisher, &(), &())?;
//!
//! fractal.shutdown_with(&mut publisher);
//! ```

pub mod constants;
pub mod error;
pub mod geometry;
pub mod types;

// Re-export commonly used items
pub use constants::{
  child_index, level_len, parent_index, total_nodes, BRANCHING_FACTOR, MAX_DEPTH, MIN_DEPTH,
};
pub use error::{FractalError, Result};
pub use geometry::GeometryTable;
pub use types::{FractalPart, InstanceMatrix, Placement};

// Setup parameters
pub mod config;
pub use config::FractalConfig;

// Per-level flat storage
pub mod level;
pub use level::{Level, LevelStore};

// Per-level update and frame scheduling
pub mod job;
pub mod scheduler;
pub use job::{LevelDone, LevelUpdateJob};
pub use scheduler::{FrameInput, FrameReport};

// Bounded worker pool
pub mod threading;
pub use threading::WorkerPool;

// Renderer boundary
pub mod publish;
pub use publish::{DrawBounds, InstanceBackend, InstancePublisher};

// Frame statistics
pub mod metrics;

// Structure lifecycle
pub mod fractal;
pub use fractal::{Fractal, FractalId, FrameState};
