//! Fractal - one animated structure and its frame lifecycle.
//!
//! ```text
//!                 initialize / enable
//!  Uninitialized ─────────────────────► Stale ──advance──► Propagating ──join──► Ready
//!        ▲                                ▲                                        │
//!        │            shutdown            │               advance                  │
//!        └────────────────────────────────┴────────────────────────────────────────┘
//! ```
//!
//! Each fractal owns its level store and worker pool. The geometry table is
//! shared read-only between fractals through an `Arc`. Changing depth or any
//! other setup parameter goes through a full teardown and rebuild.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use web_time::Instant;

use crate::config::FractalConfig;
use crate::error::{FractalError, Result};
use crate::geometry::GeometryTable;
use crate::level::LevelStore;
use crate::metrics::FractalMetrics;
use crate::publish::{DrawBounds, InstanceBackend, InstancePublisher};
use crate::scheduler::{propagate, FrameInput, FrameReport};
use crate::threading::WorkerPool;
use crate::types::Placement;

// =============================================================================
// FractalId - unique identifier
// =============================================================================

static FRACTAL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque fractal identifier, unique within the process lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FractalId(u64);

impl FractalId {
  pub fn new() -> Self {
    Self(FRACTAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
  }

  pub fn raw(&self) -> u64 {
    self.0
  }
}

impl Default for FractalId {
  fn default() -> Self {
    Self::new()
  }
}

/// Where the level buffers are in the frame cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameState {
  /// No level storage.
  Uninitialized,
  /// Storage allocated, no frame computed since setup.
  Stale,
  /// A frame started and has not joined. Left set if a worker panicked.
  Propagating,
  /// Every level of the latest frame is written.
  Ready,
}

// =============================================================================
// Fractal
// =============================================================================

/// One fractal structure.
pub struct Fractal {
  id: FractalId,
  config: FractalConfig,
  geometry: Arc<GeometryTable>,
  store: Option<LevelStore>,
  pool: Option<WorkerPool>,
  state: FrameState,
  placement: Placement,
  frames: u64,
  metrics: FractalMetrics,
}

impl Fractal {
  /// Uninitialized fractal. Call [`Fractal::enable`] before advancing.
  pub fn new(config: FractalConfig, geometry: Arc<GeometryTable>) -> Self {
    Self {
      id: FractalId::new(),
      config,
      geometry,
      store: None,
      pool: None,
      state: FrameState::Uninitialized,
      placement: Placement::IDENTITY,
      frames: 0,
      metrics: FractalMetrics::new(),
    }
  }

  /// Create and set up a fractal in one step.
  pub fn initialize(config: FractalConfig, geometry: Arc<GeometryTable>) -> Result<Self> {
    let mut fractal = Self::new(config, geometry);
    fractal.enable()?;
    Ok(fractal)
  }

  /// Set up like [`Fractal::initialize`] and create the publisher's GPU
  /// buffers. Nothing stays allocated if either step fails.
  pub fn initialize_with<B: InstanceBackend>(
    config: FractalConfig,
    geometry: Arc<GeometryTable>,
    publisher: &mut InstancePublisher<B>,
  ) -> Result<Self> {
    let mut fractal = Self::initialize(config, geometry)?;
    fractal.prepare_publisher(publisher)?;
    Ok(fractal)
  }

  /// Create the publisher's buffers for the current store, shutting down on
  /// failure.
  fn prepare_publisher<B: InstanceBackend>(
    &mut self,
    publisher: &mut InstancePublisher<B>,
  ) -> Result<()> {
    let Some(store) = &self.store else {
      return Err(FractalError::NotInitialized);
    };
    if let Err(err) = publisher.prepare(store) {
      self.shutdown();
      return Err(err);
    }
    Ok(())
  }

  /// Allocate level storage and the worker pool for the current config.
  ///
  /// An already enabled fractal is torn down first. On error the fractal is
  /// left uninitialized.
  pub fn enable(&mut self) -> Result<()> {
    self.shutdown();
    self.config.validate()?;

    let start = Instant::now();
    let store = LevelStore::allocate(self.config.depth, &self.geometry)?;
    let pool = WorkerPool::new(self.config.worker_threads)?;

    tracing::debug!(
      fractal = self.id.raw(),
      depth = store.depth(),
      nodes = store.total_nodes(),
      bytes = store.memory_bytes(),
      threads = pool.num_threads(),
      setup_us = start.elapsed().as_micros() as u64,
      "fractal initialized"
    );

    self.store = Some(store);
    self.pool = Some(pool);
    self.state = FrameState::Stale;
    Ok(())
  }

  /// Release level storage and the worker pool. Safe to call repeatedly.
  pub fn shutdown(&mut self) {
    if self.store.take().is_some() {
      tracing::debug!(fractal = self.id.raw(), frames = self.frames, "fractal shut down");
    }
    self.pool = None;
    self.state = FrameState::Uninitialized;
  }

  /// Release the publisher's GPU buffers, then shut down.
  pub fn shutdown_with<B: InstanceBackend>(&mut self, publisher: &mut InstancePublisher<B>) {
    publisher.release();
    self.shutdown();
  }

  /// Full teardown and rebuild with a new config.
  ///
  /// Publisher buffers are not touched; use [`Fractal::reconfigure_with`]
  /// when a publisher holds buffers for this fractal.
  pub fn reconfigure(&mut self, config: FractalConfig) -> Result<()> {
    self.shutdown();
    self.config = config;
    self.enable()
  }

  /// Full teardown and rebuild including the publisher's GPU buffers.
  ///
  /// The old buffers are released first. If the new ones cannot be created
  /// the fractal is shut down again and nothing stays allocated.
  pub fn reconfigure_with<B: InstanceBackend>(
    &mut self,
    config: FractalConfig,
    publisher: &mut InstancePublisher<B>,
  ) -> Result<()> {
    self.shutdown_with(publisher);
    self.config = config;
    self.enable()?;
    self.prepare_publisher(publisher)
  }

  /// Run one frame: advance the root by `elapsed_time` seconds from
  /// `placement`, then every level in order. Returns after the deepest
  /// level is written.
  ///
  /// A worker panic unwinds out of this call and leaves the state
  /// `Propagating`. The next call first resyncs every spin angle to the
  /// root's, so a partly applied frame counts as fully applied.
  pub fn advance(&mut self, elapsed_time: f32, placement: Placement) -> Result<FrameReport> {
    let (Some(store), Some(pool)) = (self.store.as_mut(), self.pool.as_ref()) else {
      return Err(FractalError::NotInitialized);
    };

    if self.state == FrameState::Propagating {
      let fixed = store.resync_spin();
      tracing::warn!(
        fractal = self.id.raw(),
        parts = fixed,
        "previous frame did not finish, spin angles resynced to the root"
      );
    }

    self.state = FrameState::Propagating;
    let input = FrameInput::new(self.config.spin_rate, elapsed_time, placement);
    let report = propagate(store, pool, &input, self.config.parallel_batch_size);
    self.state = FrameState::Ready;

    self.placement = placement;
    self.frames += 1;

    let budget = self.config.frame_budget_us;
    if budget > 0 && report.total_us > budget {
      tracing::warn!(
        fractal = self.id.raw(),
        frame = self.frames,
        total_us = report.total_us,
        budget_us = budget,
        "propagation exceeded frame budget"
      );
      self.metrics.record_over_budget();
    }
    self.metrics.record_frame(&report);

    Ok(report)
  }

  /// Upload every level and issue one instanced draw per level.
  ///
  /// Only data left ready by the latest [`Fractal::advance`] is published.
  pub fn publish<B: InstanceBackend>(
    &mut self,
    publisher: &mut InstancePublisher<B>,
    mesh: &B::Mesh,
    material: &B::Material,
  ) -> Result<()> {
    let Some(store) = &self.store else {
      return Err(FractalError::NotInitialized);
    };
    if self.state != FrameState::Ready {
      return Err(FractalError::FrameNotReady);
    }

    let start = Instant::now();
    let bounds = DrawBounds::for_root(store.root().world_position, self.placement.scale);
    publisher.publish(store, &bounds, mesh, material)?;
    self.metrics.record_publish_timing(start.elapsed().as_micros() as u64);
    Ok(())
  }

  /// Draw bounds of the latest frame.
  pub fn bounds(&self) -> Option<DrawBounds> {
    let store = self.store.as_ref()?;
    Some(DrawBounds::for_root(store.root().world_position, self.placement.scale))
  }

  pub fn id(&self) -> FractalId {
    self.id
  }

  pub fn config(&self) -> &FractalConfig {
    &self.config
  }

  pub fn geometry(&self) -> &Arc<GeometryTable> {
    &self.geometry
  }

  pub fn store(&self) -> Option<&LevelStore> {
    self.store.as_ref()
  }

  pub fn state(&self) -> FrameState {
    self.state
  }

  pub fn is_initialized(&self) -> bool {
    self.store.is_some()
  }

  /// Placement used by the latest frame.
  pub fn placement(&self) -> Placement {
    self.placement
  }

  /// Frames advanced since creation.
  pub fn frames(&self) -> u64 {
    self.frames
  }

  pub fn metrics(&self) -> &FractalMetrics {
    &self.metrics
  }
}

#[cfg(test)]
#[path = "fractal_test.rs"]
mod fractal_test;
