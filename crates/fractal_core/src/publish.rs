//! Instance buffer publisher - the boundary to the renderer.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │ Publication                                                             │
//! │                                                                         │
//! │   LevelStore (ready)        InstancePublisher<B>        InstanceBackend │
//! │   ┌───────────────┐         ┌──────────────────┐        ┌─────────────┐ │
//! │   │ level 0 mats  ├────────►│ buffer[0]        ├─draw──►│ mesh        │ │
//! │   │ level 1 mats  ├────────►│ buffer[1]        ├─draw──►│ material    │ │
//! │   │ ...           │ upload  │ ...              │        │ bounds      │ │
//! │   └───────────────┘         └──────────────────┘        └─────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The publisher owns one GPU-visible buffer per level, sized to the level's
//! node count, and issues one instanced draw per level. It only reads the
//! level store; node and matrix data are never written here.

use glam::Vec3;

use crate::constants::BOUNDS_SCALE;
use crate::error::{FractalError, Result};
use crate::level::LevelStore;
use crate::types::InstanceMatrix;

/// Axis-aligned draw bounds handed to the renderer for culling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawBounds {
  pub center: Vec3,
  /// Full edge lengths (not half extents).
  pub size: Vec3,
}

impl DrawBounds {
  pub fn new(center: Vec3, size: Vec3) -> Self {
    Self { center, size }
  }

  /// Bounds containing the whole structure for a root at `center` with
  /// uniform `scale`.
  pub fn for_root(center: Vec3, scale: f32) -> Self {
    Self {
      center,
      size: Vec3::splat(BOUNDS_SCALE * scale),
    }
  }

  pub fn half_extents(&self) -> Vec3 {
    self.size * 0.5
  }

  pub fn min(&self) -> Vec3 {
    self.center - self.half_extents()
  }

  pub fn max(&self) -> Vec3 {
    self.center + self.half_extents()
  }

  #[inline]
  pub fn contains_point(&self, point: Vec3) -> bool {
    let min = self.min();
    let max = self.max();
    point.cmpge(min).all() && point.cmple(max).all()
  }
}

/// Renderer-side operations needed to publish instance matrices.
///
/// Implementations own the GPU resources. `Mesh` and `Material` are the
/// shared assets supplied by the owning context.
///
/// # Example (wgpu)
///
/// ```ignore
/// impl InstanceBackend for WgpuBackend {
///     type Buffer = wgpu::Buffer;
///     type Mesh = GpuMesh;
///     type Material = GpuMaterial;
///     // ...
/// }
/// ```
pub trait InstanceBackend {
  /// GPU-visible instance buffer.
  type Buffer;
  /// Shared mesh handle.
  type Mesh: ?Sized;
  /// Shared material handle.
  type Material: ?Sized;

  /// Create a buffer holding `len` instance matrices for `level`.
  fn create_instance_buffer(&mut self, level: usize, len: usize) -> Result<Self::Buffer>;

  /// Copy `matrices` into `buffer`.
  fn upload(&mut self, buffer: &mut Self::Buffer, matrices: &[InstanceMatrix]);

  /// Issue one instanced draw of `mesh` with `material`, reading per-instance
  /// transforms from `buffer`.
  fn draw_instanced(
    &mut self,
    mesh: &Self::Mesh,
    material: &Self::Material,
    buffer: &Self::Buffer,
    instance_count: usize,
    bounds: &DrawBounds,
  );

  /// Free a buffer created by this backend.
  fn release(&mut self, buffer: Self::Buffer);
}

/// Per-level GPU buffers plus the backend that owns them.
pub struct InstancePublisher<B: InstanceBackend> {
  backend: B,
  buffers: Vec<(usize, B::Buffer)>,
}

impl<B: InstanceBackend> InstancePublisher<B> {
  pub fn new(backend: B) -> Self {
    Self {
      backend,
      buffers: Vec::new(),
    }
  }

  /// True when a buffer exists for every level of `store`, sized to match.
  pub fn matches(&self, store: &LevelStore) -> bool {
    self.buffers.len() == store.depth()
      && self
        .buffers
        .iter()
        .zip(store.levels())
        .all(|((len, _), level)| *len == level.len())
  }

  /// Create one buffer per level of `store`, replacing any previous set.
  ///
  /// All-or-nothing: if any level fails, the buffers created so far are
  /// released and the publisher is left empty.
  pub fn prepare(&mut self, store: &LevelStore) -> Result<()> {
    self.release();

    let mut created = Vec::with_capacity(store.depth());
    for (index, level) in store.levels().enumerate() {
      match self.backend.create_instance_buffer(index, level.len()) {
        Ok(buffer) => created.push((level.len(), buffer)),
        Err(err) => {
          for (_, buffer) in created {
            self.backend.release(buffer);
          }
          return Err(err);
        }
      }
    }

    self.buffers = created;
    Ok(())
  }

  /// Upload every level and issue one instanced draw per level.
  ///
  /// Buffers are (re)created first if the store layout changed since the
  /// last `prepare`.
  pub fn publish(
    &mut self,
    store: &LevelStore,
    bounds: &DrawBounds,
    mesh: &B::Mesh,
    material: &B::Material,
  ) -> Result<()> {
    if !self.matches(store) {
      self.prepare(store)?;
    }

    for ((_, buffer), level) in self.buffers.iter_mut().zip(store.levels()) {
      self.backend.upload(buffer, level.matrices());
      self
        .backend
        .draw_instanced(mesh, material, buffer, level.len(), bounds);
    }
    Ok(())
  }

  /// Release every buffer. Safe to call repeatedly.
  pub fn release(&mut self) {
    for (_, buffer) in self.buffers.drain(..) {
      self.backend.release(buffer);
    }
  }

  /// Number of live per-level buffers.
  pub fn buffer_count(&self) -> usize {
    self.buffers.len()
  }

  pub fn backend(&self) -> &B {
    &self.backend
  }

  pub fn backend_mut(&mut self) -> &mut B {
    &mut self.backend
  }
}

impl<B: InstanceBackend> Drop for InstancePublisher<B> {
  fn drop(&mut self) {
    self.release();
  }
}

// =============================================================================
// Headless backends
// =============================================================================

/// One recorded draw call.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedDraw {
  pub buffer_id: u64,
  pub instance_count: usize,
  pub bounds: DrawBounds,
}

/// Buffer held by [`RecordingBackend`]: a CPU copy of the uploaded matrices.
#[derive(Debug)]
pub struct RecordedBuffer {
  pub id: u64,
  pub level: usize,
  pub contents: Vec<InstanceMatrix>,
}

/// Headless backend that keeps uploads in memory and records draw calls.
///
/// Used by tests and the headless driver. `capacity_limit` simulates GPU
/// allocation failure for buffers larger than the limit.
#[derive(Debug, Default)]
pub struct RecordingBackend {
  next_id: u64,
  /// Largest buffer (in matrices) that can be created. `None` = unlimited.
  pub capacity_limit: Option<usize>,
  /// Ids of buffers currently alive.
  pub live_buffers: Vec<u64>,
  /// Draws issued since the last [`RecordingBackend::take_draws`].
  pub draws: Vec<RecordedDraw>,
  /// Total matrices uploaded.
  pub uploaded_matrices: u64,
}

impl RecordingBackend {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_capacity_limit(limit: usize) -> Self {
    Self {
      capacity_limit: Some(limit),
      ..Self::default()
    }
  }

  /// Take the recorded draws, leaving the list empty.
  pub fn take_draws(&mut self) -> Vec<RecordedDraw> {
    std::mem::take(&mut self.draws)
  }
}

impl InstanceBackend for RecordingBackend {
  type Buffer = RecordedBuffer;
  type Mesh = ();
  type Material = ();

  fn create_instance_buffer(&mut self, level: usize, len: usize) -> Result<Self::Buffer> {
    if self.capacity_limit.is_some_and(|limit| len > limit) {
      return Err(FractalError::Gpu {
        level,
        reason: format!("{} instances exceed the buffer limit", len),
      });
    }
    let id = self.next_id;
    self.next_id += 1;
    self.live_buffers.push(id);
    Ok(RecordedBuffer {
      id,
      level,
      contents: vec![InstanceMatrix::ZERO; len],
    })
  }

  fn upload(&mut self, buffer: &mut Self::Buffer, matrices: &[InstanceMatrix]) {
    buffer.contents.copy_from_slice(matrices);
    self.uploaded_matrices += matrices.len() as u64;
  }

  fn draw_instanced(
    &mut self,
    _mesh: &(),
    _material: &(),
    buffer: &Self::Buffer,
    instance_count: usize,
    bounds: &DrawBounds,
  ) {
    self.draws.push(RecordedDraw {
      buffer_id: buffer.id,
      instance_count,
      bounds: *bounds,
    });
  }

  fn release(&mut self, buffer: Self::Buffer) {
    self.live_buffers.retain(|id| *id != buffer.id);
  }
}

#[cfg(test)]
#[path = "publish_test.rs"]
mod publish_test;
