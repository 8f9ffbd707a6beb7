//! wgpu implementation of the instance publisher backend.
//!
//! ```text
//!  publish()                         render pass
//!  ├─ create_instance_buffer ──► LevelBuffer { storage buffer, bind group }
//!  ├─ upload ──────────────────► queue.write_buffer
//!  └─ draw_instanced ──────────► DrawCommand ──encode()──► set_pipeline
//!                                                          set_bind_group
//!                                                          draw_indexed
//! ```

use std::sync::Arc;

use fractal_core::{DrawBounds, FractalError, InstanceBackend, InstanceMatrix, Result};

use crate::binding::{BindingCache, MATRICES_GROUP};

/// Shared mesh drawn once per instance.
#[derive(Clone, Debug)]
pub struct GpuMesh {
  pub vertex_buffer: Arc<wgpu::Buffer>,
  pub index_buffer: Arc<wgpu::Buffer>,
  pub index_format: wgpu::IndexFormat,
  pub index_count: u32,
}

/// Shared material: a pipeline built against [`BindingCache::layout`] at
/// [`MATRICES_GROUP`], plus its own bind group at group 0.
#[derive(Clone, Debug)]
pub struct GpuMaterial {
  pub pipeline: Arc<wgpu::RenderPipeline>,
  pub bind_group: Option<Arc<wgpu::BindGroup>>,
}

/// GPU storage for one level's matrices.
#[derive(Debug)]
pub struct LevelBuffer {
  pub level: usize,
  pub len: usize,
  buffer: wgpu::Buffer,
  bind_group: Arc<wgpu::BindGroup>,
}

impl LevelBuffer {
  pub fn buffer(&self) -> &wgpu::Buffer {
    &self.buffer
  }
}

/// One recorded instanced draw.
#[derive(Debug)]
struct DrawCommand {
  mesh: GpuMesh,
  material: GpuMaterial,
  matrices: Arc<wgpu::BindGroup>,
  instance_count: u32,
  bounds: DrawBounds,
}

/// Size in bytes of a buffer holding `len` matrices.
#[inline]
pub fn buffer_size(len: usize) -> u64 {
  (len * InstanceMatrix::STRIDE) as u64
}

/// Check a level buffer against device limits before creating it.
pub fn check_buffer_size(level: usize, len: usize, limits: &wgpu::Limits) -> Result<u64> {
  let size = buffer_size(len);
  if size == 0 {
    return Err(FractalError::Gpu {
      level,
      reason: "empty level".to_string(),
    });
  }
  let max = limits
    .max_buffer_size
    .min(limits.max_storage_buffer_binding_size as u64);
  if size > max {
    return Err(FractalError::Gpu {
      level,
      reason: format!("{} bytes exceed the device limit of {} bytes", size, max),
    });
  }
  Ok(size)
}

/// [`InstanceBackend`] on a wgpu device.
pub struct WgpuBackend {
  device: Arc<wgpu::Device>,
  queue: Arc<wgpu::Queue>,
  bindings: Arc<BindingCache>,
  commands: Vec<DrawCommand>,
}

impl WgpuBackend {
  pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, bindings: Arc<BindingCache>) -> Self {
    Self {
      device,
      queue,
      bindings,
      commands: Vec::new(),
    }
  }

  pub fn bindings(&self) -> &Arc<BindingCache> {
    &self.bindings
  }

  /// Draws recorded since the last [`WgpuBackend::encode`].
  pub fn pending_draws(&self) -> usize {
    self.commands.len()
  }

  /// Encode every recorded draw into `pass` and clear the list.
  pub fn encode(&mut self, pass: &mut wgpu::RenderPass<'_>) {
    for command in self.commands.drain(..) {
      pass.set_pipeline(&command.material.pipeline);
      if let Some(group) = &command.material.bind_group {
        pass.set_bind_group(0, group.as_ref(), &[]);
      }
      pass.set_bind_group(MATRICES_GROUP, command.matrices.as_ref(), &[]);
      pass.set_vertex_buffer(0, command.mesh.vertex_buffer.slice(..));
      pass.set_index_buffer(command.mesh.index_buffer.slice(..), command.mesh.index_format);
      pass.draw_indexed(0..command.mesh.index_count, 0, 0..command.instance_count);
    }
  }

  /// Bounds of every recorded draw, in record order.
  pub fn pending_bounds(&self) -> impl Iterator<Item = &DrawBounds> {
    self.commands.iter().map(|command| &command.bounds)
  }
}

impl InstanceBackend for WgpuBackend {
  type Buffer = LevelBuffer;
  type Mesh = GpuMesh;
  type Material = GpuMaterial;

  fn create_instance_buffer(&mut self, level: usize, len: usize) -> Result<LevelBuffer> {
    let size = check_buffer_size(level, len, &self.device.limits())?;

    self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    self.device.push_error_scope(wgpu::ErrorFilter::Validation);
    let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
      label: Some(&format!("fractal_level_{}", level)),
      size,
      usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
      mapped_at_creation: false,
    });
    let validation = pollster::block_on(self.device.pop_error_scope());
    let out_of_memory = pollster::block_on(self.device.pop_error_scope());

    if let Some(error) = validation.or(out_of_memory) {
      buffer.destroy();
      return Err(FractalError::Gpu {
        level,
        reason: error.to_string(),
      });
    }

    let bind_group = Arc::new(self.bindings.bind(&self.device, level, &buffer));
    tracing::debug!(level, len, bytes = size, "created instance buffer");

    Ok(LevelBuffer {
      level,
      len,
      buffer,
      bind_group,
    })
  }

  fn upload(&mut self, buffer: &mut LevelBuffer, matrices: &[InstanceMatrix]) {
    debug_assert_eq!(buffer.len, matrices.len());
    self
      .queue
      .write_buffer(&buffer.buffer, 0, bytemuck::cast_slice(matrices));
  }

  fn draw_instanced(
    &mut self,
    mesh: &GpuMesh,
    material: &GpuMaterial,
    buffer: &LevelBuffer,
    instance_count: usize,
    bounds: &DrawBounds,
  ) {
    self.commands.push(DrawCommand {
      mesh: mesh.clone(),
      material: material.clone(),
      matrices: buffer.bind_group.clone(),
      instance_count: instance_count as u32,
      bounds: *bounds,
    });
  }

  fn release(&mut self, buffer: LevelBuffer) {
    // Draws still referencing the bind group keep it alive until encoded.
    buffer.buffer.destroy();
  }
}

#[cfg(test)]
#[path = "backend_test.rs"]
mod backend_test;
