//! Shared binding slot for per-level instance matrices.
//!
//! Resolved once per device and shared read-only (`Arc<BindingCache>`)
//! between every backend and material pipeline that reads the matrices.

use std::num::NonZeroU64;

use fractal_core::InstanceMatrix;

/// Bind group index the matrices are bound at.
pub const MATRICES_GROUP: u32 = 1;

/// Binding index inside [`MATRICES_GROUP`].
pub const MATRICES_BINDING: u32 = 0;

/// WGSL declarations for the matrices binding.
///
/// Matrices are read as a flat `f32` array (12 floats per instance, tightly
/// packed like [`InstanceMatrix`]). Materials prepend this to their vertex
/// shader and call `instance_matrix(instance_index)`.
pub const INSTANCE_WGSL: &str = r#"
@group(1) @binding(0) var<storage, read> matrices: array<f32>;

fn instance_matrix(index: u32) -> mat4x4<f32> {
  let base = index * 12u;
  return mat4x4<f32>(
    vec4<f32>(matrices[base + 0u], matrices[base + 1u], matrices[base + 2u], 0.0),
    vec4<f32>(matrices[base + 3u], matrices[base + 4u], matrices[base + 5u], 0.0),
    vec4<f32>(matrices[base + 6u], matrices[base + 7u], matrices[base + 8u], 0.0),
    vec4<f32>(matrices[base + 9u], matrices[base + 10u], matrices[base + 11u], 1.0),
  );
}
"#;

/// Layout entry for the matrices storage buffer.
pub fn matrices_layout_entry() -> wgpu::BindGroupLayoutEntry {
  wgpu::BindGroupLayoutEntry {
    binding: MATRICES_BINDING,
    visibility: wgpu::ShaderStages::VERTEX,
    ty: wgpu::BindingType::Buffer {
      ty: wgpu::BufferBindingType::Storage { read_only: true },
      has_dynamic_offset: false,
      min_binding_size: NonZeroU64::new(InstanceMatrix::STRIDE as u64),
    },
    count: None,
  }
}

/// Device-resolved bind group layout for the matrices binding.
#[derive(Debug)]
pub struct BindingCache {
  layout: wgpu::BindGroupLayout,
}

impl BindingCache {
  pub fn new(device: &wgpu::Device) -> Self {
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
      label: Some("fractal_matrices_layout"),
      entries: &[matrices_layout_entry()],
    });
    Self { layout }
  }

  /// Layout to place at [`MATRICES_GROUP`] when building material pipelines.
  pub fn layout(&self) -> &wgpu::BindGroupLayout {
    &self.layout
  }

  /// Bind `buffer` as the matrices of one level.
  pub fn bind(&self, device: &wgpu::Device, level: usize, buffer: &wgpu::Buffer) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
      label: Some(&format!("fractal_level_{}_matrices", level)),
      layout: &self.layout,
      entries: &[wgpu::BindGroupEntry {
        binding: MATRICES_BINDING,
        resource: buffer.as_entire_binding(),
      }],
    })
  }
}
