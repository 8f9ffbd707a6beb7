//! fractal_wgpu - wgpu bridge for fractal_core
//!
//! Implements [`fractal_core::InstanceBackend`] on top of wgpu. Each level's
//! matrices live in a read-only storage buffer bound through a shared
//! [`BindingCache`]; draws are recorded during `publish` and encoded into a
//! render pass by the owning renderer.
//!
//! # Example
//!
//! ```ignore
//! let bindings = Arc::new(BindingCache::new(&device));
//! let backend = WgpuBackend::new(device.clone(), queue.clone(), bindings.clone());
//! let mut publisher = InstancePublisher::new(backend);
//!
//! fractal.advance(dt, placement)?;
//! fractal.publish(&mut publisher, &mesh, &material)?;
//!
//! let mut pass = encoder.begin_render_pass(&desc);
//! publisher.backend_mut().encode(&mut pass);
//! ```

pub mod backend;
pub mod binding;

pub use backend::{GpuMaterial, GpuMesh, LevelBuffer, WgpuBackend};
pub use binding::{BindingCache, INSTANCE_WGSL, MATRICES_BINDING, MATRICES_GROUP};
