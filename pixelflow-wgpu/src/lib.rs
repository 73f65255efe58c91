//! wgpu backend for the pixelflow velocity pipeline.
//!
//! Implements the `pixelflow-graph` interface on a real GPU: a texture
//! pool with clear-on-allocate persistent slots, a per-frame graph that
//! records declared passes onto a command encoder in declaration order,
//! and the render pipelines plus WGSL shaders for the emitter,
//! simulation and preview draws.

pub mod backend;
pub mod graph;
pub mod handle;
pub mod pipelines;
pub mod pool;
pub mod shaders;
pub mod uniforms;

pub use backend::{Material, MaterialPass, Mesh2D, Vertex2D, WgpuRenderer};
pub use graph::WgpuFrame;
pub use pool::{GpuTexture, WgpuTexturePool};
