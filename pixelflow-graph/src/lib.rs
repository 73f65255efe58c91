//! Narrow render-graph interface for the pixelflow velocity pipeline.
//!
//! The host rendering framework owns pass scheduling, resource lifetimes
//! and GPU submission. This crate defines the small declarative surface
//! the velocity core records against: texture descriptors and handles,
//! pass declarations with explicit read/write sets, global-texture
//! publication, and draw submission. [`LinearGraph`] is a reference
//! executor that runs declared passes in declaration order and tracks
//! content stamps, so the core's ordering and double-buffer invariants
//! are testable without a GPU.

pub mod camera;
pub mod graph;
pub mod handle;
pub mod linear;
pub mod scene;

pub use camera::CameraInfo;
pub use graph::{
    ColorLoad, FilterMode, FrameGraph, PassContext, PassDesc, TextureDesc, TextureFormat,
    TexturePool, WrapMode,
};
pub use handle::{GlobalSlot, MaterialHandle, MeshHandle, TextureHandle};
pub use linear::{Content, LinearFrames, LinearGraph, LinearPool, LinearTexture};
pub use scene::SceneRenderer;
