//! Scene geometry records handed to mask-filtered draw batches.

use glam::Mat4;

use crate::handle::{MaterialHandle, MeshHandle};

/// One visible renderer, pre-culled by the host for the current camera.
#[derive(Clone, Copy, Debug)]
pub struct SceneRenderer {
    pub mesh: MeshHandle,
    /// The renderer's own material, used when a coarse layer mask
    /// selects it.
    pub material: MaterialHandle,
    pub transform: Mat4,
    /// Coarse scene layer index (0..32).
    pub layer: u32,
    /// Fine-grained rendering-layer bitmask carried per object.
    pub rendering_layers: u32,
}
