//! Plain-data configuration supplied by the host each frame.

use glam::Vec4;

/// Velocity pass tunables.
#[derive(Clone, Copy, Debug)]
pub struct VelocityPassSettings {
    /// Resolution multiplier for the velocity buffers relative to the
    /// camera's pixel size.
    pub texture_scale: f32,
    /// World-unit to texel conversion used by the simulation shader.
    pub pixels_per_unit: f32,
    /// Coarse scene-layer mask; bit N selects renderers on layer N,
    /// drawn with their own materials.
    pub layer_mask: u32,
    /// Fine per-object rendering-layer mask; matching renderers are
    /// drawn with the emitter override material.
    pub rendering_layer_mask: u32,
    /// Overlay the velocity buffer on the frame output (debug aid).
    pub preview: bool,
}

impl Default for VelocityPassSettings {
    fn default() -> Self {
        Self {
            texture_scale: 0.5,
            pixels_per_unit: 16.0,
            layer_mask: 0,
            rendering_layer_mask: 0,
            preview: false,
        }
    }
}

/// Opaque decay/advection parameter vector passed straight through to
/// the simulation shader. Its internal meaning is the shader's
/// business, not this crate's.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimulationSettings {
    pub value: Vec4,
}
