//! Camera information provided by the host each frame.

use glam::Mat4;

/// Snapshot of the rendering camera. The velocity core never mutates
/// this; culling and matrix derivation are the host's business.
#[derive(Clone, Copy, Debug)]
pub struct CameraInfo {
    pub view: Mat4,
    pub projection: Mat4,
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Half the vertical extent of the orthographic view volume, in
    /// world units.
    pub orthographic_size: f32,
    pub aspect: f32,
    /// Editor asset-preview camera. Suppresses emitter rendering.
    pub is_preview: bool,
    /// Editor scene-inspection camera. Suppresses emitter rendering.
    pub is_scene_inspector: bool,
}
