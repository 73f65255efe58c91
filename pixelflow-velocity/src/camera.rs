//! Camera motion tracking and per-frame kinematics.

use glam::{Mat4, Vec2, Vec4};

use pixelflow_graph::CameraInfo;

use crate::settings::VelocityPassSettings;

/// Tracks the camera's world position across frames and derives the
/// screen-space displacement since the previous frame.
///
/// The last-seen position is the only cross-frame state here, and it is
/// mutated exactly once per [`track`](Self::track) call, after the
/// delta for that frame has been computed from the old value.
#[derive(Default, Debug)]
pub struct CameraTracker {
    previous_position: Option<Vec2>,
}

impl CameraTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Screen-space camera displacement since the last call. The raw
    /// clip-space delta over-counts by 2x against the [0,1] texture
    /// convention, so the result is halved here, once, and the same
    /// value feeds both the emitter and simulation passes.
    ///
    /// The first call of the tracker's lifetime reports zero regardless
    /// of where the camera starts.
    pub fn track(&mut self, camera: &CameraInfo) -> Vec2 {
        let position = camera_position(&camera.view);
        let world_delta = match self.previous_position {
            Some(previous) => position - previous,
            None => Vec2::ZERO,
        };
        let clip = camera.projection
            * camera.view
            * Vec4::new(world_delta.x, world_delta.y, 0.0, 0.0);
        self.previous_position = Some(position);
        Vec2::new(clip.x, clip.y) / 2.0
    }

    /// Forget the tracked position; the next frame reports zero delta.
    pub fn reset(&mut self) {
        self.previous_position = None;
    }
}

/// Camera world position as carried by the view matrix translation
/// column.
fn camera_position(view: &Mat4) -> Vec2 {
    Vec2::new(view.w_axis.x, view.w_axis.y)
}

/// Per-frame values the simulation shader needs, derived from the
/// camera and the pass settings. Never stored across frames.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct FrameKinematics {
    /// Halved screen-space camera displacement for this frame.
    pub camera_delta: Vec2,
    /// (screen width, screen height, pixels-per-unit, 1/pixels-per-unit)
    /// where the screen extent is measured in art pixels.
    pub pixel_screen_params: Vec4,
    /// Velocity buffer extent: `floor(camera pixels * texture_scale)`,
    /// never below 1x1.
    pub texture_width: u32,
    pub texture_height: u32,
}

impl FrameKinematics {
    pub fn compute(
        camera: &CameraInfo,
        settings: &VelocityPassSettings,
        camera_delta: Vec2,
    ) -> Self {
        let screen_height = 2.0 * camera.orthographic_size * settings.pixels_per_unit;
        let screen_width = screen_height * camera.aspect;
        Self {
            camera_delta,
            pixel_screen_params: Vec4::new(
                screen_width,
                screen_height,
                settings.pixels_per_unit,
                1.0 / settings.pixels_per_unit,
            ),
            texture_width: scaled_extent(camera.pixel_width, settings.texture_scale),
            texture_height: scaled_extent(camera.pixel_height, settings.texture_scale),
        }
    }
}

/// Degenerate viewports and scales are normalized to a 1x1 minimum
/// before they reach the allocator; they are not errors.
fn scaled_extent(pixels: u32, scale: f32) -> u32 {
    let scaled = (pixels as f32 * scale).floor();
    if scaled >= 1.0 {
        scaled as u32
    } else {
        1
    }
}
