//! GPU-side uniform layouts for the velocity passes.

use bytemuck::{Pod, Zeroable};

/// Pass globals, bind group 0 binding 0. Field order matches the
/// `Globals` struct in the WGSL shaders.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct VelocityGlobals {
    pub camera_position_delta: [f32; 4],
    pub position_delta: [f32; 4],
    pub simulation_params: [f32; 4],
    pub pixel_screen_params: [f32; 4],
}

impl Default for VelocityGlobals {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Per-draw data, bind group 2 binding 0.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PerObjectUniforms {
    pub model: [[f32; 4]; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sizes_match_shader_expectations() {
        assert_eq!(std::mem::size_of::<VelocityGlobals>(), 64);
        assert_eq!(std::mem::size_of::<PerObjectUniforms>(), 64);
    }
}
