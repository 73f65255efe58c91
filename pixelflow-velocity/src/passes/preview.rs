//! Preview sub-pass: overlay the velocity field on the frame output
//! for inspection. Debug aid, never part of core correctness.

use pixelflow_graph::{CameraInfo, ColorLoad, FrameGraph, MaterialHandle, PassDesc, TextureHandle};

use crate::shader_ids;

/// Record the preview blit. Reads the freshly simulated slot, preserves
/// the frame color it draws over, runs at the camera's native pixel
/// resolution rather than the simulation resolution, and is marked
/// never-culled so it survives even when nothing consumes its output.
pub fn record<G: FrameGraph>(
    graph: &mut G,
    current: TextureHandle,
    frame_color: TextureHandle,
    camera: &CameraInfo,
    blit_material: MaterialHandle,
) {
    let desc = PassDesc {
        name: "velocity preview blit",
        reads: vec![current],
        color_target: Some(frame_color),
        color_load: ColorLoad::Preserve,
        publish_after: Vec::new(),
        allow_culling: false,
    };

    let (width, height) = (camera.pixel_width, camera.pixel_height);
    graph.add_pass(desc, &mut |ctx| {
        ctx.set_global_texture(shader_ids::VELOCITY_TEXTURE, current);
        ctx.set_viewport(width, height);
        ctx.draw_fullscreen(blit_material, 1);
    });
}
