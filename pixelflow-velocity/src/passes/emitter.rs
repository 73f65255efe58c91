//! Emitter sub-pass: rasterize mask-selected geometry's velocity
//! contribution into the transient texture.

use glam::{Vec2, Vec4};

use pixelflow_graph::{
    CameraInfo, ColorLoad, FrameGraph, MaterialHandle, PassDesc, SceneRenderer, TextureHandle,
};

use crate::settings::VelocityPassSettings;
use crate::shader_ids;

/// Record the emitter pass, or nothing at all when no mask is active or
/// the camera is an editor inspection camera. The transient texture
/// then simply keeps its cleared state.
///
/// The two masks select two independent batches with deliberately
/// different material behavior: coarse layer-mask renderers draw with
/// their own materials (whole-object opt-in), rendering-layer-mask
/// renderers draw with the override material (per-material opt-in). A
/// renderer matching both masks is drawn by both batches.
pub fn record<G: FrameGraph>(
    graph: &mut G,
    transient: TextureHandle,
    scene: &[SceneRenderer],
    settings: &VelocityPassSettings,
    camera: &CameraInfo,
    camera_delta: Vec2,
    emitter_material: MaterialHandle,
) {
    if camera.is_preview || camera.is_scene_inspector {
        log::debug!("velocity emitters skipped: inspection camera");
        return;
    }

    let has_layer_mask = settings.layer_mask != 0;
    let has_rendering_layer_mask = settings.rendering_layer_mask != 0;
    if !has_layer_mask && !has_rendering_layer_mask {
        log::debug!("velocity emitters skipped: no active mask");
        return;
    }

    let desc = PassDesc {
        name: "velocity emitters",
        reads: Vec::new(),
        color_target: Some(transient),
        color_load: ColorLoad::Clear,
        publish_after: vec![(transient, shader_ids::TEMPORARY_VELOCITY_TEXTURE)],
        allow_culling: true,
    };

    let layer_mask = settings.layer_mask;
    let rendering_layer_mask = settings.rendering_layer_mask;
    graph.add_pass(desc, &mut |ctx| {
        ctx.set_global_vec4(
            shader_ids::POSITION_DELTA,
            Vec4::new(camera_delta.x, camera_delta.y, 0.0, 0.0),
        );

        if has_layer_mask {
            for renderer in scene {
                if layer_selected(layer_mask, renderer.layer) {
                    ctx.draw(renderer.mesh, renderer.transform, renderer.material, 0);
                }
            }
        }

        if has_rendering_layer_mask {
            for renderer in scene {
                if rendering_layer_mask & renderer.rendering_layers != 0 {
                    ctx.draw(renderer.mesh, renderer.transform, emitter_material, 0);
                }
            }
        }
    });
}

fn layer_selected(mask: u32, layer: u32) -> bool {
    1u32.checked_shl(layer).is_some_and(|bit| mask & bit != 0)
}
