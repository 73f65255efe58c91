//! Simulation sub-pass: fold last frame's field, this frame's emitter
//! contributions and the camera displacement into the current slot.

use glam::Vec4;

use pixelflow_graph::{ColorLoad, FrameGraph, MaterialHandle, PassDesc, TextureHandle};

use crate::camera::FrameKinematics;
use crate::settings::SimulationSettings;
use crate::shader_ids;

/// Record the simulation pass. Runs every frame whether or not any
/// emitter drew, so decay and advection continue on a quiet field. The
/// result is published as the process-wide velocity texture once the
/// pass completes.
pub fn record<G: FrameGraph>(
    graph: &mut G,
    current: TextureHandle,
    previous: TextureHandle,
    transient: TextureHandle,
    kinematics: &FrameKinematics,
    simulation: &SimulationSettings,
    blit_material: MaterialHandle,
) {
    let desc = PassDesc {
        name: "velocity simulation",
        reads: vec![previous, transient],
        color_target: Some(current),
        color_load: ColorLoad::Clear,
        publish_after: vec![(current, shader_ids::VELOCITY_TEXTURE)],
        allow_culling: true,
    };

    let delta = kinematics.camera_delta;
    let pixel_screen_params = kinematics.pixel_screen_params;
    let params = simulation.value;
    let (width, height) = (kinematics.texture_width, kinematics.texture_height);
    graph.add_pass(desc, &mut |ctx| {
        ctx.set_global_vec4(
            shader_ids::CAMERA_POSITION_DELTA,
            Vec4::new(delta.x, delta.y, 0.0, 0.0),
        );
        ctx.set_global_vec4(shader_ids::VELOCITY_SIMULATION_PARAMS, params);
        ctx.set_global_vec4(shader_ids::PIXEL_SCREEN_PARAMS, pixel_screen_params);
        ctx.set_global_texture(shader_ids::PREVIOUS_VELOCITY_TEXTURE, previous);
        ctx.set_global_texture(shader_ids::TEMPORARY_VELOCITY_TEXTURE, transient);
        ctx.set_viewport(width, height);
        ctx.draw_fullscreen(blit_material, 0);
    });
}
