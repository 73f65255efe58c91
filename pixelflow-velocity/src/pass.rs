//! Per-frame orchestration of the velocity pipeline.

use pixelflow_graph::{
    CameraInfo, FilterMode, FrameGraph, MaterialHandle, SceneRenderer, TextureDesc, TextureFormat,
    TextureHandle, TexturePool, WrapMode,
};

use crate::camera::{CameraTracker, FrameKinematics};
use crate::double_buffer::DoubleBufferStore;
use crate::passes;
use crate::settings::{SimulationSettings, VelocityPassSettings};

/// Format shared by the persistent and transient velocity buffers.
pub const VELOCITY_FORMAT: TextureFormat = TextureFormat::Rgba16Float;

/// Records the velocity pipeline into a frame graph once per rendered
/// frame, in strict order: compute kinematics, acquire/resize the
/// double-buffered slots, create the cleared transient texture, then
/// emitters (conditional), simulation (always), preview (conditional).
///
/// All cross-frame state lives here as plain owned fields (the camera
/// tracker's last position and the store's alternating designation),
/// each mutated exactly once per frame.
pub struct VelocityRenderPass<T> {
    emitter_material: MaterialHandle,
    blit_material: MaterialHandle,
    tracker: CameraTracker,
    buffers: DoubleBufferStore<T>,
}

impl<T> VelocityRenderPass<T> {
    /// `emitter_material` overrides rendering-layer-mask batches;
    /// `blit_material` provides the simulation (pass 0) and preview
    /// (pass 1) fullscreen draws.
    pub fn new(emitter_material: MaterialHandle, blit_material: MaterialHandle) -> Self {
        Self {
            emitter_material,
            blit_material,
            tracker: CameraTracker::new(),
            buffers: DoubleBufferStore::new(),
        }
    }

    /// Record one frame of the pipeline. `scene` holds the pre-culled
    /// visible renderers; `frame_color` is the camera's display output,
    /// only touched when `settings.preview` is set.
    pub fn record<G, P>(
        &mut self,
        graph: &mut G,
        pool: &mut P,
        camera: &CameraInfo,
        scene: &[SceneRenderer],
        frame_color: TextureHandle,
        settings: &VelocityPassSettings,
        simulation: &SimulationSettings,
    ) where
        G: FrameGraph<Texture = T>,
        P: TexturePool<Texture = T>,
    {
        let camera_delta = self.tracker.track(camera);
        let kinematics = FrameKinematics::compute(camera, settings, camera_delta);
        log::debug!(
            "velocity frame: {}x{}, camera delta ({}, {})",
            kinematics.texture_width,
            kinematics.texture_height,
            camera_delta.x,
            camera_delta.y,
        );

        let desc = TextureDesc {
            width: kinematics.texture_width,
            height: kinematics.texture_height,
            format: VELOCITY_FORMAT,
            filter: FilterMode::Bilinear,
            wrap: WrapMode::Clamp,
            label: "velocity target",
        };
        let (current, previous) = self.buffers.acquire(pool, &desc);
        let current = graph.import(current);
        let previous = graph.import(previous);

        let transient = graph.create_transient(&TextureDesc {
            label: "transient velocity",
            ..desc
        });

        passes::emitter::record(
            graph,
            transient,
            scene,
            settings,
            camera,
            camera_delta,
            self.emitter_material,
        );
        passes::simulate::record(
            graph,
            current,
            previous,
            transient,
            &kinematics,
            simulation,
            self.blit_material,
        );
        if settings.preview {
            passes::preview::record(graph, current, frame_color, camera, self.blit_material);
        }
    }

    /// Release the persistent buffers and forget the tracked camera
    /// position. The pass is reusable afterwards, starting cold.
    pub fn dispose<P>(&mut self, pool: &mut P)
    where
        P: TexturePool<Texture = T>,
    {
        self.buffers.release(pool);
        self.tracker.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader_ids;
    use glam::{Mat4, Vec2, Vec4};
    use pixelflow_graph::{
        ColorLoad, Content, LinearFrames, LinearPool, LinearTexture, MeshHandle, PassContext,
    };

    const EMITTER_MATERIAL: MaterialHandle = MaterialHandle(100);
    const BLIT_MATERIAL: MaterialHandle = MaterialHandle(101);

    struct Rig {
        pass: VelocityRenderPass<LinearTexture>,
        pool: LinearPool,
        frames: LinearFrames,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                pass: VelocityRenderPass::new(EMITTER_MATERIAL, BLIT_MATERIAL),
                pool: LinearPool::new(),
                frames: LinearFrames::new(),
            }
        }

        fn run_frame(
            &mut self,
            camera: &CameraInfo,
            scene: &[SceneRenderer],
            settings: &VelocityPassSettings,
        ) -> FrameResult {
            let mut graph = self.frames.begin();
            // The frame color target is registered by the host before
            // any subsystem records; model that with a transient.
            let frame_color = graph.create_transient(&TextureDesc {
                width: camera.pixel_width,
                height: camera.pixel_height,
                format: TextureFormat::Rgba8Unorm,
                filter: FilterMode::Nearest,
                wrap: WrapMode::Clamp,
                label: "frame color",
            });
            self.pass.record(
                &mut graph,
                &mut self.pool,
                camera,
                scene,
                frame_color,
                settings,
                &SimulationSettings::default(),
            );
            FrameResult {
                passes: graph.passes.clone(),
                published: graph.published.clone(),
                frame_color,
            }
        }
    }

    struct FrameResult {
        passes: Vec<pixelflow_graph::linear::PassRecord>,
        published: Vec<(pixelflow_graph::GlobalSlot, Content)>,
        frame_color: TextureHandle,
    }

    impl FrameResult {
        fn pass(&self, name: &str) -> &pixelflow_graph::linear::PassRecord {
            self.passes
                .iter()
                .find(|pass| pass.name == name)
                .unwrap_or_else(|| panic!("no pass named {name:?}"))
        }

        fn has_pass(&self, name: &str) -> bool {
            self.passes.iter().any(|pass| pass.name == name)
        }
    }

    fn camera_at(x: f32, y: f32) -> CameraInfo {
        let mut view = Mat4::IDENTITY;
        view.w_axis = Vec4::new(x, y, 0.0, 1.0);
        CameraInfo {
            view,
            projection: Mat4::IDENTITY,
            pixel_width: 640,
            pixel_height: 360,
            orthographic_size: 5.0,
            aspect: 640.0 / 360.0,
            is_preview: false,
            is_scene_inspector: false,
        }
    }

    fn renderer(layer: u32, rendering_layers: u32) -> SceneRenderer {
        SceneRenderer {
            mesh: MeshHandle(1),
            material: MaterialHandle(2),
            transform: Mat4::IDENTITY,
            layer,
            rendering_layers,
        }
    }

    fn emitting_settings() -> VelocityPassSettings {
        VelocityPassSettings {
            layer_mask: 0b10,
            rendering_layer_mask: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_simulation_runs_every_frame_even_without_emitters() {
        let mut rig = Rig::new();
        let result = rig.run_frame(&camera_at(0.0, 0.0), &[], &VelocityPassSettings::default());
        assert!(!result.has_pass("velocity emitters"));
        assert!(result.has_pass("velocity simulation"));
    }

    #[test]
    fn test_previous_slot_holds_last_frames_committed_current() {
        let mut rig = Rig::new();
        let scene = [renderer(1, 0)];
        let settings = emitting_settings();

        let first = rig.run_frame(&camera_at(0.0, 0.0), &scene, &settings);
        let committed = first.pass("velocity simulation").committed;

        let second = rig.run_frame(&camera_at(1.0, 0.0), &scene, &settings);
        let reads = &second.pass("velocity simulation").reads;
        // reads[0] is the previous persistent slot.
        assert_eq!(Some(reads[0].1), committed);
    }

    #[test]
    fn test_handoff_holds_over_many_frames() {
        let mut rig = Rig::new();
        let settings = VelocityPassSettings::default();
        let mut last_committed = None;
        for frame in 0..6 {
            let result = rig.run_frame(&camera_at(frame as f32, 0.0), &[], &settings);
            let simulation = result.pass("velocity simulation");
            if let Some(committed) = last_committed {
                assert_eq!(simulation.reads[0].1, committed, "frame {frame}");
            }
            last_committed = simulation.committed;
        }
    }

    #[test]
    fn test_first_frame_previous_slot_is_cleared() {
        let mut rig = Rig::new();
        let result = rig.run_frame(&camera_at(7.0, 7.0), &[], &VelocityPassSettings::default());
        assert_eq!(result.pass("velocity simulation").reads[0].1, Content::Cleared);
    }

    #[test]
    fn test_cold_start_delta_is_zero_regardless_of_position() {
        let mut rig = Rig::new();
        let result = rig.run_frame(&camera_at(321.0, -99.0), &[], &VelocityPassSettings::default());
        let globals = &result.pass("velocity simulation").globals_vec4;
        assert!(globals.contains(&(shader_ids::CAMERA_POSITION_DELTA, Vec4::ZERO)));
    }

    #[test]
    fn test_camera_delta_is_halved_projected_displacement() {
        let mut rig = Rig::new();
        rig.run_frame(&camera_at(0.0, 0.0), &[], &VelocityPassSettings::default());
        let result = rig.run_frame(&camera_at(10.0, 0.0), &[], &VelocityPassSettings::default());
        let globals = &result.pass("velocity simulation").globals_vec4;
        assert!(globals.contains(&(
            shader_ids::CAMERA_POSITION_DELTA,
            Vec4::new(5.0, 0.0, 0.0, 0.0)
        )));
    }

    #[test]
    fn test_emitter_and_simulation_share_one_delta_value() {
        let mut rig = Rig::new();
        let scene = [renderer(1, 0)];
        let settings = emitting_settings();
        rig.run_frame(&camera_at(0.0, 0.0), &scene, &settings);
        let result = rig.run_frame(&camera_at(3.0, 4.0), &scene, &settings);

        let emitter_delta = result
            .pass("velocity emitters")
            .globals_vec4
            .iter()
            .find(|(name, _)| *name == shader_ids::POSITION_DELTA)
            .map(|(_, value)| *value);
        let simulation_delta = result
            .pass("velocity simulation")
            .globals_vec4
            .iter()
            .find(|(name, _)| *name == shader_ids::CAMERA_POSITION_DELTA)
            .map(|(_, value)| *value);
        assert_eq!(emitter_delta, simulation_delta);
        assert_eq!(emitter_delta, Some(Vec4::new(1.5, 2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_inactive_masks_leave_transient_cleared_for_simulation() {
        let mut rig = Rig::new();
        let scene = [renderer(1, 0b1)];
        let result = rig.run_frame(&camera_at(0.0, 0.0), &scene, &VelocityPassSettings::default());
        assert!(!result.has_pass("velocity emitters"));
        // reads[1] is the transient emitter texture.
        assert_eq!(result.pass("velocity simulation").reads[1].1, Content::Cleared);
    }

    #[test]
    fn test_inspection_cameras_suppress_emitters_even_with_masks() {
        for inspector in [false, true] {
            let mut rig = Rig::new();
            let mut camera = camera_at(0.0, 0.0);
            camera.is_preview = !inspector;
            camera.is_scene_inspector = inspector;
            let scene = [renderer(1, 0b1)];
            let settings = VelocityPassSettings {
                layer_mask: 0b10,
                rendering_layer_mask: 0b1,
                ..Default::default()
            };
            let result = rig.run_frame(&camera, &scene, &settings);
            assert!(!result.has_pass("velocity emitters"));
            assert!(result.has_pass("velocity simulation"));
        }
    }

    #[test]
    fn test_layer_mask_batch_keeps_renderer_materials() {
        let mut rig = Rig::new();
        let scene = [renderer(1, 0)];
        let result = rig.run_frame(&camera_at(0.0, 0.0), &scene, &emitting_settings());
        let draws = &result.pass("velocity emitters").draws;
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].material, MaterialHandle(2));
    }

    #[test]
    fn test_rendering_layer_mask_batch_uses_override_material() {
        let mut rig = Rig::new();
        let scene = [renderer(0, 0b100)];
        let settings = VelocityPassSettings {
            rendering_layer_mask: 0b100,
            ..Default::default()
        };
        let result = rig.run_frame(&camera_at(0.0, 0.0), &scene, &settings);
        let draws = &result.pass("velocity emitters").draws;
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].material, EMITTER_MATERIAL);
    }

    #[test]
    fn test_renderer_matching_both_masks_is_drawn_by_both_batches() {
        let mut rig = Rig::new();
        let scene = [renderer(1, 0b1)];
        let settings = VelocityPassSettings {
            layer_mask: 0b10,
            rendering_layer_mask: 0b1,
            ..Default::default()
        };
        let result = rig.run_frame(&camera_at(0.0, 0.0), &scene, &settings);
        let draws = &result.pass("velocity emitters").draws;
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].material, MaterialHandle(2));
        assert_eq!(draws[1].material, EMITTER_MATERIAL);
    }

    #[test]
    fn test_simulation_publishes_its_committed_result() {
        let mut rig = Rig::new();
        let result = rig.run_frame(&camera_at(0.0, 0.0), &[], &VelocityPassSettings::default());
        let committed = result.pass("velocity simulation").committed;
        let published = result
            .published
            .iter()
            .find(|(slot, _)| *slot == shader_ids::VELOCITY_TEXTURE)
            .map(|(_, content)| *content);
        assert_eq!(published, committed);
    }

    #[test]
    fn test_emitter_pass_publishes_the_transient_texture() {
        let mut rig = Rig::new();
        let scene = [renderer(1, 0)];
        let result = rig.run_frame(&camera_at(0.0, 0.0), &scene, &emitting_settings());
        assert!(result
            .published
            .iter()
            .any(|(slot, _)| *slot == shader_ids::TEMPORARY_VELOCITY_TEXTURE));
    }

    #[test]
    fn test_pass_order_is_emitters_then_simulation_then_preview() {
        let mut rig = Rig::new();
        let scene = [renderer(1, 0)];
        let settings = VelocityPassSettings {
            preview: true,
            ..emitting_settings()
        };
        let result = rig.run_frame(&camera_at(0.0, 0.0), &scene, &settings);
        let names: Vec<_> = result.passes.iter().map(|pass| pass.name).collect();
        assert_eq!(
            names,
            vec![
                "velocity emitters",
                "velocity simulation",
                "velocity preview blit",
            ]
        );
    }

    #[test]
    fn test_preview_runs_at_native_resolution_and_is_never_culled() {
        let mut rig = Rig::new();
        let settings = VelocityPassSettings {
            preview: true,
            texture_scale: 0.25,
            ..Default::default()
        };
        let result = rig.run_frame(&camera_at(0.0, 0.0), &[], &settings);

        let simulation = result.pass("velocity simulation");
        assert_eq!(simulation.viewport, Some((160, 90)));

        let preview = result.pass("velocity preview blit");
        assert_eq!(preview.viewport, Some((640, 360)));
        assert!(!preview.allow_culling);
        assert_eq!(preview.color_target, Some(result.frame_color));
        assert_eq!(preview.fullscreen_draws, vec![(BLIT_MATERIAL, 1)]);
    }

    #[test]
    fn test_preview_preserves_frame_color_while_velocity_targets_clear() {
        let mut rig = Rig::new();
        let scene = [renderer(1, 0)];
        let settings = VelocityPassSettings {
            preview: true,
            ..emitting_settings()
        };
        let result = rig.run_frame(&camera_at(0.0, 0.0), &scene, &settings);

        // The velocity targets are fully rewritten; the frame color the
        // preview draws over must keep the scene underneath.
        assert_eq!(result.pass("velocity emitters").color_load, ColorLoad::Clear);
        assert_eq!(result.pass("velocity simulation").color_load, ColorLoad::Clear);
        assert_eq!(
            result.pass("velocity preview blit").color_load,
            ColorLoad::Preserve
        );
    }

    #[test]
    fn test_preview_disabled_records_no_blit() {
        let mut rig = Rig::new();
        let result = rig.run_frame(&camera_at(0.0, 0.0), &[], &VelocityPassSettings::default());
        assert!(!result.has_pass("velocity preview blit"));
    }

    #[test]
    fn test_scale_change_reallocates_each_slot_exactly_once() {
        let mut rig = Rig::new();
        let settings = VelocityPassSettings::default();
        rig.run_frame(&camera_at(0.0, 0.0), &[], &settings);
        rig.run_frame(&camera_at(0.0, 0.0), &[], &settings);
        assert_eq!(rig.pool.allocations, 2);

        let rescaled = VelocityPassSettings {
            texture_scale: 0.25,
            ..settings
        };
        let result = rig.run_frame(&camera_at(0.0, 0.0), &[], &rescaled);
        assert_eq!(rig.pool.allocations, 4);
        // Fresh allocations on both sides: previous is cleared, and the
        // simulation still committed into the current slot.
        let simulation = result.pass("velocity simulation");
        assert_eq!(simulation.reads[0].1, Content::Cleared);
        assert!(simulation.committed.is_some());
    }

    #[test]
    fn test_degenerate_viewport_clamps_to_one_by_one() {
        let mut rig = Rig::new();
        let mut camera = camera_at(0.0, 0.0);
        camera.pixel_width = 0;
        camera.pixel_height = 0;
        let result = rig.run_frame(&camera, &[], &VelocityPassSettings::default());
        assert_eq!(result.pass("velocity simulation").viewport, Some((1, 1)));
    }

    #[test]
    fn test_identical_runs_record_identical_frames() {
        let run = || {
            let mut rig = Rig::new();
            let scene = [renderer(1, 0b1)];
            let settings = VelocityPassSettings {
                layer_mask: 0b10,
                rendering_layer_mask: 0b1,
                preview: true,
                ..Default::default()
            };
            let mut frames = Vec::new();
            for position in [0.0_f32, 2.5, -1.0] {
                frames.push(rig.run_frame(&camera_at(position, 0.0), &scene, &settings).passes);
            }
            frames
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_dispose_releases_buffers_and_resets_tracking() {
        let mut rig = Rig::new();
        rig.run_frame(&camera_at(0.0, 0.0), &[], &VelocityPassSettings::default());
        rig.pass.dispose(&mut rig.pool);
        assert_eq!(rig.pool.released, 2);

        // Reused after dispose: cold start again, delta zero.
        let result = rig.run_frame(&camera_at(10.0, 0.0), &[], &VelocityPassSettings::default());
        let globals = &result.pass("velocity simulation").globals_vec4;
        assert!(globals.contains(&(shader_ids::CAMERA_POSITION_DELTA, Vec4::ZERO)));
    }

    // Exercise the PassContext trait object path the way a backend
    // would drive it, to keep the trait object-safe.
    #[test]
    fn test_pass_context_is_object_safe() {
        fn record(ctx: &mut dyn PassContext) {
            ctx.set_viewport(4, 4);
            ctx.draw_fullscreen(BLIT_MATERIAL, 0);
        }
        let mut frames = LinearFrames::new();
        let mut graph = frames.begin();
        let target = graph.create_transient(&TextureDesc {
            width: 4,
            height: 4,
            format: TextureFormat::Rgba16Float,
            filter: FilterMode::Bilinear,
            wrap: WrapMode::Clamp,
            label: "t",
        });
        graph.add_pass(
            pixelflow_graph::PassDesc {
                name: "ctx",
                reads: Vec::new(),
                color_target: Some(target),
                color_load: pixelflow_graph::ColorLoad::Clear,
                publish_after: Vec::new(),
                allow_culling: true,
            },
            &mut |ctx| record(ctx),
        );
        assert_eq!(graph.pass("ctx").viewport, Some((4, 4)));
    }
}
