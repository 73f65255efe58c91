//! Per-frame graph: records declared passes onto a command encoder and
//! replays them in declaration order.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{Mat4, Vec4};
use wgpu::util::DeviceExt;

use pixelflow_graph::{
    ColorLoad, FrameGraph, GlobalSlot, MaterialHandle, MeshHandle, PassContext, PassDesc,
    TextureHandle,
};
use pixelflow_velocity::shader_ids;

use crate::backend::{MaterialPass, WgpuRenderer};
use crate::pool::{self, GpuTexture};
use crate::uniforms::{PerObjectUniforms, VelocityGlobals};

/// One frame of recording. Passes execute onto the internal encoder as
/// they are declared; `finish` submits the whole frame in one batch.
pub struct WgpuFrame<'a> {
    renderer: &'a WgpuRenderer,
    encoder: wgpu::CommandEncoder,
    textures: Vec<FrameTexture>,
    published: HashMap<&'static str, Arc<wgpu::TextureView>>,
}

struct FrameTexture {
    view: Arc<wgpu::TextureView>,
    // Transients are owned by the frame; imports borrow a pool slot.
    _keep_alive: Option<wgpu::Texture>,
}

fn view_of(textures: &[FrameTexture], handle: TextureHandle) -> Option<&Arc<wgpu::TextureView>> {
    textures.get(handle.index()).map(|t| &t.view)
}

impl<'a> WgpuFrame<'a> {
    pub(crate) fn new(renderer: &'a WgpuRenderer) -> Self {
        let encoder = renderer
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Velocity Frame Encoder"),
            });
        Self {
            renderer,
            encoder,
            textures: Vec::new(),
            published: HashMap::new(),
        }
    }

    /// Submit every recorded pass and hand back the textures published
    /// for sampling by later render stages, keyed by slot name.
    pub fn finish(self) -> HashMap<&'static str, Arc<wgpu::TextureView>> {
        self.renderer.queue.submit(Some(self.encoder.finish()));
        self.published
    }

    fn execute(&mut self, desc: &PassDesc, commands: &RecordedCommands) {
        let renderer = self.renderer;

        let Some(target) = desc.color_target else {
            log::error!("pass {:?} has no color target, skipping", desc.name);
            return;
        };
        let Some(target_view) = view_of(&self.textures, target) else {
            log::error!("pass {:?} targets an unknown texture, skipping", desc.name);
            return;
        };

        let globals_buffer = renderer
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(desc.name),
                contents: bytemuck::bytes_of(&commands.globals),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let history_view = commands
            .history
            .and_then(|h| view_of(&self.textures, h))
            .map(Arc::as_ref)
            .unwrap_or(&renderer.fallback_view);
        let emitted_view = commands
            .emitted
            .and_then(|h| view_of(&self.textures, h))
            .map(Arc::as_ref)
            .unwrap_or(&renderer.fallback_view);

        let globals_bind_group = renderer.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(desc.name),
            layout: &renderer.globals_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(history_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(emitted_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&renderer.linear_sampler),
                },
            ],
        });

        // Buffers and bind groups must exist before the render pass
        // borrows the encoder.
        let prepared: Vec<PreparedDraw<'a>> = commands
            .ops
            .iter()
            .filter_map(|op| prepare(renderer, desc.name, op))
            .collect();

        let load = match desc.color_load {
            ColorLoad::Clear => wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            ColorLoad::Preserve => wgpu::LoadOp::Load,
        };
        let mut pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(desc.name),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target_view.as_ref(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            ..Default::default()
        });

        if let Some((width, height)) = commands.viewport {
            pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
        }
        pass.set_bind_group(0, &globals_bind_group, &[]);

        for draw in &prepared {
            match draw {
                PreparedDraw::Mesh {
                    pipeline,
                    material_bind_group,
                    object_bind_group,
                    vertex_buffer,
                    index_buffer,
                    index_count,
                } => {
                    pass.set_pipeline(pipeline);
                    pass.set_bind_group(1, *material_bind_group, &[]);
                    pass.set_bind_group(2, object_bind_group, &[]);
                    pass.set_vertex_buffer(0, vertex_buffer.slice(..));
                    pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                    pass.draw_indexed(0..*index_count, 0, 0..1);
                }
                PreparedDraw::Fullscreen {
                    pipeline,
                    material_bind_group,
                } => {
                    pass.set_pipeline(pipeline);
                    pass.set_bind_group(1, *material_bind_group, &[]);
                    pass.draw(0..3, 0..1);
                }
            }
        }
        drop(pass);

        for (handle, slot) in &desc.publish_after {
            match view_of(&self.textures, *handle).cloned() {
                Some(view) => {
                    self.published.insert(slot.0, view);
                }
                None => log::error!(
                    "pass {:?} publishes an unknown texture to {:?}",
                    desc.name,
                    slot.0
                ),
            }
        }
    }
}

fn prepare<'r>(
    renderer: &'r WgpuRenderer,
    pass_name: &str,
    op: &DrawOp,
) -> Option<PreparedDraw<'r>> {
    match *op {
        DrawOp::Mesh {
            mesh,
            transform,
            material,
            pass_index,
        } => {
            let Some(mesh) = renderer.meshes.get(mesh.0) else {
                log::error!("pass {pass_name:?}: unknown mesh, draw skipped");
                return None;
            };
            let material_pass = material_pass(renderer, pass_name, material, pass_index)?;

            let object = PerObjectUniforms {
                model: transform.to_cols_array_2d(),
            };
            let object_buffer = renderer
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Velocity Per-Object Uniforms"),
                    contents: bytemuck::bytes_of(&object),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
            let object_bind_group = renderer.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Velocity Per-Object Bind Group"),
                layout: &renderer.per_object_bgl,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: object_buffer.as_entire_binding(),
                }],
            });

            Some(PreparedDraw::Mesh {
                pipeline: material_pass.pipeline.as_ref(),
                material_bind_group: material_pass.bind_group.as_ref(),
                object_bind_group,
                vertex_buffer: &mesh.vertex_buffer,
                index_buffer: &mesh.index_buffer,
                index_count: mesh.index_count,
            })
        }
        DrawOp::Fullscreen {
            material,
            pass_index,
        } => {
            let material_pass = material_pass(renderer, pass_name, material, pass_index)?;
            Some(PreparedDraw::Fullscreen {
                pipeline: material_pass.pipeline.as_ref(),
                material_bind_group: material_pass.bind_group.as_ref(),
            })
        }
    }
}

fn material_pass<'r>(
    renderer: &'r WgpuRenderer,
    pass_name: &str,
    material: MaterialHandle,
    pass_index: u32,
) -> Option<&'r MaterialPass> {
    let Some(material) = renderer.materials.get(material.0) else {
        log::error!("pass {pass_name:?}: unknown material, draw skipped");
        return None;
    };
    let Some(material_pass) = material.passes.get(pass_index as usize) else {
        log::error!("pass {pass_name:?}: material has no pass {pass_index}, draw skipped");
        return None;
    };
    Some(material_pass)
}

impl FrameGraph for WgpuFrame<'_> {
    type Texture = GpuTexture;

    fn import(&mut self, texture: &GpuTexture) -> TextureHandle {
        let handle = TextureHandle(self.textures.len() as u32);
        self.textures.push(FrameTexture {
            view: Arc::clone(&texture.view),
            _keep_alive: None,
        });
        handle
    }

    fn create_transient(&mut self, desc: &pixelflow_graph::TextureDesc) -> TextureHandle {
        let texture = self
            .renderer
            .device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some(desc.label),
                size: wgpu::Extent3d {
                    width: desc.width.max(1),
                    height: desc.height.max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: pool::texture_format(desc.format),
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            });
        let view = Arc::new(texture.create_view(&wgpu::TextureViewDescriptor::default()));
        pool::clear_view(&mut self.encoder, &view, desc.label);

        let handle = TextureHandle(self.textures.len() as u32);
        self.textures.push(FrameTexture {
            view,
            _keep_alive: Some(texture),
        });
        handle
    }

    fn add_pass(&mut self, desc: PassDesc, record: &mut dyn FnMut(&mut dyn PassContext)) {
        let mut commands = RecordedCommands::default();
        record(&mut commands);
        self.execute(&desc, &commands);
    }
}

/// Draws and state captured from a pass closure, replayed onto the GPU
/// once recording is done.
#[derive(Default)]
struct RecordedCommands {
    globals: VelocityGlobals,
    history: Option<TextureHandle>,
    emitted: Option<TextureHandle>,
    viewport: Option<(u32, u32)>,
    ops: Vec<DrawOp>,
}

enum DrawOp {
    Mesh {
        mesh: MeshHandle,
        transform: Mat4,
        material: MaterialHandle,
        pass_index: u32,
    },
    Fullscreen {
        material: MaterialHandle,
        pass_index: u32,
    },
}

impl PassContext for RecordedCommands {
    fn set_global_vec4(&mut self, name: &'static str, value: Vec4) {
        let field = if name == shader_ids::CAMERA_POSITION_DELTA {
            &mut self.globals.camera_position_delta
        } else if name == shader_ids::POSITION_DELTA {
            &mut self.globals.position_delta
        } else if name == shader_ids::VELOCITY_SIMULATION_PARAMS {
            &mut self.globals.simulation_params
        } else if name == shader_ids::PIXEL_SCREEN_PARAMS {
            &mut self.globals.pixel_screen_params
        } else {
            log::warn!("ignoring unknown shader global {name:?}");
            return;
        };
        *field = value.to_array();
    }

    fn set_global_texture(&mut self, slot: GlobalSlot, texture: TextureHandle) {
        if slot == shader_ids::PREVIOUS_VELOCITY_TEXTURE || slot == shader_ids::VELOCITY_TEXTURE {
            self.history = Some(texture);
        } else if slot == shader_ids::TEMPORARY_VELOCITY_TEXTURE {
            self.emitted = Some(texture);
        } else {
            log::warn!("ignoring unknown texture slot {:?}", slot.0);
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Some((width, height));
    }

    fn draw(&mut self, mesh: MeshHandle, transform: Mat4, material: MaterialHandle, pass_index: u32) {
        self.ops.push(DrawOp::Mesh {
            mesh,
            transform,
            material,
            pass_index,
        });
    }

    fn draw_fullscreen(&mut self, material: MaterialHandle, pass_index: u32) {
        self.ops.push(DrawOp::Fullscreen {
            material,
            pass_index,
        });
    }
}

/// Resources resolved for one draw before the render pass opens. Mesh,
/// pipeline and material resources are borrowed from the renderer's
/// stores; only the per-object bind group is created per draw.
enum PreparedDraw<'r> {
    Mesh {
        pipeline: &'r wgpu::RenderPipeline,
        material_bind_group: &'r wgpu::BindGroup,
        object_bind_group: wgpu::BindGroup,
        vertex_buffer: &'r wgpu::Buffer,
        index_buffer: &'r wgpu::Buffer,
        index_count: u32,
    },
    Fullscreen {
        pipeline: &'r wgpu::RenderPipeline,
        material_bind_group: &'r wgpu::BindGroup,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_vec4_routing() {
        let mut commands = RecordedCommands::default();
        commands.set_global_vec4(shader_ids::CAMERA_POSITION_DELTA, Vec4::new(1.0, 2.0, 0.0, 0.0));
        commands.set_global_vec4(shader_ids::POSITION_DELTA, Vec4::new(3.0, 4.0, 0.0, 0.0));
        commands.set_global_vec4(shader_ids::VELOCITY_SIMULATION_PARAMS, Vec4::splat(0.9));
        commands.set_global_vec4(shader_ids::PIXEL_SCREEN_PARAMS, Vec4::new(320.0, 180.0, 16.0, 0.0625));

        assert_eq!(commands.globals.camera_position_delta, [1.0, 2.0, 0.0, 0.0]);
        assert_eq!(commands.globals.position_delta, [3.0, 4.0, 0.0, 0.0]);
        assert_eq!(commands.globals.simulation_params, [0.9; 4]);
        assert_eq!(commands.globals.pixel_screen_params, [320.0, 180.0, 16.0, 0.0625]);
    }

    #[test]
    fn test_unknown_global_is_ignored() {
        let mut commands = RecordedCommands::default();
        commands.set_global_vec4("unheard_of", Vec4::ONE);
        assert_eq!(commands.globals, VelocityGlobals::default());
    }

    #[test]
    fn test_texture_slot_binding_map() {
        let mut commands = RecordedCommands::default();
        commands.set_global_texture(shader_ids::PREVIOUS_VELOCITY_TEXTURE, TextureHandle(4));
        commands.set_global_texture(shader_ids::TEMPORARY_VELOCITY_TEXTURE, TextureHandle(7));
        assert_eq!(commands.history, Some(TextureHandle(4)));
        assert_eq!(commands.emitted, Some(TextureHandle(7)));

        // The committed field binds to the same sampler slot as history.
        commands.set_global_texture(shader_ids::VELOCITY_TEXTURE, TextureHandle(9));
        assert_eq!(commands.history, Some(TextureHandle(9)));
    }

    #[test]
    fn test_draws_recorded_in_order() {
        let mut commands = RecordedCommands::default();
        commands.draw(MeshHandle(1), Mat4::IDENTITY, MaterialHandle(2), 0);
        commands.draw_fullscreen(MaterialHandle(3), 1);

        assert_eq!(commands.ops.len(), 2);
        assert!(matches!(
            commands.ops[0],
            DrawOp::Mesh {
                mesh: MeshHandle(1),
                material: MaterialHandle(2),
                pass_index: 0,
                ..
            }
        ));
        assert!(matches!(
            commands.ops[1],
            DrawOp::Fullscreen {
                material: MaterialHandle(3),
                pass_index: 1,
            }
        ));
    }
}
