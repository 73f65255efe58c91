//! Device setup and resource registration for the velocity renderer.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use pixelflow_graph::{MaterialHandle, MeshHandle};

use crate::graph::WgpuFrame;
use crate::handle::HandleStore;
use crate::pipelines;
use crate::pool::WgpuTexturePool;

/// Interleaved sprite vertex: position then uv, both vec2.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex2D {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

/// Indexed 2D mesh uploaded to the GPU.
pub struct Mesh2D {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

/// One drawable variant of a material. The velocity pipeline addresses
/// these by index: emitters draw pass 0, the preview blit draws pass 1.
/// Pipelines and bind groups are shared between materials.
pub struct MaterialPass {
    pub pipeline: Arc<wgpu::RenderPipeline>,
    pub bind_group: Arc<wgpu::BindGroup>,
}

pub struct Material {
    pub passes: Vec<MaterialPass>,
}

/// Owns the wgpu device plus every long-lived velocity resource:
/// pipelines, bind group layouts, registered meshes and materials.
pub struct WgpuRenderer {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub(crate) meshes: HandleStore<Mesh2D>,
    pub(crate) materials: HandleStore<Material>,
    pub(crate) globals_bgl: wgpu::BindGroupLayout,
    pub(crate) per_object_bgl: wgpu::BindGroupLayout,
    sprite_material_bgl: wgpu::BindGroupLayout,
    pub(crate) fallback_view: wgpu::TextureView,
    pub(crate) linear_sampler: wgpu::Sampler,
    empty_bind_group: Arc<wgpu::BindGroup>,
    emitter_flat_pipeline: Arc<wgpu::RenderPipeline>,
    emitter_sprite_pipeline: Arc<wgpu::RenderPipeline>,
    simulate_pipeline: Arc<wgpu::RenderPipeline>,
    preview_pipeline: Arc<wgpu::RenderPipeline>,
}

impl WgpuRenderer {
    /// Bring up a device without a window. Suitable for offscreen
    /// rendering and integration tests.
    pub fn new_headless() -> Result<Self, String> {
        let _ = env_logger::try_init();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or("Failed to find suitable GPU adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Pixelflow Velocity Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ))
        .map_err(|e| format!("Failed to create device: {e}"))?;

        log::info!("velocity renderer on {}", adapter.get_info().name);
        Ok(Self::from_device(Arc::new(device), Arc::new(queue)))
    }

    /// Build the renderer on a device the host application already owns.
    pub fn from_device(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let globals_bgl = pipelines::create_globals_bgl(&device);
        let per_object_bgl = pipelines::create_per_object_bgl(&device);
        let sprite_material_bgl = pipelines::create_sprite_material_bgl(&device);
        let empty_material_bgl = pipelines::create_empty_material_bgl(&device);

        let emitter_flat_pipeline = pipelines::create_emitter_pipeline(
            &device,
            &globals_bgl,
            &empty_material_bgl,
            &per_object_bgl,
            "fs_main",
        );
        let emitter_sprite_pipeline = pipelines::create_emitter_pipeline(
            &device,
            &globals_bgl,
            &sprite_material_bgl,
            &per_object_bgl,
            "fs_textured",
        );
        let simulate_pipeline =
            pipelines::create_simulate_pipeline(&device, &globals_bgl, &empty_material_bgl);
        let preview_pipeline =
            pipelines::create_preview_pipeline(&device, &globals_bgl, &empty_material_bgl);

        let empty_bind_group = Arc::new(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Empty Material Bind Group"),
            layout: &empty_material_bgl,
            entries: &[],
        }));

        // Stand-in for texture slots no pass has bound. 1x1, all zero.
        let fallback = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Velocity Fallback Texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: pipelines::VELOCITY_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            fallback.as_image_copy(),
            &[0u8; 8],
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(8),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        let fallback_view = fallback.create_view(&wgpu::TextureViewDescriptor::default());

        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Velocity Linear Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            device,
            queue,
            meshes: HandleStore::new(),
            materials: HandleStore::new(),
            globals_bgl,
            per_object_bgl,
            sprite_material_bgl,
            fallback_view,
            linear_sampler,
            empty_bind_group,
            emitter_flat_pipeline: Arc::new(emitter_flat_pipeline),
            emitter_sprite_pipeline: Arc::new(emitter_sprite_pipeline),
            simulate_pipeline: Arc::new(simulate_pipeline),
            preview_pipeline: Arc::new(preview_pipeline),
        }
    }

    /// Pool for the persistent velocity slots, sharing this device.
    pub fn create_pool(&self) -> WgpuTexturePool {
        WgpuTexturePool::new(Arc::clone(&self.device), Arc::clone(&self.queue))
    }

    /// Start recording one frame of velocity passes.
    pub fn begin_frame(&self) -> WgpuFrame<'_> {
        WgpuFrame::new(self)
    }

    pub fn register_mesh(&mut self, vertices: &[Vertex2D], indices: &[u16]) -> MeshHandle {
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Sprite Vertex Buffer"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Sprite Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        MeshHandle(self.meshes.insert(Mesh2D {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }))
    }

    /// Unit quad centered on the origin, uvs over the full sprite.
    pub fn create_unit_quad(&mut self) -> MeshHandle {
        let (vertices, indices) = unit_quad_data();
        self.register_mesh(&vertices, &indices)
    }

    pub fn register_material(&mut self, material: Material) -> MaterialHandle {
        MaterialHandle(self.materials.insert(material))
    }

    /// The two materials the velocity pipeline itself needs: the flat
    /// emitter override and the simulate/preview blit material, in that
    /// order.
    pub fn create_velocity_materials(&mut self) -> (MaterialHandle, MaterialHandle) {
        let emitter = self.register_material(Material {
            passes: vec![MaterialPass {
                pipeline: Arc::clone(&self.emitter_flat_pipeline),
                bind_group: Arc::clone(&self.empty_bind_group),
            }],
        });
        let blit = self.register_material(Material {
            passes: vec![
                MaterialPass {
                    pipeline: Arc::clone(&self.simulate_pipeline),
                    bind_group: Arc::clone(&self.empty_bind_group),
                },
                MaterialPass {
                    pipeline: Arc::clone(&self.preview_pipeline),
                    bind_group: Arc::clone(&self.empty_bind_group),
                },
            ],
        });
        (emitter, blit)
    }

    /// Emitter material for a renderer that carries its own sprite:
    /// velocity coverage follows the sprite's alpha channel.
    pub fn create_sprite_emitter_material(
        &mut self,
        sprite_view: &wgpu::TextureView,
    ) -> MaterialHandle {
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sprite Emitter Bind Group"),
            layout: &self.sprite_material_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(sprite_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.linear_sampler),
                },
            ],
        });
        self.register_material(Material {
            passes: vec![MaterialPass {
                pipeline: Arc::clone(&self.emitter_sprite_pipeline),
                bind_group: Arc::new(bind_group),
            }],
        })
    }
}

fn unit_quad_data() -> ([Vertex2D; 4], [u16; 6]) {
    let vertices = [
        Vertex2D {
            position: [-0.5, -0.5],
            uv: [0.0, 1.0],
        },
        Vertex2D {
            position: [0.5, -0.5],
            uv: [1.0, 1.0],
        },
        Vertex2D {
            position: [0.5, 0.5],
            uv: [1.0, 0.0],
        },
        Vertex2D {
            position: [-0.5, 0.5],
            uv: [0.0, 0.0],
        },
    ];
    let indices = [0, 1, 2, 0, 2, 3];
    (vertices, indices)
}
