//! Persistent texture pool: allocate-or-resize with clear-on-allocate.

use std::sync::Arc;

use pixelflow_graph::{FilterMode, TextureDesc, TextureFormat, TexturePool, WrapMode};

/// Persistent GPU texture slot with the descriptor it was allocated
/// with, remembered for resize-on-demand comparison. The view is
/// shared, so frames can register it and publication can outlive the
/// recording frame.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: Arc<wgpu::TextureView>,
    pub sampler: wgpu::Sampler,
    pub desc: TextureDesc,
}

/// Owner of persistent cross-frame textures on a wgpu device.
pub struct WgpuTexturePool {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl WgpuTexturePool {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self { device, queue }
    }
}

impl TexturePool for WgpuTexturePool {
    type Texture = GpuTexture;

    fn allocate_or_resize(&mut self, slot: &mut Option<GpuTexture>, desc: &TextureDesc) -> bool {
        if let Some(existing) = slot {
            if existing.desc == *desc {
                return false;
            }
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.width.max(1),
                height: desc.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(desc.format),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = Arc::new(texture.create_view(&wgpu::TextureViewDescriptor::default()));
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(desc.label),
            address_mode_u: address_mode(desc.wrap),
            address_mode_v: address_mode(desc.wrap),
            address_mode_w: address_mode(desc.wrap),
            mag_filter: filter_mode(desc.filter),
            min_filter: filter_mode(desc.filter),
            ..Default::default()
        });

        // A fresh slot must hold defined contents before anyone samples
        // it: clear to transparent black immediately.
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Texture Pool Clear"),
            });
        clear_view(&mut encoder, &view, "Texture Pool Clear Pass");
        self.queue.submit(Some(encoder.finish()));

        log::debug!(
            "allocated {:?} at {}x{} ({:?})",
            desc.label,
            desc.width,
            desc.height,
            desc.format
        );
        *slot = Some(GpuTexture {
            texture,
            view,
            sampler,
            desc: *desc,
        });
        true
    }

    fn release(&mut self, texture: GpuTexture) {
        log::debug!("released {:?}", texture.desc.label);
        drop(texture);
    }
}

/// Record a clear of `view` to transparent black.
pub(crate) fn clear_view(encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView, label: &str) {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        ..Default::default()
    });
}

pub(crate) fn texture_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
    }
}

pub(crate) fn filter_mode(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Bilinear => wgpu::FilterMode::Linear,
    }
}

pub(crate) fn address_mode(wrap: WrapMode) -> wgpu::AddressMode {
    match wrap {
        WrapMode::Clamp => wgpu::AddressMode::ClampToEdge,
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mapping() {
        assert_eq!(
            texture_format(TextureFormat::Rgba16Float),
            wgpu::TextureFormat::Rgba16Float
        );
        assert_eq!(
            texture_format(TextureFormat::Rgba8Unorm),
            wgpu::TextureFormat::Rgba8Unorm
        );
    }

    #[test]
    fn test_filter_and_wrap_mapping() {
        assert_eq!(filter_mode(FilterMode::Bilinear), wgpu::FilterMode::Linear);
        assert_eq!(filter_mode(FilterMode::Nearest), wgpu::FilterMode::Nearest);
        assert_eq!(address_mode(WrapMode::Clamp), wgpu::AddressMode::ClampToEdge);
        assert_eq!(address_mode(WrapMode::Repeat), wgpu::AddressMode::Repeat);
    }
}
