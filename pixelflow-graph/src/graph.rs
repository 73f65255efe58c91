//! Pass declaration and texture allocation traits.

use glam::{Mat4, Vec4};

use crate::handle::{GlobalSlot, MaterialHandle, MeshHandle, TextureHandle};

/// Texture formats the velocity pipeline allocates.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TextureFormat {
    /// 4x16-bit float, used by every velocity buffer.
    Rgba16Float,
    /// 8-bit color, used by the frame's display output.
    Rgba8Unorm,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FilterMode {
    Nearest,
    Bilinear,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WrapMode {
    Clamp,
    Repeat,
}

/// Full description of a texture allocation. Two descriptors comparing
/// equal describe the same physical allocation, which is what makes
/// allocate-or-resize idempotent.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub filter: FilterMode,
    pub wrap: WrapMode,
    pub label: &'static str,
}

/// How a pass's color target is initialized before its draws run.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ColorLoad {
    /// Clear to transparent black.
    Clear,
    /// Keep whatever an earlier pass left in the target.
    Preserve,
}

/// Declaration of one unit of GPU work. The scheduler uses the read and
/// write sets to order, cull or parallelize passes; `allow_culling:
/// false` marks inspection passes that are "used" merely by existing.
pub struct PassDesc {
    pub name: &'static str,
    pub reads: Vec<TextureHandle>,
    pub color_target: Option<TextureHandle>,
    pub color_load: ColorLoad,
    /// Textures made globally samplable once this pass completes.
    pub publish_after: Vec<(TextureHandle, GlobalSlot)>,
    pub allow_culling: bool,
}

/// Command recording surface handed to a pass's record callback.
pub trait PassContext {
    /// Bind a global shader parameter for this pass's draws.
    fn set_global_vec4(&mut self, name: &'static str, value: Vec4);
    /// Bind a registered texture to a named global slot for this pass.
    fn set_global_texture(&mut self, slot: GlobalSlot, texture: TextureHandle);
    /// Restrict rasterization to the given extent of the color target.
    fn set_viewport(&mut self, width: u32, height: u32);
    /// Submit one mesh draw with the given material pass.
    fn draw(&mut self, mesh: MeshHandle, transform: Mat4, material: MaterialHandle, pass_index: u32);
    /// Submit one fullscreen draw with the given material pass.
    fn draw_fullscreen(&mut self, material: MaterialHandle, pass_index: u32);
}

/// Owner of persistent, cross-frame GPU textures.
pub trait TexturePool {
    type Texture;

    /// Ensure `slot` holds a texture matching `desc`. No-op when the
    /// existing allocation already matches; otherwise the old texture is
    /// dropped and a freshly cleared one takes its place. Returns true
    /// when a (re)allocation happened.
    fn allocate_or_resize(&mut self, slot: &mut Option<Self::Texture>, desc: &TextureDesc) -> bool;

    /// Return a persistent texture to the pool.
    fn release(&mut self, texture: Self::Texture);
}

/// Per-frame graph of passes and texture dependencies. Rebuilt every
/// frame; handles do not survive the graph that issued them.
pub trait FrameGraph {
    type Texture;

    /// Register a persistent texture for use by this frame's passes.
    fn import(&mut self, texture: &Self::Texture) -> TextureHandle;

    /// Create a texture that lives only for this frame, cleared to
    /// transparent black.
    fn create_transient(&mut self, desc: &TextureDesc) -> TextureHandle;

    /// Declare a pass and record its commands. Execution order follows
    /// the declared read/write dependencies.
    fn add_pass(&mut self, desc: PassDesc, record: &mut dyn FnMut(&mut dyn PassContext));
}
