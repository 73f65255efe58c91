//! Reference executor for the frame-graph interface.
//!
//! `LinearGraph` runs declared passes immediately, in declaration
//! order, and records everything a pass does: read/write sets, the
//! content observed through each read, bound globals, and submitted
//! draws. Texture contents are modeled as write stamps rather than
//! pixels, which is enough to prove handoff and ordering invariants
//! without a GPU.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat4, Vec4};

use crate::graph::{ColorLoad, FrameGraph, PassContext, PassDesc, TextureDesc, TexturePool};
use crate::handle::{GlobalSlot, MaterialHandle, MeshHandle, TextureHandle};

/// What a texture holds, as far as the executor can tell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Content {
    /// Transparent-black clear state: fresh allocation or transient
    /// creation.
    Cleared,
    /// Fully committed by the pass that received this write stamp.
    Stamp(u64),
}

/// Persistent texture slot managed by [`LinearPool`]. Cheap to clone;
/// clones share content so commits are visible across frames.
#[derive(Clone, Debug)]
pub struct LinearTexture(Rc<RefCell<LinearTextureState>>);

#[derive(Debug)]
struct LinearTextureState {
    desc: TextureDesc,
    content: Content,
}

impl LinearTexture {
    fn new(desc: TextureDesc) -> Self {
        Self(Rc::new(RefCell::new(LinearTextureState {
            desc,
            content: Content::Cleared,
        })))
    }

    pub fn desc(&self) -> TextureDesc {
        self.0.borrow().desc
    }

    pub fn content(&self) -> Content {
        self.0.borrow().content
    }

    /// True when both handles refer to the same physical allocation.
    pub fn same_allocation(&self, other: &LinearTexture) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn commit(&self, content: Content) {
        self.0.borrow_mut().content = content;
    }
}

/// Texture pool for the reference executor. Counts allocations so tests
/// can assert resize-on-demand behavior.
#[derive(Default)]
pub struct LinearPool {
    /// Total number of textures ever allocated by this pool.
    pub allocations: u32,
    /// Number of textures returned through `release`.
    pub released: u32,
}

impl LinearPool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TexturePool for LinearPool {
    type Texture = LinearTexture;

    fn allocate_or_resize(&mut self, slot: &mut Option<LinearTexture>, desc: &TextureDesc) -> bool {
        if let Some(existing) = slot {
            if existing.desc() == *desc {
                return false;
            }
        }
        self.allocations += 1;
        *slot = Some(LinearTexture::new(*desc));
        true
    }

    fn release(&mut self, _texture: LinearTexture) {
        self.released += 1;
    }
}

/// One draw submitted inside a pass.
#[derive(Clone, PartialEq, Debug)]
pub struct DrawRecord {
    pub mesh: MeshHandle,
    pub transform: Mat4,
    pub material: MaterialHandle,
    pub pass_index: u32,
}

/// Everything a single declared pass did.
#[derive(Clone, PartialEq, Debug)]
pub struct PassRecord {
    pub name: &'static str,
    /// Declared reads paired with the content observed when the pass
    /// started.
    pub reads: Vec<(TextureHandle, Content)>,
    pub color_target: Option<TextureHandle>,
    /// How the pass declared its color target to be initialized.
    pub color_load: ColorLoad,
    /// Content of the color target after the pass committed.
    pub committed: Option<Content>,
    pub globals_vec4: Vec<(&'static str, Vec4)>,
    pub global_textures: Vec<(GlobalSlot, TextureHandle)>,
    pub viewport: Option<(u32, u32)>,
    pub draws: Vec<DrawRecord>,
    pub fullscreen_draws: Vec<(MaterialHandle, u32)>,
    pub allow_culling: bool,
}

/// Issues monotonically increasing write stamps across frames and hands
/// out one [`LinearGraph`] per frame.
#[derive(Default)]
pub struct LinearFrames {
    next_stamp: u64,
}

impl LinearFrames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> LinearGraph<'_> {
        LinearGraph {
            stamps: &mut self.next_stamp,
            textures: Vec::new(),
            passes: Vec::new(),
            published: Vec::new(),
        }
    }
}

enum Registered {
    Imported(LinearTexture),
    Transient { desc: TextureDesc, content: Content },
}

/// Per-frame graph that executes passes as they are declared.
pub struct LinearGraph<'a> {
    stamps: &'a mut u64,
    textures: Vec<Registered>,
    pub passes: Vec<PassRecord>,
    /// Globally published textures with the content they held at
    /// publication time.
    pub published: Vec<(GlobalSlot, Content)>,
}

impl LinearGraph<'_> {
    pub fn content_of(&self, handle: TextureHandle) -> Content {
        match &self.textures[handle.index()] {
            Registered::Imported(texture) => texture.content(),
            Registered::Transient { content, .. } => *content,
        }
    }

    pub fn desc_of(&self, handle: TextureHandle) -> TextureDesc {
        match &self.textures[handle.index()] {
            Registered::Imported(texture) => texture.desc(),
            Registered::Transient { desc, .. } => *desc,
        }
    }

    /// Find a pass record by name. Panics in tests read better than
    /// Option chains, so this asserts the pass exists.
    pub fn pass(&self, name: &str) -> &PassRecord {
        self.passes
            .iter()
            .find(|pass| pass.name == name)
            .unwrap_or_else(|| panic!("no pass named {name:?} was declared"))
    }

    pub fn has_pass(&self, name: &str) -> bool {
        self.passes.iter().any(|pass| pass.name == name)
    }

    fn set_content(&mut self, handle: TextureHandle, new: Content) {
        match &mut self.textures[handle.index()] {
            Registered::Imported(texture) => texture.commit(new),
            Registered::Transient { content, .. } => *content = new,
        }
    }
}

impl FrameGraph for LinearGraph<'_> {
    type Texture = LinearTexture;

    fn import(&mut self, texture: &LinearTexture) -> TextureHandle {
        self.textures.push(Registered::Imported(texture.clone()));
        TextureHandle((self.textures.len() - 1) as u32)
    }

    fn create_transient(&mut self, desc: &TextureDesc) -> TextureHandle {
        self.textures.push(Registered::Transient {
            desc: *desc,
            content: Content::Cleared,
        });
        TextureHandle((self.textures.len() - 1) as u32)
    }

    fn add_pass(&mut self, desc: PassDesc, record: &mut dyn FnMut(&mut dyn PassContext)) {
        for handle in desc.reads.iter().chain(desc.color_target.iter()) {
            assert!(
                handle.index() < self.textures.len(),
                "pass {:?} references a texture unknown to this frame",
                desc.name
            );
        }

        let reads: Vec<_> = desc
            .reads
            .iter()
            .map(|handle| (*handle, self.content_of(*handle)))
            .collect();

        let mut ctx = LinearPassContext::default();
        record(&mut ctx);

        // An attachment is either cleared or fully overwritten by the
        // pass; either way it leaves with this pass's stamp.
        let committed = desc.color_target.map(|target| {
            *self.stamps += 1;
            let content = Content::Stamp(*self.stamps);
            self.set_content(target, content);
            content
        });

        for (handle, slot) in &desc.publish_after {
            let content = self.content_of(*handle);
            self.published.push((*slot, content));
        }

        log::debug!(
            "pass {:?}: {} reads, {} draws, {} fullscreen draws",
            desc.name,
            reads.len(),
            ctx.draws.len(),
            ctx.fullscreen_draws.len()
        );

        self.passes.push(PassRecord {
            name: desc.name,
            reads,
            color_target: desc.color_target,
            color_load: desc.color_load,
            committed,
            globals_vec4: ctx.globals_vec4,
            global_textures: ctx.global_textures,
            viewport: ctx.viewport,
            draws: ctx.draws,
            fullscreen_draws: ctx.fullscreen_draws,
            allow_culling: desc.allow_culling,
        });
    }
}

#[derive(Default)]
struct LinearPassContext {
    globals_vec4: Vec<(&'static str, Vec4)>,
    global_textures: Vec<(GlobalSlot, TextureHandle)>,
    viewport: Option<(u32, u32)>,
    draws: Vec<DrawRecord>,
    fullscreen_draws: Vec<(MaterialHandle, u32)>,
}

impl PassContext for LinearPassContext {
    fn set_global_vec4(&mut self, name: &'static str, value: Vec4) {
        self.globals_vec4.push((name, value));
    }

    fn set_global_texture(&mut self, slot: GlobalSlot, texture: TextureHandle) {
        self.global_textures.push((slot, texture));
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Some((width, height));
    }

    fn draw(&mut self, mesh: MeshHandle, transform: Mat4, material: MaterialHandle, pass_index: u32) {
        self.draws.push(DrawRecord {
            mesh,
            transform,
            material,
            pass_index,
        });
    }

    fn draw_fullscreen(&mut self, material: MaterialHandle, pass_index: u32) {
        self.fullscreen_draws.push((material, pass_index));
    }
}
