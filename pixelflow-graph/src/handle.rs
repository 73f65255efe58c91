//! Opaque handles exchanged between the core and a backend.

/// Per-frame handle to a texture registered with a frame graph.
/// Only meaningful within the graph that issued it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TextureHandle(pub u32);

impl TextureHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Backend mesh handle (slab key into the backend's mesh store).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MeshHandle(pub u64);

/// Backend material handle (slab key into the backend's material store).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MaterialHandle(pub u64);

/// Named slot under which a texture is published for other, unrelated
/// render systems to sample. Publication takes effect only after the
/// declaring pass completes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct GlobalSlot(pub &'static str);
