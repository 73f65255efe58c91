//! Embedded WGSL shader sources for the velocity passes.

pub const VELOCITY_EMITTER_SHADER: &str = include_str!("../shaders/velocity_emitter.wgsl");
pub const VELOCITY_SIMULATE_SHADER: &str = include_str!("../shaders/velocity_simulate.wgsl");
pub const VELOCITY_PREVIEW_SHADER: &str = include_str!("../shaders/velocity_preview.wgsl");
