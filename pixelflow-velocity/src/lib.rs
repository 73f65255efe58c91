//! Per-pixel screen-space velocity field for a 2D pixel-art renderer.
//!
//! Once per frame the orchestrator records three chained passes into a
//! frame graph: emitters rasterize their local velocity into a
//! transient texture, the simulation pass folds that texture and the
//! camera's screen-space displacement into a double-buffered persistent
//! field, and an optional preview pass overlays the result for
//! inspection. Downstream effects (motion blur, trail smearing) sample
//! the published velocity texture.
//!
//! The crate is generic over the [`pixelflow_graph`] interface and owns
//! no GPU resources itself, so the buffer handoff and ordering
//! invariants are unit-testable against the reference executor.

pub mod camera;
pub mod double_buffer;
pub mod pass;
pub mod passes;
pub mod settings;
pub mod shader_ids;

pub use camera::{CameraTracker, FrameKinematics};
pub use double_buffer::DoubleBufferStore;
pub use pass::{VelocityRenderPass, VELOCITY_FORMAT};
pub use settings::{SimulationSettings, VelocityPassSettings};
