//! Names of the global shader resources the velocity passes bind and
//! publish. Kept in one place so the simulation and emitter passes can
//! never drift apart on a spelling.

use pixelflow_graph::GlobalSlot;

/// The committed velocity field, published after the simulation pass.
pub const VELOCITY_TEXTURE: GlobalSlot = GlobalSlot("velocity_texture");
/// Last frame's committed field, bound for the simulation shader.
pub const PREVIOUS_VELOCITY_TEXTURE: GlobalSlot = GlobalSlot("previous_velocity_texture");
/// This frame's emitter contributions, published after the emitter pass.
pub const TEMPORARY_VELOCITY_TEXTURE: GlobalSlot = GlobalSlot("temporary_velocity_texture");

/// Halved screen-space camera displacement, simulation pass flavor.
pub const CAMERA_POSITION_DELTA: &str = "camera_position_delta";
/// The same displacement as bound for emitter draws.
pub const POSITION_DELTA: &str = "position_delta";
/// Opaque decay/advection tunables forwarded to the simulation shader.
pub const VELOCITY_SIMULATION_PARAMS: &str = "velocity_simulation_params";
/// (width, height, ppu, 1/ppu) of the pixel-art screen.
pub const PIXEL_SCREEN_PARAMS: &str = "pixel_screen_params";
