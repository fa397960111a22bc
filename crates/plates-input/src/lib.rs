//! Pointer input: a frame-coherent mouse tracker and orbit camera controls.

pub mod mouse;
pub mod orbit;

pub use mouse::{CLICK_SLOP, MouseState};
pub use orbit::{OrbitControls, OrbitSettings};
