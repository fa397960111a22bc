//! Per-plate interaction state and rotation animation.

use glam::{Mat4, Quat, Vec3};

use crate::layout::PlacementSpec;

/// Scale applied to a plate while the pointer is over it.
pub const HOVER_SCALE: f32 = 1.2;

/// Frame rate that `angular_speed` is expressed against.
pub const REFERENCE_FRAME_RATE: f32 = 60.0;

/// Pointer interaction delivered to a single plate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerEvent {
    Enter,
    Leave,
    Click,
}

/// The four combinations of `hovered` and `active`. None of them is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VisualState {
    Idle,
    Hovered,
    HoveredActive,
    Active,
}

/// Mutable state of one plate.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlateInstanceState {
    pub hovered: bool,
    pub active: bool,
    /// Accumulated rotation around X, in radians. Never reset.
    pub current_rotation_x: f32,
}

impl PlateInstanceState {
    pub fn new(initial_rotation_x: f32) -> Self {
        Self {
            hovered: false,
            active: false,
            current_rotation_x: initial_rotation_x,
        }
    }

    pub fn visual_state(&self) -> VisualState {
        match (self.hovered, self.active) {
            (false, false) => VisualState::Idle,
            (true, false) => VisualState::Hovered,
            (true, true) => VisualState::HoveredActive,
            (false, true) => VisualState::Active,
        }
    }

    /// Apply one pointer event. Enter and leave are idempotent; click toggles.
    pub fn handle(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Enter => self.hovered = true,
            PointerEvent::Leave => self.hovered = false,
            PointerEvent::Click => self.active = !self.active,
        }
    }

    /// Uniform scale implied by the hover flag. `active` has no visual effect.
    pub fn scale(&self) -> f32 {
        if self.hovered { HOVER_SCALE } else { 1.0 }
    }
}

/// One materialized plate: its immutable placement plus mutable state.
#[derive(Clone, Debug)]
pub struct PlateInstance {
    index: usize,
    placement: PlacementSpec,
    half_extents: Vec3,
    state: PlateInstanceState,
}

impl PlateInstance {
    /// Create a plate at rest. `size` is the full box size (width, height, depth).
    pub fn new(index: usize, placement: PlacementSpec, size: Vec3) -> Self {
        Self {
            index,
            placement,
            half_extents: size * 0.5,
            state: PlateInstanceState::new(placement.rotation_x),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn placement(&self) -> &PlacementSpec {
        &self.placement
    }

    pub fn state(&self) -> &PlateInstanceState {
        &self.state
    }

    /// Half extents of the unscaled box, used for picking.
    pub fn half_extents(&self) -> Vec3 {
        self.half_extents
    }

    pub fn handle_event(&mut self, event: PointerEvent) {
        self.state.handle(event);
    }

    pub fn scale(&self) -> f32 {
        self.state.scale()
    }

    /// Advance the rotation by one frame.
    ///
    /// `None` adds exactly `angular_speed`. `Some(dt)` scales the step by
    /// `dt * 60`, so one sixtieth of a second matches a single frame.
    pub fn advance_frame(&mut self, delta: Option<f32>) {
        let step = match delta {
            None => self.placement.angular_speed,
            Some(dt) => self.placement.angular_speed * dt * REFERENCE_FRAME_RATE,
        };
        self.state.current_rotation_x += step;
    }

    /// World transform: translate along X, rotate about X, then hover scale.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale()),
            Quat::from_rotation_x(self.state.current_rotation_x),
            Vec3::new(self.placement.position_x, 0.0, 0.0),
        )
    }
}
