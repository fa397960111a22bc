//! Frame-coherent mouse state tracker.
//!
//! [`MouseState`] accumulates winit mouse events during a frame and exposes
//! position, per-frame delta, button edges, scroll and cursor-in-window
//! status. It also remembers where each button went down so a release can
//! be classified as a click or the end of a drag.

use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};

/// Maximum pointer travel, in physical pixels, between press and release
/// for the release to count as a click.
pub const CLICK_SLOP: f32 = 2.0;

#[derive(Debug, Clone, Copy, Default)]
struct ButtonFrame {
    pressed: bool,
    just_pressed: bool,
    just_released: bool,
    press_position: Vec2,
    /// Farthest distance from `press_position` while held.
    travel: f32,
}

fn button_index(button: MouseButton) -> usize {
    match button {
        MouseButton::Left => 0,
        MouseButton::Right => 1,
        MouseButton::Middle => 2,
        MouseButton::Back => 3,
        MouseButton::Forward | MouseButton::Other(_) => 4,
    }
}

/// Frame-coherent mouse state.
///
/// 1. Forward winit events via the `on_*` methods.
/// 2. Query state with the accessors while updating the frame.
/// 3. Call [`clear_transients`](Self::clear_transients) at end of frame.
#[derive(Debug, Clone, Default)]
pub struct MouseState {
    position: Option<Vec2>,
    delta: Vec2,
    moved: bool,
    buttons: [ButtonFrame; 5],
    scroll: f32,
    cursor_in_window: bool,
}

impl MouseState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a `CursorMoved` event (physical pixels).
    pub fn on_cursor_moved(&mut self, x: f64, y: f64) {
        let new_pos = Vec2::new(x as f32, y as f32);
        // The first sample after entering has nothing to diff against.
        if let Some(old) = self.position {
            self.delta += new_pos - old;
        }
        self.position = Some(new_pos);
        self.moved = true;
        self.cursor_in_window = true;

        for b in self.buttons.iter_mut().filter(|b| b.pressed) {
            b.travel = b.travel.max(new_pos.distance(b.press_position));
        }
    }

    /// Process a `MouseInput` event.
    pub fn on_button(&mut self, button: MouseButton, state: ElementState) {
        let position = self.position.unwrap_or(Vec2::ZERO);
        let b = &mut self.buttons[button_index(button)];
        match state {
            ElementState::Pressed => {
                b.pressed = true;
                b.just_pressed = true;
                b.press_position = position;
                b.travel = 0.0;
            }
            ElementState::Released => {
                b.pressed = false;
                b.just_released = true;
            }
        }
    }

    /// Process a `MouseWheel` event.
    pub fn on_scroll(&mut self, delta: MouseScrollDelta) {
        match delta {
            MouseScrollDelta::LineDelta(_x, y) => {
                self.scroll += y;
            }
            MouseScrollDelta::PixelDelta(pos) => {
                // ~40 pixels per line
                self.scroll += (pos.y / 40.0) as f32;
            }
        }
    }

    pub fn on_cursor_entered(&mut self) {
        self.cursor_in_window = true;
    }

    /// Process a `CursorLeft` event. The position is forgotten so the next
    /// entry does not produce a jump in [`delta`](Self::delta).
    pub fn on_cursor_left(&mut self) {
        self.cursor_in_window = false;
        self.position = None;
    }

    /// Clears per-frame transients: delta, scroll, moved and button edges.
    pub fn clear_transients(&mut self) {
        self.delta = Vec2::ZERO;
        self.scroll = 0.0;
        self.moved = false;
        for b in &mut self.buttons {
            b.just_pressed = false;
            b.just_released = false;
        }
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Cursor position in physical pixels, if known.
    #[must_use]
    pub fn position(&self) -> Option<Vec2> {
        self.position
    }

    /// Movement since the last clear.
    #[must_use]
    pub fn delta(&self) -> Vec2 {
        self.delta
    }

    /// Whether any `CursorMoved` arrived this frame.
    #[must_use]
    pub fn moved(&self) -> bool {
        self.moved
    }

    #[must_use]
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.buttons[button_index(button)].pressed
    }

    #[must_use]
    pub fn just_button_pressed(&self, button: MouseButton) -> bool {
        self.buttons[button_index(button)].just_pressed
    }

    #[must_use]
    pub fn just_button_released(&self, button: MouseButton) -> bool {
        self.buttons[button_index(button)].just_released
    }

    /// Whether the last press/release of `button` stayed within [`CLICK_SLOP`].
    #[must_use]
    pub fn is_click(&self, button: MouseButton) -> bool {
        self.buttons[button_index(button)].travel <= CLICK_SLOP
    }

    /// Scroll wheel delta accumulated this frame (positive = scroll up).
    #[must_use]
    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    #[must_use]
    pub fn is_cursor_in_window(&self) -> bool {
        self.cursor_in_window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_updates_on_move() {
        let mut ms = MouseState::new();
        assert_eq!(ms.position(), None);
        ms.on_cursor_moved(100.0, 200.0);
        assert_eq!(ms.position(), Some(Vec2::new(100.0, 200.0)));
        assert!(ms.moved());
        assert!(ms.is_cursor_in_window());
    }

    #[test]
    fn test_first_sample_has_no_delta() {
        let mut ms = MouseState::new();
        ms.on_cursor_moved(640.0, 360.0);
        assert_eq!(ms.delta(), Vec2::ZERO);
    }

    #[test]
    fn test_delta_is_difference_between_frames() {
        let mut ms = MouseState::new();
        ms.on_cursor_moved(100.0, 200.0);
        ms.clear_transients();
        ms.on_cursor_moved(110.0, 195.0);
        let d = ms.delta();
        assert!((d.x - 10.0).abs() < f32::EPSILON);
        assert!((d.y - (-5.0)).abs() < f32::EPSILON);
    }

    #[test]
    fn test_leaving_forgets_position() {
        let mut ms = MouseState::new();
        ms.on_cursor_moved(10.0, 10.0);
        ms.on_cursor_left();
        ms.clear_transients();
        ms.on_cursor_moved(500.0, 500.0);
        assert_eq!(ms.delta(), Vec2::ZERO);
    }

    #[test]
    fn test_button_press_and_release_tracked() {
        let mut ms = MouseState::new();
        ms.on_button(MouseButton::Left, ElementState::Pressed);
        assert!(ms.is_button_pressed(MouseButton::Left));
        assert!(ms.just_button_pressed(MouseButton::Left));

        ms.on_button(MouseButton::Left, ElementState::Released);
        assert!(!ms.is_button_pressed(MouseButton::Left));
        assert!(ms.just_button_released(MouseButton::Left));
    }

    #[test]
    fn test_short_travel_is_click() {
        let mut ms = MouseState::new();
        ms.on_cursor_moved(100.0, 100.0);
        ms.on_button(MouseButton::Left, ElementState::Pressed);
        ms.on_cursor_moved(101.0, 101.0);
        ms.on_button(MouseButton::Left, ElementState::Released);
        assert!(ms.is_click(MouseButton::Left));
    }

    #[test]
    fn test_drag_is_not_click() {
        let mut ms = MouseState::new();
        ms.on_cursor_moved(100.0, 100.0);
        ms.on_button(MouseButton::Left, ElementState::Pressed);
        ms.on_cursor_moved(160.0, 100.0);
        // Returning to the start still counts as a drag.
        ms.on_cursor_moved(100.0, 100.0);
        ms.on_button(MouseButton::Left, ElementState::Released);
        assert!(!ms.is_click(MouseButton::Left));
    }

    #[test]
    fn test_scroll_accumulates_within_frame() {
        let mut ms = MouseState::new();
        ms.on_scroll(MouseScrollDelta::LineDelta(0.0, 1.0));
        ms.on_scroll(MouseScrollDelta::LineDelta(0.0, 0.5));
        assert!((ms.scroll() - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_pixel_scroll_normalized() {
        let mut ms = MouseState::new();
        ms.on_scroll(MouseScrollDelta::PixelDelta(
            winit::dpi::PhysicalPosition::new(0.0, 80.0),
        ));
        assert!((ms.scroll() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_transients_reset_after_clear() {
        let mut ms = MouseState::new();
        ms.on_cursor_moved(50.0, 50.0);
        ms.on_cursor_moved(60.0, 50.0);
        ms.on_scroll(MouseScrollDelta::LineDelta(0.0, 1.0));
        ms.on_button(MouseButton::Right, ElementState::Pressed);
        ms.clear_transients();
        assert_eq!(ms.delta(), Vec2::ZERO);
        assert_eq!(ms.scroll(), 0.0);
        assert!(!ms.moved());
        assert!(!ms.just_button_pressed(MouseButton::Right));
        assert!(ms.is_button_pressed(MouseButton::Right));
    }

    #[test]
    fn test_cursor_enter_leave() {
        let mut ms = MouseState::new();
        ms.on_cursor_entered();
        assert!(ms.is_cursor_in_window());
        ms.on_cursor_left();
        assert!(!ms.is_cursor_in_window());
    }
}
