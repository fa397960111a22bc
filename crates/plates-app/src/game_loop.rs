//! Fixed 60 Hz stepping for the `FixedStep` animation mode.
//!
//! Wall-clock time is accumulated and drained in whole ticks, so plate
//! rotation speed no longer depends on the display's refresh rate.

use std::time::Instant;
use tracing::warn;

/// Simulation step: 60 Hz.
pub const FIXED_DT: f64 = 1.0 / 60.0;

/// Frames longer than this are clamped; the animation slows down instead of
/// replaying a burst of catch-up ticks after a stall.
pub const MAX_FRAME_TIME: f64 = 0.25;

/// Accumulator-based fixed-step clock.
#[derive(Debug)]
pub struct GameLoop {
    previous_time: Instant,
    accumulator: f64,
    total_sim_time: f64,
    update_count: u64,
}

impl GameLoop {
    pub fn new() -> Self {
        Self {
            previous_time: Instant::now(),
            accumulator: 0.0,
            total_sim_time: 0.0,
            update_count: 0,
        }
    }

    /// Measure the time since the previous call and run the ticks it covers.
    /// Returns the number of ticks run.
    pub fn tick(&mut self, update_fn: impl FnMut(f64)) -> u32 {
        let now = Instant::now();
        let frame_time = now.duration_since(self.previous_time).as_secs_f64();
        self.previous_time = now;
        self.advance(frame_time, update_fn)
    }

    /// Run the ticks covered by an explicit `frame_time` in seconds.
    pub fn advance(&mut self, frame_time: f64, mut update_fn: impl FnMut(f64)) -> u32 {
        let frame_time = if frame_time > MAX_FRAME_TIME {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                frame_time * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
            MAX_FRAME_TIME
        } else {
            frame_time.max(0.0)
        };

        self.accumulator += frame_time;

        let mut steps = 0;
        while self.accumulator >= FIXED_DT {
            update_fn(FIXED_DT);
            self.total_sim_time += FIXED_DT;
            self.accumulator -= FIXED_DT;
            self.update_count += 1;
            steps += 1;
        }
        steps
    }

    /// Restart the clock from now and drop any partial tick, so time spent
    /// before the scene existed is not replayed.
    pub fn reset(&mut self) {
        self.previous_time = Instant::now();
        self.accumulator = 0.0;
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn total_sim_time(&self) -> f64 {
        self.total_sim_time
    }
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_dt_value() {
        assert!((FIXED_DT - 1.0 / 60.0).abs() < f64::EPSILON * 10.0);
    }

    #[test]
    fn test_single_step() {
        let mut game_loop = GameLoop::new();
        let mut updates = 0;
        assert_eq!(game_loop.advance(FIXED_DT, |_| updates += 1), 1);
        assert_eq!(updates, 1);
        assert_eq!(game_loop.advance(0.0, |_| updates += 1), 0);
    }

    #[test]
    fn test_multiple_steps() {
        let mut game_loop = GameLoop::new();
        let steps = game_loop.advance(3.0 * FIXED_DT + 1e-9, |dt| {
            assert!((dt - FIXED_DT).abs() < f64::EPSILON);
        });
        assert_eq!(steps, 3);
        assert!((game_loop.total_sim_time() - 3.0 * FIXED_DT).abs() < 1e-12);
    }

    #[test]
    fn test_partial_step_accumulates() {
        let mut game_loop = GameLoop::new();
        assert_eq!(game_loop.advance(0.5 * FIXED_DT, |_| {}), 0);
        assert_eq!(game_loop.advance(0.6 * FIXED_DT, |_| {}), 1);
        // 0.1 of a tick is carried over.
        assert_eq!(game_loop.advance(0.85 * FIXED_DT, |_| {}), 0);
        assert_eq!(game_loop.advance(0.1 * FIXED_DT, |_| {}), 1);
    }

    #[test]
    fn test_reset_drops_partial_tick() {
        let mut game_loop = GameLoop::new();
        assert_eq!(game_loop.advance(0.9 * FIXED_DT, |_| {}), 0);
        game_loop.reset();
        assert_eq!(game_loop.advance(0.2 * FIXED_DT, |_| {}), 0);
    }

    #[test]
    fn test_reset_discards_time_before_scene_was_ready() {
        let mut game_loop = GameLoop::new();
        std::thread::sleep(std::time::Duration::from_millis(100));
        game_loop.reset();
        let mut updates = 0;
        game_loop.tick(|_| updates += 1);
        assert_eq!(updates, 0);
        assert_eq!(game_loop.update_count(), 0);
    }

    #[test]
    fn test_long_frame_is_clamped() {
        let mut game_loop = GameLoop::new();
        let steps = game_loop.advance(1.0, |_| {});
        let max_steps = (MAX_FRAME_TIME / FIXED_DT).ceil() as u32;
        assert!(steps > 0);
        assert!(steps <= max_steps);
    }

    #[test]
    fn test_negative_frame_time_is_ignored() {
        let mut game_loop = GameLoop::new();
        assert_eq!(game_loop.advance(-1.0, |_| {}), 0);
        assert_eq!(game_loop.advance(FIXED_DT, |_| {}), 1);
    }

    #[test]
    fn test_rate_independent_of_frame_rate() {
        // One simulated second at 144 Hz and at 30 Hz runs the same ticks.
        let mut fast = GameLoop::new();
        let mut slow = GameLoop::new();
        for _ in 0..144 {
            fast.advance(1.0 / 144.0, |_| {});
        }
        for _ in 0..30 {
            slow.advance(1.0 / 30.0, |_| {});
        }
        assert!(fast.update_count().abs_diff(60) <= 1);
        assert!(slow.update_count().abs_diff(60) <= 1);
    }

    #[test]
    fn test_default() {
        let game_loop = GameLoop::default();
        assert_eq!(game_loop.update_count(), 0);
        assert_eq!(game_loop.total_sim_time(), 0.0);
    }
}
