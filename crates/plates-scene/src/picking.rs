//! Pointer picking against plates and pointer-event dispatch.

use std::collections::BTreeSet;

use glam::{Mat4, Vec3};

use crate::plate::{PlateInstance, PointerEvent};

/// A half-line in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Distance along `ray` to the box `[-half_extents, half_extents]` placed by
/// `model`, or `None` if the ray misses. A ray starting inside hits at the
/// exit point.
pub fn intersect_box(ray: &Ray, model: &Mat4, half_extents: Vec3) -> Option<f32> {
    let inverse = model.inverse();
    if !inverse.is_finite() {
        return None;
    }
    // Parameter t stays in world units: the local direction is not renormalized.
    let origin = inverse.transform_point3(ray.origin);
    let direction = inverse.transform_vector3(ray.direction);

    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;
    for axis in 0..3 {
        let (o, d, h) = (origin[axis], direction[axis], half_extents[axis]);
        if d.abs() < f32::EPSILON {
            if o < -h || o > h {
                return None;
            }
            continue;
        }
        let t0 = (-h - o) / d;
        let t1 = (h - o) / d;
        t_near = t_near.max(t0.min(t1));
        t_far = t_far.min(t0.max(t1));
        if t_near > t_far {
            return None;
        }
    }

    if t_far < 0.0 {
        None
    } else if t_near >= 0.0 {
        Some(t_near)
    } else {
        Some(t_far)
    }
}

/// Every plate hit by `ray`, nearest first, as `(index, distance)`.
pub fn pick_plates(ray: &Ray, plates: &[PlateInstance]) -> Vec<(usize, f32)> {
    let mut hits: Vec<(usize, f32)> = plates
        .iter()
        .filter_map(|plate| {
            intersect_box(ray, &plate.model_matrix(), plate.half_extents())
                .map(|t| (plate.index(), t))
        })
        .collect();
    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits
}

/// Turns per-frame hit sets into enter, leave and click events.
///
/// Events are not stopped at the nearest object: every plate under the
/// pointer is hovered. A click is delivered on release to the plates hit at
/// both press and release.
#[derive(Debug, Default)]
pub struct PointerDispatcher {
    hovered: BTreeSet<usize>,
    pressed: Option<BTreeSet<usize>>,
}

impl PointerDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hovered(&self) -> impl Iterator<Item = usize> + '_ {
        self.hovered.iter().copied()
    }

    /// Update the hovered set from the plates currently under the pointer.
    pub fn pointer_moved(&mut self, hits: &[usize]) -> Vec<(usize, PointerEvent)> {
        let now: BTreeSet<usize> = hits.iter().copied().collect();
        let mut events: Vec<(usize, PointerEvent)> = self
            .hovered
            .difference(&now)
            .map(|&index| (index, PointerEvent::Leave))
            .collect();
        events.extend(
            now.difference(&self.hovered)
                .map(|&index| (index, PointerEvent::Enter)),
        );
        self.hovered = now;
        events
    }

    /// The pointer left the window: everything hovered gets a leave.
    pub fn pointer_left(&mut self) -> Vec<(usize, PointerEvent)> {
        self.pressed = None;
        std::mem::take(&mut self.hovered)
            .into_iter()
            .map(|index| (index, PointerEvent::Leave))
            .collect()
    }

    pub fn button_pressed(&mut self, hits: &[usize]) {
        self.pressed = Some(hits.iter().copied().collect());
    }

    pub fn button_released(&mut self, hits: &[usize]) -> Vec<(usize, PointerEvent)> {
        let Some(pressed) = self.pressed.take() else {
            return Vec::new();
        };
        let released: BTreeSet<usize> = hits.iter().copied().collect();
        pressed
            .intersection(&released)
            .map(|&index| (index, PointerEvent::Click))
            .collect()
    }
}
