//! Light uniform packing and the attenuation terms the standard shader uses.
//!
//! Ambient lights add up. Point and spot lights are packed into fixed arrays;
//! extras beyond the array size are dropped with a warning. Light colors are
//! premultiplied by intensity.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use plates_scene::Light;

pub const MAX_POINT_LIGHTS: usize = 4;
pub const MAX_SPOT_LIGHTS: usize = 4;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PointLightRaw {
    /// xyz position, w cutoff distance (0 = none).
    pub position: [f32; 4],
    /// rgb radiance, w decay exponent.
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SpotLightRaw {
    /// xyz position, w cutoff distance (0 = none).
    pub position: [f32; 4],
    /// xyz unit direction toward the target, w cosine of the cone angle.
    pub direction: [f32; 4],
    /// rgb radiance, w decay exponent.
    pub color: [f32; 4],
    /// x cosine where the penumbra ends.
    pub cone: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct LightsUniform {
    pub ambient: [f32; 4],
    /// x point count, y spot count.
    pub counts: [u32; 4],
    pub points: [PointLightRaw; MAX_POINT_LIGHTS],
    pub spots: [SpotLightRaw; MAX_SPOT_LIGHTS],
}

impl Default for LightsUniform {
    fn default() -> Self {
        Self::zeroed()
    }
}

fn radiance(color: [f32; 3], intensity: f32) -> Vec3 {
    Vec3::from(color) * intensity
}

impl LightsUniform {
    pub fn from_lights<'a>(lights: impl IntoIterator<Item = &'a Light>) -> Self {
        let mut uniform = Self::default();
        let mut ambient = Vec3::ZERO;
        let (mut points, mut spots) = (0usize, 0usize);

        for light in lights {
            match *light {
                Light::Ambient { color, intensity } => ambient += radiance(color, intensity),
                Light::Point {
                    color,
                    intensity,
                    position,
                    distance,
                    decay,
                } => {
                    let Some(slot) = uniform.points.get_mut(points) else {
                        log::warn!("More than {MAX_POINT_LIGHTS} point lights, ignoring the rest");
                        continue;
                    };
                    *slot = PointLightRaw {
                        position: position.extend(distance).to_array(),
                        color: radiance(color, intensity).extend(decay).to_array(),
                    };
                    points += 1;
                }
                Light::Spot {
                    color,
                    intensity,
                    position,
                    target,
                    angle,
                    penumbra,
                    distance,
                    decay,
                } => {
                    let Some(slot) = uniform.spots.get_mut(spots) else {
                        log::warn!("More than {MAX_SPOT_LIGHTS} spot lights, ignoring the rest");
                        continue;
                    };
                    let direction = (target - position).normalize_or_zero();
                    *slot = SpotLightRaw {
                        position: position.extend(distance).to_array(),
                        direction: direction.extend(angle.cos()).to_array(),
                        color: radiance(color, intensity).extend(decay).to_array(),
                        cone: [(angle * (1.0 - penumbra)).cos(), 0.0, 0.0, 0.0],
                    };
                    spots += 1;
                }
            }
        }

        uniform.ambient = ambient.extend(0.0).to_array();
        uniform.counts = [points as u32, spots as u32, 0, 0];
        uniform
    }

    pub fn point_count(&self) -> usize {
        self.counts[0] as usize
    }

    pub fn spot_count(&self) -> usize {
        self.counts[1] as usize
    }
}

/// Falloff with distance. Without a cutoff the light does not fade.
pub fn distance_attenuation(distance: f32, cutoff: f32, decay: f32) -> f32 {
    if cutoff > 0.0 && decay > 0.0 {
        (1.0 - distance / cutoff).clamp(0.0, 1.0).powf(decay)
    } else {
        1.0
    }
}

/// Cone falloff for a spot light. `cos_angle` is between the spot axis and
/// the direction to the shaded point. With no penumbra the edge is hard.
pub fn spot_attenuation(cos_angle: f32, cos_outer: f32, cos_inner: f32) -> f32 {
    if cos_inner - cos_outer <= 1e-5 {
        return if cos_angle >= cos_outer { 1.0 } else { 0.0 };
    }
    let t = ((cos_angle - cos_outer) / (cos_inner - cos_outer)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// WGSL mirror of [`LightsUniform`], [`distance_attenuation`] and
/// [`spot_attenuation`].
pub const LIGHTS_WGSL: &str = r#"
struct PointLight {
    position: vec4<f32>,
    color: vec4<f32>,
};

struct SpotLight {
    position: vec4<f32>,
    direction: vec4<f32>,
    color: vec4<f32>,
    cone: vec4<f32>,
};

struct Lights {
    ambient: vec4<f32>,
    counts: vec4<u32>,
    points: array<PointLight, 4>,
    spots: array<SpotLight, 4>,
};

fn distance_attenuation(distance: f32, cutoff: f32, decay: f32) -> f32 {
    if (cutoff > 0.0 && decay > 0.0) {
        return pow(clamp(1.0 - distance / cutoff, 0.0, 1.0), decay);
    }
    return 1.0;
}

fn spot_attenuation(cos_angle: f32, cos_outer: f32, cos_inner: f32) -> f32 {
    if (cos_inner - cos_outer <= 1e-5) {
        return select(0.0, 1.0, cos_angle >= cos_outer);
    }
    return smoothstep(cos_outer, cos_inner, cos_angle);
}
"#;
