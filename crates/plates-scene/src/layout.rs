//! Procedural layout of the plate row.
//!
//! [`generate_layout`] maps a [`LayoutConfig`] to one [`PlacementSpec`] per
//! plate. Tilt and angular speed both grow linearly with the plate index,
//! which is what produces the wave running along the row.

/// Width of a single plate along X, in world units.
pub const PLATE_WIDTH: f32 = 0.25;
/// Extra tilt (radians) applied per plate index.
pub const BASE_ROTATION_STEP: f32 = 0.04;
/// Rotation advance per frame of the first plate (radians).
pub const BASE_SPEED: f32 = 0.01;
/// Additional rotation advance per frame for each subsequent plate.
pub const SPEED_INCREMENT: f32 = 0.000_01;

/// Number of plates and the gap between them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutConfig {
    /// Requested plate count. Zero or negative still yields one plate.
    pub count: i64,
    /// Gap between neighbouring plates. Negative values are accepted and
    /// simply make the plates overlap.
    pub spacing: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            count: 80,
            spacing: 0.04,
        }
    }
}

impl LayoutConfig {
    /// Number of placements [`generate_layout`] produces for this config.
    pub fn effective_count(&self) -> usize {
        if self.count > 0 {
            self.count as usize
        } else {
            1
        }
    }
}

/// Tunable constants of the layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutConstants {
    /// Plate width along X.
    pub plate_width: f32,
    /// Tilt added per index.
    pub rotation_step: f32,
    /// Angular speed of plate 0.
    pub base_speed: f32,
    /// Angular speed added per index.
    pub speed_increment: f32,
}

impl Default for LayoutConstants {
    fn default() -> Self {
        Self {
            plate_width: PLATE_WIDTH,
            rotation_step: BASE_ROTATION_STEP,
            base_speed: BASE_SPEED,
            speed_increment: SPEED_INCREMENT,
        }
    }
}

/// Placement and motion parameters for one plate. Immutable once generated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementSpec {
    /// Center of the plate along X.
    pub position_x: f32,
    /// Initial tilt around X, in radians.
    pub rotation_x: f32,
    /// Rotation added around X every frame, in radians.
    pub angular_speed: f32,
}

/// Generate the plate row with the default constants.
pub fn generate_layout(config: &LayoutConfig) -> Vec<PlacementSpec> {
    generate_layout_with(config, &LayoutConstants::default())
}

/// Generate the plate row with explicit constants.
///
/// The row is centered on `x = 0` with a uniform stride of
/// `plate_width + spacing` between plate centers.
pub fn generate_layout_with(
    config: &LayoutConfig,
    constants: &LayoutConstants,
) -> Vec<PlacementSpec> {
    let count = config.effective_count();
    let stride = constants.plate_width + config.spacing;
    let start_x = -((count - 1) as f32 * stride) / 2.0;

    (0..count)
        .map(|i| {
            let index = i as f32;
            PlacementSpec {
                position_x: start_x + index * stride,
                rotation_x: index * constants.rotation_step,
                angular_speed: constants.base_speed + constants.speed_increment * index,
            }
        })
        .collect()
}
