//! Translation from the persisted [`Config`] to scene and input settings.

use glam::Vec3;
use plates_config::Config;
use plates_input::OrbitSettings;
use plates_scene::{
    BloomParams, CameraConfig, FilmParams, LayoutConfig, LayoutConstants, SceneSettings,
};

/// Scene composition inputs for `config`.
pub fn scene_settings(config: &Config) -> SceneSettings {
    let plates = &config.plates;
    let environment = &config.environment;
    let lighting = &config.lighting;

    SceneSettings {
        layout: LayoutConfig {
            count: plates.count,
            spacing: plates.spacing,
        },
        constants: LayoutConstants {
            plate_width: plates.plate_width,
            rotation_step: plates.rotation_step,
            base_speed: plates.base_speed,
            speed_increment: plates.speed_increment,
        },
        camera: CameraConfig {
            fov_degrees: config.camera.fov_degrees,
            near: config.camera.near,
            far: config.camera.far,
            position: Vec3::from_array(config.camera.position),
        },
        orbit_controls: config.camera.orbit_controls,
        ambient_intensity: lighting.ambient_intensity,
        point_intensity: lighting.point_intensity,
        point_position: Vec3::from_array(lighting.point_position),
        spot_intensity: lighting.spot_intensity,
        spot_position: Vec3::from_array(lighting.spot_position),
        plate_height: plates.plate_height,
        plate_depth: plates.plate_depth,
        ground_size: environment.ground_size,
        ground_repeat: environment.ground_repeat,
        floor_y: environment.floor_y,
        sky_radius: environment.sky_radius,
        sky_segments: environment.sky_segments,
        post_enabled: config.post.enabled,
        bloom: BloomParams::from_tuple(config.post.bloom),
        film: FilmParams::from_tuple(config.post.film),
    }
}

pub fn orbit_settings(config: &Config) -> OrbitSettings {
    let input = &config.input;
    OrbitSettings {
        rotate_speed: input.rotate_speed,
        zoom_speed: input.zoom_speed,
        pan_speed: input.pan_speed,
        invert_y: input.invert_y,
        min_distance: input.min_distance,
        max_distance: input.max_distance,
    }
}
