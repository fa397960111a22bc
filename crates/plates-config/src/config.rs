//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    /// Plate count, spacing and motion constants.
    pub plates: PlateRowConfig,
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
    /// Floor and sky dome.
    pub environment: EnvironmentConfig,
    /// Bloom and film passes.
    pub post: PostConfig,
    /// Where textures come from.
    pub assets: AssetsConfig,
    /// Orbit control tuning.
    pub input: InputConfig,
    pub animation: AnimationConfig,
    pub debug: DebugConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in logical pixels.
    pub width: u32,
    /// Window height in logical pixels.
    pub height: u32,
    /// Start in borderless fullscreen.
    pub fullscreen: bool,
    /// Enable vsync (PresentMode::Fifo).
    pub vsync: bool,
    pub title: String,
}

/// The plate row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlateRowConfig {
    /// Number of plates. Zero or negative still shows one.
    pub count: i64,
    /// Gap between neighbouring plates.
    pub spacing: f32,
    pub plate_width: f32,
    pub plate_height: f32,
    pub plate_depth: f32,
    /// Initial tilt added per plate index (radians).
    pub rotation_step: f32,
    /// Rotation per frame of the first plate (radians).
    pub base_speed: f32,
    /// Rotation per frame added for each following plate.
    pub speed_increment: f32,
}

/// Perspective camera and orbit controls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub orbit_controls: bool,
}

/// Light intensities and positions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient_intensity: f32,
    pub point_intensity: f32,
    pub point_position: [f32; 3],
    pub spot_intensity: f32,
    pub spot_position: [f32; 3],
}

/// Floor plane and sky dome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Height of both the floor and the sky dome's center.
    pub floor_y: f32,
    /// Edge length of the square floor.
    pub ground_size: f32,
    /// How often the floor's color map repeats across it.
    pub ground_repeat: [f32; 2],
    pub sky_radius: f32,
    pub sky_segments: u32,
}

/// Post-processing chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PostConfig {
    pub enabled: bool,
    /// `(strength, kernel size, sigma, resolution)`.
    pub bloom: [f32; 4],
    /// `(noise intensity, scanline intensity, scanline count, grayscale)`.
    pub film: [f32; 4],
}

/// Which texture source the scene decodes from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum TextureSourceKind {
    /// JPEG/PNG files under [`AssetsConfig::texture_dir`].
    #[default]
    Files,
    /// Generated in memory; no files needed.
    Procedural,
}

/// Texture assets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory holding the texture images. Relative paths resolve
    /// against the working directory.
    pub texture_dir: PathBuf,
    pub source: TextureSourceKind,
    /// Edge length of generated textures.
    pub procedural_size: u32,
    /// Number of background decode threads.
    pub decode_threads: usize,
}

/// Orbit control tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    /// Invert vertical drag when orbiting.
    pub invert_y: bool,
    pub min_distance: f32,
    pub max_distance: f32,
}

/// How plate rotation is stepped.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum AnimationMode {
    /// One rotation step per rendered frame.
    #[default]
    PerFrame,
    /// One rotation step per fixed 60 Hz tick, independent of frame rate.
    FixedStep,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    pub mode: AnimationMode,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Periodically log frame timing.
    pub log_frame_stats: bool,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fullscreen: false,
            vsync: true,
            title: "Plates".to_string(),
        }
    }
}

impl Default for PlateRowConfig {
    fn default() -> Self {
        Self {
            count: 80,
            spacing: 0.04,
            plate_width: 0.25,
            plate_height: 5.0,
            plate_depth: 5.0,
            rotation_step: 0.04,
            base_speed: 0.01,
            speed_increment: 0.000_01,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 0.0, 10.0],
            orbit_controls: true,
        }
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_intensity: 0.15,
            point_intensity: 0.15,
            point_position: [0.0, 0.0, 0.0],
            spot_intensity: 0.1,
            spot_position: [20.0, 100.0, 20.0],
        }
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            floor_y: -12.0,
            ground_size: 200.0,
            ground_repeat: [1.0, 1.0],
            sky_radius: 100.0,
            sky_segments: 16,
        }
    }
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bloom: [1.0, 25.0, 4.0, 256.0],
            film: [0.25, 0.1, 900.0, 0.0],
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            texture_dir: PathBuf::from("assets/textures"),
            source: TextureSourceKind::Files,
            procedural_size: 512,
            decode_threads: 2,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            invert_y: false,
            min_distance: 0.0,
            max_distance: 500.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_frame_stats: false,
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Default config directory for this user, if the OS exposes one.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|base| base.join("plates"))
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = read_config(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(write_error(config_dir))?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let serialized = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        let config_path = config_dir.join(CONFIG_FILE);
        std::fs::write(&config_path, serialized).map_err(write_error(&config_path))?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = read_config(&config_dir.join(CONFIG_FILE))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

fn write_error(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError {
    let path = path.to_path_buf();
    move |source| ConfigError::Write { path, source }
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
