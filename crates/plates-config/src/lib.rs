//! Configuration for the plate row demo.
//!
//! Settings persist to disk as a RON file, can be overridden from the
//! command line, and are re-read on demand for hot-reload.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    AnimationConfig, AnimationMode, AssetsConfig, CameraConfig, Config, DebugConfig,
    EnvironmentConfig, InputConfig, LightingConfig, PlateRowConfig, PostConfig, TextureSourceKind,
    WindowConfig,
};
pub use error::ConfigError;
