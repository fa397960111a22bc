//! The `plates` application: window and event loop, frame drive of the
//! mounted scene, and startup plumbing for the binary.

pub mod config_watch;
pub mod error;
pub mod game_loop;
pub mod platform;
pub mod settings;
pub mod window;

pub use config_watch::ConfigWatch;
pub use error::AppError;
pub use platform::{PlatformDirs, PlatformError};
pub use window::{AppState, run_with_config};

use plates_config::{CliArgs, Config};
use tracing::info;

/// Resolve directories, load the config with CLI overrides, install logging
/// and run the window until it closes, watching the config file for edits.
pub fn run(args: &CliArgs) -> Result<(), AppError> {
    let mut dirs = PlatformDirs::resolve()?;
    if let Some(config_dir) = &args.config {
        dirs = dirs.with_config_dir(config_dir);
    }
    dirs.create_dirs()?;

    let on_disk = Config::load_or_create(&dirs.config_dir)?;
    let mut config = on_disk.clone();
    config.apply_cli_overrides(args);

    plates_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config))?;
    info!(
        config = %dirs.config_dir.display(),
        logs = %dirs.log_dir.display(),
        "Starting plates"
    );
    info!(
        "{} plates, spacing {}, textures from {:?}",
        config.plates.count, config.plates.spacing, config.assets.source
    );

    let watch = ConfigWatch::new(&dirs.config_dir, on_disk, args.clone());
    run_with_config(config, Some(watch))
}
