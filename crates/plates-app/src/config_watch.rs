//! Polling of `config.ron` for edits made while the window is open.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use plates_config::{CliArgs, Config, ConfigError};

use crate::settings::scene_settings;

/// How often the config file is re-read.
pub const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Re-reads the config file on an interval and re-applies the command-line
/// overrides to whatever it finds.
#[derive(Debug)]
pub struct ConfigWatch {
    config_dir: PathBuf,
    /// The file contents as last read, before overrides.
    on_disk: Config,
    overrides: CliArgs,
    last_poll: Instant,
}

impl ConfigWatch {
    pub fn new(config_dir: impl Into<PathBuf>, on_disk: Config, overrides: CliArgs) -> Self {
        Self {
            config_dir: config_dir.into(),
            on_disk,
            overrides,
            last_poll: Instant::now(),
        }
    }

    /// The effective config if the file changed since the last poll. Does
    /// nothing until [`CONFIG_POLL_INTERVAL`] has passed.
    pub fn poll(&mut self, now: Instant) -> Result<Option<Config>, ConfigError> {
        if now.duration_since(self.last_poll) < CONFIG_POLL_INTERVAL {
            return Ok(None);
        }
        self.last_poll = now;

        let Some(on_disk) = self.on_disk.reload(&self.config_dir)? else {
            return Ok(None);
        };
        let mut effective = on_disk.clone();
        effective.apply_cli_overrides(&self.overrides);
        self.on_disk = on_disk;
        Ok(Some(effective))
    }
}

/// Whether switching from `old` to `new` changes what gets mounted.
pub fn needs_remount(old: &Config, new: &Config) -> bool {
    scene_settings(old) != scene_settings(new) || old.assets != new.assets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watch_in(dir: &std::path::Path, overrides: CliArgs) -> (ConfigWatch, Instant) {
        let config = Config::default();
        config.save(dir).unwrap();
        let watch = ConfigWatch::new(dir, config, overrides);
        let start = watch.last_poll;
        (watch, start)
    }

    #[test]
    fn test_edit_is_picked_up_after_interval() {
        let dir = tempfile::tempdir().unwrap();
        let (mut watch, start) = watch_in(dir.path(), CliArgs::default());

        let mut edited = Config::default();
        edited.plates.count = 3;
        edited.save(dir.path()).unwrap();

        assert!(watch.poll(start).unwrap().is_none());
        let reloaded = watch.poll(start + CONFIG_POLL_INTERVAL).unwrap().unwrap();
        assert_eq!(reloaded.plates.count, 3);

        // Same contents on the next poll.
        let later = start + 2 * CONFIG_POLL_INTERVAL;
        assert!(watch.poll(later).unwrap().is_none());
    }

    #[test]
    fn test_overrides_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = CliArgs {
            spacing: Some(1.0),
            ..CliArgs::default()
        };
        let (mut watch, start) = watch_in(dir.path(), overrides);

        let mut edited = Config::default();
        edited.plates.count = 5;
        edited.plates.spacing = 0.5;
        edited.save(dir.path()).unwrap();

        let reloaded = watch.poll(start + CONFIG_POLL_INTERVAL).unwrap().unwrap();
        assert_eq!(reloaded.plates.count, 5);
        assert_eq!(reloaded.plates.spacing, 1.0);
    }

    #[test]
    fn test_broken_file_is_an_error_and_keeps_last_good() {
        let dir = tempfile::tempdir().unwrap();
        let (mut watch, start) = watch_in(dir.path(), CliArgs::default());

        std::fs::write(dir.path().join("config.ron"), "(plates: (count: ").unwrap();
        assert!(matches!(
            watch.poll(start + CONFIG_POLL_INTERVAL),
            Err(ConfigError::Parse { .. })
        ));
        assert_eq!(watch.on_disk, Config::default());
    }

    #[test]
    fn test_scene_changes_need_remount() {
        let old = Config::default();

        let mut layout = old.clone();
        layout.plates.count = 2;
        assert!(needs_remount(&old, &layout));

        let mut post = old.clone();
        post.post.enabled = false;
        assert!(needs_remount(&old, &post));

        let mut assets = old.clone();
        assets.assets.procedural_size = 64;
        assert!(needs_remount(&old, &assets));

        let mut input = old.clone();
        input.input.invert_y = true;
        input.debug.log_frame_stats = !old.debug.log_frame_stats;
        assert!(!needs_remount(&old, &input));
    }
}
