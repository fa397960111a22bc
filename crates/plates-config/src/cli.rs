//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::{Config, TextureSourceKind};

/// Plate row demo command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Clone, Debug, Default)]
#[command(name = "plates", about = "A row of rotating wooden plates")]
pub struct CliArgs {
    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Start in fullscreen.
    #[arg(long)]
    pub fullscreen: Option<bool>,

    /// Number of plates (zero or negative shows one).
    #[arg(long, allow_negative_numbers = true)]
    pub count: Option<i64>,

    /// Gap between plates.
    #[arg(long, allow_negative_numbers = true)]
    pub spacing: Option<f32>,

    /// Directory containing the texture images.
    #[arg(long)]
    pub texture_dir: Option<PathBuf>,

    /// Generate textures in memory instead of loading files.
    #[arg(long)]
    pub procedural_textures: bool,

    /// Enable or disable the bloom and film passes.
    #[arg(long)]
    pub post: Option<bool>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(fs) = args.fullscreen {
            self.window.fullscreen = fs;
        }
        if let Some(count) = args.count {
            self.plates.count = count;
        }
        if let Some(spacing) = args.spacing {
            self.plates.spacing = spacing;
        }
        if let Some(ref dir) = args.texture_dir {
            self.assets.texture_dir = dir.clone();
            self.assets.source = TextureSourceKind::Files;
        }
        if args.procedural_textures {
            self.assets.source = TextureSourceKind::Procedural;
        }
        if let Some(post) = args.post {
            self.post.enabled = post;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
