use plates_config::ConfigError;
use plates_render::{GpuTextureError, RenderContextError, SurfaceError};
use plates_scene::TextureError;

use crate::platform::PlatformError;

/// Anything that stops the application.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to install log subscriber: {0}")]
    Logging(#[from] plates_log::TryInitError),

    #[error("event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("GPU initialization failed: {0}")]
    Gpu(#[from] RenderContextError),

    #[error("texture acquisition failed: {0}")]
    Texture(#[from] TextureError),

    #[error("texture upload failed: {0}")]
    GpuTexture(#[from] GpuTextureError),

    #[error("presentation failed: {0}")]
    Surface(#[from] SurfaceError),
}
