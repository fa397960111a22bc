//! Window creation, event handling and the per-frame drive of the scene.

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec2;
use plates_config::{AnimationMode, Config, TextureSourceKind};
use plates_input::{MouseState, OrbitControls};
use plates_render::{
    Camera, PhysicalSize, RenderContext, SceneRenderer, SurfaceError, SurfaceWrapper,
    init_render_context_blocking, render_clear_frame,
};
use plates_scene::{
    FileTextureSource, Placeholder, PointerDispatcher, ProceduralTextureSource, SceneMount,
    TextureCache, TextureSource, compose_scene,
};
use tracing::{debug, error, info, instrument, warn};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use crate::config_watch::{ConfigWatch, needs_remount};
use crate::error::AppError;
use crate::game_loop::GameLoop;
use crate::settings::{orbit_settings, scene_settings};

/// Seed of the generated stand-in textures.
pub const PROCEDURAL_SEED: u32 = 68;

/// How often frame statistics are logged when enabled.
const FRAME_STATS_INTERVAL: Duration = Duration::from_secs(2);

pub fn window_attributes_from_config(config: &Config) -> WindowAttributes {
    let attrs = WindowAttributes::default()
        .with_title(config.window.title.clone())
        .with_inner_size(LogicalSize::new(
            config.window.width as f64,
            config.window.height as f64,
        ));
    if config.window.fullscreen {
        attrs.with_fullscreen(Some(Fullscreen::Borderless(None)))
    } else {
        attrs
    }
}

/// The texture source selected by the assets config.
pub fn texture_source(config: &Config) -> Arc<dyn TextureSource> {
    match config.assets.source {
        TextureSourceKind::Files => Arc::new(FileTextureSource::new(&config.assets.texture_dir)),
        TextureSourceKind::Procedural => Arc::new(ProceduralTextureSource::new(
            config.assets.procedural_size,
            PROCEDURAL_SEED,
        )),
    }
}

/// Frames-per-second over a sliding window.
#[derive(Debug)]
struct FrameStats {
    window_start: Instant,
    frames: u32,
}

impl FrameStats {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
        }
    }

    /// Count a frame. Returns the average rate once per interval.
    fn record(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.duration_since(self.window_start);
        if elapsed < FRAME_STATS_INTERVAL {
            return None;
        }
        let fps = self.frames as f64 / elapsed.as_secs_f64();
        *self = Self::new(now);
        Some(fps)
    }
}

/// GPU resources for a scene whose textures have all arrived.
struct SceneView {
    renderer: SceneRenderer,
    camera: Camera,
    orbit: Option<OrbitControls>,
}

/// Owns the window, the GPU context, the mounted scene and input state.
pub struct AppState {
    config: Config,
    window: Option<Arc<Window>>,
    gpu: Option<RenderContext>,
    surface_wrapper: SurfaceWrapper,
    mount: Option<SceneMount>,
    placeholder: Placeholder,
    view: Option<SceneView>,
    mouse: MouseState,
    dispatcher: PointerDispatcher,
    game_loop: GameLoop,
    last_frame: Instant,
    frame_stats: FrameStats,
    config_watch: Option<ConfigWatch>,
    fatal: Option<AppError>,
}

impl AppState {
    pub fn with_config(config: Config) -> Self {
        let now = Instant::now();
        Self {
            surface_wrapper: SurfaceWrapper::new(config.window.width, config.window.height, 1.0),
            config,
            window: None,
            gpu: None,
            mount: None,
            placeholder: Placeholder::default(),
            view: None,
            mouse: MouseState::new(),
            dispatcher: PointerDispatcher::new(),
            game_loop: GameLoop::new(),
            last_frame: now,
            frame_stats: FrameStats::new(now),
            config_watch: None,
            fatal: None,
        }
    }

    /// Pick up edits to `config.ron` while running.
    pub fn with_config_watch(mut self, watch: ConfigWatch) -> Self {
        self.config_watch = Some(watch);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn surface_width(&self) -> u32 {
        self.surface_wrapper.physical_size().width
    }

    pub fn surface_height(&self) -> u32 {
        self.surface_wrapper.physical_size().height
    }

    /// Whether textures have arrived and the scene is being drawn.
    pub fn is_scene_ready(&self) -> bool {
        self.view.is_some()
    }

    /// The first fatal error, if the event loop was stopped by one.
    pub fn take_error(&mut self) -> Option<AppError> {
        self.fatal.take()
    }

    fn record_error(&mut self, err: AppError) {
        error!("{err}");
        if self.fatal.is_none() {
            self.fatal = Some(err);
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        self.record_error(err);
        event_loop.exit();
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let window = Arc::new(event_loop.create_window(window_attributes_from_config(&self.config))?);

        let scale_factor = window.scale_factor();
        let inner = window.inner_size();
        self.surface_wrapper = SurfaceWrapper::new(inner.width, inner.height, scale_factor);
        info!(
            "Surface wrapper initialized: {}x{} (scale: {:.2})",
            inner.width, inner.height, scale_factor
        );

        self.gpu = Some(init_render_context_blocking(
            window.clone(),
            self.config.window.vsync,
        )?);
        self.start_mount()?;

        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    /// Compose the scene and start decoding its textures. Drawing stays
    /// suspended until every texture is available.
    fn start_mount(&mut self) -> Result<(), AppError> {
        let description = compose_scene(&scene_settings(&self.config));
        self.placeholder = description.placeholder;

        let source = texture_source(&self.config);
        info!(
            "Acquiring {} textures from {}",
            description.texture_request().len(),
            source.describe()
        );
        let cache = Arc::new(TextureCache::new(source, self.config.assets.decode_threads)?);
        self.mount = Some(SceneMount::mount(description, cache));
        Ok(())
    }

    /// Build GPU resources the first time the mount reports ready.
    fn poll_mount(&mut self) -> Result<(), AppError> {
        if self.view.is_some() {
            return Ok(());
        }
        let (Some(gpu), Some(mount)) = (&self.gpu, &mut self.mount) else {
            return Ok(());
        };
        let Some(scene) = mount.poll()? else {
            return Ok(());
        };

        let size = self.surface_wrapper.physical_size();
        let renderer =
            SceneRenderer::new(&gpu.device, &gpu.queue, gpu.surface_format, size, scene)?;
        let description = scene.description();
        let camera = Camera::from_config(&description.camera, size.aspect_ratio());
        let orbit = description.orbit_controls.then(|| {
            OrbitControls::new(camera.eye, camera.target, orbit_settings(&self.config))
        });

        info!(
            "Scene ready: {} plates, {} textures, {} draw batches",
            scene.plates().len(),
            scene.textures().len(),
            renderer.batches().len()
        );
        self.view = Some(SceneView {
            renderer,
            camera,
            orbit,
        });
        self.game_loop.reset();
        Ok(())
    }

    /// Switch to a reloaded config. Scene changes remount; input changes
    /// retune the orbit controls in place.
    fn apply_config(&mut self, config: Config) -> Result<(), AppError> {
        let remount = needs_remount(&self.config, &config);
        if config.window != self.config.window {
            info!("Window settings take effect on next start");
        }
        self.config = config;

        if remount {
            self.remount()?;
        } else if let Some(orbit) = self.view.as_mut().and_then(|view| view.orbit.as_mut()) {
            orbit.set_settings(orbit_settings(&self.config));
        }
        Ok(())
    }

    /// Drop the current scene and mount one composed from the current config.
    fn remount(&mut self) -> Result<(), AppError> {
        info!("Scene settings changed, remounting");
        self.view = None;
        self.dispatcher = PointerDispatcher::new();
        if let Some(mount) = self.mount.take() {
            mount.unmount();
        }
        if self.gpu.is_some() {
            self.start_mount()?;
        }
        Ok(())
    }

    fn poll_config(&mut self, now: Instant) -> Result<(), AppError> {
        let Some(watch) = &mut self.config_watch else {
            return Ok(());
        };
        match watch.poll(now) {
            Ok(Some(config)) => self.apply_config(config),
            Ok(None) => Ok(()),
            Err(err) => {
                warn!("Keeping previous config: {err}");
                Ok(())
            }
        }
    }

    fn apply_resize(&mut self, size: PhysicalSize) {
        if let Some(gpu) = &mut self.gpu {
            gpu.resize(size.width, size.height);
            if let Some(view) = &mut self.view {
                view.renderer.resize(&gpu.device, size);
                view.camera
                    .set_aspect_ratio(size.width as f32, size.height as f32);
            }
        }
        info!(
            "Window resized to {}x{} (scale: {:.2})",
            size.width,
            size.height,
            self.surface_wrapper.scale_factor()
        );
    }

    fn redraw(&mut self) -> Result<(), AppError> {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.poll_config(now)?;
        self.poll_mount()?;

        let Some(gpu) = &self.gpu else {
            return Ok(());
        };
        let (Some(view), Some(scene)) = (
            &mut self.view,
            self.mount.as_mut().and_then(SceneMount::scene_mut),
        ) else {
            self.mouse.clear_transients();
            return present(render_clear_frame(gpu, self.placeholder));
        };

        match self.config.animation.mode {
            AnimationMode::PerFrame => scene.advance_frame(None),
            AnimationMode::FixedStep => {
                self.game_loop.tick(|_| scene.advance_frame(None));
            }
        }

        let viewport = self.surface_wrapper.physical_size();
        if let Some(orbit) = &mut view.orbit
            && orbit.update(&self.mouse, viewport.height as f32, view.camera.fov_y)
        {
            view.camera.look_at(orbit.eye(), orbit.target());
        }

        let hits = match self.mouse.position() {
            Some(cursor) if self.mouse.is_cursor_in_window() => {
                let viewport = Vec2::new(viewport.width as f32, viewport.height as f32);
                scene.pick(&view.camera.screen_ray(cursor, viewport))
            }
            _ => Vec::new(),
        };
        let mut events = self.dispatcher.pointer_moved(&hits);
        if self.mouse.just_button_pressed(MouseButton::Left) {
            self.dispatcher.button_pressed(&hits);
        }
        if self.mouse.just_button_released(MouseButton::Left) {
            // A drag that orbited the camera is not a click.
            let released: &[usize] = if self.mouse.is_click(MouseButton::Left) {
                &hits
            } else {
                &[]
            };
            events.extend(self.dispatcher.button_released(released));
        }
        if !events.is_empty() {
            debug!("Pointer events: {events:?}");
            scene.dispatch(&events);
        }
        self.mouse.clear_transients();

        let result = view.renderer.render_frame(gpu, &view.camera, scene, dt);

        if self.config.debug.log_frame_stats
            && let Some(fps) = self.frame_stats.record(now)
        {
            info!("{fps:.1} fps");
        }
        present(result)
    }
}

/// A timed-out frame is skipped; anything else is fatal.
fn present(result: Result<(), SurfaceError>) -> Result<(), AppError> {
    match result {
        Err(SurfaceError::Timeout) => {
            warn!("Surface timeout, skipping frame");
            Ok(())
        }
        other => other.map_err(AppError::from),
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.initialize(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.logical_key == Key::Named(NamedKey::Escape) =>
            {
                info!("Escape pressed, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(size) = self
                    .surface_wrapper
                    .handle_resize(new_size.width, new_size.height)
                {
                    self.apply_resize(size);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                let Some(inner) = self.window.as_ref().map(|window| window.inner_size()) else {
                    return;
                };
                if let Some(size) = self.surface_wrapper.handle_scale_factor_changed(
                    scale_factor,
                    inner.width,
                    inner.height,
                ) {
                    self.apply_resize(size);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse.on_cursor_moved(position.x, position.y);
            }
            WindowEvent::CursorEntered { .. } => self.mouse.on_cursor_entered(),
            WindowEvent::CursorLeft { .. } => {
                self.mouse.on_cursor_left();
                let events = self.dispatcher.pointer_left();
                if let Some(scene) = self.mount.as_mut().and_then(SceneMount::scene_mut) {
                    scene.dispatch(&events);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => self.mouse.on_button(button, state),
            WindowEvent::MouseWheel { delta, .. } => self.mouse.on_scroll(delta),
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    self.fail(event_loop, err);
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // GPU resources go before the device; the texture cache goes with the mount.
        self.view = None;
        if let Some(mount) = self.mount.take() {
            mount.unmount();
        }
        info!("Scene unmounted");
    }
}

/// Create an event loop and run until the window closes.
///
/// Returns the error that stopped the loop, if any.
#[instrument(skip_all)]
pub fn run_with_config(config: Config, watch: Option<ConfigWatch>) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    let mut app = AppState::with_config(config);
    if let Some(watch) = watch {
        app = app.with_config_watch(watch);
    }
    event_loop.run_app(&mut app)?;
    app.take_error().map_or(Ok(()), Err)
}
