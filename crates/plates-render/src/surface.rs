//! Window surface size tracking.
//!
//! Wayland may report a zero-size window before the compositor assigns one,
//! and moving between displays changes the scale factor. [`SurfaceWrapper`]
//! keeps the physical size clamped to at least 1×1 and reports a change only
//! when the GPU-facing size actually differs.

pub const MIN_SURFACE_DIMENSION: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhysicalSize {
    pub width: u32,
    pub height: u32,
}

impl PhysicalSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(MIN_SURFACE_DIMENSION),
            height: height.max(MIN_SURFACE_DIMENSION),
        }
    }

    /// Width over height.
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Tracks the surface's physical size and scale factor.
#[derive(Clone, Debug)]
pub struct SurfaceWrapper {
    size: PhysicalSize,
    scale_factor: f64,
    /// Set once a non-zero size has been seen.
    configured: bool,
}

impl SurfaceWrapper {
    pub fn new(physical_width: u32, physical_height: u32, scale_factor: f64) -> Self {
        Self {
            size: PhysicalSize::new(physical_width, physical_height),
            scale_factor,
            configured: physical_width > 0 && physical_height > 0,
        }
    }

    /// Record a resize. Returns the new size if it differs from the old one.
    pub fn handle_resize(&mut self, physical_width: u32, physical_height: u32) -> Option<PhysicalSize> {
        let size = PhysicalSize::new(physical_width, physical_height);
        if physical_width > 0 && physical_height > 0 {
            self.configured = true;
        }
        if size == self.size {
            return None;
        }
        self.size = size;
        Some(size)
    }

    /// Record a scale factor change together with the physical size winit
    /// reports for it.
    pub fn handle_scale_factor_changed(
        &mut self,
        scale_factor: f64,
        physical_width: u32,
        physical_height: u32,
    ) -> Option<PhysicalSize> {
        self.scale_factor = scale_factor;
        self.handle_resize(physical_width, physical_height)
    }

    pub fn physical_size(&self) -> PhysicalSize {
        self.size
    }

    /// Size in logical pixels.
    pub fn logical_size(&self) -> (f64, f64) {
        (
            self.size.width as f64 / self.scale_factor,
            self.size.height as f64 / self.scale_factor,
        )
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.size.aspect_ratio()
    }

    /// Whether the compositor has assigned a real size yet.
    pub fn is_configured(&self) -> bool {
        self.configured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_size_clamped_and_unconfigured() {
        let wrapper = SurfaceWrapper::new(0, 0, 1.0);
        assert_eq!(wrapper.physical_size(), PhysicalSize { width: 1, height: 1 });
        assert!(!wrapper.is_configured());
    }

    #[test]
    fn test_first_real_resize_configures() {
        let mut wrapper = SurfaceWrapper::new(0, 0, 1.0);
        let size = wrapper.handle_resize(1280, 720);
        assert_eq!(size, Some(PhysicalSize { width: 1280, height: 720 }));
        assert!(wrapper.is_configured());
    }

    #[test]
    fn test_same_size_reports_nothing() {
        let mut wrapper = SurfaceWrapper::new(1280, 720, 1.0);
        assert_eq!(wrapper.handle_resize(1280, 720), None);
    }

    #[test]
    fn test_minimize_clamps_to_one() {
        let mut wrapper = SurfaceWrapper::new(800, 600, 1.0);
        assert_eq!(
            wrapper.handle_resize(0, 0),
            Some(PhysicalSize { width: 1, height: 1 })
        );
        assert!(wrapper.is_configured());
    }

    #[test]
    fn test_scale_factor_change() {
        let mut wrapper = SurfaceWrapper::new(1280, 720, 1.0);
        let size = wrapper.handle_scale_factor_changed(2.0, 2560, 1440);
        assert_eq!(size, Some(PhysicalSize { width: 2560, height: 1440 }));
        assert_eq!(wrapper.scale_factor(), 2.0);
        let (w, h) = wrapper.logical_size();
        assert!((w - 1280.0).abs() < 1e-9);
        assert!((h - 720.0).abs() < 1e-9);
    }

    #[test]
    fn test_aspect_ratio() {
        let wrapper = SurfaceWrapper::new(1920, 1080, 1.0);
        assert!((wrapper.aspect_ratio() - 16.0 / 9.0).abs() < 1e-6);
    }
}
