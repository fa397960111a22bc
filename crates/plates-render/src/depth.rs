//! Reverse-Z depth buffer.
//!
//! The near plane maps to 1.0 and the far plane to 0.0, so the buffer is
//! cleared to 0.0 and closer fragments win with `GreaterEqual`.

use crate::surface::PhysicalSize;

pub struct DepthBuffer {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    size: PhysicalSize,
}

impl DepthBuffer {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// The far plane.
    pub const CLEAR_VALUE: f32 = 0.0;

    pub const COMPARE_FUNCTION: wgpu::CompareFunction = wgpu::CompareFunction::GreaterEqual;

    pub fn new(device: &wgpu::Device, size: PhysicalSize) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-buffer"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            size,
        }
    }

    /// Recreate the texture if `size` differs from the current one.
    pub fn resize(&mut self, device: &wgpu::Device, size: PhysicalSize) {
        if self.size == size {
            return;
        }
        *self = Self::new(device, size);
    }

    pub fn size(&self) -> PhysicalSize {
        self.size
    }

    /// Depth state for pipelines that draw into this buffer.
    pub fn stencil_state(depth_write_enabled: bool) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format: Self::FORMAT,
            depth_write_enabled,
            depth_compare: Self::COMPARE_FUNCTION,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }

    /// Attachment that clears to the far plane.
    pub fn attachment(&self) -> wgpu::RenderPassDepthStencilAttachment<'_> {
        wgpu::RenderPassDepthStencilAttachment {
            view: &self.view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(Self::CLEAR_VALUE),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::create_test_device_queue;

    #[test]
    fn test_reverse_z_constants() {
        assert_eq!(DepthBuffer::FORMAT, wgpu::TextureFormat::Depth32Float);
        assert_eq!(DepthBuffer::CLEAR_VALUE, 0.0);
        assert_eq!(
            DepthBuffer::COMPARE_FUNCTION,
            wgpu::CompareFunction::GreaterEqual
        );
    }

    #[test]
    fn test_stencil_state_uses_reverse_z() {
        let state = DepthBuffer::stencil_state(false);
        assert_eq!(state.format, DepthBuffer::FORMAT);
        assert_eq!(state.depth_compare, wgpu::CompareFunction::GreaterEqual);
        assert!(!state.depth_write_enabled);
    }

    #[test]
    fn test_depth_matches_surface_size() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let depth = DepthBuffer::new(&device, PhysicalSize::new(640, 480));
        assert_eq!(depth.texture.width(), 640);
        assert_eq!(depth.texture.height(), 480);
        assert!(depth.texture.usage().contains(wgpu::TextureUsages::RENDER_ATTACHMENT));
    }

    #[test]
    fn test_resize_recreates_texture() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let mut depth = DepthBuffer::new(&device, PhysicalSize::new(640, 480));
        depth.resize(&device, PhysicalSize::new(1280, 720));
        assert_eq!(depth.size(), PhysicalSize::new(1280, 720));
        assert_eq!(depth.texture.width(), 1280);

        depth.resize(&device, PhysicalSize::new(1280, 720));
        assert_eq!(depth.texture.height(), 720);
    }
}
