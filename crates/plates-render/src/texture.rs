//! GPU texture management: upload, mipmap generation and samplers.
//!
//! [`TextureManager`] turns decoded images into mipmapped GPU textures keyed
//! by [`AssetId`]. Color maps are stored as sRGB so sampling returns linear
//! values; normal and roughness maps are stored as-is. Materials that leave
//! a slot empty fall back to 1×1 defaults that leave shading unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use crate::fullscreen;
use plates_scene::{AssetId, ColorSpace, DecodedTexture, TextureSet, TextureSlot, WrapMode};

/// A GPU texture with its default view.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub dimensions: (u32, u32),
    pub format: wgpu::TextureFormat,
    pub mip_level_count: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum GpuTextureError {
    #[error("texture '{id}' has {actual} bytes, expected {expected} for {width}x{height} RGBA8")]
    DataSizeMismatch {
        id: AssetId,
        actual: usize,
        expected: usize,
        width: u32,
        height: u32,
    },

    #[error("texture '{id}' has zero dimensions {width}x{height}")]
    ZeroDimensions { id: AssetId, width: u32, height: u32 },
}

/// The role a texture plays in a material; decides its default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapKind {
    Color,
    Normal,
    Roughness,
}

pub fn mip_level_count(width: u32, height: u32) -> u32 {
    (width.max(height) as f32).log2().floor() as u32 + 1
}

pub fn format_for(color_space: ColorSpace) -> wgpu::TextureFormat {
    match color_space {
        ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
    }
}

const BLIT_FRAGMENT_SOURCE: &str = r#"
@group(0) @binding(0) var src_texture: texture_2d<f32>;
@group(0) @binding(1) var src_sampler: sampler;

@fragment
fn fs_blit(in: FullscreenOutput) -> @location(0) vec4<f32> {
    return textureSample(src_texture, src_sampler, in.uv);
}
"#;

struct MipmapBlitter {
    shader: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    pipelines: HashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
}

impl MipmapBlitter {
    fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = fullscreen::texture_sampler_layout(device, "mipmap-bgl");
        let shader = fullscreen::fullscreen_shader(device, "mipmap-shader", BLIT_FRAGMENT_SOURCE);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mipmap-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });
        let sampler = fullscreen::linear_clamp_sampler(device, "mipmap-sampler");
        Self {
            shader,
            layout,
            bind_group_layout,
            sampler,
            pipelines: HashMap::new(),
        }
    }

    fn ensure_pipeline(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        if self.pipelines.contains_key(&format) {
            return;
        }
        let pipeline = fullscreen::create_fullscreen_pipeline(
            device,
            &self.shader,
            &self.layout,
            "fs_blit",
            format,
            None,
            "mipmap-pipeline",
        );
        self.pipelines.insert(format, pipeline);
    }

    /// Fill mips `1..mip_count` by repeatedly halving the previous level.
    fn generate(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture: &wgpu::Texture,
        mip_count: u32,
    ) {
        let format = texture.format();
        self.ensure_pipeline(device, format);
        let Some(pipeline) = self.pipelines.get(&format) else {
            return;
        };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("mipmap-encoder"),
        });
        for level in 1..mip_count {
            let src_view = texture.create_view(&wgpu::TextureViewDescriptor {
                base_mip_level: level - 1,
                mip_level_count: Some(1),
                ..Default::default()
            });
            let dst_view = texture.create_view(&wgpu::TextureViewDescriptor {
                base_mip_level: level,
                mip_level_count: Some(1),
                ..Default::default()
            });
            let bind_group = fullscreen::texture_bind_group(
                device,
                &self.bind_group_layout,
                &src_view,
                &self.sampler,
                "mipmap-bg",
            );
            fullscreen::run_fullscreen_pass(
                &mut encoder,
                pipeline,
                &[&bind_group],
                &dst_view,
                wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                "mipmap-pass",
            );
        }
        queue.submit(std::iter::once(encoder.finish()));
    }
}

/// Uploaded textures, wrap-mode samplers and 1×1 defaults.
pub struct TextureManager {
    textures: HashMap<AssetId, Arc<GpuTexture>>,
    sampler_clamp: wgpu::Sampler,
    sampler_repeat: wgpu::Sampler,
    default_color: GpuTexture,
    default_normal: GpuTexture,
    default_roughness: GpuTexture,
    blitter: MipmapBlitter,
}

impl TextureManager {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let sampler = |label, address_mode| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: address_mode,
                address_mode_v: address_mode,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::MipmapFilterMode::Linear,
                ..Default::default()
            })
        };

        Self {
            textures: HashMap::new(),
            sampler_clamp: sampler("sampler-clamp", wgpu::AddressMode::ClampToEdge),
            sampler_repeat: sampler("sampler-repeat", wgpu::AddressMode::Repeat),
            default_color: solid_texture(device, queue, "default-color", [255; 4], ColorSpace::Srgb),
            // Tangent-space +Z.
            default_normal: solid_texture(
                device,
                queue,
                "default-normal",
                [128, 128, 255, 255],
                ColorSpace::Linear,
            ),
            default_roughness: solid_texture(
                device,
                queue,
                "default-roughness",
                [255; 4],
                ColorSpace::Linear,
            ),
            blitter: MipmapBlitter::new(device),
        }
    }

    /// Upload `decoded` unless a texture with the same id already exists.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        decoded: &DecodedTexture,
    ) -> Result<Arc<GpuTexture>, GpuTextureError> {
        if let Some(existing) = self.textures.get(&decoded.id) {
            return Ok(Arc::clone(existing));
        }

        let (width, height) = (decoded.width, decoded.height);
        if width == 0 || height == 0 {
            return Err(GpuTextureError::ZeroDimensions {
                id: decoded.id.clone(),
                width,
                height,
            });
        }
        let expected = width as usize * height as usize * 4;
        if decoded.pixels.len() != expected {
            return Err(GpuTextureError::DataSizeMismatch {
                id: decoded.id.clone(),
                actual: decoded.pixels.len(),
                expected,
                width,
                height,
            });
        }

        let format = format_for(decoded.color_space);
        let mip_levels = mip_level_count(width, height);
        let texture = create_rgba_texture(
            device,
            queue,
            decoded.id.as_str(),
            &decoded.pixels,
            width,
            height,
            format,
            mip_levels,
        );
        if mip_levels > 1 {
            self.blitter.generate(device, queue, &texture, mip_levels);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let managed = Arc::new(GpuTexture {
            texture,
            view,
            dimensions: (width, height),
            format,
            mip_level_count: mip_levels,
        });
        self.textures.insert(decoded.id.clone(), Arc::clone(&managed));
        log::info!(
            "Uploaded texture '{}' ({width}x{height}, {format:?}, {mip_levels} mips)",
            decoded.id
        );
        Ok(managed)
    }

    /// Upload every texture in `set`.
    pub fn upload_set(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        set: &TextureSet,
    ) -> Result<(), GpuTextureError> {
        for (_, decoded) in set.iter() {
            self.upload(device, queue, decoded)?;
        }
        Ok(())
    }

    pub fn get(&self, id: &AssetId) -> Option<Arc<GpuTexture>> {
        self.textures.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn sampler(&self, wrap: WrapMode) -> &wgpu::Sampler {
        match wrap {
            WrapMode::ClampToEdge => &self.sampler_clamp,
            WrapMode::Repeat => &self.sampler_repeat,
        }
    }

    pub fn default_texture(&self, kind: MapKind) -> &GpuTexture {
        match kind {
            MapKind::Color => &self.default_color,
            MapKind::Normal => &self.default_normal,
            MapKind::Roughness => &self.default_roughness,
        }
    }

    /// The view to bind for `slot`: the uploaded texture, or the default
    /// for `kind` when the slot is empty or its texture was never uploaded.
    pub fn view_for(&self, slot: Option<&TextureSlot>, kind: MapKind) -> &wgpu::TextureView {
        match slot {
            Some(slot) => match self.textures.get(&slot.asset) {
                Some(texture) => &texture.view,
                None => {
                    log::warn!("Texture '{}' not uploaded, using default", slot.asset);
                    &self.default_texture(kind).view
                }
            },
            None => &self.default_texture(kind).view,
        }
    }

    pub fn clear(&mut self) {
        self.textures.clear();
    }
}

#[allow(clippy::too_many_arguments)]
fn create_rgba_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    pixels: &[u8],
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    mip_level_count: u32,
) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: None,
        },
        size,
    );
    texture
}

fn solid_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    rgba: [u8; 4],
    color_space: ColorSpace,
) -> GpuTexture {
    let format = format_for(color_space);
    let texture = create_rgba_texture(device, queue, label, &rgba, 1, 1, format, 1);
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        texture,
        view,
        dimensions: (1, 1),
        format,
        mip_level_count: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::create_test_device_queue;

    fn decoded(id: &str, width: u32, height: u32, color_space: ColorSpace) -> DecodedTexture {
        DecodedTexture {
            id: AssetId::new(id),
            width,
            height,
            pixels: vec![200; (width * height * 4) as usize],
            color_space,
        }
    }

    #[test]
    fn test_mip_level_count() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(4, 4), 3);
        assert_eq!(mip_level_count(512, 256), 10);
        assert_eq!(mip_level_count(1024, 1024), 11);
    }

    #[test]
    fn test_format_follows_color_space() {
        assert_eq!(format_for(ColorSpace::Srgb), wgpu::TextureFormat::Rgba8UnormSrgb);
        assert_eq!(format_for(ColorSpace::Linear), wgpu::TextureFormat::Rgba8Unorm);
    }

    #[test]
    fn test_upload_color_and_linear() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let mut manager = TextureManager::new(&device, &queue);
        let color = manager
            .upload(&device, &queue, &decoded("color", 8, 4, ColorSpace::Srgb))
            .unwrap();
        assert_eq!(color.format, wgpu::TextureFormat::Rgba8UnormSrgb);
        assert_eq!(color.mip_level_count, 4);
        assert_eq!(color.dimensions, (8, 4));

        let normal = manager
            .upload(&device, &queue, &decoded("normal", 2, 2, ColorSpace::Linear))
            .unwrap();
        assert_eq!(normal.format, wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_upload_is_cached_by_id() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let mut manager = TextureManager::new(&device, &queue);
        let first = manager
            .upload(&device, &queue, &decoded("wood", 4, 4, ColorSpace::Srgb))
            .unwrap();
        let second = manager
            .upload(&device, &queue, &decoded("wood", 4, 4, ColorSpace::Srgb))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_rejects_bad_data() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let mut manager = TextureManager::new(&device, &queue);
        let mut short = decoded("short", 4, 4, ColorSpace::Srgb);
        short.pixels.truncate(10);
        assert!(matches!(
            manager.upload(&device, &queue, &short),
            Err(GpuTextureError::DataSizeMismatch { expected: 64, .. })
        ));
        assert!(matches!(
            manager.upload(&device, &queue, &decoded("empty", 0, 4, ColorSpace::Srgb)),
            Err(GpuTextureError::ZeroDimensions { .. })
        ));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_defaults_are_one_texel() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let manager = TextureManager::new(&device, &queue);
        for kind in [MapKind::Color, MapKind::Normal, MapKind::Roughness] {
            assert_eq!(manager.default_texture(kind).dimensions, (1, 1));
        }
        assert_eq!(
            manager.default_texture(MapKind::Color).format,
            wgpu::TextureFormat::Rgba8UnormSrgb
        );
        assert_eq!(
            manager.default_texture(MapKind::Normal).format,
            wgpu::TextureFormat::Rgba8Unorm
        );
    }
}
