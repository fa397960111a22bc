//! Film grain and scanlines.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use plates_scene::FilmParams;
use wgpu::util::DeviceExt;

use crate::fullscreen::{
    RenderTarget, buffer_bind_group, create_fullscreen_pipeline, fullscreen_shader,
    run_fullscreen_pass, uniform_layout,
};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FilmUniform {
    pub time: f32,
    pub noise_intensity: f32,
    pub scanline_intensity: f32,
    pub scanline_count: f32,
    pub grayscale: u32,
    pub _pad: [u32; 3],
}

impl FilmUniform {
    pub fn new(params: &FilmParams, time: f32) -> Self {
        Self {
            time,
            noise_intensity: params.noise_intensity,
            scanline_intensity: params.scanline_intensity,
            scanline_count: params.scanline_count,
            grayscale: u32::from(params.grayscale),
            _pad: [0; 3],
        }
    }
}

/// Hash noise in `[0, 1)`.
pub fn rand(co: Vec2) -> f32 {
    let x = co.dot(Vec2::new(12.9898, 78.233)).sin() * 43758.547;
    x - x.floor()
}

/// Shade one texel. `uv` has a top-left origin.
pub fn film_shade(color: Vec3, uv: Vec2, time: f32, params: &FilmParams) -> Vec3 {
    let noise_uv = Vec2::new(uv.x, 1.0 - uv.y);
    let dx = rand(noise_uv + Vec2::splat(time));
    let mut result = color + color * (0.1 + dx).clamp(0.0, 1.0);

    let phase = noise_uv.y * params.scanline_count;
    let (s, c) = phase.sin_cos();
    result += color * Vec3::new(s, c, s) * params.scanline_intensity;
    result = color + params.noise_intensity.clamp(0.0, 1.0) * (result - color);

    if params.grayscale {
        Vec3::splat(result.dot(Vec3::new(0.3, 0.59, 0.11)))
    } else {
        result
    }
}

pub const FILM_SHADER_SOURCE: &str = r#"
struct FilmParams {
    time: f32,
    noise_intensity: f32,
    scanline_intensity: f32,
    scanline_count: f32,
    grayscale: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
};

@group(0) @binding(0) var<uniform> film: FilmParams;
@group(1) @binding(0) var input_tex: texture_2d<f32>;
@group(1) @binding(1) var input_sampler: sampler;

fn rand(co: vec2<f32>) -> f32 {
    return fract(sin(dot(co, vec2<f32>(12.9898, 78.233))) * 43758.5453);
}

@fragment
fn fs_film(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(input_tex, input_sampler, in.uv);
    let c = texel.rgb;
    let noise_uv = vec2<f32>(in.uv.x, 1.0 - in.uv.y);

    let dx = rand(noise_uv + film.time);
    var result = c + c * clamp(0.1 + dx, 0.0, 1.0);

    let phase = noise_uv.y * film.scanline_count;
    let sc = vec2<f32>(sin(phase), cos(phase));
    result += c * vec3<f32>(sc.x, sc.y, sc.x) * film.scanline_intensity;
    result = c + clamp(film.noise_intensity, 0.0, 1.0) * (result - c);

    if (film.grayscale != 0u) {
        result = vec3<f32>(dot(result, vec3<f32>(0.3, 0.59, 0.11)));
    }
    return vec4<f32>(result, texel.a);
}
"#;

pub struct FilmPass {
    params: FilmParams,
    time: f32,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
}

impl FilmPass {
    pub fn new(
        device: &wgpu::Device,
        texture_layout: &wgpu::BindGroupLayout,
        hdr_format: wgpu::TextureFormat,
        params: FilmParams,
    ) -> Self {
        let shader = fullscreen_shader(device, "film-shader", FILM_SHADER_SOURCE);
        let params_layout = uniform_layout(
            device,
            "film-params-bgl",
            wgpu::ShaderStages::FRAGMENT,
            std::mem::size_of::<FilmUniform>() as u64,
        );
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("film-layout"),
            bind_group_layouts: &[&params_layout, texture_layout],
            immediate_size: 0,
        });
        let pipeline = create_fullscreen_pipeline(
            device,
            &shader,
            &pipeline_layout,
            "fs_film",
            hdr_format,
            None,
            "film",
        );

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("film-params"),
            contents: bytemuck::bytes_of(&FilmUniform::new(&params, 0.0)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group =
            buffer_bind_group(device, &params_layout, &uniform_buffer, "film-params-bg");

        Self {
            params,
            time: 0.0,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
        }
    }

    pub fn params(&self) -> &FilmParams {
        &self.params
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Advance the grain clock by `dt` seconds and upload it.
    pub fn prepare(&mut self, queue: &wgpu::Queue, dt: f32) {
        self.time += dt;
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&FilmUniform::new(&self.params, self.time)),
        );
    }

    /// Read `source` and write the filtered image to `target`.
    pub fn execute(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        source: &RenderTarget,
        target: &wgpu::TextureView,
    ) {
        run_fullscreen_pass(
            encoder,
            &self.pipeline,
            &[&self.uniform_bind_group, &source.bind_group],
            target,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            "film",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fullscreen::texture_sampler_layout;
    use crate::gpu::create_test_device_queue;

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<FilmUniform>(), 32);
        let uniform = FilmUniform::new(&FilmParams::default(), 2.0);
        assert_eq!(uniform.time, 2.0);
        assert_eq!(uniform.scanline_count, 900.0);
        assert_eq!(uniform.grayscale, 0);
    }

    #[test]
    fn test_rand_range() {
        for i in 0..100 {
            let v = rand(Vec2::new(i as f32 * 0.013, i as f32 * 0.071));
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_zero_noise_passes_color_through() {
        let params = FilmParams::from_tuple([0.0, 0.5, 900.0, 0.0]);
        let color = Vec3::new(0.2, 0.4, 0.6);
        let shaded = film_shade(color, Vec2::new(0.3, 0.7), 1.5, &params);
        assert!((shaded - color).length() < 1e-6);
    }

    #[test]
    fn test_black_stays_black() {
        let shaded = film_shade(Vec3::ZERO, Vec2::new(0.5, 0.5), 3.0, &FilmParams::default());
        assert_eq!(shaded, Vec3::ZERO);
    }

    #[test]
    fn test_default_grain_brightens() {
        let params = FilmParams::from_tuple([0.25, 0.0, 900.0, 0.0]);
        let color = Vec3::splat(0.5);
        let shaded = film_shade(color, Vec2::new(0.25, 0.25), 0.0, &params);
        // Grain adds between 0.1 and 1.0 of the color, scaled by the noise intensity.
        assert!(shaded.x >= 0.5 + 0.25 * 0.5 * 0.1 - 1e-6);
        assert!(shaded.x <= 0.5 + 0.25 * 0.5 + 1e-6);
    }

    #[test]
    fn test_grayscale_weights() {
        let params = FilmParams::from_tuple([0.0, 0.0, 900.0, 1.0]);
        let shaded = film_shade(Vec3::new(1.0, 0.0, 0.0), Vec2::ZERO, 0.0, &params);
        assert!((shaded - Vec3::splat(0.3)).length() < 1e-6);
    }

    #[test]
    fn test_prepare_advances_time() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let layout = texture_sampler_layout(&device, "test-bgl");
        let mut pass = FilmPass::new(
            &device,
            &layout,
            wgpu::TextureFormat::Rgba16Float,
            FilmParams::default(),
        );
        pass.prepare(&queue, 0.5);
        pass.prepare(&queue, 0.25);
        assert!((pass.time() - 0.75).abs() < 1e-6);
        assert_eq!(pass.params().noise_intensity, 0.25);
    }
}
