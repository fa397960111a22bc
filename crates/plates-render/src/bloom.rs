//! Separable Gaussian bloom.
//!
//! The scene image is blurred horizontally into a square target, that target
//! is blurred vertically into a second one, and the result is added back onto
//! the scene image scaled by the strength.

use bytemuck::{Pod, Zeroable};
use plates_scene::BloomParams;
use wgpu::util::DeviceExt;

use crate::fullscreen::{
    ADDITIVE_BLEND, RenderTarget, buffer_bind_group, create_fullscreen_pipeline,
    fullscreen_shader, run_fullscreen_pass, uniform_layout,
};

/// Largest kernel the convolution shader evaluates.
pub const MAX_KERNEL_SIZE: usize = 25;

const WEIGHT_VECTORS: usize = MAX_KERNEL_SIZE.div_ceil(4);

pub fn gaussian(x: f32, sigma: f32) -> f32 {
    (-(x * x) / (2.0 * sigma * sigma)).exp()
}

/// Normalized Gaussian weights covering three standard deviations either
/// side of the center, capped at [`MAX_KERNEL_SIZE`] entries.
pub fn build_kernel(sigma: f32) -> Vec<f32> {
    let sigma = sigma.max(f32::EPSILON);
    let size = (2.0 * (sigma * 3.0).ceil() + 1.0).min(MAX_KERNEL_SIZE as f32) as usize;
    let half_width = (size - 1) as f32 * 0.5;

    let mut values: Vec<f32> = (0..size)
        .map(|i| gaussian(i as f32 - half_width, sigma))
        .collect();
    let sum: f32 = values.iter().sum();
    for value in &mut values {
        *value /= sum;
    }
    values
}

/// Weights for `kernel_size` taps. Taps past the end of the Gaussian kernel
/// weigh nothing.
pub fn kernel_weights(kernel_size: u32, sigma: f32) -> ([f32; MAX_KERNEL_SIZE], u32) {
    let mut weights = [0.0; MAX_KERNEL_SIZE];
    for (slot, value) in weights.iter_mut().zip(build_kernel(sigma)) {
        *slot = value;
    }
    (weights, kernel_size.min(MAX_KERNEL_SIZE as u32))
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ConvolutionUniform {
    pub weights: [[f32; 4]; WEIGHT_VECTORS],
    /// UV step between taps.
    pub increment: [f32; 2],
    pub taps: u32,
    pub _pad: u32,
}

impl ConvolutionUniform {
    pub fn new(params: &BloomParams, increment: [f32; 2]) -> Self {
        let (flat, taps) = kernel_weights(params.kernel_size, params.sigma);
        let mut weights = [[0.0; 4]; WEIGHT_VECTORS];
        for (i, weight) in flat.iter().enumerate() {
            weights[i / 4][i % 4] = *weight;
        }
        Self {
            weights,
            increment,
            taps,
            _pad: 0,
        }
    }

    pub fn weight(&self, index: usize) -> f32 {
        self.weights[index / 4][index % 4]
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct CompositeUniform {
    pub strength: f32,
    pub _pad: [f32; 3],
}

/// UV step between taps for a blur target `resolution` texels wide.
pub fn blur_increment(resolution: u32) -> f32 {
    1.0 / (2.0 * resolution.max(1) as f32)
}

pub const CONVOLUTION_SHADER_SOURCE: &str = r#"
struct ConvolutionParams {
    weights: array<vec4<f32>, 7>,
    increment: vec2<f32>,
    taps: u32,
    _pad: u32,
};

@group(0) @binding(0) var<uniform> convolution: ConvolutionParams;
@group(1) @binding(0) var input_tex: texture_2d<f32>;
@group(1) @binding(1) var input_sampler: sampler;

@fragment
fn fs_convolution(in: FullscreenOutput) -> @location(0) vec4<f32> {
    var coord = in.uv - (f32(convolution.taps) - 1.0) * 0.5 * convolution.increment;
    var sum = vec4<f32>(0.0);
    for (var i = 0u; i < convolution.taps; i++) {
        let weight = convolution.weights[i / 4u][i % 4u];
        sum += textureSampleLevel(input_tex, input_sampler, coord, 0.0) * weight;
        coord += convolution.increment;
    }
    return sum;
}
"#;

pub const COMPOSITE_SHADER_SOURCE: &str = r#"
struct CompositeParams {
    strength: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
};

@group(0) @binding(0) var<uniform> composite: CompositeParams;
@group(1) @binding(0) var input_tex: texture_2d<f32>;
@group(1) @binding(1) var input_sampler: sampler;

@fragment
fn fs_composite(in: FullscreenOutput) -> @location(0) vec4<f32> {
    return textureSample(input_tex, input_sampler, in.uv) * composite.strength;
}
"#;

pub struct BloomPass {
    params: BloomParams,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    blur_x_bind_group: wgpu::BindGroup,
    blur_y_bind_group: wgpu::BindGroup,
    _composite_buffer: wgpu::Buffer,
    composite_bind_group: wgpu::BindGroup,
    target_x: RenderTarget,
    target_y: RenderTarget,
}

impl BloomPass {
    /// `texture_layout` and `sampler` must be the ones the scene target's
    /// bind group was built with.
    pub fn new(
        device: &wgpu::Device,
        texture_layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        hdr_format: wgpu::TextureFormat,
        params: BloomParams,
    ) -> Self {
        let convolution_shader =
            fullscreen_shader(device, "bloom-convolution-shader", CONVOLUTION_SHADER_SOURCE);
        let composite_shader =
            fullscreen_shader(device, "bloom-composite-shader", COMPOSITE_SHADER_SOURCE);

        let convolution_layout = uniform_layout(
            device,
            "bloom-convolution-bgl",
            wgpu::ShaderStages::FRAGMENT,
            std::mem::size_of::<ConvolutionUniform>() as u64,
        );
        let composite_layout = uniform_layout(
            device,
            "bloom-composite-bgl",
            wgpu::ShaderStages::FRAGMENT,
            std::mem::size_of::<CompositeUniform>() as u64,
        );

        let blur_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("bloom-blur-layout"),
            bind_group_layouts: &[&convolution_layout, texture_layout],
            immediate_size: 0,
        });
        let composite_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("bloom-composite-layout"),
                bind_group_layouts: &[&composite_layout, texture_layout],
                immediate_size: 0,
            });

        let blur_pipeline = create_fullscreen_pipeline(
            device,
            &convolution_shader,
            &blur_pipeline_layout,
            "fs_convolution",
            hdr_format,
            None,
            "bloom-blur",
        );
        let composite_pipeline = create_fullscreen_pipeline(
            device,
            &composite_shader,
            &composite_pipeline_layout,
            "fs_composite",
            hdr_format,
            Some(ADDITIVE_BLEND),
            "bloom-composite",
        );

        let increment = blur_increment(params.resolution);
        let convolution_buffer = |label: &str, increment: [f32; 2]| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(&ConvolutionUniform::new(&params, increment)),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        };
        let blur_x_buffer = convolution_buffer("bloom-blur-x", [increment, 0.0]);
        let blur_y_buffer = convolution_buffer("bloom-blur-y", [0.0, increment]);
        let composite_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("bloom-composite"),
            contents: bytemuck::bytes_of(&CompositeUniform {
                strength: params.strength,
                _pad: [0.0; 3],
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let blur_x_bind_group =
            buffer_bind_group(device, &convolution_layout, &blur_x_buffer, "bloom-blur-x-bg");
        let blur_y_bind_group =
            buffer_bind_group(device, &convolution_layout, &blur_y_buffer, "bloom-blur-y-bg");
        let composite_bind_group = buffer_bind_group(
            device,
            &composite_layout,
            &composite_buffer,
            "bloom-composite-bg",
        );

        let target = |label: &str| {
            RenderTarget::new(
                device,
                texture_layout,
                sampler,
                hdr_format,
                params.resolution,
                params.resolution,
                label,
            )
        };
        let target_x = target("bloom-target-x");
        let target_y = target("bloom-target-y");

        log::info!(
            "Bloom pass: strength {}, {} taps, sigma {}, {}px targets",
            params.strength,
            params.kernel_size.min(MAX_KERNEL_SIZE as u32),
            params.sigma,
            params.resolution
        );

        Self {
            params,
            blur_pipeline,
            composite_pipeline,
            blur_x_bind_group,
            blur_y_bind_group,
            _composite_buffer: composite_buffer,
            composite_bind_group,
            target_x,
            target_y,
        }
    }

    pub fn params(&self) -> &BloomParams {
        &self.params
    }

    pub fn target_size(&self) -> (u32, u32) {
        self.target_x.size()
    }

    /// Blur `scene` and add the glow back onto it.
    pub fn execute(&self, encoder: &mut wgpu::CommandEncoder, scene: &RenderTarget) {
        let clear = wgpu::LoadOp::Clear(wgpu::Color::BLACK);
        run_fullscreen_pass(
            encoder,
            &self.blur_pipeline,
            &[&self.blur_x_bind_group, &scene.bind_group],
            &self.target_x.view,
            clear,
            "bloom-blur-x",
        );
        run_fullscreen_pass(
            encoder,
            &self.blur_pipeline,
            &[&self.blur_y_bind_group, &self.target_x.bind_group],
            &self.target_y.view,
            clear,
            "bloom-blur-y",
        );
        run_fullscreen_pass(
            encoder,
            &self.composite_pipeline,
            &[&self.composite_bind_group, &self.target_y.bind_group],
            &scene.view,
            wgpu::LoadOp::Load,
            "bloom-composite",
        );
    }
}
