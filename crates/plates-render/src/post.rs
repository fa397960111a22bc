//! Post-processing chain: the scene is drawn into an HDR target, the
//! configured passes run in order, and an ACES tonemap writes the result to
//! the surface.

use glam::Vec3;
use plates_scene::PostPassDescriptor;

use crate::bloom::BloomPass;
use crate::film::FilmPass;
use crate::fullscreen::{
    RenderTarget, create_fullscreen_pipeline, fullscreen_shader, linear_clamp_sampler,
    run_fullscreen_pass, texture_sampler_layout,
};

pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

pub const OUTPUT_SHADER_SOURCE: &str = r#"
@group(0) @binding(0) var input_tex: texture_2d<f32>;
@group(0) @binding(1) var input_sampler: sampler;

@fragment
fn fs_tonemap(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let hdr = textureSample(input_tex, input_sampler, in.uv).rgb;
    let a = 2.51;
    let b = 0.03;
    let c = 2.43;
    let d = 0.59;
    let e = 0.14;
    let mapped = clamp(
        (hdr * (a * hdr + b)) / (hdr * (c * hdr + d) + e),
        vec3<f32>(0.0), vec3<f32>(1.0)
    );
    return vec4<f32>(mapped, 1.0);
}
"#;

/// Narkowicz ACES fit, as evaluated by the output pass.
pub fn aces_tonemap(hdr: Vec3) -> Vec3 {
    let (a, b, c, d, e) = (2.51, 0.03, 2.43, 0.59, 0.14);
    ((hdr * (a * hdr + b)) / (hdr * (c * hdr + d) + e)).clamp(Vec3::ZERO, Vec3::ONE)
}

enum PostPass {
    Bloom(BloomPass),
    Film(FilmPass),
}

pub struct PostChain {
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    targets: [RenderTarget; 2],
    passes: Vec<PostPass>,
    output_pipeline: wgpu::RenderPipeline,
}

fn create_targets(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    width: u32,
    height: u32,
) -> [RenderTarget; 2] {
    [
        RenderTarget::new(device, layout, sampler, HDR_FORMAT, width, height, "post-target-a"),
        RenderTarget::new(device, layout, sampler, HDR_FORMAT, width, height, "post-target-b"),
    ]
}

impl PostChain {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        descriptors: &[PostPassDescriptor],
    ) -> Self {
        let texture_layout = texture_sampler_layout(device, "post-texture-bgl");
        let sampler = linear_clamp_sampler(device, "post-sampler");
        let targets = create_targets(device, &texture_layout, &sampler, width, height);

        let passes = descriptors
            .iter()
            .map(|descriptor| match *descriptor {
                PostPassDescriptor::Bloom(params) => PostPass::Bloom(BloomPass::new(
                    device,
                    &texture_layout,
                    &sampler,
                    HDR_FORMAT,
                    params,
                )),
                PostPassDescriptor::Film(params) => {
                    PostPass::Film(FilmPass::new(device, &texture_layout, HDR_FORMAT, params))
                }
            })
            .collect();

        let shader = fullscreen_shader(device, "post-output-shader", OUTPUT_SHADER_SOURCE);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("post-output-layout"),
            bind_group_layouts: &[&texture_layout],
            immediate_size: 0,
        });
        let output_pipeline = create_fullscreen_pipeline(
            device,
            &shader,
            &layout,
            "fs_tonemap",
            surface_format,
            None,
            "post-output",
        );

        let chain = Self {
            texture_layout,
            sampler,
            targets,
            passes,
            output_pipeline,
        };
        log::info!("Post chain: {:?}", chain.pass_names());
        chain
    }

    /// Where the scene pass draws.
    pub fn scene_view(&self) -> &wgpu::TextureView {
        &self.targets[0].view
    }

    pub fn target_size(&self) -> (u32, u32) {
        self.targets[0].size()
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes
            .iter()
            .map(|pass| match pass {
                PostPass::Bloom(_) => "bloom",
                PostPass::Film(_) => "film",
            })
            .collect()
    }

    /// Per-frame uniform updates.
    pub fn prepare(&mut self, queue: &wgpu::Queue, dt: f32) {
        for pass in &mut self.passes {
            if let PostPass::Film(film) = pass {
                film.prepare(queue, dt);
            }
        }
    }

    /// Run every pass over the scene image and tonemap onto `surface_view`.
    pub fn execute(&self, encoder: &mut wgpu::CommandEncoder, surface_view: &wgpu::TextureView) {
        let mut current = 0;
        for pass in &self.passes {
            match pass {
                PostPass::Bloom(bloom) => bloom.execute(encoder, &self.targets[current]),
                PostPass::Film(film) => {
                    let next = 1 - current;
                    film.execute(encoder, &self.targets[current], &self.targets[next].view);
                    current = next;
                }
            }
        }
        run_fullscreen_pass(
            encoder,
            &self.output_pipeline,
            &[&self.targets[current].bind_group],
            surface_view,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            "post-output",
        );
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.targets = create_targets(device, &self.texture_layout, &self.sampler, width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::create_test_device_queue;
    use plates_scene::{BloomParams, FilmParams};

    #[test]
    fn test_aces_endpoints() {
        assert_eq!(aces_tonemap(Vec3::ZERO), Vec3::ZERO);
        assert_eq!(aces_tonemap(Vec3::splat(100.0)), Vec3::ONE);
    }

    #[test]
    fn test_aces_monotonic() {
        let mut last = -1.0;
        for i in 0..50 {
            let v = aces_tonemap(Vec3::splat(i as f32 * 0.1)).x;
            assert!(v >= last);
            last = v;
        }
    }

    #[test]
    fn test_chain_follows_descriptor_order() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let chain = PostChain::new(
            &device,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            64,
            32,
            &[
                PostPassDescriptor::Film(FilmParams::default()),
                PostPassDescriptor::Bloom(BloomParams::default()),
            ],
        );
        assert_eq!(chain.pass_names(), ["film", "bloom"]);
        assert_eq!(chain.target_size(), (64, 32));
    }

    #[test]
    fn test_resize_recreates_targets() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let mut chain = PostChain::new(&device, wgpu::TextureFormat::Rgba8UnormSrgb, 64, 32, &[]);
        assert!(chain.pass_names().is_empty());
        chain.resize(&device, 128, 0);
        assert_eq!(chain.target_size(), (128, 1));
    }
}
