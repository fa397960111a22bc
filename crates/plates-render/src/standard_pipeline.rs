//! Textured physically based pipeline for plates, the floor and the sky.
//!
//! Bind groups:
//! - Group 0: camera uniform
//! - Group 1: lights uniform
//! - Group 2: material uniform, color / normal / roughness maps, sampler
//! - Group 3: per-draw model matrices, indexed by instance index
//!
//! Two pipelines share one layout: `Side::Front` culls back faces and
//! `Side::Back` culls front faces and flips the shading normal.

use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use plates_scene::{Material, Side};

use crate::buffer::VertexPositionNormalUv;
use crate::depth::DepthBuffer;
use crate::lights::{LIGHTS_WGSL, LightsUniform};

/// One entry of the model storage buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],
    /// Inverse transpose of `model`, for normals.
    pub normal: [[f32; 4]; 4],
}

impl ModelUniform {
    pub fn from_matrix(model: Mat4) -> Self {
        let normal = if model.determinant().abs() > f32::EPSILON {
            model.inverse().transpose()
        } else {
            Mat4::IDENTITY
        };
        Self {
            model: model.to_cols_array_2d(),
            normal: normal.to_cols_array_2d(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialUniform {
    /// roughness, metalness, normal sign (+1 front, -1 back), unused.
    pub params: [f32; 4],
    /// xy UV multiplier.
    pub uv_transform: [f32; 4],
}

impl MaterialUniform {
    pub fn from_material(material: &Material) -> Self {
        let side_sign = match material.side {
            Side::Front => 1.0,
            Side::Back => -1.0,
        };
        let repeat = material
            .color_map
            .as_ref()
            .map_or([1.0, 1.0], |slot| slot.repeat);
        Self {
            params: [material.roughness, material.metalness, side_sign, 0.0],
            uv_transform: [repeat[0], repeat[1], 0.0, 0.0],
        }
    }
}

/// WGSL for the standard material, appended to [`LIGHTS_WGSL`].
pub const STANDARD_SHADER_SOURCE: &str = r#"
const PI: f32 = 3.14159265359;
const EPSILON: f32 = 1e-6;
const MIN_ROUGHNESS: f32 = 0.0525;

struct CameraUniform {
    view_proj: mat4x4<f32>,
    position: vec4<f32>,
};

struct MaterialUniform {
    params: vec4<f32>,
    uv_transform: vec4<f32>,
};

struct ModelUniform {
    model: mat4x4<f32>,
    normal: mat4x4<f32>,
};

@group(0) @binding(0) var<uniform> camera: CameraUniform;
@group(1) @binding(0) var<uniform> lights: Lights;
@group(2) @binding(0) var<uniform> material: MaterialUniform;
@group(2) @binding(1) var color_map: texture_2d<f32>;
@group(2) @binding(2) var normal_map: texture_2d<f32>;
@group(2) @binding(3) var roughness_map: texture_2d<f32>;
@group(2) @binding(4) var map_sampler: sampler;
@group(3) @binding(0) var<storage, read> models: array<ModelUniform>;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(in: VertexInput, @builtin(instance_index) instance: u32) -> VertexOutput {
    let m = models[instance];
    let world = m.model * vec4<f32>(in.position, 1.0);
    var out: VertexOutput;
    out.clip_position = camera.view_proj * world;
    out.world_position = world.xyz;
    out.normal = (m.normal * vec4<f32>(in.normal, 0.0)).xyz;
    out.uv = in.uv * material.uv_transform.xy;
    return out;
}

// Tangent frame from screen-space derivatives; uv has a top-left origin so
// the bitangent is flipped.
fn perturb_normal(position: vec3<f32>, normal: vec3<f32>, map_normal: vec3<f32>, uv: vec2<f32>, face: f32) -> vec3<f32> {
    let q0 = dpdx(position);
    let q1 = dpdy(position);
    let st0 = dpdx(uv) * vec2<f32>(1.0, -1.0);
    let st1 = dpdy(uv) * vec2<f32>(1.0, -1.0);
    let q1perp = cross(q1, normal);
    let q0perp = cross(normal, q0);
    let t = q1perp * st0.x + q0perp * st1.x;
    let b = q1perp * st0.y + q0perp * st1.y;
    let det = max(dot(t, t), dot(b, b));
    var scale = 0.0;
    if (det > 0.0) {
        scale = face * inverseSqrt(det);
    }
    return normalize(t * (map_normal.x * scale) + b * (map_normal.y * scale) + normal * map_normal.z);
}

fn d_ggx(alpha: f32, n_dot_h: f32) -> f32 {
    let a2 = alpha * alpha;
    let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    return a2 / (PI * denom * denom);
}

fn v_smith_correlated(alpha: f32, n_dot_l: f32, n_dot_v: f32) -> f32 {
    let a2 = alpha * alpha;
    let gv = n_dot_l * sqrt(a2 + (1.0 - a2) * n_dot_v * n_dot_v);
    let gl = n_dot_v * sqrt(a2 + (1.0 - a2) * n_dot_l * n_dot_l);
    return 0.5 / max(gv + gl, EPSILON);
}

fn fresnel_schlick(f0: vec3<f32>, v_dot_h: f32) -> vec3<f32> {
    return f0 + (1.0 - f0) * pow(1.0 - v_dot_h, 5.0);
}

// Light colors are unitless, so irradiance is scaled by PI and the
// Lambert 1/PI cancels.
fn shade(l: vec3<f32>, v: vec3<f32>, n: vec3<f32>, diffuse: vec3<f32>, f0: vec3<f32>, alpha: f32, radiance: vec3<f32>) -> vec3<f32> {
    let n_dot_l = saturate(dot(n, l));
    let h = normalize(l + v);
    let n_dot_h = saturate(dot(n, h));
    let n_dot_v = saturate(dot(n, v));
    let v_dot_h = saturate(dot(v, h));
    let specular = fresnel_schlick(f0, v_dot_h) * v_smith_correlated(alpha, n_dot_l, n_dot_v) * d_ggx(alpha, n_dot_h);
    return radiance * n_dot_l * (diffuse + PI * specular);
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let albedo = textureSample(color_map, map_sampler, in.uv).rgb;
    let map_normal = textureSample(normal_map, map_sampler, in.uv).xyz * 2.0 - 1.0;
    let roughness_texel = textureSample(roughness_map, map_sampler, in.uv).g;

    let face = material.params.z;
    let geometric = normalize(in.normal) * face;
    let n = perturb_normal(in.world_position, geometric, map_normal, in.uv, face);
    let v = normalize(camera.position.xyz - in.world_position);

    let metalness = material.params.y;
    let roughness = clamp(material.params.x * roughness_texel, MIN_ROUGHNESS, 1.0);
    let alpha = roughness * roughness;
    let diffuse = albedo * (1.0 - metalness);
    let f0 = mix(vec3<f32>(0.04), albedo, metalness);

    var color = lights.ambient.rgb * diffuse;

    let point_count = min(lights.counts.x, 4u);
    for (var i = 0u; i < point_count; i++) {
        let light = lights.points[i];
        let to_light = light.position.xyz - in.world_position;
        let dist = length(to_light);
        let l = to_light / max(dist, EPSILON);
        let radiance = light.color.rgb * distance_attenuation(dist, light.position.w, light.color.w);
        color += shade(l, v, n, diffuse, f0, alpha, radiance);
    }

    let spot_count = min(lights.counts.y, 4u);
    for (var i = 0u; i < spot_count; i++) {
        let light = lights.spots[i];
        let to_light = light.position.xyz - in.world_position;
        let dist = length(to_light);
        let l = to_light / max(dist, EPSILON);
        let cone = spot_attenuation(dot(-l, light.direction.xyz), light.direction.w, light.cone.x);
        let radiance = light.color.rgb * cone * distance_attenuation(dist, light.position.w, light.color.w);
        color += shade(l, v, n, diffuse, f0, alpha, radiance);
    }

    return vec4<f32>(color, 1.0);
}
"#;

/// Full shader source: light declarations followed by the material shader.
pub fn standard_shader_source() -> String {
    format!("{LIGHTS_WGSL}\n{STANDARD_SHADER_SOURCE}")
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages, size: usize) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}

/// Standard material pipelines plus the layouts their bind groups follow.
pub struct StandardPipeline {
    pub front: wgpu::RenderPipeline,
    pub back: wgpu::RenderPipeline,
    pub camera_bind_group_layout: wgpu::BindGroupLayout,
    pub lights_bind_group_layout: wgpu::BindGroupLayout,
    pub material_bind_group_layout: wgpu::BindGroupLayout,
    pub model_bind_group_layout: wgpu::BindGroupLayout,
}

impl StandardPipeline {
    pub fn new(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> Self {
        let source = standard_shader_source();
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("standard-shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("standard-camera-bgl"),
                entries: &[uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX_FRAGMENT,
                    std::mem::size_of::<crate::camera::CameraUniform>(),
                )],
            });

        let lights_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("standard-lights-bgl"),
                entries: &[uniform_entry(
                    0,
                    wgpu::ShaderStages::FRAGMENT,
                    std::mem::size_of::<LightsUniform>(),
                )],
            });

        let material_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("standard-material-bgl"),
                entries: &[
                    uniform_entry(
                        0,
                        wgpu::ShaderStages::VERTEX_FRAGMENT,
                        std::mem::size_of::<MaterialUniform>(),
                    ),
                    texture_entry(1),
                    texture_entry(2),
                    texture_entry(3),
                    wgpu::BindGroupLayoutEntry {
                        binding: 4,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let model_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("standard-model-bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(
                            std::mem::size_of::<ModelUniform>() as u64,
                        ),
                    },
                    count: None,
                }],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("standard-pipeline-layout"),
            bind_group_layouts: &[
                &camera_bind_group_layout,
                &lights_bind_group_layout,
                &material_bind_group_layout,
                &model_bind_group_layout,
            ],
            immediate_size: 0,
        });

        let create = |cull_mode: wgpu::Face, label: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[VertexPositionNormalUv::layout()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(cull_mode),
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: Some(DepthBuffer::stencil_state(true)),
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: target_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview_mask: None,
                cache: None,
            })
        };

        let front = create(wgpu::Face::Back, "standard-pipeline-front");
        let back = create(wgpu::Face::Front, "standard-pipeline-back");

        log::info!("Standard pipeline created for {target_format:?}");

        Self {
            front,
            back,
            camera_bind_group_layout,
            lights_bind_group_layout,
            material_bind_group_layout,
            model_bind_group_layout,
        }
    }

    pub fn pipeline_for(&self, side: Side) -> &wgpu::RenderPipeline {
        match side {
            Side::Front => &self.front,
            Side::Back => &self.back,
        }
    }
}
