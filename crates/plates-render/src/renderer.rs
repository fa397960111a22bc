//! Draws a mounted scene: uploads its meshes, materials and textures once,
//! then each frame writes the camera and model matrices, renders the scene
//! into the post chain and presents.

use glam::Mat4;
use plates_scene::{Geometry, Material, MountedScene, Placeholder, SceneNode, Side, WrapMode};
use wgpu::util::DeviceExt;

use crate::buffer::MeshBuffer;
use crate::camera::Camera;
use crate::depth::DepthBuffer;
use crate::geometry::MeshData;
use crate::gpu::{RenderContext, SurfaceError};
use crate::lights::LightsUniform;
use crate::post::{HDR_FORMAT, PostChain};
use crate::standard_pipeline::{MaterialUniform, ModelUniform, StandardPipeline};
use crate::surface::PhysicalSize;
use crate::texture::{GpuTextureError, MapKind, TextureManager};

/// Where a model slot's matrix comes from each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
enum ModelSource {
    Plate(usize),
    Static(Mat4),
}

/// One node to draw: indices into the mesh and material tables plus its
/// model slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawItem {
    pub mesh: usize,
    pub material: usize,
    pub model_slot: u32,
}

/// Consecutive items sharing a mesh and material, drawn as one instanced
/// call over `instances`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawBatch {
    pub mesh: usize,
    pub material: usize,
    pub instances: std::ops::Range<u32>,
}

/// Merge runs of items that share a mesh and material and have adjacent
/// model slots.
pub fn batch_draws(items: &[DrawItem]) -> Vec<DrawBatch> {
    let mut batches: Vec<DrawBatch> = Vec::new();
    for item in items {
        if let Some(last) = batches.last_mut()
            && last.mesh == item.mesh
            && last.material == item.material
            && last.instances.end == item.model_slot
        {
            last.instances.end += 1;
            continue;
        }
        batches.push(DrawBatch {
            mesh: item.mesh,
            material: item.material,
            instances: item.model_slot..item.model_slot + 1,
        });
    }
    batches
}

fn intern<T: PartialEq + Clone>(table: &mut Vec<T>, value: &T) -> usize {
    match table.iter().position(|existing| existing == value) {
        Some(index) => index,
        None => {
            table.push(value.clone());
            table.len() - 1
        }
    }
}

struct GpuMaterial {
    side: Side,
    _uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

pub struct SceneRenderer {
    pipeline: StandardPipeline,
    textures: TextureManager,
    depth: DepthBuffer,
    post: PostChain,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    _lights_buffer: wgpu::Buffer,
    lights_bind_group: wgpu::BindGroup,
    lights: LightsUniform,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    model_sources: Vec<ModelSource>,
    model_data: Vec<ModelUniform>,
    meshes: Vec<MeshBuffer>,
    materials: Vec<GpuMaterial>,
    batches: Vec<DrawBatch>,
}

impl SceneRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        size: PhysicalSize,
        scene: &MountedScene,
    ) -> Result<Self, GpuTextureError> {
        let description = scene.description();
        let pipeline = StandardPipeline::new(device, HDR_FORMAT);

        let mut textures = TextureManager::new(device, queue);
        textures.upload_set(device, queue, scene.textures())?;

        // Walk the nodes once to assign mesh, material and model slots.
        let mut geometries: Vec<Geometry> = Vec::new();
        let mut material_table: Vec<Material> = Vec::new();
        let mut model_sources = Vec::new();
        let mut items = Vec::new();
        let mut plate_index = 0;
        for node in &description.nodes {
            let (geometry, material, source) = match node {
                SceneNode::Plate(plate) => {
                    let source = ModelSource::Plate(plate_index);
                    plate_index += 1;
                    (&plate.geometry, &plate.material, source)
                }
                SceneNode::Mesh(mesh) => (
                    &mesh.geometry,
                    &mesh.material,
                    ModelSource::Static(mesh.transform.matrix()),
                ),
                SceneNode::Light(_) => continue,
            };
            items.push(DrawItem {
                mesh: intern(&mut geometries, geometry),
                material: intern(&mut material_table, material),
                model_slot: model_sources.len() as u32,
            });
            model_sources.push(source);
        }

        let meshes = geometries
            .iter()
            .enumerate()
            .map(|(i, geometry)| {
                MeshBuffer::upload(device, &format!("mesh-{i}"), &MeshData::from_geometry(geometry))
            })
            .collect();

        let materials = material_table
            .iter()
            .enumerate()
            .map(|(i, material)| create_material(device, &pipeline, &textures, material, i))
            .collect();

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("camera-uniform"),
            size: std::mem::size_of::<crate::camera::CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = single_buffer_bind_group(
            device,
            &pipeline.camera_bind_group_layout,
            &camera_buffer,
            "camera-bg",
        );

        let lights = LightsUniform::from_lights(description.lights());
        let lights_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lights-uniform"),
            contents: bytemuck::bytes_of(&lights),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let lights_bind_group = single_buffer_bind_group(
            device,
            &pipeline.lights_bind_group_layout,
            &lights_buffer,
            "lights-bg",
        );

        let model_data = vec![ModelUniform::from_matrix(Mat4::IDENTITY); model_sources.len().max(1)];
        let model_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("model-storage"),
            contents: bytemuck::cast_slice(&model_data),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });
        let model_bind_group = single_buffer_bind_group(
            device,
            &pipeline.model_bind_group_layout,
            &model_buffer,
            "model-bg",
        );

        let batches = batch_draws(&items);
        let post = PostChain::new(device, surface_format, size.width, size.height, &description.post);

        log::info!(
            "Scene renderer ready: {} meshes, {} materials, {} draws in {} batches",
            geometries.len(),
            material_table.len(),
            items.len(),
            batches.len()
        );

        Ok(Self {
            pipeline,
            textures,
            depth: DepthBuffer::new(device, size),
            post,
            camera_buffer,
            camera_bind_group,
            _lights_buffer: lights_buffer,
            lights_bind_group,
            lights,
            model_buffer,
            model_bind_group,
            model_sources,
            model_data,
            meshes,
            materials,
            batches,
        })
    }

    pub fn batches(&self) -> &[DrawBatch] {
        &self.batches
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn lights(&self) -> &LightsUniform {
        &self.lights
    }

    pub fn textures(&self) -> &TextureManager {
        &self.textures
    }

    pub fn resize(&mut self, device: &wgpu::Device, size: PhysicalSize) {
        self.depth.resize(device, size);
        self.post.resize(device, size.width, size.height);
    }

    /// Upload this frame's camera and model matrices and advance the post
    /// passes by `dt` seconds.
    pub fn prepare(&mut self, queue: &wgpu::Queue, camera: &Camera, scene: &MountedScene, dt: f32) {
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera.to_uniform()));

        let plates = scene.plates();
        for (slot, source) in self.model_data.iter_mut().zip(&self.model_sources) {
            let matrix = match *source {
                ModelSource::Plate(index) => plates
                    .get(index)
                    .map_or(Mat4::IDENTITY, |plate| plate.model_matrix()),
                ModelSource::Static(matrix) => matrix,
            };
            *slot = ModelUniform::from_matrix(matrix);
        }
        queue.write_buffer(&self.model_buffer, 0, bytemuck::cast_slice(&self.model_data));

        self.post.prepare(queue, dt);
    }

    /// Record the scene and post passes, ending on `output`.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView) {
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.post.scene_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(self.depth.attachment()),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_bind_group(0, &self.camera_bind_group, &[]);
            pass.set_bind_group(1, &self.lights_bind_group, &[]);
            pass.set_bind_group(3, &self.model_bind_group, &[]);
            for batch in &self.batches {
                let (Some(mesh), Some(material)) =
                    (self.meshes.get(batch.mesh), self.materials.get(batch.material))
                else {
                    continue;
                };
                pass.set_pipeline(self.pipeline.pipeline_for(material.side));
                pass.set_bind_group(2, &material.bind_group, &[]);
                mesh.bind(&mut pass);
                mesh.draw(&mut pass, batch.instances.clone());
            }
        }
        self.post.execute(encoder, output);
    }

    /// Draw one frame to the window surface.
    pub fn render_frame(
        &mut self,
        ctx: &RenderContext,
        camera: &Camera,
        scene: &MountedScene,
        dt: f32,
    ) -> Result<(), SurfaceError> {
        self.prepare(&ctx.queue, camera, scene, dt);

        let frame = ctx.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });
        self.encode(&mut encoder, &view);
        ctx.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn single_buffer_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    })
}

fn create_material(
    device: &wgpu::Device,
    pipeline: &StandardPipeline,
    textures: &TextureManager,
    material: &Material,
    index: usize,
) -> GpuMaterial {
    let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("material-{index}")),
        contents: bytemuck::bytes_of(&MaterialUniform::from_material(material)),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    let wrap = material
        .color_map
        .as_ref()
        .map_or(WrapMode::ClampToEdge, |slot| slot.wrap);

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("material-{index}-bg")),
        layout: &pipeline.material_bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(
                    textures.view_for(material.color_map.as_ref(), MapKind::Color),
                ),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(
                    textures.view_for(material.normal_map.as_ref(), MapKind::Normal),
                ),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(
                    textures.view_for(material.roughness_map.as_ref(), MapKind::Roughness),
                ),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::Sampler(textures.sampler(wrap)),
            },
        ],
    });

    GpuMaterial {
        side: material.side,
        _uniform: uniform,
        bind_group,
    }
}

/// Clear the surface while the scene is still loading.
pub fn render_clear_frame(ctx: &RenderContext, placeholder: Placeholder) -> Result<(), SurfaceError> {
    let color = match placeholder {
        Placeholder::Nothing => wgpu::Color::BLACK,
    };
    let frame = ctx.get_current_texture()?;
    let view = frame
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());
    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("clear-encoder"),
        });
    {
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("clear-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }
    ctx.queue.submit(std::iter::once(encoder.finish()));
    frame.present();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::create_test_device_queue;
    use plates_scene::{
        LayoutConfig, ProceduralTextureSource, SceneSettings, TextureCache, compose_scene,
    };
    use std::sync::Arc;

    fn item(mesh: usize, material: usize, model_slot: u32) -> DrawItem {
        DrawItem {
            mesh,
            material,
            model_slot,
        }
    }

    #[test]
    fn test_plates_batch_into_one_draw() {
        let items: Vec<DrawItem> = (0..80).map(|i| item(0, 0, i)).collect();
        let batches = batch_draws(&items);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].instances, 0..80);
    }

    #[test]
    fn test_batches_split_on_change() {
        let items = [item(0, 0, 0), item(0, 0, 1), item(1, 1, 2), item(2, 2, 3)];
        let batches = batch_draws(&items);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].instances, 0..2);
        assert_eq!(batches[1].instances, 2..3);
        assert_eq!(batches[2].mesh, 2);
    }

    #[test]
    fn test_batches_need_adjacent_slots() {
        let items = [item(0, 0, 0), item(0, 0, 5)];
        assert_eq!(batch_draws(&items).len(), 2);
    }

    #[test]
    fn test_batch_empty() {
        assert!(batch_draws(&[]).is_empty());
    }

    #[test]
    fn test_intern_dedups() {
        let mut table = Vec::new();
        assert_eq!(intern(&mut table, &Material::wood()), 0);
        assert_eq!(intern(&mut table, &Material::sky()), 1);
        assert_eq!(intern(&mut table, &Material::wood()), 0);
        assert_eq!(table.len(), 2);
    }

    fn mounted(count: i64) -> MountedScene {
        let description = compose_scene(&SceneSettings {
            layout: LayoutConfig {
                count,
                spacing: 0.04,
            },
            ..SceneSettings::default()
        });
        let cache = TextureCache::new(Arc::new(ProceduralTextureSource::new(8, 3)), 1).unwrap();
        let textures = cache.acquire(&description.texture_request()).wait().unwrap();
        MountedScene::new(description, textures)
    }

    #[test]
    fn test_renderer_builds_scene_tables() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let scene = mounted(5);
        let renderer = SceneRenderer::new(
            &device,
            &queue,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            PhysicalSize::new(64, 48),
            &scene,
        )
        .unwrap();

        // Box, plane, sphere; plate wood, floor wood with repeat, sky.
        assert_eq!(renderer.mesh_count(), 3);
        assert_eq!(renderer.material_count(), 3);
        assert_eq!(renderer.textures().len(), 4);
        assert_eq!(renderer.lights().point_count(), 1);
        let batches = renderer.batches();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].instances, 0..5);
        assert_eq!(batches[1].instances, 5..6);
        assert_eq!(batches[2].instances, 6..7);
    }

    #[test]
    fn test_renderer_encodes_offscreen_frame() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let mut scene = mounted(3);
        let size = PhysicalSize::new(32, 32);
        let mut renderer = SceneRenderer::new(
            &device,
            &queue,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            size,
            &scene,
        )
        .unwrap();

        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test-output"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let camera = Camera::from_config(&scene.description().camera, size.aspect_ratio());
        scene.advance_frame(None);
        renderer.prepare(&queue, &camera, &scene, 1.0 / 60.0);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("test-encoder"),
        });
        renderer.encode(&mut encoder, &view);
        queue.submit(std::iter::once(encoder.finish()));

        renderer.resize(&device, PhysicalSize::new(16, 8));
    }
}
