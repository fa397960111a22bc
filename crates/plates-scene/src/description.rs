//! Declarative description of the plate scene.
//!
//! A [`SceneDescription`] is plain data: camera settings, an ordered list of
//! [`SceneNode`]s (lights, plates, meshes), the post-processing passes and
//! the textures the scene needs. It is built once with [`SceneBuilder`] (or
//! [`compose_scene`] for the standard composition) and handed to the host,
//! which never mutates it.

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::cache::TextureRequest;
use crate::layout::{LayoutConfig, LayoutConstants, PlacementSpec, generate_layout_with};
use crate::texture::{AssetId, ColorSpace, assets};

/// Perspective camera parameters, fixed at mount time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            position: Vec3::new(0.0, 0.0, 10.0),
        }
    }
}

/// Position, XYZ Euler rotation (radians) and uniform scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z),
            self.position,
        )
    }
}

/// Primitive shapes the host knows how to build.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Geometry {
    /// Axis-aligned box centered on the origin.
    Box { width: f32, height: f32, depth: f32 },
    /// Plane in the XY plane facing +Z.
    Plane { width: f32, height: f32 },
    /// UV sphere centered on the origin.
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
}

/// Which faces of a mesh are rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Side {
    #[default]
    Front,
    Back,
}

/// Texture addressing outside `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
}

/// A texture bound to one material slot.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureSlot {
    pub asset: AssetId,
    pub wrap: WrapMode,
    /// UV multiplier; only meaningful with [`WrapMode::Repeat`].
    pub repeat: [f32; 2],
}

impl TextureSlot {
    pub fn new(asset: impl Into<AssetId>) -> Self {
        Self {
            asset: asset.into(),
            wrap: WrapMode::ClampToEdge,
            repeat: [1.0, 1.0],
        }
    }

    pub fn repeating(mut self, repeat: [f32; 2]) -> Self {
        self.wrap = WrapMode::Repeat;
        self.repeat = repeat;
        self
    }
}

/// Physically based material with optional color, normal and roughness maps.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub color_map: Option<TextureSlot>,
    pub normal_map: Option<TextureSlot>,
    pub roughness_map: Option<TextureSlot>,
    pub roughness: f32,
    pub metalness: f32,
    pub side: Side,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color_map: None,
            normal_map: None,
            roughness_map: None,
            roughness: 1.0,
            metalness: 0.0,
            side: Side::Front,
        }
    }
}

impl Material {
    /// Wood color, normal and roughness maps.
    pub fn wood() -> Self {
        Self {
            color_map: Some(TextureSlot::new(assets::WOOD_COLOR)),
            normal_map: Some(TextureSlot::new(assets::WOOD_NORMAL)),
            roughness_map: Some(TextureSlot::new(assets::WOOD_ROUGHNESS)),
            ..Self::default()
        }
    }

    /// Sky color map seen from inside the dome.
    pub fn sky() -> Self {
        Self {
            color_map: Some(TextureSlot::new(assets::SKY_COLOR)),
            side: Side::Back,
            ..Self::default()
        }
    }

    /// Every texture the material samples, with the color space it needs.
    pub fn textures(&self) -> impl Iterator<Item = (&TextureSlot, ColorSpace)> {
        [
            (self.color_map.as_ref(), ColorSpace::Srgb),
            (self.normal_map.as_ref(), ColorSpace::Linear),
            (self.roughness_map.as_ref(), ColorSpace::Linear),
        ]
        .into_iter()
        .filter_map(|(slot, space)| slot.map(|slot| (slot, space)))
    }
}

/// Light sources. Intensities follow the usual unitless 0..1 convention.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Light {
    Ambient {
        color: [f32; 3],
        intensity: f32,
    },
    Point {
        color: [f32; 3],
        intensity: f32,
        position: Vec3,
        /// Cutoff distance; `0.0` disables attenuation.
        distance: f32,
        decay: f32,
    },
    Spot {
        color: [f32; 3],
        intensity: f32,
        position: Vec3,
        target: Vec3,
        /// Half-angle of the cone, radians.
        angle: f32,
        penumbra: f32,
        distance: f32,
        decay: f32,
    },
}

pub const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

impl Light {
    pub fn ambient(intensity: f32) -> Self {
        Self::Ambient {
            color: WHITE,
            intensity,
        }
    }

    pub fn point(intensity: f32, position: Vec3) -> Self {
        Self::Point {
            color: WHITE,
            intensity,
            position,
            distance: 0.0,
            decay: 1.0,
        }
    }

    pub fn spot(intensity: f32, position: Vec3) -> Self {
        Self::Spot {
            color: WHITE,
            intensity,
            position,
            target: Vec3::ZERO,
            angle: std::f32::consts::FRAC_PI_3,
            penumbra: 0.0,
            distance: 0.0,
            decay: 1.0,
        }
    }
}

/// One plate of the row: its placement plus shared geometry and material.
#[derive(Clone, Debug, PartialEq)]
pub struct PlateNode {
    pub index: usize,
    pub placement: PlacementSpec,
    pub geometry: Geometry,
    pub material: Material,
}

impl PlateNode {
    /// Full box size, or zero for non-box geometry.
    pub fn size(&self) -> Vec3 {
        match self.geometry {
            Geometry::Box {
                width,
                height,
                depth,
            } => Vec3::new(width, height, depth),
            _ => Vec3::ZERO,
        }
    }
}

/// A static mesh such as the ground or the sky dome.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshNode {
    pub label: String,
    pub geometry: Geometry,
    pub material: Material,
    pub transform: Transform,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SceneNode {
    Light(Light),
    Plate(PlateNode),
    Mesh(MeshNode),
}

/// Gaussian bloom: `(strength, kernel size, sigma, resolution)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BloomParams {
    pub strength: f32,
    pub kernel_size: u32,
    pub sigma: f32,
    pub resolution: u32,
}

impl Default for BloomParams {
    fn default() -> Self {
        Self::from_tuple([1.0, 25.0, 4.0, 256.0])
    }
}

impl BloomParams {
    pub fn from_tuple(args: [f32; 4]) -> Self {
        Self {
            strength: args[0],
            kernel_size: args[1].max(0.0) as u32,
            sigma: args[2],
            resolution: args[3].max(1.0) as u32,
        }
    }

    pub fn to_tuple(&self) -> [f32; 4] {
        [
            self.strength,
            self.kernel_size as f32,
            self.sigma,
            self.resolution as f32,
        ]
    }
}

/// Film grain and scanlines: `(noise, scanline intensity, scanline count, grayscale)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilmParams {
    pub noise_intensity: f32,
    pub scanline_intensity: f32,
    pub scanline_count: f32,
    pub grayscale: bool,
}

impl Default for FilmParams {
    fn default() -> Self {
        Self::from_tuple([0.25, 0.1, 900.0, 0.0])
    }
}

impl FilmParams {
    pub fn from_tuple(args: [f32; 4]) -> Self {
        Self {
            noise_intensity: args[0],
            scanline_intensity: args[1],
            scanline_count: args[2],
            grayscale: args[3] != 0.0,
        }
    }

    pub fn to_tuple(&self) -> [f32; 4] {
        [
            self.noise_intensity,
            self.scanline_intensity,
            self.scanline_count,
            if self.grayscale { 1.0 } else { 0.0 },
        ]
    }
}

/// A full-screen pass applied after the scene is drawn, in list order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PostPassDescriptor {
    Bloom(BloomParams),
    Film(FilmParams),
}

/// What is shown while textures are still loading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Placeholder {
    /// Clear to black and draw nothing.
    #[default]
    Nothing,
}

/// The complete, immutable scene handed to the host.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneDescription {
    pub camera: CameraConfig,
    pub orbit_controls: bool,
    pub nodes: Vec<SceneNode>,
    pub post: Vec<PostPassDescriptor>,
    pub placeholder: Placeholder,
}

impl SceneDescription {
    pub fn plates(&self) -> impl Iterator<Item = &PlateNode> {
        self.nodes.iter().filter_map(|node| match node {
            SceneNode::Plate(plate) => Some(plate),
            _ => None,
        })
    }

    pub fn lights(&self) -> impl Iterator<Item = &Light> {
        self.nodes.iter().filter_map(|node| match node {
            SceneNode::Light(light) => Some(light),
            _ => None,
        })
    }

    pub fn meshes(&self) -> impl Iterator<Item = &MeshNode> {
        self.nodes.iter().filter_map(|node| match node {
            SceneNode::Mesh(mesh) => Some(mesh),
            _ => None,
        })
    }

    /// Every texture referenced by any material, deduplicated.
    pub fn texture_request(&self) -> TextureRequest {
        let mut request = TextureRequest::new();
        for node in &self.nodes {
            let material = match node {
                SceneNode::Plate(plate) => &plate.material,
                SceneNode::Mesh(mesh) => &mesh.material,
                SceneNode::Light(_) => continue,
            };
            for (slot, space) in material.textures() {
                request.push(slot.asset.clone(), space);
            }
        }
        request
    }
}

/// Fluent construction of a [`SceneDescription`]. Nodes keep insertion order.
#[derive(Clone, Debug, Default)]
pub struct SceneBuilder {
    camera: CameraConfig,
    orbit_controls: bool,
    nodes: Vec<SceneNode>,
    post: Vec<PostPassDescriptor>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    pub fn orbit_controls(mut self, enabled: bool) -> Self {
        self.orbit_controls = enabled;
        self
    }

    pub fn light(mut self, light: Light) -> Self {
        self.nodes.push(SceneNode::Light(light));
        self
    }

    pub fn ambient_light(self, intensity: f32) -> Self {
        self.light(Light::ambient(intensity))
    }

    pub fn point_light(self, intensity: f32, position: Vec3) -> Self {
        self.light(Light::point(intensity, position))
    }

    pub fn spot_light(self, intensity: f32, position: Vec3) -> Self {
        self.light(Light::spot(intensity, position))
    }

    /// Append one plate node per placement, all sharing `geometry` and `material`.
    ///
    /// Plate indices continue from any plates already added, so they always
    /// match the plate's position in [`SceneDescription::plates`].
    pub fn plates(
        mut self,
        placements: &[PlacementSpec],
        geometry: Geometry,
        material: &Material,
    ) -> Self {
        let first = self
            .nodes
            .iter()
            .filter(|node| matches!(node, SceneNode::Plate(_)))
            .count();
        self.nodes
            .extend(placements.iter().enumerate().map(|(offset, placement)| {
                SceneNode::Plate(PlateNode {
                    index: first + offset,
                    placement: *placement,
                    geometry,
                    material: material.clone(),
                })
            }));
        self
    }

    pub fn mesh(mut self, mesh: MeshNode) -> Self {
        self.nodes.push(SceneNode::Mesh(mesh));
        self
    }

    /// Wooden floor: a `size × size` plane at `y`, laid flat.
    pub fn ground(self, size: f32, y: f32, repeat: [f32; 2]) -> Self {
        let mut material = Material::wood();
        material.color_map = material.color_map.map(|slot| slot.repeating(repeat));
        self.mesh(MeshNode {
            label: "ground".into(),
            geometry: Geometry::Plane {
                width: size,
                height: size,
            },
            material,
            transform: Transform {
                position: Vec3::new(0.0, y, 0.0),
                rotation: Vec3::new(-std::f32::consts::FRAC_PI_2, 0.0, 0.0),
                scale: 1.0,
            },
        })
    }

    /// Sky dome rendered from the inside.
    pub fn sky(self, radius: f32, segments: u32, y: f32) -> Self {
        self.mesh(MeshNode {
            label: "sky".into(),
            geometry: Geometry::Sphere {
                radius,
                width_segments: segments,
                height_segments: segments,
            },
            material: Material::sky(),
            transform: Transform {
                position: Vec3::new(0.0, y, 0.0),
                ..Transform::default()
            },
        })
    }

    pub fn bloom(mut self, params: BloomParams) -> Self {
        self.post.push(PostPassDescriptor::Bloom(params));
        self
    }

    pub fn film(mut self, params: FilmParams) -> Self {
        self.post.push(PostPassDescriptor::Film(params));
        self
    }

    pub fn build(self) -> SceneDescription {
        SceneDescription {
            camera: self.camera,
            orbit_controls: self.orbit_controls,
            nodes: self.nodes,
            post: self.post,
            placeholder: Placeholder::Nothing,
        }
    }
}

/// Inputs of the standard composition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneSettings {
    pub layout: LayoutConfig,
    pub constants: LayoutConstants,
    pub camera: CameraConfig,
    pub orbit_controls: bool,
    pub ambient_intensity: f32,
    pub point_intensity: f32,
    pub point_position: Vec3,
    pub spot_intensity: f32,
    pub spot_position: Vec3,
    pub plate_height: f32,
    pub plate_depth: f32,
    pub ground_size: f32,
    pub ground_repeat: [f32; 2],
    pub floor_y: f32,
    pub sky_radius: f32,
    pub sky_segments: u32,
    pub post_enabled: bool,
    pub bloom: BloomParams,
    pub film: FilmParams,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            constants: LayoutConstants::default(),
            camera: CameraConfig::default(),
            orbit_controls: true,
            ambient_intensity: 0.15,
            point_intensity: 0.15,
            point_position: Vec3::ZERO,
            spot_intensity: 0.1,
            spot_position: Vec3::new(20.0, 100.0, 20.0),
            plate_height: 5.0,
            plate_depth: 5.0,
            ground_size: 200.0,
            ground_repeat: [1.0, 1.0],
            floor_y: -12.0,
            sky_radius: 100.0,
            sky_segments: 16,
            post_enabled: true,
            bloom: BloomParams::default(),
            film: FilmParams::default(),
        }
    }
}

/// Build the plate row scene: three lights, the plates, floor, sky, then
/// bloom followed by film.
pub fn compose_scene(settings: &SceneSettings) -> SceneDescription {
    let placements = generate_layout_with(&settings.layout, &settings.constants);
    let plate_geometry = Geometry::Box {
        width: settings.constants.plate_width,
        height: settings.plate_height,
        depth: settings.plate_depth,
    };

    let builder = SceneBuilder::new()
        .camera(settings.camera)
        .orbit_controls(settings.orbit_controls)
        .ambient_light(settings.ambient_intensity)
        .point_light(settings.point_intensity, settings.point_position)
        .spot_light(settings.spot_intensity, settings.spot_position)
        .plates(&placements, plate_geometry, &Material::wood())
        .ground(settings.ground_size, settings.floor_y, settings.ground_repeat)
        .sky(settings.sky_radius, settings.sky_segments, settings.floor_y);

    let builder = if settings.post_enabled {
        builder.bloom(settings.bloom).film(settings.film)
    } else {
        builder
    };
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> SceneDescription {
        compose_scene(&SceneSettings::default())
    }

    #[test]
    fn test_camera_defaults() {
        let scene = standard();
        assert_eq!(scene.camera.fov_degrees, 75.0);
        assert_eq!(scene.camera.near, 0.1);
        assert_eq!(scene.camera.far, 1000.0);
        assert_eq!(scene.camera.position, Vec3::new(0.0, 0.0, 10.0));
        assert!(scene.orbit_controls);
        assert_eq!(scene.placeholder, Placeholder::Nothing);
    }

    #[test]
    fn test_node_order() {
        let scene = standard();
        assert!(matches!(scene.nodes[0], SceneNode::Light(Light::Ambient { .. })));
        assert!(matches!(scene.nodes[1], SceneNode::Light(Light::Point { .. })));
        assert!(matches!(scene.nodes[2], SceneNode::Light(Light::Spot { .. })));
        for node in &scene.nodes[3..83] {
            assert!(matches!(node, SceneNode::Plate(_)));
        }
        let labels: Vec<&str> = scene.meshes().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, ["ground", "sky"]);
        assert_eq!(scene.nodes.len(), 3 + 80 + 2);
    }

    #[test]
    fn test_light_parameters() {
        let lights: Vec<Light> = standard().lights().copied().collect();
        match lights[0] {
            Light::Ambient { intensity, .. } => assert_eq!(intensity, 0.15),
            other => panic!("unexpected {other:?}"),
        }
        match lights[1] {
            Light::Point {
                intensity, color, ..
            } => {
                assert_eq!(intensity, 0.15);
                assert_eq!(color, WHITE);
            }
            other => panic!("unexpected {other:?}"),
        }
        match lights[2] {
            Light::Spot {
                intensity,
                position,
                ..
            } => {
                assert_eq!(intensity, 0.1);
                assert_eq!(position, Vec3::new(20.0, 100.0, 20.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_plates_follow_layout() {
        let settings = SceneSettings {
            layout: LayoutConfig {
                count: 3,
                spacing: 0.04,
            },
            ..SceneSettings::default()
        };
        let scene = compose_scene(&settings);
        let plates: Vec<&PlateNode> = scene.plates().collect();
        assert_eq!(plates.len(), 3);
        for (i, plate) in plates.iter().enumerate() {
            assert_eq!(plate.index, i);
            assert_eq!(plate.size(), Vec3::new(0.25, 5.0, 5.0));
            assert_eq!(plate.material, Material::wood());
        }
        assert!((plates[0].placement.position_x + 0.29).abs() < 1e-5);
    }

    #[test]
    fn test_ground_and_sky() {
        let scene = standard();
        let meshes: Vec<&MeshNode> = scene.meshes().collect();

        let ground = meshes[0];
        assert_eq!(
            ground.geometry,
            Geometry::Plane {
                width: 200.0,
                height: 200.0
            }
        );
        assert_eq!(ground.transform.position.y, -12.0);
        assert!((ground.transform.rotation.x + std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        let color = ground.material.color_map.as_ref().unwrap();
        assert_eq!(color.wrap, WrapMode::Repeat);
        assert_eq!(
            ground.material.normal_map.as_ref().unwrap().wrap,
            WrapMode::ClampToEdge
        );

        let sky = meshes[1];
        assert_eq!(
            sky.geometry,
            Geometry::Sphere {
                radius: 100.0,
                width_segments: 16,
                height_segments: 16
            }
        );
        assert_eq!(sky.material.side, Side::Back);
        assert_eq!(sky.transform.position.y, -12.0);
    }

    #[test]
    fn test_post_passes_in_order() {
        let scene = standard();
        assert_eq!(scene.post.len(), 2);
        match scene.post[0] {
            PostPassDescriptor::Bloom(bloom) => {
                assert_eq!(bloom.to_tuple(), [1.0, 25.0, 4.0, 256.0]);
            }
            other => panic!("expected bloom first, got {other:?}"),
        }
        match scene.post[1] {
            PostPassDescriptor::Film(film) => {
                assert_eq!(film.to_tuple(), [0.25, 0.1, 900.0, 0.0]);
                assert!(!film.grayscale);
            }
            other => panic!("expected film second, got {other:?}"),
        }
    }

    #[test]
    fn test_post_can_be_disabled() {
        let settings = SceneSettings {
            post_enabled: false,
            ..SceneSettings::default()
        };
        assert!(compose_scene(&settings).post.is_empty());
    }

    #[test]
    fn test_texture_request_covers_scene_assets() {
        let request = standard().texture_request();
        assert_eq!(request.len(), 4);
        let spaces: Vec<(String, ColorSpace)> = request
            .iter()
            .map(|(id, space)| (id.to_string(), *space))
            .collect();
        assert_eq!(
            spaces,
            [
                (assets::WOOD_COLOR.to_string(), ColorSpace::Srgb),
                (assets::WOOD_NORMAL.to_string(), ColorSpace::Linear),
                (assets::WOOD_ROUGHNESS.to_string(), ColorSpace::Linear),
                (assets::SKY_COLOR.to_string(), ColorSpace::Srgb),
            ]
        );
    }

    #[test]
    fn test_builder_preserves_insertion_order() {
        let scene = SceneBuilder::new()
            .sky(10.0, 8, 0.0)
            .ambient_light(1.0)
            .film(FilmParams::default())
            .bloom(BloomParams::default())
            .build();
        assert!(matches!(scene.nodes[0], SceneNode::Mesh(_)));
        assert!(matches!(scene.nodes[1], SceneNode::Light(_)));
        assert!(matches!(scene.post[0], PostPassDescriptor::Film(_)));
        assert!(!scene.orbit_controls);
    }

    #[test]
    fn test_plate_indices_continue_across_groups() {
        let placements = generate_layout_with(
            &LayoutConfig {
                count: 2,
                spacing: 0.04,
            },
            &LayoutConstants::default(),
        );
        let geometry = Geometry::Box {
            width: 0.25,
            height: 5.0,
            depth: 5.0,
        };
        let scene = SceneBuilder::new()
            .plates(&placements, geometry, &Material::wood())
            .ambient_light(0.1)
            .plates(&placements, geometry, &Material::wood())
            .build();
        let indices: Vec<usize> = scene.plates().map(|plate| plate.index).collect();
        assert_eq!(indices, [0, 1, 2, 3]);
    }

    #[test]
    fn test_transform_matrix() {
        let t = Transform {
            position: Vec3::new(0.0, -12.0, 0.0),
            rotation: Vec3::new(-std::f32::consts::FRAC_PI_2, 0.0, 0.0),
            scale: 1.0,
        };
        // The plane's +Z normal points up once laid flat.
        let normal = t.matrix().transform_vector3(Vec3::Z);
        assert!((normal - Vec3::Y).length() < 1e-5);
        assert_eq!(t.matrix().w_axis.y, -12.0);
    }

    #[test]
    fn test_film_grayscale_flag() {
        assert!(FilmParams::from_tuple([0.0, 0.0, 1.0, 1.0]).grayscale);
        assert!(!FilmParams::from_tuple([0.0, 0.0, 1.0, 0.0]).grayscale);
    }
}
