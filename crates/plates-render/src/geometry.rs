//! CPU-side mesh generation for the primitive shapes a scene can name.
//!
//! Triangles wind counter-clockwise seen from the outside. Texture
//! coordinates put `(0, 0)` at the top-left of the image.

use glam::Vec3;
use plates_scene::Geometry;

use crate::buffer::VertexPositionNormalUv;

/// Sphere tessellation floors.
const MIN_WIDTH_SEGMENTS: u32 = 3;
const MIN_HEIGHT_SEGMENTS: u32 = 2;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<VertexPositionNormalUv>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn from_geometry(geometry: &Geometry) -> Self {
        match *geometry {
            Geometry::Box {
                width,
                height,
                depth,
            } => box_mesh(width, height, depth),
            Geometry::Plane { width, height } => plane_mesh(width, height),
            Geometry::Sphere {
                radius,
                width_segments,
                height_segments,
            } => sphere_mesh(radius, width_segments, height_segments),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Append one quad. `right × up` must equal `normal` for the face to
    /// wind counter-clockwise when seen from `normal`.
    fn push_quad(&mut self, center: Vec3, right: Vec3, up: Vec3, normal: Vec3) {
        let base = self.vertices.len() as u32;
        for row in 0..2 {
            for col in 0..2 {
                let position = center + right * (col as f32 - 0.5) + up * (0.5 - row as f32);
                self.vertices.push(VertexPositionNormalUv {
                    position: position.to_array(),
                    normal: normal.to_array(),
                    uv: [col as f32, row as f32],
                });
            }
        }
        // 0 1
        // 2 3
        self.indices
            .extend_from_slice(&[base, base + 2, base + 1, base + 1, base + 2, base + 3]);
    }
}

/// Axis-aligned box centered on the origin: 6 faces, 24 vertices, 36 indices.
pub fn box_mesh(width: f32, height: f32, depth: f32) -> MeshData {
    let half = Vec3::new(width, height, depth) * 0.5;
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut mesh = MeshData::default();
    for (normal, right, up) in faces {
        let size = Vec3::new(width, height, depth);
        mesh.push_quad(normal * half, right * size, up * size, normal);
    }
    mesh
}

/// Plane in the XY plane facing +Z.
pub fn plane_mesh(width: f32, height: f32) -> MeshData {
    let mut mesh = MeshData::default();
    mesh.push_quad(
        Vec3::ZERO,
        Vec3::new(width, 0.0, 0.0),
        Vec3::new(0.0, height, 0.0),
        Vec3::Z,
    );
    mesh
}

/// UV sphere with `(w + 1)(h + 1)` vertices. The seam column and the pole
/// rows are duplicated so texture coordinates stay continuous.
pub fn sphere_mesh(radius: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let w = width_segments.max(MIN_WIDTH_SEGMENTS);
    let h = height_segments.max(MIN_HEIGHT_SEGMENTS);

    let mut mesh = MeshData::default();
    mesh.vertices.reserve(((w + 1) * (h + 1)) as usize);

    for iy in 0..=h {
        let v = iy as f32 / h as f32;
        let polar = v * std::f32::consts::PI;
        for ix in 0..=w {
            let u = ix as f32 / w as f32;
            let azimuth = u * std::f32::consts::TAU;
            let normal = Vec3::new(
                -azimuth.cos() * polar.sin(),
                polar.cos(),
                azimuth.sin() * polar.sin(),
            );
            mesh.vertices.push(VertexPositionNormalUv {
                position: (normal * radius).to_array(),
                normal: normal.to_array(),
                uv: [u, v],
            });
        }
    }

    let stride = w + 1;
    for iy in 0..h {
        for ix in 0..w {
            let a = iy * stride + ix + 1;
            let b = iy * stride + ix;
            let c = (iy + 1) * stride + ix;
            let d = (iy + 1) * stride + ix + 1;
            // The pole rows collapse to a point; skip their degenerate halves.
            if iy != 0 {
                mesh.indices.extend_from_slice(&[a, b, d]);
            }
            if iy != h - 1 {
                mesh.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    mesh
}
