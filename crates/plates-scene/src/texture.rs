//! Texture assets: identifiers, decoded images and where they come from.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use noise::{NoiseFn, Simplex};

/// Well-known asset identifiers used by the plate scene.
pub mod assets {
    pub const WOOD_COLOR: &str = "Wood068_1K_Color.jpg";
    pub const WOOD_NORMAL: &str = "Wood068_1K_NormalGL.jpg";
    pub const WOOD_ROUGHNESS: &str = "Wood068_1K_Roughness.jpg";
    pub const SKY_COLOR: &str = "SkyOnlyHDRI010_1K-TONEMAPPED.jpg";
}

/// Identifier of an image asset, relative to the texture root.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(Arc<str>);

impl AssetId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// How the texel values of an image should be interpreted on the GPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// Color data, decoded from sRGB when sampled.
    Srgb,
    /// Non-color data (normals, roughness) sampled as-is.
    Linear,
}

/// A fully decoded RGBA8 image. Immutable once produced.
#[derive(Clone, Debug)]
pub struct DecodedTexture {
    pub id: AssetId,
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows, top row first.
    pub pixels: Vec<u8>,
    pub color_space: ColorSpace,
}

impl DecodedTexture {
    pub fn from_image(id: AssetId, image: image::RgbaImage, color_space: ColorSpace) -> Self {
        let (width, height) = image.dimensions();
        Self {
            id,
            width,
            height,
            pixels: image.into_raw(),
            color_space,
        }
    }

    /// RGBA value at `(x, y)`, or `None` outside the image.
    pub fn texel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y * self.width + x) * 4) as usize;
        let px = self.pixels.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Errors raised while acquiring textures.
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("texture '{id}' not found at {}", path.display())]
    NotFound { id: AssetId, path: PathBuf },
    #[error("failed to read texture '{id}': {source}")]
    Io {
        id: AssetId,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode texture '{id}': {source}")]
    Decode {
        id: AssetId,
        #[source]
        source: image::ImageError,
    },
    #[error("no procedural generator for texture '{id}'")]
    UnknownProcedural { id: AssetId },
    #[error("failed to spawn texture worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
    #[error("texture worker stopped before '{id}' was decoded")]
    WorkerDisconnected { id: AssetId },
}

/// Produces decoded images for asset identifiers.
pub trait TextureSource: Send + Sync {
    fn load(&self, id: &AssetId, color_space: ColorSpace) -> Result<DecodedTexture, TextureError>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Loads images from a directory, decoding JPEG or PNG by content.
#[derive(Clone, Debug)]
pub struct FileTextureSource {
    root: PathBuf,
}

impl FileTextureSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: &AssetId) -> PathBuf {
        self.root.join(id.as_str())
    }
}

impl TextureSource for FileTextureSource {
    fn load(&self, id: &AssetId, color_space: ColorSpace) -> Result<DecodedTexture, TextureError> {
        let path = self.path_for(id);
        if !path.is_file() {
            return Err(TextureError::NotFound {
                id: id.clone(),
                path,
            });
        }

        let io_err = |source: std::io::Error| TextureError::Io {
            id: id.clone(),
            source,
        };
        let image = image::ImageReader::open(&path)
            .map_err(io_err)?
            .with_guessed_format()
            .map_err(io_err)?
            .decode()
            .map_err(|source| TextureError::Decode {
                id: id.clone(),
                source,
            })?;

        Ok(DecodedTexture::from_image(
            id.clone(),
            image.to_rgba8(),
            color_space,
        ))
    }

    fn describe(&self) -> String {
        format!("files in {}", self.root.display())
    }
}

/// Synthesizes stand-ins for the well-known wood and sky images.
#[derive(Clone, Debug)]
pub struct ProceduralTextureSource {
    size: u32,
    seed: u32,
}

impl Default for ProceduralTextureSource {
    fn default() -> Self {
        Self::new(256, 68)
    }
}

impl ProceduralTextureSource {
    pub fn new(size: u32, seed: u32) -> Self {
        Self {
            size: size.max(1),
            seed,
        }
    }

    /// Grain value in `[0, 1]` at normalized coordinates.
    fn grain(&self, simplex: &Simplex, u: f64, v: f64) -> f64 {
        let warp = simplex.get([u * 4.0, v * 4.0]) * 0.6;
        let rings = ((u * 38.0 + warp * 6.0).sin() + 1.0) * 0.5;
        let fibre = simplex.get([u * 90.0, v * 6.0]) * 0.5 + 0.5;
        (rings * 0.7 + fibre * 0.3).clamp(0.0, 1.0)
    }

    fn wood_color(&self, simplex: &Simplex) -> image::RgbaImage {
        let size = self.size as f64;
        image::RgbaImage::from_fn(self.size, self.size, |x, y| {
            let g = self.grain(simplex, x as f64 / size, y as f64 / size);
            let dark = [92.0, 56.0, 30.0];
            let light = [176.0, 122.0, 74.0];
            let c = |i: usize| (dark[i] + (light[i] - dark[i]) * g) as u8;
            image::Rgba([c(0), c(1), c(2), 255])
        })
    }

    fn wood_normal(&self, simplex: &Simplex) -> image::RgbaImage {
        let size = self.size as f64;
        let step = 1.0 / size;
        image::RgbaImage::from_fn(self.size, self.size, |x, y| {
            let (u, v) = (x as f64 / size, y as f64 / size);
            let dx = self.grain(simplex, u + step, v) - self.grain(simplex, u - step, v);
            let dy = self.grain(simplex, u, v + step) - self.grain(simplex, u, v - step);
            let n = glam::DVec3::new(-dx * 0.8, -dy * 0.8, 1.0).normalize();
            let enc = |c: f64| ((c * 0.5 + 0.5) * 255.0).round() as u8;
            image::Rgba([enc(n.x), enc(n.y), enc(n.z), 255])
        })
    }

    fn wood_roughness(&self, simplex: &Simplex) -> image::RgbaImage {
        let size = self.size as f64;
        image::RgbaImage::from_fn(self.size, self.size, |x, y| {
            let g = self.grain(simplex, x as f64 / size, y as f64 / size);
            let r = (150.0 + 90.0 * (1.0 - g)) as u8;
            image::Rgba([r, r, r, 255])
        })
    }

    fn sky_color(&self, simplex: &Simplex) -> image::RgbaImage {
        let width = self.size * 2;
        let height = self.size;
        image::RgbaImage::from_fn(width, height, |x, y| {
            // Equirectangular: top row is the zenith.
            let v = y as f64 / height as f64;
            let u = x as f64 / width as f64;
            let zenith = [48.0, 92.0, 170.0];
            let horizon = [186.0, 208.0, 232.0];
            let t = (v * 2.0).min(1.0);
            let cloud = (simplex.get([u * 12.0, v * 6.0]) * 0.5 + 0.5).powf(3.0) * 60.0;
            let c = |i: usize| (zenith[i] + (horizon[i] - zenith[i]) * t + cloud).min(255.0) as u8;
            image::Rgba([c(0), c(1), c(2), 255])
        })
    }
}

impl TextureSource for ProceduralTextureSource {
    fn load(&self, id: &AssetId, color_space: ColorSpace) -> Result<DecodedTexture, TextureError> {
        let simplex = Simplex::new(self.seed);
        let image = match id.as_str() {
            assets::WOOD_COLOR => self.wood_color(&simplex),
            assets::WOOD_NORMAL => self.wood_normal(&simplex),
            assets::WOOD_ROUGHNESS => self.wood_roughness(&simplex),
            assets::SKY_COLOR => self.sky_color(&simplex),
            _ => return Err(TextureError::UnknownProcedural { id: id.clone() }),
        };
        Ok(DecodedTexture::from_image(id.clone(), image, color_space))
    }

    fn describe(&self) -> String {
        format!("procedural ({}px, seed {})", self.size, self.seed)
    }
}
