//! wgpu rendering for the plate scene: surface management, primitive meshes,
//! the standard material pipeline and the bloom / film post chain.

pub mod bloom;
pub mod buffer;
pub mod camera;
pub mod depth;
pub mod film;
pub mod fullscreen;
pub mod geometry;
pub mod gpu;
pub mod lights;
pub mod post;
pub mod renderer;
pub mod standard_pipeline;
pub mod surface;
pub mod texture;

pub use bloom::{BloomPass, build_kernel};
pub use buffer::{IndexData, MeshBuffer, VertexPositionNormalUv};
pub use camera::{Camera, CameraUniform};
pub use depth::DepthBuffer;
pub use film::{FilmPass, film_shade};
pub use geometry::{MeshData, box_mesh, plane_mesh, sphere_mesh};
pub use gpu::{RenderContext, RenderContextError, SurfaceError, init_render_context_blocking};
pub use lights::LightsUniform;
pub use post::{HDR_FORMAT, PostChain};
pub use renderer::{SceneRenderer, render_clear_frame};
pub use standard_pipeline::StandardPipeline;
pub use surface::{PhysicalSize, SurfaceWrapper};
pub use texture::{GpuTexture, GpuTextureError, TextureManager};
