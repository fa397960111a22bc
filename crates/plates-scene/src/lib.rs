//! Plate row scene: procedural layout, per-plate state, the declarative scene
//! description, texture acquisition and the mounted scene the host drives.

pub mod cache;
pub mod description;
pub mod layout;
pub mod mount;
pub mod picking;
pub mod plate;
pub mod texture;

pub use cache::{PendingTextures, TextureCache, TextureRequest, TextureSet};
pub use description::{
    BloomParams, CameraConfig, FilmParams, Geometry, Light, Material, MeshNode, Placeholder,
    PlateNode, PostPassDescriptor, SceneBuilder, SceneDescription, SceneNode, SceneSettings,
    Side, TextureSlot, Transform, WrapMode, compose_scene,
};
pub use layout::{
    BASE_ROTATION_STEP, BASE_SPEED, LayoutConfig, LayoutConstants, PLATE_WIDTH, PlacementSpec,
    SPEED_INCREMENT, generate_layout, generate_layout_with,
};
pub use mount::{MountedScene, SceneMount};
pub use picking::{PointerDispatcher, Ray, intersect_box, pick_plates};
pub use plate::{HOVER_SCALE, PlateInstance, PlateInstanceState, PointerEvent, VisualState};
pub use texture::{
    AssetId, ColorSpace, DecodedTexture, FileTextureSource, ProceduralTextureSource,
    TextureError, TextureSource, assets,
};
