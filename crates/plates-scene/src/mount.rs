//! Mounting a scene description: suspension until textures are ready, then
//! the live plate instances the host animates and interacts with.

use std::sync::Arc;

use crate::cache::{PendingTextures, TextureCache, TextureSet};
use crate::description::SceneDescription;
use crate::picking::{Ray, pick_plates};
use crate::plate::{PlateInstance, PointerEvent};
use crate::texture::TextureError;

/// A scene whose textures are all available.
pub struct MountedScene {
    description: SceneDescription,
    plates: Vec<PlateInstance>,
    textures: TextureSet,
}

impl MountedScene {
    /// Materialize one [`PlateInstance`] per plate node.
    pub fn new(description: SceneDescription, textures: TextureSet) -> Self {
        let plates = description
            .plates()
            .map(|node| PlateInstance::new(node.index, node.placement, node.size()))
            .collect();
        Self {
            description,
            plates,
            textures,
        }
    }

    pub fn description(&self) -> &SceneDescription {
        &self.description
    }

    pub fn plates(&self) -> &[PlateInstance] {
        &self.plates
    }

    pub fn textures(&self) -> &TextureSet {
        &self.textures
    }

    /// Advance every plate by one frame. See [`PlateInstance::advance_frame`].
    pub fn advance_frame(&mut self, delta: Option<f32>) {
        for plate in &mut self.plates {
            plate.advance_frame(delta);
        }
    }

    /// Deliver events to plates by index. Unknown indices are ignored.
    pub fn dispatch(&mut self, events: &[(usize, PointerEvent)]) {
        for &(index, event) in events {
            if let Some(plate) = self.plates.get_mut(index) {
                plate.handle_event(event);
            }
        }
    }

    /// Indices of every plate under `ray`, nearest first.
    pub fn pick(&self, ray: &Ray) -> Vec<usize> {
        pick_plates(ray, &self.plates)
            .into_iter()
            .map(|(index, _)| index)
            .collect()
    }
}

enum MountState {
    Suspended {
        description: Box<SceneDescription>,
        pending: PendingTextures,
    },
    Ready(MountedScene),
    Failed,
}

/// Lifecycle of a mounted scene.
pub struct SceneMount {
    cache: Arc<TextureCache>,
    state: MountState,
}

impl SceneMount {
    /// Mount `description`, starting texture acquisition through `cache`.
    pub fn mount(description: SceneDescription, cache: Arc<TextureCache>) -> Self {
        let request = description.texture_request();
        tracing::info!(
            textures = request.len(),
            plates = description.plates().count(),
            "Mounting scene"
        );
        let pending = cache.acquire(&request);
        Self {
            cache,
            state: MountState::Suspended {
                description: Box::new(description),
                pending,
            },
        }
    }

    /// Check texture progress. Returns the mounted scene once ready.
    ///
    /// A texture error leaves the mount failed; later polls return `Ok(None)`.
    pub fn poll(&mut self) -> Result<Option<&mut MountedScene>, TextureError> {
        if let MountState::Suspended { pending, .. } = &mut self.state {
            match pending.try_resolve() {
                Ok(None) => return Ok(None),
                Ok(Some(textures)) => {
                    if let MountState::Suspended { description, .. } =
                        std::mem::replace(&mut self.state, MountState::Failed)
                    {
                        tracing::info!(textures = textures.len(), "Scene textures resolved");
                        self.state = MountState::Ready(MountedScene::new(*description, textures));
                    }
                }
                Err(err) => {
                    self.state = MountState::Failed;
                    return Err(err);
                }
            }
        }
        match &mut self.state {
            MountState::Ready(scene) => Ok(Some(scene)),
            _ => Ok(None),
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self.state, MountState::Suspended { .. })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, MountState::Ready(_))
    }

    pub fn scene(&self) -> Option<&MountedScene> {
        match &self.state {
            MountState::Ready(scene) => Some(scene),
            _ => None,
        }
    }

    pub fn scene_mut(&mut self) -> Option<&mut MountedScene> {
        match &mut self.state {
            MountState::Ready(scene) => Some(scene),
            _ => None,
        }
    }

    /// Tear the scene down and release the cached textures.
    pub fn unmount(self) {
        self.cache.clear();
        tracing::info!("Scene unmounted");
    }
}
