//! Scene-wide texture cache with background decoding.
//!
//! [`TextureCache`] owns a small pool of named worker threads. A
//! [`TextureRequest`] submitted through [`TextureCache::acquire`] yields a
//! [`PendingTextures`] handle that the render thread polls once per frame
//! until every image has been decoded. Decoded images are stored once per
//! [`AssetId`] and handed out as shared `Arc`s.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use dashmap::DashMap;

use crate::texture::{AssetId, ColorSpace, DecodedTexture, TextureError, TextureSource};

/// The set of textures a scene needs, in first-requested order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextureRequest {
    entries: Vec<(AssetId, ColorSpace)>,
}

impl TextureRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset. Repeated ids are ignored; the first color space wins.
    pub fn push(&mut self, id: AssetId, color_space: ColorSpace) {
        if !self.contains(&id) {
            self.entries.push((id, color_space));
        }
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.entries.iter().any(|(existing, _)| existing == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(AssetId, ColorSpace)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A fully resolved group of textures. Cheap to clone.
#[derive(Clone, Debug, Default)]
pub struct TextureSet {
    textures: HashMap<AssetId, Arc<DecodedTexture>>,
}

impl TextureSet {
    pub fn get(&self, id: &AssetId) -> Option<&Arc<DecodedTexture>> {
        self.textures.get(id)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, &Arc<DecodedTexture>)> {
        self.textures.iter()
    }
}

type DecodeOutcome = (AssetId, Result<Arc<DecodedTexture>, TextureError>);

struct DecodeJob {
    id: AssetId,
    color_space: ColorSpace,
    reply: Sender<DecodeOutcome>,
}

/// Decoded textures keyed by [`AssetId`], shared by every consumer.
pub struct TextureCache {
    source: Arc<dyn TextureSource>,
    entries: Arc<DashMap<AssetId, Arc<DecodedTexture>>>,
    job_sender: Sender<DecodeJob>,
}

impl TextureCache {
    /// Create a cache backed by `source` with `worker_count` decode threads.
    pub fn new(source: Arc<dyn TextureSource>, worker_count: usize) -> Result<Self, TextureError> {
        let (job_sender, job_receiver) = unbounded::<DecodeJob>();
        let entries = Arc::new(DashMap::new());

        for worker in 0..worker_count.max(1) {
            let receiver = job_receiver.clone();
            let source = Arc::clone(&source);
            let entries = Arc::clone(&entries);

            std::thread::Builder::new()
                .name(format!("texture-decode-{worker}"))
                .spawn(move || decode_worker(receiver, source, entries))
                .map_err(TextureError::WorkerSpawn)?;
        }

        tracing::debug!(
            workers = worker_count.max(1),
            source = %source.describe(),
            "Texture cache started"
        );

        Ok(Self {
            source,
            entries,
            job_sender,
        })
    }

    /// Start acquiring every texture in `request`. Never blocks.
    pub fn acquire(&self, request: &TextureRequest) -> PendingTextures {
        let (reply, receiver) = unbounded();
        let mut resolved = HashMap::new();
        let mut outstanding = Vec::new();

        for (id, color_space) in request.iter() {
            if let Some(texture) = self.entries.get(id) {
                resolved.insert(id.clone(), Arc::clone(texture.value()));
                continue;
            }
            let job = DecodeJob {
                id: id.clone(),
                color_space: *color_space,
                reply: reply.clone(),
            };
            if self.job_sender.send(job).is_err() {
                return PendingTextures::failed(TextureError::WorkerDisconnected { id: id.clone() });
            }
            outstanding.push(id.clone());
        }

        tracing::debug!(
            cached = resolved.len(),
            queued = outstanding.len(),
            "Texture request submitted"
        );

        PendingTextures {
            resolved,
            outstanding,
            receiver: Some(receiver),
            failure: None,
        }
    }

    pub fn get(&self, id: &AssetId) -> Option<Arc<DecodedTexture>> {
        self.entries.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached texture. Outstanding `Arc`s stay valid.
    pub fn clear(&self) {
        let count = self.entries.len();
        self.entries.clear();
        tracing::debug!(count, "Texture cache cleared");
    }

    pub fn source(&self) -> &dyn TextureSource {
        self.source.as_ref()
    }
}

fn decode_worker(
    receiver: Receiver<DecodeJob>,
    source: Arc<dyn TextureSource>,
    entries: Arc<DashMap<AssetId, Arc<DecodedTexture>>>,
) {
    while let Ok(job) = receiver.recv() {
        let outcome = match entries.get(&job.id) {
            Some(existing) => Ok(Arc::clone(existing.value())),
            None => {
                let start = std::time::Instant::now();
                source.load(&job.id, job.color_space).map(|texture| {
                    tracing::debug!(
                        id = %job.id,
                        width = texture.width,
                        height = texture.height,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Decoded texture"
                    );
                    // A concurrent decode of the same id keeps the first copy.
                    Arc::clone(
                        entries
                            .entry(job.id.clone())
                            .or_insert_with(|| Arc::new(texture))
                            .value(),
                    )
                })
            }
        };
        let _ = job.reply.send((job.id, outcome));
    }
}

/// Handle to an in-progress texture acquisition.
pub struct PendingTextures {
    resolved: HashMap<AssetId, Arc<DecodedTexture>>,
    outstanding: Vec<AssetId>,
    receiver: Option<Receiver<DecodeOutcome>>,
    failure: Option<TextureError>,
}

impl PendingTextures {
    fn failed(error: TextureError) -> Self {
        Self {
            resolved: HashMap::new(),
            outstanding: Vec::new(),
            receiver: None,
            failure: Some(error),
        }
    }

    /// Number of textures still being decoded.
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    pub fn is_resolved(&self) -> bool {
        self.failure.is_none() && self.outstanding.is_empty()
    }

    fn accept(&mut self, outcome: DecodeOutcome) -> Result<(), TextureError> {
        let (id, result) = outcome;
        let texture = result?;
        self.outstanding.retain(|pending| pending != &id);
        self.resolved.insert(id, texture);
        Ok(())
    }

    fn snapshot(&self) -> TextureSet {
        TextureSet {
            textures: self.resolved.clone(),
        }
    }

    fn disconnected(&self) -> TextureError {
        match self.outstanding.first() {
            Some(id) => TextureError::WorkerDisconnected { id: id.clone() },
            None => TextureError::WorkerDisconnected {
                id: AssetId::new(""),
            },
        }
    }

    /// Collect finished decodes without blocking.
    ///
    /// Returns `Ok(None)` while any texture is outstanding and
    /// `Ok(Some(set))` once all of them are available.
    pub fn try_resolve(&mut self) -> Result<Option<TextureSet>, TextureError> {
        if let Some(error) = self.failure.take() {
            return Err(error);
        }
        while !self.outstanding.is_empty() {
            let Some(receiver) = self.receiver.as_ref() else {
                return Err(self.disconnected());
            };
            match receiver.try_recv() {
                Ok(outcome) => self.accept(outcome)?,
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(self.disconnected()),
            }
        }
        Ok(Some(self.snapshot()))
    }

    /// Block until every texture is decoded or one fails.
    pub fn wait(mut self) -> Result<TextureSet, TextureError> {
        if let Some(error) = self.failure.take() {
            return Err(error);
        }
        while !self.outstanding.is_empty() {
            let outcome = match self.receiver.as_ref() {
                Some(receiver) => receiver.recv().map_err(|_| self.disconnected())?,
                None => return Err(self.disconnected()),
            };
            self.accept(outcome)?;
        }
        Ok(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::{ProceduralTextureSource, assets};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts loads and produces 1x1 images for any id except "missing".
    struct CountingSource {
        loads: AtomicUsize,
    }

    impl TextureSource for CountingSource {
        fn load(
            &self,
            id: &AssetId,
            color_space: ColorSpace,
        ) -> Result<DecodedTexture, TextureError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if id.as_str() == "missing" {
                return Err(TextureError::NotFound {
                    id: id.clone(),
                    path: "missing".into(),
                });
            }
            Ok(DecodedTexture::from_image(
                id.clone(),
                image::RgbaImage::from_pixel(1, 1, image::Rgba([1, 2, 3, 4])),
                color_space,
            ))
        }

        fn describe(&self) -> String {
            "counting".into()
        }
    }

    fn counting_cache() -> (Arc<CountingSource>, TextureCache) {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
        });
        let cache = TextureCache::new(source.clone(), 2).unwrap();
        (source, cache)
    }

    fn request(ids: &[&str]) -> TextureRequest {
        let mut request = TextureRequest::new();
        for id in ids {
            request.push(AssetId::new(id), ColorSpace::Srgb);
        }
        request
    }

    #[test]
    fn test_request_deduplicates() {
        let mut request = TextureRequest::new();
        request.push(AssetId::new("a"), ColorSpace::Srgb);
        request.push(AssetId::new("b"), ColorSpace::Linear);
        request.push(AssetId::new("a"), ColorSpace::Linear);
        assert_eq!(request.len(), 2);
        let first = request.iter().next().unwrap();
        assert_eq!(first.1, ColorSpace::Srgb);
    }

    #[test]
    fn test_wait_resolves_all() {
        let (_, cache) = counting_cache();
        let set = cache.acquire(&request(&["a", "b", "c"])).wait().unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.get(&AssetId::new("b")).is_some());
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_try_resolve_eventually_ready() {
        let (_, cache) = counting_cache();
        let mut pending = cache.acquire(&request(&["a", "b"]));
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        let set = loop {
            if let Some(set) = pending.try_resolve().unwrap() {
                break set;
            }
            assert!(std::time::Instant::now() < deadline, "textures never resolved");
            std::thread::sleep(std::time::Duration::from_millis(1));
        };
        assert_eq!(set.len(), 2);
        assert!(pending.is_resolved());
    }

    #[test]
    fn test_cached_textures_are_shared() {
        let (source, cache) = counting_cache();
        let first = cache.acquire(&request(&["a"])).wait().unwrap();
        let mut second_pending = cache.acquire(&request(&["a"]));
        // Already cached, so no decode is queued.
        assert_eq!(second_pending.outstanding(), 0);
        let second = second_pending.try_resolve().unwrap().unwrap();

        let id = AssetId::new("a");
        assert!(Arc::ptr_eq(
            first.get(&id).unwrap(),
            second.get(&id).unwrap()
        ));
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_texture_fails() {
        let (_, cache) = counting_cache();
        let err = cache.acquire(&request(&["a", "missing"])).wait().unwrap_err();
        assert!(matches!(err, TextureError::NotFound { .. }));
        assert!(!cache.contains(&AssetId::new("missing")));
    }

    #[test]
    fn test_empty_request_resolves_immediately() {
        let (_, cache) = counting_cache();
        let mut pending = cache.acquire(&TextureRequest::new());
        let set = pending.try_resolve().unwrap().unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_clear_keeps_outstanding_arcs() {
        let (source, cache) = counting_cache();
        let set = cache.acquire(&request(&["a"])).wait().unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(set.get(&AssetId::new("a")).unwrap().width, 1);

        cache.acquire(&request(&["a"])).wait().unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_procedural_scene_textures() {
        let cache = TextureCache::new(Arc::new(ProceduralTextureSource::new(8, 1)), 1).unwrap();
        let set = cache
            .acquire(&request(&[assets::WOOD_COLOR, assets::SKY_COLOR]))
            .wait()
            .unwrap();
        assert_eq!(set.len(), 2);
    }
}
