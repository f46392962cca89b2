use std::path::Path;
use std::sync::Arc;

use gg_util::eyre::Result;

use crate::loader::AssetLoaderObject;
use crate::shared::SharedData;
use crate::task::{new_task_channel, spawn_workers};
use crate::type_loader::TypeLoader;
use crate::{
    Asset, AssetError, AssetId, AssetKind, AssetLoader, AssetManagerConfig, Audio, AudioLoader,
    Cubemap, CubemapLoader, Device, Handle, HeadlessDevice, Model, ModelLoader, Source,
    Template, TemplateLoader, Texture, TextureLoader, UntypedHandle,
};

/// Registry of every loaded and loading asset, and the entry point for
/// loading.
///
/// Ids form one namespace across all kinds. Background results only become
/// visible during [`AssetManager::update`], which the host calls once per
/// frame.
#[derive(Debug)]
pub struct AssetManager {
    shared: Arc<SharedData>,
}

impl AssetManager {
    pub fn new<S: Source>(source: S) -> Result<AssetManager> {
        AssetManager::builder().build(source)
    }

    pub fn builder() -> AssetManagerBuilder {
        AssetManagerBuilder::new()
    }

    /// Produces the asset on the calling thread.
    ///
    /// Content that needs a finishing step is finished by the next
    /// [`update`](AssetManager::update). A template blocks until all of its
    /// dependencies are ready, driving updates itself when no other thread
    /// is, and fails with [`AssetError::DependencyFailed`] if one of them
    /// does not load. This also holds when the template is already being
    /// loaded by another call.
    pub fn load<A, P>(&self, id: impl Into<AssetId>, path: P) -> Result<Handle<A>, AssetError>
    where
        A: Asset,
        P: AsRef<Path>,
    {
        let handle = self.load_untyped(A::KIND, id, path)?;
        Ok(typed(handle))
    }

    /// Registers a placeholder and produces the asset on a background worker.
    /// Loading an id that is already registered returns the existing handle.
    pub fn load_async<A, P>(
        &self,
        id: impl Into<AssetId>,
        path: P,
    ) -> Result<Handle<A>, AssetError>
    where
        A: Asset,
        P: AsRef<Path>,
    {
        let handle = self.load_async_untyped(A::KIND, id, path)?;
        Ok(typed(handle))
    }

    pub fn load_untyped<P: AsRef<Path>>(
        &self,
        kind: AssetKind,
        id: impl Into<AssetId>,
        path: P,
    ) -> Result<UntypedHandle, AssetError> {
        let (handle, dependencies) = self.shared.load(kind, id.into(), path.as_ref().into())?;

        // A template already being loaded elsewhere is waited for as well.
        let pending_template = kind == AssetKind::Template && !handle.state().is_terminal();
        if !dependencies.is_empty() || pending_template {
            self.shared.wait_until_settled(&handle, dependencies)?;
        }

        Ok(handle)
    }

    pub fn load_async_untyped<P: AsRef<Path>>(
        &self,
        kind: AssetKind,
        id: impl Into<AssetId>,
        path: P,
    ) -> Result<UntypedHandle, AssetError> {
        self.shared
            .load_async(kind, id.into(), path.as_ref().into())
    }

    pub fn get(&self, id: &str) -> Option<UntypedHandle> {
        self.shared.get(id)
    }

    /// Like [`get`](AssetManager::get), but `None` if the id holds another
    /// kind.
    pub fn get_typed<A: Asset>(&self, id: &str) -> Option<Handle<A>> {
        self.get(id)?.typed()
    }

    pub fn has(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn is_loading(&self, id: &str) -> bool {
        self.get(id).map_or(false, |handle| handle.is_loading())
    }

    /// Drops the registry entry. An in-flight load for the id keeps running,
    /// but its result is discarded and the removed handle reports
    /// [`AssetError::Cancelled`].
    pub fn remove(&self, id: &str) -> Option<UntypedHandle> {
        self.shared.remove(id)
    }

    /// Publishes finished background loads and runs pending finishing steps.
    /// Call once per frame from the thread that owns the device.
    pub fn update(&self) {
        self.shared.update();
    }

    /// Abandons every in-flight load and forgets all assets.
    pub fn clear(&self) {
        self.shared.clear();
    }

    pub fn dependencies_ready(&self, ids: &[AssetId]) -> bool {
        self.shared.dependencies_ready(ids)
    }

    pub fn failed_dependency(&self, ids: &[AssetId]) -> Option<AssetId> {
        self.shared.failed_dependency(ids)
    }

    pub fn loaded_ids(&self) -> Vec<AssetId> {
        self.shared.ids_where(UntypedHandle::is_ready)
    }

    pub fn loading_ids(&self) -> Vec<AssetId> {
        self.shared.ids_where(UntypedHandle::is_loading)
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded_ids().len()
    }

    pub fn loading_count(&self) -> usize {
        self.loading_ids().len()
    }

    /// Number of loads the loaders are still tracking, including loads whose
    /// ids were removed from the registry.
    pub fn in_flight_count(&self) -> usize {
        self.shared.in_flight()
    }

    pub fn len(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn typed<A: Asset>(handle: UntypedHandle) -> Handle<A> {
    match handle.typed() {
        Some(v) => v,
        None => unreachable!("registry returned {:?} for a {} load", handle, A::KIND),
    }
}

pub struct AssetManagerBuilder {
    config: AssetManagerConfig,
    device: Option<Box<dyn Device>>,
    loaders: Vec<AssetLoaderObject>,
}

impl AssetManagerBuilder {
    fn new() -> AssetManagerBuilder {
        AssetManagerBuilder {
            config: AssetManagerConfig::default(),
            device: None,
            loaders: vec![
                AssetLoaderObject::new::<Model, _>(ModelLoader),
                AssetLoaderObject::new::<Texture, _>(TextureLoader),
                AssetLoaderObject::new::<Cubemap, _>(CubemapLoader),
                AssetLoaderObject::new::<Audio, _>(AudioLoader),
                AssetLoaderObject::new::<Template, _>(TemplateLoader),
            ],
        }
    }

    pub fn config(mut self, config: AssetManagerConfig) -> AssetManagerBuilder {
        self.config = config;
        self
    }

    pub fn device<D: Device>(mut self, device: D) -> AssetManagerBuilder {
        self.device = Some(Box::new(device));
        self
    }

    /// Replaces the loader for `A`, or adds one if none is registered.
    pub fn loader<A, L>(mut self, loader: L) -> AssetManagerBuilder
    where
        A: Asset,
        L: AssetLoader<A>,
    {
        let loader = AssetLoaderObject::new::<A, L>(loader);
        match self.loaders.iter_mut().find(|l| l.kind() == A::KIND) {
            Some(slot) => *slot = loader,
            None => self.loaders.push(loader),
        }
        self
    }

    /// Unregisters the loader for `kind`; loading that kind then fails with
    /// [`AssetError::UnknownKind`].
    pub fn without(mut self, kind: AssetKind) -> AssetManagerBuilder {
        self.loaders.retain(|l| l.kind() != kind);
        self
    }

    pub fn build<S: Source>(self, source: S) -> Result<AssetManager> {
        let (task_sender, task_receiver) = new_task_channel();
        spawn_workers(&self.config, task_receiver)?;

        let device: Box<dyn Device> = match self.device {
            Some(device) => device,
            None => Box::new(HeadlessDevice::new()),
        };
        let loaders = self.loaders.into_iter().map(TypeLoader::new).collect();

        let shared = SharedData::new(Box::new(source), device, task_sender, loaders);
        Ok(AssetManager {
            shared: Arc::new(shared),
        })
    }
}
