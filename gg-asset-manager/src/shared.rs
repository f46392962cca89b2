use std::cell::Cell;
use std::fmt::{self, Debug};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gg_util::ahash::AHashMap;
use gg_util::parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::signal::Signal;
use crate::task::TaskSender;
use crate::type_loader::TypeLoader;
use crate::{AssetError, AssetId, AssetKind, AssetState, Device, Source, UntypedHandle};

thread_local! {
    static IN_UPDATE: Cell<bool> = Cell::new(false);
}

pub struct SharedData {
    pub source: Box<dyn Source>,
    pub device: Box<dyn Device>,
    pub task_sender: TaskSender,
    pub signal: Signal,
    entries: RwLock<AHashMap<AssetId, UntypedHandle>>,
    loaders: Vec<TypeLoader>,
    shutting_down: AtomicBool,
    update_lock: Mutex<()>,
}

impl SharedData {
    pub fn new(
        source: Box<dyn Source>,
        device: Box<dyn Device>,
        task_sender: TaskSender,
        loaders: Vec<TypeLoader>,
    ) -> SharedData {
        SharedData {
            source,
            device,
            task_sender,
            signal: Signal::new(),
            entries: RwLock::new(AHashMap::new()),
            loaders,
            shutting_down: AtomicBool::new(false),
            update_lock: Mutex::new(()),
        }
    }

    fn loader(&self, kind: AssetKind) -> Result<&TypeLoader, AssetError> {
        self.loaders
            .iter()
            .find(|loader| loader.kind() == kind)
            .ok_or(AssetError::UnknownKind(kind))
    }

    /// Returns the existing handle for `id`, or registers a fresh placeholder.
    fn begin(
        &self,
        kind: AssetKind,
        id: AssetId,
        path: Arc<Path>,
    ) -> Result<(UntypedHandle, bool), AssetError> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(AssetError::ShuttingDown);
        }

        self.loader(kind)?;

        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(&id) {
            if existing.kind() != kind {
                return Err(AssetError::KindMismatch {
                    id,
                    existing: existing.kind(),
                    requested: kind,
                });
            }

            debug!(%id, state = ?existing.state(), "already registered");
            return Ok((existing.clone(), false));
        }

        let handle = UntypedHandle::new(id.clone(), path, kind);
        entries.insert(id, handle.clone());
        Ok((handle, true))
    }

    /// Synchronous load. Also returns the dependencies the handle still
    /// waits on.
    pub fn load(
        self: &Arc<Self>,
        kind: AssetKind,
        id: AssetId,
        path: Arc<Path>,
    ) -> Result<(UntypedHandle, Vec<AssetId>), AssetError> {
        let (handle, created) = self.begin(kind, id, path)?;
        if !created {
            return Ok((handle, Vec::new()));
        }

        trace!(id = %handle.id(), %kind, "loading");
        let dependencies = self.loader(kind)?.load(self, &handle);
        self.signal.notify();
        Ok((handle, dependencies))
    }

    pub fn load_async(
        self: &Arc<Self>,
        kind: AssetKind,
        id: AssetId,
        path: Arc<Path>,
    ) -> Result<UntypedHandle, AssetError> {
        let (handle, created) = self.begin(kind, id, path)?;
        if created {
            trace!(id = %handle.id(), %kind, "loading in background");
            self.loader(kind)?.load_async(self, &handle);
        }

        Ok(handle)
    }

    pub fn get(&self, id: &str) -> Option<UntypedHandle> {
        self.entries.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn remove(&self, id: &str) -> Option<UntypedHandle> {
        let handle = self.entries.write().remove(id)?;
        debug!(%id, state = ?handle.state(), "removed");
        if let Ok(loader) = self.loader(handle.kind()) {
            loader.detach(&handle);
        }
        self.signal.notify();
        Some(handle)
    }

    /// Drops the registry entry for a failed handle, unless the id has been
    /// reused since.
    pub fn evict(&self, handle: &UntypedHandle) {
        let mut entries = self.entries.write();
        if entries.get(handle.id()).map_or(false, |h| h.ptr_eq(handle)) {
            debug!(id = %handle.id(), "evicted failed asset");
            entries.remove(handle.id());
        }
    }

    pub fn ids_where(&self, filter: impl Fn(&UntypedHandle) -> bool) -> Vec<AssetId> {
        let mut ids = self
            .entries
            .read()
            .values()
            .filter(|handle| filter(handle))
            .map(|handle| handle.id().clone())
            .collect::<Vec<_>>();
        ids.sort();
        ids
    }

    pub fn dependencies_ready(&self, dependencies: &[AssetId]) -> bool {
        let entries = self.entries.read();
        dependencies.iter().all(|id| {
            entries
                .get(id)
                .map_or(false, |handle| handle.state() == AssetState::Ready)
        })
    }

    /// First dependency that failed or is no longer registered.
    pub fn failed_dependency(&self, dependencies: &[AssetId]) -> Option<AssetId> {
        let entries = self.entries.read();
        dependencies
            .iter()
            .find(|id| entries.get(*id).map_or(true, |handle| handle.has_failed()))
            .cloned()
    }

    pub fn update(&self) -> usize {
        let guard = self.update_lock.lock();
        let progressed = self.update_locked();
        drop(guard);

        // Blocked loads on other threads re-check after every frame.
        self.signal.notify();
        progressed
    }

    /// Runs an update unless another thread is already inside one.
    fn try_update(&self) -> Option<usize> {
        let guard = self.update_lock.try_lock()?;
        let progressed = self.update_locked();
        drop(guard);

        if progressed > 0 {
            self.signal.notify();
        }
        Some(progressed)
    }

    fn update_locked(&self) -> usize {
        let _in_update = InUpdate::enter();
        self.loaders
            .iter()
            .map(|loader| loader.update(self))
            .sum()
    }

    /// Blocks until `handle` settles, driving updates whenever no other
    /// thread is. Fails as soon as one of its dependencies does.
    ///
    /// Dependencies not known yet, as for a handle still being produced in
    /// the background, are picked up from its loader once it has them.
    pub fn wait_until_settled(
        &self,
        handle: &UntypedHandle,
        mut dependencies: Vec<AssetId>,
    ) -> Result<(), AssetError> {
        if IN_UPDATE.with(Cell::get) {
            return Err(AssetError::ReentrantWait(handle.id().clone()));
        }

        let loader = self.loader(handle.kind())?;

        loop {
            if handle.state().is_terminal() {
                return Ok(());
            }

            for id in loader.pending_dependencies(handle) {
                if !dependencies.contains(&id) {
                    dependencies.push(id);
                }
            }

            if let Some(dependency) = self.failed_dependency(&dependencies) {
                warn!(id = %handle.id(), %dependency, "dependency did not load");
                return Err(AssetError::DependencyFailed {
                    id: handle.id().clone(),
                    dependency,
                });
            }

            let seen = self.signal.generation();
            match self.try_update() {
                Some(progressed) if progressed > 0 => continue,
                _ => self.signal.wait(seen),
            }
        }
    }

    pub fn clear(&self) {
        self.shutting_down.store(true, Ordering::Release);
        for loader in &self.loaders {
            loader.clear_in_flight();
        }

        let removed = std::mem::take(&mut *self.entries.write());
        debug!(count = removed.len(), "cleared assets");
        drop(removed);

        self.shutting_down.store(false, Ordering::Release);
        self.signal.notify();
    }

    pub fn in_flight(&self) -> usize {
        self.loaders.iter().map(TypeLoader::in_flight).sum()
    }
}

impl Debug for SharedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedData")
            .field("source", &self.source)
            .field("device", &self.device)
            .field("entries", &self.entries.read().len())
            .field("loaders", &self.loaders)
            .finish_non_exhaustive()
    }
}

struct InUpdate;

impl InUpdate {
    fn enter() -> InUpdate {
        IN_UPDATE.with(|flag| flag.set(true));
        InUpdate
    }
}

impl Drop for InUpdate {
    fn drop(&mut self) {
        IN_UPDATE.with(|flag| flag.set(false));
    }
}

#[cfg(test)]
mod tests {
    use crate::loader::AssetLoaderObject;
    use crate::task::new_task_channel;
    use crate::{HeadlessDevice, MemorySource, Texture, TextureLoader};

    use super::*;

    fn shared() -> Arc<SharedData> {
        let (task_sender, _) = new_task_channel();
        let loaders = vec![TypeLoader::new(AssetLoaderObject::new::<Texture, _>(
            TextureLoader,
        ))];

        Arc::new(SharedData::new(
            Box::new(MemorySource::new()),
            Box::new(HeadlessDevice::new()),
            task_sender,
            loaders,
        ))
    }

    #[test]
    fn test_loads_rejected_while_shutting_down() {
        let shared = shared();
        let path: Arc<Path> = Path::new("a.png").into();

        shared.shutting_down.store(true, Ordering::Release);
        let error = shared
            .load_async(AssetKind::Texture, "a".into(), path.clone())
            .unwrap_err();
        assert_eq!(error, AssetError::ShuttingDown);
        let error = shared
            .load(AssetKind::Texture, "a".into(), path.clone())
            .unwrap_err();
        assert_eq!(error, AssetError::ShuttingDown);
        assert_eq!(shared.len(), 0);

        shared.clear();
        let handle = shared.load_async(AssetKind::Texture, "a".into(), path).unwrap();
        assert_eq!(shared.len(), 1);
        assert!(handle.is_loading());
    }

    #[test]
    fn test_unknown_kind_is_rejected_before_registering() {
        let shared = shared();
        let error = shared
            .load(AssetKind::Model, "m".into(), Path::new("m.obj").into())
            .unwrap_err();
        assert_eq!(error, AssetError::UnknownKind(AssetKind::Model));
        assert!(shared.get("m").is_none());
    }
}
