use std::path::Path;
use std::sync::Arc;

use gg_util::eyre::Result;
use smallvec::SmallVec;

use crate::shared::SharedData;
use crate::{Asset, AssetError, AssetId, AssetKind, Handle, UntypedHandle};

/// Access to the source and the registry while producing one asset.
///
/// Assets loaded through the context become dependencies of the asset being
/// produced: it is not made ready until every one of them is.
pub struct LoaderCtx {
    shared: Arc<SharedData>,
    owner: AssetId,
    dependencies: SmallVec<[AssetId; 4]>,
}

impl LoaderCtx {
    pub(crate) fn new(shared: Arc<SharedData>, owner: AssetId) -> LoaderCtx {
        LoaderCtx {
            shared,
            owner,
            dependencies: SmallVec::new(),
        }
    }

    pub(crate) fn into_dependencies(self) -> Vec<AssetId> {
        self.dependencies.into_vec()
    }

    /// Id of the asset being produced.
    pub fn owner(&self) -> &AssetId {
        &self.owner
    }

    pub fn dependencies(&self) -> &[AssetId] {
        &self.dependencies
    }

    pub fn read_bytes<P: AsRef<Path>>(&mut self, path: P) -> Result<Vec<u8>> {
        self.shared.source.read_bytes(path.as_ref())
    }

    pub fn read_string<P: AsRef<Path>>(&mut self, path: P) -> Result<String> {
        self.shared.source.read_string(path.as_ref())
    }

    pub fn load<A, P>(&mut self, id: impl Into<AssetId>, path: P) -> Result<Handle<A>, AssetError>
    where
        A: Asset,
        P: AsRef<Path>,
    {
        let handle = self.load_kind(A::KIND, id.into(), path.as_ref(), false)?;
        Ok(typed(handle))
    }

    pub fn load_async<A, P>(
        &mut self,
        id: impl Into<AssetId>,
        path: P,
    ) -> Result<Handle<A>, AssetError>
    where
        A: Asset,
        P: AsRef<Path>,
    {
        let handle = self.load_kind(A::KIND, id.into(), path.as_ref(), true)?;
        Ok(typed(handle))
    }

    /// Loads an asset whose kind is only known at run time. A synchronous
    /// nested load never blocks on the nested asset's own dependencies.
    pub fn load_kind(
        &mut self,
        kind: AssetKind,
        id: AssetId,
        path: &Path,
        asynchronous: bool,
    ) -> Result<UntypedHandle, AssetError> {
        let path: Arc<Path> = path.into();
        let handle = if asynchronous {
            self.shared.load_async(kind, id, path)?
        } else {
            self.shared.load(kind, id, path)?.0
        };

        if handle.id() != &self.owner && !self.dependencies.contains(handle.id()) {
            self.dependencies.push(handle.id().clone());
        }

        Ok(handle)
    }
}

fn typed<A: Asset>(handle: UntypedHandle) -> Handle<A> {
    match handle.typed() {
        Some(v) => v,
        None => unreachable!("registry returned {:?} for a {} load", handle, A::KIND),
    }
}
