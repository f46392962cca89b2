use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use gg_util::async_trait;
use gg_util::eyre::Result;

use crate::{Asset, AssetContent, AssetKind, LoaderCtx};

/// Produces content of one kind from a path. Called from background workers
/// and from threads issuing synchronous loads, possibly concurrently.
#[async_trait]
pub trait AssetLoader<A: Asset>: Send + Sync + 'static {
    async fn load(&self, ctx: &mut LoaderCtx, path: &Path) -> Result<A>;
}

#[async_trait]
pub trait BytesAssetLoader<A: Asset>: Send + Sync + 'static {
    async fn load(&self, ctx: &mut LoaderCtx, bytes: Vec<u8>) -> Result<A>;
}

#[async_trait]
impl<A, L> AssetLoader<A> for L
where
    A: Asset,
    L: BytesAssetLoader<A>,
{
    async fn load(&self, ctx: &mut LoaderCtx, path: &Path) -> Result<A> {
        let bytes = ctx.read_bytes(path)?;
        BytesAssetLoader::load(self, ctx, bytes).await
    }
}

#[derive(Clone)]
pub struct AssetLoaderObject {
    kind: AssetKind,
    type_name: &'static str,
    loader: Arc<dyn DynAssetLoader>,
}

impl AssetLoaderObject {
    pub fn new<A, L>(loader: L) -> AssetLoaderObject
    where
        A: Asset,
        L: AssetLoader<A>,
    {
        AssetLoaderObject {
            kind: A::KIND,
            type_name: std::any::type_name::<L>(),
            loader: Arc::new((loader, PhantomData::<fn() -> A>)),
        }
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub async fn load(&self, ctx: &mut LoaderCtx, path: &Path) -> Result<AssetContent> {
        self.loader.load(ctx, path).await
    }
}

impl Debug for AssetLoaderObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetLoaderObject")
            .field("kind", &self.kind)
            .field("loader", &self.type_name)
            .finish()
    }
}

#[async_trait]
trait DynAssetLoader: Send + Sync {
    async fn load(&self, ctx: &mut LoaderCtx, path: &Path) -> Result<AssetContent>;
}

#[async_trait]
impl<A, L> DynAssetLoader for (L, PhantomData<fn() -> A>)
where
    L: AssetLoader<A>,
    A: Asset,
{
    async fn load(&self, ctx: &mut LoaderCtx, path: &Path) -> Result<AssetContent> {
        let asset = self.0.load(ctx, path).await?;
        Ok(asset.into_content())
    }
}
