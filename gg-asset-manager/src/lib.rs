mod config;
mod device;
mod error;
mod handle;
mod id;
mod kind;
mod kinds;
mod loader;
mod loader_ctx;
mod manager;
mod scene;
mod shared;
mod signal;
mod source;
mod state;
mod task;
mod type_loader;

use gg_util::eyre::Result;

pub use self::config::AssetManagerConfig;
pub use self::device::{Device, DeviceHandle, HeadlessDevice};
pub use self::error::AssetError;
pub use self::handle::{Handle, UntypedHandle};
pub use self::id::AssetId;
pub use self::kind::{AssetContent, AssetKind};
pub use self::kinds::{
    Audio, AudioLoader, Cubemap, CubemapLoader, Model, ModelLoader, NestedAsset, Template,
    TemplateLoader, Texture, TextureLoader, CUBEMAP_FACES,
};
pub use self::loader::{AssetLoader, BytesAssetLoader};
pub use self::loader_ctx::LoaderCtx;
pub use self::manager::{AssetManager, AssetManagerBuilder};
pub use self::scene::{EntityId, SceneGraph};
pub use self::source::{DirSource, MemorySource, Source};
pub use self::state::AssetState;

/// A resource kind the registry knows how to hold.
///
/// The set of kinds is closed: every implementor is a variant of
/// [`AssetContent`].
pub trait Asset: Default + Send + Sync + 'static {
    const KIND: AssetKind;

    /// Whether this value carries no usable content. Empty content never
    /// becomes ready.
    fn is_empty(&self) -> bool;

    fn needs_finish(&self) -> bool {
        false
    }

    /// Runs on the thread driving [`AssetManager::update`], after the
    /// content is attached to its handle.
    fn finish(&mut self, device: &dyn Device) -> Result<()> {
        let _ = device;
        Ok(())
    }

    #[doc(hidden)]
    fn from_content(content: &AssetContent) -> Option<&Self>;

    #[doc(hidden)]
    fn into_content(self) -> AssetContent;
}
