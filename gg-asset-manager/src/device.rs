use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

use gg_util::eyre::Result;

use crate::{Audio, Cubemap, Model, Texture};

/// Opaque handle to a resource living on a graphics or audio device.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DeviceHandle(pub u64);

/// Receives decoded content during the finishing step. Every call is made on
/// the thread driving [`AssetManager::update`](crate::AssetManager::update).
pub trait Device: Send + Sync + Debug + 'static {
    fn upload_texture(&self, texture: &Texture) -> Result<DeviceHandle>;

    fn upload_cubemap(&self, cubemap: &Cubemap) -> Result<DeviceHandle>;

    fn upload_mesh(&self, model: &Model) -> Result<DeviceHandle>;

    fn upload_audio(&self, audio: &Audio) -> Result<DeviceHandle>;
}

/// Device that keeps nothing and hands out sequential handles.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next: AtomicU64,
}

impl HeadlessDevice {
    pub fn new() -> HeadlessDevice {
        HeadlessDevice::default()
    }

    pub fn uploads(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }

    fn alloc(&self) -> DeviceHandle {
        DeviceHandle(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Device for HeadlessDevice {
    fn upload_texture(&self, _: &Texture) -> Result<DeviceHandle> {
        Ok(self.alloc())
    }

    fn upload_cubemap(&self, _: &Cubemap) -> Result<DeviceHandle> {
        Ok(self.alloc())
    }

    fn upload_mesh(&self, _: &Model) -> Result<DeviceHandle> {
        Ok(self.alloc())
    }

    fn upload_audio(&self, _: &Audio) -> Result<DeviceHandle> {
        Ok(self.alloc())
    }
}
