#![allow(dead_code)]

use std::fmt::{self, Debug};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use gg_asset_manager::{
    AssetLoader, AssetManager, AssetManagerBuilder, Audio, Cubemap, Device, DeviceHandle,
    LoaderCtx, Model, Source, Texture,
};
use gg_util::async_trait;
use gg_util::eyre::{bail, Result};
use gg_util::parking_lot::{Condvar, Mutex};
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([255, 128, 0, 255]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .unwrap();
    bytes
}

/// Calls `update` until `done` holds. Panics after a few seconds.
pub fn pump_until(manager: &AssetManager, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "timed out pumping updates");
        manager.update();
        thread::sleep(Duration::from_millis(1));
    }
}

/// Waits without driving updates. Panics after a few seconds.
pub fn wait_for(mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting");
        thread::sleep(Duration::from_millis(1));
    }
}

/// Holds loads of individual paths until they are released.
#[derive(Default)]
pub struct Gate {
    state: Mutex<GateState>,
    condvar: Condvar,
}

#[derive(Default)]
struct GateState {
    open: bool,
    released: Vec<PathBuf>,
}

impl Gate {
    pub fn new() -> Arc<Gate> {
        Arc::new(Gate::default())
    }

    pub fn open(&self) {
        self.state.lock().open = true;
        self.condvar.notify_all();
    }

    pub fn release(&self, path: impl Into<PathBuf>) {
        self.state.lock().released.push(path.into());
        self.condvar.notify_all();
    }

    fn wait(&self, path: &Path) {
        let mut state = self.state.lock();
        while !state.open && !state.released.iter().any(|p| p == path) {
            self.condvar.wait(&mut state);
        }
    }
}

#[derive(Clone, Default)]
pub struct Counters {
    pub started: Arc<AtomicUsize>,
    pub finished: Arc<AtomicUsize>,
}

/// Texture loader that blocks on a [`Gate`] and counts its calls.
pub struct GatedTextureLoader {
    gate: Arc<Gate>,
    counters: Counters,
}

impl GatedTextureLoader {
    pub fn new(gate: &Arc<Gate>) -> GatedTextureLoader {
        GatedTextureLoader {
            gate: gate.clone(),
            counters: Counters::default(),
        }
    }

    pub fn counters(&self) -> Counters {
        self.counters.clone()
    }
}

#[async_trait]
impl AssetLoader<Texture> for GatedTextureLoader {
    async fn load(&self, ctx: &mut LoaderCtx, path: &Path) -> Result<Texture> {
        self.counters.started.fetch_add(1, Ordering::SeqCst);
        self.gate.wait(path);
        let result = ctx.read_bytes(path).and_then(|bytes| Texture::decode(&bytes));
        self.counters.finished.fetch_add(1, Ordering::SeqCst);
        result
    }
}

type TextureHook = Box<dyn Fn(&AssetManager, &Texture) -> Result<DeviceHandle> + Send + Sync>;

/// Device that hands texture uploads to a callback with access to the
/// manager driving them.
pub struct HookDevice {
    manager: Arc<Mutex<Weak<AssetManager>>>,
    on_texture: TextureHook,
}

impl Debug for HookDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDevice").finish_non_exhaustive()
    }
}

impl Device for HookDevice {
    fn upload_texture(&self, texture: &Texture) -> Result<DeviceHandle> {
        let manager = self.manager.lock().upgrade();
        match manager {
            Some(manager) => (self.on_texture)(&manager, texture),
            None => bail!("asset manager is gone"),
        }
    }

    fn upload_cubemap(&self, _: &Cubemap) -> Result<DeviceHandle> {
        Ok(DeviceHandle(0))
    }

    fn upload_mesh(&self, _: &Model) -> Result<DeviceHandle> {
        Ok(DeviceHandle(0))
    }

    fn upload_audio(&self, _: &Audio) -> Result<DeviceHandle> {
        Ok(DeviceHandle(0))
    }
}

pub fn hooked_manager<S, F>(
    builder: AssetManagerBuilder,
    source: S,
    on_texture: F,
) -> Arc<AssetManager>
where
    S: Source,
    F: Fn(&AssetManager, &Texture) -> Result<DeviceHandle> + Send + Sync + 'static,
{
    let cell = Arc::new(Mutex::new(Weak::new()));
    let device = HookDevice {
        manager: cell.clone(),
        on_texture: Box::new(on_texture),
    };

    let manager = Arc::new(builder.device(device).build(source).unwrap());
    *cell.lock() = Arc::downgrade(&manager);
    manager
}
