use gg_util::async_trait;
use gg_util::eyre::{bail, Result};

use crate::{Asset, AssetContent, AssetKind, BytesAssetLoader, Device, DeviceHandle, LoaderCtx};

/// RGBA8 image.
#[derive(Clone, Debug, Default)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub device_handle: Option<DeviceHandle>,
}

impl Texture {
    pub fn decode(bytes: &[u8]) -> Result<Texture> {
        let image = image::load_from_memory(bytes)?.into_rgba8();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            bail!("image has no pixels");
        }

        Ok(Texture {
            width,
            height,
            pixels: image.into_raw(),
            device_handle: None,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Asset for Texture {
    const KIND: AssetKind = AssetKind::Texture;

    fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    fn needs_finish(&self) -> bool {
        true
    }

    fn finish(&mut self, device: &dyn Device) -> Result<()> {
        self.device_handle = Some(device.upload_texture(self)?);
        Ok(())
    }

    fn from_content(content: &AssetContent) -> Option<&Self> {
        match content {
            AssetContent::Texture(v) => Some(v),
            _ => None,
        }
    }

    fn into_content(self) -> AssetContent {
        AssetContent::Texture(self)
    }
}

pub struct TextureLoader;

#[async_trait]
impl BytesAssetLoader<Texture> for TextureLoader {
    async fn load(&self, _: &mut LoaderCtx, bytes: Vec<u8>) -> Result<Texture> {
        Texture::decode(&bytes)
    }
}
