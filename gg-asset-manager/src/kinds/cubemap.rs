use std::path::{Path, PathBuf};

use gg_util::async_trait;
use gg_util::eyre::{bail, Result, WrapErr};
use serde::Deserialize;

use crate::{
    Asset, AssetContent, AssetKind, AssetLoader, Device, DeviceHandle, LoaderCtx, Texture,
};

pub const CUBEMAP_FACES: [&str; 6] = ["+x", "-x", "+y", "-y", "+z", "-z"];

/// Six square faces of equal size, in [`CUBEMAP_FACES`] order.
#[derive(Clone, Debug, Default)]
pub struct Cubemap {
    pub size: u32,
    pub faces: Vec<Texture>,
    pub device_handle: Option<DeviceHandle>,
}

impl Cubemap {
    pub fn from_faces(faces: Vec<Texture>) -> Result<Cubemap> {
        if faces.len() != CUBEMAP_FACES.len() {
            bail!("expected {} faces, got {}", CUBEMAP_FACES.len(), faces.len());
        }

        let size = faces[0].width;
        for (face, name) in faces.iter().zip(CUBEMAP_FACES) {
            if face.width != size || face.height != size {
                bail!(
                    "face {} is {}x{}, expected {}x{}",
                    name,
                    face.width,
                    face.height,
                    size,
                    size
                );
            }
        }

        Ok(Cubemap {
            size,
            faces,
            device_handle: None,
        })
    }
}

impl Asset for Cubemap {
    const KIND: AssetKind = AssetKind::Cubemap;

    fn is_empty(&self) -> bool {
        self.faces.len() != CUBEMAP_FACES.len()
    }

    fn needs_finish(&self) -> bool {
        true
    }

    fn finish(&mut self, device: &dyn Device) -> Result<()> {
        self.device_handle = Some(device.upload_cubemap(self)?);
        Ok(())
    }

    fn from_content(content: &AssetContent) -> Option<&Self> {
        match content {
            AssetContent::Cubemap(v) => Some(v),
            _ => None,
        }
    }

    fn into_content(self) -> AssetContent {
        AssetContent::Cubemap(self)
    }
}

#[derive(Deserialize)]
struct Manifest {
    faces: [PathBuf; 6],
}

/// Reads a JSON manifest listing the face images, relative to the manifest.
pub struct CubemapLoader;

#[async_trait]
impl AssetLoader<Cubemap> for CubemapLoader {
    async fn load(&self, ctx: &mut LoaderCtx, path: &Path) -> Result<Cubemap> {
        let manifest: Manifest = serde_json::from_str(&ctx.read_string(path)?)
            .wrap_err("invalid cubemap manifest")?;
        let dir = path.parent().unwrap_or_else(|| Path::new(""));

        let mut faces = Vec::with_capacity(CUBEMAP_FACES.len());
        for (face, name) in manifest.faces.iter().zip(CUBEMAP_FACES) {
            let face_path = dir.join(face);
            let bytes = ctx.read_bytes(&face_path)?;
            let texture = Texture::decode(&bytes)
                .wrap_err_with(|| format!("cannot decode face {} ({})", name, face_path.display()))?;
            faces.push(texture);
        }

        Cubemap::from_faces(faces)
    }
}
