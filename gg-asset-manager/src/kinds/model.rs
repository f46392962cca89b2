use gg_util::async_trait;
use gg_util::eyre::{bail, eyre, Result, WrapErr};

use crate::{Asset, AssetContent, AssetKind, BytesAssetLoader, Device, DeviceHandle, LoaderCtx};

/// Triangle mesh.
#[derive(Clone, Debug, Default)]
pub struct Model {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub device_handle: Option<DeviceHandle>,
}

impl Model {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Parses vertex positions and faces from Wavefront OBJ text. Polygons
    /// are fan-triangulated; other statements are ignored.
    pub fn parse_obj(text: &str) -> Result<Model> {
        let mut model = Model::default();

        for (line_no, line) in text.lines().enumerate() {
            let mut tokens = line.split_whitespace();
            let result = match tokens.next() {
                Some("v") => parse_vertex(tokens).map(|v| model.positions.push(v)),
                Some("f") => parse_face(tokens, model.positions.len(), &mut model.indices),
                _ => Ok(()),
            };
            result.wrap_err_with(|| format!("line {}", line_no + 1))?;
        }

        Ok(model)
    }
}

fn parse_vertex<'a>(tokens: impl Iterator<Item = &'a str>) -> Result<[f32; 3]> {
    let mut position = [0.0; 3];
    let mut count = 0;
    for token in tokens.take(3) {
        position[count] = token.parse()?;
        count += 1;
    }

    if count < 3 {
        bail!("vertex needs 3 coordinates");
    }

    Ok(position)
}

fn parse_face<'a>(
    tokens: impl Iterator<Item = &'a str>,
    vertex_count: usize,
    indices: &mut Vec<u32>,
) -> Result<()> {
    let corners = tokens
        .map(|token| resolve_index(token, vertex_count))
        .collect::<Result<Vec<_>>>()?;

    if corners.len() < 3 {
        bail!("face needs at least 3 vertices");
    }

    for i in 1..corners.len() - 1 {
        indices.extend([corners[0], corners[i], corners[i + 1]]);
    }

    Ok(())
}

/// Resolves a 1-based or negative (relative) OBJ index to a 0-based one.
fn resolve_index(token: &str, vertex_count: usize) -> Result<u32> {
    let index: i64 = token
        .split('/')
        .next()
        .unwrap_or_default()
        .parse()
        .map_err(|_| eyre!("invalid vertex reference {:?}", token))?;

    let resolved = match index {
        i if i > 0 => i - 1,
        i if i < 0 => vertex_count as i64 + i,
        _ => bail!("vertex index 0 is invalid"),
    };

    if resolved < 0 || resolved >= vertex_count as i64 {
        bail!("vertex index {} out of range", index);
    }

    Ok(resolved as u32)
}

impl Asset for Model {
    const KIND: AssetKind = AssetKind::Model;

    fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    fn needs_finish(&self) -> bool {
        true
    }

    fn finish(&mut self, device: &dyn Device) -> Result<()> {
        self.device_handle = Some(device.upload_mesh(self)?);
        Ok(())
    }

    fn from_content(content: &AssetContent) -> Option<&Self> {
        match content {
            AssetContent::Model(v) => Some(v),
            _ => None,
        }
    }

    fn into_content(self) -> AssetContent {
        AssetContent::Model(self)
    }
}

pub struct ModelLoader;

#[async_trait]
impl BytesAssetLoader<Model> for ModelLoader {
    async fn load(&self, _: &mut LoaderCtx, bytes: Vec<u8>) -> Result<Model> {
        let text = String::from_utf8(bytes).wrap_err("model is not utf-8")?;
        Model::parse_obj(&text)
    }
}
