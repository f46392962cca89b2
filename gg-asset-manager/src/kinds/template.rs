use std::path::{Path, PathBuf};

use gg_util::async_trait;
use gg_util::eyre::{Result, WrapErr};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    Asset, AssetContent, AssetError, AssetId, AssetKind, AssetLoader, AssetManager, EntityId,
    Handle, LoaderCtx, SceneGraph,
};

/// One asset declared inside a template. Paths are relative to the source
/// root.
#[derive(Clone, Debug, Deserialize)]
pub struct NestedAsset {
    pub id: AssetId,
    pub kind: AssetKind,
    pub path: PathBuf,
    #[serde(default, rename = "async")]
    pub asynchronous: bool,
}

/// Declares other assets plus a fragment the scene graph turns into
/// entities.
///
/// A template is ready only once every referenced asset is.
#[derive(Clone, Debug, Default)]
pub struct Template {
    pub nested: Vec<NestedAsset>,
    pub references: Vec<AssetId>,
    pub fragment: Value,
}

impl Template {
    pub fn references(&self) -> &[AssetId] {
        &self.references
    }

    pub fn all_dependencies_ready(&self, manager: &AssetManager) -> bool {
        manager.dependencies_ready(&self.references)
    }

    pub fn failed_dependency(&self, manager: &AssetManager) -> Option<AssetId> {
        manager.failed_dependency(&self.references)
    }
}

impl Asset for Template {
    const KIND: AssetKind = AssetKind::Template;

    fn is_empty(&self) -> bool {
        self.nested.is_empty() && self.fragment.is_null()
    }

    fn from_content(content: &AssetContent) -> Option<&Self> {
        match content {
            AssetContent::Template(v) => Some(v),
            _ => None,
        }
    }

    fn into_content(self) -> AssetContent {
        AssetContent::Template(self)
    }
}

impl Handle<Template> {
    /// Hands the fragment to `scene`. Returns whatever the scene graph
    /// reports.
    pub fn instantiate(
        &self,
        scene: &mut dyn SceneGraph,
        target: EntityId,
    ) -> Result<bool, AssetError> {
        if !self.is_ready() {
            return Err(AssetError::NotReady(self.id().clone()));
        }

        let template = self.get();
        Ok(scene.instantiate(&template.fragment, target))
    }
}

#[derive(Deserialize)]
struct TemplateFile {
    #[serde(default)]
    assets: Vec<NestedAsset>,
    #[serde(default)]
    root: Value,
}

pub struct TemplateLoader;

#[async_trait]
impl AssetLoader<Template> for TemplateLoader {
    async fn load(&self, ctx: &mut LoaderCtx, path: &Path) -> Result<Template> {
        let file: TemplateFile =
            serde_json::from_str(&ctx.read_string(path)?).wrap_err("invalid template")?;

        for nested in &file.assets {
            ctx.load_kind(
                nested.kind,
                nested.id.clone(),
                &nested.path,
                nested.asynchronous,
            )?;
        }

        // The context skips the template's own id and repeated ids.
        let references = ctx.dependencies().to_vec();

        Ok(Template {
            nested: file.assets,
            references,
            fragment: file.root,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_template_file() {
        let file: TemplateFile = serde_json::from_str(
            r#"{
                "assets": [
                    { "id": "crate/mesh", "kind": "model", "path": "crate.obj" },
                    { "id": "crate/albedo", "kind": "texture", "path": "crate.png", "async": true }
                ],
                "root": { "name": "crate", "children": [] }
            }"#,
        )
        .unwrap();

        assert_eq!(file.assets.len(), 2);
        assert_eq!(file.assets[0].kind, AssetKind::Model);
        assert!(!file.assets[0].asynchronous);
        assert!(file.assets[1].asynchronous);
        assert_eq!(file.root["name"], "crate");
    }

    #[test]
    fn test_unknown_kind_name_is_rejected() {
        let result = serde_json::from_str::<TemplateFile>(
            r#"{ "assets": [{ "id": "a", "kind": "shader", "path": "a.glsl" }] }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_template() {
        assert!(Template::default().is_empty());

        let template = Template {
            fragment: serde_json::json!({ "name": "empty" }),
            ..Template::default()
        };
        assert!(!template.is_empty());
    }
}
