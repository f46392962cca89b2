use std::fmt::{self, Display};

use gg_util::eyre::Result;
use serde::Deserialize;

use crate::{Asset, Audio, Cubemap, Device, Model, Template, Texture};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Model,
    Texture,
    Cubemap,
    Audio,
    Template,
}

impl AssetKind {
    pub fn name(self) -> &'static str {
        match self {
            AssetKind::Model => "model",
            AssetKind::Texture => "texture",
            AssetKind::Cubemap => "cubemap",
            AssetKind::Audio => "audio",
            AssetKind::Template => "template",
        }
    }
}

impl Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

macro_rules! asset_content {
    ($($variant:ident),* $(,)?) => {
        /// Type-erased content of a handle; one variant per [`AssetKind`].
        #[derive(Debug)]
        pub enum AssetContent {
            $($variant($variant),)*
        }

        impl AssetContent {
            pub fn empty(kind: AssetKind) -> AssetContent {
                match kind {
                    $(AssetKind::$variant => AssetContent::$variant($variant::default()),)*
                }
            }

            pub fn kind(&self) -> AssetKind {
                match self {
                    $(AssetContent::$variant(_) => AssetKind::$variant,)*
                }
            }

            pub(crate) fn is_empty(&self) -> bool {
                match self {
                    $(AssetContent::$variant(v) => v.is_empty(),)*
                }
            }

            pub(crate) fn needs_finish(&self) -> bool {
                match self {
                    $(AssetContent::$variant(v) => v.needs_finish(),)*
                }
            }

            pub(crate) fn finish(&mut self, device: &dyn Device) -> Result<()> {
                match self {
                    $(AssetContent::$variant(v) => v.finish(device),)*
                }
            }
        }
    };
}

asset_content!(Model, Texture, Cubemap, Audio, Template);
