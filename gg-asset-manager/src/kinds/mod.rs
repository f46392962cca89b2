mod audio;
mod cubemap;
mod model;
mod template;
mod texture;

pub use self::audio::{Audio, AudioLoader};
pub use self::cubemap::{Cubemap, CubemapLoader, CUBEMAP_FACES};
pub use self::model::{Model, ModelLoader};
pub use self::template::{NestedAsset, Template, TemplateLoader};
pub use self::texture::{Texture, TextureLoader};
