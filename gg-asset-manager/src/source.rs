use std::fmt::{self, Debug};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use gg_util::ahash::AHashMap;
use gg_util::eyre::{bail, Result, WrapErr};
use gg_util::parking_lot::RwLock;

use crate::AssetError;

/// Where asset bytes come from. Must be callable from several loader
/// threads at once.
pub trait Source: Send + Sync + Debug + 'static {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>>;

    fn read_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read_bytes(path)?;
        String::from_utf8(bytes).wrap_err("invalid utf-8")
    }

    fn exists(&self, path: &Path) -> bool;
}

/// Files under a directory. Paths must be relative and stay below the
/// root.
pub struct DirSource {
    root: PathBuf,
}

impl Debug for DirSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirSource")
            .field("root", &self.root)
            .finish()
    }
}

impl DirSource {
    pub fn new(root: impl AsRef<Path>) -> Result<DirSource> {
        Ok(DirSource {
            root: root.as_ref().canonicalize()?,
        })
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            bail!("path {} leaves the source root", path.display());
        }

        Ok(self.root.join(path))
    }
}

impl Source for DirSource {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        let file_path = self.resolve(path)?;
        let mut file = match File::open(&file_path) {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(AssetError::NotFound(path.into()).into());
            }
            Err(error) => {
                return Err(error).wrap_err_with(|| format!("cannot open {}", file_path.display()))
            }
        };

        let meta = file.metadata().ok();
        let capacity = meta
            .and_then(|meta| usize::try_from(meta.len()).ok())
            .unwrap_or(0);

        let mut buf = Vec::with_capacity(capacity);
        file.read_to_end(&mut buf)
            .wrap_err_with(|| format!("cannot read {}", file_path.display()))?;

        Ok(buf)
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).map_or(false, |path| path.is_file())
    }
}

/// Files held in memory, keyed by their path relative to the source root.
#[derive(Default)]
pub struct MemorySource {
    files: RwLock<AHashMap<PathBuf, Arc<[u8]>>>,
}

impl MemorySource {
    pub fn new() -> MemorySource {
        MemorySource::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) -> MemorySource {
        self.insert(path, data);
        self
    }

    pub fn insert(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
        let data: Vec<u8> = data.into();
        self.files.write().insert(path.into(), data.into());
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        self.files.write().remove(path.as_ref());
    }
}

impl Debug for MemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySource")
            .field("files", &self.files.read().len())
            .finish()
    }
}

impl Source for MemorySource {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        match self.files.read().get(path) {
            Some(data) => Ok(data.to_vec()),
            None => Err(AssetError::NotFound(path.into()).into()),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }
}

impl<S: Source> Source for Arc<S> {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        (**self).read_bytes(path)
    }

    fn read_string(&self, path: &Path) -> Result<String> {
        (**self).read_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_missing_file() {
        let source = MemorySource::new().with_file("a.txt", "hello");
        assert_eq!(source.read_string(Path::new("a.txt")).unwrap(), "hello");
        assert!(source.exists(Path::new("a.txt")));

        let error = source.read_bytes(Path::new("b.txt")).unwrap_err();
        assert_eq!(
            error.downcast_ref::<AssetError>(),
            Some(&AssetError::NotFound(Path::new("b.txt").into()))
        );
    }

    #[test]
    fn test_dir_source_missing_file() {
        let source = DirSource::new(env!("CARGO_MANIFEST_DIR")).unwrap();
        assert!(source.exists(Path::new("Cargo.toml")));
        assert!(!source.read_bytes(Path::new("Cargo.toml")).unwrap().is_empty());

        let error = source.read_bytes(Path::new("missing.png")).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<AssetError>(),
            Some(AssetError::NotFound(_))
        ));
    }

    #[test]
    fn test_dir_source_stays_under_root() {
        let source = DirSource::new(concat!(env!("CARGO_MANIFEST_DIR"), "/src")).unwrap();
        assert!(source.exists(Path::new("./lib.rs")));

        for path in ["../Cargo.toml", "kinds/../../Cargo.toml", env!("CARGO_MANIFEST_DIR")] {
            assert!(!source.exists(Path::new(path)), "{}", path);
            let error = source.read_bytes(Path::new(path)).unwrap_err();
            assert!(error.to_string().contains("leaves the source root"), "{}", error);
        }
    }
}
