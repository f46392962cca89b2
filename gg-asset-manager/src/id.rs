use std::borrow::Borrow;
use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use serde::Deserialize;

/// Caller-chosen identifier, unique across every kind in one registry.
#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize)]
#[serde(from = "String")]
pub struct AssetId(Arc<str>);

impl AssetId {
    pub fn new(id: impl Into<Arc<str>>) -> AssetId {
        AssetId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&*self.0, f)
    }
}

impl Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for AssetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> AssetId {
        AssetId::new(id)
    }
}

impl From<String> for AssetId {
    fn from(id: String) -> AssetId {
        AssetId::new(id)
    }
}

impl From<&AssetId> for AssetId {
    fn from(id: &AssetId) -> AssetId {
        id.clone()
    }
}

impl PartialEq<str> for AssetId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for AssetId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}
