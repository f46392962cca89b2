pub use async_trait::async_trait;
pub use {ahash, eyre, parking_lot};
