use serde_json::Value;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct EntityId(pub u64);

/// Materializes template fragments into live entities.
pub trait SceneGraph {
    /// Returns `false` if the fragment could not be instantiated under
    /// `target`.
    fn instantiate(&mut self, fragment: &Value, target: EntityId) -> bool;
}
