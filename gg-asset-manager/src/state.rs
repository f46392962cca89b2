use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a handle.
///
/// ```text
/// Uninitialized -> Loading -> Loaded -> Ready
///                     \------------------> Failed
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum AssetState {
    Uninitialized = 0,
    Loading = 1,
    /// Content attached, finishing step not yet run.
    Loaded = 2,
    Ready = 3,
    Failed = 4,
}

impl AssetState {
    fn from_u8(v: u8) -> AssetState {
        match v {
            0 => AssetState::Uninitialized,
            1 => AssetState::Loading,
            2 => AssetState::Loaded,
            3 => AssetState::Ready,
            _ => AssetState::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AssetState::Ready | AssetState::Failed)
    }
}

pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub fn new(state: AssetState) -> AtomicState {
        AtomicState(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> AssetState {
        AssetState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: AssetState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

impl Debug for AtomicState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.load().fmt(f)
    }
}
