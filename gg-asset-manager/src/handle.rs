use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use gg_util::parking_lot::{
    MappedRwLockReadGuard, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use crate::state::AtomicState;
use crate::{Asset, AssetContent, AssetError, AssetId, AssetKind, AssetState};

struct Slot {
    id: AssetId,
    path: Arc<Path>,
    kind: AssetKind,
    state: AtomicState,
    content: RwLock<AssetContent>,
    error: Mutex<Option<AssetError>>,
}

/// Shared, identity-stable reference to one registered asset.
///
/// Cloning is cheap. The content behind a handle is replaced in place when a
/// background load completes, so clones taken before completion observe the
/// final content.
#[derive(Clone)]
pub struct UntypedHandle {
    slot: Arc<Slot>,
}

impl UntypedHandle {
    pub(crate) fn new(id: AssetId, path: Arc<Path>, kind: AssetKind) -> UntypedHandle {
        UntypedHandle {
            slot: Arc::new(Slot {
                id,
                path,
                kind,
                state: AtomicState::new(AssetState::Uninitialized),
                content: RwLock::new(AssetContent::empty(kind)),
                error: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> &AssetId {
        &self.slot.id
    }

    pub fn path(&self) -> &Path {
        &self.slot.path
    }

    pub(crate) fn shared_path(&self) -> &Arc<Path> {
        &self.slot.path
    }

    pub fn kind(&self) -> AssetKind {
        self.slot.kind
    }

    pub fn kind_name(&self) -> &'static str {
        self.slot.kind.name()
    }

    pub fn state(&self) -> AssetState {
        self.slot.state.load()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == AssetState::Ready
    }

    /// True while content is being produced or is waiting for its finishing
    /// step.
    pub fn is_loading(&self) -> bool {
        matches!(self.state(), AssetState::Loading | AssetState::Loaded)
    }

    pub fn has_failed(&self) -> bool {
        self.state() == AssetState::Failed
    }

    pub fn error(&self) -> Option<AssetError> {
        self.slot.error.lock().clone()
    }

    pub fn content(&self) -> RwLockReadGuard<'_, AssetContent> {
        self.slot.content.read()
    }

    pub fn typed<A: Asset>(&self) -> Option<Handle<A>> {
        (self.kind() == A::KIND).then(|| Handle {
            untyped: self.clone(),
            _phantom: PhantomData,
        })
    }

    pub fn ptr_eq(&self, other: &UntypedHandle) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    pub(crate) fn content_mut(&self) -> RwLockWriteGuard<'_, AssetContent> {
        self.slot.content.write()
    }

    pub(crate) fn set_state(&self, state: AssetState) {
        self.slot.state.store(state);
    }

    /// Failed handles always hold empty content.
    pub(crate) fn fail(&self, error: AssetError) {
        *self.slot.content.write() = AssetContent::empty(self.kind());
        *self.slot.error.lock() = Some(error);
        self.set_state(AssetState::Failed);
    }
}

impl Debug for UntypedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?}, {:?})", self.kind(), self.id(), self.state())
    }
}

impl Eq for UntypedHandle {}

impl PartialEq for UntypedHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// [`UntypedHandle`] whose kind is known statically.
pub struct Handle<A> {
    untyped: UntypedHandle,
    _phantom: PhantomData<fn() -> A>,
}

impl<A: Asset> Handle<A> {
    pub fn untyped(&self) -> &UntypedHandle {
        &self.untyped
    }

    pub fn into_untyped(self) -> UntypedHandle {
        self.untyped
    }

    /// Borrows the content. Pending and failed handles yield empty content.
    pub fn get(&self) -> MappedRwLockReadGuard<'_, A> {
        RwLockReadGuard::map(self.untyped.content(), |content| {
            match A::from_content(content) {
                Some(v) => v,
                None => kind_invariant_broken(self.untyped.id(), A::KIND),
            }
        })
    }
}

impl<A> Deref for Handle<A> {
    type Target = UntypedHandle;

    fn deref(&self) -> &UntypedHandle {
        &self.untyped
    }
}

impl<A> Debug for Handle<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.untyped.fmt(f)
    }
}

impl<A> Clone for Handle<A> {
    fn clone(&self) -> Self {
        Handle {
            untyped: self.untyped.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<A> Eq for Handle<A> {}

impl<A> PartialEq for Handle<A> {
    fn eq(&self, other: &Self) -> bool {
        self.untyped == other.untyped
    }
}

impl<A> PartialEq<Handle<A>> for UntypedHandle {
    fn eq(&self, other: &Handle<A>) -> bool {
        *self == other.untyped
    }
}

#[cold]
#[inline(never)]
fn kind_invariant_broken(id: &AssetId, kind: AssetKind) -> ! {
    panic!("asset {:?} does not hold {} content", id, kind);
}
