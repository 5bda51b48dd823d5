//! Side table associating values with objects without keeping them alive.

use alloc::sync::Arc;

use log::trace;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use stepmeta_core::{ObjectId, ObjectRef, WeakObjectRef};

const MIN_SWEEP_THRESHOLD: usize = 16;

struct Entry<V> {
    owner: WeakObjectRef,
    value: V,
}

impl<V> Entry<V> {
    #[inline]
    fn is_live(&self) -> bool {
        self.owner.strong_count() > 0
    }
}

struct Inner<V> {
    entries: FxHashMap<ObjectId, Entry<V>>,
    sweep_at: usize,
}

/// Maps owners to values, holding the owners weakly.
///
/// An entry stops being visible the moment its owner is dropped: lookups
/// check the owner is still alive, so a new object allocated at the same
/// address never sees a stale value. Dead entries are removed by [`sweep`],
/// which also runs whenever the table doubles in size.
///
/// [`sweep`]: OwnerTable::sweep
pub struct OwnerTable<V> {
    inner: RwLock<Inner<V>>,
}

impl<V> Default for OwnerTable<V> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: FxHashMap::default(),
                sweep_at: MIN_SWEEP_THRESHOLD,
            }),
        }
    }
}

impl<V: Clone> OwnerTable<V> {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table ready to be shared between members
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The value stored for `owner`, if any
    pub fn get(&self, owner: &ObjectRef) -> Option<V> {
        let inner = self.inner.read();
        inner
            .entries
            .get(&ObjectId::of(owner))
            .filter(|e| e.is_live())
            .map(|e| e.value.clone())
    }

    /// Whether a value is stored for `owner`
    pub fn contains(&self, owner: &ObjectRef) -> bool {
        let inner = self.inner.read();
        inner
            .entries
            .get(&ObjectId::of(owner))
            .is_some_and(|e| e.is_live())
    }

    /// Stores `value` for `owner`, replacing any previous value
    pub fn insert(&self, owner: &ObjectRef, value: V) {
        let mut inner = self.inner.write();
        if inner.entries.len() >= inner.sweep_at {
            Self::sweep_locked(&mut inner);
        }
        inner.entries.insert(
            ObjectId::of(owner),
            Entry {
                owner: Arc::downgrade(owner),
                value,
            },
        );
    }

    /// Removes the value stored for `owner`
    pub fn remove(&self, owner: &ObjectRef) -> Option<V> {
        let mut inner = self.inner.write();
        inner
            .entries
            .remove(&ObjectId::of(owner))
            .filter(|e| e.is_live())
            .map(|e| e.value)
    }

    /// Number of live owners with a stored value
    pub fn len(&self) -> usize {
        let inner = self.inner.read();
        inner.entries.values().filter(|e| e.is_live()).count()
    }

    /// Whether no live owner has a stored value
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry whose owner is gone
    pub fn sweep(&self) {
        let mut inner = self.inner.write();
        Self::sweep_locked(&mut inner);
    }

    fn sweep_locked(inner: &mut Inner<V>) {
        let before = inner.entries.len();
        inner.entries.retain(|_, e| e.is_live());
        let after = inner.entries.len();
        inner.sweep_at = (after * 2).max(MIN_SWEEP_THRESHOLD);
        if before != after {
            trace!("swept {} dead owner entries, {} left", before - after, after);
        }
    }
}
