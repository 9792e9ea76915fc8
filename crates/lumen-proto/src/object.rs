//! Transferable object references.
//!
//! Objects that cross the boundary (connections, heaps, displays, textures)
//! live in a [`HandleTable`] arena. Callers never hold the object directly;
//! they hold an [`ObjectRef`], a strong handle that counts as one owner.
//!
//! # Ownership Model
//!
//! - Cloning an `ObjectRef` adds an owner. Writing one into a parcel clones it
//!   into the parcel's object table, and reading it back clones it again, so
//!   the receiver becomes a co-owner.
//! - Dropping an `ObjectRef` releases its owner. When the last owner goes, the
//!   slot is removed and the object is dropped.
//! - A slot can be marked dead when its hosting side goes away. Existing
//!   handles stay valid as handles, but resolving them fails.
//!
//! # Security
//!
//! - **Typed Resolution**: [`ObjectRef::cast`] compares the interface
//!   descriptor recorded at registration before downcasting, so a handle for
//!   one interface can never be used as another.
//! - **No Revival**: [`HandleTable::lookup`] only succeeds while at least one
//!   owner exists. A slot whose count reached zero cannot be resurrected by a
//!   racing lookup.

use std::{
    any::Any,
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
    sync::{
        Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
};

use thiserror::Error;

/// An object that can be registered in a [`HandleTable`].
///
/// The descriptor names the interface the object implements. It is checked on
/// every [`ObjectRef::cast`].
pub trait Interface: Any + Send + Sync {
    /// Interface descriptor, unique per interface
    const DESCRIPTOR: &'static str;
}

/// Failure to resolve an object reference locally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// A required reference was null
    #[error("null object reference")]
    Null,

    /// The object's hosting side is gone
    #[error("object is dead")]
    Dead,

    /// The handle does not name a live slot
    #[error("unknown object handle")]
    Unknown,

    /// The object implements a different interface
    #[error("wrong interface: expected {expected}, object implements {actual}")]
    WrongInterface {
        /// Descriptor the caller asked for
        expected: &'static str,
        /// Descriptor the object was registered with
        actual: &'static str,
    },
}

/// Slot identifier inside a [`HandleTable`]. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    /// Raw identifier value
    #[must_use]
    pub const fn to_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Slot {
    object: Arc<dyn Any + Send + Sync>,
    descriptor: &'static str,
    strong: AtomicUsize,
    dead: AtomicBool,
}

/// Arena of registered objects with atomic owner counts.
///
/// Shared by every parcel and call on a connection. Counts are atomics under
/// a read lock; the write lock is only taken to insert or remove a slot.
pub struct HandleTable {
    slots: RwLock<HashMap<HandleId, Slot>>,
    next_id: AtomicU64,
}

impl HandleTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self { slots: RwLock::new(HashMap::new()), next_id: AtomicU64::new(1) })
    }

    /// Register an object and return the first owning handle
    pub fn register<T: Interface>(self: &Arc<Self>, object: Arc<T>) -> ObjectRef {
        let id = HandleId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let slot = Slot {
            object,
            descriptor: T::DESCRIPTOR,
            strong: AtomicUsize::new(1),
            dead: AtomicBool::new(false),
        };
        self.write().insert(id, slot);

        ObjectRef { id, descriptor: T::DESCRIPTOR, table: Arc::clone(self) }
    }

    /// Acquire a new owning handle for an existing slot
    ///
    /// # Errors
    ///
    /// - `ReferenceError::Unknown` if the slot was freed (or never existed)
    /// - `ReferenceError::Dead` if the slot was marked dead
    pub fn lookup(self: &Arc<Self>, id: HandleId) -> Result<ObjectRef, ReferenceError> {
        let slots = self.read();
        let slot = slots.get(&id).ok_or(ReferenceError::Unknown)?;
        if slot.dead.load(Ordering::Acquire) {
            return Err(ReferenceError::Dead);
        }

        slot.strong
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n > 0).then(|| n + 1))
            .map_err(|_| ReferenceError::Unknown)?;

        Ok(ObjectRef { id, descriptor: slot.descriptor, table: Arc::clone(self) })
    }

    /// Number of owners of a slot; zero if it does not exist
    #[must_use]
    pub fn strong_count(&self, id: HandleId) -> usize {
        self.read().get(&id).map_or(0, |slot| slot.strong.load(Ordering::Acquire))
    }

    /// Mark a slot dead. Returns false if the slot does not exist.
    pub fn mark_dead(&self, id: HandleId) -> bool {
        match self.read().get(&id) {
            Some(slot) => {
                slot.dead.store(true, Ordering::Release);
                true
            },
            None => false,
        }
    }

    /// Number of live slots
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True if no slots are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn acquire(&self, id: HandleId) {
        if let Some(slot) = self.read().get(&id) {
            slot.strong.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn release(&self, id: HandleId) {
        let last = match self.read().get(&id) {
            Some(slot) => slot.strong.fetch_sub(1, Ordering::AcqRel) == 1,
            None => false,
        };

        if last {
            let removed = {
                let mut slots = self.write();
                // lookup() never increments from zero, so the recheck is final
                if slots.get(&id).is_some_and(|slot| slot.strong.load(Ordering::Acquire) == 0) {
                    slots.remove(&id)
                } else {
                    None
                }
            };
            // The object may own handles into this table; drop it unlocked
            drop(removed);
        }
    }

    fn is_dead(&self, id: HandleId) -> bool {
        self.read().get(&id).is_none_or(|slot| slot.dead.load(Ordering::Acquire))
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<HandleId, Slot>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<HandleId, Slot>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for HandleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleTable").field("slots", &self.len()).finish_non_exhaustive()
    }
}

/// Owning handle to an object in a [`HandleTable`].
pub struct ObjectRef {
    id: HandleId,
    descriptor: &'static str,
    table: Arc<HandleTable>,
}

impl ObjectRef {
    /// Slot identifier
    #[must_use]
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Interface descriptor the object was registered with
    #[must_use]
    pub fn descriptor(&self) -> &'static str {
        self.descriptor
    }

    /// False once the slot has been marked dead
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.table.is_dead(self.id)
    }

    /// Table this handle belongs to
    #[must_use]
    pub fn table(&self) -> &Arc<HandleTable> {
        &self.table
    }

    /// Resolve the handle to its concrete object.
    ///
    /// This is a local check. It does not contact the hosting side.
    ///
    /// # Errors
    ///
    /// - `ReferenceError::WrongInterface` if `T::DESCRIPTOR` differs from the
    ///   registered descriptor
    /// - `ReferenceError::Dead` if the slot was marked dead
    /// - `ReferenceError::Unknown` if the slot no longer exists
    pub fn cast<T: Interface>(&self) -> Result<Arc<T>, ReferenceError> {
        let slots = self.table.read();
        let slot = slots.get(&self.id).ok_or(ReferenceError::Unknown)?;
        if slot.dead.load(Ordering::Acquire) {
            return Err(ReferenceError::Dead);
        }

        let mismatch =
            || ReferenceError::WrongInterface { expected: T::DESCRIPTOR, actual: slot.descriptor };
        if slot.descriptor != T::DESCRIPTOR {
            return Err(mismatch());
        }

        Arc::clone(&slot.object).downcast::<T>().map_err(|_| mismatch())
    }
}

impl Clone for ObjectRef {
    fn clone(&self) -> Self {
        self.table.acquire(self.id);
        Self { id: self.id, descriptor: self.descriptor, table: Arc::clone(&self.table) }
    }
}

impl Drop for ObjectRef {
    fn drop(&mut self) {
        self.table.release(self.id);
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.table, &other.table)
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("id", &self.id)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}
