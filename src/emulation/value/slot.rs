use crate::{
    emulation::{memory::PoolHandle, memory::ValuePool, value::RawValue},
    metadata::signatures::TypeSignature,
    Result,
};

/// Pool storage owned by a single [`Slot`].
///
/// Deliberately not `Clone`: moving the value is the only way to share it, so a handle can
/// only ever be released by the slot that holds it.
#[derive(Debug, PartialEq)]
pub struct PooledValue {
    handle: PoolHandle,
    signature: TypeSignature,
}

impl PooledValue {
    /// Wraps a freshly allocated handle
    #[must_use]
    pub(crate) fn new(handle: PoolHandle, signature: TypeSignature) -> Self {
        PooledValue { handle, signature }
    }

    /// The pool handle
    #[must_use]
    pub fn handle(&self) -> PoolHandle {
        self.handle
    }

    /// The type of the storage
    #[must_use]
    pub fn signature(&self) -> &TypeSignature {
        &self.signature
    }
}

/// An argument or local variable of a call frame.
#[derive(Debug, PartialEq)]
pub enum Slot {
    /// Statically sized value living in the value pool; released at frame teardown
    Pooled(PooledValue),
    /// Value passed through as-is (reference types, by-ref and unsized values)
    Inline(RawValue),
    /// Local of the given type without storage yet; becomes `Inline` on first store
    Pending(TypeSignature),
}

impl Slot {
    /// Reads the slot, `None` if it is still pending.
    ///
    /// # Errors
    /// Returns an error if the pooled handle is no longer valid.
    pub fn read(&self, pool: &ValuePool) -> Result<Option<RawValue>> {
        match self {
            Slot::Pooled(value) => pool.load(value.handle).map(Some),
            Slot::Inline(value) => Ok(Some(*value)),
            Slot::Pending(_) => Ok(None),
        }
    }

    /// Stores into the slot, converting the value to the storage type of pooled slots.
    ///
    /// # Errors
    /// Returns an error if the value doesn't fit the storage type of a pooled slot.
    pub fn write(&mut self, pool: &ValuePool, value: RawValue) -> Result<()> {
        match self {
            Slot::Pooled(pooled) => pool.store(pooled.handle, value),
            Slot::Inline(_) | Slot::Pending(_) => {
                *self = Slot::Inline(value);
                Ok(())
            }
        }
    }

    /// The pool handle owned by this slot, if any
    #[must_use]
    pub fn handle(&self) -> Option<PoolHandle> {
        match self {
            Slot::Pooled(value) => Some(value.handle),
            _ => None,
        }
    }

    /// Returns true if this slot owns pool storage
    #[must_use]
    pub fn is_pooled(&self) -> bool {
        matches!(self, Slot::Pooled(_))
    }

    /// Returns true if nothing has been stored to this slot yet
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Slot::Pending(_))
    }

    /// Gives the owned storage back to the pool. Consumes the slot, so storage can't be
    /// released twice through it.
    ///
    /// Returns `true` if pool storage was released.
    ///
    /// # Errors
    /// Returns an error if the pool doesn't know the handle.
    pub fn release(self, pool: &ValuePool) -> Result<bool> {
        match self {
            Slot::Pooled(value) => {
                pool.free(value.handle)?;
                Ok(true)
            }
            Slot::Inline(_) | Slot::Pending(_) => Ok(false),
        }
    }
}
