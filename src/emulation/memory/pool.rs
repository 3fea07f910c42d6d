//! Value pool with explicit allocation and release.
//!
//! Every statically sized argument and local of an active frame owns one entry in the
//! [`ValuePool`]. Entries store the little-endian bytes of their type, so stores truncate
//! and loads widen exactly like the CIL `stind`/`ldind` family does.

use std::{
    fmt,
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
};

use dashmap::DashMap;

use crate::{
    emulation::{engine::EmulationError, value::RawValue},
    metadata::signatures::TypeSignature,
    Result,
};

/// Opaque reference to an allocation in a [`ValuePool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolHandle(u64);

impl PoolHandle {
    /// The raw handle id
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool#{}", self.0)
    }
}

/// What an allocation is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// A method argument
    Argument,
    /// A local variable
    Local,
}

#[derive(Debug)]
struct PoolEntry {
    signature: TypeSignature,
    class: StorageClass,
    bytes: Vec<u8>,
}

/// Thread-safe storage for statically sized values.
///
/// Allocation ids are never reused, and `free` removes the entry atomically: a handle can be
/// released at most once, a second attempt fails with
/// [`EmulationError::InvalidPoolHandle`].
///
/// # Example
///
/// ```rust
/// use dotframe::emulation::{RawValue, StorageClass, ValuePool};
/// use dotframe::metadata::signatures::TypeSignature;
///
/// let pool = ValuePool::new(1024);
/// let handle = pool.allocate(&TypeSignature::U1, StorageClass::Local)?;
///
/// pool.store(handle, RawValue::I32(0x1FF))?;
/// assert_eq!(pool.load(handle)?, RawValue::I32(0xFF));
///
/// pool.free(handle)?;
/// assert!(pool.free(handle).is_err());
/// # Ok::<(), dotframe::Error>(())
/// ```
#[derive(Debug)]
pub struct ValuePool {
    entries: DashMap<u64, PoolEntry>,
    next_id: AtomicU64,
    bytes_in_use: AtomicUsize,
    allocations: AtomicU64,
    frees: AtomicU64,
    max_bytes: usize,
}

impl ValuePool {
    /// Creates a pool with the given budget in bytes
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        ValuePool {
            entries: DashMap::new(),
            next_id: AtomicU64::new(1),
            bytes_in_use: AtomicUsize::new(0),
            allocations: AtomicU64::new(0),
            frees: AtomicU64::new(0),
            max_bytes,
        }
    }

    /// Creates a pool with the default budget (64MB)
    #[must_use]
    pub fn default_size() -> Self {
        Self::new(64 * 1024 * 1024)
    }

    /// Allocates zeroed storage for a value of the given type.
    ///
    /// # Errors
    /// Returns [`EmulationError::UnsizedPoolType`] if the type has no static size, or
    /// [`EmulationError::PoolMemoryLimitExceeded`] if the budget is exhausted.
    pub fn allocate(&self, signature: &TypeSignature, class: StorageClass) -> Result<PoolHandle> {
        let size = signature
            .static_size()
            .ok_or_else(|| EmulationError::UnsizedPoolType {
                signature: signature.clone(),
            })?;

        let current = self.bytes_in_use.fetch_add(size, Ordering::SeqCst);
        if current + size > self.max_bytes {
            self.bytes_in_use.fetch_sub(size, Ordering::SeqCst);
            return Err(EmulationError::PoolMemoryLimitExceeded {
                requested: size,
                current,
                limit: self.max_bytes,
            }
            .into());
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(
            id,
            PoolEntry {
                signature: signature.clone(),
                class,
                bytes: vec![0; size],
            },
        );
        self.allocations.fetch_add(1, Ordering::Relaxed);

        Ok(PoolHandle(id))
    }

    /// Stores a value, converting it to the storage type.
    ///
    /// Integral values are truncated to the storage width, floating point values converted
    /// between `float32` and `float64`. `null` stores as zero into pointer-sized storage.
    ///
    /// # Errors
    /// Returns [`EmulationError::InvalidPoolHandle`] for unknown handles and
    /// [`EmulationError::ValueTypeMismatch`] if the value can't be represented.
    pub fn store(&self, handle: PoolHandle, value: RawValue) -> Result<()> {
        let mut entry = self
            .entries
            .get_mut(&handle.0)
            .ok_or(EmulationError::InvalidPoolHandle { handle })?;

        let encoded = encode(&entry.signature, value).ok_or_else(|| {
            EmulationError::ValueTypeMismatch {
                expected: entry.signature.clone(),
                value,
            }
        })?;

        let size = entry.bytes.len();
        entry.bytes.copy_from_slice(&encoded[..size]);
        Ok(())
    }

    /// Loads a value, widening it to its stack representation.
    ///
    /// # Errors
    /// Returns [`EmulationError::InvalidPoolHandle`] for unknown handles.
    pub fn load(&self, handle: PoolHandle) -> Result<RawValue> {
        let entry = self
            .entries
            .get(&handle.0)
            .ok_or(EmulationError::InvalidPoolHandle { handle })?;

        Ok(decode(&entry.signature, &entry.bytes))
    }

    /// Releases the storage of a handle.
    ///
    /// # Errors
    /// Returns [`EmulationError::InvalidPoolHandle`] if the handle is unknown or was already
    /// released.
    pub fn free(&self, handle: PoolHandle) -> Result<()> {
        let (_, entry) = self
            .entries
            .remove(&handle.0)
            .ok_or(EmulationError::InvalidPoolHandle { handle })?;

        self.bytes_in_use
            .fetch_sub(entry.bytes.len(), Ordering::SeqCst);
        self.frees.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Returns true if the handle is currently allocated
    #[must_use]
    pub fn contains(&self, handle: PoolHandle) -> bool {
        self.entries.contains_key(&handle.0)
    }

    /// The type of a live allocation
    #[must_use]
    pub fn signature_of(&self, handle: PoolHandle) -> Option<TypeSignature> {
        self.entries
            .get(&handle.0)
            .map(|entry| entry.signature.clone())
    }

    /// The storage class of a live allocation
    #[must_use]
    pub fn class_of(&self, handle: PoolHandle) -> Option<StorageClass> {
        self.entries.get(&handle.0).map(|entry| entry.class)
    }

    /// Number of live allocations
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of live allocations of the given class
    #[must_use]
    pub fn live_count_of(&self, class: StorageClass) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().class == class)
            .count()
    }

    /// Number of allocations made over the lifetime of the pool
    #[must_use]
    pub fn total_allocations(&self) -> u64 {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Number of releases over the lifetime of the pool
    #[must_use]
    pub fn total_frees(&self) -> u64 {
        self.frees.load(Ordering::Relaxed)
    }

    /// Bytes of live storage
    #[must_use]
    pub fn bytes_in_use(&self) -> usize {
        self.bytes_in_use.load(Ordering::SeqCst)
    }

    /// The configured budget
    #[must_use]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }
}

impl Default for ValuePool {
    fn default() -> Self {
        Self::default_size()
    }
}

/// Little-endian encoding of `value` as storage of type `signature`, 8 bytes wide; the
/// caller keeps as many as the storage holds.
fn encode(signature: &TypeSignature, value: RawValue) -> Option<[u8; 8]> {
    match signature {
        TypeSignature::R4 => {
            #[allow(clippy::cast_possible_truncation)]
            let narrowed = value.as_f64()? as f32;
            let mut out = [0u8; 8];
            out[..4].copy_from_slice(&narrowed.to_le_bytes());
            Some(out)
        }
        TypeSignature::R8 => Some(value.as_f64()?.to_le_bytes()),
        TypeSignature::Boolean => Some(u64::from(value.as_i64()? != 0).to_le_bytes()),
        TypeSignature::I | TypeSignature::U | TypeSignature::Ptr(_) | TypeSignature::FnPtr(_)
            if value.is_null() =>
        {
            Some([0u8; 8])
        }
        TypeSignature::Pinned(inner) => encode(inner, value),
        _ => Some(value.as_i64()?.to_le_bytes()),
    }
}

/// Reads storage of type `signature` back into its stack representation
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn decode(signature: &TypeSignature, bytes: &[u8]) -> RawValue {
    let mut raw = [0u8; 8];
    let len = bytes.len().min(8);
    raw[..len].copy_from_slice(&bytes[..len]);
    let unsigned = u64::from_le_bytes(raw);

    match signature {
        TypeSignature::I1 => RawValue::I32(i32::from(unsigned as u8 as i8)),
        TypeSignature::I2 => RawValue::I32(i32::from(unsigned as u16 as i16)),
        TypeSignature::Boolean | TypeSignature::U1 => RawValue::I32(i32::from(unsigned as u8)),
        TypeSignature::Char | TypeSignature::U2 => RawValue::I32(i32::from(unsigned as u16)),
        TypeSignature::I4 | TypeSignature::U4 => RawValue::I32(unsigned as u32 as i32),
        TypeSignature::I8 | TypeSignature::U8 => RawValue::I64(unsigned as i64),
        TypeSignature::R4 => RawValue::F32(f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
        TypeSignature::R8 => RawValue::F64(f64::from_le_bytes(raw)),
        TypeSignature::Pinned(inner) => decode(inner, bytes),
        _ => RawValue::NativeInt(unsigned as i64),
    }
}
