//! Pool-backed storage for frame arguments and locals.

mod pool;

pub use pool::{PoolHandle, StorageClass, ValuePool};
