//! Values on the operand stack and in frame slots.
//!
//! - [`RawValue`] - a value as it lives on the shared operand stack
//! - [`Slot`] - an argument or local of a frame, tagged with who owns its storage
//! - [`PooledValue`] - storage in the [`crate::emulation::ValuePool`] owned by exactly one slot

mod raw;
mod slot;

pub use raw::RawValue;
pub use slot::{PooledValue, Slot};
