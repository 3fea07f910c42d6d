//! Error types raised while driving call frames.

use thiserror::Error;

use crate::{
    emulation::{memory::PoolHandle, thread::FrameId, thread::FrameStateKind, value::RawValue},
    metadata::{signatures::TypeSignature, token::Token},
};

/// Fatal conditions of the call-frame state machine and its collaborators.
///
/// None of these are recovered from inside [`crate::emulation::Thread::step`]: the error is
/// returned to the caller with the failing frame left in the state it was in.
///
/// # Categories
///
/// ## Method resolution
/// - [`EmulationError::UnsupportedTokenTable`] - token neither `MethodDef` nor `MemberRef`
/// - [`EmulationError::UnsupportedClassReference`] - `MemberRef` parent is not a `TypeRef`
/// - [`EmulationError::UnsupportedResolutionScope`] - `TypeRef` scope is not an `AssemblyRef`
/// - [`EmulationError::UnresolvedNativeDispatch`] - resolved assembly has no native bridge
///
/// ## Loading
/// - [`EmulationError::AssemblyNotFound`], [`EmulationError::AssemblyLoadFailed`]
///
/// ## Resources
/// - [`EmulationError::CallDepthExceeded`], [`EmulationError::PoolMemoryLimitExceeded`]
#[derive(Error, Debug, Clone)]
pub enum EmulationError {
    /// The invoked token references a table that cannot be called directly.
    #[error("Invalid method token {token}: table 0x{table:02x} cannot be invoked (frame {frame})")]
    UnsupportedTokenTable {
        /// The invoked token
        token: Token,
        /// Its table tag
        table: u8,
        /// The frame that held the token
        frame: FrameId,
    },

    /// The `MemberRef` parent is not a `TypeRef`.
    #[error("MemberRef {token} has parent {class}, only TypeRef parents are supported (frame {frame})")]
    UnsupportedClassReference {
        /// The invoked `MemberRef` token
        token: Token,
        /// The `MemberRefParent` coded index target
        class: Token,
        /// The frame that held the token
        frame: FrameId,
    },

    /// The `TypeRef` a `MemberRef` points at is not scoped to an `AssemblyRef`.
    #[error("TypeRef {type_ref} of {token} has resolution scope {scope}, only AssemblyRef scopes are supported (frame {frame})")]
    UnsupportedResolutionScope {
        /// The invoked `MemberRef` token
        token: Token,
        /// The `TypeRef` the member belongs to
        type_ref: Token,
        /// The `ResolutionScope` coded index target
        scope: Token,
        /// The frame that held the token
        frame: FrameId,
    },

    /// A `MemberRef` resolved into an assembly that has no native bridge.
    #[error("Cannot dispatch {token} into assembly '{assembly}': no native bridge (frame {frame})")]
    UnresolvedNativeDispatch {
        /// The invoked `MemberRef` token
        token: Token,
        /// Name of the resolved assembly
        assembly: String,
        /// The frame that held the token
        frame: FrameId,
    },

    /// A native bridge does not implement the requested member.
    #[error("Native method '{method}' is not implemented")]
    NativeMethodNotFound {
        /// `Namespace.Type::Member` of the requested method
        method: String,
    },

    /// A `MethodDef` token has no body in the calling assembly.
    #[error("No method body for {token}")]
    MissingMethodBody {
        /// The `MethodDef` token
        token: Token,
    },

    /// A token points past the end of its table.
    #[error("Metadata row {token} does not exist")]
    MissingMetadataRow {
        /// The dangling token
        token: Token,
    },

    /// A frame is missing data its current state requires.
    #[error("Frame {frame} has no {missing}")]
    IncompleteFrame {
        /// The inconsistent frame
        frame: FrameId,
        /// What is missing
        missing: &'static str,
    },

    /// Fewer values are on the operand stack than a call consumes.
    #[error("Operand stack underflow: needed {needed} values, {available} available")]
    OperandStackUnderflow {
        /// Number of values required
        needed: usize,
        /// Number of values present
        available: usize,
    },

    /// No assembly with this name is registered and no loader is configured.
    #[error("Assembly '{name}' is not loaded and no loader is configured")]
    AssemblyNotFound {
        /// Simple name of the assembly
        name: String,
    },

    /// The assembly loader reported a failure.
    #[error("Loading assembly '{name}' failed: {reason}")]
    AssemblyLoadFailed {
        /// Simple name of the assembly
        name: String,
        /// Loader supplied reason
        reason: String,
    },

    /// The frame stack grew beyond the configured limit.
    #[error("Call depth {depth} exceeds the limit of {limit}")]
    CallDepthExceeded {
        /// Depth that was reached
        depth: usize,
        /// Configured maximum
        limit: usize,
    },

    /// A pool allocation would exceed the configured memory limit.
    #[error("Value pool limit exceeded: {requested} bytes requested, {current} of {limit} in use")]
    PoolMemoryLimitExceeded {
        /// Size of the rejected allocation
        requested: usize,
        /// Bytes in use before the allocation
        current: usize,
        /// Configured maximum
        limit: usize,
    },

    /// The handle is not (or no longer) allocated in the pool.
    #[error("Invalid pool handle {handle}")]
    InvalidPoolHandle {
        /// The offending handle
        handle: PoolHandle,
    },

    /// Pool storage was requested for a type without a static size.
    #[error("Type {signature:?} has no static size")]
    UnsizedPoolType {
        /// The unsized type
        signature: TypeSignature,
    },

    /// A value cannot be stored into storage of the given type.
    #[error("Cannot store {value:?} into storage of type {expected:?}")]
    ValueTypeMismatch {
        /// Type of the storage
        expected: TypeSignature,
        /// The rejected value
        value: RawValue,
    },

    /// A slot was read before anything was stored to it.
    #[error("{what} {index} of frame {frame} is uninitialized")]
    UninitializedSlot {
        /// Owning frame
        frame: FrameId,
        /// `"argument"` or `"local"`
        what: &'static str,
        /// Slot index
        index: usize,
    },

    /// A slot index is out of range.
    #[error("{what} {index} of frame {frame} is out of range ({count} slots)")]
    SlotOutOfRange {
        /// Owning frame
        frame: FrameId,
        /// `"argument"` or `"local"`
        what: &'static str,
        /// Requested index
        index: usize,
        /// Number of slots of that kind
        count: usize,
    },

    /// An operation requires the frame to be in a different state.
    #[error("Frame {frame} is in state {actual}, expected {expected}")]
    InvalidFrameState {
        /// The frame
        frame: FrameId,
        /// Required state
        expected: FrameStateKind,
        /// Actual state
        actual: FrameStateKind,
    },

    /// An operation requires at least one frame.
    #[error("The call stack is empty")]
    EmptyCallStack,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = EmulationError::UnsupportedTokenTable {
            token: Token::new(0x2B00_0001),
            table: 0x2B,
            frame: FrameId::new(3),
        };
        let message = err.to_string();
        assert!(message.contains("0x2b000001"));
        assert!(message.contains("0x2b"));
        assert!(message.contains("#3"));

        let err = EmulationError::InvalidFrameState {
            frame: FrameId::new(1),
            expected: FrameStateKind::InterpretedExec,
            actual: FrameStateKind::Resolve,
        };
        assert_eq!(
            err.to_string(),
            "Frame #1 is in state Resolve, expected InterpretedExec"
        );
    }
}
