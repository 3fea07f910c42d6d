//! # dotframe Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the dotframe library. Import this module to get quick access to everything needed
//! to build assemblies, set up a domain and step threads.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotframe operations
pub use crate::Error;

/// The result type used throughout dotframe
pub use crate::Result;

/// Errors raised by the call-frame state machine
pub use crate::emulation::EmulationError;

// ================================================================================================
// Metadata
// ================================================================================================

/// Metadata tokens and their decoded kind
pub use crate::metadata::token::{Token, TokenKind};

/// Assemblies and their builder
pub use crate::metadata::assembly::{Assembly, AssemblyBuilder, AssemblyRc};

/// Method bodies
pub use crate::metadata::method::{MethodBody, MethodBodyFlags, MethodBodyRc};

/// Table identifiers and coded indices for building `MemberRef` chains
pub use crate::metadata::tables::{CodedIndex, MetadataTables, TableId};

/// Signature types and decoding
pub use crate::metadata::signatures::{
    EcmaSignatureDecoder, SignatureDecoder, SignatureMethod, TypeSignature,
};

// ================================================================================================
// Execution
// ================================================================================================

/// Threads, frames and the scheduler
pub use crate::emulation::{
    CallFrame, FrameId, FrameState, FrameStateKind, SchedulerOutcome, Thread, ThreadId,
    ThreadScheduler,
};

/// The environment of a step and the executor seam
pub use crate::emulation::{
    ExecutionConfig, ExecutionContext, ExecutionLimits, InstructionExecutor, MemoryConfig,
};

/// Values and their storage
pub use crate::emulation::{PoolHandle, RawValue, Slot, StorageClass, ValuePool};

/// Domain, loading and native methods
pub use crate::emulation::{
    AppDomain, AssemblyLoader, CatalogLoader, LoadTicket, NativeBridge, NativeCall,
    NativeLibrary, NativeStatus,
};
