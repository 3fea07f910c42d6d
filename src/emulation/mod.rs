//! Call-frame execution engine.
//!
//! This module drives the invocation of CIL methods: every logical [`Thread`] owns a stack
//! of [`CallFrame`]s which [`Thread::step`] moves through an explicit state machine, from
//! token resolution over argument materialization to dispatch and teardown.
//!
//! # Key Components
//!
//! ## Threads and frames
//! - [`Thread`] - frame stack plus operand stack; [`Thread::step`] is the entry point
//! - [`CallFrame`], [`FrameState`] - one method activation and where it is in its lifecycle
//! - [`ThreadScheduler`] - round-robin driver for several threads
//!
//! ## Values
//! - [`RawValue`] - operand stack values
//! - [`Slot`] - arguments and locals, tagged with who owns their storage
//! - [`ValuePool`] - storage for statically sized arguments and locals
//!
//! ## Runtime
//! - [`AppDomain`] - assembly registry, outstanding loads and the value pool
//! - [`AssemblyLoader`], [`LoadTicket`] - asynchronous assembly loading
//! - [`NativeBridge`], [`NativeCall`], [`NativeLibrary`] - host-implemented methods
//!
//! ## Engine
//! - [`ExecutionContext`] - the explicit environment passed into every step
//! - [`InstructionExecutor`] - interprets method bodies
//! - [`EmulationError`] - everything that can go wrong
//!
//! # Execution Limits
//!
//! - **Call depth**: maximum number of frames per thread
//! - **Transitions per step**: a thread yields after this many transitions
//! - **Pool memory**: maximum bytes of live argument and local storage
//!
//! # Thread Safety
//!
//! [`AppDomain`], [`ValuePool`] and [`LoadTicket`] are `Send + Sync` and shared between
//! threads. A [`Thread`] is stepped by one OS thread at a time.

mod config;
mod engine;
mod memory;
mod runtime;
mod thread;
mod value;

pub use config::{ExecutionConfig, ExecutionLimits, MemoryConfig};

pub use engine::{EmulationError, ExecutionContext, InstructionExecutor};

pub use memory::{PoolHandle, StorageClass, ValuePool};

pub use runtime::{
    AppDomain, AssemblyLoader, AssemblyResolution, CatalogLoader, LoadTicket, NativeBridge,
    NativeCall, NativeCallFactory, NativeFunction, NativeLibrary, NativeStatus,
};

pub use thread::{
    CallFrame, FrameId, FrameState, FrameStateKind, ResolvedTarget, SchedulerOutcome, Thread,
    ThreadId, ThreadScheduler,
};

pub use value::{PooledValue, RawValue, Slot};
