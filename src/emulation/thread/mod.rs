//! Logical threads and their call frames.
//!
//! A [`Thread`] owns a stack of [`CallFrame`]s and the operand stack shared by them. Each
//! call to [`Thread::step`] advances the top frame through its [`FrameState`]s until the
//! thread either runs out of frames or has to wait:
//!
//! ```text
//!            MethodDef                                       executor returns
//! Resolve ─────────────────────────────► BodySetup ──► InterpretedExec ──► Teardown
//!    │ MemberRef                                                              ▲
//!    ├── assembly registered ──► AssemblyResolved ──► NativeExec ─────────────┘
//!    └── load issued ──► AwaitAssembly ──┘
//! ```
//!
//! Suspension points are `AwaitAssembly` (load outstanding), `NativeExec` (call pending) and
//! `InterpretedExec` when the executor asks to yield.

mod frame;
mod scheduler;
mod step;
#[allow(clippy::module_inception)]
mod thread;


pub use frame::{CallFrame, FrameId, FrameState, FrameStateKind, ResolvedTarget};
pub use scheduler::{SchedulerOutcome, ThreadScheduler};
pub use thread::{Thread, ThreadId};
