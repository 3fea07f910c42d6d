use crate::{
    emulation::{engine::ExecutionContext, thread::Thread},
    Result,
};

/// Executes the instructions of interpreted method bodies.
///
/// The step function hands the thread to the executor whenever the top frame is in
/// [`crate::emulation::FrameState::InterpretedExec`]. The executor reads the top frame
/// (`thread.top_mut()`), advances its instruction pointer and works on the shared operand
/// stack. It communicates back through the thread:
///
/// - [`Thread::call`] pushes a callee frame which the step function resolves next
/// - [`Thread::return_from_frame`] moves the frame to teardown once the body returns
///
/// The returned boolean decides whether the step function keeps going (`true`) or yields
/// back to the scheduler (`false`).
///
/// # Example
///
/// ```rust,no_run
/// use dotframe::prelude::*;
///
/// /// Treats every body as `ret`
/// struct ReturnImmediately;
///
/// impl InstructionExecutor for ReturnImmediately {
///     fn execute(&self, thread: &mut Thread, _context: &ExecutionContext) -> dotframe::Result<bool> {
///         thread.return_from_frame()?;
///         Ok(true)
///     }
/// }
/// ```
pub trait InstructionExecutor: Send + Sync {
    /// Execute a slice of the top frame's method body.
    ///
    /// # Errors
    /// Any error aborts the current step and is returned to the caller of
    /// [`Thread::step`].
    fn execute(&self, thread: &mut Thread, context: &ExecutionContext) -> Result<bool>;
}
