//! A logical thread: its frame stack, the shared operand stack and cleanup.

use std::fmt;

use log::debug;

use crate::{
    emulation::{
        engine::EmulationError,
        memory::ValuePool,
        thread::{CallFrame, FrameId, FrameState, FrameStateKind},
        value::RawValue,
    },
    metadata::{assembly::AssemblyRc, token::Token},
    Result,
};

/// Identifies a logical thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub u32);

impl ThreadId {
    /// The thread a program starts on
    pub const MAIN: ThreadId = ThreadId(1);
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread-{}", self.0)
    }
}

/// A logical thread of execution.
///
/// The thread is done when its frame stack is empty. Values left on the operand stack at
/// that point are the results of the outermost call.
///
/// # Example
///
/// ```rust
/// use dotframe::prelude::*;
///
/// let assembly = Assembly::builder("App").build();
/// let mut thread = Thread::new(ThreadId::MAIN);
///
/// thread.push(RawValue::I32(1));
/// thread.push(RawValue::I32(2));
/// let frame = thread.call(assembly, Token::new(0x0600_0001));
///
/// assert_eq!(thread.depth(), 1);
/// assert_eq!(thread.top().map(|f| f.id()), Some(frame));
/// assert_eq!(thread.pop_values(2)?, vec![RawValue::I32(1), RawValue::I32(2)]);
/// # Ok::<(), dotframe::Error>(())
/// ```
pub struct Thread {
    id: ThreadId,
    pub(crate) frames: Vec<CallFrame>,
    pub(crate) operand_stack: Vec<RawValue>,
    next_frame: u64,
}

impl Thread {
    /// Creates a thread without frames
    #[must_use]
    pub fn new(id: ThreadId) -> Self {
        Thread {
            id,
            frames: Vec::new(),
            operand_stack: Vec::new(),
            next_frame: 1,
        }
    }

    /// The id of this thread
    #[must_use]
    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// Pushes a frame invoking `method`, a token in the metadata of `calling_assembly`.
    ///
    /// Arguments are expected on the operand stack; they are consumed when the frame is
    /// activated.
    pub fn call(&mut self, calling_assembly: AssemblyRc, method: Token) -> FrameId {
        let id = FrameId::new(self.next_frame);
        self.next_frame += 1;

        debug!(
            "{} frame {} calls {} in '{}' at depth {}",
            self.id,
            id,
            method,
            calling_assembly.name(),
            self.frames.len() + 1
        );

        self.frames.push(CallFrame::new(id, calling_assembly, method));
        id
    }

    /// Pushes a value onto the operand stack
    pub fn push(&mut self, value: RawValue) {
        self.operand_stack.push(value);
    }

    /// Pops the top of the operand stack
    pub fn pop(&mut self) -> Option<RawValue> {
        self.operand_stack.pop()
    }

    /// The top of the operand stack
    #[must_use]
    pub fn peek(&self) -> Option<&RawValue> {
        self.operand_stack.last()
    }

    /// Pops `count` values, returned in the order they were pushed.
    ///
    /// # Errors
    /// Returns [`EmulationError::OperandStackUnderflow`] if fewer values are present; the
    /// stack is left untouched in that case.
    pub fn pop_values(&mut self, count: usize) -> Result<Vec<RawValue>> {
        let available = self.operand_stack.len();
        let start = available
            .checked_sub(count)
            .ok_or(EmulationError::OperandStackUnderflow {
                needed: count,
                available,
            })?;

        Ok(self.operand_stack.split_off(start))
    }

    /// The operand stack, bottom first
    #[must_use]
    pub fn operand_stack(&self) -> &[RawValue] {
        &self.operand_stack
    }

    /// The frames, outermost first
    #[must_use]
    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    /// The executing frame
    #[must_use]
    pub fn top(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    /// The executing frame, mutable
    pub fn top_mut(&mut self) -> Option<&mut CallFrame> {
        self.frames.last_mut()
    }

    /// Number of frames
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns true once the frame stack is empty
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns true if the executing frame waits for an assembly load that hasn't settled
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        matches!(
            self.top().map(CallFrame::state),
            Some(FrameState::AwaitAssembly(ticket)) if !ticket.is_ready()
        )
    }

    /// Ends the executing interpreted frame; it is torn down on the next transition.
    ///
    /// Called by the instruction executor when the body returns. Return values are
    /// expected on the operand stack already.
    ///
    /// # Errors
    /// Returns [`EmulationError::EmptyCallStack`] without frames and
    /// [`EmulationError::InvalidFrameState`] if the frame isn't interpreted.
    pub fn return_from_frame(&mut self) -> Result<()> {
        let frame = self
            .frames
            .last_mut()
            .ok_or(EmulationError::EmptyCallStack)?;

        if frame.kind() != FrameStateKind::InterpretedExec {
            return Err(EmulationError::InvalidFrameState {
                frame: frame.id,
                expected: FrameStateKind::InterpretedExec,
                actual: frame.kind(),
            }
            .into());
        }

        frame.state = FrameState::Teardown;
        Ok(())
    }

    /// Drops all frames and the operand stack, releasing every value the frames own.
    ///
    /// [`Thread::step`] never does this on its own: a thread whose step failed keeps its
    /// values until the host abandons it. Returns the number of released values.
    ///
    /// # Errors
    /// Returns the first release failure; the remaining values are released regardless.
    pub fn abandon(&mut self, pool: &ValuePool) -> Result<usize> {
        let mut released = 0;
        let mut first_error = None;

        while let Some(mut frame) = self.frames.pop() {
            match frame.release(pool) {
                Ok(count) => released += count,
                Err(error) => {
                    first_error.get_or_insert(error);
                }
            }
        }
        self.operand_stack.clear();

        debug!("{} abandoned, released {} values", self.id, released);

        match first_error {
            Some(error) => Err(error),
            None => Ok(released),
        }
    }

    pub(crate) fn top_frame_mut(&mut self) -> Result<&mut CallFrame> {
        self.frames
            .last_mut()
            .ok_or_else(|| EmulationError::EmptyCallStack.into())
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("id", &self.id)
            .field("frames", &self.frames)
            .field("operand_stack", &self.operand_stack)
            .finish_non_exhaustive()
    }
}
