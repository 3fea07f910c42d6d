//! Call frames and the states they move through.

use std::fmt;

use strum::Display;

use crate::{
    emulation::{
        engine::EmulationError,
        memory::ValuePool,
        runtime::{LoadTicket, NativeCall},
        value::{RawValue, Slot},
    },
    metadata::{
        assembly::AssemblyRc,
        method::MethodBodyRc,
        signatures::{SignatureLocalVariables, SignatureMethod},
        tables::{AssemblyRefRc, MemberRefRc, TypeRefRc},
        token::Token,
    },
    Result,
};

/// Identifies a frame within its thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u64);

impl FrameId {
    /// Creates a frame id
    #[must_use]
    pub fn new(id: u64) -> Self {
        FrameId(id)
    }

    /// The raw id
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a call frame
#[derive(Debug, Clone)]
pub enum FrameState {
    /// The method token has not been looked at yet
    Resolve,
    /// Waiting for the load of the assembly a `MemberRef` lives in
    AwaitAssembly(LoadTicket),
    /// The executing assembly of a `MemberRef` is known
    AssemblyResolved,
    /// The body of a `MethodDef` is known, arguments and locals are not set up yet
    BodySetup,
    /// A native call is in flight
    NativeExec,
    /// The executor runs the method body
    InterpretedExec,
    /// The method finished; the frame releases its values and is popped
    Teardown,
}

/// Payload-free mirror of [`FrameState`], for logging and inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum FrameStateKind {
    /// See [`FrameState::Resolve`]
    Resolve,
    /// See [`FrameState::AwaitAssembly`]
    AwaitAssembly,
    /// See [`FrameState::AssemblyResolved`]
    AssemblyResolved,
    /// See [`FrameState::BodySetup`]
    BodySetup,
    /// See [`FrameState::NativeExec`]
    NativeExec,
    /// See [`FrameState::InterpretedExec`]
    InterpretedExec,
    /// See [`FrameState::Teardown`]
    Teardown,
}

impl FrameState {
    /// The kind of this state
    #[must_use]
    pub fn kind(&self) -> FrameStateKind {
        match self {
            FrameState::Resolve => FrameStateKind::Resolve,
            FrameState::AwaitAssembly(_) => FrameStateKind::AwaitAssembly,
            FrameState::AssemblyResolved => FrameStateKind::AssemblyResolved,
            FrameState::BodySetup => FrameStateKind::BodySetup,
            FrameState::NativeExec => FrameStateKind::NativeExec,
            FrameState::InterpretedExec => FrameStateKind::InterpretedExec,
            FrameState::Teardown => FrameStateKind::Teardown,
        }
    }
}

/// The metadata chain a `MemberRef` resolved through, recorded once during resolution
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    /// The invoked member
    pub member: MemberRefRc,
    /// The type declaring the member
    pub type_ref: TypeRefRc,
    /// The assembly declaring the type
    pub assembly_ref: AssemblyRefRc,
}

/// One activation of a method on a thread
pub struct CallFrame {
    pub(crate) id: FrameId,
    pub(crate) calling_assembly: AssemblyRc,
    pub(crate) executing_assembly: Option<AssemblyRc>,
    pub(crate) method: Token,
    pub(crate) state: FrameState,
    pub(crate) body: Option<MethodBodyRc>,
    pub(crate) target: Option<ResolvedTarget>,
    pub(crate) signature: Option<SignatureMethod>,
    pub(crate) locals_signature: Option<SignatureLocalVariables>,
    pub(crate) ip: usize,
    pub(crate) arguments: Vec<Slot>,
    pub(crate) locals: Vec<Slot>,
    /// Operand stack depth when the frame was resolved, arguments included
    pub(crate) stack_base: usize,
    /// Values the frame took off the operand stack on activation
    pub(crate) consumed: usize,
    pub(crate) native_call: Option<Box<dyn NativeCall>>,
}

impl CallFrame {
    pub(crate) fn new(id: FrameId, calling_assembly: AssemblyRc, method: Token) -> Self {
        CallFrame {
            id,
            calling_assembly,
            executing_assembly: None,
            method,
            state: FrameState::Resolve,
            body: None,
            target: None,
            signature: None,
            locals_signature: None,
            ip: 0,
            arguments: Vec::new(),
            locals: Vec::new(),
            stack_base: 0,
            consumed: 0,
            native_call: None,
        }
    }

    /// The id of this frame
    #[must_use]
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// The invoked method token
    #[must_use]
    pub fn method(&self) -> Token {
        self.method
    }

    /// The current state
    #[must_use]
    pub fn state(&self) -> &FrameState {
        &self.state
    }

    /// The kind of the current state
    #[must_use]
    pub fn kind(&self) -> FrameStateKind {
        self.state.kind()
    }

    /// The assembly whose metadata the method token belongs to
    #[must_use]
    pub fn calling_assembly(&self) -> &AssemblyRc {
        &self.calling_assembly
    }

    /// The assembly implementing the method, once resolved
    #[must_use]
    pub fn executing_assembly(&self) -> Option<&AssemblyRc> {
        self.executing_assembly.as_ref()
    }

    /// The method body of interpreted frames
    #[must_use]
    pub fn body(&self) -> Option<&MethodBodyRc> {
        self.body.as_ref()
    }

    /// The CIL code of interpreted frames, empty otherwise
    #[must_use]
    pub fn code(&self) -> &[u8] {
        match &self.body {
            Some(body) => &body.code,
            None => &[],
        }
    }

    /// The resolution chain of `MemberRef` frames
    #[must_use]
    pub fn target(&self) -> Option<&ResolvedTarget> {
        self.target.as_ref()
    }

    /// The decoded method signature, once the frame is activated
    #[must_use]
    pub fn signature(&self) -> Option<&SignatureMethod> {
        self.signature.as_ref()
    }

    /// The decoded locals signature, if the body declares initialized locals
    #[must_use]
    pub fn locals_signature(&self) -> Option<&SignatureLocalVariables> {
        self.locals_signature.as_ref()
    }

    /// Offset of the next instruction in [`CallFrame::code`]
    #[must_use]
    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Moves the instruction pointer
    pub fn set_ip(&mut self, ip: usize) {
        self.ip = ip;
    }

    /// Operand stack depth at resolution, the frame's arguments included
    #[must_use]
    pub fn stack_base(&self) -> usize {
        self.stack_base
    }

    /// The argument slots
    #[must_use]
    pub fn arguments(&self) -> &[Slot] {
        &self.arguments
    }

    /// The local slots
    #[must_use]
    pub fn locals(&self) -> &[Slot] {
        &self.locals
    }

    /// Reads argument `index`.
    ///
    /// # Errors
    /// Returns an error if the index is out of range.
    pub fn argument(&self, index: usize, pool: &ValuePool) -> Result<RawValue> {
        self.read_slot(&self.arguments, "argument", index, pool)
    }

    /// Writes argument `index` (`starg`).
    ///
    /// # Errors
    /// Returns an error if the index is out of range or the value doesn't fit the slot.
    pub fn set_argument(&mut self, index: usize, value: RawValue, pool: &ValuePool) -> Result<()> {
        let id = self.id;
        Self::slot_mut(&mut self.arguments, id, "argument", index)?.write(pool, value)
    }

    /// Reads local `index`.
    ///
    /// # Errors
    /// Returns an error if the index is out of range or nothing was stored to it yet.
    pub fn local(&self, index: usize, pool: &ValuePool) -> Result<RawValue> {
        self.read_slot(&self.locals, "local", index, pool)
    }

    /// Writes local `index` (`stloc`).
    ///
    /// # Errors
    /// Returns an error if the index is out of range or the value doesn't fit the slot.
    pub fn set_local(&mut self, index: usize, value: RawValue, pool: &ValuePool) -> Result<()> {
        let id = self.id;
        Self::slot_mut(&mut self.locals, id, "local", index)?.write(pool, value)
    }

    fn read_slot(
        &self,
        slots: &[Slot],
        what: &'static str,
        index: usize,
        pool: &ValuePool,
    ) -> Result<RawValue> {
        let slot = slots.get(index).ok_or(EmulationError::SlotOutOfRange {
            frame: self.id,
            what,
            index,
            count: slots.len(),
        })?;

        slot.read(pool)?.ok_or_else(|| {
            EmulationError::UninitializedSlot {
                frame: self.id,
                what,
                index,
            }
            .into()
        })
    }

    fn slot_mut<'a>(
        slots: &'a mut [Slot],
        frame: FrameId,
        what: &'static str,
        index: usize,
    ) -> Result<&'a mut Slot> {
        let count = slots.len();
        slots.get_mut(index).ok_or_else(|| {
            EmulationError::SlotOutOfRange {
                frame,
                what,
                index,
                count,
            }
            .into()
        })
    }

    /// Gives every pooled argument and local back to the pool.
    ///
    /// The slots are drained out of the frame first, so a frame can't release anything
    /// twice. All slots are released even if one fails; the first failure is returned.
    pub(crate) fn release(&mut self, pool: &ValuePool) -> Result<usize> {
        let mut released = 0;
        let mut first_error = None;

        for slot in self.arguments.drain(..).chain(self.locals.drain(..)) {
            match slot.release(pool) {
                Ok(true) => released += 1,
                Ok(false) => {}
                Err(error) => {
                    first_error.get_or_insert(error);
                }
            }
        }
        self.native_call = None;

        match first_error {
            Some(error) => Err(error),
            None => Ok(released),
        }
    }
}

impl fmt::Debug for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallFrame")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("state", &self.state.kind())
            .field("calling_assembly", &self.calling_assembly.name())
            .field(
                "executing_assembly",
                &self.executing_assembly.as_ref().map(|a| a.name()),
            )
            .field("ip", &self.ip)
            .field("arguments", &self.arguments)
            .field("locals", &self.locals)
            .field("stack_base", &self.stack_base)
            .finish_non_exhaustive()
    }
}
