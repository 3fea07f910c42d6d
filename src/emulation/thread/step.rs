//! The per-thread step function and the frame transitions it drives.

use log::{debug, trace, warn};

use crate::{
    emulation::{
        engine::{EmulationError, ExecutionContext},
        memory::{StorageClass, ValuePool},
        runtime::{AssemblyResolution, NativeStatus},
        thread::{FrameState, FrameStateKind, ResolvedTarget, Thread},
        value::{PooledValue, RawValue, Slot},
    },
    metadata::{
        assembly::AssemblyRc,
        method::MethodBody,
        signatures::{SignatureDecoder, SignatureLocalVariables, SignatureMethod, TypeSignature},
        tables::TableId,
        token::TokenKind,
    },
    Result,
};

/// Whether the step loop may run another transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    /// Progress was made, keep going
    Continue,
    /// The frame is suspended, give control back to the scheduler
    Yield,
}

impl Thread {
    /// Runs transitions of the executing frame until the thread suspends or runs out of
    /// frames.
    ///
    /// Returns `true` while the thread still has frames, i.e. when it yielded and wants to
    /// be stepped again, and `false` once its work is complete.
    ///
    /// # Errors
    /// Every failure is fatal for the thread. The failing frame keeps the state it was in,
    /// and values owned by the frames are not released; see [`Thread::abandon`].
    pub fn step(&mut self, context: &ExecutionContext) -> Result<bool> {
        let limit = context.config().limits.max_transitions_per_step;
        let mut transitions = 0usize;

        while !self.frames.is_empty() {
            if limit != 0 && transitions >= limit {
                trace!("{} yields after {} transitions", self.id(), transitions);
                break;
            }
            transitions += 1;

            if self.transition(context)? == Tick::Yield {
                break;
            }
        }

        Ok(!self.frames.is_empty())
    }

    /// Runs exactly one transition of the executing frame
    pub(crate) fn transition(&mut self, context: &ExecutionContext) -> Result<Tick> {
        let frame = self.top_frame_mut()?;
        let kind = frame.kind();
        trace!("frame {} {} in {}", frame.id, frame.method, kind);

        match kind {
            FrameStateKind::Resolve => self.resolve(context),
            FrameStateKind::AwaitAssembly => self.await_assembly(context),
            FrameStateKind::AssemblyResolved => self.bind_native(context),
            FrameStateKind::BodySetup => self.setup_body(context),
            FrameStateKind::NativeExec => self.poll_native(),
            FrameStateKind::InterpretedExec => {
                if context.executor().execute(self, context)? {
                    Ok(Tick::Continue)
                } else {
                    Ok(Tick::Yield)
                }
            }
            FrameStateKind::Teardown => self.teardown(context.pool()),
        }
    }

    /// Decodes the method token and finds the assembly implementing it
    fn resolve(&mut self, context: &ExecutionContext) -> Result<Tick> {
        let depth = self.frames.len();
        let limit = context.config().limits.max_call_depth;
        if limit != 0 && depth > limit {
            return Err(EmulationError::CallDepthExceeded { depth, limit }.into());
        }

        let stack_base = self.operand_stack.len();
        let thread = self.id();
        let frame = self.top_frame_mut()?;
        let token = frame.method;
        let calling = frame.calling_assembly.clone();

        match token.kind() {
            TokenKind::MethodDef(_) => {
                let body = calling.method_body(token)?;

                debug!(
                    "{} frame {} resolved {} to a body in '{}'",
                    thread,
                    frame.id,
                    token,
                    calling.name()
                );

                frame.executing_assembly = Some(calling);
                frame.body = Some(body);
                frame.stack_base = stack_base;
                frame.state = FrameState::BodySetup;
                Ok(Tick::Continue)
            }
            TokenKind::MemberRef(row) => {
                let tables = calling.tables();
                let member = tables
                    .member_ref(row)
                    .ok_or(EmulationError::MissingMetadataRow { token })?;

                if member.class.tag != TableId::TypeRef {
                    return Err(EmulationError::UnsupportedClassReference {
                        token,
                        class: member.class.token,
                        frame: frame.id,
                    }
                    .into());
                }

                let type_ref = tables.type_ref(member.class.row).ok_or(
                    EmulationError::MissingMetadataRow {
                        token: member.class.token,
                    },
                )?;

                let scope = type_ref.resolution_scope;
                if scope.tag != TableId::AssemblyRef {
                    return Err(EmulationError::UnsupportedResolutionScope {
                        token,
                        type_ref: type_ref.token,
                        scope: scope.token,
                        frame: frame.id,
                    }
                    .into());
                }

                let assembly_ref = tables
                    .assembly_ref(scope.row)
                    .ok_or(EmulationError::MissingMetadataRow { token: scope.token })?;

                let resolution = context.domain().resolve(&assembly_ref.name)?;

                debug!(
                    "{} frame {} resolved {} to {}::{} in '{}'",
                    thread,
                    frame.id,
                    token,
                    type_ref.fullname(),
                    member.name,
                    assembly_ref.name
                );

                frame.target = Some(ResolvedTarget {
                    member,
                    type_ref,
                    assembly_ref,
                });
                frame.stack_base = stack_base;
                frame.state = match resolution {
                    AssemblyResolution::Loaded(assembly) => {
                        frame.executing_assembly = Some(assembly);
                        FrameState::AssemblyResolved
                    }
                    AssemblyResolution::Pending(ticket) => FrameState::AwaitAssembly(ticket),
                };
                Ok(Tick::Continue)
            }
            TokenKind::TypeRef(_) | TokenKind::AssemblyRef(_) | TokenKind::Unsupported { .. } => {
                Err(EmulationError::UnsupportedTokenTable {
                    token,
                    table: token.table(),
                    frame: frame.id,
                }
                .into())
            }
        }
    }

    /// Polls the load ticket of a frame waiting for its assembly
    fn await_assembly(&mut self, context: &ExecutionContext) -> Result<Tick> {
        let thread = self.id();
        let frame = self.top_frame_mut()?;
        let FrameState::AwaitAssembly(ticket) = &frame.state else {
            return Err(EmulationError::InvalidFrameState {
                frame: frame.id,
                expected: FrameStateKind::AwaitAssembly,
                actual: frame.kind(),
            }
            .into());
        };

        match context.domain().finish_load(ticket)? {
            None => Ok(Tick::Yield),
            Some(assembly) => {
                debug!(
                    "{} frame {} resumes, assembly '{}' is loaded",
                    thread,
                    frame.id,
                    assembly.name()
                );

                frame.executing_assembly = Some(assembly);
                frame.state = FrameState::AssemblyResolved;
                Ok(Tick::Continue)
            }
        }
    }

    /// Builds the native call of a resolved `MemberRef`
    fn bind_native(&mut self, context: &ExecutionContext) -> Result<Tick> {
        let frame = self.top_frame_mut()?;
        let executing = frame
            .executing_assembly
            .clone()
            .ok_or(EmulationError::IncompleteFrame {
                frame: frame.id,
                missing: "executing assembly",
            })?;
        let target = frame.target.as_ref().ok_or(EmulationError::IncompleteFrame {
            frame: frame.id,
            missing: "resolved member",
        })?;

        let Some(bridge) = executing.native_bridge() else {
            return Err(EmulationError::UnresolvedNativeDispatch {
                token: frame.method,
                assembly: executing.name().to_string(),
                frame: frame.id,
            }
            .into());
        };

        let signature = context.decoder().decode_method(&target.member.signature)?;
        let call = bridge.create_call(&target.type_ref, &target.member, &signature)?;

        frame.consumed = signature.argument_count();
        frame.signature = Some(signature);
        frame.native_call = Some(call);
        frame.state = FrameState::NativeExec;
        Ok(Tick::Continue)
    }

    /// Polls the native call once
    fn poll_native(&mut self) -> Result<Tick> {
        let index = self
            .frames
            .len()
            .checked_sub(1)
            .ok_or(EmulationError::EmptyCallStack)?;
        let frame = &mut self.frames[index];
        let mut call = frame
            .native_call
            .take()
            .ok_or(EmulationError::IncompleteFrame {
                frame: frame.id,
                missing: "native call",
            })?;

        let status = call.poll(self);

        let frame = self
            .frames
            .get_mut(index)
            .ok_or(EmulationError::EmptyCallStack)?;
        frame.native_call = Some(call);

        match status? {
            NativeStatus::Pending => Ok(Tick::Yield),
            NativeStatus::Complete => {
                frame.state = FrameState::Teardown;
                Ok(Tick::Continue)
            }
        }
    }

    /// Moves the arguments off the operand stack into slots and creates the locals
    fn setup_body(&mut self, context: &ExecutionContext) -> Result<Tick> {
        let thread = self.id();
        let frame = self.top_frame_mut()?;
        let id = frame.id;
        let body = frame.body.clone().ok_or(EmulationError::IncompleteFrame {
            frame: id,
            missing: "method body",
        })?;
        let executing = frame
            .executing_assembly
            .clone()
            .ok_or(EmulationError::IncompleteFrame {
                frame: id,
                missing: "executing assembly",
            })?;

        // Everything is decoded before the operand stack or the pool is touched
        let decoder = context.decoder();
        let signature = decoder.decode_method(&body.signature)?;
        let locals_signature = if !body.has_locals() {
            None
        } else if body.init_locals() {
            Some(decode_locals(&executing, &body, decoder)?)
        } else {
            // Placeholders only; a body that doesn't ask for initialized locals runs
            // without them when the signature can't be read
            match decode_locals(&executing, &body, decoder) {
                Ok(locals) => Some(locals),
                Err(error) => {
                    debug!(
                        "{} frame {} runs without locals, {} unreadable: {}",
                        thread, id, body.local_var_sig_token, error
                    );
                    None
                }
            }
        };

        let argument_count = signature.argument_count();
        let available = self.operand_stack.len();
        let start = available.checked_sub(argument_count).ok_or(
            EmulationError::OperandStackUnderflow {
                needed: argument_count,
                available,
            },
        )?;

        let pool = context.pool();
        let arguments = materialize_arguments(&signature, &self.operand_stack[start..], pool)?;
        let locals = match &locals_signature {
            Some(locals) => match materialize_locals(locals, body.init_locals(), pool) {
                Ok(slots) => slots,
                Err(error) => {
                    release_all(arguments, pool);
                    return Err(error);
                }
            },
            None => Vec::new(),
        };

        self.operand_stack.truncate(start);

        let frame = self.top_frame_mut()?;
        debug!(
            "{} frame {} activated with {} arguments, {} locals",
            thread,
            id,
            arguments.len(),
            locals.len()
        );

        frame.arguments = arguments;
        frame.locals = locals;
        frame.consumed = argument_count;
        frame.signature = Some(signature);
        frame.locals_signature = locals_signature;
        frame.ip = 0;
        frame.state = FrameState::InterpretedExec;
        Ok(Tick::Continue)
    }

    /// Releases the frame's values and pops it
    fn teardown(&mut self, pool: &ValuePool) -> Result<Tick> {
        let frame = self.top_frame_mut()?;
        let released = frame.release(pool)?;
        let floor = frame.stack_base.saturating_sub(frame.consumed);
        let id = frame.id;
        let method = frame.method;
        self.frames.pop();

        if self.operand_stack.len() < floor {
            warn!(
                "{} frame {} ({}) left the operand stack at depth {}, below its entry depth {}",
                self.id(),
                id,
                method,
                self.operand_stack.len(),
                floor
            );
        }

        debug!(
            "{} frame {} ({}) torn down, released {} values, depth {}",
            self.id(),
            id,
            method,
            released,
            self.frames.len()
        );
        Ok(Tick::Continue)
    }
}

/// Resolves the `StandAloneSig` row of a body's locals and decodes it
fn decode_locals(
    assembly: &AssemblyRc,
    body: &MethodBody,
    decoder: &dyn SignatureDecoder,
) -> Result<SignatureLocalVariables> {
    let token = body.local_var_sig_token;
    if token.table() != TableId::StandAloneSig.tag() {
        return Err(EmulationError::MissingMetadataRow { token }.into());
    }
    let row = assembly
        .tables()
        .standalone_sig(token.row())
        .ok_or(EmulationError::MissingMetadataRow { token })?;
    decoder.decode_locals(&row.signature)
}

/// Copies arguments into slots: statically sized ones into pool storage, everything else
/// inline. For instance methods argument 0 is the receiver, which stays inline.
fn materialize_arguments(
    signature: &SignatureMethod,
    values: &[RawValue],
    pool: &ValuePool,
) -> Result<Vec<Slot>> {
    let mut slots = Vec::with_capacity(values.len());

    for (index, value) in values.iter().enumerate() {
        let sized = signature
            .argument(index)
            .filter(|param| param.static_size().is_some());

        let slot = match sized {
            Some(param) => pooled(&param.base, *value, StorageClass::Argument, pool),
            None => Ok(Slot::Inline(*value)),
        };

        match slot {
            Ok(slot) => slots.push(slot),
            Err(error) => {
                release_all(slots, pool);
                return Err(error);
            }
        }
    }

    Ok(slots)
}

/// Creates the local slots: zeroed pool storage for statically sized locals when the body
/// asks for initialized locals, placeholders otherwise.
fn materialize_locals(
    signature: &SignatureLocalVariables,
    init_locals: bool,
    pool: &ValuePool,
) -> Result<Vec<Slot>> {
    let mut slots = Vec::with_capacity(signature.locals.len());

    for local in &signature.locals {
        if !init_locals || local.static_size().is_none() {
            slots.push(Slot::Pending(local.base.clone()));
            continue;
        }

        match pool.allocate(&local.base, StorageClass::Local) {
            Ok(handle) => slots.push(Slot::Pooled(PooledValue::new(handle, local.base.clone()))),
            Err(error) => {
                release_all(slots, pool);
                return Err(error);
            }
        }
    }

    Ok(slots)
}

fn pooled(
    signature: &TypeSignature,
    value: RawValue,
    class: StorageClass,
    pool: &ValuePool,
) -> Result<Slot> {
    let handle = pool.allocate(signature, class)?;
    if let Err(error) = pool.store(handle, value) {
        pool.free(handle)?;
        return Err(error);
    }
    Ok(Slot::Pooled(PooledValue::new(handle, signature.clone())))
}

/// Rolls back a partially built slot list
fn release_all(slots: Vec<Slot>, pool: &ValuePool) {
    for slot in slots {
        if let Err(error) = slot.release(pool) {
            warn!("Rolling back slot failed: {}", error);
        }
    }
}
