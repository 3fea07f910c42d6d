//! Factories and doubles shared by the unit tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use crate::{
    emulation::{
        AppDomain, AssemblyLoader, EmulationError, ExecutionConfig, ExecutionContext,
        InstructionExecutor, LoadTicket, NativeBridge, NativeCall, NativeLibrary, NativeStatus,
        RawValue, Thread,
    },
    metadata::{
        assembly::{Assembly, AssemblyRc},
        method::MethodBodyFlags,
        signatures::{SignatureMethod, ELEMENT_TYPE},
        tables::{CodedIndex, MemberRefRaw, TableId, TypeRefRaw},
        token::Token,
    },
    Result,
};

/// Opcodes understood by [`ScriptedExecutor`]; a subset of CIL plus `YIELD`
pub mod op {
    pub const NOP: u8 = 0x00;
    /// Advances and asks the step function to yield
    pub const YIELD: u8 = 0x01;
    pub const LDARG_0: u8 = 0x02;
    pub const LDARG_3: u8 = 0x05;
    pub const LDLOC_0: u8 = 0x06;
    pub const LDLOC_3: u8 = 0x09;
    pub const STLOC_0: u8 = 0x0A;
    pub const STLOC_3: u8 = 0x0D;
    pub const LDC_I4_0: u8 = 0x16;
    pub const LDC_I4_8: u8 = 0x1E;
    pub const CALL: u8 = 0x28;
    pub const RET: u8 = 0x2A;
    pub const ADD: u8 = 0x58;
}

/// `MemberRef` token of the first row
pub const MEMBER_REF_1: Token = Token(0x0A00_0001);
/// `MethodDef` token of the first row
pub const METHOD_DEF_1: Token = Token(0x0600_0001);

// Helper function to create a MethodDefSig blob with single-byte parameter types
pub fn method_sig(has_this: bool, ret: u8, params: &[u8]) -> Vec<u8> {
    let mut blob = vec![if has_this { 0x20 } else { 0x00 }, params.len() as u8, ret];
    blob.extend_from_slice(params);
    blob
}

// Helper function to create a LocalVarSig blob with single-byte local types
pub fn locals_sig(locals: &[u8]) -> Vec<u8> {
    let mut blob = vec![0x07, locals.len() as u8];
    blob.extend_from_slice(locals);
    blob
}

// Helper function to create a call instruction
pub fn call(token: Token) -> Vec<u8> {
    let mut code = vec![op::CALL];
    code.extend_from_slice(&token.value().to_le_bytes());
    code
}

// Helper function to create "App" with `static int32 Add(int32, int32)` as its first method
pub fn create_add_assembly() -> AssemblyRc {
    Assembly::builder("App")
        .method_def(
            method_sig(false, ELEMENT_TYPE::I4, &[ELEMENT_TYPE::I4, ELEMENT_TYPE::I4]),
            MethodBodyFlags::empty(),
            Token::new(0),
            vec![op::LDARG_0, op::LDARG_0 + 1, op::ADD, op::RET],
        )
        .build()
}

// Helper function to create "App" whose `MemberRef` 1 is `System.Math::Max(int32, int32)`
// in `target`, called by `static int32 Main()` pushing 3 and 8
pub fn create_caller_assembly(target: &str) -> AssemblyRc {
    let mut code = vec![op::LDC_I4_0 + 3, op::LDC_I4_8];
    code.extend(call(MEMBER_REF_1));
    code.push(op::RET);

    Assembly::builder("App")
        .assembly_ref(target)
        .type_ref(CodedIndex::new(TableId::AssemblyRef, 1), "System", "Math")
        .member_ref(
            CodedIndex::new(TableId::TypeRef, 1),
            "Max",
            method_sig(false, ELEMENT_TYPE::I4, &[ELEMENT_TYPE::I4, ELEMENT_TYPE::I4]),
        )
        .method_def(
            method_sig(false, ELEMENT_TYPE::I4, &[]),
            MethodBodyFlags::empty(),
            Token::new(0),
            code,
        )
        .build()
}

// Helper function to create a native assembly implementing `System.Math::Max`
pub fn create_math_runtime(name: &str) -> AssemblyRc {
    let library = NativeLibrary::new().with_function("System.Math", "Max", |args| {
        match (args[0], args[1]) {
            (RawValue::I32(a), RawValue::I32(b)) => Ok(Some(RawValue::I32(a.max(b)))),
            _ => Err(malformed_error!("Max expects two int32 values")),
        }
    });

    Assembly::builder(name)
        .native_bridge(Arc::new(library))
        .build()
}

// Helper function to create an execution context around a scripted executor
pub fn create_context(domain: Arc<AppDomain>) -> (ExecutionContext, Arc<ScriptedExecutor>) {
    let executor = Arc::new(ScriptedExecutor::default());
    let context = ExecutionContext::new(domain, executor.clone());
    (context, executor)
}

// Helper function to create an execution context with a custom configuration
pub fn create_context_with(
    domain: Arc<AppDomain>,
    config: ExecutionConfig,
) -> (ExecutionContext, Arc<ScriptedExecutor>) {
    let (context, executor) = create_context(domain);
    (context.with_config(config), executor)
}

/// Executes one instruction of the `op` subset per call
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    executed: AtomicUsize,
}

impl ScriptedExecutor {
    /// Number of instructions executed so far
    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }
}

impl InstructionExecutor for ScriptedExecutor {
    fn execute(&self, thread: &mut Thread, context: &ExecutionContext) -> Result<bool> {
        let pool = context.pool();
        let frame = thread.top_mut().ok_or(EmulationError::EmptyCallStack)?;
        let ip = frame.ip();
        let opcode = *frame
            .code()
            .get(ip)
            .ok_or_else(|| malformed_error!("{} ran past its code", frame.method()))?;
        self.executed.fetch_add(1, Ordering::SeqCst);

        match opcode {
            op::NOP => frame.set_ip(ip + 1),
            op::YIELD => {
                frame.set_ip(ip + 1);
                return Ok(false);
            }
            op::LDARG_0..=op::LDARG_3 => {
                let value = frame.argument(usize::from(opcode - op::LDARG_0), pool)?;
                frame.set_ip(ip + 1);
                thread.push(value);
            }
            op::LDLOC_0..=op::LDLOC_3 => {
                let value = frame.local(usize::from(opcode - op::LDLOC_0), pool)?;
                frame.set_ip(ip + 1);
                thread.push(value);
            }
            op::STLOC_0..=op::STLOC_3 => {
                frame.set_ip(ip + 1);
                let value = thread.pop().ok_or(EmulationError::OperandStackUnderflow {
                    needed: 1,
                    available: 0,
                })?;
                let frame = thread.top_mut().ok_or(EmulationError::EmptyCallStack)?;
                frame.set_local(usize::from(opcode - op::STLOC_0), value, pool)?;
            }
            op::LDC_I4_0..=op::LDC_I4_8 => {
                frame.set_ip(ip + 1);
                thread.push(RawValue::I32(i32::from(opcode - op::LDC_I4_0)));
            }
            op::ADD => {
                frame.set_ip(ip + 1);
                let operands = thread.pop_values(2)?;
                let sum = match (operands[0], operands[1]) {
                    (RawValue::I32(a), RawValue::I32(b)) => RawValue::I32(a.wrapping_add(b)),
                    (RawValue::I64(a), RawValue::I64(b)) => RawValue::I64(a.wrapping_add(b)),
                    (a, b) => return Err(malformed_error!("add {:?} {:?}", a, b)),
                };
                thread.push(sum);
            }
            op::CALL => {
                let operand = frame
                    .code()
                    .get(ip + 1..ip + 5)
                    .ok_or_else(|| malformed_error!("truncated call"))?;
                let token = Token::new(u32::from_le_bytes([
                    operand[0], operand[1], operand[2], operand[3],
                ]));
                let assembly = frame
                    .executing_assembly()
                    .cloned()
                    .ok_or_else(|| malformed_error!("call from unresolved frame"))?;
                frame.set_ip(ip + 5);
                thread.call(assembly, token);
            }
            op::RET => {
                frame.set_ip(ip + 1);
                thread.return_from_frame()?;
            }
            other => return Err(malformed_error!("unknown opcode {:#x}", other)),
        }

        Ok(true)
    }
}

/// Parks every load request until the test settles it
#[derive(Debug, Default)]
pub struct DeferredLoader {
    requests: Mutex<Vec<(String, LoadTicket)>>,
}

impl DeferredLoader {
    /// Number of load requests received
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The names that were requested, in order
    pub fn requested(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Completes every outstanding ticket with `assembly`
    pub fn complete_all(&self, assembly: AssemblyRc) {
        for (_, ticket) in self.requests.lock().unwrap().iter() {
            ticket.complete(assembly.clone());
        }
    }

    /// Fails every outstanding ticket
    pub fn fail_all(&self, reason: &str) {
        for (_, ticket) in self.requests.lock().unwrap().iter() {
            ticket.fail(reason);
        }
    }
}

impl AssemblyLoader for DeferredLoader {
    fn load(&self, name: &str, ticket: LoadTicket) {
        self.requests.lock().unwrap().push((name.to_string(), ticket));
    }
}

/// Native bridge whose calls stay pending for a fixed number of polls
#[derive(Debug)]
pub struct CountingBridge {
    pending_polls: usize,
    result: Option<RawValue>,
    created: AtomicUsize,
    polls: Arc<AtomicUsize>,
}

impl CountingBridge {
    /// Calls report `Pending` `pending_polls` times, then pop their arguments and push `result`
    pub fn new(pending_polls: usize, result: Option<RawValue>) -> Self {
        CountingBridge {
            pending_polls,
            result,
            created: AtomicUsize::new(0),
            polls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of calls created
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Number of polls over all calls
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

impl NativeBridge for CountingBridge {
    fn create_call(
        &self,
        _type_ref: &TypeRefRaw,
        _member: &MemberRefRaw,
        signature: &SignatureMethod,
    ) -> Result<Box<dyn NativeCall>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingCall {
            remaining: self.pending_polls,
            result: self.result,
            argument_count: signature.argument_count(),
            polls: self.polls.clone(),
        }))
    }
}

struct CountingCall {
    remaining: usize,
    result: Option<RawValue>,
    argument_count: usize,
    polls: Arc<AtomicUsize>,
}

impl NativeCall for CountingCall {
    fn poll(&mut self, thread: &mut Thread) -> Result<NativeStatus> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if self.remaining > 0 {
            self.remaining -= 1;
            return Ok(NativeStatus::Pending);
        }

        thread.pop_values(self.argument_count)?;
        if let Some(value) = self.result {
            thread.push(value);
        }
        Ok(NativeStatus::Complete)
    }
}
