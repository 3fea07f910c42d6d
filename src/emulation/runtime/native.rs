//! Bridge to methods implemented by the host.
//!
//! A `MemberRef` that resolves into an assembly carrying a [`NativeBridge`] is not
//! interpreted. The bridge builds one [`NativeCall`] per frame, which the step function
//! polls once per tick until it reports [`NativeStatus::Complete`]. Native calls work on
//! the operand stack directly: they pop their arguments and push their result.

use std::{fmt, sync::Arc};

use dashmap::DashMap;
use log::trace;

use crate::{
    emulation::{engine::EmulationError, thread::Thread, value::RawValue},
    metadata::{
        signatures::SignatureMethod,
        tables::{MemberRefRaw, TypeRefRaw},
    },
    Result,
};

/// Progress of a native call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeStatus {
    /// The call is waiting on something; poll again on the next tick
    Pending,
    /// The call finished and its result, if any, is on the operand stack
    Complete,
}

/// One in-flight invocation of a host method
pub trait NativeCall: Send {
    /// Advances the call.
    ///
    /// # Errors
    /// Any error aborts the step of the owning thread.
    fn poll(&mut self, thread: &mut Thread) -> Result<NativeStatus>;
}

/// Host implementation of the members of an assembly
pub trait NativeBridge: Send + Sync {
    /// Builds the call for a resolved member reference.
    ///
    /// ## Arguments
    /// * `type_ref`    - The type the member belongs to
    /// * `member`      - The referenced member
    /// * `signature`   - The decoded signature of the member
    ///
    /// # Errors
    /// Returns an error if the bridge doesn't implement the member.
    fn create_call(
        &self,
        type_ref: &TypeRefRaw,
        member: &MemberRefRaw,
        signature: &SignatureMethod,
    ) -> Result<Box<dyn NativeCall>>;
}

/// A host function: receives the arguments in declaration order and returns the result of
/// non-void methods.
pub type NativeFunction = Arc<dyn Fn(&[RawValue]) -> Result<Option<RawValue>> + Send + Sync>;

/// Builds custom [`NativeCall`]s, for methods that need more than one tick
pub type NativeCallFactory =
    Arc<dyn Fn(&SignatureMethod) -> Result<Box<dyn NativeCall>> + Send + Sync>;

#[derive(Clone)]
enum NativeEntry {
    Function(NativeFunction),
    Factory(NativeCallFactory),
}

/// A [`NativeBridge`] dispatching on `Namespace.Type::Member`.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use dotframe::prelude::*;
///
/// let library = NativeLibrary::new().with_function("System.Math", "Max", |args| {
///     match (args[0], args[1]) {
///         (RawValue::I32(a), RawValue::I32(b)) => Ok(Some(RawValue::I32(a.max(b)))),
///         _ => Ok(None),
///     }
/// });
///
/// assert!(library.contains("System.Math", "Max"));
/// let runtime = Assembly::builder("System.Runtime")
///     .native_bridge(Arc::new(library))
///     .build();
/// ```
#[derive(Default)]
pub struct NativeLibrary {
    entries: DashMap<String, NativeEntry>,
}

impl NativeLibrary {
    /// Creates an empty library
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a single-tick function, builder style
    #[must_use]
    pub fn with_function<F>(self, type_name: &str, member: &str, function: F) -> Self
    where
        F: Fn(&[RawValue]) -> Result<Option<RawValue>> + Send + Sync + 'static,
    {
        self.register_function(type_name, member, function);
        self
    }

    /// Adds a custom call factory, builder style
    #[must_use]
    pub fn with_factory<F>(self, type_name: &str, member: &str, factory: F) -> Self
    where
        F: Fn(&SignatureMethod) -> Result<Box<dyn NativeCall>> + Send + Sync + 'static,
    {
        self.register_factory(type_name, member, factory);
        self
    }

    /// Adds a single-tick function
    pub fn register_function<F>(&self, type_name: &str, member: &str, function: F)
    where
        F: Fn(&[RawValue]) -> Result<Option<RawValue>> + Send + Sync + 'static,
    {
        self.entries.insert(
            Self::key(type_name, member),
            NativeEntry::Function(Arc::new(function)),
        );
    }

    /// Adds a custom call factory
    pub fn register_factory<F>(&self, type_name: &str, member: &str, factory: F)
    where
        F: Fn(&SignatureMethod) -> Result<Box<dyn NativeCall>> + Send + Sync + 'static,
    {
        self.entries.insert(
            Self::key(type_name, member),
            NativeEntry::Factory(Arc::new(factory)),
        );
    }

    /// Returns true if the library implements `type_name::member`
    #[must_use]
    pub fn contains(&self, type_name: &str, member: &str) -> bool {
        self.entries.contains_key(&Self::key(type_name, member))
    }

    /// Number of implemented members
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is implemented
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key(type_name: &str, member: &str) -> String {
        format!("{type_name}::{member}")
    }
}

impl NativeBridge for NativeLibrary {
    fn create_call(
        &self,
        type_ref: &TypeRefRaw,
        member: &MemberRefRaw,
        signature: &SignatureMethod,
    ) -> Result<Box<dyn NativeCall>> {
        let key = Self::key(&type_ref.fullname(), &member.name);
        let entry = self
            .entries
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or(EmulationError::NativeMethodNotFound { method: key })?;

        match entry {
            NativeEntry::Function(function) => Ok(Box::new(FunctionCall {
                function,
                argument_count: signature.argument_count(),
            })),
            NativeEntry::Factory(factory) => factory(signature),
        }
    }
}

impl fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut members: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        members.sort();
        f.debug_struct("NativeLibrary")
            .field("members", &members)
            .finish()
    }
}

/// Calls a [`NativeFunction`] and completes in one tick
struct FunctionCall {
    function: NativeFunction,
    argument_count: usize,
}

impl NativeCall for FunctionCall {
    fn poll(&mut self, thread: &mut Thread) -> Result<NativeStatus> {
        let arguments = thread.pop_values(self.argument_count)?;
        let result = (self.function)(&arguments)?;

        trace!(
            "{} native call consumed {} values, returned {:?}",
            thread.id(),
            arguments.len(),
            result
        );

        if let Some(value) = result {
            thread.push(value);
        }
        Ok(NativeStatus::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        emulation::thread::ThreadId,
        metadata::{
            signatures::parse_method_signature,
            tables::{CodedIndex, TableId},
            token::Token,
        },
        Error,
    };

    fn math_refs(member: &str) -> (TypeRefRaw, MemberRefRaw) {
        let type_ref = TypeRefRaw {
            rid: 1,
            token: Token::new(0x0100_0001),
            resolution_scope: CodedIndex::new(TableId::AssemblyRef, 1),
            namespace: "System".to_string(),
            name: "Math".to_string(),
        };
        let member = MemberRefRaw {
            rid: 1,
            token: Token::new(0x0A00_0001),
            class: CodedIndex::new(TableId::TypeRef, 1),
            name: member.to_string(),
            signature: vec![0x00, 0x02, 0x08, 0x08, 0x08],
        };
        (type_ref, member)
    }

    #[test]
    fn test_function_call_pops_arguments_and_pushes_result() {
        let library = NativeLibrary::new().with_function("System.Math", "Max", |args| {
            assert_eq!(args, &[RawValue::I32(3), RawValue::I32(9)]);
            Ok(Some(RawValue::I32(9)))
        });
        let (type_ref, member) = math_refs("Max");
        let signature = parse_method_signature(&member.signature).unwrap();

        let mut call = library.create_call(&type_ref, &member, &signature).unwrap();
        let mut thread = Thread::new(ThreadId::MAIN);
        thread.push(RawValue::I64(1));
        thread.push(RawValue::I32(3));
        thread.push(RawValue::I32(9));

        assert_eq!(call.poll(&mut thread).unwrap(), NativeStatus::Complete);
        assert_eq!(
            thread.operand_stack(),
            &[RawValue::I64(1), RawValue::I32(9)]
        );
    }

    #[test]
    fn test_unknown_member() {
        let library = NativeLibrary::new();
        assert!(library.is_empty());
        let (type_ref, member) = math_refs("Min");
        let signature = parse_method_signature(&member.signature).unwrap();

        let err = library
            .create_call(&type_ref, &member, &signature)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::Emulation(EmulationError::NativeMethodNotFound { ref method })
                if method == "System.Math::Min"
        ));
    }

    #[test]
    fn test_factory_entries() {
        struct Never;
        impl NativeCall for Never {
            fn poll(&mut self, _thread: &mut Thread) -> Result<NativeStatus> {
                Ok(NativeStatus::Pending)
            }
        }

        let library = NativeLibrary::new()
            .with_factory("System.Math", "Abs", |_| Ok(Box::new(Never) as Box<dyn NativeCall>));
        assert_eq!(library.len(), 1);

        let (type_ref, member) = math_refs("Abs");
        let signature = parse_method_signature(&member.signature).unwrap();
        let mut call = library.create_call(&type_ref, &member, &signature).unwrap();

        let mut thread = Thread::new(ThreadId::MAIN);
        assert_eq!(call.poll(&mut thread).unwrap(), NativeStatus::Pending);
    }
}
