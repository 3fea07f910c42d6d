//! Loaded assemblies.
//!
//! An [`Assembly`] is the unit the call-frame state machine resolves methods against: it
//! owns the metadata rows reachable from a method token, the method bodies keyed by their
//! `MethodDef` token and, for assemblies implemented by the host, a
//! [`crate::emulation::NativeBridge`].
//!
//! # Example
//!
//! ```rust
//! use dotframe::metadata::{
//!     assembly::Assembly,
//!     method::MethodBodyFlags,
//!     tables::{CodedIndex, TableId},
//!     token::Token,
//! };
//!
//! let assembly = Assembly::builder("App")
//!     .assembly_ref("mscorlib")
//!     .type_ref(CodedIndex::new(TableId::AssemblyRef, 1), "System", "Console")
//!     .member_ref(CodedIndex::new(TableId::TypeRef, 1), "WriteLine", vec![0x00, 0x01, 0x01, 0x08])
//!     .method_def(vec![0x00, 0x00, 0x01], MethodBodyFlags::empty(), Token::new(0), vec![0x2A])
//!     .build();
//!
//! assert!(assembly.method_body(Token::new(0x0600_0001)).is_ok());
//! assert!(assembly.tables().member_ref(1).is_some());
//! ```

use std::{fmt, sync::Arc};

use crossbeam_skiplist::SkipMap;

use crate::{
    emulation::{EmulationError, NativeBridge},
    metadata::{
        method::{MethodBody, MethodBodyFlags, MethodBodyRc},
        tables::{CodedIndex, MetadataTables, TableId},
        token::Token,
    },
    Result,
};

/// A reference-counted `Assembly`
pub type AssemblyRc = Arc<Assembly>;

/// An assembly known to an [`crate::emulation::AppDomain`]
pub struct Assembly {
    /// Simple name of the assembly
    name: String,
    /// The metadata rows the resolver walks
    tables: MetadataTables,
    /// Method bodies by `MethodDef` token
    methods: SkipMap<Token, MethodBodyRc>,
    /// Host implementation of this assembly's members, if any
    native: Option<Arc<dyn NativeBridge>>,
}

impl Assembly {
    /// Starts building an assembly with the given simple name
    #[must_use]
    pub fn builder(name: impl Into<String>) -> AssemblyBuilder {
        AssemblyBuilder::new(name)
    }

    /// The simple name of this assembly
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The metadata tables of this assembly
    #[must_use]
    pub fn tables(&self) -> &MetadataTables {
        &self.tables
    }

    /// All method bodies, ordered by token
    #[must_use]
    pub fn methods(&self) -> &SkipMap<Token, MethodBodyRc> {
        &self.methods
    }

    /// Looks up the body of a `MethodDef`.
    ///
    /// # Errors
    /// Returns [`EmulationError::MissingMethodBody`] if no body exists for `token`.
    pub fn method_body(&self, token: Token) -> Result<MethodBodyRc> {
        self.methods
            .get(&token)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EmulationError::MissingMethodBody { token }.into())
    }

    /// The native bridge implementing this assembly's members, if any
    #[must_use]
    pub fn native_bridge(&self) -> Option<&Arc<dyn NativeBridge>> {
        self.native.as_ref()
    }
}

impl fmt::Debug for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assembly")
            .field("name", &self.name)
            .field("methods", &self.methods.len())
            .field("native", &self.native.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Assembly`].
///
/// Rows of every table are numbered in insertion order, starting at 1.
pub struct AssemblyBuilder {
    name: String,
    tables: MetadataTables,
    methods: Vec<MethodBody>,
    native: Option<Arc<dyn NativeBridge>>,
}

impl AssemblyBuilder {
    /// Creates an empty builder
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        AssemblyBuilder {
            name: name.into(),
            tables: MetadataTables::new(),
            methods: Vec::new(),
            native: None,
        }
    }

    /// Replaces the metadata tables
    #[must_use]
    pub fn tables(mut self, tables: MetadataTables) -> Self {
        self.tables = tables;
        self
    }

    /// Appends an `AssemblyRef` row
    #[must_use]
    pub fn assembly_ref(mut self, name: impl Into<String>) -> Self {
        self.tables.push_assembly_ref(name);
        self
    }

    /// Appends a `TypeRef` row
    #[must_use]
    pub fn type_ref(
        mut self,
        resolution_scope: CodedIndex,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.tables
            .push_type_ref(resolution_scope, namespace, name);
        self
    }

    /// Appends a `MemberRef` row
    #[must_use]
    pub fn member_ref(
        mut self,
        class: CodedIndex,
        name: impl Into<String>,
        signature: Vec<u8>,
    ) -> Self {
        self.tables.push_member_ref(class, name, signature);
        self
    }

    /// Appends a `StandAloneSig` row
    #[must_use]
    pub fn standalone_sig(mut self, signature: Vec<u8>) -> Self {
        self.tables.push_standalone_sig(signature);
        self
    }

    /// Appends a `MethodDef` with the next free row
    ///
    /// ## Arguments
    /// * `signature`       - The `MethodDefSig` blob
    /// * `flags`           - Body header flags, [`MethodBodyFlags::INIT_LOCALS`] enables locals
    /// * `local_sig_token` - `StandAloneSig` token of the locals, or a null token
    /// * `code`            - The CIL instruction stream
    #[must_use]
    pub fn method_def(
        mut self,
        signature: Vec<u8>,
        flags: MethodBodyFlags,
        local_sig_token: Token,
        code: Vec<u8>,
    ) -> Self {
        let row = u32::try_from(self.methods.len() + 1).unwrap_or(u32::MAX);
        self.methods.push(MethodBody {
            token: Token::from_parts(TableId::MethodDef.tag(), row),
            signature,
            local_var_sig_token: local_sig_token,
            flags,
            max_stack: 8,
            code,
        });
        self
    }

    /// Adds an already decoded method body under its own token
    #[must_use]
    pub fn method(mut self, body: MethodBody) -> Self {
        self.methods.push(body);
        self
    }

    /// Attaches a native bridge implementing this assembly's members
    #[must_use]
    pub fn native_bridge(mut self, bridge: Arc<dyn NativeBridge>) -> Self {
        self.native = Some(bridge);
        self
    }

    /// Finishes the assembly
    #[must_use]
    pub fn build(self) -> AssemblyRc {
        let methods = SkipMap::new();
        for body in self.methods {
            methods.insert(body.token, Arc::new(body));
        }

        Arc::new(Assembly {
            name: self.name,
            tables: self.tables,
            methods,
            native: self.native,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_method_rows_in_insertion_order() {
        let assembly = Assembly::builder("App")
            .method_def(vec![0x00, 0x00, 0x01], MethodBodyFlags::empty(), Token::new(0), vec![0x2A])
            .method_def(
                vec![0x00, 0x01, 0x01, 0x08],
                MethodBodyFlags::INIT_LOCALS,
                Token::new(0x1100_0001),
                vec![0x00, 0x2A],
            )
            .build();

        assert_eq!(assembly.methods().len(), 2);
        let second = assembly.method_body(Token::new(0x0600_0002)).unwrap();
        assert_eq!(second.code, vec![0x00, 0x2A]);
        assert!(second.init_locals());
        assert_eq!(second.local_var_sig_token, Token::new(0x1100_0001));
    }

    #[test]
    fn test_missing_body() {
        let assembly = Assembly::builder("Empty").build();
        let err = assembly.method_body(Token::new(0x0600_0001)).unwrap_err();
        assert!(matches!(
            err,
            Error::Emulation(EmulationError::MissingMethodBody { token }) if token == Token::new(0x0600_0001)
        ));
    }

    #[test]
    fn test_rows_and_name() {
        let assembly = Assembly::builder("Lib")
            .assembly_ref("System.Runtime")
            .type_ref(CodedIndex::new(TableId::AssemblyRef, 1), "System", "Math")
            .member_ref(CodedIndex::new(TableId::TypeRef, 1), "Abs", vec![0x00, 0x01, 0x08, 0x08])
            .standalone_sig(vec![0x07, 0x01, 0x08])
            .build();

        assert_eq!(assembly.name(), "Lib");
        assert!(assembly.native_bridge().is_none());
        assert_eq!(assembly.tables().assembly_ref(1).unwrap().name, "System.Runtime");
        assert_eq!(assembly.tables().type_ref(1).unwrap().fullname(), "System.Math");
        assert_eq!(assembly.tables().member_ref(1).unwrap().name, "Abs");
        assert_eq!(assembly.tables().row_count(TableId::StandAloneSig), 1);
    }
}
