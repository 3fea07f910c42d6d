use std::sync::Arc;

use crate::metadata::{
    tables::{CodedIndex, TableId},
    token::Token,
};

/// A reference-counted `MemberRef` row
pub type MemberRefRc = Arc<MemberRefRaw>;
/// A reference-counted `TypeRef` row
pub type TypeRefRc = Arc<TypeRefRaw>;
/// A reference-counted `AssemblyRef` row
pub type AssemblyRefRc = Arc<AssemblyRefRaw>;
/// A reference-counted `StandAloneSig` row
pub type StandAloneSigRc = Arc<StandAloneSigRaw>;

#[derive(Clone, Debug)]
/// The `MemberRef` table references members (fields or methods) of types, possibly defined in
/// other assemblies. `TableId` = 0x0A
pub struct MemberRefRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// a `MemberRefParent` coded index (`MethodDef`, `ModuleRef`, `TypeDef`, `TypeRef` or `TypeSpec`)
    pub class: CodedIndex,
    /// Name of the member
    pub name: String,
    /// The raw `MethodRefSig` blob
    pub signature: Vec<u8>,
}

#[derive(Clone, Debug)]
/// The `TypeRef` table references types by name and resolution scope. `TableId` = 0x01
pub struct TypeRefRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// a `ResolutionScope` coded index (`Module`, `ModuleRef`, `AssemblyRef` or `TypeRef`)
    pub resolution_scope: CodedIndex,
    /// Namespace of the type, empty for the global namespace
    pub namespace: String,
    /// Name of the type
    pub name: String,
}

impl TypeRefRaw {
    /// Returns `Namespace.Name`, or just `Name` for types in the global namespace
    #[must_use]
    pub fn fullname(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

#[derive(Clone, Debug)]
/// The `AssemblyRef` table references external assemblies. `TableId` = 0x23
pub struct AssemblyRefRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// Simple name of the referenced assembly, as written in metadata
    pub name: String,
}

#[derive(Clone, Debug)]
/// The `StandAloneSig` table holds signatures that are not attached to a member, most notably
/// `LocalVarSig` blobs of method bodies. `TableId` = 0x11
pub struct StandAloneSigRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// The raw signature blob
    pub signature: Vec<u8>,
}

/// The metadata tables of one assembly.
///
/// Rows are appended in order, so the n-th pushed row has row id `n` (1-based).
#[derive(Clone, Debug, Default)]
pub struct MetadataTables {
    member_refs: Vec<MemberRefRc>,
    type_refs: Vec<TypeRefRc>,
    assembly_refs: Vec<AssemblyRefRc>,
    standalone_sigs: Vec<StandAloneSigRc>,
}

fn row_at<T>(rows: &[Arc<T>], row: u32) -> Option<Arc<T>> {
    let index = usize::try_from(row).ok()?.checked_sub(1)?;
    rows.get(index).cloned()
}

fn next_rid(len: usize) -> u32 {
    u32::try_from(len + 1).unwrap_or(u32::MAX)
}

impl MetadataTables {
    /// Creates empty tables
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the `MemberRef` row with the given 1-based index
    #[must_use]
    pub fn member_ref(&self, row: u32) -> Option<MemberRefRc> {
        row_at(&self.member_refs, row)
    }

    /// Returns the `TypeRef` row with the given 1-based index
    #[must_use]
    pub fn type_ref(&self, row: u32) -> Option<TypeRefRc> {
        row_at(&self.type_refs, row)
    }

    /// Returns the `AssemblyRef` row with the given 1-based index
    #[must_use]
    pub fn assembly_ref(&self, row: u32) -> Option<AssemblyRefRc> {
        row_at(&self.assembly_refs, row)
    }

    /// Returns the `StandAloneSig` row with the given 1-based index
    #[must_use]
    pub fn standalone_sig(&self, row: u32) -> Option<StandAloneSigRc> {
        row_at(&self.standalone_sigs, row)
    }

    /// Number of rows in the given table, 0 for tables that are not modelled
    #[must_use]
    pub fn row_count(&self, table: TableId) -> usize {
        match table {
            TableId::MemberRef => self.member_refs.len(),
            TableId::TypeRef => self.type_refs.len(),
            TableId::AssemblyRef => self.assembly_refs.len(),
            TableId::StandAloneSig => self.standalone_sigs.len(),
            _ => 0,
        }
    }

    /// Appends a `MemberRef` row and returns its token
    pub fn push_member_ref(
        &mut self,
        class: CodedIndex,
        name: impl Into<String>,
        signature: Vec<u8>,
    ) -> Token {
        let rid = next_rid(self.member_refs.len());
        let token = Token::from_parts(TableId::MemberRef.tag(), rid);
        self.member_refs.push(Arc::new(MemberRefRaw {
            rid,
            token,
            class,
            name: name.into(),
            signature,
        }));
        token
    }

    /// Appends a `TypeRef` row and returns its token
    pub fn push_type_ref(
        &mut self,
        resolution_scope: CodedIndex,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Token {
        let rid = next_rid(self.type_refs.len());
        let token = Token::from_parts(TableId::TypeRef.tag(), rid);
        self.type_refs.push(Arc::new(TypeRefRaw {
            rid,
            token,
            resolution_scope,
            namespace: namespace.into(),
            name: name.into(),
        }));
        token
    }

    /// Appends an `AssemblyRef` row and returns its token
    pub fn push_assembly_ref(&mut self, name: impl Into<String>) -> Token {
        let rid = next_rid(self.assembly_refs.len());
        let token = Token::from_parts(TableId::AssemblyRef.tag(), rid);
        self.assembly_refs.push(Arc::new(AssemblyRefRaw {
            rid,
            token,
            name: name.into(),
        }));
        token
    }

    /// Appends a `StandAloneSig` row and returns its token
    pub fn push_standalone_sig(&mut self, signature: Vec<u8>) -> Token {
        let rid = next_rid(self.standalone_sigs.len());
        let token = Token::from_parts(TableId::StandAloneSig.tag(), rid);
        self.standalone_sigs.push(Arc::new(StandAloneSigRaw {
            rid,
            token,
            signature,
        }));
        token
    }
}
