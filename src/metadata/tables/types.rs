use strum::{EnumCount, EnumIter, FromRepr};

use crate::metadata::token::Token;

/// Identifiers of the metadata tables known to the invocation engine.
///
/// The discriminant is the table tag stored in the high byte of a [`Token`].
#[derive(Clone, Copy, PartialEq, Debug, EnumIter, EnumCount, FromRepr, Eq, Hash)]
#[repr(u8)]
pub enum TableId {
    /// `Module` table (0x00)
    Module = 0x00,
    /// `TypeRef` table (0x01) - References to types defined in external assemblies.
    TypeRef = 0x01,
    /// `TypeDef` table (0x02) - Definitions of types within this assembly.
    TypeDef = 0x02,
    /// `Field` table (0x04)
    Field = 0x04,
    /// `MethodDef` table (0x06) - Method definitions within types.
    MethodDef = 0x06,
    /// `MemberRef` table (0x0A) - References to fields or methods of other types.
    MemberRef = 0x0A,
    /// `StandAloneSig` table (0x11) - Standalone signatures, e.g. method locals.
    StandAloneSig = 0x11,
    /// `ModuleRef` table (0x1A)
    ModuleRef = 0x1A,
    /// `TypeSpec` table (0x1B)
    TypeSpec = 0x1B,
    /// `AssemblyRef` table (0x23) - References to other assemblies.
    AssemblyRef = 0x23,
    /// `MethodSpec` table (0x2B) - Generic method instantiations.
    MethodSpec = 0x2B,
}

impl TableId {
    /// Returns the table tag as stored in the high byte of a token
    #[must_use]
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// A decoded coded index: a reference into one of several possible tables.
///
/// Coded indices are how `MemberRef.Class` (`MemberRefParent`) and
/// `TypeRef.ResolutionScope` point at their target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CodedIndex {
    /// The [`TableId`] this index is referring to.
    pub tag: TableId,

    /// The row ID that this `CodedIndex` is pointing to (1-based).
    pub row: u32,

    /// The computed metadata token for this coded index.
    pub token: Token,
}

impl CodedIndex {
    /// Creates a new `CodedIndex` with the specified table and row.
    #[must_use]
    pub fn new(tag: TableId, row: u32) -> CodedIndex {
        CodedIndex {
            tag,
            row,
            token: Token::from_parts(tag.tag(), row),
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_table_id_from_tag() {
        for table in TableId::iter() {
            assert_eq!(TableId::from_repr(table.tag()), Some(table));
        }
        assert_eq!(TableId::from_repr(0x03), None);
        assert_eq!(TableId::COUNT, 11);
    }

    #[test]
    fn test_coded_index_token() {
        let index = CodedIndex::new(TableId::AssemblyRef, 4);
        assert_eq!(index.token, Token::new(0x2300_0004));

        let index = CodedIndex::new(TableId::Module, 1);
        assert_eq!(index.token, Token::new(0x0000_0001));
    }
}
