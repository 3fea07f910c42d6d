//! Metadata tables walked during method resolution.
//!
//! Only the tables the call-frame state machine touches are modelled:
//!
//! | Table | Id | Used for |
//! |-------|----|----------|
//! | `MemberRef` | 0x0A | owning class + signature of a referenced method |
//! | `TypeRef` | 0x01 | resolution scope of the owning class |
//! | `AssemblyRef` | 0x23 | name of the assembly to resolve |
//! | `StandAloneSig` | 0x11 | local variable signatures of method bodies |
//!
//! Rows are 1-based, exactly like their tokens, and shared as `Arc` so a call frame can hold
//! on to the rows it resolved without re-reading the tables.

mod rows;
mod types;

pub use rows::{
    AssemblyRefRaw, AssemblyRefRc, MemberRefRaw, MemberRefRc, MetadataTables, StandAloneSigRaw,
    StandAloneSigRc, TypeRefRaw, TypeRefRc,
};
pub use types::{CodedIndex, TableId};
