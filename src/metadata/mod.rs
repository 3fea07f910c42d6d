//! Metadata consumed by the call-frame state machine.
//!
//! The invocation engine only needs a narrow slice of ECMA-335 metadata: enough to turn a
//! method token into either a method body of the calling assembly or a
//! `MemberRef -> TypeRef -> AssemblyRef` chain naming another assembly.
//!
//! # Key Components
//!
//! - [`token`] - Metadata table row references and their decoded [`token::TokenKind`]
//! - [`tables`] - Table identifiers, coded indices and the rows walked during resolution
//! - [`signatures`] - Method and local variable signature decoding
//! - [`method`] - Method bodies
//! - [`assembly`] - Loaded assemblies, built with [`assembly::AssemblyBuilder`]
//!
//! # Examples
//!
//! ```rust
//! use dotframe::metadata::token::{Token, TokenKind};
//!
//! assert_eq!(Token::new(0x0A00_0002).kind(), TokenKind::MemberRef(2));
//! ```

/// Implementation of a loaded assembly as seen by the invocation engine
pub mod assembly;
/// Implementation of the method bodies
pub mod method;
/// Implementation of method and local variable signatures
pub mod signatures;
/// Implementation of the metadata tables walked during method resolution
pub mod tables;
/// Implementation of the metadata token
pub mod token;
