//! Low-level blob access.
//!
//! Metadata blobs (method signatures, local variable signatures) are read through the
//! cursor-based [`crate::file::parser::Parser`], which bounds-checks every access and
//! implements the ECMA-335 compressed integer encodings.

pub mod parser;
