//! Method and local variable signature decoding.
//!
//! The invocation engine needs two kinds of signature blobs (ECMA-335 II.23.2):
//!
//! - **Method signatures** (`MethodDefSig`, `MethodRefSig`) - calling convention, parameter
//!   count and parameter types, which determine how many operand stack values a call
//!   consumes and which of them get pool storage
//! - **Local variable signatures** (`LocalVarSig`, referenced through `StandAloneSig`) - the
//!   types of the locals a method body declares
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotframe::metadata::signatures::parse_method_signature;
//!
//! // instance void (string)
//! let signature_data = &[0x20, 0x01, 0x01, 0x0E];
//! let method_sig = parse_method_signature(signature_data)?;
//!
//! assert_eq!(method_sig.argument_count(), 2);
//! # Ok::<(), dotframe::Error>(())
//! ```
//!
//! ```rust,no_run
//! use dotframe::metadata::signatures::parse_local_var_signature;
//!
//! // 2 locals: int32, string
//! let locals_data = &[0x07, 0x02, 0x08, 0x0E];
//! let locals_sig = parse_local_var_signature(locals_data)?;
//!
//! for (i, local_type) in locals_sig.locals.iter().enumerate() {
//!     println!("Local {}: {:?}", i, local_type);
//! }
//! # Ok::<(), dotframe::Error>(())
//! ```
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 23.2 - Blobs and Signatures

mod parser;
mod types;

pub use parser::*;
pub use types::*;

use crate::Result;

/// Parse a method signature from the provided blob
///
/// # Arguments
/// * `data` - The signature blob to parse
///
/// # Errors
/// Returns an error if the blob is truncated or contains an unknown element type
pub fn parse_method_signature(data: &[u8]) -> Result<SignatureMethod> {
    let mut parser = SignatureParser::new(data);
    parser.parse_method_signature()
}

/// Parse a local variable signature from the provided blob
///
/// # Arguments
/// * `data` - The signature blob to parse
///
/// # Errors
/// Returns an error if the blob doesn't start with the `LocalVarSig` header or is malformed
pub fn parse_local_var_signature(data: &[u8]) -> Result<SignatureLocalVariables> {
    let mut parser = SignatureParser::new(data);
    parser.parse_local_var_signature()
}

/// Decodes signature blobs for the call-frame state machine.
///
/// The default [`EcmaSignatureDecoder`] implements ECMA-335 II.23.2. Hosts can substitute
/// their own decoder, e.g. to cache decoded signatures per blob.
pub trait SignatureDecoder: Send + Sync {
    /// Decode a `MethodDefSig` or `MethodRefSig` blob
    ///
    /// # Errors
    /// Returns an error if the blob is malformed
    fn decode_method(&self, blob: &[u8]) -> Result<SignatureMethod>;

    /// Decode a `LocalVarSig` blob
    ///
    /// # Errors
    /// Returns an error if the blob is malformed
    fn decode_locals(&self, blob: &[u8]) -> Result<SignatureLocalVariables>;
}

/// Stateless [`SignatureDecoder`] backed by [`SignatureParser`]
#[derive(Debug, Default, Clone, Copy)]
pub struct EcmaSignatureDecoder;

impl SignatureDecoder for EcmaSignatureDecoder {
    fn decode_method(&self, blob: &[u8]) -> Result<SignatureMethod> {
        parse_method_signature(blob)
    }

    fn decode_locals(&self, blob: &[u8]) -> Result<SignatureLocalVariables> {
        parse_local_var_signature(blob)
    }
}
