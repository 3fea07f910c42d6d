//! Method bodies as the invocation engine sees them.
//!
//! A [`MethodBody`] carries what [`crate::emulation::Thread::step`] needs to activate a
//! frame: the method signature blob, the optional `StandAloneSig` token of the locals
//! signature, the header flags and the CIL code itself.

use std::sync::Arc;

use bitflags::bitflags;

use crate::{file::parser::Parser, metadata::token::Token, Result};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Flags that a method body can have
    pub struct MethodBodyFlags: u16 {
        /// Tiny method header format
        const TINY_FORMAT = 0x2;
        /// Fat method header format
        const FAT_FORMAT = 0x3;
        /// Flag of the fat method header, showing that there are more data sections appended to the header
        const MORE_SECTS = 0x8;
        /// Flag to indicate that this method should call the default constructor on all local variables
        const INIT_LOCALS = 0x10;
    }
}

/// Mask of the header format bits in the first header byte
const FORMAT_MASK: u8 = 0b0000_0011;
/// Tiny headers have an implicit operand stack limit
const TINY_MAX_STACK: usize = 8;

/// A reference-counted `MethodBody`
pub type MethodBodyRc = Arc<MethodBody>;

/// The executable part of a `MethodDef` row
#[derive(Debug, Clone, PartialEq)]
pub struct MethodBody {
    /// The `MethodDef` token of this method
    pub token: Token,
    /// The `MethodDefSig` blob
    pub signature: Vec<u8>,
    /// `StandAloneSig` token of the local variable signature, null if there are no locals
    pub local_var_sig_token: Token,
    /// Header flags
    pub flags: MethodBodyFlags,
    /// Maximum number of items on the operand stack
    pub max_stack: usize,
    /// The CIL instruction stream
    pub code: Vec<u8>,
}

impl MethodBody {
    /// Decode a method body from its raw bytes, starting at the method header (II.25.4).
    ///
    /// Both tiny and fat headers are supported. Extra data sections following the code
    /// (exception handling tables) are not decoded.
    ///
    /// # Arguments
    /// * `token`       - The `MethodDef` token the body belongs to
    /// * `signature`   - The `MethodDefSig` blob of the method
    /// * `data`        - The bytes of the method header followed by the code
    ///
    /// # Errors
    /// Returns an error if the header is malformed or the code extends past `data`.
    pub fn parse(token: Token, signature: Vec<u8>, data: &[u8]) -> Result<MethodBody> {
        let mut parser = Parser::new(data);
        let first_byte = parser.peek_byte()?;

        match MethodBodyFlags::from_bits_truncate(u16::from(first_byte & FORMAT_MASK)) {
            MethodBodyFlags::TINY_FORMAT => {
                parser.advance()?;
                let size_code = usize::from(first_byte >> 2);
                let code = parser.read_bytes(size_code)?.to_vec();

                Ok(MethodBody {
                    token,
                    signature,
                    local_var_sig_token: Token::new(0),
                    flags: MethodBodyFlags::TINY_FORMAT,
                    max_stack: TINY_MAX_STACK,
                    code,
                })
            }
            MethodBodyFlags::FAT_FORMAT => {
                let first_duo = parser.read_le_u16()?;
                let size_header = usize::from(first_duo >> 12) * 4;
                if size_header < 12 {
                    return Err(malformed_error!(
                        "Fat method header too small - {} bytes",
                        size_header
                    ));
                }

                let max_stack = usize::from(parser.read_le_u16()?);
                let size_code = parser.read_le_u32()? as usize;
                let local_var_sig_token = Token::new(parser.read_le_u32()?);

                parser.read_bytes(size_header - 12)?;
                let code = parser.read_bytes(size_code)?.to_vec();

                Ok(MethodBody {
                    token,
                    signature,
                    local_var_sig_token,
                    flags: MethodBodyFlags::from_bits_truncate(first_duo & 0x0FFF),
                    max_stack,
                    code,
                })
            }
            _ => Err(malformed_error!(
                "Invalid method header format - {}",
                first_byte
            )),
        }
    }

    /// Returns true if locals have to be zero-initialized on frame activation
    #[must_use]
    pub fn init_locals(&self) -> bool {
        self.flags.contains(MethodBodyFlags::INIT_LOCALS)
    }

    /// Returns true if this body declares a local variable signature
    #[must_use]
    pub fn has_locals(&self) -> bool {
        !self.local_var_sig_token.is_null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_tiny_header() {
        // 3 bytes of code: ldarg.0 ldarg.1 add, followed by trailing data
        let data = [0x0E, 0x02, 0x03, 0x58, 0xFF];
        let body = MethodBody::parse(Token::new(0x0600_0001), vec![0x00], &data).unwrap();

        assert_eq!(body.code, vec![0x02, 0x03, 0x58]);
        assert_eq!(body.max_stack, 8);
        assert!(!body.init_locals());
        assert!(!body.has_locals());
    }

    #[test]
    fn test_fat_header() {
        let data = [
            0x13, 0x30, // INIT_LOCALS | FAT, header size 3 dwords
            0x02, 0x00, // max stack
            0x02, 0x00, 0x00, 0x00, // code size
            0x01, 0x00, 0x00, 0x11, // StandAloneSig row 1
            0x16, 0x2A, // ldc.i4.0 ret
        ];
        let body = MethodBody::parse(Token::new(0x0600_0002), vec![0x00], &data).unwrap();

        assert_eq!(body.max_stack, 2);
        assert_eq!(body.code, vec![0x16, 0x2A]);
        assert_eq!(body.local_var_sig_token, Token::new(0x1100_0001));
        assert!(body.init_locals());
        assert!(body.has_locals());
    }

    #[test]
    fn test_invalid_headers() {
        assert!(matches!(
            MethodBody::parse(Token::new(0x0600_0001), vec![], &[]),
            Err(Error::OutOfBounds)
        ));
        assert!(matches!(
            MethodBody::parse(Token::new(0x0600_0001), vec![], &[0x00]),
            Err(Error::Malformed { .. })
        ));
        // tiny header claiming 4 bytes of code with only 1 present
        assert!(matches!(
            MethodBody::parse(Token::new(0x0600_0001), vec![], &[0x12, 0x2A]),
            Err(Error::OutOfBounds)
        ));
    }
}
