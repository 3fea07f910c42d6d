use std::fmt;

/// A metadata token representing a reference to a metadata table entry.
///
/// Tokens in .NET metadata consist of a 32-bit value where:
/// - The high byte (bits 24-31) indicates the table type
/// - The low 24 bits (bits 0-23) indicate the row index within that table
///
/// Tokens are never mutated; the call-frame state machine decodes them once into a
/// [`TokenKind`] and matches on that.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Creates a new token from a raw 32-bit value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Creates a token from a table tag and a row index.
    ///
    /// Only the low 24 bits of `row` are kept.
    #[must_use]
    pub fn from_parts(table: u8, row: u32) -> Self {
        Token((u32::from(table) << 24) | (row & 0x00FF_FFFF))
    }

    /// Returns the raw token value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Extracts the table type from the token (high byte)
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Extracts the row index from the token (low 24 bits)
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns true if this is a null token (value 0)
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Decodes the table tag into the closed set of kinds the resolver understands.
    #[must_use]
    pub fn kind(&self) -> TokenKind {
        let row = self.row();
        match self.table() {
            TokenKind::METHOD_DEF => TokenKind::MethodDef(row),
            TokenKind::MEMBER_REF => TokenKind::MemberRef(row),
            TokenKind::TYPE_REF => TokenKind::TypeRef(row),
            TokenKind::ASSEMBLY_REF => TokenKind::AssemblyRef(row),
            table => TokenKind::Unsupported { table, row },
        }
    }
}

/// The decoded form of a [`Token`] as far as method invocation is concerned.
///
/// `MethodSpec` (generic method instantiation) tokens and every other table are
/// folded into [`TokenKind::Unsupported`]; invoking one is a fatal error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A method defined in the calling assembly (`MethodDef`, 0x06)
    MethodDef(u32),
    /// A reference to a member, possibly in another assembly (`MemberRef`, 0x0A)
    MemberRef(u32),
    /// A reference to a type (`TypeRef`, 0x01)
    TypeRef(u32),
    /// A reference to another assembly (`AssemblyRef`, 0x23)
    AssemblyRef(u32),
    /// Any other table
    Unsupported {
        /// The table tag from the high byte of the token
        table: u8,
        /// The row index
        row: u32,
    },
}

impl TokenKind {
    const TYPE_REF: u8 = 0x01;
    const METHOD_DEF: u8 = 0x06;
    const MEMBER_REF: u8 = 0x0A;
    const ASSEMBLY_REF: u8 = 0x23;

    /// Returns the row index carried by this kind
    #[must_use]
    pub fn row(&self) -> u32 {
        match *self {
            TokenKind::MethodDef(row)
            | TokenKind::MemberRef(row)
            | TokenKind::TypeRef(row)
            | TokenKind::AssemblyRef(row)
            | TokenKind::Unsupported { row, .. } => row,
        }
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_parts() {
        let token = Token::new(0x0A00_0007);
        assert_eq!(token.table(), 0x0A);
        assert_eq!(token.row(), 7);
        assert!(!token.is_null());
        assert!(Token::new(0).is_null());

        assert_eq!(Token::from_parts(0x06, 1), Token::new(0x0600_0001));
        assert_eq!(Token::from_parts(0x23, 0x1FF_FFFF), Token::new(0x23FF_FFFF));
    }

    #[test]
    fn test_token_kind_supported_tables() {
        assert_eq!(Token::new(0x0600_0001).kind(), TokenKind::MethodDef(1));
        assert_eq!(Token::new(0x0A00_0010).kind(), TokenKind::MemberRef(0x10));
        assert_eq!(Token::new(0x0100_0002).kind(), TokenKind::TypeRef(2));
        assert_eq!(Token::new(0x2300_0003).kind(), TokenKind::AssemblyRef(3));
    }

    #[test]
    fn test_token_kind_method_spec_is_unsupported() {
        let kind = Token::new(0x2B00_0001).kind();
        assert_eq!(kind, TokenKind::Unsupported { table: 0x2B, row: 1 });
        assert_eq!(kind.row(), 1);

        assert!(matches!(
            Token::new(0x0200_0001).kind(),
            TokenKind::Unsupported { table: 0x02, .. }
        ));
    }

    #[test]
    fn test_token_display_and_debug() {
        let token = Token(0x0600_0001);
        assert_eq!(format!("{}", token), "0x06000001");

        let debug_str = format!("{:?}", token);
        assert!(debug_str.contains("table: 0x06"));
        assert!(debug_str.contains("row: 1"));
    }

    #[test]
    fn test_token_conversions() {
        let token: Token = 0x0A00_0001u32.into();
        let raw: u32 = token.into();
        assert_eq!(raw, 0x0A00_0001);
    }
}
