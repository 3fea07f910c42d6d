use crate::metadata::token::Token;

/// Size in bytes of native integers and pointers on the emulated platform.
pub const NATIVE_INT_SIZE: usize = 8;

#[allow(non_snake_case, dead_code, missing_docs)]
/// Possible bytes that represent various 'Types' for a signature - from coreclr
pub mod ELEMENT_TYPE {
    pub const END: u8 = 0x00;
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    // Followed by type
    pub const PTR: u8 = 0x0f;
    // Followed by type
    pub const BYREF: u8 = 0x10;
    // Followed by TypeDef or TypeRef token
    pub const VALUETYPE: u8 = 0x11;
    // Followed by TypeDef or TypeRef token
    pub const CLASS: u8 = 0x12;
    pub const VAR: u8 = 0x13;
    // type rank boundsCount bound1 … loCount lo1 …
    pub const ARRAY: u8 = 0x14;
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    // System.IntPtr
    pub const I: u8 = 0x18;
    // System.UIntPtr
    pub const U: u8 = 0x19;
    pub const FNPTR: u8 = 0x1b;
    // System.Object
    pub const OBJECT: u8 = 0x1c;
    // Single-dim array with 0 lower bound
    pub const SZARRAY: u8 = 0x1d;
    pub const MVAR: u8 = 0x1e;
    pub const CMOD_REQD: u8 = 0x1f;
    pub const CMOD_OPT: u8 = 0x20;
    pub const SENTINEL: u8 = 0x41;
    pub const PINNED: u8 = 0x45;
}

/// The type component of a signature (ECMA-335 II.23.2.12).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TypeSignature {
    /// Placeholder for a type that has not been decoded
    #[default]
    Unknown,
    /// `void`
    Void,
    /// `bool`
    Boolean,
    /// `char` (UTF-16 code unit)
    Char,
    /// `int8`
    I1,
    /// `uint8`
    U1,
    /// `int16`
    I2,
    /// `uint16`
    U2,
    /// `int32`
    I4,
    /// `uint32`
    U4,
    /// `int64`
    I8,
    /// `uint64`
    U8,
    /// `float32`
    R4,
    /// `float64`
    R8,
    /// `native int`
    I,
    /// `native unsigned int`
    U,
    /// `string`
    String,
    /// `object`
    Object,
    /// `typedref`
    TypedByRef,
    /// Unmanaged pointer to the inner type
    Ptr(Box<TypeSignature>),
    /// Managed reference to the inner type
    ByRef(Box<TypeSignature>),
    /// Pinned local of the inner type
    Pinned(Box<TypeSignature>),
    /// A value type, referenced by `TypeDef`, `TypeRef` or `TypeSpec` token
    ValueType(Token),
    /// A reference type, referenced by `TypeDef`, `TypeRef` or `TypeSpec` token
    Class(Token),
    /// Generic parameter of the declaring type (`!n`)
    GenericParamType(u32),
    /// Generic parameter of the declaring method (`!!n`)
    GenericParamMethod(u32),
    /// Single-dimensional, zero-based array
    SzArray(Box<TypeSignature>),
    /// General array
    Array {
        /// Element type
        base: Box<TypeSignature>,
        /// Number of dimensions
        rank: u32,
    },
    /// Generic instantiation of the first type with the given arguments
    GenericInst(Box<TypeSignature>, Vec<TypeSignature>),
    /// Function pointer
    FnPtr(Box<SignatureMethod>),
}

impl TypeSignature {
    /// Returns the storage size in bytes of values of this type, if it is statically known.
    ///
    /// Only primitives, native integers and unmanaged pointers have a static size. Reference
    /// types, value types (whose layout needs type loading), arrays and generics return `None`.
    #[must_use]
    pub fn static_size(&self) -> Option<usize> {
        match self {
            TypeSignature::Boolean | TypeSignature::I1 | TypeSignature::U1 => Some(1),
            TypeSignature::Char | TypeSignature::I2 | TypeSignature::U2 => Some(2),
            TypeSignature::I4 | TypeSignature::U4 | TypeSignature::R4 => Some(4),
            TypeSignature::I8 | TypeSignature::U8 | TypeSignature::R8 => Some(8),
            TypeSignature::I
            | TypeSignature::U
            | TypeSignature::Ptr(_)
            | TypeSignature::FnPtr(_) => Some(NATIVE_INT_SIZE),
            TypeSignature::Pinned(inner) => inner.static_size(),
            _ => None,
        }
    }

    /// Returns true for `float32` and `float64`
    #[must_use]
    pub fn is_floating_point(&self) -> bool {
        match self {
            TypeSignature::R4 | TypeSignature::R8 => true,
            TypeSignature::Pinned(inner) => inner.is_floating_point(),
            _ => false,
        }
    }

    /// Returns true for the signed integral types, including `native int`
    #[must_use]
    pub fn is_signed(&self) -> bool {
        match self {
            TypeSignature::I1
            | TypeSignature::I2
            | TypeSignature::I4
            | TypeSignature::I8
            | TypeSignature::I => true,
            TypeSignature::Pinned(inner) => inner.is_signed(),
            _ => false,
        }
    }
}

/// A parameter or return type of a method signature
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureParameter {
    /// Custom modifiers of the parameter - `TypeDefOrRefOrSpecEncoded`
    pub modifiers: Vec<Token>,
    /// Parameter is passed by reference
    pub by_ref: bool,
    /// The type of the parameter
    pub base: TypeSignature,
}

impl SignatureParameter {
    /// Static size of a value passed in this parameter; by-ref parameters are managed
    /// pointers and are never promoted to pool storage.
    #[must_use]
    pub fn static_size(&self) -> Option<usize> {
        if self.by_ref {
            None
        } else {
            self.base.static_size()
        }
    }
}

/// Represents a method signature (II.23.2.1)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureMethod {
    /// Used to encode the keyword instance in the calling convention, see §II.15.3
    pub has_this: bool,
    /// Used to encode the keyword explicit in the calling convention, see §II.15.3
    pub explicit_this: bool,
    /// Used to encode the keyword vararg in the calling convention, see §II.15.3
    pub vararg: bool,
    /// Number of generic parameters of the method
    pub param_count_generic: u32,
    /// The declared number of parameters
    pub param_count: u32,
    /// The return type of this method
    pub return_type: SignatureParameter,
    /// The parameters of this method
    pub params: Vec<SignatureParameter>,
    /// The vararg parameters
    pub varargs: Vec<SignatureParameter>,
}

impl SignatureMethod {
    /// Number of values a call to this method consumes from the operand stack: the declared
    /// parameter count, plus one for the receiver of instance methods.
    #[must_use]
    pub fn argument_count(&self) -> usize {
        let params = usize::try_from(self.param_count).unwrap_or(usize::MAX);
        params.saturating_add(usize::from(self.has_this))
    }

    /// The declared parameter for the argument at `index`.
    ///
    /// For instance methods argument 0 is the receiver, which has no parameter entry in the
    /// signature, so `None` is returned for it. Arguments past the fixed parameters of a
    /// vararg call site map onto `varargs`.
    #[must_use]
    pub fn argument(&self, index: usize) -> Option<&SignatureParameter> {
        let param = if self.has_this {
            index.checked_sub(1)?
        } else {
            index
        };

        match param.checked_sub(self.params.len()) {
            None => self.params.get(param),
            Some(extra) => self.varargs.get(extra),
        }
    }

    /// Returns true unless the method returns `void`
    #[must_use]
    pub fn returns_value(&self) -> bool {
        !matches!(self.return_type.base, TypeSignature::Void)
    }
}

/// Local variable signature (II.23.2.6)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureLocalVariables {
    /// The local variables
    pub locals: Vec<SignatureLocalVariable>,
}

/// Represents a local variable in a method body
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureLocalVariable {
    /// Custom modifiers
    pub modifiers: Vec<Token>,
    /// Is passed by reference
    pub is_byref: bool,
    /// This variable is pinned
    pub is_pinned: bool,
    /// The signature of this variable
    pub base: TypeSignature,
}

impl SignatureLocalVariable {
    /// Static size of this local, `None` for by-ref locals and unsized types
    #[must_use]
    pub fn static_size(&self) -> Option<usize> {
        if self.is_byref {
            None
        } else {
            self.base.static_size()
        }
    }
}
