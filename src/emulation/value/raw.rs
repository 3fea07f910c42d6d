use std::fmt;

use crate::metadata::signatures::TypeSignature;

/// A value on the operand stack.
///
/// This follows the CIL evaluation stack model: small integral types are widened to
/// `int32`, object references are opaque handles owned by the embedding runtime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue {
    /// `int32` and everything narrower
    I32(i32),
    /// `int64`
    I64(i64),
    /// `native int`, pointers and function pointers
    NativeInt(i64),
    /// `float32`
    F32(f32),
    /// `float64`
    F64(f64),
    /// A reference into the host's object space
    ObjectRef(u64),
    /// The null reference
    Null,
}

impl RawValue {
    /// The zero value of storage of the given type.
    ///
    /// Types without a primitive stack representation (reference types, value types,
    /// generics) zero to [`RawValue::Null`].
    #[must_use]
    pub fn zero(signature: &TypeSignature) -> RawValue {
        match signature {
            TypeSignature::Boolean
            | TypeSignature::Char
            | TypeSignature::I1
            | TypeSignature::U1
            | TypeSignature::I2
            | TypeSignature::U2
            | TypeSignature::I4
            | TypeSignature::U4 => RawValue::I32(0),
            TypeSignature::I8 | TypeSignature::U8 => RawValue::I64(0),
            TypeSignature::I
            | TypeSignature::U
            | TypeSignature::Ptr(_)
            | TypeSignature::FnPtr(_) => RawValue::NativeInt(0),
            TypeSignature::R4 => RawValue::F32(0.0),
            TypeSignature::R8 => RawValue::F64(0.0),
            TypeSignature::Pinned(inner) => RawValue::zero(inner),
            _ => RawValue::Null,
        }
    }

    /// The value as a 64-bit integer, if it is integral
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            RawValue::I32(value) => Some(i64::from(value)),
            RawValue::I64(value) | RawValue::NativeInt(value) => Some(value),
            _ => None,
        }
    }

    /// The value as a 64-bit float, if it is a floating point value
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            RawValue::F32(value) => Some(f64::from(value)),
            RawValue::F64(value) => Some(value),
            _ => None,
        }
    }

    /// Returns true for [`RawValue::Null`]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::I32(value) => write!(f, "{value}"),
            RawValue::I64(value) => write!(f, "{value}L"),
            RawValue::NativeInt(value) => write!(f, "0x{value:x}n"),
            RawValue::F32(value) => write!(f, "{value}f"),
            RawValue::F64(value) => write!(f, "{value}d"),
            RawValue::ObjectRef(handle) => write!(f, "obj@{handle}"),
            RawValue::Null => write!(f, "null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values() {
        assert_eq!(RawValue::zero(&TypeSignature::Boolean), RawValue::I32(0));
        assert_eq!(RawValue::zero(&TypeSignature::U8), RawValue::I64(0));
        assert_eq!(RawValue::zero(&TypeSignature::U), RawValue::NativeInt(0));
        assert_eq!(RawValue::zero(&TypeSignature::R4), RawValue::F32(0.0));
        assert_eq!(
            RawValue::zero(&TypeSignature::Pinned(Box::new(TypeSignature::R8))),
            RawValue::F64(0.0)
        );
        assert_eq!(RawValue::zero(&TypeSignature::String), RawValue::Null);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(RawValue::I32(-3).as_i64(), Some(-3));
        assert_eq!(RawValue::NativeInt(0x1000).as_i64(), Some(0x1000));
        assert_eq!(RawValue::F32(1.5).as_i64(), None);
        assert_eq!(RawValue::F32(1.5).as_f64(), Some(1.5));
        assert_eq!(RawValue::ObjectRef(7).as_f64(), None);
        assert!(RawValue::Null.is_null());
        assert_eq!(RawValue::ObjectRef(7).to_string(), "obj@7");
    }
}
