use core::fmt;

use crate::bind::Described;
use crate::desc::Ty;

// -----------------------------------------------------------------------------
// ScalarKind

/// The concrete type of a scalar leaf.
///
/// The kind fixes which downcast the leaf (de)serializer performs, so each
/// variant corresponds to exactly one Rust type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    I128,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
    Char,
    String,
    /// `time::OffsetDateTime`.
    DateTime,
}

impl ScalarKind {
    /// Whether values of this kind are integers.
    #[inline]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::I16
                | Self::I32
                | Self::I64
                | Self::I128
                | Self::U8
                | Self::U16
                | Self::U32
                | Self::U64
                | Self::U128
        )
    }

    /// Whether values of this kind are floating point.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Whether values of this kind may serve as plain string object keys.
    ///
    /// Keys of other kinds force the map into its entries representation.
    #[inline]
    pub const fn is_key_stringifiable(self) -> bool {
        !matches!(self, Self::DateTime)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::I128 => "i128",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::U128 => "u128",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Char => "char",
            Self::String => "String",
            Self::DateTime => "OffsetDateTime",
        };
        f.pad(name)
    }
}

// -----------------------------------------------------------------------------
// ScalarDesc

/// Descriptor of a scalar leaf type.
#[derive(Debug)]
pub struct ScalarDesc {
    ty: Ty,
    kind: ScalarKind,
}

impl ScalarDesc {
    pub fn new<T: Described>(kind: ScalarKind) -> Self {
        Self {
            ty: Ty::of::<T>(),
            kind,
        }
    }

    #[inline]
    pub const fn ty(&self) -> &Ty {
        &self.ty
    }

    #[inline]
    pub const fn kind(&self) -> ScalarKind {
        self.kind
    }
}
