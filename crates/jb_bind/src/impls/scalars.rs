use crate::bind::Described;
use crate::desc::{DescCell, ScalarDesc, ScalarKind, TypeDesc};

macro_rules! impl_scalar_described {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Described for $ty {
                fn descriptor() -> &'static TypeDesc {
                    static CELL: DescCell = DescCell::new();
                    CELL.get_or_init(|| {
                        TypeDesc::Scalar(ScalarDesc::new::<$ty>(ScalarKind::$kind))
                    })
                }
            }
        )*
    };
}

impl_scalar_described! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    i128 => I128,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    u128 => U128,
    f32 => F32,
    f64 => F64,
    char => Char,
    String => String,
}

// -----------------------------------------------------------------------------
// Tests
