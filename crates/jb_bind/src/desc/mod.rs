//! Runtime type descriptors.
//!
//! A [`TypeDesc`] is the introspection output for one concrete type: its
//! kind, identity and — depending on the kind — properties, element types
//! and capability accessors. Descriptors are plain immutable data built
//! once per type (see [`DescCell`] / [`GenericDescCell`]) and consumed by
//! the model builders; nothing in here performs (de)serialization itself.

use core::fmt;

mod bind_type;
mod cell;
mod class;
mod container;
mod custom;
mod scalar;
mod ty;

pub use bind_type::{BindType, DescFn};
pub use cell::{DescCell, GenericDescCell};
pub use class::{ClassDesc, CreatorArgs, CreatorDesc, CreatorParamDesc};
pub use class::{Getter, PropertyDesc, Setter};
pub use container::{ArrayDesc, BytesDesc, DynamicDesc, ListDesc, MapDesc};
pub use container::{OptionalDesc, WrapperDesc};
pub use custom::{ClassCustomization, Customization, PropertyCustomization};
pub use custom::{DateFormat, NumberFormat, Polymorphism};
pub use scalar::{ScalarDesc, ScalarKind};
pub use ty::Ty;

// -----------------------------------------------------------------------------
// DescKind

/// The closed set of shapes the engine dispatches over.
///
/// Dispatch happens once, at chain-build time; the composed chain never
/// re-examines the kind per element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescKind {
    Scalar,
    Bytes,
    Optional,
    List,
    Array,
    Map,
    Class,
    Wrapper,
    Dynamic,
}

impl fmt::Display for DescKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => f.pad("Scalar"),
            Self::Bytes => f.pad("Bytes"),
            Self::Optional => f.pad("Optional"),
            Self::List => f.pad("List"),
            Self::Array => f.pad("Array"),
            Self::Map => f.pad("Map"),
            Self::Class => f.pad("Class"),
            Self::Wrapper => f.pad("Wrapper"),
            Self::Dynamic => f.pad("Dynamic"),
        }
    }
}

// -----------------------------------------------------------------------------
// TypeDesc

/// Runtime type information for one concrete type.
///
/// Obtained through [`Described::descriptor`](crate::bind::Described) or
/// from a value via [`Bind::type_desc`](crate::bind::Bind::type_desc).
pub enum TypeDesc {
    Scalar(ScalarDesc),
    Bytes(BytesDesc),
    Optional(OptionalDesc),
    List(ListDesc),
    Array(ArrayDesc),
    Map(MapDesc),
    Class(ClassDesc),
    Wrapper(WrapperDesc),
    Dynamic(DynamicDesc),
}

// Kind-checked accessors such as `as_class`.
macro_rules! impl_cast_method {
    ($name:ident : $kind:ident => $desc:ident) => {
        /// Narrows to the kind-specific descriptor, or `None` when the
        /// kind differs.
        #[inline]
        pub const fn $name(&self) -> Option<&$desc> {
            match self {
                Self::$kind(desc) => Some(desc),
                _ => None,
            }
        }
    };
}

impl TypeDesc {
    impl_cast_method!(as_scalar: Scalar => ScalarDesc);
    impl_cast_method!(as_bytes: Bytes => BytesDesc);
    impl_cast_method!(as_optional: Optional => OptionalDesc);
    impl_cast_method!(as_list: List => ListDesc);
    impl_cast_method!(as_array: Array => ArrayDesc);
    impl_cast_method!(as_map: Map => MapDesc);
    impl_cast_method!(as_class: Class => ClassDesc);
    impl_cast_method!(as_wrapper: Wrapper => WrapperDesc);

    /// Returns the identity metadata for this descriptor.
    pub const fn ty(&self) -> &Ty {
        match self {
            Self::Scalar(desc) => desc.ty(),
            Self::Bytes(desc) => desc.ty(),
            Self::Optional(desc) => desc.ty(),
            Self::List(desc) => desc.ty(),
            Self::Array(desc) => desc.ty(),
            Self::Map(desc) => desc.ty(),
            Self::Class(desc) => desc.ty(),
            Self::Wrapper(desc) => desc.ty(),
            Self::Dynamic(desc) => desc.ty(),
        }
    }

    /// Returns the kind discriminator.
    pub const fn kind(&self) -> DescKind {
        match self {
            Self::Scalar(_) => DescKind::Scalar,
            Self::Bytes(_) => DescKind::Bytes,
            Self::Optional(_) => DescKind::Optional,
            Self::List(_) => DescKind::List,
            Self::Array(_) => DescKind::Array,
            Self::Map(_) => DescKind::Map,
            Self::Class(_) => DescKind::Class,
            Self::Wrapper(_) => DescKind::Wrapper,
            Self::Dynamic(_) => DescKind::Dynamic,
        }
    }

    /// Full type path, e.g. `alloc::vec::Vec<i32>`.
    #[inline]
    pub fn path(&self) -> &'static str {
        self.ty().path()
    }
}

impl fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDesc::{}({})", self.kind(), self.path())
    }
}
