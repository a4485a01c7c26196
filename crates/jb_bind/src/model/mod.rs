//! Merged runtime class models.
//!
//! A [`ClassModel`] is the engine's working form of a class descriptor:
//! base-descriptor properties merged beneath the class's own, JSON names
//! resolved through the naming strategy, properties sorted per the order
//! strategy, and name uniqueness validated. Models are built lazily and
//! cached per engine in the [`MappingContext`].

mod mapping;
mod naming;
mod ordering;

pub use mapping::MappingContext;
pub use naming::PropertyNamingStrategy;
pub use ordering::PropertyOrderStrategy;

use crate::desc::{BindType, ClassCustomization, ClassDesc, CreatorDesc};
use crate::desc::{Getter, PropertyCustomization, Setter, Ty};

// -----------------------------------------------------------------------------
// PropertyModel

/// One merged property: the most specific getter and setter found along
/// the base chain, plus the resolved JSON names.
#[derive(Debug, Clone)]
pub struct PropertyModel {
    name: Box<str>,
    read_name: Box<str>,
    write_name: Box<str>,
    ty: BindType,
    getter: Option<&'static Getter>,
    setter: Option<&'static Setter>,
    customization: &'static PropertyCustomization,
}

impl PropertyModel {
    /// The original property name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// JSON member name matched when deserializing.
    #[inline]
    pub fn read_name(&self) -> &str {
        &self.read_name
    }

    /// JSON member name emitted when serializing.
    #[inline]
    pub fn write_name(&self) -> &str {
        &self.write_name
    }

    /// The declared type, possibly containing generic variables.
    #[inline]
    pub const fn ty(&self) -> &BindType {
        &self.ty
    }

    #[inline]
    pub const fn getter(&self) -> Option<&'static Getter> {
        self.getter
    }

    #[inline]
    pub const fn setter(&self) -> Option<&'static Setter> {
        self.setter
    }

    #[inline]
    pub const fn customization(&self) -> &'static PropertyCustomization {
        self.customization
    }

    #[inline]
    pub const fn readable(&self) -> bool {
        self.getter.is_some()
    }

    #[inline]
    pub const fn writable(&self) -> bool {
        self.setter.is_some()
    }
}

// -----------------------------------------------------------------------------
// ClassModel

/// The merged, ordered model of one class.
///
/// Built once per engine on first encounter of the class and immutable
/// thereafter.
#[derive(Debug)]
pub struct ClassModel {
    desc: &'static ClassDesc,
    properties: Box<[PropertyModel]>,
}

impl ClassModel {
    #[inline]
    pub const fn ty(&self) -> &Ty {
        self.desc.ty()
    }

    /// Short class name for diagnostics.
    #[inline]
    pub fn name(&self) -> &str {
        self.desc.name()
    }

    #[inline]
    pub const fn desc(&self) -> &'static ClassDesc {
        self.desc
    }

    /// Properties in resolved order.
    #[inline]
    pub fn properties(&self) -> &[PropertyModel] {
        &self.properties
    }

    #[inline]
    pub fn creator(&self) -> Option<&'static CreatorDesc> {
        self.desc.creator()
    }

    #[inline]
    pub fn customization(&self) -> &'static ClassCustomization {
        self.desc.customization()
    }
}
