//! Customizations: the resolved, merged configuration applicable to a
//! class or property, independent of how it was declared.

use crate::component::{BindAdapter, ComponentRef, UserDeserializer, UserSerializer};
use crate::desc::{BindType, DescFn};

// -----------------------------------------------------------------------------
// Formats

/// Date/time representation of a class, property or whole engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum DateFormat {
    /// RFC 3339 text, e.g. `2026-08-06T12:30:00Z`.
    #[default]
    Rfc3339,
    /// Milliseconds since the Unix epoch, as a JSON number.
    UnixMillis,
    /// A `time` format-description pattern, e.g.
    /// `[year]-[month]-[day] [hour]:[minute]`.
    Pattern(Box<str>),
}

impl DateFormat {
    pub fn pattern(pattern: &str) -> Self {
        Self::Pattern(pattern.into())
    }
}

/// Number representation of a property.
///
/// A format pattern switches the property to string representation with a
/// fixed fraction-digit count derived from the digits after the decimal
/// point of the pattern (`"#0.00"` → two digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumberFormat {
    pattern: Box<str>,
}

impl NumberFormat {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    #[inline]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Number of fraction digits the pattern fixes.
    pub fn fraction_digits(&self) -> usize {
        match self.pattern.split_once('.') {
            Some((_, fraction)) => fraction
                .chars()
                .take_while(|c| matches!(c, '0' | '#'))
                .count(),
            None => 0,
        }
    }
}

// -----------------------------------------------------------------------------
// Polymorphism

/// Discriminator-based type-hierarchy configuration.
///
/// Declared on the statically expected base class; each concrete class in
/// the hierarchy is registered under an alias. Subclasses link back to the
/// declaring class through
/// [`ClassCustomization::with_polymorphism_parent`], so serialization can
/// emit the discriminators of the whole chain.
#[derive(Debug, Clone)]
pub struct Polymorphism {
    field: Box<str>,
    aliases: Vec<(Box<str>, BindType)>,
}

impl Polymorphism {
    /// Creates a configuration with the given discriminator member name.
    pub fn new(field: &str) -> Self {
        Self {
            field: field.into(),
            aliases: Vec::new(),
        }
    }

    /// Registers a concrete class under an alias.
    pub fn with_alias(mut self, alias: &str, ty: BindType) -> Self {
        self.aliases.push((alias.into(), ty));
        self
    }

    /// The discriminator member name.
    #[inline]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The alias registered for the given concrete type, if any.
    pub fn alias_of(&self, ty: &BindType) -> Option<&str> {
        self.aliases
            .iter()
            .find(|(_, bound)| bound == ty)
            .map(|(alias, _)| &**alias)
    }

    /// The concrete type registered under the given alias, if any.
    pub fn type_of(&self, alias: &str) -> Option<&BindType> {
        self.aliases
            .iter()
            .find(|(bound, _)| &**bound == alias)
            .map(|(_, ty)| ty)
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, &BindType)> {
        self.aliases.iter().map(|(alias, ty)| (&**alias, ty))
    }
}

// -----------------------------------------------------------------------------
// ClassCustomization

/// Customization attached to a class descriptor.
#[derive(Debug, Clone, Default)]
pub struct ClassCustomization {
    nillable: Option<bool>,
    date_format: Option<DateFormat>,
    number_format: Option<NumberFormat>,
    property_order: Option<Box<[Box<str>]>>,
    polymorphism: Option<Polymorphism>,
    polymorphism_parent: Option<DescFn>,
}

impl ClassCustomization {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether properties of this class serialize explicit nulls.
    pub fn with_nillable(mut self, nillable: bool) -> Self {
        self.nillable = Some(nillable);
        self
    }

    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.date_format = Some(format);
        self
    }

    pub fn with_number_format(mut self, format: NumberFormat) -> Self {
        self.number_format = Some(format);
        self
    }

    /// Explicit property order; takes absolute precedence over the order
    /// strategy and silently drops properties it does not list.
    pub fn with_property_order(mut self, order: Vec<&str>) -> Self {
        self.property_order = Some(order.into_iter().map(Box::from).collect());
        self
    }

    /// Declares this class the root of a polymorphic hierarchy.
    pub fn with_polymorphism(mut self, polymorphism: Polymorphism) -> Self {
        self.polymorphism = Some(polymorphism);
        self
    }

    /// Links a subclass to the class declaring the hierarchy.
    pub fn with_polymorphism_parent(mut self, parent: DescFn) -> Self {
        self.polymorphism_parent = Some(parent);
        self
    }

    #[inline]
    pub const fn nillable(&self) -> Option<bool> {
        self.nillable
    }

    #[inline]
    pub const fn date_format(&self) -> Option<&DateFormat> {
        self.date_format.as_ref()
    }

    #[inline]
    pub const fn number_format(&self) -> Option<&NumberFormat> {
        self.number_format.as_ref()
    }

    pub fn property_order(&self) -> Option<&[Box<str>]> {
        self.property_order.as_deref()
    }

    #[inline]
    pub const fn polymorphism(&self) -> Option<&Polymorphism> {
        self.polymorphism.as_ref()
    }

    #[inline]
    pub const fn polymorphism_parent(&self) -> Option<DescFn> {
        self.polymorphism_parent
    }
}

// -----------------------------------------------------------------------------
// PropertyCustomization

/// Customization attached to a property or creator parameter.
#[derive(Clone, Default)]
pub struct PropertyCustomization {
    rename: Option<Box<str>>,
    nillable: Option<bool>,
    date_format: Option<DateFormat>,
    number_format: Option<NumberFormat>,
    required: bool,
    implementation: Option<BindType>,
    serializer: Option<ComponentRef<dyn UserSerializer>>,
    deserializer: Option<ComponentRef<dyn UserDeserializer>>,
    adapter: Option<ComponentRef<dyn BindAdapter>>,
}

impl PropertyCustomization {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the JSON member name; not subject to the naming strategy.
    pub fn with_rename(mut self, name: &str) -> Self {
        self.rename = Some(name.into());
        self
    }

    pub fn with_nillable(mut self, nillable: bool) -> Self {
        self.nillable = Some(nillable);
        self
    }

    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.date_format = Some(format);
        self
    }

    pub fn with_number_format(mut self, format: NumberFormat) -> Self {
        self.number_format = Some(format);
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Concrete class to instantiate when the declared type is abstract.
    pub fn with_implementation(mut self, ty: BindType) -> Self {
        self.implementation = Some(ty);
        self
    }

    /// Binds a serializer directly to this property, bypassing the
    /// component search.
    pub fn with_serializer<S: UserSerializer + 'static>(mut self, serializer: S) -> Self {
        self.serializer = Some(ComponentRef::<dyn UserSerializer>::new(serializer));
        self
    }

    pub fn with_deserializer<D: UserDeserializer + 'static>(mut self, deserializer: D) -> Self {
        self.deserializer = Some(ComponentRef::<dyn UserDeserializer>::new(deserializer));
        self
    }

    pub fn with_adapter<A: BindAdapter + 'static>(mut self, adapter: A) -> Self {
        self.adapter = Some(ComponentRef::<dyn BindAdapter>::new(adapter));
        self
    }

    #[inline]
    pub fn rename(&self) -> Option<&str> {
        self.rename.as_deref()
    }

    #[inline]
    pub const fn nillable(&self) -> Option<bool> {
        self.nillable
    }

    #[inline]
    pub const fn date_format(&self) -> Option<&DateFormat> {
        self.date_format.as_ref()
    }

    #[inline]
    pub const fn number_format(&self) -> Option<&NumberFormat> {
        self.number_format.as_ref()
    }

    #[inline]
    pub const fn required(&self) -> bool {
        self.required
    }

    #[inline]
    pub const fn implementation(&self) -> Option<&BindType> {
        self.implementation.as_ref()
    }

    #[inline]
    pub const fn serializer(&self) -> Option<&ComponentRef<dyn UserSerializer>> {
        self.serializer.as_ref()
    }

    #[inline]
    pub const fn deserializer(&self) -> Option<&ComponentRef<dyn UserDeserializer>> {
        self.deserializer.as_ref()
    }

    #[inline]
    pub const fn adapter(&self) -> Option<&ComponentRef<dyn BindAdapter>> {
        self.adapter.as_ref()
    }
}

impl core::fmt::Debug for PropertyCustomization {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyCustomization")
            .field("rename", &self.rename)
            .field("nillable", &self.nillable)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Customization

/// The merged view the model builders consume, assembled from class- or
/// property-level customization at chain-build time.
#[derive(Clone, Default)]
pub struct Customization {
    pub(crate) nillable: Option<bool>,
    pub(crate) date_format: Option<DateFormat>,
    pub(crate) number_format: Option<NumberFormat>,
    pub(crate) required: bool,
    pub(crate) implementation: Option<BindType>,
    pub(crate) serializer: Option<ComponentRef<dyn UserSerializer>>,
    pub(crate) deserializer: Option<ComponentRef<dyn UserDeserializer>>,
    pub(crate) adapter: Option<ComponentRef<dyn BindAdapter>>,
}

impl Customization {
    /// The empty customization, used e.g. for map keys.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn of_class(customization: &ClassCustomization) -> Self {
        Self {
            nillable: customization.nillable,
            date_format: customization.date_format.clone(),
            number_format: customization.number_format.clone(),
            ..Self::default()
        }
    }

    pub(crate) fn of_property(customization: &PropertyCustomization) -> Self {
        Self {
            nillable: customization.nillable,
            date_format: customization.date_format.clone(),
            number_format: customization.number_format.clone(),
            required: customization.required,
            implementation: customization.implementation.clone(),
            serializer: customization.serializer.clone(),
            deserializer: customization.deserializer.clone(),
            adapter: customization.adapter.clone(),
        }
    }
}
