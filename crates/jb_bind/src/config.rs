//! Engine configuration.

use hashbrown::HashMap;

use crate::component::{BindAdapter, ComponentRef, UserDeserializer, UserSerializer};
use crate::desc::{BindType, DateFormat, NumberFormat};
use crate::model::{PropertyNamingStrategy, PropertyOrderStrategy};

// -----------------------------------------------------------------------------
// BinaryDataStrategy

/// How [`Bytes`](crate::Bytes) payloads are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryDataStrategy {
    /// A JSON array of integers.
    #[default]
    Byte,
    /// A standard Base64 string.
    Base64,
    /// A URL-safe Base64 string.
    Base64Url,
}

// -----------------------------------------------------------------------------
// BindConfig

/// Configuration consumed by an [`Engine`](crate::Engine).
///
/// Assembled with `with_*` builder methods and frozen when the engine is
/// constructed.
///
/// # Examples
///
/// ```
/// use jb_bind::{BinaryDataStrategy, BindConfig};
/// use jb_bind::model::PropertyOrderStrategy;
///
/// let config = BindConfig::new()
///     .with_serialize_null_values(true)
///     .with_property_order_strategy(PropertyOrderStrategy::Reverse)
///     .with_binary_data_strategy(BinaryDataStrategy::Base64);
/// ```
#[derive(Clone, Default)]
pub struct BindConfig {
    naming: PropertyNamingStrategy,
    ordering: PropertyOrderStrategy,
    serialize_nulls: bool,
    binary_strategy: BinaryDataStrategy,
    fail_on_unknown: bool,
    strict_ijson: bool,
    date_format: DateFormat,
    number_format: Option<NumberFormat>,
    type_mapping: HashMap<BindType, BindType>,
    pub(crate) serializers: Vec<(BindType, ComponentRef<dyn UserSerializer>)>,
    pub(crate) deserializers: Vec<(BindType, ComponentRef<dyn UserDeserializer>)>,
    pub(crate) adapters: Vec<ComponentRef<dyn BindAdapter>>,
}

impl BindConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property_naming_strategy(mut self, strategy: PropertyNamingStrategy) -> Self {
        self.naming = strategy;
        self
    }

    pub fn with_property_order_strategy(mut self, strategy: PropertyOrderStrategy) -> Self {
        self.ordering = strategy;
        self
    }

    /// Whether `None` properties are written as explicit JSON nulls.
    /// Defaults to `false`: absent properties are omitted.
    pub fn with_serialize_null_values(mut self, serialize: bool) -> Self {
        self.serialize_nulls = serialize;
        self
    }

    pub fn with_binary_data_strategy(mut self, strategy: BinaryDataStrategy) -> Self {
        self.binary_strategy = strategy;
        self
    }

    /// Whether a document member with no matching property fails the call
    /// instead of being skipped structurally.
    pub fn with_fail_on_unknown_properties(mut self, fail: bool) -> Self {
        self.fail_on_unknown = fail;
        self
    }

    /// Strict I-JSON interoperability: forces URL-safe Base64 for binary
    /// payloads and rejects scalar root values.
    pub fn with_strict_ijson(mut self, strict: bool) -> Self {
        self.strict_ijson = strict;
        self
    }

    /// Engine-wide date/time representation; class and property formats
    /// override it.
    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.date_format = format;
        self
    }

    /// Engine-wide number format; class and property formats override it.
    pub fn with_number_format(mut self, format: NumberFormat) -> Self {
        self.number_format = Some(format);
        self
    }

    /// Maps an abstract declared type to the concrete class deserialized
    /// in its place.
    pub fn with_type_mapping(mut self, from: BindType, to: BindType) -> Self {
        self.type_mapping.insert(from, to);
        self
    }

    /// Registers a serializer for a type.
    pub fn with_serializer<S: UserSerializer + 'static>(
        mut self,
        ty: BindType,
        serializer: S,
    ) -> Self {
        self.serializers.push((ty, ComponentRef::<dyn UserSerializer>::new(serializer)));
        self
    }

    /// Registers a deserializer for a type.
    pub fn with_deserializer<D: UserDeserializer + 'static>(
        mut self,
        ty: BindType,
        deserializer: D,
    ) -> Self {
        self.deserializers
            .push((ty, ComponentRef::<dyn UserDeserializer>::new(deserializer)));
        self
    }

    /// Registers an adapter; the bound type is the adapter's original
    /// type.
    pub fn with_adapter<A: BindAdapter + 'static>(mut self, adapter: A) -> Self {
        self.adapters.push(ComponentRef::<dyn BindAdapter>::new(adapter));
        self
    }

    // -- accessors ----------------------------------------------------------

    #[inline]
    pub fn property_naming_strategy(&self) -> PropertyNamingStrategy {
        self.naming
    }

    #[inline]
    pub fn property_order_strategy(&self) -> PropertyOrderStrategy {
        self.ordering
    }

    #[inline]
    pub fn serialize_null_values(&self) -> bool {
        self.serialize_nulls
    }

    /// The effective binary strategy: strict I-JSON overrides everything
    /// with URL-safe Base64.
    pub fn binary_data_strategy(&self) -> BinaryDataStrategy {
        if self.strict_ijson {
            BinaryDataStrategy::Base64Url
        } else {
            self.binary_strategy
        }
    }

    #[inline]
    pub fn fail_on_unknown_properties(&self) -> bool {
        self.fail_on_unknown
    }

    #[inline]
    pub fn strict_ijson(&self) -> bool {
        self.strict_ijson
    }

    #[inline]
    pub fn date_format(&self) -> &DateFormat {
        &self.date_format
    }

    #[inline]
    pub fn number_format(&self) -> Option<&NumberFormat> {
        self.number_format.as_ref()
    }

    /// The registered implementation for an abstract type, if any.
    pub fn type_mapping(&self, from: &BindType) -> Option<&BindType> {
        self.type_mapping.get(from)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{BinaryDataStrategy, BindConfig};

    #[test]
    fn strict_ijson_forces_url_safe_base64() {
        let config = BindConfig::new().with_binary_data_strategy(BinaryDataStrategy::Byte);
        assert_eq!(config.binary_data_strategy(), BinaryDataStrategy::Byte);

        let config = config.with_strict_ijson(true);
        assert_eq!(config.binary_data_strategy(), BinaryDataStrategy::Base64Url);
    }
}
