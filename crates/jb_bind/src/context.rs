//! Engine-wide shared state.

use crate::component::ComponentMatcher;
use crate::config::BindConfig;
use crate::de::DeserializationModelCreator;
use crate::desc::{BindType, Customization, DateFormat, NumberFormat};
use crate::model::MappingContext;
use crate::ser::SerializationModelCreator;

/// Everything one engine instance shares across calls: configuration, the
/// class-model cache, the component registry and the chain caches.
///
/// Never global; always passed by reference through the contexts.
pub(crate) struct BindContext {
    pub(crate) config: BindConfig,
    pub(crate) mapping: MappingContext,
    pub(crate) components: ComponentMatcher,
    pub(crate) serializers: SerializationModelCreator,
    pub(crate) deserializers: DeserializationModelCreator,
}

impl BindContext {
    pub(crate) fn new(config: BindConfig) -> Self {
        let mapping = MappingContext::new(
            config.property_naming_strategy(),
            config.property_order_strategy(),
        );

        let mut components = ComponentMatcher::new();
        for (ty, serializer) in &config.serializers {
            components.register_serializer(ty.clone(), serializer.clone());
        }
        for (ty, deserializer) in &config.deserializers {
            components.register_deserializer(ty.clone(), deserializer.clone());
        }
        for adapter in &config.adapters {
            components.register_adapter(adapter.clone());
        }

        Self {
            config,
            mapping,
            components,
            serializers: SerializationModelCreator::new(),
            deserializers: DeserializationModelCreator::new(),
        }
    }
}

// -----------------------------------------------------------------------------
// CachedItem

/// Chain cache key: two otherwise-identical types with different
/// formatting customizations get distinct cached chains.
#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct CachedItem {
    ty: BindType,
    number_format: Option<NumberFormat>,
    date_format: DateFormat,
}

impl CachedItem {
    /// Builds the key from the type and the formats the chain will
    /// actually use (customization first, engine default second).
    pub(crate) fn new(ty: &BindType, customization: &Customization, config: &BindConfig) -> Self {
        Self {
            ty: ty.clone(),
            number_format: customization
                .number_format
                .clone()
                .or_else(|| config.number_format().cloned()),
            date_format: customization
                .date_format
                .clone()
                .unwrap_or_else(|| config.date_format().clone()),
        }
    }
}
