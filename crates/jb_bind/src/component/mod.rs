//! User components: serializers, deserializers, adapters, and the
//! matcher that resolves them for a runtime type.

use core::any::type_name;
use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use jb_json::{JsonGenerator, JsonParser};

use crate::bind::Bind;
use crate::de::DeserializationContext;
use crate::desc::{BindType, Customization, TypeDesc};
use crate::error::BindError;
use crate::ser::SerializationContext;

// -----------------------------------------------------------------------------
// Component traits

/// A user-supplied serializer; fully replaces chain construction for the
/// bound type.
///
/// Nested values can be delegated back to the engine through
/// [`SerializationContext::serialize`].
pub trait UserSerializer: Send + Sync {
    fn serialize(
        &self,
        value: &dyn Bind,
        generator: &mut dyn JsonGenerator,
        ctx: &mut SerializationContext<'_>,
    ) -> Result<(), BindError>;
}

/// A user-supplied deserializer; fully replaces chain construction for the
/// bound type.
///
/// Nested values can be delegated back to the engine through
/// [`DeserializationContext::deserialize`].
pub trait UserDeserializer: Send + Sync {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Box<dyn Bind>, BindError>;
}

/// A two-way adapter between an original type and an adapted type that the
/// engine already knows how to bind.
pub trait BindAdapter: Send + Sync {
    /// The type the adapter is bound for.
    fn original(&self) -> BindType;

    /// The type the engine binds in its place.
    fn adapted(&self) -> BindType;

    /// Original → adapted, used during serialization.
    fn to_adapted(&self, original: &dyn Bind) -> Result<Box<dyn Bind>, BindError>;

    /// Adapted → original, used during deserialization.
    fn from_adapted(&self, adapted: Box<dyn Bind>) -> Result<Box<dyn Bind>, BindError>;
}

// -----------------------------------------------------------------------------
// ComponentRef

/// A registered component plus its implementation name for diagnostics.
pub struct ComponentRef<T: ?Sized> {
    component: Arc<T>,
    name: &'static str,
}

impl<T: ?Sized> ComponentRef<T> {
    pub(crate) fn from_parts(component: Arc<T>, name: &'static str) -> Self {
        Self { component, name }
    }

    #[inline]
    pub fn component(&self) -> &T {
        &self.component
    }

    /// Implementation type name, carried into component-failure errors.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl ComponentRef<dyn UserSerializer> {
    pub fn new<S: UserSerializer + 'static>(component: S) -> Self {
        Self::from_parts(Arc::new(component), type_name::<S>())
    }
}

impl ComponentRef<dyn UserDeserializer> {
    pub fn new<D: UserDeserializer + 'static>(component: D) -> Self {
        Self::from_parts(Arc::new(component), type_name::<D>())
    }
}

impl ComponentRef<dyn BindAdapter> {
    pub fn new<A: BindAdapter + 'static>(component: A) -> Self {
        Self::from_parts(Arc::new(component), type_name::<A>())
    }
}

impl<T: ?Sized> Clone for ComponentRef<T> {
    fn clone(&self) -> Self {
        Self {
            component: Arc::clone(&self.component),
            name: self.name,
        }
    }
}

impl<T: ?Sized> fmt::Debug for ComponentRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentRef({})", self.name)
    }
}

// -----------------------------------------------------------------------------
// ComponentBindings

/// Bindings registered for one distinct type: at most one serializer, one
/// deserializer and one adapter.
#[derive(Default)]
pub(crate) struct ComponentBindings {
    serializer: Option<ComponentRef<dyn UserSerializer>>,
    deserializer: Option<ComponentRef<dyn UserDeserializer>>,
    adapter: Option<ComponentRef<dyn BindAdapter>>,
}

// -----------------------------------------------------------------------------
// ComponentMatcher

/// Resolves registered components for a runtime type.
///
/// Resolution order, short-circuiting at the first hit:
///
/// 1. the property/class customization carries a binding directly;
/// 2. an exact registered binding for the type;
/// 3. the base-descriptor chain, checked the same way;
/// 4. the generic structural comparison — only once a parameterized
///    binding has been registered at all.
pub struct ComponentMatcher {
    bindings: HashMap<BindType, ComponentBindings>,
    generic_components: bool,
}

impl ComponentMatcher {
    pub(crate) fn new() -> Self {
        Self {
            bindings: HashMap::new(),
            generic_components: false,
        }
    }

    fn entry(&mut self, ty: BindType) -> &mut ComponentBindings {
        // Registering the first parameterized binding enables the generic
        // match path for all future lookups.
        if matches!(ty, BindType::Parameterized { .. }) {
            self.generic_components = true;
        }
        self.bindings.entry(ty).or_default()
    }

    pub(crate) fn register_serializer(
        &mut self,
        ty: BindType,
        component: ComponentRef<dyn UserSerializer>,
    ) {
        self.entry(ty).serializer = Some(component);
    }

    pub(crate) fn register_deserializer(
        &mut self,
        ty: BindType,
        component: ComponentRef<dyn UserDeserializer>,
    ) {
        self.entry(ty).deserializer = Some(component);
    }

    pub(crate) fn register_adapter(&mut self, component: ComponentRef<dyn BindAdapter>) {
        let ty = component.component().original();
        self.entry(ty).adapter = Some(component);
    }

    /// Serializer applicable to `ty`, if any.
    pub fn serializer_binding(
        &self,
        ty: &BindType,
        customization: &Customization,
    ) -> Option<ComponentRef<dyn UserSerializer>> {
        if let Some(bound) = &customization.serializer {
            return Some(bound.clone());
        }
        self.search(ty, |bindings| bindings.serializer.clone())
    }

    /// Deserializer applicable to `ty`, if any.
    pub fn deserializer_binding(
        &self,
        ty: &BindType,
        customization: &Customization,
    ) -> Option<ComponentRef<dyn UserDeserializer>> {
        if let Some(bound) = &customization.deserializer {
            return Some(bound.clone());
        }
        self.search(ty, |bindings| bindings.deserializer.clone())
    }

    /// Adapter applicable to `ty`, if any.
    pub fn adapter_binding(
        &self,
        ty: &BindType,
        customization: &Customization,
    ) -> Option<ComponentRef<dyn BindAdapter>> {
        if let Some(bound) = &customization.adapter {
            return Some(bound.clone());
        }
        self.search(ty, |bindings| bindings.adapter.clone())
    }

    fn search<T>(
        &self,
        ty: &BindType,
        select: impl Fn(&ComponentBindings) -> Option<T>,
    ) -> Option<T> {
        let mut current = ty.clone();
        loop {
            if let Some(bindings) = self.bindings.get(&current) {
                if let Some(found) = select(bindings) {
                    return Some(found);
                }
            }
            if self.generic_components {
                if let Some(found) = self.generic_search(&current, &select) {
                    return Some(found);
                }
            }
            // Walk the base-descriptor chain, the class-hierarchy analog.
            match current.desc().and_then(TypeDesc::as_class).and_then(|c| c.base()) {
                Some(base) => current = base.clone(),
                None => return None,
            }
        }
    }

    /// Compares against parameterized bindings: same raw type, and every
    /// explicit type argument literally equal. Skipped entirely while no
    /// generic binding exists.
    fn generic_search<T>(
        &self,
        ty: &BindType,
        select: &impl Fn(&ComponentBindings) -> Option<T>,
    ) -> Option<T> {
        let raw = ty.desc()?.ty().id();
        for (bound, bindings) in &self.bindings {
            let BindType::Parameterized { raw: bound_raw, args } = bound else {
                continue;
            };
            if bound_raw().ty().id() != raw {
                continue;
            }
            if !ty.args().is_empty() && ty.args() != &args[..] {
                continue;
            }
            if let Some(found) = select(bindings) {
                return Some(found);
            }
        }
        None
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSer;
    impl UserSerializer for NullSer {
        fn serialize(
            &self,
            _value: &dyn Bind,
            generator: &mut dyn JsonGenerator,
            _ctx: &mut SerializationContext<'_>,
        ) -> Result<(), BindError> {
            Ok(generator.write_null()?)
        }
    }

    #[test]
    fn exact_match_first() {
        let mut matcher = ComponentMatcher::new();
        matcher.register_serializer(BindType::of::<i32>(), ComponentRef::<dyn UserSerializer>::new(NullSer));

        let hit = matcher.serializer_binding(&BindType::of::<i32>(), &Customization::empty());
        assert!(hit.is_some());

        let miss = matcher.serializer_binding(&BindType::of::<i64>(), &Customization::empty());
        assert!(miss.is_none());
    }

    #[test]
    fn customization_binding_wins() {
        let matcher = ComponentMatcher::new();
        let customization = {
            let property =
                crate::desc::PropertyCustomization::new().with_serializer(NullSer);
            Customization::of_property(&property)
        };
        assert!(
            matcher
                .serializer_binding(&BindType::of::<i32>(), &customization)
                .is_some()
        );
    }
}
