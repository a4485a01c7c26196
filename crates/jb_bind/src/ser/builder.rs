//! Composition of serializer chains.

use std::sync::{Arc, PoisonError, RwLock};

use hashbrown::HashMap;

use crate::context::{BindContext, CachedItem};
use crate::desc::{BindType, ClassDesc, Customization, TypeDesc};
use crate::error::BindError;
use crate::format::{CompiledDateFormat, CompiledNumberFormat};
use crate::resolve::resolve_type;

use super::ModelSerializer;
use super::serializers::{AdapterSerializer, ArraySerializer, BytesSerializer};
use super::serializers::{CollectionSerializer, CyclicSerializer, DynamicSerializer};
use super::serializers::{KeyWriter, MapEntriesSerializer, MapStringSerializer};
use super::serializers::{ObjectSerializer, OptionalSerializer, UserSerializerNode};
use super::serializers::WrapperSerializer;
use super::types::ScalarSerializer;

type ArcSerializer = Arc<dyn ModelSerializer>;

/// Creates — or returns already created — serializer chains.
///
/// Chains are cached by (type, formatting customization). Construction
/// happens without holding the cache lock, since composing one chain can
/// recursively compose the chains of nested types; concurrent first-time
/// builds race benignly and the first completed insert wins.
pub struct SerializationModelCreator {
    chains: RwLock<HashMap<CachedItem, ArcSerializer>>,
}

impl SerializationModelCreator {
    pub(crate) fn new() -> Self {
        Self {
            chains: RwLock::new(HashMap::new()),
        }
    }

    /// Chain for a root or dynamically dispatched value.
    pub(crate) fn serializer_chain(
        &self,
        engine: &BindContext,
        ty: &BindType,
        root: bool,
    ) -> Result<ArcSerializer, BindError> {
        // Checked ahead of the cache: a chain composed for a member
        // position is perfectly reusable at the root, the position is not.
        if root
            && engine.config.strict_ijson()
            && matches!(ty.desc(), Some(TypeDesc::Scalar(_)))
        {
            return Err(BindError::ScalarRootForbidden);
        }
        let customization = match ty.desc() {
            Some(TypeDesc::Class(class)) => Customization::of_class(class.customization()),
            _ => Customization::empty(),
        };
        let mut stack = Vec::new();
        self.chain(engine, &mut stack, ty, &customization)
    }

    /// Chain for a known (type, customization) pair; used by the lazy
    /// self-reference step once the cycle is complete.
    pub(crate) fn chain_for(
        &self,
        engine: &BindContext,
        ty: &BindType,
        customization: &Customization,
    ) -> Result<ArcSerializer, BindError> {
        let mut stack = Vec::new();
        self.chain(engine, &mut stack, ty, customization)
    }

    fn lookup(&self, key: &CachedItem) -> Option<ArcSerializer> {
        self.chains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn insert(&self, key: CachedItem, chain: ArcSerializer) -> ArcSerializer {
        let mut chains = self.chains.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(chains.entry(key).or_insert(chain))
    }

    /// Cycle-guarded entry: a type already on the in-progress stack gets a
    /// lazy placeholder instead of endless unrolling.
    fn chain(
        &self,
        engine: &BindContext,
        stack: &mut Vec<BindType>,
        ty: &BindType,
        customization: &Customization,
    ) -> Result<ArcSerializer, BindError> {
        if stack.contains(ty) {
            return Ok(Arc::new(CyclicSerializer::new(
                ty.clone(),
                customization.clone(),
            )));
        }
        stack.push(ty.clone());
        let result = self.chain_internal(engine, stack, ty, customization, true);
        stack.pop();
        result
    }

    fn chain_internal(
        &self,
        engine: &BindContext,
        stack: &mut Vec<BindType>,
        ty: &BindType,
        customization: &Customization,
        resolve_components: bool,
    ) -> Result<ArcSerializer, BindError> {
        let key = CachedItem::new(ty, customization, &engine.config);
        // Chains built under a component binding carried by a property
        // customization must not leak into the type-global cache.
        let cacheable = customization.serializer.is_none() && customization.adapter.is_none();
        if cacheable {
            if let Some(chain) = self.lookup(&key) {
                return Ok(chain);
            }
        }

        if resolve_components {
            if let Some(binding) = engine.components.serializer_binding(ty, customization) {
                let chain: ArcSerializer = Arc::new(KeyWriter::new(Arc::new(
                    UserSerializerNode::new(binding, ty.path().into()),
                )));
                return Ok(if cacheable {
                    self.insert(key, chain)
                } else {
                    chain
                });
            }
            if let Some(binding) = engine.components.adapter_binding(ty, customization) {
                let adapted = binding.component().adapted();
                // Re-resolving components for the adapted type is only
                // safe when the adapter does not map a type onto itself.
                let inner = if adapted == *ty {
                    self.chain_internal(engine, stack, &adapted, &Customization::empty(), false)?
                } else {
                    self.chain(engine, stack, &adapted, &Customization::empty())?
                };
                let chain: ArcSerializer = Arc::new(KeyWriter::new(Arc::new(
                    AdapterSerializer::new(binding, ty.path().into(), inner),
                )));
                return Ok(if cacheable {
                    self.insert(key, chain)
                } else {
                    chain
                });
            }
        }

        log::debug!("composing serializer chain for `{}`", ty.path());

        let Some(desc) = ty.desc() else {
            // Dynamic position: dispatch by runtime descriptor per value.
            let chain: ArcSerializer = Arc::new(KeyWriter::new(Arc::new(DynamicSerializer)));
            return Ok(self.insert(key, chain));
        };

        let chain: ArcSerializer = match desc {
            TypeDesc::Scalar(scalar) => {
                let leaf = ScalarSerializer::new(
                    scalar.kind(),
                    self.number_format(engine, customization),
                    self.date_format(engine, customization)?,
                );
                Arc::new(KeyWriter::new(Arc::new(leaf))) as ArcSerializer
            }
            TypeDesc::Bytes(bytes) => {
                let leaf = BytesSerializer::new(bytes, engine.config.binary_data_strategy());
                Arc::new(KeyWriter::new(Arc::new(leaf)))
            }
            TypeDesc::Optional(optional) => {
                let inner_ty = resolve_type(stack, optional.inner());
                let inner = self.chain(engine, stack, &inner_ty, customization)?;
                let nillable = customization
                    .nillable
                    .unwrap_or_else(|| engine.config.serialize_null_values());
                Arc::new(OptionalSerializer::new(optional, inner, nillable))
            }
            TypeDesc::List(list) => {
                let element_ty = resolve_type(stack, list.element());
                let element_customization = element_customization(&element_ty);
                let inner =
                    self.chain(engine, stack, &element_ty, &element_customization)?;
                Arc::new(KeyWriter::new(Arc::new(CollectionSerializer::new(
                    list, inner,
                ))))
            }
            TypeDesc::Array(array) => {
                let element_ty = resolve_type(stack, array.element());
                let element_customization = element_customization(&element_ty);
                let inner =
                    self.chain(engine, stack, &element_ty, &element_customization)?;
                Arc::new(KeyWriter::new(Arc::new(ArraySerializer::new(array, inner))))
            }
            TypeDesc::Map(map) => {
                let key_ty = resolve_type(stack, map.key());
                let value_ty = resolve_type(stack, map.value());
                let value_chain =
                    self.chain(engine, stack, &value_ty, customization)?;
                let key_kind = key_ty
                    .desc()
                    .and_then(TypeDesc::as_scalar)
                    .map(|scalar| scalar.kind());
                match key_kind.filter(|kind| kind.is_key_stringifiable()) {
                    Some(kind) => Arc::new(KeyWriter::new(Arc::new(MapStringSerializer::new(
                        map,
                        kind,
                        value_chain,
                    )))),
                    None => {
                        let key_chain =
                            self.chain(engine, stack, &key_ty, &Customization::empty())?;
                        Arc::new(KeyWriter::new(Arc::new(MapEntriesSerializer::new(
                            map,
                            key_chain,
                            value_chain,
                        ))))
                    }
                }
            }
            TypeDesc::Wrapper(wrapper) => {
                let inner_ty = resolve_type(stack, wrapper.inner());
                let inner = self.chain(engine, stack, &inner_ty, customization)?;
                Arc::new(WrapperSerializer::new(wrapper, inner))
            }
            TypeDesc::Dynamic(_) => Arc::new(KeyWriter::new(Arc::new(DynamicSerializer))),
            TypeDesc::Class(class) => self.object_chain(engine, stack, ty, class)?,
        };

        Ok(if cacheable {
            self.insert(key, chain)
        } else {
            chain
        })
    }

    fn object_chain(
        &self,
        engine: &BindContext,
        stack: &mut Vec<BindType>,
        ty: &BindType,
        class: &'static ClassDesc,
    ) -> Result<ArcSerializer, BindError> {
        // An abstract declared type never matches the value's concrete
        // type; dispatch by the runtime descriptor instead.
        if class.is_abstract() {
            return Ok(Arc::new(KeyWriter::new(Arc::new(DynamicSerializer))));
        }

        let model = engine.mapping.class_model(class)?;
        let discriminators = discriminators_for(class, ty)?;

        let mut properties = Vec::new();
        for property in model.properties() {
            let Some(getter) = property.getter() else {
                continue;
            };
            if discriminators
                .iter()
                .any(|(field, _)| &**field == property.write_name())
            {
                return Err(BindError::DuplicateProperty {
                    kind: "readable",
                    name: property.write_name().to_string(),
                    type_path: class.ty().path().to_string(),
                });
            }
            let member_ty = resolve_type(stack, property.ty());
            let member_customization = Customization::of_property(property.customization());
            let chain = self.chain(engine, stack, &member_ty, &member_customization)?;
            properties.push((Box::from(property.write_name()), getter, chain));
        }

        Ok(Arc::new(KeyWriter::new(Arc::new(ObjectSerializer::new(
            discriminators,
            properties,
        )))))
    }

    fn number_format(
        &self,
        engine: &BindContext,
        customization: &Customization,
    ) -> Option<CompiledNumberFormat> {
        customization
            .number_format
            .as_ref()
            .or_else(|| engine.config.number_format())
            .map(CompiledNumberFormat::compile)
    }

    fn date_format(
        &self,
        engine: &BindContext,
        customization: &Customization,
    ) -> Result<CompiledDateFormat, BindError> {
        let format = customization
            .date_format
            .as_ref()
            .unwrap_or_else(|| engine.config.date_format());
        CompiledDateFormat::compile(format)
    }
}

/// Container elements inherit the class customization of their element
/// type, when it has one.
fn element_customization(element_ty: &BindType) -> Customization {
    match element_ty.desc() {
        Some(TypeDesc::Class(class)) => Customization::of_class(class.customization()),
        _ => Customization::empty(),
    }
}

/// Discriminator members for a concrete class: the configurations of the
/// hierarchy from the outermost parent inward, each contributing its
/// field name and this class's registered alias.
fn discriminators_for(
    class: &'static ClassDesc,
    ty: &BindType,
) -> Result<Vec<(Box<str>, Box<str>)>, BindError> {
    let mut configs = Vec::new();
    let mut current = Some(class);
    while let Some(level) = current {
        if let Some(config) = level.customization().polymorphism() {
            configs.push(config);
        }
        current = level
            .customization()
            .polymorphism_parent()
            .and_then(|parent| parent().as_class());
    }

    let mut out = Vec::new();
    for config in configs.into_iter().rev() {
        if let Some(alias) = config.alias_of(ty) {
            out.push((Box::from(config.field()), Box::from(alias)));
        }
    }
    Ok(out)
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BindConfig;
    use crate::desc::{DateFormat, NumberFormat};

    #[test]
    fn chains_are_cached_per_type_and_format() {
        let engine = BindContext::new(BindConfig::new());
        let ty = BindType::of::<i32>();

        let a = engine
            .serializers
            .serializer_chain(&engine, &ty, false)
            .unwrap();
        let b = engine
            .serializers
            .serializer_chain(&engine, &ty, false)
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn formats_split_the_cache() {
        let engine = BindContext::new(BindConfig::new());
        let ty = BindType::of::<f64>();

        let plain = engine
            .serializers
            .chain_for(&engine, &ty, &Customization::empty())
            .unwrap();

        let mut formatted = Customization::empty();
        formatted.number_format = Some(NumberFormat::new("#0.00"));
        formatted.date_format = Some(DateFormat::UnixMillis);
        let with_format = engine
            .serializers
            .chain_for(&engine, &ty, &formatted)
            .unwrap();

        assert!(!Arc::ptr_eq(&plain, &with_format));
    }
}
