//! Composition of deserializer chains.

use std::sync::{Arc, PoisonError, RwLock};

use hashbrown::{HashMap, HashSet};

use crate::context::{BindContext, CachedItem};
use crate::desc::{BindType, ClassDesc, Customization, TypeDesc};
use crate::error::BindError;
use crate::format::{CompiledDateFormat, CompiledNumberFormat};
use crate::resolve::resolve_type;

use super::deserializers::{AbstractTypeFail, AdapterDeserializer, ArrayDeserializer};
use super::deserializers::{BytesDeserializer, CollectionDeserializer, ContextSwitch};
use super::deserializers::CreatorDeserializer;
use super::deserializers::{CyclicDeserializer, DefaultObjectInstanceCreator};
use super::deserializers::{DynamicDeserializer, Expected, MapDeserializer, MemberTable};
use super::deserializers::{NullCheckDeserializer, ObjectDeserializer, OptionalDeserializer};
use super::deserializers::{ParamDefault, ParamSlot, PolymorphismDeserializer};
use super::deserializers::{PositionChecker, Receive, UserDeserializerNode, WrapperDeserializer};
use super::types::ScalarDeserializer;
use super::{ModelDeserializer, Receiver};

type ArcDeserializer = Arc<dyn ModelDeserializer>;

/// Creates — or returns already created — deserializer chains.
///
/// The cache key is (type, formatting customization); construction runs
/// outside the lock and the first completed insert wins, mirroring the
/// serialization side.
pub struct DeserializationModelCreator {
    chains: RwLock<HashMap<CachedItem, ArcDeserializer>>,
}

impl DeserializationModelCreator {
    pub(crate) fn new() -> Self {
        Self {
            chains: RwLock::new(HashMap::new()),
        }
    }

    /// Chain for a root value or a polymorphic dispatch target.
    pub(crate) fn deserializer_chain(
        &self,
        engine: &BindContext,
        ty: &BindType,
    ) -> Result<ArcDeserializer, BindError> {
        let customization = match ty.desc() {
            Some(TypeDesc::Class(class)) => Customization::of_class(class.customization()),
            _ => Customization::empty(),
        };
        self.chain_for(engine, ty, &customization)
    }

    /// Chain for a known (type, customization) pair.
    pub(crate) fn chain_for(
        &self,
        engine: &BindContext,
        ty: &BindType,
        customization: &Customization,
    ) -> Result<ArcDeserializer, BindError> {
        let mut stack = Vec::new();
        self.chain(engine, &mut stack, ty, customization)
    }

    fn lookup(&self, key: &CachedItem) -> Option<ArcDeserializer> {
        self.chains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn insert(&self, key: CachedItem, chain: ArcDeserializer) -> ArcDeserializer {
        let mut chains = self.chains.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(chains.entry(key).or_insert(chain))
    }

    /// Cycle-guarded entry; a type already being composed gets the lazy
    /// self-reference step instead of endless unrolling.
    fn chain(
        &self,
        engine: &BindContext,
        stack: &mut Vec<BindType>,
        ty: &BindType,
        customization: &Customization,
    ) -> Result<ArcDeserializer, BindError> {
        if stack.contains(ty) {
            return Ok(Arc::new(CyclicDeserializer::new(
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
    ) -> Result<ArcDeserializer, BindError> {
        let key = CachedItem::new(ty, customization, &engine.config);
        let cacheable =
            customization.deserializer.is_none() && customization.adapter.is_none();
        if cacheable {
            if let Some(chain) = self.lookup(&key) {
                return Ok(chain);
            }
        }

        // A registered type mapping redirects the whole chain.
        if let Some(mapped) = engine.config.type_mapping(ty) {
            if mapped != ty {
                let mapped = mapped.clone();
                let chain = self.chain(engine, stack, &mapped, customization)?;
                return Ok(if cacheable {
                    self.insert(key, chain)
                } else {
                    chain
                });
            }
        }

        if resolve_components {
            if let Some(binding) = engine.components.deserializer_binding(ty, customization) {
                let chain: ArcDeserializer =
                    Arc::new(UserDeserializerNode::new(binding, ty.path().into()));
                return Ok(if cacheable {
                    self.insert(key, chain)
                } else {
                    chain
                });
            }
            if let Some(binding) = engine.components.adapter_binding(ty, customization) {
                let adapted = binding.component().adapted();
                let inner = if adapted == *ty {
                    self.chain_internal(engine, stack, &adapted, &Customization::empty(), false)?
                } else {
                    self.chain(engine, stack, &adapted, &Customization::empty())?
                };
                let chain: ArcDeserializer = Arc::new(AdapterDeserializer::new(
                    binding,
                    inner,
                    ty.path().into(),
                ));
                return Ok(if cacheable {
                    self.insert(key, chain)
                } else {
                    chain
                });
            }
        }

        log::debug!("composing deserializer chain for `{}`", ty.path());

        let Some(desc) = ty.desc() else {
            let chain: ArcDeserializer = Arc::new(DynamicDeserializer);
            return Ok(self.insert(key, chain));
        };

        let path: Box<str> = ty.path().into();
        let chain: ArcDeserializer = match desc {
            TypeDesc::Scalar(scalar) => {
                let leaf = ScalarDeserializer::new(
                    scalar.kind(),
                    self.number_format(engine, customization),
                    self.date_format(engine, customization)?,
                );
                Arc::new(PositionChecker::new(Expected::Values, Arc::new(leaf), path))
            }
            TypeDesc::Bytes(bytes) => {
                let strategy = engine.config.binary_data_strategy();
                let expected = match strategy {
                    crate::config::BinaryDataStrategy::Byte => Expected::StartArray,
                    _ => Expected::Text,
                };
                let leaf = BytesDeserializer::new(bytes, strategy);
                Arc::new(NullCheckDeserializer::new(Arc::new(PositionChecker::new(
                    expected,
                    Arc::new(leaf),
                    path,
                ))))
            }
            TypeDesc::Optional(optional) => {
                let inner_ty = resolve_type(stack, optional.inner());
                let inner = self.chain(engine, stack, &inner_ty, customization)?;
                Arc::new(OptionalDeserializer::new(optional, inner))
            }
            TypeDesc::List(list) => {
                let element_ty = resolve_type(stack, list.element());
                let element = self.element_chain(engine, stack, &element_ty)?;
                let collection =
                    CollectionDeserializer::new(list, element, element_ty.path().into());
                Arc::new(NullCheckDeserializer::new(Arc::new(PositionChecker::new(
                    Expected::StartArray,
                    Arc::new(collection),
                    path,
                ))))
            }
            TypeDesc::Array(array) => {
                let element_ty = resolve_type(stack, array.element());
                let element = self.element_chain(engine, stack, &element_ty)?;
                let items = ArrayDeserializer::new(array, element, element_ty.path().into());
                Arc::new(NullCheckDeserializer::new(Arc::new(PositionChecker::new(
                    Expected::StartArray,
                    Arc::new(items),
                    path,
                ))))
            }
            TypeDesc::Map(map) => {
                let key_ty = resolve_type(stack, map.key());
                let value_ty = resolve_type(stack, map.value());
                let key_chain =
                    self.chain(engine, stack, &key_ty, &Customization::empty())?;
                let value_chain = self.chain(engine, stack, &value_ty, customization)?;
                let key_kind = key_ty
                    .desc()
                    .and_then(TypeDesc::as_scalar)
                    .map(|scalar| scalar.kind())
                    .filter(|kind| kind.is_key_stringifiable());
                let entries =
                    MapDeserializer::new(map, key_kind, key_chain, value_chain, path.clone());
                Arc::new(NullCheckDeserializer::new(Arc::new(PositionChecker::new(
                    Expected::Container,
                    Arc::new(entries),
                    path,
                ))))
            }
            TypeDesc::Wrapper(wrapper) => {
                let inner_ty = resolve_type(stack, wrapper.inner());
                let inner = self.chain(engine, stack, &inner_ty, customization)?;
                Arc::new(WrapperDeserializer::new(wrapper, inner))
            }
            TypeDesc::Dynamic(_) => Arc::new(DynamicDeserializer),
            TypeDesc::Class(class) => {
                self.object_chain(engine, stack, ty, class, customization)?
            }
        };

        Ok(if cacheable {
            self.insert(key, chain)
        } else {
            chain
        })
    }

    /// Collection and array elements bind through their element type's
    /// class customization.
    fn element_chain(
        &self,
        engine: &BindContext,
        stack: &mut Vec<BindType>,
        element_ty: &BindType,
    ) -> Result<ArcDeserializer, BindError> {
        let customization = match element_ty.desc() {
            Some(TypeDesc::Class(class)) => Customization::of_class(class.customization()),
            _ => Customization::empty(),
        };
        self.chain(engine, stack, element_ty, &customization)
    }

    fn object_chain(
        &self,
        engine: &BindContext,
        stack: &mut Vec<BindType>,
        ty: &BindType,
        class: &'static ClassDesc,
        customization: &Customization,
    ) -> Result<ArcDeserializer, BindError> {
        // Abstract classes deserialize through a mapped implementation,
        // or — in a polymorphic hierarchy — through the discriminator.
        let has_polymorphism = class.customization().polymorphism().is_some();
        if class.is_abstract() {
            let implementation = customization
                .implementation
                .clone()
                .or_else(|| engine.config.type_mapping(ty).cloned());
            match implementation {
                Some(mapped) => return self.chain(engine, stack, &mapped, customization),
                None if !has_polymorphism => {
                    return Err(BindError::CannotInferType {
                        type_path: class.ty().path().to_string(),
                    });
                }
                None => {}
            }
        }

        let model = engine.mapping.class_model(class)?;
        let naming = engine.config.property_naming_strategy();
        let case_insensitive = naming.is_case_insensitive();
        let path: Box<str> = ty.path().into();

        let creator = model.creator();
        let mut params = Vec::new();
        let mut param_names = Vec::new();
        if let Some(creator) = creator {
            for param in creator.params() {
                let json_name = match param.customization().rename() {
                    Some(rename) => rename.to_string(),
                    None => naming.apply(param.name()),
                };
                param_names.push(json_name.clone());
                let resolved = resolve_type(stack, param.ty());
                params.push(ParamSlot {
                    name: json_name.into(),
                    required: param.customization().required(),
                    default: param_default(&resolved),
                });
            }
        }

        let mut processors: HashMap<Box<str>, ArcDeserializer> = HashMap::new();

        // Setter-bound properties; under a creator they are deferred until
        // the instance exists.
        for property in model.properties() {
            let Some(setter) = property.setter() else {
                continue;
            };
            if param_names.iter().any(|name| name == property.read_name()) {
                continue;
            }
            let receiver = if creator.is_some() {
                Receiver::Defer(setter)
            } else {
                Receiver::Set(setter)
            };
            let member_ty = resolve_type(stack, property.ty());
            let member_customization = Customization::of_property(property.customization());
            let processor =
                self.member_processor(engine, stack, &member_ty, &member_customization, receiver)?;
            processors.insert(normalize(property.read_name(), case_insensitive), processor);
        }

        if let Some(creator) = creator {
            for (index, param) in creator.params().iter().enumerate() {
                let member_ty = resolve_type(stack, param.ty());
                let member_customization = Customization::of_property(param.customization());
                let processor = self.member_processor(
                    engine,
                    stack,
                    &member_ty,
                    &member_customization,
                    Receiver::CreatorArg(index),
                )?;
                processors.insert(normalize(&param_names[index], case_insensitive), processor);
            }
        }

        // Discriminator members of the hierarchy are reserved names and
        // never unknown, even with fail-on-unknown enabled.
        let ignored = discriminator_fields(class);

        let members = MemberTable::new(
            processors,
            ignored,
            engine.config.fail_on_unknown_properties(),
            case_insensitive,
            path.clone(),
        );

        let instance: ArcDeserializer = if class.is_abstract() {
            // Reached only when the discriminator named no subclass.
            Arc::new(AbstractTypeFail::new(path.clone()))
        } else {
            match creator {
                Some(creator) => Arc::new(CreatorDeserializer::new(
                    members,
                    params,
                    creator,
                    path.clone(),
                )),
                None => {
                    if !class.has_default_constructor() {
                        return Err(BindError::NoDefaultConstructor {
                            type_path: class.ty().path().to_string(),
                        });
                    }
                    Arc::new(DefaultObjectInstanceCreator::new(
                        class,
                        Arc::new(ObjectDeserializer::new(members)),
                    ))
                }
            }
        };

        let mut checked: ArcDeserializer =
            Arc::new(PositionChecker::new(Expected::StartObject, instance, path.clone()));

        if let Some(config) = class.customization().polymorphism() {
            let poly =
                PolymorphismDeserializer::new(config, ty.clone(), checked, path.clone());
            checked = Arc::new(PositionChecker::new(
                Expected::StartObject,
                Arc::new(poly),
                path,
            ));
        }

        Ok(Arc::new(NullCheckDeserializer::new(Arc::new(
            ContextSwitch::new(checked),
        ))))
    }

    /// One member or creator-parameter processor: the full chain of the
    /// member type feeding its receiver.
    fn member_processor(
        &self,
        engine: &BindContext,
        stack: &mut Vec<BindType>,
        ty: &BindType,
        customization: &Customization,
        receiver: Receiver,
    ) -> Result<ArcDeserializer, BindError> {
        let inner = self.chain(engine, stack, ty, customization)?;
        Ok(Arc::new(Receive::new(receiver, inner)))
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

fn normalize(name: &str, case_insensitive: bool) -> Box<str> {
    if case_insensitive {
        name.to_lowercase().into()
    } else {
        name.into()
    }
}

fn param_default(resolved: &BindType) -> ParamDefault {
    match resolved.desc() {
        Some(TypeDesc::Scalar(scalar)) => ParamDefault::Scalar(scalar.kind()),
        Some(TypeDesc::Optional(optional)) => ParamDefault::Optional(optional),
        _ => ParamDefault::None,
    }
}

/// Discriminator field names of the whole hierarchy this class belongs
/// to.
fn discriminator_fields(class: &'static ClassDesc) -> HashSet<Box<str>> {
    let mut fields = HashSet::new();
    let mut current = Some(class);
    while let Some(level) = current {
        if let Some(config) = level.customization().polymorphism() {
            fields.insert(Box::from(config.field()));
        }
        current = level
            .customization()
            .polymorphism_parent()
            .and_then(|parent| parent().as_class());
    }
    fields
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BindConfig;

    #[test]
    fn chains_are_cached() {
        let engine = BindContext::new(BindConfig::new());
        let ty = BindType::of::<Vec<i32>>();
        let a = engine
            .deserializers
            .deserializer_chain(&engine, &ty)
            .unwrap();
        let b = engine
            .deserializers
            .deserializer_chain(&engine, &ty)
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
