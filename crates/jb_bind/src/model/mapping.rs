//! The class-model cache.

use core::any::TypeId;
use std::sync::{Arc, PoisonError, RwLock};

use hashbrown::{HashMap, HashSet};

use crate::desc::{ClassDesc, PropertyDesc, TypeDesc};
use crate::error::BindError;
use crate::model::{ClassModel, PropertyModel, PropertyNamingStrategy, PropertyOrderStrategy};

/// Per-engine cache of merged [`ClassModel`]s, keyed by class identity.
///
/// Models are built lazily on first encounter. Construction happens
/// outside the lock — it may recursively build base models — and is
/// idempotent, so concurrent first-time builders race benignly and the
/// first completed insert wins.
pub struct MappingContext {
    naming: PropertyNamingStrategy,
    ordering: PropertyOrderStrategy,
    models: RwLock<HashMap<TypeId, Arc<ClassModel>>>,
}

impl MappingContext {
    pub fn new(naming: PropertyNamingStrategy, ordering: PropertyOrderStrategy) -> Self {
        Self {
            naming,
            ordering,
            models: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the model for `desc`, building and caching it on first use.
    pub fn class_model(&self, desc: &'static ClassDesc) -> Result<Arc<ClassModel>, BindError> {
        let id = desc.ty().id();
        if let Some(model) = self
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            return Ok(Arc::clone(model));
        }

        let model = Arc::new(self.build(desc)?);
        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(models.entry(id).or_insert(model)))
    }

    fn build(&self, desc: &'static ClassDesc) -> Result<ClassModel, BindError> {
        log::debug!("building class model for `{}`", desc.ty().path());

        // Base models are built (and cached) before their subclasses, so a
        // subclass merge always reads an already-merged parent.
        let base = match desc.base().and_then(|ty| ty.desc()) {
            Some(TypeDesc::Class(base_desc)) => Some(self.class_model(base_desc)?),
            _ => None,
        };

        let mut merged: Vec<PropertyModel> = Vec::new();
        if let Some(base) = &base {
            merged.extend(base.properties().iter().cloned());
        }
        for property in desc.properties() {
            self.merge_property(&mut merged, property);
        }

        let mut properties = match desc.customization().property_order() {
            // Explicit order wins outright and silently drops properties
            // it does not list.
            Some(order) => {
                let mut picked = Vec::with_capacity(order.len());
                for name in order {
                    if let Some(model) = merged.iter().find(|p| p.name() == &**name) {
                        picked.push(model.clone());
                    }
                }
                picked
            }
            None => {
                self.ordering.sort(&mut merged);
                merged
            }
        };

        // Renames may collapse distinct properties onto one JSON name.
        Self::check_unique(desc, &properties, true)?;
        Self::check_unique(desc, &properties, false)?;

        properties.shrink_to_fit();
        Ok(ClassModel {
            desc,
            properties: properties.into(),
        })
    }

    /// Merges one declared property over whatever the base chain already
    /// contributed under the same name: the most specific getter/setter
    /// wins per accessor, everything else comes from the override.
    fn merge_property(&self, merged: &mut Vec<PropertyModel>, property: &'static PropertyDesc) {
        let json_name = match property.customization().rename() {
            Some(rename) => rename.to_string(),
            None => self.naming.apply(property.name()),
        };
        let mut model = PropertyModel {
            name: property.name().into(),
            read_name: json_name.clone().into(),
            write_name: json_name.into(),
            ty: property.ty().clone(),
            getter: property.getter(),
            setter: property.setter(),
            customization: property.customization(),
        };

        if let Some(existing) = merged.iter_mut().find(|p| p.name() == property.name()) {
            if model.getter.is_none() {
                model.getter = existing.getter;
            }
            if model.setter.is_none() {
                model.setter = existing.setter;
            }
            *existing = model;
        } else {
            merged.push(model);
        }
    }

    fn check_unique(
        desc: &ClassDesc,
        properties: &[PropertyModel],
        readable: bool,
    ) -> Result<(), BindError> {
        let mut seen = HashSet::new();
        for property in properties {
            let (eligible, name) = if readable {
                (property.readable(), property.write_name())
            } else {
                (property.writable(), property.read_name())
            };
            if eligible && !seen.insert(name) {
                return Err(BindError::DuplicateProperty {
                    kind: if readable { "readable" } else { "writable" },
                    name: name.to_string(),
                    type_path: desc.ty().path().to_string(),
                });
            }
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::Described;
    use crate::desc::{BindType, DescCell, Getter, PropertyCustomization, Setter};

    #[derive(Default)]
    struct Base {
        id: i32,
        tag: String,
    }

    impl Described for Base {
        fn descriptor() -> &'static TypeDesc {
            static CELL: DescCell = DescCell::new();
            CELL.get_or_init(|| {
                TypeDesc::Class(
                    ClassDesc::new::<Base>("Base")
                        .with_default_constructor::<Base>()
                        .with_property(
                            PropertyDesc::new("id", BindType::of::<i32>())
                                .with_getter(Getter::new(|b: &Base| &b.id))
                                .with_setter(Setter::new(|b: &mut Base, v: i32| b.id = v)),
                        )
                        .with_property(
                            PropertyDesc::new("tag", BindType::of::<String>())
                                .with_getter(Getter::new(|b: &Base| &b.tag)),
                        ),
                )
            })
        }
    }

    // Overrides `tag` with a writable accessor while keeping Base's getter.
    #[derive(Default)]
    struct Child {
        tag: String,
    }

    impl Described for Child {
        fn descriptor() -> &'static TypeDesc {
            static CELL: DescCell = DescCell::new();
            CELL.get_or_init(|| {
                TypeDesc::Class(
                    ClassDesc::new::<Child>("Child")
                        .with_base(BindType::of::<Base>())
                        .with_default_constructor::<Child>()
                        .with_property(
                            PropertyDesc::new("tag", BindType::of::<String>())
                                .with_setter(Setter::new(|c: &mut Child, v: String| c.tag = v)),
                        ),
                )
            })
        }
    }

    fn class_desc(desc: &'static TypeDesc) -> &'static ClassDesc {
        match desc {
            TypeDesc::Class(class) => class,
            _ => panic!("expected a class descriptor"),
        }
    }

    #[test]
    fn lexicographic_order_is_default() {
        let mapping = MappingContext::new(
            PropertyNamingStrategy::default(),
            PropertyOrderStrategy::default(),
        );
        let model = mapping.class_model(class_desc(Base::descriptor())).unwrap();
        let names: Vec<&str> = model.properties().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["id", "tag"]);
    }

    #[test]
    fn base_merge_keeps_most_specific_accessors() {
        let mapping = MappingContext::new(
            PropertyNamingStrategy::default(),
            PropertyOrderStrategy::default(),
        );
        let model = mapping.class_model(class_desc(Child::descriptor())).unwrap();

        let tag = model
            .properties()
            .iter()
            .find(|p| p.name() == "tag")
            .unwrap();
        // Getter inherited from Base, setter from Child.
        assert!(tag.readable());
        assert!(tag.writable());

        // Base properties come along.
        assert!(model.properties().iter().any(|p| p.name() == "id"));
    }

    #[test]
    fn models_are_cached_per_class() {
        let mapping = MappingContext::new(
            PropertyNamingStrategy::default(),
            PropertyOrderStrategy::default(),
        );
        let a = mapping.class_model(class_desc(Base::descriptor())).unwrap();
        let b = mapping.class_model(class_desc(Base::descriptor())).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn duplicate_json_names_rejected() {
        #[derive(Default)]
        struct Clash {
            a: i32,
            b: i32,
        }

        impl Described for Clash {
            fn descriptor() -> &'static TypeDesc {
                static CELL: DescCell = DescCell::new();
                CELL.get_or_init(|| {
                    TypeDesc::Class(
                        ClassDesc::new::<Clash>("Clash")
                            .with_default_constructor::<Clash>()
                            .with_property(
                                PropertyDesc::new("a", BindType::of::<i32>())
                                    .with_getter(Getter::new(|c: &Clash| &c.a))
                                    .with_customization(
                                        PropertyCustomization::new().with_rename("same"),
                                    ),
                            )
                            .with_property(
                                PropertyDesc::new("b", BindType::of::<i32>())
                                    .with_getter(Getter::new(|c: &Clash| &c.b))
                                    .with_customization(
                                        PropertyCustomization::new().with_rename("same"),
                                    ),
                            ),
                    )
                })
            }
        }

        let mapping = MappingContext::new(
            PropertyNamingStrategy::default(),
            PropertyOrderStrategy::default(),
        );
        let err = mapping
            .class_model(class_desc(Clash::descriptor()))
            .unwrap_err();
        assert!(matches!(err, BindError::DuplicateProperty { .. }));
    }

    #[test]
    fn explicit_order_drops_unlisted() {
        #[derive(Default)]
        struct Ordered {
            a: i32,
            b: i32,
            c: i32,
        }

        impl Described for Ordered {
            fn descriptor() -> &'static TypeDesc {
                static CELL: DescCell = DescCell::new();
                CELL.get_or_init(|| {
                    TypeDesc::Class(
                        ClassDesc::new::<Ordered>("Ordered")
                            .with_default_constructor::<Ordered>()
                            .with_customization(
                                crate::desc::ClassCustomization::new()
                                    .with_property_order(vec!["c", "a"]),
                            )
                            .with_property(
                                PropertyDesc::new("a", BindType::of::<i32>())
                                    .with_getter(Getter::new(|o: &Ordered| &o.a)),
                            )
                            .with_property(
                                PropertyDesc::new("b", BindType::of::<i32>())
                                    .with_getter(Getter::new(|o: &Ordered| &o.b)),
                            )
                            .with_property(
                                PropertyDesc::new("c", BindType::of::<i32>())
                                    .with_getter(Getter::new(|o: &Ordered| &o.c)),
                            ),
                    )
                })
            }
        }

        let mapping = MappingContext::new(
            PropertyNamingStrategy::default(),
            PropertyOrderStrategy::default(),
        );
        let model = mapping
            .class_model(class_desc(Ordered::descriptor()))
            .unwrap();
        let names: Vec<&str> = model.properties().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["c", "a"]);
    }
}
