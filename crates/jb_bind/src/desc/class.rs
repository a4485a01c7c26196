//! Class descriptors: properties, accessors, creators.

use core::fmt;

use crate::bind::{AccessError, Bind, Described};
use crate::desc::{BindType, ClassCustomization, PropertyCustomization, Ty};

// -----------------------------------------------------------------------------
// Getter / Setter

/// Read capability of one property, resolved at descriptor-build time.
pub struct Getter {
    get: Box<dyn for<'a> Fn(&'a dyn Bind) -> Result<&'a dyn Bind, AccessError> + Send + Sync>,
}

impl Getter {
    /// Wraps a typed field projection.
    ///
    /// ```ignore
    /// Getter::new(|p: &Point| &p.x)
    /// ```
    pub fn new<T, R, F>(f: F) -> Self
    where
        T: Described,
        R: Described,
        F: for<'a> Fn(&'a T) -> &'a R + Send + Sync + 'static,
    {
        Self {
            get: Box::new(move |instance| {
                let Some(instance) = instance.downcast_ref::<T>() else {
                    return Err(AccessError::mismatch::<T>(instance.type_path()));
                };
                Ok(f(instance) as &dyn Bind)
            }),
        }
    }

    /// Reads the property from an erased instance.
    #[inline]
    pub fn get<'a>(&self, instance: &'a dyn Bind) -> Result<&'a dyn Bind, AccessError> {
        (self.get)(instance)
    }
}

impl fmt::Debug for Getter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Getter")
    }
}

/// Write capability of one property, resolved at descriptor-build time.
pub struct Setter {
    set: Box<dyn Fn(&mut dyn Bind, Box<dyn Bind>) -> Result<(), AccessError> + Send + Sync>,
}

impl Setter {
    /// Wraps a typed field assignment.
    ///
    /// ```ignore
    /// Setter::new(|p: &mut Point, v: i32| p.x = v)
    /// ```
    pub fn new<T, V, F>(f: F) -> Self
    where
        T: Described,
        V: Described,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self {
            set: Box::new(move |instance, value| {
                let value = value.take::<V>()?;
                let actual = instance.type_path();
                let Some(instance) = instance.downcast_mut::<T>() else {
                    return Err(AccessError::mismatch::<T>(actual));
                };
                f(instance, value);
                Ok(())
            }),
        }
    }

    /// Writes the property on an erased instance.
    #[inline]
    pub fn set(&self, instance: &mut dyn Bind, value: Box<dyn Bind>) -> Result<(), AccessError> {
        (self.set)(instance, value)
    }
}

impl fmt::Debug for Setter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Setter")
    }
}

// -----------------------------------------------------------------------------
// PropertyDesc

/// One property of a class descriptor.
///
/// A property without a getter is write-only; without a setter it is
/// read-only. The declared type may reference a class-level generic
/// parameter through [`BindType::Variable`].
#[derive(Debug)]
pub struct PropertyDesc {
    name: Box<str>,
    ty: BindType,
    getter: Option<Getter>,
    setter: Option<Setter>,
    customization: PropertyCustomization,
}

impl PropertyDesc {
    pub fn new(name: &str, ty: BindType) -> Self {
        Self {
            name: name.into(),
            ty,
            getter: None,
            setter: None,
            customization: PropertyCustomization::default(),
        }
    }

    pub fn with_getter(mut self, getter: Getter) -> Self {
        self.getter = Some(getter);
        self
    }

    pub fn with_setter(mut self, setter: Setter) -> Self {
        self.setter = Some(setter);
        self
    }

    pub fn with_customization(mut self, customization: PropertyCustomization) -> Self {
        self.customization = customization;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub const fn ty(&self) -> &BindType {
        &self.ty
    }

    #[inline]
    pub const fn getter(&self) -> Option<&Getter> {
        self.getter.as_ref()
    }

    #[inline]
    pub const fn setter(&self) -> Option<&Setter> {
        self.setter.as_ref()
    }

    #[inline]
    pub const fn customization(&self) -> &PropertyCustomization {
        &self.customization
    }
}

// -----------------------------------------------------------------------------
// Creator

/// Collected creator arguments, positionally matching the parameter list.
pub struct CreatorArgs(Vec<Option<Box<dyn Bind>>>);

impl CreatorArgs {
    pub(crate) fn new(args: Vec<Option<Box<dyn Bind>>>) -> Self {
        Self(args)
    }

    /// Number of parameter slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Takes the argument at `index` as a `T`.
    pub fn take<T: Described>(&mut self, index: usize) -> Result<T, AccessError> {
        match self.0.get_mut(index).and_then(Option::take) {
            Some(value) => value.take::<T>(),
            None => Err(AccessError::MissingArgument { index }),
        }
    }

    /// Takes the argument at `index`, or `None` when the document had no
    /// value for it.
    pub fn take_opt<T: Described>(&mut self, index: usize) -> Result<Option<T>, AccessError> {
        match self.0.get_mut(index).and_then(Option::take) {
            Some(value) => Ok(Some(value.take::<T>()?)),
            None => Ok(None),
        }
    }
}

/// One creator parameter: name, declared type, customization.
#[derive(Debug)]
pub struct CreatorParamDesc {
    name: Box<str>,
    ty: BindType,
    customization: PropertyCustomization,
}

impl CreatorParamDesc {
    pub fn new(name: &str, ty: BindType) -> Self {
        Self {
            name: name.into(),
            ty,
            customization: PropertyCustomization::default(),
        }
    }

    /// Marks the parameter as required: a document without it fails
    /// instead of falling back to the per-type default.
    pub fn required(mut self) -> Self {
        self.customization = self.customization.with_required(true);
        self
    }

    pub fn with_customization(mut self, customization: PropertyCustomization) -> Self {
        self.customization = customization;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub const fn ty(&self) -> &BindType {
        &self.ty
    }

    #[inline]
    pub const fn customization(&self) -> &PropertyCustomization {
        &self.customization
    }
}

/// A constructor or factory bound as the means of instantiating a class
/// from named document members.
pub struct CreatorDesc {
    params: Box<[CreatorParamDesc]>,
    factory: Box<dyn Fn(CreatorArgs) -> Result<Box<dyn Bind>, AccessError> + Send + Sync>,
}

impl CreatorDesc {
    /// Binds a factory to an ordered parameter list.
    ///
    /// The factory receives exactly `params.len()` argument slots.
    ///
    /// ```ignore
    /// CreatorDesc::new(
    ///     vec![
    ///         CreatorParamDesc::new("x", BindType::of::<i32>()),
    ///         CreatorParamDesc::new("y", BindType::of::<i32>()),
    ///     ],
    ///     |mut args| Ok(Box::new(Point::new(args.take(0)?, args.take(1)?))),
    /// )
    /// ```
    pub fn new(
        params: Vec<CreatorParamDesc>,
        factory: impl Fn(CreatorArgs) -> Result<Box<dyn Bind>, AccessError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            params: params.into(),
            factory: Box::new(factory),
        }
    }

    #[inline]
    pub fn params(&self) -> &[CreatorParamDesc] {
        &self.params
    }

    /// Instantiates the class from collected arguments.
    ///
    /// The argument arity must match the parameter arity.
    pub fn construct(&self, args: CreatorArgs) -> Result<Box<dyn Bind>, AccessError> {
        if args.len() != self.params.len() {
            return Err(AccessError::Arity {
                expected: self.params.len(),
                actual: args.len(),
            });
        }
        (self.factory)(args)
    }
}

impl fmt::Debug for CreatorDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreatorDesc")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// ClassDesc

/// Descriptor of a bean-like class.
pub struct ClassDesc {
    ty: Ty,
    name: Box<str>,
    generics: Box<[(Box<str>, BindType)]>,
    base: Option<BindType>,
    properties: Vec<PropertyDesc>,
    creator: Option<CreatorDesc>,
    default_ctor: Option<Box<dyn Fn() -> Box<dyn Bind> + Send + Sync>>,
    is_abstract: bool,
    customization: ClassCustomization,
}

impl ClassDesc {
    pub fn new<T: Described>(name: &str) -> Self {
        Self {
            ty: Ty::of::<T>(),
            name: name.into(),
            generics: Box::from([]),
            base: None,
            properties: Vec::new(),
            creator: None,
            default_ctor: None,
            is_abstract: false,
            customization: ClassCustomization::default(),
        }
    }

    /// Declares the class-level generic parameters, in order, with the
    /// type each is bound to in this instantiation.
    ///
    /// A binding may itself be a [`BindType::Variable`] when the
    /// enclosing descriptor is open as well; the resolver then continues
    /// one containment level further out.
    pub fn with_generics(mut self, generics: Vec<(&str, BindType)>) -> Self {
        self.generics = generics
            .into_iter()
            .map(|(name, ty)| (Box::from(name), ty))
            .collect();
        self
    }

    /// Declares a base descriptor whose properties are merged beneath
    /// this class's own.
    pub fn with_base(mut self, base: BindType) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_property(mut self, property: PropertyDesc) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_creator(mut self, creator: CreatorDesc) -> Self {
        self.creator = Some(creator);
        self
    }

    /// Uses `T::default()` as the default constructor.
    pub fn with_default_constructor<T: Described + Default>(mut self) -> Self {
        self.default_ctor = Some(Box::new(|| Box::new(T::default())));
        self
    }

    /// Uses an explicit closure as the default constructor.
    pub fn with_constructor(
        mut self,
        ctor: impl Fn() -> Box<dyn Bind> + Send + Sync + 'static,
    ) -> Self {
        self.default_ctor = Some(Box::new(ctor));
        self
    }

    /// Marks the class as abstract: it can be serialized through its
    /// properties but never instantiated directly.
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn with_customization(mut self, customization: ClassCustomization) -> Self {
        self.customization = customization;
        self
    }

    #[inline]
    pub const fn ty(&self) -> &Ty {
        &self.ty
    }

    /// The short class name used in diagnostics.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instantiated generic parameter table, in declaration order.
    pub fn generics(&self) -> impl ExactSizeIterator<Item = (&str, &BindType)> {
        self.generics.iter().map(|(name, ty)| (&**name, ty))
    }

    /// The binding of one generic parameter, by name.
    pub fn generic_binding(&self, name: &str) -> Option<&BindType> {
        self.generics
            .iter()
            .find(|(param, _)| &**param == name)
            .map(|(_, ty)| ty)
    }

    #[inline]
    pub const fn base(&self) -> Option<&BindType> {
        self.base.as_ref()
    }

    /// Properties in declaration order.
    #[inline]
    pub fn properties(&self) -> &[PropertyDesc] {
        &self.properties
    }

    #[inline]
    pub const fn creator(&self) -> Option<&CreatorDesc> {
        self.creator.as_ref()
    }

    /// Instantiates through the default constructor, if one exists.
    pub fn create_default(&self) -> Option<Box<dyn Bind>> {
        self.default_ctor.as_ref().map(|ctor| ctor())
    }

    #[inline]
    pub const fn has_default_constructor(&self) -> bool {
        self.default_ctor.is_some()
    }

    #[inline]
    pub const fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    #[inline]
    pub const fn customization(&self) -> &ClassCustomization {
        &self.customization
    }
}

impl fmt::Debug for ClassDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDesc")
            .field("ty", &self.ty)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}
