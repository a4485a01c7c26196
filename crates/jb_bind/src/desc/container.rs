//! Descriptors for container-shaped types.
//!
//! Each descriptor carries the capability closures the chains need:
//! create, populate, iterate. The closures are monomorphized once, when
//! the descriptor is built, so the composed chains never dispatch on the
//! concrete container type again.

use crate::bind::{AccessError, Bind, Described};
use crate::desc::{BindType, Ty};

type NewFn = Box<dyn Fn() -> Box<dyn Bind> + Send + Sync>;
type PushFn = Box<dyn Fn(&mut dyn Bind, Box<dyn Bind>) -> Result<(), AccessError> + Send + Sync>;
type InsertFn = Box<
    dyn Fn(&mut dyn Bind, Box<dyn Bind>, Box<dyn Bind>) -> Result<(), AccessError> + Send + Sync,
>;
type IterFn = Box<
    dyn for<'a> Fn(
            &'a dyn Bind,
        ) -> Result<Box<dyn Iterator<Item = &'a dyn Bind> + 'a>, AccessError>
        + Send
        + Sync,
>;
type EntriesFn = Box<
    dyn for<'a> Fn(
            &'a dyn Bind,
        )
            -> Result<Box<dyn Iterator<Item = (&'a dyn Bind, &'a dyn Bind)> + 'a>, AccessError>
        + Send
        + Sync,
>;

// -----------------------------------------------------------------------------
// ListDesc

/// Descriptor of a growable sequence (`Vec`, `VecDeque`, …).
pub struct ListDesc {
    ty: Ty,
    element: BindType,
    new_instance: NewFn,
    push: PushFn,
    iter: IterFn,
}

impl ListDesc {
    /// Builds the descriptor for collection `C` with element type `T`.
    pub fn of<C, T>() -> Self
    where
        C: Described + Default + Extend<T>,
        T: Described,
        for<'a> &'a C: IntoIterator<Item = &'a T>,
    {
        Self {
            ty: Ty::of::<C>(),
            element: BindType::of::<T>(),
            new_instance: Box::new(|| Box::new(C::default())),
            push: Box::new(|list, item| {
                let item = item.take::<T>()?;
                let actual = list.type_path();
                let Some(list) = list.downcast_mut::<C>() else {
                    return Err(AccessError::mismatch::<C>(actual));
                };
                list.extend(core::iter::once(item));
                Ok(())
            }),
            iter: Box::new(|list| {
                let Some(list) = list.downcast_ref::<C>() else {
                    return Err(AccessError::mismatch::<C>(list.type_path()));
                };
                Ok(Box::new(list.into_iter().map(|item| item as &dyn Bind)))
            }),
        }
    }

    #[inline]
    pub const fn ty(&self) -> &Ty {
        &self.ty
    }

    /// Declared element type.
    #[inline]
    pub const fn element(&self) -> &BindType {
        &self.element
    }

    /// Creates an empty instance of the collection.
    #[inline]
    pub fn create(&self) -> Box<dyn Bind> {
        (self.new_instance)()
    }

    /// Appends one element.
    #[inline]
    pub fn push(&self, list: &mut dyn Bind, item: Box<dyn Bind>) -> Result<(), AccessError> {
        (self.push)(list, item)
    }

    /// Iterates the elements in order.
    #[inline]
    pub fn iter<'a>(
        &self,
        list: &'a dyn Bind,
    ) -> Result<Box<dyn Iterator<Item = &'a dyn Bind> + 'a>, AccessError> {
        (self.iter)(list)
    }
}

// -----------------------------------------------------------------------------
// ArrayDesc

/// Descriptor of a fixed-length array `[T; N]`.
pub struct ArrayDesc {
    ty: Ty,
    element: BindType,
    len: usize,
    from_elements: Box<dyn Fn(Vec<Box<dyn Bind>>) -> Result<Box<dyn Bind>, AccessError> + Send + Sync>,
    iter: IterFn,
}

impl ArrayDesc {
    pub fn of<T: Described, const N: usize>() -> Self
    where
        [T; N]: Described,
    {
        Self {
            ty: Ty::of::<[T; N]>(),
            element: BindType::of::<T>(),
            len: N,
            from_elements: Box::new(|items| {
                if items.len() != N {
                    return Err(AccessError::Arity {
                        expected: N,
                        actual: items.len(),
                    });
                }
                let mut out = Vec::with_capacity(N);
                for item in items {
                    out.push(item.take::<T>()?);
                }
                match <[T; N]>::try_from(out) {
                    Ok(array) => Ok(Box::new(array)),
                    Err(_) => Err(AccessError::Arity {
                        expected: N,
                        actual: 0,
                    }),
                }
            }),
            iter: Box::new(|array| {
                let Some(array) = array.downcast_ref::<[T; N]>() else {
                    return Err(AccessError::mismatch::<[T; N]>(array.type_path()));
                };
                Ok(Box::new(array.iter().map(|item| item as &dyn Bind)))
            }),
        }
    }

    #[inline]
    pub const fn ty(&self) -> &Ty {
        &self.ty
    }

    #[inline]
    pub const fn element(&self) -> &BindType {
        &self.element
    }

    /// The fixed length.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Assembles an array from exactly `len` collected elements.
    #[inline]
    pub fn from_elements(&self, items: Vec<Box<dyn Bind>>) -> Result<Box<dyn Bind>, AccessError> {
        (self.from_elements)(items)
    }

    #[inline]
    pub fn iter<'a>(
        &self,
        array: &'a dyn Bind,
    ) -> Result<Box<dyn Iterator<Item = &'a dyn Bind> + 'a>, AccessError> {
        (self.iter)(array)
    }
}

// -----------------------------------------------------------------------------
// MapDesc

/// Descriptor of a key-value map.
pub struct MapDesc {
    ty: Ty,
    key: BindType,
    value: BindType,
    new_instance: NewFn,
    insert: InsertFn,
    entries: EntriesFn,
}

impl MapDesc {
    /// Builds the descriptor for map `M` with keys `K` and values `V`.
    pub fn of<M, K, V>() -> Self
    where
        M: Described + Default + Extend<(K, V)>,
        K: Described,
        V: Described,
        for<'a> &'a M: IntoIterator<Item = (&'a K, &'a V)>,
    {
        Self {
            ty: Ty::of::<M>(),
            key: BindType::of::<K>(),
            value: BindType::of::<V>(),
            new_instance: Box::new(|| Box::new(M::default())),
            insert: Box::new(|map, key, value| {
                let key = key.take::<K>()?;
                let value = value.take::<V>()?;
                let actual = map.type_path();
                let Some(map) = map.downcast_mut::<M>() else {
                    return Err(AccessError::mismatch::<M>(actual));
                };
                map.extend(core::iter::once((key, value)));
                Ok(())
            }),
            entries: Box::new(|map| {
                let Some(map) = map.downcast_ref::<M>() else {
                    return Err(AccessError::mismatch::<M>(map.type_path()));
                };
                Ok(Box::new(
                    map.into_iter()
                        .map(|(key, value)| (key as &dyn Bind, value as &dyn Bind)),
                ))
            }),
        }
    }

    #[inline]
    pub const fn ty(&self) -> &Ty {
        &self.ty
    }

    /// Declared key type.
    #[inline]
    pub const fn key(&self) -> &BindType {
        &self.key
    }

    /// Declared value type.
    #[inline]
    pub const fn value(&self) -> &BindType {
        &self.value
    }

    #[inline]
    pub fn create(&self) -> Box<dyn Bind> {
        (self.new_instance)()
    }

    #[inline]
    pub fn insert(
        &self,
        map: &mut dyn Bind,
        key: Box<dyn Bind>,
        value: Box<dyn Bind>,
    ) -> Result<(), AccessError> {
        (self.insert)(map, key, value)
    }

    /// Iterates the entries in the map's own order.
    #[inline]
    pub fn entries<'a>(
        &self,
        map: &'a dyn Bind,
    ) -> Result<Box<dyn Iterator<Item = (&'a dyn Bind, &'a dyn Bind)> + 'a>, AccessError> {
        (self.entries)(map)
    }
}

// -----------------------------------------------------------------------------
// OptionalDesc

/// Descriptor of `Option<T>`, the only null-carrying shape.
pub struct OptionalDesc {
    ty: Ty,
    inner: BindType,
    new_none: NewFn,
    new_some: Box<dyn Fn(Box<dyn Bind>) -> Result<Box<dyn Bind>, AccessError> + Send + Sync>,
    as_inner: Box<
        dyn for<'a> Fn(&'a dyn Bind) -> Result<Option<&'a dyn Bind>, AccessError> + Send + Sync,
    >,
}

impl OptionalDesc {
    pub fn of<T: Described>() -> Self
    where
        Option<T>: Described,
    {
        Self {
            ty: Ty::of::<Option<T>>(),
            inner: BindType::of::<T>(),
            new_none: Box::new(|| Box::new(None::<T>)),
            new_some: Box::new(|value| Ok(Box::new(Some(value.take::<T>()?)))),
            as_inner: Box::new(|optional| {
                let Some(optional) = optional.downcast_ref::<Option<T>>() else {
                    return Err(AccessError::mismatch::<Option<T>>(optional.type_path()));
                };
                Ok(optional.as_ref().map(|value| value as &dyn Bind))
            }),
        }
    }

    #[inline]
    pub const fn ty(&self) -> &Ty {
        &self.ty
    }

    /// Declared inner type.
    #[inline]
    pub const fn inner(&self) -> &BindType {
        &self.inner
    }

    #[inline]
    pub fn none(&self) -> Box<dyn Bind> {
        (self.new_none)()
    }

    #[inline]
    pub fn some(&self, value: Box<dyn Bind>) -> Result<Box<dyn Bind>, AccessError> {
        (self.new_some)(value)
    }

    /// A view of the contained value, when present.
    #[inline]
    pub fn as_inner<'a>(&self, optional: &'a dyn Bind) -> Result<Option<&'a dyn Bind>, AccessError> {
        (self.as_inner)(optional)
    }
}

// -----------------------------------------------------------------------------
// BytesDesc

/// Descriptor of a binary payload, subject to the binary-data strategy.
pub struct BytesDesc {
    ty: Ty,
    as_bytes: Box<dyn for<'a> Fn(&'a dyn Bind) -> Result<&'a [u8], AccessError> + Send + Sync>,
    from_bytes: Box<dyn Fn(Vec<u8>) -> Box<dyn Bind> + Send + Sync>,
}

impl BytesDesc {
    pub fn new<T: Described>(
        as_bytes: impl for<'a> Fn(&'a T) -> &'a [u8] + Send + Sync + 'static,
        from_bytes: impl Fn(Vec<u8>) -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            ty: Ty::of::<T>(),
            as_bytes: Box::new(move |value| {
                let Some(value) = value.downcast_ref::<T>() else {
                    return Err(AccessError::mismatch::<T>(value.type_path()));
                };
                Ok(as_bytes(value))
            }),
            from_bytes: Box::new(move |bytes| Box::new(from_bytes(bytes))),
        }
    }

    #[inline]
    pub const fn ty(&self) -> &Ty {
        &self.ty
    }

    #[inline]
    pub fn as_bytes<'a>(&self, value: &'a dyn Bind) -> Result<&'a [u8], AccessError> {
        (self.as_bytes)(value)
    }

    #[inline]
    pub fn from_bytes(&self, bytes: Vec<u8>) -> Box<dyn Bind> {
        (self.from_bytes)(bytes)
    }
}

// -----------------------------------------------------------------------------
// WrapperDesc

/// Descriptor of a transparent wrapper (`Box<T>`, `Arc<T>`).
///
/// Wrappers bind exactly like their inner type; only construction and
/// borrowing differ.
pub struct WrapperDesc {
    ty: Ty,
    inner: BindType,
    unwrap: Box<dyn for<'a> Fn(&'a dyn Bind) -> Result<&'a dyn Bind, AccessError> + Send + Sync>,
    wrap: Box<dyn Fn(Box<dyn Bind>) -> Result<Box<dyn Bind>, AccessError> + Send + Sync>,
}

impl WrapperDesc {
    pub fn new<W, T>(
        unwrap: impl for<'a> Fn(&'a W) -> &'a T + Send + Sync + 'static,
        wrap: impl Fn(T) -> W + Send + Sync + 'static,
    ) -> Self
    where
        W: Described,
        T: Described,
    {
        Self {
            ty: Ty::of::<W>(),
            inner: BindType::of::<T>(),
            unwrap: Box::new(move |value| {
                let Some(value) = value.downcast_ref::<W>() else {
                    return Err(AccessError::mismatch::<W>(value.type_path()));
                };
                Ok(unwrap(value) as &dyn Bind)
            }),
            wrap: Box::new(move |inner| Ok(Box::new(wrap(inner.take::<T>()?)))),
        }
    }

    #[inline]
    pub const fn ty(&self) -> &Ty {
        &self.ty
    }

    #[inline]
    pub const fn inner(&self) -> &BindType {
        &self.inner
    }

    #[inline]
    pub fn unwrap<'a>(&self, value: &'a dyn Bind) -> Result<&'a dyn Bind, AccessError> {
        (self.unwrap)(value)
    }

    #[inline]
    pub fn wrap(&self, inner: Box<dyn Bind>) -> Result<Box<dyn Bind>, AccessError> {
        (self.wrap)(inner)
    }
}

// -----------------------------------------------------------------------------
// DynamicDesc

/// Descriptor of the dynamic document type ([`Value`](jb_json::Value)).
///
/// Dynamic values carry their structure at runtime; the chains for this
/// kind dispatch per value instead of per type.
#[derive(Debug)]
pub struct DynamicDesc {
    ty: Ty,
}

impl DynamicDesc {
    pub fn new<T: Described>() -> Self {
        Self { ty: Ty::of::<T>() }
    }

    #[inline]
    pub const fn ty(&self) -> &Ty {
        &self.ty
    }
}
