//! The erased value trait the engine operates on.

use core::any::{Any, TypeId, type_name};

use crate::desc::TypeDesc;

// -----------------------------------------------------------------------------
// AccessError

/// Failure of a capability accessor (getter, setter, container operation).
///
/// Accessors are resolved once at descriptor-build time and downcast the
/// erased value at the call boundary; a mismatch here means the descriptor
/// disagrees with the actual object graph.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AccessError {
    /// A value had a different concrete type than the descriptor declared.
    #[error("type mismatch: expected `{expected}`, value is `{actual}`")]
    Mismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// A creator was invoked with the wrong number of collected arguments.
    #[error("expected {expected} creator arguments, collected {actual}")]
    Arity { expected: usize, actual: usize },

    /// A creator argument had no value and no default.
    #[error("creator argument at index {index} is missing")]
    MissingArgument { index: usize },
}

impl AccessError {
    /// Mismatch against an expected concrete type.
    pub fn mismatch<T: 'static>(actual: &'static str) -> Self {
        Self::Mismatch {
            expected: type_name::<T>(),
            actual,
        }
    }
}

// -----------------------------------------------------------------------------
// Described

/// A type with a runtime descriptor.
///
/// This is the introspection boundary of the engine: how the descriptor is
/// produced (hand-written, generated, derived elsewhere) does not matter;
/// the engine only ever consumes the resulting [`TypeDesc`] data.
///
/// Descriptor construction must be lazy with respect to *other* types:
/// refer to property and element types through
/// [`BindType::of`](crate::desc::BindType::of), which captures a function
/// pointer instead of invoking the descriptor, so self-referential types
/// do not recurse at descriptor-build time.
///
/// # Examples
///
/// ```
/// use jb_bind::bind::Described;
/// use jb_bind::desc::{BindType, ClassDesc, DescCell, Getter, PropertyDesc, Setter, TypeDesc};
///
/// #[derive(Default)]
/// struct Point {
///     x: i32,
/// }
///
/// impl Described for Point {
///     fn descriptor() -> &'static TypeDesc {
///         static CELL: DescCell = DescCell::new();
///         CELL.get_or_init(|| {
///             TypeDesc::Class(
///                 ClassDesc::new::<Point>("Point")
///                     .with_default_constructor::<Point>()
///                     .with_property(
///                         PropertyDesc::new("x", BindType::of::<i32>())
///                             .with_getter(Getter::new(|p: &Point| &p.x))
///                             .with_setter(Setter::new(|p: &mut Point, v: i32| p.x = v)),
///                     ),
///             )
///         })
///     }
/// }
/// ```
pub trait Described: Send + Sync + 'static {
    /// Returns the descriptor shared by all values of this type.
    fn descriptor() -> &'static TypeDesc;
}

// -----------------------------------------------------------------------------
// Bind

/// An erased value participating in binding.
///
/// Automatically implemented for every [`Described`] type; the engine works
/// exclusively in terms of `&dyn Bind` / `Box<dyn Bind>` and reaches typed
/// data through the descriptor's capability accessors.
pub trait Bind: Any + Send + Sync {
    /// The descriptor of the value's concrete type.
    fn type_desc(&self) -> &'static TypeDesc;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Described> Bind for T {
    #[inline]
    fn type_desc(&self) -> &'static TypeDesc {
        T::descriptor()
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    #[inline]
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl dyn Bind {
    /// Whether the value is of concrete type `T`.
    #[inline]
    pub fn is<T: Described>(&self) -> bool {
        self.as_any().type_id() == TypeId::of::<T>()
    }

    /// Typed shared reference, if the value is a `T`.
    #[inline]
    pub fn downcast_ref<T: Described>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Typed mutable reference, if the value is a `T`.
    #[inline]
    pub fn downcast_mut<T: Described>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }

    /// Takes the value out of the box as a `T`.
    pub fn take<T: Described>(self: Box<Self>) -> Result<T, AccessError> {
        let actual = self.type_path();
        match self.into_any().downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => Err(AccessError::mismatch::<T>(actual)),
        }
    }

    /// The full type path of the value's concrete type.
    #[inline]
    pub fn type_path(&self) -> &'static str {
        self.type_desc().ty().path()
    }
}

impl core::fmt::Debug for dyn Bind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "dyn Bind<{}>", self.type_path())
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::Bind;

    #[test]
    fn downcast_and_take() {
        let boxed: Box<dyn Bind> = Box::new(42_i32);
        assert!(boxed.is::<i32>());
        assert_eq!(boxed.downcast_ref::<i32>(), Some(&42));
        assert_eq!(boxed.take::<i32>().unwrap(), 42);

        let boxed: Box<dyn Bind> = Box::new(String::from("x"));
        assert!(boxed.take::<i32>().is_err());
    }
}
