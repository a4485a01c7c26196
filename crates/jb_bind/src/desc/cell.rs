//! Static storage for descriptors.
//!
//! Non-generic types keep their descriptor in a `DescCell` (a `OnceLock`).
//! Generic types share one `static` across all instantiations, so the
//! generic cell keys leaked descriptors by `TypeId`.

use core::any::{Any, TypeId};
use std::sync::{OnceLock, PoisonError, RwLock};

use hashbrown::HashMap;

use crate::desc::TypeDesc;

// -----------------------------------------------------------------------------
// DescCell

/// Storage for the descriptor of a non-generic type.
///
/// ```ignore
/// impl Described for Point {
///     fn descriptor() -> &'static TypeDesc {
///         static CELL: DescCell = DescCell::new();
///         CELL.get_or_init(|| TypeDesc::Class(/* … */))
///     }
/// }
/// ```
pub struct DescCell(OnceLock<TypeDesc>);

impl DescCell {
    /// Creates an empty cell.
    #[inline]
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    /// Returns the stored descriptor, building it on first access.
    #[inline]
    pub fn get_or_init<F>(&self, f: F) -> &TypeDesc
    where
        F: FnOnce() -> TypeDesc,
    {
        self.0.get_or_init(f)
    }
}

impl Default for DescCell {
    fn default() -> Self {
        Self::new()
    }
}

// -----------------------------------------------------------------------------
// GenericDescCell

/// Storage for the descriptors of a generic type's instantiations.
///
/// The `static CELL` inside a generic `descriptor()` body is shared by
/// every instantiation, so entries are keyed by `TypeId` and leaked to
/// obtain the `'static` lifetime.
///
/// ```ignore
/// impl<T: Described> Described for Vec<T> {
///     fn descriptor() -> &'static TypeDesc {
///         static CELL: GenericDescCell = GenericDescCell::new();
///         CELL.get_or_insert::<Self>(|| TypeDesc::List(ListDesc::of::<Vec<T>, T>()))
///     }
/// }
/// ```
pub struct GenericDescCell(OnceLock<RwLock<HashMap<TypeId, &'static TypeDesc>>>);

impl GenericDescCell {
    /// Creates an empty cell.
    #[inline]
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    /// Returns the descriptor for instantiation `G`, building it on first
    /// access.
    #[inline]
    pub fn get_or_insert<G: Any>(&self, f: impl FnOnce() -> TypeDesc) -> &'static TypeDesc {
        self.get_or_insert_by_type_id(TypeId::of::<G>(), f)
    }

    fn get_or_insert_by_type_id(
        &self,
        type_id: TypeId,
        f: impl FnOnce() -> TypeDesc,
    ) -> &'static TypeDesc {
        let table = self.0.get_or_init(RwLock::default);
        if let Some(desc) = table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
            .copied()
        {
            return desc;
        }
        // Built outside the write lock; a racing builder is idempotent and
        // the first inserted descriptor wins.
        let desc = f();
        let mut table = table.write().unwrap_or_else(PoisonError::into_inner);
        *table
            .entry(type_id)
            .or_insert_with(|| Box::leak(Box::new(desc)))
    }
}

impl Default for GenericDescCell {
    fn default() -> Self {
        Self::new()
    }
}
