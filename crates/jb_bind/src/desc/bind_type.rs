use core::fmt;
use core::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::bind::Described;
use crate::desc::TypeDesc;

/// Descriptor function pointer.
///
/// Referring to other types through a function pointer instead of the
/// descriptor itself keeps descriptor construction lazy, which is what
/// allows self-referential types to describe themselves.
pub type DescFn = fn() -> &'static TypeDesc;

// -----------------------------------------------------------------------------
// BindType

/// A runtime type, as used for chain caching, cycle tracking and the
/// pre-resolved-generic public API.
///
/// Most positions are `Desc` — a concrete described type. The remaining
/// variants exist for descriptor-level generics: an open descriptor body
/// may declare a property as `Variable("T")`, which the
/// [resolver](crate::resolve) later binds against the runtime containment
/// chain; a caller may deserialize into `Parameterized` to supply those
/// bindings explicitly, mirroring a parameterized target type.
#[derive(Clone)]
pub enum BindType {
    /// A concrete described type.
    Desc(DescFn),
    /// A generic class applied to explicit type arguments.
    Parameterized {
        raw: DescFn,
        args: Arc<[BindType]>,
    },
    /// A reference to a class-level generic parameter, by name.
    Variable(&'static str),
    /// A bounded unknown; resolves to its most specific bound.
    Wildcard {
        upper: Arc<[BindType]>,
        lower: Arc<[BindType]>,
    },
    /// The dynamic type: values serialize by their runtime descriptor and
    /// deserialize into the [`Value`](jb_json::Value) document model.
    Any,
}

impl BindType {
    /// The concrete runtime type of `T`.
    #[inline]
    pub fn of<T: Described>() -> Self {
        Self::Desc(T::descriptor)
    }

    /// Generic class `T` applied to the given type arguments.
    ///
    /// `T` supplies the open descriptor (its class-level parameter names);
    /// the arguments bind those parameters positionally.
    pub fn parameterized<T: Described>(args: impl IntoIterator<Item = BindType>) -> Self {
        Self::Parameterized {
            raw: T::descriptor,
            args: args.into_iter().collect(),
        }
    }

    /// A wildcard with the given upper bounds.
    pub fn wildcard(upper: impl IntoIterator<Item = BindType>) -> Self {
        Self::Wildcard {
            upper: upper.into_iter().collect(),
            lower: Arc::from([]),
        }
    }

    /// The descriptor of the underlying raw type, if one exists.
    #[inline]
    pub fn desc(&self) -> Option<&'static TypeDesc> {
        match self {
            Self::Desc(desc) => Some(desc()),
            Self::Parameterized { raw, .. } => Some(raw()),
            _ => None,
        }
    }

    /// Explicit type arguments, when parameterized.
    #[inline]
    pub fn args(&self) -> &[BindType] {
        match self {
            Self::Parameterized { args, .. } => args,
            _ => &[],
        }
    }

    #[inline]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// Human-readable rendering for diagnostics.
    pub fn path(&self) -> String {
        match self {
            Self::Desc(desc) => desc().path().to_string(),
            Self::Parameterized { raw, args } => {
                let mut out = raw().ty().name().to_string();
                out.push('<');
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&arg.path());
                }
                out.push('>');
                out
            }
            Self::Variable(name) => name.to_string(),
            Self::Wildcard { .. } => "?".to_string(),
            Self::Any => "any".to_string(),
        }
    }
}

impl PartialEq for BindType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Desc(a), Self::Desc(b)) => a().ty().id() == b().ty().id(),
            (
                Self::Parameterized { raw: a, args: x },
                Self::Parameterized { raw: b, args: y },
            ) => a().ty().id() == b().ty().id() && x == y,
            (Self::Variable(a), Self::Variable(b)) => a == b,
            (
                Self::Wildcard { upper: a, lower: b },
                Self::Wildcard { upper: x, lower: y },
            ) => a == x && b == y,
            (Self::Any, Self::Any) => true,
            _ => false,
        }
    }
}

impl Eq for BindType {}

impl Hash for BindType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Self::Desc(desc) => desc().ty().id().hash(state),
            Self::Parameterized { raw, args } => {
                raw().ty().id().hash(state);
                for arg in args.iter() {
                    arg.hash(state);
                }
            }
            Self::Variable(name) => name.hash(state),
            Self::Wildcard { upper, lower } => {
                for bound in upper.iter().chain(lower.iter()) {
                    bound.hash(state);
                }
            }
            Self::Any => {}
        }
    }
}

impl fmt::Debug for BindType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::BindType;

    #[test]
    fn equality_by_type_identity() {
        assert_eq!(BindType::of::<i32>(), BindType::of::<i32>());
        assert_ne!(BindType::of::<i32>(), BindType::of::<i64>());
        assert_eq!(BindType::of::<Vec<i32>>(), BindType::of::<Vec<i32>>());
        assert_ne!(BindType::of::<Vec<i32>>(), BindType::of::<Vec<i64>>());
        assert_eq!(BindType::Variable("T"), BindType::Variable("T"));
        assert_ne!(BindType::Variable("T"), BindType::Any);
    }

    #[test]
    fn diagnostics_path() {
        assert!(BindType::of::<Vec<i32>>().path().contains("Vec"));
        assert_eq!(BindType::Any.path(), "any");
        assert_eq!(BindType::Variable("T").path(), "T");
    }
}
