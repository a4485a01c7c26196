//! Generic type resolution.
//!
//! A declared property type may reference a class-level generic parameter
//! (`BindType::Variable`). During chain construction the builders keep the
//! containment path from the root type to the current member — the same
//! stack that guards against cyclic types — and this module resolves
//! variables and wildcards against it.
//!
//! Resolution is a pure function of (chain, type): no caching, no state.

use crate::desc::{BindType, ClassDesc, TypeDesc};

/// Resolves `ty` against the containment chain, innermost frame last.
///
/// - concrete types are returned unchanged;
/// - parameterized types resolve their arguments recursively, returning
///   the original when nothing changed;
/// - variables search the chain from the innermost frame outward; a
///   binding that is itself a variable continues the search one frame
///   further out;
/// - wildcards collapse to their most specific bound.
///
/// An unresolvable variable degrades to [`BindType::Any`] — generic
/// erasure legitimately loses this information in some call shapes, so
/// this logs instead of failing.
pub fn resolve_type(chain: &[BindType], ty: &BindType) -> BindType {
    match ty {
        BindType::Desc(_) | BindType::Any => ty.clone(),
        BindType::Parameterized { raw, args } => {
            let resolved: Vec<BindType> =
                args.iter().map(|arg| resolve_type(chain, arg)).collect();
            if resolved[..] == args[..] {
                ty.clone()
            } else {
                BindType::Parameterized {
                    raw: *raw,
                    args: resolved.into(),
                }
            }
        }
        BindType::Variable(name) => resolve_variable(chain, name),
        BindType::Wildcard { upper, lower } => resolve_wildcard(chain, upper, lower),
    }
}

fn resolve_variable(chain: &[BindType], name: &str) -> BindType {
    for (index, frame) in chain.iter().enumerate().rev() {
        let Some(class) = frame.desc().and_then(TypeDesc::as_class) else {
            continue;
        };
        let Some(binding) = frame_binding(class, frame, name) else {
            continue;
        };
        return match binding {
            // Propagated through an intermediate generic wrapper: continue
            // resolution against the outer part of the chain.
            BindType::Variable(outer) => resolve_variable(&chain[..index], outer),
            other => resolve_type(&chain[..index], &other),
        };
    }
    log::warn!(
        "generic variable `{name}` cannot be resolved from the runtime chain, \
         falling back to the dynamic type"
    );
    BindType::Any
}

/// The binding of `name` within one chain frame.
///
/// Explicit type arguments bind the class's parameters positionally;
/// otherwise the instantiated parameter table of the descriptor applies.
fn frame_binding(class: &'static ClassDesc, frame: &BindType, name: &str) -> Option<BindType> {
    let args = frame.args();
    if !args.is_empty() {
        let position = class.generics().position(|(param, _)| param == name)?;
        return args.get(position).cloned();
    }
    class.generic_binding(name).cloned()
}

fn resolve_wildcard(chain: &[BindType], upper: &[BindType], lower: &[BindType]) -> BindType {
    // Most specific upper bound wins; `Any` bounds carry no information.
    let upper_hit = upper
        .iter()
        .map(|bound| resolve_type(chain, bound))
        .find(|bound| !bound.is_any());
    if let Some(bound) = upper_hit {
        return bound;
    }
    // A lower bound only applies when it is more specific than whatever
    // the upper bounds produced.
    let lower_hit = lower
        .iter()
        .map(|bound| resolve_type(chain, bound))
        .find(|bound| !bound.is_any());
    lower_hit.unwrap_or(BindType::Any)
}

// -----------------------------------------------------------------------------
// Tests
