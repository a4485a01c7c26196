//! Property ordering strategies.

use crate::model::PropertyModel;

/// Order in which properties are serialized, absent an explicit
/// property-order customization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropertyOrderStrategy {
    /// Ascending by property name.
    #[default]
    Lexicographical,
    /// Descending by property name.
    Reverse,
    /// The order the descriptor declares.
    Declaration,
}

impl PropertyOrderStrategy {
    /// Sorts merged properties in place. Ordering keys off the original
    /// property name, not the translated JSON name.
    pub(crate) fn sort(self, properties: &mut [PropertyModel]) {
        match self {
            Self::Lexicographical => {
                properties.sort_by(|a, b| a.name().cmp(b.name()));
            }
            Self::Reverse => {
                properties.sort_by(|a, b| b.name().cmp(a.name()));
            }
            Self::Declaration => {}
        }
    }
}
