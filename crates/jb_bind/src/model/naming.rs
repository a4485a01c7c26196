//! Property naming strategies.

/// Translation applied to property names to produce JSON member names.
///
/// An explicit per-property rename bypasses the strategy entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropertyNamingStrategy {
    /// Property names are used as-is.
    #[default]
    Identity,
    /// `camelCase` → `camel_case`.
    LowerCaseWithUnderscores,
    /// `camelCase` → `camel-case`.
    LowerCaseWithDashes,
    /// `camelCase` → `CamelCase`.
    UpperCamelCase,
    /// Names are written as-is; reading matches case-insensitively.
    CaseInsensitive,
}

impl PropertyNamingStrategy {
    /// Applies the strategy to one property name.
    pub fn apply(self, name: &str) -> String {
        match self {
            Self::Identity | Self::CaseInsensitive => name.to_string(),
            Self::LowerCaseWithUnderscores => separate_lowercase(name, '_'),
            Self::LowerCaseWithDashes => separate_lowercase(name, '-'),
            Self::UpperCamelCase => {
                let mut chars = name.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        }
    }

    /// Whether read-side matching ignores case.
    #[inline]
    pub const fn is_case_insensitive(self) -> bool {
        matches!(self, Self::CaseInsensitive)
    }
}

fn separate_lowercase(name: &str, separator: char) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (index, c) in name.chars().enumerate() {
        if c.is_uppercase() && index > 0 {
            out.push(separator);
        }
        out.extend(c.to_lowercase());
    }
    out
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::PropertyNamingStrategy as S;

    #[test]
    fn translations() {
        assert_eq!(S::Identity.apply("firstName"), "firstName");
        assert_eq!(S::LowerCaseWithUnderscores.apply("firstName"), "first_name");
        assert_eq!(S::LowerCaseWithDashes.apply("firstName"), "first-name");
        assert_eq!(S::UpperCamelCase.apply("firstName"), "FirstName");
        assert_eq!(S::CaseInsensitive.apply("firstName"), "firstName");
    }
}
