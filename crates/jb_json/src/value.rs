use core::fmt;

// -----------------------------------------------------------------------------
// JsonNumber

/// A JSON number, kept as the raw token text.
///
/// JSON does not distinguish integer from floating-point numbers, and a
/// document may carry more precision than any single machine type. Keeping
/// the token text makes documents round-trip exactly; callers pick the
/// representation they need through the `as_*` accessors.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct JsonNumber {
    text: Box<str>,
}

impl JsonNumber {
    /// Creates a number from raw token text.
    ///
    /// The text is trusted to be a valid JSON number token; it comes either
    /// from a tokenizer or from one of the `From` conversions below.
    #[inline]
    pub fn from_text(text: impl Into<Box<str>>) -> Self {
        Self { text: text.into() }
    }

    /// The raw token text.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.text.parse().ok()
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.text.parse().ok()
    }

    pub fn as_i128(&self) -> Option<i128> {
        self.text.parse().ok()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.text.parse().ok()
    }
}

impl From<i64> for JsonNumber {
    fn from(value: i64) -> Self {
        Self::from_text(value.to_string())
    }
}

impl From<u64> for JsonNumber {
    fn from(value: u64) -> Self {
        Self::from_text(value.to_string())
    }
}

impl From<i128> for JsonNumber {
    fn from(value: i128) -> Self {
        Self::from_text(value.to_string())
    }
}

impl From<f64> for JsonNumber {
    /// Converts a finite float. Non-finite values have no JSON form and
    /// must be rejected before this point.
    fn from(value: f64) -> Self {
        debug_assert!(value.is_finite());
        let mut text = value.to_string();
        // `f64::to_string` drops the fraction for integral values; keep the
        // token recognizable as floating point.
        if !text.contains(['.', 'e', 'E']) {
            text.push_str(".0");
        }
        Self::from_text(text)
    }
}

impl fmt::Debug for JsonNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Display for JsonNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.text)
    }
}

// -----------------------------------------------------------------------------
// Value

/// An in-memory JSON document.
///
/// Objects preserve member order, so a document parsed into a `Value` and
/// generated back produces the members in their original positions. Member
/// names are not deduplicated; a well-formed producer never emits
/// duplicates, and lookups return the first match.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(JsonNumber),
    String(String),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&JsonNumber> {
        match self {
            Self::Number(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().and_then(JsonNumber::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_number().and_then(JsonNumber::as_f64)
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, Value)]> {
        match self {
            Self::Object(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the member with the given name, for object values.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Object(members) => members
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Returns the element at the given index, for array values.
    pub fn at(&self, index: usize) -> Option<&Value> {
        match self {
            Self::Array(items) => items.get(index),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

// -----------------------------------------------------------------------------
// Tests
