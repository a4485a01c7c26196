//! The streaming collaborator surface.
//!
//! The binding engine never touches JSON text. It consumes a pull-style
//! [`JsonParser`] and produces into a push-style [`JsonGenerator`]; both
//! are thin adapters over an actual tokenizer/writer. [`StreamParser`] and
//! [`StreamGenerator`] adapt the `struson` streaming implementation;
//! [`ValueParser`] and [`ValueGenerator`] adapt in-memory
//! [`Value`](crate::Value) documents.

use core::fmt;

mod struson;
mod value;

pub use self::struson::{StreamGenerator, StreamParser};
pub use self::value::{ValueGenerator, ValueParser};

// -----------------------------------------------------------------------------
// Event

/// A token event produced by a [`JsonParser`].
///
/// Scalar events carry their token text through
/// [`JsonParser::value_text`]; `KeyName` carries the member name the same
/// way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    KeyName,
    ValueString,
    ValueNumber,
    ValueTrue,
    ValueFalse,
    ValueNull,
}

impl Event {
    /// Whether this event opens a container.
    #[inline]
    pub const fn is_start(self) -> bool {
        matches!(self, Self::StartObject | Self::StartArray)
    }

    /// Whether this event is a scalar value token.
    #[inline]
    pub const fn is_scalar(self) -> bool {
        matches!(
            self,
            Self::ValueString
                | Self::ValueNumber
                | Self::ValueTrue
                | Self::ValueFalse
                | Self::ValueNull
        )
    }

    /// The matching end event for a start event, if any.
    #[inline]
    pub const fn closing(self) -> Option<Event> {
        match self {
            Self::StartObject => Some(Self::EndObject),
            Self::StartArray => Some(Self::EndArray),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartObject => f.pad("START_OBJECT"),
            Self::EndObject => f.pad("END_OBJECT"),
            Self::StartArray => f.pad("START_ARRAY"),
            Self::EndArray => f.pad("END_ARRAY"),
            Self::KeyName => f.pad("KEY_NAME"),
            Self::ValueString => f.pad("VALUE_STRING"),
            Self::ValueNumber => f.pad("VALUE_NUMBER"),
            Self::ValueTrue => f.pad("VALUE_TRUE"),
            Self::ValueFalse => f.pad("VALUE_FALSE"),
            Self::ValueNull => f.pad("VALUE_NULL"),
        }
    }
}

// -----------------------------------------------------------------------------
// StreamError

/// Errors surfaced by the stream layer.
///
/// Malformed JSON is detected by the underlying tokenizer and arrives here
/// as [`StreamError::Read`]; this crate adds only the adapter-level
/// conditions.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The underlying reader reported an error (syntax, nesting, i/o).
    #[error("json read error: {0}")]
    Read(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The underlying writer rejected a value.
    #[error("json write error: {0}")]
    Write(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// `value_text` was queried while the last event carried no text.
    #[error("no token text is available for the current event")]
    NoValue,

    /// More events were requested after the root value completed.
    #[error("the json document has already been fully consumed")]
    DocumentEnd,

    /// The stream was used after `close`.
    #[error("the json stream has been closed")]
    Closed,

    /// A non-finite float has no JSON representation.
    #[error("non-finite number cannot be written as json: {0}")]
    NonFinite(f64),
}

// -----------------------------------------------------------------------------
// JsonParser

/// Pull-style cursor over a JSON document.
///
/// The contract mirrors a SAX-like tokenizer: [`next_event`] advances and
/// returns the event kind; scalar token text is read through
/// [`value_text`] until the next advance. Reading past the end of the root
/// value fails with [`StreamError::DocumentEnd`].
///
/// [`next_event`]: JsonParser::next_event
/// [`value_text`]: JsonParser::value_text
pub trait JsonParser {
    /// Advances the cursor and returns the next event.
    fn next_event(&mut self) -> Result<Event, StreamError>;

    /// Token text of the last `KeyName`, `ValueString` or `ValueNumber`
    /// event.
    fn value_text(&self) -> Result<&str, StreamError>;

    /// Structurally skips the next value.
    ///
    /// Only valid where a value is expected: at the document root, after a
    /// `KeyName` event, or at an array position. The skipped value never
    /// surfaces as events.
    fn skip_value(&mut self) -> Result<(), StreamError>;

    /// Current container nesting depth.
    fn current_level(&self) -> usize;

    /// Finishes reading and validates that the document is complete.
    ///
    /// After `close` the parser is unusable.
    fn close(&mut self) -> Result<(), StreamError>;
}

// -----------------------------------------------------------------------------
// JsonGenerator

/// Push-style JSON sink.
///
/// Member keys are written separately via [`write_key`] immediately before
/// the value they name, matching the event model on the parser side.
///
/// [`write_key`]: JsonGenerator::write_key
pub trait JsonGenerator {
    fn write_key(&mut self, key: &str) -> Result<(), StreamError>;

    fn write_start_object(&mut self) -> Result<(), StreamError>;
    fn write_end_object(&mut self) -> Result<(), StreamError>;
    fn write_start_array(&mut self) -> Result<(), StreamError>;
    fn write_end_array(&mut self) -> Result<(), StreamError>;

    fn write_string(&mut self, value: &str) -> Result<(), StreamError>;
    fn write_bool(&mut self, value: bool) -> Result<(), StreamError>;
    fn write_null(&mut self) -> Result<(), StreamError>;

    fn write_i64(&mut self, value: i64) -> Result<(), StreamError>;
    fn write_u64(&mut self, value: u64) -> Result<(), StreamError>;
    fn write_i128(&mut self, value: i128) -> Result<(), StreamError>;
    fn write_u128(&mut self, value: u128) -> Result<(), StreamError>;
    fn write_f64(&mut self, value: f64) -> Result<(), StreamError>;

    /// Writes a pre-rendered JSON number token.
    fn write_number_text(&mut self, text: &str) -> Result<(), StreamError>;

    /// Finishes the document and flushes the underlying sink.
    ///
    /// After `close` the generator is unusable.
    fn close(&mut self) -> Result<(), StreamError>;
}
