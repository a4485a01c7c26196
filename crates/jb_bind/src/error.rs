//! The error taxonomy of the binding engine.
//!
//! Configuration errors surface at chain-build time; structural errors at
//! (de)serialization time; user-component failures are always rewrapped so
//! callers catch a single error family.

use jb_json::StreamError;

use crate::bind::AccessError;

/// Any error raised by the binding engine.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    // -- configuration ------------------------------------------------------
    /// The class has neither a default constructor nor a creator.
    #[error("class `{type_path}` has no default constructor and no creator")]
    NoDefaultConstructor { type_path: String },

    /// An abstract class was requested for deserialization without a type
    /// mapping to a concrete implementation.
    #[error("cannot infer a concrete type for abstract class `{type_path}`")]
    CannotInferType { type_path: String },

    /// Two merged properties collide on the same JSON name.
    #[error("duplicate {kind} property name `{name}` on class `{type_path}`")]
    DuplicateProperty {
        kind: &'static str,
        name: String,
        type_path: String,
    },

    /// A date format pattern failed to compile.
    #[error("invalid date format pattern `{pattern}`: {reason}")]
    InvalidDateFormat { pattern: String, reason: String },

    /// Strict I-JSON forbids scalar root values.
    #[error("strict i-json does not allow a scalar root value")]
    ScalarRootForbidden,

    // -- structural / protocol ---------------------------------------------
    /// The parser is not positioned at an event the chain can process.
    #[error(
        "incorrect position for processing type `{type_path}`: received {received}, allowed {allowed}"
    )]
    UnexpectedEvent {
        type_path: String,
        received: String,
        allowed: &'static str,
    },

    /// A container chain finished at the wrong event, indicating either a
    /// malformed document or a defective composed step.
    #[error(
        "incorrect parser position after processing type `{type_path}`: started with {start}, ended with {end}"
    )]
    UnbalancedContainer {
        type_path: String,
        start: String,
        end: String,
    },

    /// A polymorphism discriminator value is not a registered alias.
    #[error("unknown alias `{alias}` for polymorphic type `{type_path}`")]
    UnknownAlias { alias: String, type_path: String },

    /// A map in entries form deviated from `{"key": …, "value": …}`.
    #[error(
        "map entry for `{type_path}` must be an object with exactly `key` and `value` members, found {found}"
    )]
    MalformedMapEntry { type_path: String, found: String },

    /// A creator parameter marked required has no value in the document.
    #[error("required creator parameter `{name}` of `{type_path}` is missing")]
    RequiredParameterMissing { name: String, type_path: String },

    /// JSON `null` arrived at a position whose type has no null
    /// representation.
    #[error("json null cannot be bound to non-optional type `{type_path}`")]
    NullNotAllowed { type_path: String },

    /// A scalar token could not be converted to the target type.
    #[error("cannot bind `{text}` to {target}")]
    InvalidScalar { text: String, target: &'static str },

    /// A date/time token could not be parsed with the configured format.
    #[error("cannot parse `{text}` as a date/time value: {reason}")]
    InvalidDate { text: String, reason: String },

    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    // -- unknown properties -------------------------------------------------
    /// Fail-on-unknown-properties is enabled and the document carried a
    /// member the class does not know.
    #[error("unknown property `{property}` on class `{type_path}`")]
    UnknownProperty {
        property: String,
        type_path: String,
    },

    // -- user components ----------------------------------------------------
    /// A user-supplied component failed; the original error is attached as
    /// the source.
    #[error("{kind} `{component}` bound for type `{type_path}` failed")]
    Component {
        kind: &'static str,
        component: String,
        type_path: String,
        #[source]
        source: Box<BindError>,
    },

    /// Free-form failure raised inside a user component.
    #[error("{0}")]
    Custom(String),

    // -- plumbing -----------------------------------------------------------
    #[error("value access failed: {0}")]
    Access(#[from] AccessError),

    #[error("json stream error: {0}")]
    Stream(#[from] StreamError),

    /// A composed step received an event it can never legally see; this is
    /// a bug signal, not user-facing validation.
    #[error("internal error in {location}: unexpected event {event}")]
    Internal {
        location: &'static str,
        event: String,
    },
}

impl BindError {
    /// Wraps an error raised inside a user component.
    pub(crate) fn component(
        kind: &'static str,
        component: &str,
        type_path: &str,
        source: BindError,
    ) -> Self {
        Self::Component {
            kind,
            component: component.to_string(),
            type_path: type_path.to_string(),
            source: Box::new(source),
        }
    }

    /// Free-form error for user components.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::BindError;

    #[test]
    fn component_error_carries_source() {
        let err = BindError::component(
            "adapter",
            "my::Adapter",
            "my::Target",
            BindError::custom("boom"),
        );
        let rendered = err.to_string();
        assert!(rendered.contains("my::Adapter"));
        assert!(rendered.contains("my::Target"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
