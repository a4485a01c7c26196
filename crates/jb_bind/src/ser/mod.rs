//! The serialization side: composable chain steps and their builder.

mod builder;
mod serializers;
mod types;

pub use builder::SerializationModelCreator;

use jb_json::JsonGenerator;

use crate::bind::Bind;
use crate::context::BindContext;
use crate::desc::BindType;
use crate::error::BindError;

// -----------------------------------------------------------------------------
// ModelSerializer

/// One composed serialization step.
///
/// Steps are immutable, stateless and reusable; a composed chain is cached
/// per (type, formatting customization) and shared across calls and
/// threads. All per-call state lives in the [`SerializationContext`].
pub trait ModelSerializer: Send + Sync {
    fn serialize(
        &self,
        value: &dyn Bind,
        generator: &mut dyn JsonGenerator,
        ctx: &mut SerializationContext<'_>,
    ) -> Result<(), BindError>;
}

// -----------------------------------------------------------------------------
// SerializationContext

/// Per-call mutable serialization state.
///
/// Tracks the pending member key and the null-visibility scope; user
/// serializers use [`serialize`](Self::serialize) to delegate nested
/// values back to the engine.
pub struct SerializationContext<'a> {
    engine: &'a BindContext,
    key: Option<String>,
    write_nulls: bool,
}

impl<'a> SerializationContext<'a> {
    pub(crate) fn new(engine: &'a BindContext) -> Self {
        Self {
            engine,
            key: None,
            // The root value always materializes, null included; object
            // scopes narrow this to the per-property policy.
            write_nulls: true,
        }
    }

    pub(crate) fn engine(&self) -> &'a BindContext {
        self.engine
    }

    /// Sets the member key the next written value is named by.
    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = Some(key.into());
    }

    /// Takes the pending member key, if any.
    pub fn take_key(&mut self) -> Option<String> {
        self.key.take()
    }

    /// Whether nulls are written unconditionally in the current scope
    /// (inside containers) or subject to the null policy (inside objects).
    pub(crate) fn write_nulls(&self) -> bool {
        self.write_nulls
    }

    pub(crate) fn set_write_nulls(&mut self, write_nulls: bool) -> bool {
        core::mem::replace(&mut self.write_nulls, write_nulls)
    }

    /// Serializes a nested value by its runtime type.
    ///
    /// This is the delegation entry point for user serializers; it is also
    /// how dynamically typed positions dispatch.
    pub fn serialize(
        &mut self,
        value: &dyn Bind,
        generator: &mut dyn JsonGenerator,
    ) -> Result<(), BindError> {
        let ty = BindType::Desc(value.type_desc().ty().desc_fn());
        let chain = self.engine.serializers.serializer_chain(self.engine, &ty, false)?;
        chain.serialize(value, generator, self)
    }
}
