//! The serializer chain steps.

use std::sync::{Arc, OnceLock};

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};

use jb_json::{JsonGenerator, Value};

use crate::bind::Bind;
use crate::component::{BindAdapter, ComponentRef, UserSerializer};
use crate::config::BinaryDataStrategy;
use crate::desc::{ArrayDesc, BindType, BytesDesc, Customization, Getter};
use crate::desc::{ListDesc, MapDesc, OptionalDesc, ScalarKind, WrapperDesc};
use crate::error::BindError;

use super::types::scalar_key_text;
use super::{ModelSerializer, SerializationContext};

type ArcSerializer = Arc<dyn ModelSerializer>;

// -----------------------------------------------------------------------------
// KeyWriter

/// Writes the pending member key, if any, before the wrapped step.
pub(super) struct KeyWriter {
    inner: ArcSerializer,
}

impl KeyWriter {
    pub(super) fn new(inner: ArcSerializer) -> Self {
        Self { inner }
    }
}

impl ModelSerializer for KeyWriter {
    fn serialize(
        &self,
        value: &dyn Bind,
        generator: &mut dyn JsonGenerator,
        ctx: &mut SerializationContext<'_>,
    ) -> Result<(), BindError> {
        if let Some(key) = ctx.take_key() {
            generator.write_key(&key)?;
        }
        self.inner.serialize(value, generator, ctx)
    }
}

// -----------------------------------------------------------------------------
// ObjectSerializer

/// Serializes a class instance: discriminators first, then each readable
/// property through its getter and member chain, in model order.
pub(super) struct ObjectSerializer {
    discriminators: Vec<(Box<str>, Box<str>)>,
    properties: Vec<(Box<str>, &'static Getter, ArcSerializer)>,
}

impl ObjectSerializer {
    pub(super) fn new(
        discriminators: Vec<(Box<str>, Box<str>)>,
        properties: Vec<(Box<str>, &'static Getter, ArcSerializer)>,
    ) -> Self {
        Self {
            discriminators,
            properties,
        }
    }
}

impl ModelSerializer for ObjectSerializer {
    fn serialize(
        &self,
        value: &dyn Bind,
        generator: &mut dyn JsonGenerator,
        ctx: &mut SerializationContext<'_>,
    ) -> Result<(), BindError> {
        generator.write_start_object()?;
        for (field, alias) in &self.discriminators {
            generator.write_key(field)?;
            generator.write_string(alias)?;
        }
        // Object members follow the per-property null policy.
        let outer = ctx.set_write_nulls(false);
        let result = self.serialize_properties(value, generator, ctx);
        ctx.set_write_nulls(outer);
        result?;
        Ok(generator.write_end_object()?)
    }
}

impl ObjectSerializer {
    fn serialize_properties(
        &self,
        value: &dyn Bind,
        generator: &mut dyn JsonGenerator,
        ctx: &mut SerializationContext<'_>,
    ) -> Result<(), BindError> {
        for (name, getter, chain) in &self.properties {
            ctx.set_key(name.to_string());
            let member = getter.get(value)?;
            chain.serialize(member, generator, ctx)?;
            // A suppressed null clears its own key; anything left here
            // would leak into the next member.
            ctx.take_key();
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Containers

/// Serializes a growable sequence as a JSON array.
pub(super) struct CollectionSerializer {
    desc: &'static ListDesc,
    inner: ArcSerializer,
}

impl CollectionSerializer {
    pub(super) fn new(desc: &'static ListDesc, inner: ArcSerializer) -> Self {
        Self { desc, inner }
    }
}

impl ModelSerializer for CollectionSerializer {
    fn serialize(
        &self,
        value: &dyn Bind,
        generator: &mut dyn JsonGenerator,
        ctx: &mut SerializationContext<'_>,
    ) -> Result<(), BindError> {
        generator.write_start_array()?;
        // Null elements are structurally meaningful inside arrays.
        let outer = ctx.set_write_nulls(true);
        let result: Result<(), BindError> = (|| {
            for item in self.desc.iter(value)? {
                self.inner.serialize(item, generator, ctx)?;
            }
            Ok(())
        })();
        ctx.set_write_nulls(outer);
        result?;
        Ok(generator.write_end_array()?)
    }
}

/// Serializes a fixed-length array as a JSON array.
pub(super) struct ArraySerializer {
    desc: &'static ArrayDesc,
    inner: ArcSerializer,
}

impl ArraySerializer {
    pub(super) fn new(desc: &'static ArrayDesc, inner: ArcSerializer) -> Self {
        Self { desc, inner }
    }
}

impl ModelSerializer for ArraySerializer {
    fn serialize(
        &self,
        value: &dyn Bind,
        generator: &mut dyn JsonGenerator,
        ctx: &mut SerializationContext<'_>,
    ) -> Result<(), BindError> {
        generator.write_start_array()?;
        let outer = ctx.set_write_nulls(true);
        let result: Result<(), BindError> = (|| {
            for item in self.desc.iter(value)? {
                self.inner.serialize(item, generator, ctx)?;
            }
            Ok(())
        })();
        ctx.set_write_nulls(outer);
        result?;
        Ok(generator.write_end_array()?)
    }
}

/// Serializes a map with stringifiable keys as `{key: value, …}`.
pub(super) struct MapStringSerializer {
    desc: &'static MapDesc,
    key_kind: ScalarKind,
    value_chain: ArcSerializer,
}

impl MapStringSerializer {
    pub(super) fn new(
        desc: &'static MapDesc,
        key_kind: ScalarKind,
        value_chain: ArcSerializer,
    ) -> Self {
        Self {
            desc,
            key_kind,
            value_chain,
        }
    }
}

impl ModelSerializer for MapStringSerializer {
    fn serialize(
        &self,
        value: &dyn Bind,
        generator: &mut dyn JsonGenerator,
        ctx: &mut SerializationContext<'_>,
    ) -> Result<(), BindError> {
        generator.write_start_object()?;
        let outer = ctx.set_write_nulls(true);
        let result: Result<(), BindError> = (|| {
            for (key, entry_value) in self.desc.entries(value)? {
                ctx.set_key(scalar_key_text(key, self.key_kind)?);
                self.value_chain.serialize(entry_value, generator, ctx)?;
            }
            Ok(())
        })();
        ctx.set_write_nulls(outer);
        result?;
        Ok(generator.write_end_object()?)
    }
}

/// Serializes a map with complex keys as `[{"key": …, "value": …}, …]`.
pub(super) struct MapEntriesSerializer {
    desc: &'static MapDesc,
    key_chain: ArcSerializer,
    value_chain: ArcSerializer,
}

impl MapEntriesSerializer {
    pub(super) fn new(
        desc: &'static MapDesc,
        key_chain: ArcSerializer,
        value_chain: ArcSerializer,
    ) -> Self {
        Self {
            desc,
            key_chain,
            value_chain,
        }
    }
}

impl ModelSerializer for MapEntriesSerializer {
    fn serialize(
        &self,
        value: &dyn Bind,
        generator: &mut dyn JsonGenerator,
        ctx: &mut SerializationContext<'_>,
    ) -> Result<(), BindError> {
        generator.write_start_array()?;
        let outer = ctx.set_write_nulls(true);
        let result: Result<(), BindError> = (|| {
            for (key, entry_value) in self.desc.entries(value)? {
                generator.write_start_object()?;
                ctx.set_key("key");
                self.key_chain.serialize(key, generator, ctx)?;
                ctx.set_key("value");
                self.value_chain.serialize(entry_value, generator, ctx)?;
                generator.write_end_object()?;
            }
            Ok(())
        })();
        ctx.set_write_nulls(outer);
        result?;
        Ok(generator.write_end_array()?)
    }
}

// -----------------------------------------------------------------------------
// OptionalSerializer

/// Unwraps `Option` values; `None` becomes an explicit null or is omitted
/// together with its key, per the null policy of the position.
pub(super) struct OptionalSerializer {
    desc: &'static OptionalDesc,
    inner: ArcSerializer,
    nillable: bool,
}

impl OptionalSerializer {
    pub(super) fn new(desc: &'static OptionalDesc, inner: ArcSerializer, nillable: bool) -> Self {
        Self {
            desc,
            inner,
            nillable,
        }
    }
}

impl ModelSerializer for OptionalSerializer {
    fn serialize(
        &self,
        value: &dyn Bind,
        generator: &mut dyn JsonGenerator,
        ctx: &mut SerializationContext<'_>,
    ) -> Result<(), BindError> {
        match self.desc.as_inner(value)? {
            Some(inner) => self.inner.serialize(inner, generator, ctx),
            None if self.nillable || ctx.write_nulls() => {
                if let Some(key) = ctx.take_key() {
                    generator.write_key(&key)?;
                }
                Ok(generator.write_null()?)
            }
            None => {
                // Omitted entirely; drop the key that would have named it.
                ctx.take_key();
                Ok(())
            }
        }
    }
}

// -----------------------------------------------------------------------------
// WrapperSerializer

/// Borrows through a transparent wrapper (`Box`, `Arc`).
pub(super) struct WrapperSerializer {
    desc: &'static WrapperDesc,
    inner: ArcSerializer,
}

impl WrapperSerializer {
    pub(super) fn new(desc: &'static WrapperDesc, inner: ArcSerializer) -> Self {
        Self { desc, inner }
    }
}

impl ModelSerializer for WrapperSerializer {
    fn serialize(
        &self,
        value: &dyn Bind,
        generator: &mut dyn JsonGenerator,
        ctx: &mut SerializationContext<'_>,
    ) -> Result<(), BindError> {
        self.inner.serialize(self.desc.unwrap(value)?, generator, ctx)
    }
}

// -----------------------------------------------------------------------------
// BytesSerializer

/// Serializes a binary payload per the configured strategy.
pub(super) struct BytesSerializer {
    desc: &'static BytesDesc,
    strategy: BinaryDataStrategy,
}

impl BytesSerializer {
    pub(super) fn new(desc: &'static BytesDesc, strategy: BinaryDataStrategy) -> Self {
        Self { desc, strategy }
    }
}

impl ModelSerializer for BytesSerializer {
    fn serialize(
        &self,
        value: &dyn Bind,
        generator: &mut dyn JsonGenerator,
        _ctx: &mut SerializationContext<'_>,
    ) -> Result<(), BindError> {
        let bytes = self.desc.as_bytes(value)?;
        match self.strategy {
            BinaryDataStrategy::Byte => {
                generator.write_start_array()?;
                for byte in bytes {
                    generator.write_u64(u64::from(*byte))?;
                }
                Ok(generator.write_end_array()?)
            }
            BinaryDataStrategy::Base64 => Ok(generator.write_string(&STANDARD.encode(bytes))?),
            BinaryDataStrategy::Base64Url => {
                Ok(generator.write_string(&URL_SAFE.encode(bytes))?)
            }
        }
    }
}

// -----------------------------------------------------------------------------
// DynamicSerializer

/// Serializes a dynamically typed position.
///
/// [`Value`] documents are written structurally; any other value
/// dispatches through its own runtime descriptor.
pub(super) struct DynamicSerializer;

impl DynamicSerializer {
    fn write_value(
        &self,
        value: &Value,
        generator: &mut dyn JsonGenerator,
    ) -> Result<(), BindError> {
        match value {
            Value::Null => Ok(generator.write_null()?),
            Value::Bool(v) => Ok(generator.write_bool(*v)?),
            Value::Number(number) => Ok(generator.write_number_text(number.text())?),
            Value::String(text) => Ok(generator.write_string(text)?),
            Value::Array(items) => {
                generator.write_start_array()?;
                for item in items {
                    self.write_value(item, generator)?;
                }
                Ok(generator.write_end_array()?)
            }
            Value::Object(members) => {
                generator.write_start_object()?;
                for (key, member) in members {
                    generator.write_key(key)?;
                    self.write_value(member, generator)?;
                }
                Ok(generator.write_end_object()?)
            }
        }
    }
}

impl ModelSerializer for DynamicSerializer {
    fn serialize(
        &self,
        value: &dyn Bind,
        generator: &mut dyn JsonGenerator,
        ctx: &mut SerializationContext<'_>,
    ) -> Result<(), BindError> {
        match value.downcast_ref::<Value>() {
            Some(document) => self.write_value(document, generator),
            // Dispatch by the value's own runtime type.
            None => ctx.serialize(value, generator),
        }
    }
}

// -----------------------------------------------------------------------------
// CyclicSerializer

/// Lazy placeholder for a type whose chain is currently being built.
///
/// Unrolling a self-referential type eagerly would never terminate, so
/// the in-progress stack inserts this step instead; the first invocation
/// resolves the — by then complete and cached — real chain.
pub(super) struct CyclicSerializer {
    ty: BindType,
    customization: Customization,
    resolved: OnceLock<ArcSerializer>,
}

impl CyclicSerializer {
    pub(super) fn new(ty: BindType, customization: Customization) -> Self {
        Self {
            ty,
            customization,
            resolved: OnceLock::new(),
        }
    }
}

impl ModelSerializer for CyclicSerializer {
    fn serialize(
        &self,
        value: &dyn Bind,
        generator: &mut dyn JsonGenerator,
        ctx: &mut SerializationContext<'_>,
    ) -> Result<(), BindError> {
        let chain = match self.resolved.get() {
            Some(chain) => Arc::clone(chain),
            None => {
                let engine = ctx.engine();
                let chain = engine.serializers.chain_for(
                    engine,
                    &self.ty,
                    &self.customization,
                )?;
                let _ = self.resolved.set(Arc::clone(&chain));
                chain
            }
        };
        chain.serialize(value, generator, ctx)
    }
}

// -----------------------------------------------------------------------------
// User components

/// Applies an adapter and serializes the adapted value with the adapted
/// type's chain.
pub(super) struct AdapterSerializer {
    adapter: ComponentRef<dyn BindAdapter>,
    target_path: Box<str>,
    inner: ArcSerializer,
}

impl AdapterSerializer {
    pub(super) fn new(
        adapter: ComponentRef<dyn BindAdapter>,
        target_path: Box<str>,
        inner: ArcSerializer,
    ) -> Self {
        Self {
            adapter,
            target_path,
            inner,
        }
    }
}

impl ModelSerializer for AdapterSerializer {
    fn serialize(
        &self,
        value: &dyn Bind,
        generator: &mut dyn JsonGenerator,
        ctx: &mut SerializationContext<'_>,
    ) -> Result<(), BindError> {
        let adapted = self
            .adapter
            .component()
            .to_adapted(value)
            .map_err(|err| {
                BindError::component("adapter", self.adapter.name(), &self.target_path, err)
            })?;
        self.inner.serialize(&*adapted, generator, ctx)
    }
}

/// Invokes a user serializer; any failure inside it is rewrapped as a
/// component error.
pub(super) struct UserSerializerNode {
    component: ComponentRef<dyn UserSerializer>,
    target_path: Box<str>,
}

impl UserSerializerNode {
    pub(super) fn new(component: ComponentRef<dyn UserSerializer>, target_path: Box<str>) -> Self {
        Self {
            component,
            target_path,
        }
    }
}

impl ModelSerializer for UserSerializerNode {
    fn serialize(
        &self,
        value: &dyn Bind,
        generator: &mut dyn JsonGenerator,
        ctx: &mut SerializationContext<'_>,
    ) -> Result<(), BindError> {
        self.component
            .component()
            .serialize(value, generator, ctx)
            .map_err(|err| {
                BindError::component("serializer", self.component.name(), &self.target_path, err)
            })
    }
}
