//! The deserializer chain steps.

use std::sync::{Arc, OnceLock};

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};

use hashbrown::{HashMap, HashSet};

use jb_json::{Event, JsonNumber, JsonParser, Value};

use crate::bind::Bind;
use crate::component::{BindAdapter, ComponentRef, UserDeserializer};
use crate::config::BinaryDataStrategy;
use crate::desc::{ArrayDesc, BindType, BytesDesc, ClassDesc, CreatorArgs, CreatorDesc};
use crate::desc::{Customization, ListDesc, MapDesc, OptionalDesc, Polymorphism, ScalarKind};
use crate::desc::WrapperDesc;
use crate::error::BindError;

use super::types::{scalar_default, scalar_from_text};
use super::{DeserializationContext, ModelDeserializer, Receiver};

type ArcDeserializer = Arc<dyn ModelDeserializer>;

// -----------------------------------------------------------------------------
// Expected event sets

/// The event group a [`PositionChecker`] accepts.
#[derive(Clone, Copy)]
pub(super) enum Expected {
    /// Any scalar value event, including null.
    Values,
    /// Either container start event.
    Container,
    StartObject,
    StartArray,
    /// A string value (or null), for Base64 payloads.
    Text,
}

impl Expected {
    fn contains(self, event: Event) -> bool {
        match self {
            Self::Values => event.is_scalar(),
            Self::Container => event.is_start(),
            Self::StartObject => event == Event::StartObject,
            Self::StartArray => event == Event::StartArray,
            Self::Text => matches!(event, Event::ValueString | Event::ValueNull),
        }
    }

    fn allowed(self) -> &'static str {
        match self {
            Self::Values => "value events",
            Self::Container => "START_OBJECT or START_ARRAY",
            Self::StartObject => "START_OBJECT",
            Self::StartArray => "START_ARRAY",
            Self::Text => "VALUE_STRING",
        }
    }
}

// -----------------------------------------------------------------------------
// PositionChecker

/// Validates that the parser is positioned at an expected event, and that
/// container steps leave the parser on the matching end event.
///
/// If the recorded event does not match, the checker advances once before
/// failing — user-defined components may legitimately leave the cursor one
/// event short. A mismatch after that, or an unbalanced end event, is a
/// fatal protocol violation.
pub(super) struct PositionChecker {
    expected: Expected,
    inner: ArcDeserializer,
    type_path: Box<str>,
}

impl PositionChecker {
    pub(super) fn new(expected: Expected, inner: ArcDeserializer, type_path: Box<str>) -> Self {
        Self {
            expected,
            inner,
            type_path,
        }
    }
}

impl ModelDeserializer for PositionChecker {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        let original = ctx.last_event();
        let mut start = original;
        if !start.is_some_and(|event| self.expected.contains(event)) {
            let advanced = ctx.advance(parser)?;
            if !self.expected.contains(advanced) {
                return Err(BindError::UnexpectedEvent {
                    type_path: self.type_path.to_string(),
                    received: match original {
                        Some(event) => event.to_string(),
                        None => advanced.to_string(),
                    },
                    allowed: self.expected.allowed(),
                });
            }
            start = Some(advanced);
        }

        let result = self.inner.deserialize(parser, ctx)?;

        if let Some(end) = start.and_then(Event::closing) {
            if ctx.last_event() != Some(end) {
                return Err(BindError::UnbalancedContainer {
                    type_path: self.type_path.to_string(),
                    start: start.map(|e| e.to_string()).unwrap_or_default(),
                    end: ctx
                        .last_event()
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "nothing".to_string()),
                });
            }
        }
        Ok(result)
    }
}

// -----------------------------------------------------------------------------
// NullCheck / ContextSwitch / Receive

/// Short-circuits JSON null before the wrapped step runs.
pub(super) struct NullCheckDeserializer {
    inner: ArcDeserializer,
}

impl NullCheckDeserializer {
    pub(super) fn new(inner: ArcDeserializer) -> Self {
        Self { inner }
    }
}

impl ModelDeserializer for NullCheckDeserializer {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        if ctx.last_event() == Some(Event::ValueNull) {
            return Ok(None);
        }
        self.inner.deserialize(parser, ctx)
    }
}

/// Runs the wrapped step in a fresh child context, so nested instance
/// construction never observes the state of the enclosing object.
pub(super) struct ContextSwitch {
    inner: ArcDeserializer,
}

impl ContextSwitch {
    pub(super) fn new(inner: ArcDeserializer) -> Self {
        Self { inner }
    }
}

impl ModelDeserializer for ContextSwitch {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        let mut child = ctx.child();
        let result = self.inner.deserialize(parser, &mut child);
        ctx.sync_events_from(&child);
        result
    }
}

/// Routes a produced value into its receiver.
pub(super) struct Receive {
    receiver: Receiver,
    inner: ArcDeserializer,
}

impl Receive {
    pub(super) fn new(receiver: Receiver, inner: ArcDeserializer) -> Self {
        Self { receiver, inner }
    }
}

impl ModelDeserializer for Receive {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        match self.inner.deserialize(parser, ctx)? {
            Some(value) => self.receiver.receive(value, ctx),
            // Null with no representation: the member keeps its default.
            None => Ok(None),
        }
    }
}

// -----------------------------------------------------------------------------
// Object member loop

pub(super) struct MemberTable {
    processors: HashMap<Box<str>, ArcDeserializer>,
    ignored: HashSet<Box<str>>,
    fail_on_unknown: bool,
    case_insensitive: bool,
    type_path: Box<str>,
}

impl MemberTable {
    pub(super) fn new(
        processors: HashMap<Box<str>, ArcDeserializer>,
        ignored: HashSet<Box<str>>,
        fail_on_unknown: bool,
        case_insensitive: bool,
        type_path: Box<str>,
    ) -> Self {
        Self {
            processors,
            ignored,
            fail_on_unknown,
            case_insensitive,
            type_path,
        }
    }

    /// Consumes members until the object closes. Property values are
    /// dispatched to their processors; unknown members fail or are
    /// structurally skipped without invoking any user code.
    fn process(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<(), BindError> {
        loop {
            if ctx.take_pending_end() {
                // The enclosing step already consumed the end event.
                ctx.set_last_event(Event::EndObject);
                return Ok(());
            }
            let key = match ctx.take_pending_key() {
                Some(key) => key,
                None => match ctx.advance(parser)? {
                    Event::KeyName => parser.value_text()?.to_string(),
                    Event::EndObject => return Ok(()),
                    other => {
                        return Err(BindError::Internal {
                            location: "object member loop",
                            event: other.to_string(),
                        });
                    }
                },
            };
            let lookup = if self.case_insensitive {
                key.to_lowercase()
            } else {
                key.clone()
            };
            match self.processors.get(lookup.as_str()) {
                Some(processor) => {
                    ctx.advance(parser)?;
                    processor.deserialize(parser, ctx)?;
                }
                None if self.ignored.contains(key.as_str()) => parser.skip_value()?,
                None if self.fail_on_unknown => {
                    return Err(BindError::UnknownProperty {
                        property: key,
                        type_path: self.type_path.to_string(),
                    });
                }
                None => parser.skip_value()?,
            }
        }
    }
}

/// Populates an already-created instance through setter receivers.
pub(super) struct ObjectDeserializer {
    members: MemberTable,
}

impl ObjectDeserializer {
    pub(super) fn new(members: MemberTable) -> Self {
        Self { members }
    }
}

impl ModelDeserializer for ObjectDeserializer {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        self.members.process(parser, ctx)?;
        Ok(None)
    }
}

/// Creates the instance through the default constructor, then populates
/// it member by member.
pub(super) struct DefaultObjectInstanceCreator {
    class: &'static ClassDesc,
    inner: ArcDeserializer,
}

impl DefaultObjectInstanceCreator {
    pub(super) fn new(class: &'static ClassDesc, inner: ArcDeserializer) -> Self {
        Self { class, inner }
    }
}

impl ModelDeserializer for DefaultObjectInstanceCreator {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        let instance = self.class.create_default().ok_or(BindError::Internal {
            location: "default instance creator",
            event: "constructor validated at build time is gone".to_string(),
        })?;
        ctx.set_instance(instance);
        self.inner.deserialize(parser, ctx)?;
        match ctx.take_instance() {
            Some(instance) => Ok(Some(instance)),
            None => Err(BindError::Internal {
                location: "default instance creator",
                event: "instance vanished during population".to_string(),
            }),
        }
    }
}

// -----------------------------------------------------------------------------
// Creator-based construction

/// Default for an absent, non-required creator parameter.
pub(super) enum ParamDefault {
    None,
    Scalar(ScalarKind),
    Optional(&'static OptionalDesc),
}

pub(super) struct ParamSlot {
    pub(super) name: Box<str>,
    pub(super) required: bool,
    pub(super) default: ParamDefault,
}

/// Collects creator arguments and deferred setters, constructs the
/// instance once the object closes, then replays the deferred setters.
///
/// Buffering is what makes member order irrelevant: a setter-bound
/// property may precede the creator parameters in the document.
pub(super) struct CreatorDeserializer {
    members: MemberTable,
    params: Vec<ParamSlot>,
    creator: &'static CreatorDesc,
    type_path: Box<str>,
}

impl CreatorDeserializer {
    pub(super) fn new(
        members: MemberTable,
        params: Vec<ParamSlot>,
        creator: &'static CreatorDesc,
        type_path: Box<str>,
    ) -> Self {
        Self {
            members,
            params,
            creator,
            type_path,
        }
    }

    fn finalize(
        &self,
        mut args: Vec<Option<Box<dyn Bind>>>,
    ) -> Result<Vec<Option<Box<dyn Bind>>>, BindError> {
        for (slot, param) in args.iter_mut().zip(&self.params) {
            if slot.is_some() {
                continue;
            }
            if param.required {
                return Err(BindError::RequiredParameterMissing {
                    name: param.name.to_string(),
                    type_path: self.type_path.to_string(),
                });
            }
            *slot = match &param.default {
                ParamDefault::None => None,
                ParamDefault::Scalar(kind) => scalar_default(*kind),
                ParamDefault::Optional(desc) => Some(desc.none()),
            };
        }
        Ok(args)
    }
}

impl ModelDeserializer for CreatorDeserializer {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        let saved = ctx.begin_creator_frame(self.params.len());
        let outcome = self.members.process(parser, ctx);
        let (args, deferred) = ctx.end_creator_frame(saved);
        outcome?;

        let args = self.finalize(args)?;
        let mut instance = self.creator.construct(CreatorArgs::new(args))?;
        for (setter, value) in deferred {
            setter.set(&mut *instance, value)?;
        }
        Ok(Some(instance))
    }
}

/// Terminal step for an abstract class that was never dispatched to a
/// concrete subclass.
pub(super) struct AbstractTypeFail {
    type_path: Box<str>,
}

impl AbstractTypeFail {
    pub(super) fn new(type_path: Box<str>) -> Self {
        Self { type_path }
    }
}

impl ModelDeserializer for AbstractTypeFail {
    fn deserialize(
        &self,
        _parser: &mut dyn JsonParser,
        _ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        Err(BindError::CannotInferType {
            type_path: self.type_path.to_string(),
        })
    }
}

// -----------------------------------------------------------------------------
// Polymorphism

/// Strips the discriminator member ahead of object deserialization and
/// dispatches to the aliased subclass chain when the document names one.
pub(super) struct PolymorphismDeserializer {
    config: &'static Polymorphism,
    expected: BindType,
    inner: ArcDeserializer,
    type_path: Box<str>,
}

impl PolymorphismDeserializer {
    pub(super) fn new(
        config: &'static Polymorphism,
        expected: BindType,
        inner: ArcDeserializer,
        type_path: Box<str>,
    ) -> Self {
        Self {
            config,
            expected,
            inner,
            type_path,
        }
    }
}

impl ModelDeserializer for PolymorphismDeserializer {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        match ctx.advance(parser)? {
            Event::EndObject => {
                // Empty object: no discriminator, fall through to the
                // statically expected class.
                ctx.set_pending_end();
                ctx.set_last_event(Event::StartObject);
                self.inner.deserialize(parser, ctx)
            }
            Event::KeyName => {
                let name = parser.value_text()?.to_string();
                if name != self.config.field() {
                    // First member is a regular property; replay it.
                    ctx.set_pending_key(name);
                    ctx.set_last_event(Event::StartObject);
                    return self.inner.deserialize(parser, ctx);
                }
                if ctx.advance(parser)? != Event::ValueString {
                    return Err(BindError::UnknownAlias {
                        alias: "<non-string discriminator>".to_string(),
                        type_path: self.type_path.to_string(),
                    });
                }
                let alias = parser.value_text()?.to_string();
                let Some(target) = self.config.type_of(&alias) else {
                    return Err(BindError::UnknownAlias {
                        alias,
                        type_path: self.type_path.to_string(),
                    });
                };
                // The chain continues mid-object; re-synthesize the start
                // state for whichever chain takes over.
                ctx.set_last_event(Event::StartObject);
                if *target == self.expected {
                    return self.inner.deserialize(parser, ctx);
                }
                let engine = ctx.engine();
                let chain = engine.deserializers.deserializer_chain(engine, target)?;
                chain.deserialize(parser, ctx)
            }
            other => Err(BindError::Internal {
                location: "polymorphism deserializer",
                event: other.to_string(),
            }),
        }
    }
}

// -----------------------------------------------------------------------------
// Containers

/// Creates and fills a growable sequence.
pub(super) struct CollectionDeserializer {
    desc: &'static ListDesc,
    element: ArcDeserializer,
    element_path: Box<str>,
}

impl CollectionDeserializer {
    pub(super) fn new(
        desc: &'static ListDesc,
        element: ArcDeserializer,
        element_path: Box<str>,
    ) -> Self {
        Self {
            desc,
            element,
            element_path,
        }
    }
}

impl ModelDeserializer for CollectionDeserializer {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        let mut list = self.desc.create();
        loop {
            if ctx.advance(parser)? == Event::EndArray {
                return Ok(Some(list));
            }
            match self.element.deserialize(parser, ctx)? {
                Some(item) => self.desc.push(&mut *list, item)?,
                None => {
                    return Err(BindError::NullNotAllowed {
                        type_path: self.element_path.to_string(),
                    });
                }
            }
        }
    }
}

/// Collects exactly the declared number of elements, then assembles the
/// fixed-length array.
pub(super) struct ArrayDeserializer {
    desc: &'static ArrayDesc,
    element: ArcDeserializer,
    element_path: Box<str>,
}

impl ArrayDeserializer {
    pub(super) fn new(
        desc: &'static ArrayDesc,
        element: ArcDeserializer,
        element_path: Box<str>,
    ) -> Self {
        Self {
            desc,
            element,
            element_path,
        }
    }
}

impl ModelDeserializer for ArrayDeserializer {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        let mut items = Vec::with_capacity(self.desc.len());
        loop {
            if ctx.advance(parser)? == Event::EndArray {
                return Ok(Some(self.desc.from_elements(items)?));
            }
            match self.element.deserialize(parser, ctx)? {
                Some(item) => items.push(item),
                None => {
                    return Err(BindError::NullNotAllowed {
                        type_path: self.element_path.to_string(),
                    });
                }
            }
        }
    }
}

/// Creates and fills a map, from either representation.
///
/// `{key: value}` form requires a stringifiable key kind; the entries form
/// `[{"key": …, "value": …}]` enforces exactly those two members, in that
/// order.
pub(super) struct MapDeserializer {
    desc: &'static MapDesc,
    key_kind: Option<ScalarKind>,
    key_chain: ArcDeserializer,
    value_chain: ArcDeserializer,
    type_path: Box<str>,
}

impl MapDeserializer {
    pub(super) fn new(
        desc: &'static MapDesc,
        key_kind: Option<ScalarKind>,
        key_chain: ArcDeserializer,
        value_chain: ArcDeserializer,
        type_path: Box<str>,
    ) -> Self {
        Self {
            desc,
            key_kind,
            key_chain,
            value_chain,
            type_path,
        }
    }

    fn malformed(&self, found: impl ToString) -> BindError {
        BindError::MalformedMapEntry {
            type_path: self.type_path.to_string(),
            found: found.to_string(),
        }
    }

    fn read_value(
        &self,
        chain: &ArcDeserializer,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Box<dyn Bind>, BindError> {
        ctx.advance(parser)?;
        chain.deserialize(parser, ctx)?.ok_or_else(|| {
            BindError::NullNotAllowed {
                type_path: self.type_path.to_string(),
            }
        })
    }

    fn expect_member(
        &self,
        name: &str,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<(), BindError> {
        if ctx.advance(parser)? != Event::KeyName {
            return Err(self.malformed(format!("missing `{name}` member")));
        }
        let found = parser.value_text()?;
        if found != name {
            return Err(self.malformed(format!("member `{found}` where `{name}` was expected")));
        }
        Ok(())
    }

    fn object_form(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        let Some(kind) = self.key_kind else {
            return Err(self.malformed("object representation for a non-stringifiable key type"));
        };
        let mut map = self.desc.create();
        loop {
            match ctx.advance(parser)? {
                Event::EndObject => return Ok(Some(map)),
                Event::KeyName => {
                    let key = scalar_from_text(kind, parser.value_text()?)?;
                    let value = self.read_value(&self.value_chain, parser, ctx)?;
                    self.desc.insert(&mut *map, key, value)?;
                }
                other => {
                    return Err(BindError::Internal {
                        location: "map deserializer",
                        event: other.to_string(),
                    });
                }
            }
        }
    }

    fn entries_form(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        let mut map = self.desc.create();
        loop {
            match ctx.advance(parser)? {
                Event::EndArray => return Ok(Some(map)),
                Event::StartObject => {
                    self.expect_member("key", parser, ctx)?;
                    let key = self.read_value(&self.key_chain, parser, ctx)?;
                    self.expect_member("value", parser, ctx)?;
                    let value = self.read_value(&self.value_chain, parser, ctx)?;
                    if ctx.advance(parser)? != Event::EndObject {
                        return Err(self.malformed("extra members in a map entry"));
                    }
                    self.desc.insert(&mut *map, key, value)?;
                }
                other => return Err(self.malformed(other)),
            }
        }
    }
}

impl ModelDeserializer for MapDeserializer {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        match ctx.last_event() {
            Some(Event::StartObject) => self.object_form(parser, ctx),
            Some(Event::StartArray) => self.entries_form(parser, ctx),
            other => Err(BindError::Internal {
                location: "map deserializer",
                event: other.map(|e| e.to_string()).unwrap_or_default(),
            }),
        }
    }
}

// -----------------------------------------------------------------------------
// Optional / Wrapper

/// Binds JSON null to `None` and anything else through the inner chain to
/// `Some`.
pub(super) struct OptionalDeserializer {
    desc: &'static OptionalDesc,
    inner: ArcDeserializer,
}

impl OptionalDeserializer {
    pub(super) fn new(desc: &'static OptionalDesc, inner: ArcDeserializer) -> Self {
        Self { desc, inner }
    }
}

impl ModelDeserializer for OptionalDeserializer {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        if ctx.last_event() == Some(Event::ValueNull) {
            return Ok(Some(self.desc.none()));
        }
        match self.inner.deserialize(parser, ctx)? {
            Some(value) => Ok(Some(self.desc.some(value)?)),
            None => Ok(Some(self.desc.none())),
        }
    }
}

/// Rebuilds a transparent wrapper around the inner value.
pub(super) struct WrapperDeserializer {
    desc: &'static WrapperDesc,
    inner: ArcDeserializer,
}

impl WrapperDeserializer {
    pub(super) fn new(desc: &'static WrapperDesc, inner: ArcDeserializer) -> Self {
        Self { desc, inner }
    }
}

impl ModelDeserializer for WrapperDeserializer {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        match self.inner.deserialize(parser, ctx)? {
            Some(value) => Ok(Some(self.desc.wrap(value)?)),
            None => Ok(None),
        }
    }
}

// -----------------------------------------------------------------------------
// Bytes

/// Reads a binary payload per the configured strategy.
pub(super) struct BytesDeserializer {
    desc: &'static BytesDesc,
    strategy: BinaryDataStrategy,
}

impl BytesDeserializer {
    pub(super) fn new(desc: &'static BytesDesc, strategy: BinaryDataStrategy) -> Self {
        Self { desc, strategy }
    }
}

impl ModelDeserializer for BytesDeserializer {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        match self.strategy {
            BinaryDataStrategy::Byte => {
                let mut bytes = Vec::new();
                loop {
                    match ctx.advance(parser)? {
                        Event::EndArray => return Ok(Some(self.desc.from_bytes(bytes))),
                        Event::ValueNumber => {
                            let text = parser.value_text()?;
                            let byte =
                                text.parse::<u8>().map_err(|_| BindError::InvalidScalar {
                                    text: text.to_string(),
                                    target: "u8",
                                })?;
                            bytes.push(byte);
                        }
                        other => {
                            return Err(BindError::Internal {
                                location: "byte array deserializer",
                                event: other.to_string(),
                            });
                        }
                    }
                }
            }
            BinaryDataStrategy::Base64 => {
                let decoded = STANDARD.decode(parser.value_text()?)?;
                Ok(Some(self.desc.from_bytes(decoded)))
            }
            BinaryDataStrategy::Base64Url => {
                let decoded = URL_SAFE.decode(parser.value_text()?)?;
                Ok(Some(self.desc.from_bytes(decoded)))
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Dynamic

/// Reads whatever the document carries into the [`Value`] model.
pub(super) struct DynamicDeserializer;

impl DynamicDeserializer {
    fn read_value(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Value, BindError> {
        let event = ctx.last_event().ok_or(BindError::Internal {
            location: "dynamic deserializer",
            event: "no event".to_string(),
        })?;
        match event {
            Event::ValueNull => Ok(Value::Null),
            Event::ValueTrue => Ok(Value::Bool(true)),
            Event::ValueFalse => Ok(Value::Bool(false)),
            Event::ValueString => Ok(Value::String(parser.value_text()?.to_string())),
            Event::ValueNumber => Ok(Value::Number(JsonNumber::from_text(parser.value_text()?))),
            Event::StartArray => {
                let mut items = Vec::new();
                loop {
                    if ctx.advance(parser)? == Event::EndArray {
                        return Ok(Value::Array(items));
                    }
                    items.push(self.read_value(parser, ctx)?);
                }
            }
            Event::StartObject => {
                let mut members = Vec::new();
                loop {
                    match ctx.advance(parser)? {
                        Event::EndObject => return Ok(Value::Object(members)),
                        Event::KeyName => {
                            let key = parser.value_text()?.to_string();
                            ctx.advance(parser)?;
                            members.push((key, self.read_value(parser, ctx)?));
                        }
                        other => {
                            return Err(BindError::Internal {
                                location: "dynamic deserializer",
                                event: other.to_string(),
                            });
                        }
                    }
                }
            }
            other => Err(BindError::Internal {
                location: "dynamic deserializer",
                event: other.to_string(),
            }),
        }
    }
}

impl ModelDeserializer for DynamicDeserializer {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        Ok(Some(Box::new(self.read_value(parser, ctx)?)))
    }
}

// -----------------------------------------------------------------------------
// Cyclic reference

/// Lazy placeholder for a type whose chain is currently being built; the
/// first invocation resolves the completed, cached chain.
pub(super) struct CyclicDeserializer {
    ty: BindType,
    customization: Customization,
    resolved: OnceLock<ArcDeserializer>,
}

impl CyclicDeserializer {
    pub(super) fn new(ty: BindType, customization: Customization) -> Self {
        Self {
            ty,
            customization,
            resolved: OnceLock::new(),
        }
    }
}

impl ModelDeserializer for CyclicDeserializer {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        let chain = match self.resolved.get() {
            Some(chain) => Arc::clone(chain),
            None => {
                let engine = ctx.engine();
                let chain =
                    engine
                        .deserializers
                        .chain_for(engine, &self.ty, &self.customization)?;
                let _ = self.resolved.set(Arc::clone(&chain));
                chain
            }
        };
        chain.deserialize(parser, ctx)
    }
}

// -----------------------------------------------------------------------------
// User components

/// Invokes a user deserializer in a fresh context; any failure inside it
/// is rewrapped as a component error.
pub(super) struct UserDeserializerNode {
    component: ComponentRef<dyn UserDeserializer>,
    target_path: Box<str>,
}

impl UserDeserializerNode {
    pub(super) fn new(
        component: ComponentRef<dyn UserDeserializer>,
        target_path: Box<str>,
    ) -> Self {
        Self {
            component,
            target_path,
        }
    }
}

impl ModelDeserializer for UserDeserializerNode {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        let mut child = ctx.child();
        let result = self
            .component
            .component()
            .deserialize(parser, &mut child)
            .map_err(|err| {
                BindError::component(
                    "deserializer",
                    self.component.name(),
                    &self.target_path,
                    err,
                )
            });
        ctx.sync_events_from(&child);
        Ok(Some(result?))
    }
}

/// Deserializes the adapted type, then maps back to the original through
/// the adapter.
pub(super) struct AdapterDeserializer {
    adapter: ComponentRef<dyn BindAdapter>,
    inner: ArcDeserializer,
    target_path: Box<str>,
}

impl AdapterDeserializer {
    pub(super) fn new(
        adapter: ComponentRef<dyn BindAdapter>,
        inner: ArcDeserializer,
        target_path: Box<str>,
    ) -> Self {
        Self {
            adapter,
            inner,
            target_path,
        }
    }
}

impl ModelDeserializer for AdapterDeserializer {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        let mut child = ctx.child();
        let adapted = self.inner.deserialize(parser, &mut child);
        ctx.sync_events_from(&child);
        match adapted? {
            Some(value) => {
                let original = self
                    .adapter
                    .component()
                    .from_adapted(value)
                    .map_err(|err| {
                        BindError::component(
                            "adapter",
                            self.adapter.name(),
                            &self.target_path,
                            err,
                        )
                    })?;
                Ok(Some(original))
            }
            None => Ok(None),
        }
    }
}
