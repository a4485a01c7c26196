//! The deserialization side: composable chain steps and their builder.

mod builder;
mod deserializers;
mod types;

pub use builder::DeserializationModelCreator;

use jb_json::{Event, JsonParser};

use crate::bind::Bind;
use crate::context::BindContext;
use crate::desc::{BindType, Setter};
use crate::error::BindError;

// -----------------------------------------------------------------------------
// ModelDeserializer

/// One composed deserialization step.
///
/// Steps are immutable, stateless and reusable; per-call state lives in
/// the [`DeserializationContext`]. A step is invoked with the context
/// positioned at the first event of the value it processes.
///
/// `Ok(None)` means the document carried a JSON `null` at a position whose
/// type has no null representation: members stay at their constructed
/// default, while container elements and roots turn this into an error.
pub trait ModelDeserializer: Send + Sync {
    fn deserialize(
        &self,
        parser: &mut dyn JsonParser,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError>;
}

// -----------------------------------------------------------------------------
// Receiver

/// What a member processor does with the value it produced.
///
/// Resolved at chain-build time: plain members apply their setter
/// immediately, creator-bound classes defer setter application until the
/// instance exists, and creator parameters collect into the argument
/// frame.
#[derive(Clone, Copy)]
pub(crate) enum Receiver {
    /// Hand the value back to the caller.
    Return,
    /// Apply a setter to the instance under construction.
    Set(&'static Setter),
    /// Buffer the setter application until creator construction finishes.
    Defer(&'static Setter),
    /// Store into the creator argument frame at the given index.
    CreatorArg(usize),
}

impl Receiver {
    pub(crate) fn receive(
        self,
        value: Box<dyn Bind>,
        ctx: &mut DeserializationContext<'_>,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        match self {
            Self::Return => Ok(Some(value)),
            Self::Set(setter) => {
                setter.set(ctx.instance_mut()?, value)?;
                Ok(None)
            }
            Self::Defer(setter) => {
                ctx.deferred.push((setter, value));
                Ok(None)
            }
            Self::CreatorArg(index) => {
                if let Some(slot) = ctx.creator_args.get_mut(index) {
                    *slot = Some(value);
                }
                Ok(None)
            }
        }
    }
}

// -----------------------------------------------------------------------------
// DeserializationContext

/// Per-call mutable deserialization state.
///
/// Confined to a single call and thread. Nested class values run in a
/// fresh child context (sharing the engine and the event cursor), so the
/// instance under construction, the creator argument frame and the
/// deferred setters never leak between nesting levels.
pub struct DeserializationContext<'a> {
    engine: &'a BindContext,
    last_event: Option<Event>,
    instance: Option<Box<dyn Bind>>,
    deferred: Vec<(&'static Setter, Box<dyn Bind>)>,
    creator_args: Vec<Option<Box<dyn Bind>>>,
    pending_key: Option<String>,
    pending_end: bool,
}

impl<'a> DeserializationContext<'a> {
    pub(crate) fn new(engine: &'a BindContext) -> Self {
        Self {
            engine,
            last_event: None,
            instance: None,
            deferred: Vec::new(),
            creator_args: Vec::new(),
            pending_key: None,
            pending_end: false,
        }
    }

    /// Fresh context for one nested value, inheriting the event cursor.
    pub(crate) fn child(&self) -> DeserializationContext<'a> {
        DeserializationContext {
            engine: self.engine,
            last_event: self.last_event,
            instance: None,
            deferred: Vec::new(),
            creator_args: Vec::new(),
            pending_key: None,
            pending_end: false,
        }
    }

    pub(crate) fn engine(&self) -> &'a BindContext {
        self.engine
    }

    /// Advances the parser and records the event.
    pub fn advance(&mut self, parser: &mut dyn JsonParser) -> Result<Event, BindError> {
        let event = parser.next_event()?;
        self.last_event = Some(event);
        Ok(event)
    }

    /// The last event the chain observed.
    #[inline]
    pub fn last_event(&self) -> Option<Event> {
        self.last_event
    }

    pub(crate) fn set_last_event(&mut self, event: Event) {
        self.last_event = Some(event);
    }

    pub(crate) fn sync_events_from(&mut self, child: &DeserializationContext<'_>) {
        self.last_event = child.last_event;
    }

    // -- instance under construction ---------------------------------------

    pub(crate) fn set_instance(&mut self, instance: Box<dyn Bind>) {
        self.instance = Some(instance);
    }

    pub(crate) fn take_instance(&mut self) -> Option<Box<dyn Bind>> {
        self.instance.take()
    }

    pub(crate) fn instance_mut(&mut self) -> Result<&mut dyn Bind, BindError> {
        match self.instance.as_deref_mut() {
            Some(instance) => Ok(instance),
            None => Err(BindError::Internal {
                location: "value setter",
                event: "no instance under construction".to_string(),
            }),
        }
    }

    // -- creator frame ------------------------------------------------------

    pub(crate) fn begin_creator_frame(
        &mut self,
        arity: usize,
    ) -> (Vec<Option<Box<dyn Bind>>>, Vec<(&'static Setter, Box<dyn Bind>)>) {
        let args = core::mem::replace(
            &mut self.creator_args,
            (0..arity).map(|_| None).collect(),
        );
        let deferred = core::mem::take(&mut self.deferred);
        (args, deferred)
    }

    pub(crate) fn end_creator_frame(
        &mut self,
        saved: (Vec<Option<Box<dyn Bind>>>, Vec<(&'static Setter, Box<dyn Bind>)>),
    ) -> (Vec<Option<Box<dyn Bind>>>, Vec<(&'static Setter, Box<dyn Bind>)>) {
        let args = core::mem::replace(&mut self.creator_args, saved.0);
        let deferred = core::mem::replace(&mut self.deferred, saved.1);
        (args, deferred)
    }

    // -- replay state for the polymorphism wrapper ---------------------------

    pub(crate) fn set_pending_key(&mut self, key: String) {
        self.pending_key = Some(key);
    }

    pub(crate) fn take_pending_key(&mut self) -> Option<String> {
        self.pending_key.take()
    }

    pub(crate) fn set_pending_end(&mut self) {
        self.pending_end = true;
    }

    pub(crate) fn take_pending_end(&mut self) -> bool {
        core::mem::replace(&mut self.pending_end, false)
    }

    // -- delegation ----------------------------------------------------------

    /// Deserializes a nested value of the given type.
    ///
    /// This is the delegation entry point for user deserializers. The
    /// parser must be positioned at the first event of the value; when no
    /// event of the value has been consumed yet, the next event is pulled
    /// first.
    pub fn deserialize(
        &mut self,
        ty: &BindType,
        parser: &mut dyn JsonParser,
    ) -> Result<Option<Box<dyn Bind>>, BindError> {
        let chain = self.engine.deserializers.deserializer_chain(self.engine, ty)?;
        let mut child = self.child();
        let result = chain.deserialize(parser, &mut child);
        self.sync_events_from(&child);
        result
    }
}
