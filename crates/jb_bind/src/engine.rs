//! The engine facade and per-call driver.

use std::io::{Read, Write};
use std::sync::Arc;

use jb_json::{JsonGenerator, JsonParser, StreamGenerator, StreamParser};
use jb_json::{Value, ValueGenerator, ValueParser};

use crate::bind::{Bind, Described};
use crate::config::BindConfig;
use crate::context::BindContext;
use crate::de::DeserializationContext;
use crate::desc::BindType;
use crate::error::BindError;
use crate::ser::SerializationContext;

/// A configured binding engine.
///
/// One engine owns the class-model cache, the chain caches and the
/// component registry; clones share them. Engines are `Send + Sync`;
/// independent calls may run concurrently, with first-time cache
/// population racing benignly.
///
/// # Limitations
///
/// Cyclic *types* are fully supported. Cyclic object *instances* (shared
/// mutable graphs where a value transitively contains itself) are not
/// detected and recurse until the stack overflows; such graphs require
/// interior mutability to build and are treated as a caller error.
///
/// # Examples
///
/// ```
/// use jb_bind::{BindConfig, Engine};
/// use jb_json::Value;
///
/// let engine = Engine::new(BindConfig::new());
///
/// let document: Value = engine.from_json(r#"{"a": [1, 2]}"#).unwrap();
/// assert_eq!(document.get("a").and_then(|a| a.at(1)).and_then(Value::as_i64), Some(2));
///
/// let json = engine.to_json(&document).unwrap();
/// assert_eq!(json, r#"{"a":[1,2]}"#);
/// ```
#[derive(Clone)]
pub struct Engine {
    ctx: Arc<BindContext>,
}

impl Engine {
    pub fn new(config: BindConfig) -> Self {
        Self {
            ctx: Arc::new(BindContext::new(config)),
        }
    }

    // -- serialization ------------------------------------------------------

    /// Serializes a value to a JSON string, by its runtime type.
    pub fn to_json(&self, value: &dyn Bind) -> Result<String, BindError> {
        let ty = runtime_type(value);
        self.to_json_typed(value, &ty)
    }

    /// Serializes a value to a JSON string against a pre-resolved type.
    pub fn to_json_typed(&self, value: &dyn Bind, ty: &BindType) -> Result<String, BindError> {
        let mut buffer = Vec::new();
        self.to_writer_typed(value, ty, &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| BindError::Internal {
            location: "json generator",
            event: err.to_string(),
        })
    }

    /// Serializes a value into any [`Write`] sink.
    pub fn to_writer(&self, value: &dyn Bind, sink: impl Write) -> Result<(), BindError> {
        let ty = runtime_type(value);
        self.to_writer_typed(value, &ty, sink)
    }

    pub fn to_writer_typed(
        &self,
        value: &dyn Bind,
        ty: &BindType,
        sink: impl Write,
    ) -> Result<(), BindError> {
        let mut generator = StreamGenerator::new(sink);
        self.to_generator_typed(value, ty, &mut generator)?;
        Ok(generator.close()?)
    }

    /// Serializes a value into an in-memory [`Value`] document.
    pub fn to_value(&self, value: &dyn Bind) -> Result<Value, BindError> {
        let ty = runtime_type(value);
        let mut generator = ValueGenerator::new();
        self.to_generator_typed(value, &ty, &mut generator)?;
        generator.take_value().ok_or(BindError::Internal {
            location: "value generator",
            event: "no document was produced".to_string(),
        })
    }

    /// Drives the chain against a caller-managed generator.
    ///
    /// The generator is *not* closed, so the caller can continue writing
    /// into the same document.
    pub fn to_generator(
        &self,
        value: &dyn Bind,
        generator: &mut dyn JsonGenerator,
    ) -> Result<(), BindError> {
        let ty = runtime_type(value);
        self.to_generator_typed(value, &ty, generator)
    }

    pub fn to_generator_typed(
        &self,
        value: &dyn Bind,
        ty: &BindType,
        generator: &mut dyn JsonGenerator,
    ) -> Result<(), BindError> {
        log::trace!("serializing `{}`", ty.path());
        let chain = self.ctx.serializers.serializer_chain(&self.ctx, ty, true)?;
        let mut sctx = SerializationContext::new(&self.ctx);
        chain.serialize(value, generator, &mut sctx)
    }

    // -- deserialization ----------------------------------------------------

    /// Deserializes a JSON string into a described type.
    pub fn from_json<T: Described>(&self, json: &str) -> Result<T, BindError> {
        let value = self.from_json_typed(json, &BindType::of::<T>())?;
        Ok(value.take::<T>()?)
    }

    /// Deserializes a JSON string against a pre-resolved type.
    pub fn from_json_typed(&self, json: &str, ty: &BindType) -> Result<Box<dyn Bind>, BindError> {
        self.from_reader_typed(json.as_bytes(), ty)
    }

    /// Deserializes from any [`Read`] source.
    pub fn from_reader<T: Described>(&self, source: impl Read) -> Result<T, BindError> {
        let value = self.from_reader_typed(source, &BindType::of::<T>())?;
        Ok(value.take::<T>()?)
    }

    pub fn from_reader_typed(
        &self,
        source: impl Read,
        ty: &BindType,
    ) -> Result<Box<dyn Bind>, BindError> {
        let mut parser = StreamParser::new(source);
        let value = self.from_parser(&mut parser, ty)?;
        parser.close()?;
        Ok(value)
    }

    /// Deserializes an in-memory [`Value`] document.
    pub fn from_value<T: Described>(&self, document: Value) -> Result<T, BindError> {
        let value = self.from_value_typed(document, &BindType::of::<T>())?;
        Ok(value.take::<T>()?)
    }

    pub fn from_value_typed(
        &self,
        document: Value,
        ty: &BindType,
    ) -> Result<Box<dyn Bind>, BindError> {
        let mut parser = ValueParser::new(document);
        let value = self.from_parser(&mut parser, ty)?;
        parser.close()?;
        Ok(value)
    }

    /// Drives the chain against a caller-managed parser.
    ///
    /// The parser is *not* closed, so the caller can keep reading from the
    /// same document.
    pub fn from_parser(
        &self,
        parser: &mut dyn JsonParser,
        ty: &BindType,
    ) -> Result<Box<dyn Bind>, BindError> {
        log::trace!("deserializing `{}`", ty.path());
        let chain = self.ctx.deserializers.deserializer_chain(&self.ctx, ty)?;
        let mut dctx = DeserializationContext::new(&self.ctx);
        dctx.advance(parser)?;
        match chain.deserialize(parser, &mut dctx)? {
            Some(value) => Ok(value),
            None => Err(BindError::NullNotAllowed {
                type_path: ty.path(),
            }),
        }
    }
}

fn runtime_type(value: &dyn Bind) -> BindType {
    BindType::Desc(value.type_desc().ty().desc_fn())
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use jb_json::{JsonGenerator, JsonParser, Value};
    use time::macros::datetime;
    use time::OffsetDateTime;

    use crate::bind::Described;
    use crate::component::{BindAdapter, UserDeserializer, UserSerializer};
    use crate::config::{BinaryDataStrategy, BindConfig};
    use crate::de::DeserializationContext;
    use crate::desc::{BindType, ClassCustomization, ClassDesc, CreatorDesc};
    use crate::desc::{CreatorParamDesc, DateFormat, DescCell, GenericDescCell, Getter};
    use crate::desc::{NumberFormat, Polymorphism, PropertyCustomization, PropertyDesc};
    use crate::desc::{Setter, TypeDesc};
    use crate::error::BindError;
    use crate::impls::Bytes;
    use crate::model::{PropertyNamingStrategy, PropertyOrderStrategy};
    use crate::ser::SerializationContext;

    use super::Engine;

    fn engine() -> Engine {
        Engine::new(BindConfig::new())
    }

    // -- fixtures -----------------------------------------------------------

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    impl Described for Point {
        fn descriptor() -> &'static TypeDesc {
            static CELL: DescCell = DescCell::new();
            CELL.get_or_init(|| {
                TypeDesc::Class(
                    ClassDesc::new::<Point>("Point")
                        .with_default_constructor::<Point>()
                        .with_property(
                            PropertyDesc::new("x", BindType::of::<i32>())
                                .with_getter(Getter::new(|p: &Point| &p.x))
                                .with_setter(Setter::new(|p: &mut Point, v: i32| p.x = v)),
                        )
                        .with_property(
                            PropertyDesc::new("y", BindType::of::<i32>())
                                .with_getter(Getter::new(|p: &Point| &p.y))
                                .with_setter(Setter::new(|p: &mut Point, v: i32| p.y = v)),
                        ),
                )
            })
        }
    }

    // Declared deliberately out of order to observe ordering strategies.
    #[derive(Debug, Default, Clone, PartialEq)]
    struct Unordered {
        b: i32,
        a: i32,
        c: i32,
    }

    impl Described for Unordered {
        fn descriptor() -> &'static TypeDesc {
            static CELL: DescCell = DescCell::new();
            CELL.get_or_init(|| {
                TypeDesc::Class(
                    ClassDesc::new::<Unordered>("Unordered")
                        .with_default_constructor::<Unordered>()
                        .with_property(
                            PropertyDesc::new("b", BindType::of::<i32>())
                                .with_getter(Getter::new(|u: &Unordered| &u.b))
                                .with_setter(Setter::new(|u: &mut Unordered, v: i32| u.b = v)),
                        )
                        .with_property(
                            PropertyDesc::new("a", BindType::of::<i32>())
                                .with_getter(Getter::new(|u: &Unordered| &u.a))
                                .with_setter(Setter::new(|u: &mut Unordered, v: i32| u.a = v)),
                        )
                        .with_property(
                            PropertyDesc::new("c", BindType::of::<i32>())
                                .with_getter(Getter::new(|u: &Unordered| &u.c))
                                .with_setter(Setter::new(|u: &mut Unordered, v: i32| u.c = v)),
                        ),
                )
            })
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Node {
        value: String,
        next: Option<Box<Node>>,
    }

    impl Described for Node {
        fn descriptor() -> &'static TypeDesc {
            static CELL: DescCell = DescCell::new();
            CELL.get_or_init(|| {
                TypeDesc::Class(
                    ClassDesc::new::<Node>("Node")
                        .with_default_constructor::<Node>()
                        .with_property(
                            PropertyDesc::new("next", BindType::of::<Option<Box<Node>>>())
                                .with_getter(Getter::new(|n: &Node| &n.next))
                                .with_setter(Setter::new(
                                    |n: &mut Node, v: Option<Box<Node>>| n.next = v,
                                )),
                        )
                        .with_property(
                            PropertyDesc::new("value", BindType::of::<String>())
                                .with_getter(Getter::new(|n: &Node| &n.value))
                                .with_setter(Setter::new(|n: &mut Node, v: String| n.value = v)),
                        ),
                )
            })
        }
    }

    // Creator-constructed for `x` and `y`, setter-populated for `z`.
    #[derive(Debug, Clone, PartialEq)]
    struct Created {
        x: i32,
        y: i32,
        z: i32,
    }

    impl Described for Created {
        fn descriptor() -> &'static TypeDesc {
            static CELL: DescCell = DescCell::new();
            CELL.get_or_init(|| {
                TypeDesc::Class(
                    ClassDesc::new::<Created>("Created")
                        .with_creator(CreatorDesc::new(
                            vec![
                                CreatorParamDesc::new("x", BindType::of::<i32>()),
                                CreatorParamDesc::new("y", BindType::of::<i32>()),
                            ],
                            |mut args| {
                                Ok(Box::new(Created {
                                    x: args.take(0)?,
                                    y: args.take(1)?,
                                    z: 0,
                                }))
                            },
                        ))
                        .with_property(
                            PropertyDesc::new("x", BindType::of::<i32>())
                                .with_getter(Getter::new(|c: &Created| &c.x)),
                        )
                        .with_property(
                            PropertyDesc::new("y", BindType::of::<i32>())
                                .with_getter(Getter::new(|c: &Created| &c.y)),
                        )
                        .with_property(
                            PropertyDesc::new("z", BindType::of::<i32>())
                                .with_getter(Getter::new(|c: &Created| &c.z))
                                .with_setter(Setter::new(|c: &mut Created, v: i32| c.z = v)),
                        ),
                )
            })
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Strict {
        id: i64,
    }

    impl Described for Strict {
        fn descriptor() -> &'static TypeDesc {
            static CELL: DescCell = DescCell::new();
            CELL.get_or_init(|| {
                TypeDesc::Class(
                    ClassDesc::new::<Strict>("Strict")
                        .with_creator(CreatorDesc::new(
                            vec![CreatorParamDesc::new("id", BindType::of::<i64>()).required()],
                            |mut args| Ok(Box::new(Strict { id: args.take(0)? })),
                        ))
                        .with_property(
                            PropertyDesc::new("id", BindType::of::<i64>())
                                .with_getter(Getter::new(|s: &Strict| &s.id)),
                        ),
                )
            })
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Known {
        known: String,
    }

    impl Described for Known {
        fn descriptor() -> &'static TypeDesc {
            static CELL: DescCell = DescCell::new();
            CELL.get_or_init(|| {
                TypeDesc::Class(
                    ClassDesc::new::<Known>("Known")
                        .with_default_constructor::<Known>()
                        .with_property(
                            PropertyDesc::new("known", BindType::of::<String>())
                                .with_getter(Getter::new(|k: &Known| &k.known))
                                .with_setter(Setter::new(|k: &mut Known, v: String| k.known = v)),
                        ),
                )
            })
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Inventory {
        items: Vec<Point>,
        counts: BTreeMap<String, i64>,
    }

    impl Described for Inventory {
        fn descriptor() -> &'static TypeDesc {
            static CELL: DescCell = DescCell::new();
            CELL.get_or_init(|| {
                TypeDesc::Class(
                    ClassDesc::new::<Inventory>("Inventory")
                        .with_default_constructor::<Inventory>()
                        .with_property(
                            PropertyDesc::new("items", BindType::of::<Vec<Point>>())
                                .with_getter(Getter::new(|i: &Inventory| &i.items))
                                .with_setter(Setter::new(
                                    |i: &mut Inventory, v: Vec<Point>| i.items = v,
                                )),
                        )
                        .with_property(
                            PropertyDesc::new("counts", BindType::of::<BTreeMap<String, i64>>())
                                .with_getter(Getter::new(|i: &Inventory| &i.counts))
                                .with_setter(Setter::new(
                                    |i: &mut Inventory, v: BTreeMap<String, i64>| i.counts = v,
                                )),
                        ),
                )
            })
        }
    }

    #[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord)]
    struct Coord {
        row: i32,
        col: i32,
    }

    impl Described for Coord {
        fn descriptor() -> &'static TypeDesc {
            static CELL: DescCell = DescCell::new();
            CELL.get_or_init(|| {
                TypeDesc::Class(
                    ClassDesc::new::<Coord>("Coord")
                        .with_default_constructor::<Coord>()
                        .with_property(
                            PropertyDesc::new("row", BindType::of::<i32>())
                                .with_getter(Getter::new(|c: &Coord| &c.row))
                                .with_setter(Setter::new(|c: &mut Coord, v: i32| c.row = v)),
                        )
                        .with_property(
                            PropertyDesc::new("col", BindType::of::<i32>())
                                .with_getter(Getter::new(|c: &Coord| &c.col))
                                .with_setter(Setter::new(|c: &mut Coord, v: i32| c.col = v)),
                        ),
                )
            })
        }
    }

    // -- polymorphic hierarchy ----------------------------------------------

    #[derive(Debug)]
    struct Shape;

    impl Described for Shape {
        fn descriptor() -> &'static TypeDesc {
            static CELL: DescCell = DescCell::new();
            CELL.get_or_init(|| {
                TypeDesc::Class(
                    ClassDesc::new::<Shape>("Shape").abstract_type().with_customization(
                        ClassCustomization::new().with_polymorphism(
                            Polymorphism::new("@type")
                                .with_alias("circle", BindType::of::<Circle>())
                                .with_alias("square", BindType::of::<Square>()),
                        ),
                    ),
                )
            })
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Circle {
        radius: f64,
    }

    impl Described for Circle {
        fn descriptor() -> &'static TypeDesc {
            static CELL: DescCell = DescCell::new();
            CELL.get_or_init(|| {
                TypeDesc::Class(
                    ClassDesc::new::<Circle>("Circle")
                        .with_default_constructor::<Circle>()
                        .with_customization(
                            ClassCustomization::new()
                                .with_polymorphism_parent(Shape::descriptor),
                        )
                        .with_property(
                            PropertyDesc::new("radius", BindType::of::<f64>())
                                .with_getter(Getter::new(|c: &Circle| &c.radius))
                                .with_setter(Setter::new(|c: &mut Circle, v: f64| c.radius = v)),
                        ),
                )
            })
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Square {
        side: f64,
    }

    impl Described for Square {
        fn descriptor() -> &'static TypeDesc {
            static CELL: DescCell = DescCell::new();
            CELL.get_or_init(|| {
                TypeDesc::Class(
                    ClassDesc::new::<Square>("Square")
                        .with_default_constructor::<Square>()
                        .with_customization(
                            ClassCustomization::new()
                                .with_polymorphism_parent(Shape::descriptor),
                        )
                        .with_property(
                            PropertyDesc::new("side", BindType::of::<f64>())
                                .with_getter(Getter::new(|s: &Square| &s.side))
                                .with_setter(Setter::new(|s: &mut Square, v: f64| s.side = v)),
                        ),
                )
            })
        }
    }

    // -- scalar round trips --------------------------------------------------

    #[test]
    fn scalar_round_trips() {
        let engine = engine();

        assert_eq!(engine.to_json(&42_i32).unwrap(), "42");
        assert_eq!(engine.from_json::<i32>("42").unwrap(), 42);

        assert_eq!(engine.to_json(&true).unwrap(), "true");
        assert_eq!(engine.from_json::<bool>("true").unwrap(), true);

        assert_eq!(engine.to_json(&1.5_f64).unwrap(), "1.5");
        assert_eq!(engine.from_json::<f64>("1.5").unwrap(), 1.5);

        let text = String::from("hello \"world\"");
        let json = engine.to_json(&text).unwrap();
        assert_eq!(engine.from_json::<String>(&json).unwrap(), text);

        assert_eq!(engine.from_json::<char>("\"x\"").unwrap(), 'x');

        let big = 170_141_183_460_469_231_731_687_303_715_884_105_727_i128;
        let json = engine.to_json(&big).unwrap();
        assert_eq!(engine.from_json::<i128>(&json).unwrap(), big);

        assert_eq!(engine.to_json(&u64::MAX).unwrap(), u64::MAX.to_string());
        assert_eq!(engine.from_json::<u64>(&u64::MAX.to_string()).unwrap(), u64::MAX);
    }

    #[test]
    fn option_roots() {
        let engine = engine();
        assert_eq!(engine.to_json(&None::<i32>).unwrap(), "null");
        assert_eq!(engine.from_json::<Option<i32>>("null").unwrap(), None);
        assert_eq!(engine.from_json::<Option<i32>>("3").unwrap(), Some(3));

        let err = engine.from_json::<i32>("null").unwrap_err();
        assert!(matches!(err, BindError::NullNotAllowed { .. }));
    }

    // -- beans ---------------------------------------------------------------

    #[test]
    fn bean_round_trip() {
        let engine = engine();
        let point = Point { x: 1, y: -2 };
        let json = engine.to_json(&point).unwrap();
        assert_eq!(json, r#"{"x":1,"y":-2}"#);
        assert_eq!(engine.from_json::<Point>(&json).unwrap(), point);
    }

    #[test]
    fn lexicographic_order_regardless_of_declaration() {
        let engine = engine();
        let value = Unordered { b: 2, a: 1, c: 3 };
        assert_eq!(engine.to_json(&value).unwrap(), r#"{"a":1,"b":2,"c":3}"#);
    }

    #[test]
    fn reverse_and_declaration_order() {
        let value = Unordered { b: 2, a: 1, c: 3 };

        let engine = Engine::new(
            BindConfig::new().with_property_order_strategy(PropertyOrderStrategy::Reverse),
        );
        assert_eq!(engine.to_json(&value).unwrap(), r#"{"c":3,"b":2,"a":1}"#);

        let engine = Engine::new(
            BindConfig::new().with_property_order_strategy(PropertyOrderStrategy::Declaration),
        );
        assert_eq!(engine.to_json(&value).unwrap(), r#"{"b":2,"a":1,"c":3}"#);
    }

    #[test]
    fn nested_containers_round_trip() {
        let engine = engine();
        let inventory = Inventory {
            items: vec![Point { x: 1, y: 2 }, Point { x: 3, y: 4 }],
            counts: BTreeMap::from([("left".to_string(), 7_i64), ("right".to_string(), 9_i64)]),
        };
        let json = engine.to_json(&inventory).unwrap();
        assert_eq!(engine.from_json::<Inventory>(&json).unwrap(), inventory);

        // Plain map shape for string keys.
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["counts"]["left"], serde_json::json!(7));
    }

    #[test]
    fn array_round_trip() {
        let engine = engine();
        let values = [1_i32, 2, 3];
        let json = engine.to_json(&values).unwrap();
        assert_eq!(json, "[1,2,3]");
        assert_eq!(engine.from_json::<[i32; 3]>(&json).unwrap(), values);

        let err = engine.from_json::<[i32; 3]>("[1,2]").unwrap_err();
        assert!(matches!(err, BindError::Access(_)));
    }

    // -- unknown properties --------------------------------------------------

    #[test]
    fn unknown_property_skipped_structurally() {
        let engine = engine();
        let parsed: Known = engine
            .from_json(r#"{"known":"x","bogus":{"nested":[1,{"deep":true}]}}"#)
            .unwrap();
        assert_eq!(parsed.known, "x");
    }

    #[test]
    fn unknown_property_fails_when_configured() {
        let engine = Engine::new(BindConfig::new().with_fail_on_unknown_properties(true));
        let err = engine
            .from_json::<Known>(r#"{"known":"x","bogus":1}"#)
            .unwrap_err();
        match err {
            BindError::UnknownProperty { property, .. } => assert_eq!(property, "bogus"),
            other => panic!("unexpected error: {other}"),
        }
    }

    // -- creators ------------------------------------------------------------

    #[test]
    fn creator_with_deferred_setter_in_any_order() {
        let engine = engine();
        let expected = Created { x: 1, y: 2, z: 3 };

        for json in [
            r#"{"x":1,"y":2,"z":3}"#,
            r#"{"z":3,"x":1,"y":2}"#,
            r#"{"y":2,"z":3,"x":1}"#,
        ] {
            assert_eq!(engine.from_json::<Created>(json).unwrap(), expected, "{json}");
        }
    }

    #[test]
    fn missing_creator_parameter_defaults_to_zero() {
        let engine = engine();
        let parsed: Created = engine.from_json(r#"{"x":5}"#).unwrap();
        assert_eq!(parsed, Created { x: 5, y: 0, z: 0 });
    }

    #[test]
    fn required_creator_parameter_must_be_present() {
        let engine = engine();
        assert_eq!(
            engine.from_json::<Strict>(r#"{"id":9}"#).unwrap(),
            Strict { id: 9 }
        );

        let err = engine.from_json::<Strict>("{}").unwrap_err();
        match err {
            BindError::RequiredParameterMissing { name, .. } => assert_eq!(name, "id"),
            other => panic!("unexpected error: {other}"),
        }
    }

    // -- cyclic types --------------------------------------------------------

    #[test]
    fn self_referential_type_builds_and_round_trips() {
        let engine = Engine::new(BindConfig::new().with_serialize_null_values(true));
        let root = Node {
            value: "root".to_string(),
            next: Some(Box::new(Node {
                value: "leaf".to_string(),
                next: None,
            })),
        };

        let json = engine.to_json(&root).unwrap();
        assert_eq!(
            json,
            r#"{"next":{"next":null,"value":"leaf"},"value":"root"}"#
        );
        assert_eq!(engine.from_json::<Node>(&json).unwrap(), root);

        // Key order in the document must not matter.
        let reordered = r#"{"value":"root","next":{"value":"leaf","next":null}}"#;
        assert_eq!(engine.from_json::<Node>(reordered).unwrap(), root);
    }

    // -- maps ----------------------------------------------------------------

    #[test]
    fn map_representation_switches_on_key_type() {
        let engine = engine();

        let simple = BTreeMap::from([("k1".to_string(), 1_i64), ("k2".to_string(), 2_i64)]);
        let json = engine.to_json(&simple).unwrap();
        assert_eq!(json, r#"{"k1":1,"k2":2}"#);
        assert_eq!(
            engine.from_json::<BTreeMap<String, i64>>(&json).unwrap(),
            simple
        );

        let complex = BTreeMap::from([
            (Coord { row: 1, col: 2 }, 10_i64),
            (Coord { row: 3, col: 4 }, 20_i64),
        ]);
        let json = engine.to_json(&complex).unwrap();
        assert_eq!(
            json,
            r#"[{"key":{"col":2,"row":1},"value":10},{"key":{"col":4,"row":3},"value":20}]"#
        );
        assert_eq!(
            engine.from_json::<BTreeMap<Coord, i64>>(&json).unwrap(),
            complex
        );
    }

    #[test]
    fn integer_keys_use_plain_map_shape() {
        let engine = engine();
        let map = BTreeMap::from([(1_i32, "one".to_string()), (2_i32, "two".to_string())]);
        let json = engine.to_json(&map).unwrap();
        assert_eq!(json, r#"{"1":"one","2":"two"}"#);
        assert_eq!(engine.from_json::<BTreeMap<i32, String>>(&json).unwrap(), map);
    }

    #[test]
    fn malformed_map_entries_are_rejected() {
        let engine = engine();

        for json in [
            r#"[{"value":10,"key":{"row":1,"col":2}}]"#,
            r#"[{"key":{"row":1,"col":2}}]"#,
            r#"[{"key":{"row":1,"col":2},"value":10,"extra":1}]"#,
            r#"[7]"#,
        ] {
            let err = engine
                .from_json::<BTreeMap<Coord, i64>>(json)
                .unwrap_err();
            assert!(
                matches!(err, BindError::MalformedMapEntry { .. }),
                "{json}: {err}"
            );
        }
    }

    // -- binary data ---------------------------------------------------------

    #[test]
    fn binary_strategies() {
        let payload = Bytes::new(vec![1_u8, 2, 3]);

        let engine = engine();
        let json = engine.to_json(&payload).unwrap();
        assert_eq!(json, "[1,2,3]");
        assert_eq!(engine.from_json::<Bytes>(&json).unwrap(), payload);

        let engine =
            Engine::new(BindConfig::new().with_binary_data_strategy(BinaryDataStrategy::Base64));
        let json = engine.to_json(&payload).unwrap();
        assert_eq!(json, r#""AQID""#);
        assert_eq!(engine.from_json::<Bytes>(&json).unwrap(), payload);

        // Strict I-JSON forces the URL-safe alphabet.
        let engine = Engine::new(
            BindConfig::new()
                .with_binary_data_strategy(BinaryDataStrategy::Byte)
                .with_strict_ijson(true),
        );
        let url_safe = Bytes::new(vec![251_u8, 239]);
        let json = engine.to_json(&url_safe).unwrap();
        assert_eq!(json, r#""--8=""#);
        assert_eq!(engine.from_json::<Bytes>(&json).unwrap(), url_safe);
    }

    #[test]
    fn strict_ijson_rejects_scalar_roots() {
        let engine = Engine::new(BindConfig::new().with_strict_ijson(true));
        let err = engine.to_json(&1_i32).unwrap_err();
        assert!(matches!(err, BindError::ScalarRootForbidden));

        // Structured roots stay fine.
        assert!(engine.to_json(&Point { x: 1, y: 2 }).is_ok());
    }

    // -- polymorphism --------------------------------------------------------

    #[test]
    fn polymorphic_round_trip() {
        let engine = engine();
        let circle = Circle { radius: 2.5 };

        let json = engine.to_json(&circle).unwrap();
        assert_eq!(json, r#"{"@type":"circle","radius":2.5}"#);

        let shape_ty = BindType::of::<Shape>();
        let parsed = engine.from_json_typed(&json, &shape_ty).unwrap();
        assert_eq!(parsed.take::<Circle>().unwrap(), circle);

        let square = engine
            .from_json_typed(r#"{"@type":"square","side":4.0}"#, &shape_ty)
            .unwrap();
        assert_eq!(square.take::<Square>().unwrap(), Square { side: 4.0 });
    }

    #[test]
    fn unknown_alias_is_fatal() {
        let engine = engine();
        let err = engine
            .from_json_typed(r#"{"@type":"triangle","sides":3}"#, &BindType::of::<Shape>())
            .unwrap_err();
        match err {
            BindError::UnknownAlias { alias, .. } => assert_eq!(alias, "triangle"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn discriminator_is_never_an_unknown_property() {
        let engine = Engine::new(BindConfig::new().with_fail_on_unknown_properties(true));
        let parsed = engine
            .from_json_typed(
                r#"{"@type":"circle","radius":1.0}"#,
                &BindType::of::<Shape>(),
            )
            .unwrap();
        assert_eq!(parsed.take::<Circle>().unwrap(), Circle { radius: 1.0 });
    }

    #[test]
    fn abstract_type_without_discriminator_cannot_instantiate() {
        let engine = engine();
        let err = engine
            .from_json_typed(r#"{"radius":1.0}"#, &BindType::of::<Shape>())
            .unwrap_err();
        assert!(matches!(err, BindError::CannotInferType { .. }));
    }

    // -- documents -----------------------------------------------------------

    #[test]
    fn value_document_round_trip_preserves_order() {
        let engine = engine();
        let json = r#"{"zulu":1,"alpha":[true,null,"x"],"mid":{"b":1,"a":2}}"#;
        let document: Value = engine.from_json(json).unwrap();
        assert_eq!(engine.to_json(&document).unwrap(), json);
    }

    #[test]
    fn to_value_and_back() {
        let engine = engine();
        let point = Point { x: 7, y: 8 };
        let document = engine.to_value(&point).unwrap();
        assert_eq!(document.get("x").and_then(Value::as_i64), Some(7));
        assert_eq!(engine.from_value::<Point>(document).unwrap(), point);
    }

    // -- null policy ---------------------------------------------------------

    #[test]
    fn absent_options_are_omitted_by_default() {
        let engine = engine();
        let node = Node {
            value: "only".to_string(),
            next: None,
        };
        assert_eq!(engine.to_json(&node).unwrap(), r#"{"value":"only"}"#);
    }

    #[test]
    fn null_elements_inside_arrays_are_always_written() {
        let engine = engine();
        let values = vec![Some(1_i32), None, Some(3)];
        assert_eq!(engine.to_json(&values).unwrap(), "[1,null,3]");
        assert_eq!(
            engine.from_json::<Vec<Option<i32>>>("[1,null,3]").unwrap(),
            values
        );
    }

    #[test]
    fn null_for_non_optional_element_fails() {
        let engine = engine();
        let err = engine.from_json::<Vec<i32>>("[1,null]").unwrap_err();
        assert!(matches!(err, BindError::NullNotAllowed { .. }));
    }

    // -- naming --------------------------------------------------------------

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Named {
        first_name: String,
    }

    impl Described for Named {
        fn descriptor() -> &'static TypeDesc {
            static CELL: DescCell = DescCell::new();
            CELL.get_or_init(|| {
                TypeDesc::Class(
                    ClassDesc::new::<Named>("Named")
                        .with_default_constructor::<Named>()
                        .with_property(
                            PropertyDesc::new("firstName", BindType::of::<String>())
                                .with_getter(Getter::new(|n: &Named| &n.first_name))
                                .with_setter(Setter::new(
                                    |n: &mut Named, v: String| n.first_name = v,
                                )),
                        ),
                )
            })
        }
    }

    #[test]
    fn naming_strategy_translates_member_names() {
        let engine = Engine::new(BindConfig::new().with_property_naming_strategy(
            PropertyNamingStrategy::LowerCaseWithUnderscores,
        ));
        let named = Named {
            first_name: "Ada".to_string(),
        };
        let json = engine.to_json(&named).unwrap();
        assert_eq!(json, r#"{"first_name":"Ada"}"#);
        assert_eq!(engine.from_json::<Named>(&json).unwrap(), named);
    }

    #[test]
    fn case_insensitive_reading() {
        let engine = Engine::new(
            BindConfig::new()
                .with_property_naming_strategy(PropertyNamingStrategy::CaseInsensitive),
        );
        let parsed: Named = engine.from_json(r#"{"FIRSTNAME":"Ada"}"#).unwrap();
        assert_eq!(parsed.first_name, "Ada");
    }

    // -- dates and numbers ---------------------------------------------------

    #[derive(Debug, Clone, PartialEq)]
    struct Stamped {
        at: OffsetDateTime,
        millis: OffsetDateTime,
    }

    impl Default for Stamped {
        fn default() -> Self {
            Self {
                at: OffsetDateTime::UNIX_EPOCH,
                millis: OffsetDateTime::UNIX_EPOCH,
            }
        }
    }

    impl Described for Stamped {
        fn descriptor() -> &'static TypeDesc {
            static CELL: DescCell = DescCell::new();
            CELL.get_or_init(|| {
                TypeDesc::Class(
                    ClassDesc::new::<Stamped>("Stamped")
                        .with_default_constructor::<Stamped>()
                        .with_property(
                            PropertyDesc::new("at", BindType::of::<OffsetDateTime>())
                                .with_getter(Getter::new(|s: &Stamped| &s.at))
                                .with_setter(Setter::new(
                                    |s: &mut Stamped, v: OffsetDateTime| s.at = v,
                                )),
                        )
                        .with_property(
                            PropertyDesc::new("millis", BindType::of::<OffsetDateTime>())
                                .with_getter(Getter::new(|s: &Stamped| &s.millis))
                                .with_setter(Setter::new(
                                    |s: &mut Stamped, v: OffsetDateTime| s.millis = v,
                                ))
                                .with_customization(
                                    PropertyCustomization::new()
                                        .with_date_format(DateFormat::UnixMillis),
                                ),
                        ),
                )
            })
        }
    }

    #[test]
    fn date_formats_round_trip() {
        let engine = engine();
        let stamped = Stamped {
            at: datetime!(2026-08-06 12:30:00 UTC),
            millis: datetime!(2026-08-06 12:30:00.5 UTC),
        };
        let json = engine.to_json(&stamped).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["at"], serde_json::json!("2026-08-06T12:30:00Z"));
        assert!(parsed["millis"].is_number());

        assert_eq!(engine.from_json::<Stamped>(&json).unwrap(), stamped);
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Priced {
        price: f64,
    }

    impl Described for Priced {
        fn descriptor() -> &'static TypeDesc {
            static CELL: DescCell = DescCell::new();
            CELL.get_or_init(|| {
                TypeDesc::Class(
                    ClassDesc::new::<Priced>("Priced")
                        .with_default_constructor::<Priced>()
                        .with_property(
                            PropertyDesc::new("price", BindType::of::<f64>())
                                .with_getter(Getter::new(|p: &Priced| &p.price))
                                .with_setter(Setter::new(|p: &mut Priced, v: f64| p.price = v))
                                .with_customization(
                                    PropertyCustomization::new()
                                        .with_number_format(NumberFormat::new("#0.00")),
                                ),
                        ),
                )
            })
        }
    }

    #[test]
    fn number_format_fixes_representation() {
        let engine = engine();
        let priced = Priced { price: 1.5 };
        let json = engine.to_json(&priced).unwrap();
        assert_eq!(json, r#"{"price":"1.50"}"#);
        assert_eq!(engine.from_json::<Priced>(&json).unwrap(), priced);
    }

    // -- user components -----------------------------------------------------

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Celsius {
        degrees: f64,
    }

    impl Described for Celsius {
        fn descriptor() -> &'static TypeDesc {
            static CELL: DescCell = DescCell::new();
            CELL.get_or_init(|| {
                TypeDesc::Class(
                    ClassDesc::new::<Celsius>("Celsius").with_default_constructor::<Celsius>(),
                )
            })
        }
    }

    struct CelsiusAdapter;

    impl BindAdapter for CelsiusAdapter {
        fn original(&self) -> BindType {
            BindType::of::<Celsius>()
        }

        fn adapted(&self) -> BindType {
            BindType::of::<f64>()
        }

        fn to_adapted(
            &self,
            original: &dyn crate::bind::Bind,
        ) -> Result<Box<dyn crate::bind::Bind>, BindError> {
            let celsius = original
                .downcast_ref::<Celsius>()
                .ok_or_else(|| BindError::custom("expected Celsius"))?;
            Ok(Box::new(celsius.degrees))
        }

        fn from_adapted(
            &self,
            adapted: Box<dyn crate::bind::Bind>,
        ) -> Result<Box<dyn crate::bind::Bind>, BindError> {
            Ok(Box::new(Celsius {
                degrees: adapted.take::<f64>()?,
            }))
        }
    }

    #[test]
    fn adapter_replaces_the_default_chain() {
        let engine = Engine::new(BindConfig::new().with_adapter(CelsiusAdapter));
        let value = Celsius { degrees: 21.5 };
        let json = engine.to_json(&value).unwrap();
        assert_eq!(json, "21.5");
        assert_eq!(engine.from_json::<Celsius>(&json).unwrap(), value);
    }

    struct FailingAdapter;

    impl BindAdapter for FailingAdapter {
        fn original(&self) -> BindType {
            BindType::of::<Celsius>()
        }

        fn adapted(&self) -> BindType {
            BindType::of::<f64>()
        }

        fn to_adapted(
            &self,
            _original: &dyn crate::bind::Bind,
        ) -> Result<Box<dyn crate::bind::Bind>, BindError> {
            Err(BindError::custom("adapter exploded"))
        }

        fn from_adapted(
            &self,
            _adapted: Box<dyn crate::bind::Bind>,
        ) -> Result<Box<dyn crate::bind::Bind>, BindError> {
            Err(BindError::custom("adapter exploded"))
        }
    }

    #[test]
    fn user_component_failures_are_wrapped() {
        let engine = Engine::new(BindConfig::new().with_adapter(FailingAdapter));
        let err = engine.to_json(&Celsius { degrees: 1.0 }).unwrap_err();
        match err {
            BindError::Component { kind, source, .. } => {
                assert_eq!(kind, "adapter");
                assert!(source.to_string().contains("adapter exploded"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Tag(String);

    impl Described for Tag {
        fn descriptor() -> &'static TypeDesc {
            static CELL: DescCell = DescCell::new();
            CELL.get_or_init(|| {
                TypeDesc::Class(ClassDesc::new::<Tag>("Tag").with_default_constructor::<Tag>())
            })
        }
    }

    struct TagSerializer;

    impl UserSerializer for TagSerializer {
        fn serialize(
            &self,
            value: &dyn crate::bind::Bind,
            generator: &mut dyn JsonGenerator,
            _ctx: &mut SerializationContext<'_>,
        ) -> Result<(), BindError> {
            let tag = value
                .downcast_ref::<Tag>()
                .ok_or_else(|| BindError::custom("expected Tag"))?;
            Ok(generator.write_string(&format!("#{}", tag.0))?)
        }
    }

    struct TagDeserializer;

    impl UserDeserializer for TagDeserializer {
        fn deserialize(
            &self,
            parser: &mut dyn JsonParser,
            _ctx: &mut DeserializationContext<'_>,
        ) -> Result<Box<dyn crate::bind::Bind>, BindError> {
            let text = parser.value_text()?;
            Ok(Box::new(Tag(text.trim_start_matches('#').to_string())))
        }
    }

    #[test]
    fn user_serializer_and_deserializer_round_trip() {
        let engine = Engine::new(
            BindConfig::new()
                .with_serializer(BindType::of::<Tag>(), TagSerializer)
                .with_deserializer(BindType::of::<Tag>(), TagDeserializer),
        );
        let tag = Tag("rust".to_string());
        let json = engine.to_json(&tag).unwrap();
        assert_eq!(json, r##""#rust""##);
        assert_eq!(engine.from_json::<Tag>(&json).unwrap(), tag);
    }

    // -- generic descriptors -------------------------------------------------

    struct Holder<T> {
        value: T,
    }

    impl<T: Described> Described for Holder<T> {
        fn descriptor() -> &'static TypeDesc {
            static CELL: GenericDescCell = GenericDescCell::new();
            CELL.get_or_insert::<Self>(|| {
                TypeDesc::Class(
                    ClassDesc::new::<Holder<T>>("Holder")
                        .with_generics(vec![("T", BindType::of::<T>())])
                        .with_property(
                            PropertyDesc::new("value", BindType::Variable("T"))
                                .with_getter(Getter::new(|h: &Holder<T>| &h.value)),
                        ),
                )
            })
        }
    }

    #[test]
    fn generic_variable_resolves_through_the_chain() {
        let engine = engine();
        let holder = Holder { value: 41_i32 };
        let json = engine.to_json(&holder).unwrap();
        assert_eq!(json, r#"{"value":41}"#);
    }

    // -- caching -------------------------------------------------------------

    #[test]
    fn repeated_calls_reuse_chains_and_agree() {
        let engine = engine();
        let point = Point { x: 5, y: 6 };
        let first = engine.to_json(&point).unwrap();
        let second = engine.to_json(&point).unwrap();
        assert_eq!(first, second);

        let a: Point = engine.from_json(&first).unwrap();
        let b: Point = engine.from_json(&second).unwrap();
        assert_eq!(a, b);
    }
}
