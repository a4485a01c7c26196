#![doc = include_str!("../README.md")]

mod value;

pub mod stream;

pub use stream::{Event, JsonGenerator, JsonParser, StreamError};
pub use stream::{StreamGenerator, StreamParser};
pub use stream::{ValueGenerator, ValueParser};
pub use value::{JsonNumber, Value};
