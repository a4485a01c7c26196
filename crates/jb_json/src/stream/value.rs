//! Event adapters for in-memory [`Value`] documents.
//!
//! These let a document be consumed or produced through the same
//! [`JsonParser`]/[`JsonGenerator`] contract as a text stream, so binding
//! never needs to render intermediate JSON text.

use crate::value::{JsonNumber, Value};

use super::{Event, JsonGenerator, JsonParser, StreamError};

// -----------------------------------------------------------------------------
// ValueParser

enum Frame {
    Object {
        members: std::vec::IntoIter<(String, Value)>,
        pending: Option<Value>,
    },
    Array(std::vec::IntoIter<Value>),
}

/// [`JsonParser`] that replays an owned [`Value`] as events.
pub struct ValueParser {
    root: Option<Value>,
    frames: Vec<Frame>,
    text: Option<String>,
    done: bool,
}

impl ValueParser {
    pub fn new(value: Value) -> Self {
        Self {
            root: Some(value),
            frames: Vec::new(),
            text: None,
            done: false,
        }
    }

    fn value_done(&mut self) {
        if self.frames.is_empty() {
            self.done = true;
        }
    }

    fn emit(&mut self, value: Value) -> Event {
        let event = match value {
            Value::Null => Event::ValueNull,
            Value::Bool(true) => Event::ValueTrue,
            Value::Bool(false) => Event::ValueFalse,
            Value::Number(number) => {
                self.text = Some(number.text().to_string());
                Event::ValueNumber
            }
            Value::String(text) => {
                self.text = Some(text);
                Event::ValueString
            }
            Value::Array(items) => {
                self.frames.push(Frame::Array(items.into_iter()));
                return Event::StartArray;
            }
            Value::Object(members) => {
                self.frames.push(Frame::Object {
                    members: members.into_iter(),
                    pending: None,
                });
                return Event::StartObject;
            }
        };
        self.value_done();
        event
    }
}

impl JsonParser for ValueParser {
    fn next_event(&mut self) -> Result<Event, StreamError> {
        if let Some(root) = self.root.take() {
            return Ok(self.emit(root));
        }
        match self.frames.last_mut() {
            Some(Frame::Object { members, pending }) => {
                if let Some(value) = pending.take() {
                    return Ok(self.emit(value));
                }
                match members.next() {
                    Some((key, value)) => {
                        self.text = Some(key);
                        *pending = Some(value);
                        Ok(Event::KeyName)
                    }
                    None => {
                        self.frames.pop();
                        self.value_done();
                        Ok(Event::EndObject)
                    }
                }
            }
            Some(Frame::Array(items)) => match items.next() {
                Some(value) => Ok(self.emit(value)),
                None => {
                    self.frames.pop();
                    self.value_done();
                    Ok(Event::EndArray)
                }
            },
            None => Err(StreamError::DocumentEnd),
        }
    }

    fn value_text(&self) -> Result<&str, StreamError> {
        self.text.as_deref().ok_or(StreamError::NoValue)
    }

    fn skip_value(&mut self) -> Result<(), StreamError> {
        if self.root.take().is_some() {
            self.value_done();
            return Ok(());
        }
        match self.frames.last_mut() {
            Some(Frame::Object { pending, .. }) => {
                if pending.take().is_none() {
                    return Err(StreamError::NoValue);
                }
                Ok(())
            }
            Some(Frame::Array(items)) => {
                if items.next().is_none() {
                    return Err(StreamError::NoValue);
                }
                Ok(())
            }
            None => Err(StreamError::NoValue),
        }
    }

    fn current_level(&self) -> usize {
        self.frames.len()
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.frames.clear();
        self.root = None;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// ValueGenerator

enum Builder {
    Object {
        // Key naming this container in its parent, taken at start time so
        // nested members cannot clobber it.
        key: Option<String>,
        members: Vec<(String, Value)>,
    },
    Array {
        key: Option<String>,
        items: Vec<Value>,
    },
}

/// [`JsonGenerator`] that assembles an in-memory [`Value`].
///
/// After the document is complete, [`ValueGenerator::take_value`] returns
/// the built document.
#[derive(Default)]
pub struct ValueGenerator {
    builders: Vec<Builder>,
    key: Option<String>,
    root: Option<Value>,
}

impl ValueGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The finished document, if the root value has been completed.
    pub fn take_value(&mut self) -> Option<Value> {
        self.root.take()
    }

    fn push_value(&mut self, value: Value) -> Result<(), StreamError> {
        match self.builders.last_mut() {
            Some(Builder::Object { members, .. }) => {
                let key = self.key.take().ok_or(StreamError::NoValue)?;
                members.push((key, value));
            }
            Some(Builder::Array { items, .. }) => items.push(value),
            None => self.root = Some(value),
        }
        Ok(())
    }
}

impl JsonGenerator for ValueGenerator {
    fn write_key(&mut self, key: &str) -> Result<(), StreamError> {
        self.key = Some(key.to_string());
        Ok(())
    }

    fn write_start_object(&mut self) -> Result<(), StreamError> {
        self.builders.push(Builder::Object {
            key: self.key.take(),
            members: Vec::new(),
        });
        Ok(())
    }

    fn write_end_object(&mut self) -> Result<(), StreamError> {
        match self.builders.pop() {
            Some(Builder::Object { key, members }) => {
                self.key = key;
                self.push_value(Value::Object(members))
            }
            _ => Err(StreamError::NoValue),
        }
    }

    fn write_start_array(&mut self) -> Result<(), StreamError> {
        self.builders.push(Builder::Array {
            key: self.key.take(),
            items: Vec::new(),
        });
        Ok(())
    }

    fn write_end_array(&mut self) -> Result<(), StreamError> {
        match self.builders.pop() {
            Some(Builder::Array { key, items }) => {
                self.key = key;
                self.push_value(Value::Array(items))
            }
            _ => Err(StreamError::NoValue),
        }
    }

    fn write_string(&mut self, value: &str) -> Result<(), StreamError> {
        self.push_value(Value::String(value.to_string()))
    }

    fn write_bool(&mut self, value: bool) -> Result<(), StreamError> {
        self.push_value(Value::Bool(value))
    }

    fn write_null(&mut self) -> Result<(), StreamError> {
        self.push_value(Value::Null)
    }

    fn write_i64(&mut self, value: i64) -> Result<(), StreamError> {
        self.push_value(Value::Number(value.into()))
    }

    fn write_u64(&mut self, value: u64) -> Result<(), StreamError> {
        self.push_value(Value::Number(value.into()))
    }

    fn write_i128(&mut self, value: i128) -> Result<(), StreamError> {
        self.push_value(Value::Number(value.into()))
    }

    fn write_u128(&mut self, value: u128) -> Result<(), StreamError> {
        self.push_value(Value::Number(JsonNumber::from_text(value.to_string())))
    }

    fn write_f64(&mut self, value: f64) -> Result<(), StreamError> {
        if !value.is_finite() {
            return Err(StreamError::NonFinite(value));
        }
        self.push_value(Value::Number(value.into()))
    }

    fn write_number_text(&mut self, text: &str) -> Result<(), StreamError> {
        self.push_value(Value::Number(JsonNumber::from_text(text)))
    }

    fn close(&mut self) -> Result<(), StreamError> {
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        Value::Object(vec![
            ("b".to_string(), Value::from(1_i64)),
            (
                "a".to_string(),
                Value::Array(vec![Value::Null, Value::from("x")]),
            ),
        ])
    }

    #[test]
    fn parser_replays_member_order() {
        let mut parser = ValueParser::new(sample());
        assert_eq!(parser.next_event().unwrap(), Event::StartObject);
        assert_eq!(parser.next_event().unwrap(), Event::KeyName);
        assert_eq!(parser.value_text().unwrap(), "b");
        assert_eq!(parser.next_event().unwrap(), Event::ValueNumber);
        assert_eq!(parser.next_event().unwrap(), Event::KeyName);
        assert_eq!(parser.value_text().unwrap(), "a");
        assert_eq!(parser.next_event().unwrap(), Event::StartArray);
        assert_eq!(parser.next_event().unwrap(), Event::ValueNull);
        assert_eq!(parser.next_event().unwrap(), Event::ValueString);
        assert_eq!(parser.next_event().unwrap(), Event::EndArray);
        assert_eq!(parser.next_event().unwrap(), Event::EndObject);
        assert!(matches!(
            parser.next_event(),
            Err(StreamError::DocumentEnd)
        ));
    }

    #[test]
    fn generator_rebuilds_document() {
        let source = sample();
        let mut parser = ValueParser::new(source.clone());
        let mut generator = ValueGenerator::new();

        loop {
            let event = match parser.next_event() {
                Ok(event) => event,
                Err(StreamError::DocumentEnd) => break,
                Err(err) => panic!("{err}"),
            };
            match event {
                Event::StartObject => generator.write_start_object().unwrap(),
                Event::EndObject => generator.write_end_object().unwrap(),
                Event::StartArray => generator.write_start_array().unwrap(),
                Event::EndArray => generator.write_end_array().unwrap(),
                Event::KeyName => generator.write_key(parser.value_text().unwrap()).unwrap(),
                Event::ValueString => generator
                    .write_string(parser.value_text().unwrap())
                    .unwrap(),
                Event::ValueNumber => generator
                    .write_number_text(parser.value_text().unwrap())
                    .unwrap(),
                Event::ValueTrue => generator.write_bool(true).unwrap(),
                Event::ValueFalse => generator.write_bool(false).unwrap(),
                Event::ValueNull => generator.write_null().unwrap(),
            }
        }

        assert_eq!(generator.take_value(), Some(source));
    }

    #[test]
    fn skip_drops_pending_member_value() {
        let mut parser = ValueParser::new(sample());
        parser.next_event().unwrap();
        parser.next_event().unwrap();
        parser.skip_value().unwrap();
        assert_eq!(parser.next_event().unwrap(), Event::KeyName);
        assert_eq!(parser.value_text().unwrap(), "a");
    }
}
