//! Adapters over the `struson` streaming reader and writer.
//!
//! `struson` exposes a Gson-style expect-and-consume API; these adapters
//! translate it into the event contract of [`JsonParser`] and
//! [`JsonGenerator`]. The adapter owns the cursor state (which container
//! it is inside, whether a member key or a value comes next) so the
//! binding chains only ever see events.

use std::io::{Read, Write};

use struson::reader::{JsonReader, JsonStreamReader, ReaderError, ValueType};
use struson::writer::{JsonNumberError, JsonStreamWriter, JsonWriter};

use super::{Event, JsonGenerator, JsonParser, StreamError};

#[inline]
fn read_err(err: ReaderError) -> StreamError {
    StreamError::Read(Box::new(err))
}

#[inline]
fn number_err(err: JsonNumberError) -> StreamError {
    StreamError::Write(Box::new(err))
}

// -----------------------------------------------------------------------------
// StreamParser

enum Scope {
    /// Inside an object; `expect_key` flips as keys and values alternate.
    Object { expect_key: bool },
    Array,
}

/// [`JsonParser`] over any [`Read`], backed by [`JsonStreamReader`].
///
/// # Examples
///
/// ```
/// use jb_json::{Event, JsonParser, StreamParser};
///
/// let mut parser = StreamParser::new(r#"{"a": 1}"#.as_bytes());
///
/// assert_eq!(parser.next_event().unwrap(), Event::StartObject);
/// assert_eq!(parser.next_event().unwrap(), Event::KeyName);
/// assert_eq!(parser.value_text().unwrap(), "a");
/// assert_eq!(parser.next_event().unwrap(), Event::ValueNumber);
/// assert_eq!(parser.value_text().unwrap(), "1");
/// assert_eq!(parser.next_event().unwrap(), Event::EndObject);
/// parser.close().unwrap();
/// ```
pub struct StreamParser<R: Read> {
    reader: Option<JsonStreamReader<R>>,
    scopes: Vec<Scope>,
    text: Option<String>,
    done: bool,
}

impl<R: Read> StreamParser<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: Some(JsonStreamReader::new(source)),
            scopes: Vec::new(),
            text: None,
            done: false,
        }
    }

    fn reader(&mut self) -> Result<&mut JsonStreamReader<R>, StreamError> {
        self.reader.as_mut().ok_or(StreamError::Closed)
    }

    /// Marks the value at the current position as complete.
    fn value_done(&mut self) {
        match self.scopes.last_mut() {
            Some(Scope::Object { expect_key }) => *expect_key = true,
            Some(Scope::Array) => {}
            None => self.done = true,
        }
    }

    /// Whether the cursor sits where a value may begin.
    fn expects_value(&self) -> bool {
        match self.scopes.last() {
            Some(Scope::Object { expect_key }) => !*expect_key,
            Some(Scope::Array) => true,
            None => !self.done,
        }
    }

    fn read_value(&mut self) -> Result<Event, StreamError> {
        let reader = self.reader()?;
        let event = match reader.peek().map_err(read_err)? {
            ValueType::Object => {
                reader.begin_object().map_err(read_err)?;
                self.scopes.push(Scope::Object { expect_key: true });
                return Ok(Event::StartObject);
            }
            ValueType::Array => {
                reader.begin_array().map_err(read_err)?;
                self.scopes.push(Scope::Array);
                return Ok(Event::StartArray);
            }
            ValueType::String => {
                self.text = Some(reader.next_string().map_err(read_err)?);
                Event::ValueString
            }
            ValueType::Number => {
                self.text = Some(reader.next_number_as_string().map_err(read_err)?);
                Event::ValueNumber
            }
            ValueType::Boolean => {
                if reader.next_bool().map_err(read_err)? {
                    Event::ValueTrue
                } else {
                    Event::ValueFalse
                }
            }
            ValueType::Null => {
                reader.next_null().map_err(read_err)?;
                Event::ValueNull
            }
        };
        self.value_done();
        Ok(event)
    }
}

impl<R: Read> JsonParser for StreamParser<R> {
    fn next_event(&mut self) -> Result<Event, StreamError> {
        match self.scopes.last() {
            Some(Scope::Object { expect_key: true }) => {
                let reader = self.reader()?;
                if reader.has_next().map_err(read_err)? {
                    let name = reader.next_name_owned().map_err(read_err)?;
                    self.text = Some(name);
                    if let Some(Scope::Object { expect_key }) = self.scopes.last_mut() {
                        *expect_key = false;
                    }
                    Ok(Event::KeyName)
                } else {
                    reader.end_object().map_err(read_err)?;
                    self.scopes.pop();
                    self.value_done();
                    Ok(Event::EndObject)
                }
            }
            Some(Scope::Array) => {
                let reader = self.reader()?;
                if reader.has_next().map_err(read_err)? {
                    self.read_value()
                } else {
                    reader.end_array().map_err(read_err)?;
                    self.scopes.pop();
                    self.value_done();
                    Ok(Event::EndArray)
                }
            }
            Some(Scope::Object { expect_key: false }) => self.read_value(),
            None => {
                if self.done {
                    return Err(StreamError::DocumentEnd);
                }
                self.read_value()
            }
        }
    }

    fn value_text(&self) -> Result<&str, StreamError> {
        self.text.as_deref().ok_or(StreamError::NoValue)
    }

    fn skip_value(&mut self) -> Result<(), StreamError> {
        if !self.expects_value() {
            return Err(StreamError::NoValue);
        }
        self.reader()?.skip_value().map_err(read_err)?;
        self.value_done();
        Ok(())
    }

    fn current_level(&self) -> usize {
        self.scopes.len()
    }

    fn close(&mut self) -> Result<(), StreamError> {
        let Some(reader) = self.reader.take() else {
            return Ok(());
        };
        // Trailing-data validation only makes sense for a fully consumed
        // document; a close on an abandoned stream just drops the reader.
        if self.done {
            reader.consume_trailing_whitespace().map_err(read_err)?;
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// StreamGenerator

/// [`JsonGenerator`] over any [`Write`], backed by [`JsonStreamWriter`].
///
/// # Examples
///
/// ```
/// use jb_json::{JsonGenerator, StreamGenerator};
///
/// let mut out = Vec::new();
/// let mut generator = StreamGenerator::new(&mut out);
/// generator.write_start_object().unwrap();
/// generator.write_key("a").unwrap();
/// generator.write_i64(1).unwrap();
/// generator.write_end_object().unwrap();
/// generator.close().unwrap();
///
/// assert_eq!(String::from_utf8(out).unwrap(), r#"{"a":1}"#);
/// ```
pub struct StreamGenerator<W: Write> {
    writer: Option<JsonStreamWriter<W>>,
}

impl<W: Write> StreamGenerator<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: Some(JsonStreamWriter::new(sink)),
        }
    }

    fn writer(&mut self) -> Result<&mut JsonStreamWriter<W>, StreamError> {
        self.writer.as_mut().ok_or(StreamError::Closed)
    }
}

impl<W: Write> JsonGenerator for StreamGenerator<W> {
    fn write_key(&mut self, key: &str) -> Result<(), StreamError> {
        Ok(self.writer()?.name(key)?)
    }

    fn write_start_object(&mut self) -> Result<(), StreamError> {
        Ok(self.writer()?.begin_object()?)
    }

    fn write_end_object(&mut self) -> Result<(), StreamError> {
        Ok(self.writer()?.end_object()?)
    }

    fn write_start_array(&mut self) -> Result<(), StreamError> {
        Ok(self.writer()?.begin_array()?)
    }

    fn write_end_array(&mut self) -> Result<(), StreamError> {
        Ok(self.writer()?.end_array()?)
    }

    fn write_string(&mut self, value: &str) -> Result<(), StreamError> {
        Ok(self.writer()?.string_value(value)?)
    }

    fn write_bool(&mut self, value: bool) -> Result<(), StreamError> {
        Ok(self.writer()?.bool_value(value)?)
    }

    fn write_null(&mut self) -> Result<(), StreamError> {
        Ok(self.writer()?.null_value()?)
    }

    fn write_i64(&mut self, value: i64) -> Result<(), StreamError> {
        Ok(self.writer()?.number_value(value)?)
    }

    fn write_u64(&mut self, value: u64) -> Result<(), StreamError> {
        Ok(self.writer()?.number_value(value)?)
    }

    fn write_i128(&mut self, value: i128) -> Result<(), StreamError> {
        self.writer()?
            .number_value_from_string(&value.to_string())
            .map_err(number_err)
    }

    fn write_u128(&mut self, value: u128) -> Result<(), StreamError> {
        self.writer()?
            .number_value_from_string(&value.to_string())
            .map_err(number_err)
    }

    fn write_f64(&mut self, value: f64) -> Result<(), StreamError> {
        if !value.is_finite() {
            return Err(StreamError::NonFinite(value));
        }
        self.writer()?.fp_number_value(value).map_err(number_err)
    }

    fn write_number_text(&mut self, text: &str) -> Result<(), StreamError> {
        self.writer()?.number_value_from_string(text).map_err(number_err)
    }

    fn close(&mut self) -> Result<(), StreamError> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        writer.finish_document()?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn events(json: &str) -> Vec<(Event, Option<String>)> {
        let mut parser = StreamParser::new(json.as_bytes());
        let mut out = Vec::new();
        loop {
            match parser.next_event() {
                Ok(event) => {
                    let text = match event {
                        Event::KeyName | Event::ValueString | Event::ValueNumber => {
                            Some(parser.value_text().unwrap().to_string())
                        }
                        _ => None,
                    };
                    out.push((event, text));
                }
                Err(StreamError::DocumentEnd) => break,
                Err(err) => panic!("unexpected error: {err}"),
            }
        }
        parser.close().unwrap();
        out
    }

    #[test]
    fn nested_document_events() {
        let got = events(r#"{"a": [1, true, null], "b": {"c": "x"}}"#);
        let kinds: Vec<Event> = got.iter().map(|(event, _)| *event).collect();
        assert_eq!(
            kinds,
            vec![
                Event::StartObject,
                Event::KeyName,
                Event::StartArray,
                Event::ValueNumber,
                Event::ValueTrue,
                Event::ValueNull,
                Event::EndArray,
                Event::KeyName,
                Event::StartObject,
                Event::KeyName,
                Event::ValueString,
                Event::EndObject,
                Event::EndObject,
            ]
        );
        assert_eq!(got[1].1.as_deref(), Some("a"));
        assert_eq!(got[3].1.as_deref(), Some("1"));
        assert_eq!(got[10].1.as_deref(), Some("x"));
    }

    #[test]
    fn scalar_root() {
        let got = events("42");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].0, Event::ValueNumber);
        assert_eq!(got[0].1.as_deref(), Some("42"));
    }

    #[test]
    fn skip_after_key() {
        let mut parser = StreamParser::new(r#"{"skip": {"deep": [1, 2]}, "keep": 7}"#.as_bytes());
        assert_eq!(parser.next_event().unwrap(), Event::StartObject);
        assert_eq!(parser.next_event().unwrap(), Event::KeyName);
        parser.skip_value().unwrap();
        assert_eq!(parser.next_event().unwrap(), Event::KeyName);
        assert_eq!(parser.value_text().unwrap(), "keep");
        assert_eq!(parser.next_event().unwrap(), Event::ValueNumber);
        assert_eq!(parser.next_event().unwrap(), Event::EndObject);
        parser.close().unwrap();
    }

    #[test]
    fn generator_round_trip() {
        let mut out = Vec::new();
        let mut generator = StreamGenerator::new(&mut out);
        generator.write_start_object().unwrap();
        generator.write_key("list").unwrap();
        generator.write_start_array().unwrap();
        generator.write_i64(-3).unwrap();
        generator.write_f64(1.5).unwrap();
        generator.write_u128(340_282_366_920_938_463_463_374_607_431_768_211_455).unwrap();
        generator.write_end_array().unwrap();
        generator.write_key("ok").unwrap();
        generator.write_bool(true).unwrap();
        generator.write_end_object().unwrap();
        generator.close().unwrap();

        let text = String::from_utf8(out).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["list"][0], serde_json::json!(-3));
        assert_eq!(parsed["ok"], serde_json::json!(true));
    }

    #[test]
    fn non_finite_rejected() {
        let mut out = Vec::new();
        let mut generator = StreamGenerator::new(&mut out);
        assert!(matches!(
            generator.write_f64(f64::NAN),
            Err(StreamError::NonFinite(_))
        ));
    }
}
