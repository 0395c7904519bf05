//! Token-level JSON reader and writer.
//!
//! Generated routines never see a parsed document as a whole: they pull one
//! token at a time from [`JsonReader`] and push one token at a time into
//! [`JsonWriter`], which keeps the emitted code identical in shape to a
//! streaming implementation.

use crate::error::{ReadError, WriteError};
use serde_json::{Map, Number, Value};

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

enum Frame {
    Root(Option<Value>),
    Array {
        items: std::vec::IntoIter<Value>,
        consumed: usize,
    },
    Object {
        entries: std::vec::IntoIter<(String, Value)>,
        current: Option<String>,
        pending: Option<Value>,
    },
}

/// Pull-style reader over a JSON document
pub struct JsonReader {
    frames: Vec<Frame>,
}

impl JsonReader {
    /// Parse `text` and position the reader before its root value
    pub fn from_str(text: &str) -> Result<Self, ReadError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(value))
    }

    pub fn from_value(value: Value) -> Self {
        Self {
            frames: vec![Frame::Root(Some(value))],
        }
    }

    /// JSONPath-like location of the most recently consumed token
    pub fn path(&self) -> String {
        let mut path = String::from("$");
        for frame in &self.frames {
            match frame {
                Frame::Root(_) => {}
                Frame::Array { consumed, .. } => {
                    if *consumed > 0 {
                        path.push_str(&format!("[{}]", consumed - 1));
                    }
                }
                Frame::Object {
                    current: Some(name),
                    ..
                } => {
                    path.push('.');
                    path.push_str(name);
                }
                Frame::Object { .. } => {}
            }
        }
        path
    }

    fn state(&self, message: &'static str) -> ReadError {
        ReadError::State {
            message,
            path: self.path(),
        }
    }

    fn unexpected(&self, expected: &'static str, found: &Value) -> ReadError {
        ReadError::UnexpectedToken {
            expected,
            found: kind_of(found),
            path: self.path(),
        }
    }

    fn out_of_range(&self, kind: &'static str, value: impl ToString) -> ReadError {
        ReadError::OutOfRange {
            kind,
            value: value.to_string(),
            path: self.path(),
        }
    }

    /// Build the failure raised for an absent property under the throw-if-missing policy
    pub fn missing(&self, message: impl Into<String>) -> ReadError {
        ReadError::MissingProperty {
            message: message.into(),
            path: self.path(),
        }
    }

    /// Build the failure raised when no enum constant matches
    pub fn unknown_enum_value(&self, enum_name: &'static str, value: impl ToString) -> ReadError {
        ReadError::UnknownEnumValue {
            enum_name,
            value: value.to_string(),
            path: self.path(),
        }
    }

    fn take(&mut self) -> Result<Value, ReadError> {
        let taken = match self.frames.last_mut() {
            Some(Frame::Root(value)) => value.take(),
            Some(Frame::Array { items, consumed }) => {
                let next = items.next();
                if next.is_some() {
                    *consumed += 1;
                }
                next
            }
            Some(Frame::Object { pending, .. }) => pending.take(),
            None => None,
        };
        taken.ok_or_else(|| self.state("no value available"))
    }

    fn peek(&self) -> Option<&Value> {
        match self.frames.last()? {
            Frame::Root(value) => value.as_ref(),
            Frame::Array { items, .. } => items.as_slice().first(),
            Frame::Object { pending, .. } => pending.as_ref(),
        }
    }

    /// Whether the enclosing array or object has more entries
    pub fn has_next(&self) -> Result<bool, ReadError> {
        match self.frames.last() {
            Some(Frame::Array { items, .. }) => Ok(items.len() > 0),
            Some(Frame::Object {
                entries, pending, ..
            }) => {
                if pending.is_some() {
                    return Err(self.state("previous property value was not consumed"));
                }
                Ok(entries.len() > 0)
            }
            Some(Frame::Root(value)) => Ok(value.is_some()),
            None => Ok(false),
        }
    }

    pub fn begin_object(&mut self) -> Result<(), ReadError> {
        match self.take()? {
            Value::Object(map) => {
                let entries: Vec<(String, Value)> = map.into_iter().collect();
                self.frames.push(Frame::Object {
                    entries: entries.into_iter(),
                    current: None,
                    pending: None,
                });
                Ok(())
            }
            other => Err(self.unexpected("object", &other)),
        }
    }

    /// Consume the next property name; its value must be read or skipped next
    pub fn next_name(&mut self) -> Result<String, ReadError> {
        let next = match self.frames.last_mut() {
            Some(Frame::Object {
                entries,
                current,
                pending,
            }) if pending.is_none() => match entries.next() {
                Some((name, value)) => {
                    *current = Some(name.clone());
                    *pending = Some(value);
                    Some(name)
                }
                None => None,
            },
            _ => return Err(self.state("property name requested outside of an object")),
        };
        next.ok_or_else(|| self.state("object has no more properties"))
    }

    pub fn end_object(&mut self) -> Result<(), ReadError> {
        match self.frames.last() {
            Some(Frame::Object {
                entries, pending, ..
            }) if entries.len() == 0 && pending.is_none() => {
                self.frames.pop();
                Ok(())
            }
            Some(Frame::Object { .. }) => Err(self.state("object has unread properties")),
            _ => Err(self.state("end of object requested outside of an object")),
        }
    }

    pub fn begin_array(&mut self) -> Result<(), ReadError> {
        match self.take()? {
            Value::Array(items) => {
                self.frames.push(Frame::Array {
                    items: items.into_iter(),
                    consumed: 0,
                });
                Ok(())
            }
            other => Err(self.unexpected("array", &other)),
        }
    }

    pub fn end_array(&mut self) -> Result<(), ReadError> {
        match self.frames.last() {
            Some(Frame::Array { items, .. }) if items.len() == 0 => {
                self.frames.pop();
                Ok(())
            }
            Some(Frame::Array { .. }) => Err(self.state("array has unread elements")),
            _ => Err(self.state("end of array requested outside of an array")),
        }
    }

    /// Discard the next value, whatever its shape
    pub fn skip_value(&mut self) -> Result<(), ReadError> {
        self.take().map(drop)
    }

    /// Whether the next value is `null`, without consuming it
    pub fn peek_null(&self) -> bool {
        matches!(self.peek(), Some(Value::Null))
    }

    pub fn next_null(&mut self) -> Result<(), ReadError> {
        match self.take()? {
            Value::Null => Ok(()),
            other => Err(self.unexpected("null", &other)),
        }
    }

    /// Read `null` as `None`, anything else through `read`
    pub fn next_optional<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, ReadError>,
    ) -> Result<Option<T>, ReadError> {
        if self.peek_null() {
            self.next_null()?;
            Ok(None)
        } else {
            read(self).map(Some)
        }
    }

    pub fn next_bool(&mut self) -> Result<bool, ReadError> {
        match self.take()? {
            Value::Bool(b) => Ok(b),
            other => Err(self.unexpected("boolean", &other)),
        }
    }

    pub fn next_i64(&mut self) -> Result<i64, ReadError> {
        match self.take()? {
            Value::Number(n) => match n.as_i64() {
                Some(v) => Ok(v),
                None if n.is_u64() => Err(self.out_of_range("i64", n)),
                None => Err(self.unexpected("integer", &Value::Number(n))),
            },
            other => Err(self.unexpected("integer", &other)),
        }
    }

    pub fn next_i32(&mut self) -> Result<i32, ReadError> {
        let v = self.next_i64()?;
        i32::try_from(v).map_err(|_| self.out_of_range("i32", v))
    }

    pub fn next_i16(&mut self) -> Result<i16, ReadError> {
        let v = self.next_i64()?;
        i16::try_from(v).map_err(|_| self.out_of_range("i16", v))
    }

    pub fn next_i8(&mut self) -> Result<i8, ReadError> {
        let v = self.next_i64()?;
        i8::try_from(v).map_err(|_| self.out_of_range("i8", v))
    }

    /// Any JSON number, widened or converted to `f64`
    pub fn next_f64(&mut self) -> Result<f64, ReadError> {
        match self.take()? {
            Value::Number(n) => match n.as_f64() {
                Some(v) => Ok(v),
                None => Err(self.out_of_range("f64", n)),
            },
            other => Err(self.unexpected("number", &other)),
        }
    }

    /// Narrowing from the wire's native double token
    pub fn next_f32(&mut self) -> Result<f32, ReadError> {
        let v = self.next_f64()?;
        if v.is_finite() && v.abs() > f64::from(f32::MAX) {
            return Err(self.out_of_range("f32", v));
        }
        Ok(v as f32)
    }

    pub fn next_char(&mut self) -> Result<char, ReadError> {
        match self.take()? {
            Value::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(self.unexpected("single character", &Value::String(s))),
                }
            }
            other => Err(self.unexpected("single character", &other)),
        }
    }

    pub fn next_string(&mut self) -> Result<String, ReadError> {
        match self.take()? {
            Value::String(s) => Ok(s),
            other => Err(self.unexpected("string", &other)),
        }
    }
}

enum Open {
    Array(Vec<Value>),
    Object {
        map: Map<String, Value>,
        name: Option<String>,
    },
}

/// Push-style writer building a JSON document
#[derive(Default)]
pub struct JsonWriter {
    open: Vec<Open>,
    root: Option<Value>,
}

impl JsonWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, value: Value) -> Result<(), WriteError> {
        match self.open.last_mut() {
            None if self.root.is_some() => Err(WriteError::State("document already has a root value")),
            None => {
                self.root = Some(value);
                Ok(())
            }
            Some(Open::Array(items)) => {
                items.push(value);
                Ok(())
            }
            Some(Open::Object { map, name }) => match name.take() {
                Some(name) => {
                    map.insert(name, value);
                    Ok(())
                }
                None => Err(WriteError::State("value written inside an object without a name")),
            },
        }
    }

    fn expect_value_slot(&self) -> Result<(), WriteError> {
        match self.open.last() {
            Some(Open::Object { name: None, .. }) => {
                Err(WriteError::State("value written inside an object without a name"))
            }
            None if self.root.is_some() => Err(WriteError::State("document already has a root value")),
            _ => Ok(()),
        }
    }

    pub fn begin_object(&mut self) -> Result<(), WriteError> {
        self.expect_value_slot()?;
        self.open.push(Open::Object {
            map: Map::new(),
            name: None,
        });
        Ok(())
    }

    /// Name the next value written into the current object
    pub fn name(&mut self, name: &str) -> Result<(), WriteError> {
        match self.open.last_mut() {
            Some(Open::Object { name: slot, .. }) if slot.is_none() => {
                *slot = Some(name.to_owned());
                Ok(())
            }
            Some(Open::Object { .. }) => Err(WriteError::State("two names written in a row")),
            _ => Err(WriteError::State("name written outside of an object")),
        }
    }

    pub fn end_object(&mut self) -> Result<(), WriteError> {
        match self.open.pop() {
            Some(Open::Object { map, name: None }) => self.push(Value::Object(map)),
            Some(Open::Object { .. }) => Err(WriteError::State("object closed after a dangling name")),
            Some(other) => {
                self.open.push(other);
                Err(WriteError::State("end of object requested outside of an object"))
            }
            None => Err(WriteError::State("end of object requested outside of an object")),
        }
    }

    pub fn begin_array(&mut self) -> Result<(), WriteError> {
        self.expect_value_slot()?;
        self.open.push(Open::Array(Vec::new()));
        Ok(())
    }

    pub fn end_array(&mut self) -> Result<(), WriteError> {
        match self.open.pop() {
            Some(Open::Array(items)) => self.push(Value::Array(items)),
            Some(other) => {
                self.open.push(other);
                Err(WriteError::State("end of array requested outside of an array"))
            }
            None => Err(WriteError::State("end of array requested outside of an array")),
        }
    }

    pub fn write_null(&mut self) -> Result<(), WriteError> {
        self.push(Value::Null)
    }

    pub fn write_bool(&mut self, value: bool) -> Result<(), WriteError> {
        self.push(Value::Bool(value))
    }

    pub fn write_i64(&mut self, value: i64) -> Result<(), WriteError> {
        self.push(Value::Number(Number::from(value)))
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), WriteError> {
        self.write_i64(i64::from(value))
    }

    pub fn write_i16(&mut self, value: i16) -> Result<(), WriteError> {
        self.write_i64(i64::from(value))
    }

    pub fn write_i8(&mut self, value: i8) -> Result<(), WriteError> {
        self.write_i64(i64::from(value))
    }

    pub fn write_f64(&mut self, value: f64) -> Result<(), WriteError> {
        let number = Number::from_f64(value).ok_or(WriteError::NonFinite(value))?;
        self.push(Value::Number(number))
    }

    /// Widened to the wire's native double token
    pub fn write_f32(&mut self, value: f32) -> Result<(), WriteError> {
        self.write_f64(f64::from(value))
    }

    pub fn write_char(&mut self, value: char) -> Result<(), WriteError> {
        self.push(Value::String(value.to_string()))
    }

    pub fn write_str(&mut self, value: &str) -> Result<(), WriteError> {
        self.push(Value::String(value.to_owned()))
    }

    /// The finished document; fails if containers are still open
    pub fn into_value(self) -> Result<Value, WriteError> {
        if !self.open.is_empty() {
            return Err(WriteError::State("document has unclosed containers"));
        }
        self.root.ok_or(WriteError::State("nothing was written"))
    }

    pub fn into_string(self) -> Result<String, WriteError> {
        self.into_value().map(|v| v.to_string())
    }
}
