//! Schemas that map decoded values to domain values and back.
//!
//! A [`Schema`] has two operations: `load` turns a decoded wire value into a
//! domain value, `dump` turns a domain value into a value ready for encoding.
//! [`SerdeSchema`] does both through serde, [`Many`] applies a schema
//! element-wise over a sequence, and [`PassThrough`] leaves values untouched.

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::marker::PhantomData;

/// Loads decoded values into domain values and dumps them back.
pub trait Schema: Send + Sync {
    /// The domain type this schema produces.
    type Output;

    /// Converts a decoded value into a domain value.
    fn load(&self, decoded: &Value) -> Result<Self::Output>;

    /// Converts a domain value into a value ready for encoding.
    fn dump(&self, value: &Self::Output) -> Result<Value>;
}

/// Identity schema: the loaded value is the decoded value.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Schema for PassThrough {
    type Output = Value;

    fn load(&self, decoded: &Value) -> Result<Value> {
        Ok(decoded.clone())
    }

    fn dump(&self, value: &Value) -> Result<Value> {
        Ok(value.clone())
    }
}

/// Schema backed by a type's serde implementations.
///
/// Fields listed with [`exclude`](SerdeSchema::exclude) are stripped from
/// mappings before loading and after dumping.
///
/// # Examples
///
/// ```
/// use apiframe::schema::{Schema, SerdeSchema};
/// use serde::{Deserialize, Serialize};
/// use serde_json::json;
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Name {
///     first: String,
///     last: String,
/// }
///
/// let schema = SerdeSchema::<Name>::new();
/// let name = schema.load(&json!({"first": "Harry", "last": "Potter"})).unwrap();
/// assert_eq!(name.first, "Harry");
/// assert_eq!(schema.dump(&name).unwrap(), json!({"first": "Harry", "last": "Potter"}));
/// ```
#[derive(Debug, Clone)]
pub struct SerdeSchema<T> {
    exclude: Vec<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeSchema<T> {
    /// Creates a schema that loads and dumps every field.
    pub fn new() -> Self {
        Self {
            exclude: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Strips the given fields on load and dump.
    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Wraps this schema so it operates on sequences.
    pub fn many(self) -> Many<Self> {
        Many(self)
    }

    fn strip(&self, mut value: Value) -> Value {
        if let Value::Object(map) = &mut value {
            for field in &self.exclude {
                map.remove(field);
            }
        }
        value
    }
}

impl<T> Default for SerdeSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Schema for SerdeSchema<T>
where
    T: Serialize + DeserializeOwned,
{
    type Output = T;

    fn load(&self, decoded: &Value) -> Result<T> {
        let value = if self.exclude.is_empty() {
            decoded.clone()
        } else {
            self.strip(decoded.clone())
        };
        serde_json::from_value(value).map_err(|e| Error::Schema(e.to_string()))
    }

    fn dump(&self, value: &T) -> Result<Value> {
        let dumped = serde_json::to_value(value).map_err(|e| Error::Schema(e.to_string()))?;
        Ok(self.strip(dumped))
    }
}

/// Applies a schema to every element of a sequence.
#[derive(Debug, Clone, Default)]
pub struct Many<S>(pub S);

impl<S: Schema> Schema for Many<S> {
    type Output = Vec<S::Output>;

    fn load(&self, decoded: &Value) -> Result<Self::Output> {
        match decoded {
            Value::Array(items) => items.iter().map(|item| self.0.load(item)).collect(),
            other => Err(Error::Schema(format!(
                "expected a sequence, got {}",
                kind_of(other)
            ))),
        }
    }

    fn dump(&self, values: &Self::Output) -> Result<Value> {
        values
            .iter()
            .map(|value| self.0.dump(value))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
