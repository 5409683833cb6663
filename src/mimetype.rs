//! Content types and the codec registry.
//!
//! A [`MimeTypeRegistry`] maps a content-type string to a [`Codec`], an
//! encoder/decoder pair between [`serde_json::Value`] and wire bytes. Lookups
//! are case-insensitive and ignore parameters such as `charset`.
//!
//! The registry returned by [`MimeTypeRegistry::global`] is shared by every
//! client that was not given its own registry. Register custom types at
//! startup, before requests are in flight: registration is visible to all
//! subsequent calls, including ones issued by unrelated callers.

use crate::error::BoxError;
use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

/// Key under which a top-level sequence travels in a BSON document.
///
/// BSON bodies must be documents, so `[a, b]` is sent as `{"items": [a, b]}`
/// and a single-key document of that shape decodes back to the sequence.
pub const BSON_SEQUENCE_KEY: &str = "items";

/// A wire format, identified by its content type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MimeType {
    /// `application/json`
    Json,
    /// `application/x-yaml`
    Yaml,
    /// `application/bson`
    Bson,
    /// `text/plain`
    Text,
    /// Any other content type, stored normalized.
    Custom(String),
}

impl MimeType {
    /// Returns the canonical content-type string.
    pub fn as_str(&self) -> &str {
        match self {
            MimeType::Json => "application/json",
            MimeType::Yaml => "application/x-yaml",
            MimeType::Bson => "application/bson",
            MimeType::Text => "text/plain",
            MimeType::Custom(content_type) => content_type,
        }
    }

    /// Parses a `Content-Type` value, dropping parameters.
    ///
    /// # Examples
    ///
    /// ```
    /// use apiframe::MimeType;
    ///
    /// assert_eq!(MimeType::parse("Application/JSON; charset=utf-8"), MimeType::Json);
    /// assert_eq!(MimeType::parse("text/csv"), MimeType::Custom("text/csv".into()));
    /// ```
    pub fn parse(content_type: &str) -> Self {
        let normalized = normalize(content_type);
        match normalized.as_str() {
            "application/json" => MimeType::Json,
            "application/x-yaml" | "application/yaml" => MimeType::Yaml,
            "application/bson" => MimeType::Bson,
            "text/plain" => MimeType::Text,
            _ => MimeType::Custom(normalized),
        }
    }
}

impl From<&str> for MimeType {
    fn from(content_type: &str) -> Self {
        MimeType::parse(content_type)
    }
}

impl From<String> for MimeType {
    fn from(content_type: String) -> Self {
        MimeType::parse(&content_type)
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercases a content type and strips its parameters.
pub fn normalize(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

type EncodeFn = dyn Fn(&Value) -> std::result::Result<Vec<u8>, BoxError> + Send + Sync;
type DecodeFn = dyn Fn(&[u8]) -> std::result::Result<Value, BoxError> + Send + Sync;

/// An encoder/decoder pair bound to a content type.
#[derive(Clone)]
pub struct Codec {
    encoder: Arc<EncodeFn>,
    decoder: Arc<DecodeFn>,
}

impl Codec {
    /// Creates a codec from an encoder and a decoder function.
    pub fn new<E, D>(encoder: E, decoder: D) -> Self
    where
        E: Fn(&Value) -> std::result::Result<Vec<u8>, BoxError> + Send + Sync + 'static,
        D: Fn(&[u8]) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            encoder: Arc::new(encoder),
            decoder: Arc::new(decoder),
        }
    }

    /// Encodes a value into wire bytes.
    pub fn encode(&self, value: &Value) -> std::result::Result<Vec<u8>, BoxError> {
        (self.encoder)(value)
    }

    /// Decodes wire bytes into a value.
    pub fn decode(&self, body: &[u8]) -> std::result::Result<Value, BoxError> {
        (self.decoder)(body)
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec").finish_non_exhaustive()
    }
}

/// Maps content types to codecs.
///
/// Cloning a registry yields a handle to the same table.
///
/// # Examples
///
/// ```
/// use apiframe::{MimeType, MimeTypeRegistry};
/// use serde_json::json;
///
/// let registry = MimeTypeRegistry::new();
/// let body = registry.encode(&MimeType::Yaml, &json!({"first": "Ron"})).unwrap();
/// let value = registry.decode("application/x-yaml", &body).unwrap();
/// assert_eq!(value, json!({"first": "Ron"}));
/// ```
#[derive(Clone, Debug)]
pub struct MimeTypeRegistry {
    codecs: Arc<RwLock<HashMap<String, Codec>>>,
}

impl MimeTypeRegistry {
    /// Creates a registry holding the built-in JSON, YAML, BSON and text codecs.
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.insert(MimeType::Json.as_str(), json_codec());
        registry.insert(MimeType::Yaml.as_str(), yaml_codec());
        registry.insert("application/yaml", yaml_codec());
        registry.insert(MimeType::Bson.as_str(), bson_codec());
        registry.insert(MimeType::Text.as_str(), text_codec());
        registry
    }

    /// Creates a registry with no codecs at all.
    pub fn empty() -> Self {
        Self {
            codecs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns a handle to the process-wide registry.
    pub fn global() -> MimeTypeRegistry {
        static GLOBAL: OnceLock<MimeTypeRegistry> = OnceLock::new();
        GLOBAL.get_or_init(MimeTypeRegistry::new).clone()
    }

    /// Installs or overwrites the codec for a content type.
    pub fn register<E, D>(&self, content_type: impl Into<MimeType>, encoder: E, decoder: D)
    where
        E: Fn(&Value) -> std::result::Result<Vec<u8>, BoxError> + Send + Sync + 'static,
        D: Fn(&[u8]) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        let mimetype = content_type.into();
        tracing::debug!(content_type = %mimetype, "Registering mimetype codec");
        self.insert(mimetype.as_str(), Codec::new(encoder, decoder));
    }

    fn insert(&self, content_type: &str, codec: Codec) {
        let mut codecs = self.codecs.write().unwrap_or_else(|e| e.into_inner());
        codecs.insert(normalize(content_type), codec);
    }

    /// Returns `true` if a codec is registered for the content type.
    pub fn contains(&self, content_type: &str) -> bool {
        let codecs = self.codecs.read().unwrap_or_else(|e| e.into_inner());
        codecs.contains_key(&normalize(content_type))
    }

    /// Looks up the codec for a content type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContentTypeUnknown`] if nothing is registered for it.
    pub fn resolve(&self, content_type: &str) -> Result<Codec> {
        let codecs = self.codecs.read().unwrap_or_else(|e| e.into_inner());
        codecs
            .get(&normalize(content_type))
            .cloned()
            .ok_or_else(|| Error::ContentTypeUnknown {
                content_type: content_type.to_string(),
                response: None,
            })
    }

    /// Encodes a value with the codec registered for `mimetype`.
    pub fn encode(&self, mimetype: &MimeType, value: &Value) -> Result<Vec<u8>> {
        let codec = self.resolve(mimetype.as_str())?;
        codec.encode(value).map_err(|source| Error::Codec {
            content_type: mimetype.to_string(),
            source,
        })
    }

    /// Decodes a body with the codec registered for `content_type`.
    pub fn decode(&self, content_type: &str, body: &[u8]) -> Result<Value> {
        let codec = self.resolve(content_type)?;
        codec.decode(body).map_err(|source| Error::Codec {
            content_type: content_type.to_string(),
            source,
        })
    }
}

impl Default for MimeTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registers a codec in the process-wide registry.
///
/// # Examples
///
/// ```
/// use apiframe::{register_mimetype, MimeTypeRegistry};
/// use serde_json::Value;
///
/// register_mimetype(
///     "text/x-words",
///     |value: &Value| Ok(value.to_string().into_bytes()),
///     |body: &[u8]| Ok(Value::String(String::from_utf8(body.to_vec())?)),
/// );
///
/// assert!(MimeTypeRegistry::global().contains("text/x-words; charset=utf-8"));
/// ```
pub fn register_mimetype<E, D>(content_type: impl Into<MimeType>, encoder: E, decoder: D)
where
    E: Fn(&Value) -> std::result::Result<Vec<u8>, BoxError> + Send + Sync + 'static,
    D: Fn(&[u8]) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
{
    MimeTypeRegistry::global().register(content_type, encoder, decoder);
}

fn json_codec() -> Codec {
    Codec::new(
        |value| Ok(serde_json::to_vec(value)?),
        |body| Ok(serde_json::from_slice(body)?),
    )
}

fn yaml_codec() -> Codec {
    Codec::new(
        |value| Ok(serde_yaml::to_string(value)?.into_bytes()),
        |body| Ok(serde_yaml::from_slice(body)?),
    )
}

fn text_codec() -> Codec {
    Codec::new(
        |value| match value {
            Value::String(text) => Ok(text.clone().into_bytes()),
            other => Ok(other.to_string().into_bytes()),
        },
        |body| Ok(Value::String(String::from_utf8(body.to_vec())?)),
    )
}

fn bson_codec() -> Codec {
    Codec::new(encode_bson, decode_bson)
}

fn encode_bson(value: &Value) -> std::result::Result<Vec<u8>, BoxError> {
    let document = match value {
        Value::Object(_) => bson::to_document(value)?,
        Value::Array(_) => {
            let mut wrapper = bson::Document::new();
            wrapper.insert(BSON_SEQUENCE_KEY, bson::to_bson(value)?);
            wrapper
        }
        other => return Err(format!("BSON body must be a mapping or sequence, got {other}").into()),
    };
    let mut body = Vec::new();
    document.to_writer(&mut body)?;
    Ok(body)
}

fn decode_bson(body: &[u8]) -> std::result::Result<Value, BoxError> {
    let document = bson::Document::from_reader(body)?;
    let value = bson::Bson::Document(document).into_relaxed_extjson();
    match value {
        Value::Object(mut map) if map.len() == 1 && map.contains_key(BSON_SEQUENCE_KEY) => {
            match map.remove(BSON_SEQUENCE_KEY) {
                Some(Value::Array(items)) => Ok(Value::Array(items)),
                Some(other) => Ok(Value::Object(
                    [(BSON_SEQUENCE_KEY.to_string(), other)].into_iter().collect(),
                )),
                None => Ok(Value::Object(map)),
            }
        }
        other => Ok(other),
    }
}
