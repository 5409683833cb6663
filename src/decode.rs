//! Response body decoding and update-in-place.
//!
//! Decoding picks a codec from the response's `Content-Type`, decodes the
//! body, and optionally loads the result through a [`Schema`]. Instead of
//! producing a fresh value, a response can also be applied onto an existing
//! object with an [`Updater`].

use crate::mimetype::MimeTypeRegistry;
use crate::response::{RawResponse, ResponseInfo};
use crate::schema::Schema;
use crate::{Error, Result};
use http::header::CONTENT_TYPE;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Decodes a response body with the codec its `Content-Type` selects.
///
/// Returns `Ok(None)` for an empty body.
///
/// # Errors
///
/// - [`Error::ContentDecode`] if there is a body but no `Content-Type` header.
/// - [`Error::ContentTypeUnknown`] if no codec is registered for the header's value.
/// - [`Error::Codec`] if the codec rejects the body.
pub fn decode_body(registry: &MimeTypeRegistry, response: &RawResponse) -> Result<Option<Value>> {
    if response.body.is_empty() {
        return Ok(None);
    }

    let Some(content_type) = response.header(CONTENT_TYPE.as_str()) else {
        return Err(Error::ContentDecode {
            response: Box::new(response.clone()),
        });
    };

    let codec = registry
        .resolve(content_type)
        .map_err(|_| Error::ContentTypeUnknown {
            content_type: content_type.to_string(),
            response: Some(Box::new(response.clone())),
        })?;

    codec
        .decode(&response.body)
        .map(Some)
        .map_err(|source| Error::Codec {
            content_type: content_type.to_string(),
            source,
        })
}

/// Decodes a response and loads it through `schema`.
///
/// The codec is resolved before the schema is consulted, so an unknown
/// content type fails the same way whether or not a schema is supplied.
pub fn decode_response<S>(
    registry: &MimeTypeRegistry,
    response: RawResponse,
    schema: &S,
    latency: Duration,
) -> Result<ResponseInfo<S::Output>>
where
    S: Schema + ?Sized,
{
    let decoded = decode_body(registry, &response)?;
    let loaded = decoded.as_ref().map(|value| schema.load(value)).transpose()?;
    Ok(ResponseInfo::new(loaded, decoded, response, latency))
}

/// Applies a decoded response onto an existing object.
///
/// The body is loaded through `schema` first. The updater then sees both the
/// decoded value and the loaded value dumped back through `schema`. Returns
/// the same reference it was given. An empty body leaves the target
/// untouched.
pub fn update_in_place<'a, T, S, U>(
    registry: &MimeTypeRegistry,
    response: &RawResponse,
    schema: &S,
    target: &'a mut T,
    updater: &U,
) -> Result<&'a mut T>
where
    S: Schema + ?Sized,
    U: Updater<T> + ?Sized,
{
    if let Some(decoded) = decode_body(registry, response)? {
        let loaded = schema.dump(&schema.load(&decoded)?)?;
        updater.update_loaded(target, &decoded, &loaded)?;
    }
    Ok(target)
}

/// Applies a decoded response value onto an existing object.
///
/// Closures of the form `Fn(&mut T, &Value) -> Result<()>` are updaters; they
/// receive the decoded value before any schema.
///
/// # Examples
///
/// ```
/// use apiframe::decode::Updater;
/// use serde_json::{json, Value};
///
/// struct Name {
///     first: String,
/// }
///
/// let shout = |name: &mut Name, new: &Value| -> apiframe::Result<()> {
///     name.first = new["first"].as_str().unwrap_or_default().to_uppercase();
///     Ok(())
/// };
///
/// let mut name = Name { first: "harry".into() };
/// shout.update(&mut name, &json!({"first": "ron"})).unwrap();
/// assert_eq!(name.first, "RON");
/// ```
pub trait Updater<T>: Send + Sync {
    /// Applies the decoded response value onto `target`.
    fn update(&self, target: &mut T, decoded: &Value) -> Result<()>;

    /// Applies a response that was also loaded through a schema.
    ///
    /// `loaded` is the schema's view of the body, dumped back to a value.
    /// Defaults to [`update`](Updater::update) with the decoded value.
    fn update_loaded(&self, target: &mut T, decoded: &Value, _loaded: &Value) -> Result<()> {
        self.update(target, decoded)
    }
}

impl<T, F> Updater<T> for F
where
    F: Fn(&mut T, &Value) -> Result<()> + Send + Sync,
{
    fn update(&self, target: &mut T, decoded: &Value) -> Result<()> {
        self(target, decoded)
    }
}

/// Default updater: the response's fields overwrite the target's matching fields.
///
/// Fields the response does not mention keep their current value. Excluded
/// fields are never overwritten. When the response went through a schema,
/// the loaded fields are merged, so fields the schema drops are left alone.
#[derive(Debug, Clone, Default)]
pub struct MergeFields {
    exclude: Vec<String>,
}

impl MergeFields {
    /// Creates an updater that overwrites every field the response carries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Never overwrite the given fields.
    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(fields.into_iter().map(Into::into));
        self
    }
}

impl<T> Updater<T> for MergeFields
where
    T: Serialize + DeserializeOwned,
{
    fn update(&self, target: &mut T, decoded: &Value) -> Result<()> {
        let Value::Object(incoming) = decoded else {
            return Err(Error::Schema(
                "cannot merge a non-mapping response into an object".to_string(),
            ));
        };

        let mut current =
            serde_json::to_value(&*target).map_err(|e| Error::Schema(e.to_string()))?;
        let Value::Object(fields) = &mut current else {
            return Err(Error::Schema(
                "update target does not serialize to a mapping".to_string(),
            ));
        };

        for (name, value) in incoming {
            if !self.exclude.iter().any(|excluded| excluded == name) {
                fields.insert(name.clone(), value.clone());
            }
        }

        *target = serde_json::from_value(current).map_err(|e| Error::Schema(e.to_string()))?;
        Ok(())
    }

    fn update_loaded(&self, target: &mut T, _decoded: &Value, loaded: &Value) -> Result<()> {
        self.update(target, loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PassThrough, SerdeSchema};
    use http::{HeaderMap, HeaderValue, StatusCode};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Name {
        first: String,
        last: String,
    }

    fn response(content_type: Option<&'static str>, body: Vec<u8>) -> RawResponse {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        RawResponse::new(StatusCode::OK, headers, body)
    }

    #[test]
    fn test_empty_body() {
        let registry = MimeTypeRegistry::new();
        let info =
            decode_response(&registry, response(None, vec![]), &PassThrough, Duration::ZERO)
                .unwrap();
        assert!(info.loaded.is_none());
        assert!(info.decoded.is_none());
    }

    #[test]
    fn test_text_without_schema() {
        let registry = MimeTypeRegistry::new();
        let resp = response(Some("text/plain; charset=utf-8"), b"test text".to_vec());
        let info = decode_response(&registry, resp, &PassThrough, Duration::ZERO).unwrap();
        assert_eq!(info.loaded, Some(json!("test text")));
        assert_eq!(info.decoded, Some(json!("test text")));
    }

    #[test]
    fn test_json_with_schema_keeps_decoded() {
        let registry = MimeTypeRegistry::new();
        let resp = response(
            Some("application/json"),
            br#"{"first":"Harry","last":"Potter"}"#.to_vec(),
        );
        let info =
            decode_response(&registry, resp, &SerdeSchema::<Name>::new(), Duration::ZERO)
                .unwrap();
        assert_eq!(
            info.loaded,
            Some(Name {
                first: "Harry".into(),
                last: "Potter".into()
            })
        );
        assert_eq!(info.decoded, Some(json!({"first": "Harry", "last": "Potter"})));
    }

    #[test]
    fn test_body_without_content_type() {
        let registry = MimeTypeRegistry::new();
        let resp = response(None, b"some content".to_vec());
        match decode_response(&registry, resp, &SerdeSchema::<Name>::new(), Duration::ZERO) {
            Err(Error::ContentDecode { response }) => {
                assert_eq!(response.body.as_ref(), b"some content")
            }
            other => panic!("Expected ContentDecode, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_content_type_even_with_schema() {
        let registry = MimeTypeRegistry::new();
        let resp = response(Some("application/unknown"), b"some content".to_vec());
        match decode_response(&registry, resp, &SerdeSchema::<Name>::new(), Duration::ZERO) {
            Err(Error::ContentTypeUnknown {
                content_type,
                response,
            }) => {
                assert_eq!(content_type, "application/unknown");
                assert!(response.is_some());
            }
            other => panic!("Expected ContentTypeUnknown, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_fields_keeps_unmentioned_fields() {
        let registry = MimeTypeRegistry::new();
        let resp = response(Some("application/json"), br#"{"first":"Hermione"}"#.to_vec());
        let mut name = Name {
            first: "Harry".into(),
            last: "Potter".into(),
        };
        let target_ptr: *const Name = &name;

        let returned =
            update_in_place(&registry, &resp, &PassThrough, &mut name, &MergeFields::new())
                .unwrap();
        assert!(std::ptr::eq(returned, target_ptr));
        assert_eq!(returned.first, "Hermione");
        assert_eq!(returned.last, "Potter");
    }

    #[test]
    fn test_merge_fields_exclude() {
        let registry = MimeTypeRegistry::new();
        let resp = response(
            Some("application/json"),
            br#"{"first":"Hermione","last":"Granger"}"#.to_vec(),
        );
        let mut name = Name {
            first: "Harry".into(),
            last: "Potter".into(),
        };

        update_in_place(
            &registry,
            &resp,
            &PassThrough,
            &mut name,
            &MergeFields::new().exclude(["last"]),
        )
            .unwrap();
        assert_eq!(name.first, "Hermione");
        assert_eq!(name.last, "Potter");
    }

    #[test]
    fn test_custom_updater_receives_decoded() {
        let registry = MimeTypeRegistry::new();
        let resp = response(
            Some("application/json"),
            br#"{"first":"Hermione","last":"Granger"}"#.to_vec(),
        );
        let mut name = Name {
            first: "Harry".into(),
            last: "Potter".into(),
        };
        let suffix = |current: &mut Name, new: &Value| -> Result<()> {
            current.first = format!("{}-custom", new["first"].as_str().unwrap_or_default());
            current.last = format!("{}-custom", new["last"].as_str().unwrap_or_default());
            Ok(())
        };

        update_in_place(&registry, &resp, &SerdeSchema::<Name>::new(), &mut name, &suffix).unwrap();
        assert_eq!(name.first, "Hermione-custom");
        assert_eq!(name.last, "Granger-custom");
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct NameId {
        #[serde(default)]
        id: Option<u32>,
        first: String,
        last: String,
    }

    #[test]
    fn test_merge_fields_uses_loaded_view() {
        let registry = MimeTypeRegistry::new();
        let resp = response(
            Some("application/json"),
            br#"{"id":9,"first":"Hermione","last":"Granger"}"#.to_vec(),
        );
        let schema = SerdeSchema::<NameId>::new().exclude(["id"]);
        let mut name = NameId {
            id: Some(1),
            first: "Harry".into(),
            last: "Potter".into(),
        };

        update_in_place(&registry, &resp, &schema, &mut name, &MergeFields::new()).unwrap();
        assert_eq!(name.id, Some(1));
        assert_eq!(name.first, "Hermione");
        assert_eq!(name.last, "Granger");
    }

    #[test]
    fn test_custom_updater_ignores_schema_exclusions() {
        let registry = MimeTypeRegistry::new();
        let resp = response(
            Some("application/json"),
            br#"{"id":9,"first":"Hermione","last":"Granger"}"#.to_vec(),
        );
        let schema = SerdeSchema::<NameId>::new().exclude(["id"]);
        let mut name = NameId {
            id: Some(1),
            first: "Harry".into(),
            last: "Potter".into(),
        };
        let take_id = |current: &mut NameId, new: &Value| -> Result<()> {
            current.id = new["id"].as_u64().map(|id| id as u32);
            Ok(())
        };

        update_in_place(&registry, &resp, &schema, &mut name, &take_id).unwrap();
        assert_eq!(name.id, Some(9));
        assert_eq!(name.first, "Harry");
    }

    #[test]
    fn test_schema_load_failure_leaves_target_untouched() {
        let registry = MimeTypeRegistry::new();
        let resp = response(Some("application/json"), br#"{"first":"Hermione"}"#.to_vec());
        let mut name = Name {
            first: "Harry".into(),
            last: "Potter".into(),
        };

        let result = update_in_place(
            &registry,
            &resp,
            &SerdeSchema::<Name>::new(),
            &mut name,
            &MergeFields::new(),
        );
        assert!(matches!(result, Err(Error::Schema(_))));
        assert_eq!(name.first, "Harry");
    }
}
