//! Per-call request state and execution.
//!
//! A [`ClientRequest`] starts as a copy of an [`Endpoint`] and is filled in
//! by the endpoint method: path parameters, query parameters, projection,
//! headers and payload. Executing it builds the wire request, sends it,
//! validates the response and decodes the body.
//!
//! Every execution builds its wire request from the state at that moment, so
//! changing a request after it has been executed does not affect calls
//! already issued.

use crate::{
    api_error::ApiError,
    client::Client,
    decode::{decode_body, decode_response, update_in_place, Updater},
    endpoint::{parse_header, Endpoint},
    mimetype::MimeType,
    paging::{PageFetch, PagingConfig, PagingState},
    response::{RawResponse, ResponseInfo},
    schema::{PassThrough, Schema},
    transport::TransportRequest,
    Error, Result,
};
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use url::Url;

/// Prefix of the query parameters a projection is sent as.
pub const PROJECTION_PREFIX: &str = "project.";

/// The payload of a request.
///
/// # Examples
///
/// ```
/// use apiframe::Media;
/// use serde_json::json;
///
/// assert_eq!(Media::from("Harry Potter"), Media::Text("Harry Potter".into()));
/// assert_eq!(Media::from(b"bin".to_vec()), Media::Raw(b"bin".to_vec().into()));
/// assert_eq!(
///     Media::from(json!({"first": "Harry"})),
///     Media::Structured(json!({"first": "Harry"}))
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Media {
    /// No body.
    #[default]
    Empty,
    /// Bytes sent as they are.
    Raw(Bytes),
    /// Text sent as UTF-8, `text/plain` unless a mimetype is set.
    Text(String),
    /// A value encoded by the mimetype's codec, JSON unless a mimetype is set.
    Structured(Value),
}

impl Media {
    /// Serializes any serde value into structured media.
    pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Media::Structured)
            .map_err(|e| Error::Schema(e.to_string()))
    }

    /// Dumps a domain value through a request schema.
    pub fn dump<S: Schema + ?Sized>(schema: &S, value: &S::Output) -> Result<Self> {
        schema.dump(value).map(Media::Structured)
    }

    /// Returns `true` if there is no body to send.
    pub fn is_empty(&self) -> bool {
        matches!(self, Media::Empty)
    }
}

impl From<Bytes> for Media {
    fn from(bytes: Bytes) -> Self {
        Media::Raw(bytes)
    }
}

impl From<Vec<u8>> for Media {
    fn from(bytes: Vec<u8>) -> Self {
        Media::Raw(bytes.into())
    }
}

impl From<String> for Media {
    fn from(text: String) -> Self {
        Media::Text(text)
    }
}

impl From<&str> for Media {
    fn from(text: &str) -> Self {
        Media::Text(text.to_string())
    }
}

impl From<Value> for Media {
    fn from(value: Value) -> Self {
        Media::Structured(value)
    }
}

/// The mutable state of one call to a declared endpoint.
///
/// # Examples
///
/// ```no_run
/// use apiframe::{Client, Endpoint, Media};
/// use http::StatusCode;
/// use serde_json::json;
///
/// # async fn example() -> Result<(), apiframe::Error> {
/// let client = Client::builder().base_url("http://api-host")?.build()?;
/// let endpoint = Endpoint::post("/names/{name_id}").resp_codes([StatusCode::CREATED]);
///
/// let mut req = client.request(&endpoint);
/// req.path_param("name_id", 7)
///     .query_param("verbose", true)
///     .project("last", false);
/// req.media = Media::from(json!({"first": "Harry", "last": "Potter"}));
///
/// let info = req.execute().await?;
/// println!("{:?}", info.decoded);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ClientRequest {
    client: Client,

    /// This call's copy of the endpoint declaration.
    pub endpoint: Endpoint,

    /// Values for the `{name}` placeholders of the path template.
    pub path_params: HashMap<String, String>,

    /// Query parameters, seeded from the endpoint.
    pub query_params: BTreeMap<String, String>,

    /// Fields to include (`true`) or exclude (`false`) from the response.
    pub projection: BTreeMap<String, bool>,

    /// Request headers, seeded from the endpoint.
    pub headers: HeaderMap,

    /// The payload.
    pub media: Media,

    /// Overrides the endpoint's send mimetype when set.
    pub mimetype_send: Option<MimeType>,

    /// Overrides the endpoint's accept mimetype when set.
    pub mimetype_accept: Option<MimeType>,

    /// Where paging starts and how large pages are.
    pub paging: PagingConfig,
}

impl ClientRequest {
    pub(crate) fn new(client: Client, endpoint: Endpoint) -> Self {
        Self {
            client,
            path_params: HashMap::new(),
            query_params: endpoint.query_params.clone(),
            projection: BTreeMap::new(),
            headers: endpoint.headers.clone(),
            media: Media::Empty,
            mimetype_send: endpoint.mimetype_send.clone(),
            mimetype_accept: endpoint.mimetype_accept.clone(),
            paging: endpoint.paging.unwrap_or_default(),
            endpoint,
        }
    }

    /// The client this request executes against.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fills a `{name}` placeholder of the path template.
    pub fn path_param(&mut self, name: impl Into<String>, value: impl ToString) -> &mut Self {
        self.path_params.insert(name.into(), value.to_string());
        self
    }

    /// Sets a query parameter.
    pub fn query_param(&mut self, name: impl Into<String>, value: impl ToString) -> &mut Self {
        self.query_params.insert(name.into(), value.to_string());
        self
    }

    /// Includes or excludes a field from the response.
    pub fn project(&mut self, field: impl Into<String>, include: bool) -> &mut Self {
        self.projection.insert(field.into(), include);
        self
    }

    /// Sets a header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn header(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<&mut Self> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Sets the payload.
    pub fn set_media(&mut self, media: impl Into<Media>) -> &mut Self {
        self.media = media.into();
        self
    }

    /// Executes the call and decodes the response without a schema.
    pub async fn execute(&self) -> Result<ResponseInfo<Value>> {
        self.execute_with(&PassThrough).await
    }

    /// Executes the call and loads the response through `schema`.
    ///
    /// # Errors
    ///
    /// Fails before any network I/O if a path parameter is missing or the
    /// payload cannot be encoded. After the response arrives, an error
    /// envelope becomes [`Error::Api`], a status outside the endpoint's
    /// codes becomes [`Error::StatusMismatch`], and decoding failures are
    /// reported as described on [`decode_body`].
    pub async fn execute_with<S>(&self, schema: &S) -> Result<ResponseInfo<S::Output>>
    where
        S: Schema + ?Sized,
    {
        let (response, latency) = self.send(None).await?;
        decode_response(self.client.registry(), response, schema, latency)
    }

    /// Executes the call and applies the response onto `target`.
    ///
    /// Returns the same reference it was given.
    pub async fn execute_update<'a, T, U>(&self, target: &'a mut T, updater: &U) -> Result<&'a mut T>
    where
        T: Send,
        U: Updater<T> + ?Sized,
    {
        self.execute_update_with(&PassThrough, target, updater).await
    }

    /// Executes the call, loads the response through `schema` and applies it
    /// onto `target`.
    ///
    /// [`MergeFields`](crate::decode::MergeFields) merges the loaded fields, so
    /// fields the schema excludes are never overwritten. Closure updaters
    /// receive the decoded value before the schema.
    pub async fn execute_update_with<'a, S, T, U>(
        &self,
        schema: &S,
        target: &'a mut T,
        updater: &U,
    ) -> Result<&'a mut T>
    where
        S: Schema + ?Sized,
        T: Send,
        U: Updater<T> + ?Sized,
    {
        let (response, _) = self.send(None).await?;
        update_in_place(self.client.registry(), &response, schema, target, updater)
    }

    /// Fetches one page, turning "nothing to return" into a clean end.
    pub(crate) async fn fetch_page(&self, state: &PagingState) -> Result<PageFetch> {
        match self.send(Some(state)).await {
            Ok((response, _)) => Ok(PageFetch::Page(response)),
            Err(e) if e.is_nothing_to_return() => Ok(PageFetch::Exhausted),
            Err(e) => Err(e),
        }
    }

    pub(crate) fn decode_page(&self, response: &RawResponse) -> Result<Option<Value>> {
        decode_body(self.client.registry(), response)
    }

    async fn send(&self, page: Option<&PagingState>) -> Result<(RawResponse, Duration)> {
        let request = self.build(page)?;

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            "Executing HTTP request"
        );

        let start_time = Instant::now();
        let response = self.client.send(request).await?;
        let latency = start_time.elapsed();

        tracing::info!(
            status = response.status.as_u16(),
            latency_ms = latency.as_millis(),
            "Received HTTP response"
        );

        self.check(&response)?;
        Ok((response, latency))
    }

    /// Maps an error envelope to [`Error::Api`], then validates the status.
    fn check(&self, response: &RawResponse) -> Result<()> {
        if let Some(api_error) = ApiError::from_headers(&response.headers) {
            return Err(Error::Api(api_error));
        }

        if !self.endpoint.resp_codes.contains(&response.status) {
            return Err(Error::StatusMismatch {
                expected: self.endpoint.resp_codes.clone(),
                response: Box::new(response.clone()),
            });
        }

        Ok(())
    }

    /// Builds the wire request from the current state.
    pub(crate) fn build(&self, page: Option<&PagingState>) -> Result<TransportRequest> {
        let (body, content_type) = self.encode_media()?;
        let url = self.url(page)?;

        let mut headers = self.client.default_headers().clone();
        for (name, value) in &self.headers {
            headers.insert(name, value.clone());
        }

        if let Some(accept) = &self.mimetype_accept {
            headers.insert(ACCEPT, mimetype_header(accept)?);
        }

        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, mimetype_header(&content_type)?);
        }

        Ok(TransportRequest {
            method: self.endpoint.method.clone(),
            url,
            headers,
            body,
            timeout: self.client.timeout(),
        })
    }

    fn url(&self, page: Option<&PagingState>) -> Result<Url> {
        let path = self.resolve_path()?;
        let mut url = self.client.base_url().clone();
        let prefix = url.path().trim_end_matches('/').to_string();
        if path.starts_with('/') {
            url.set_path(&format!("{prefix}{path}"));
        } else {
            url.set_path(&format!("{prefix}/{path}"));
        }

        let mut query: Vec<(String, String)> = self
            .query_params
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        query.extend(self.projection.iter().map(|(field, include)| {
            let flag = if *include { "1" } else { "0" };
            (format!("{PROJECTION_PREFIX}{field}"), flag.to_string())
        }));

        if let Some(page) = page {
            query.extend(
                page.query_pairs()
                    .into_iter()
                    .map(|(key, value)| (key.to_string(), value)),
            );
        }

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Substitutes every `{name}` placeholder of the path template.
    fn resolve_path(&self) -> Result<String> {
        let template = self.endpoint.path.as_str();
        let mut resolved = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else {
                break;
            };
            let name = &rest[open + 1..open + close];
            let value = self
                .path_params
                .get(name)
                .ok_or_else(|| Error::MissingPathParam(name.to_string()))?;
            resolved.push_str(&rest[..open]);
            resolved.push_str(value);
            rest = &rest[open + close + 1..];
        }

        resolved.push_str(rest);
        Ok(resolved)
    }

    /// Encodes the payload, returning the body and its content type.
    fn encode_media(&self) -> Result<(Option<Bytes>, Option<MimeType>)> {
        match &self.media {
            Media::Empty => Ok((None, None)),
            Media::Raw(bytes) => Ok((Some(bytes.clone()), self.mimetype_send.clone())),
            Media::Text(text) => Ok((
                Some(Bytes::from(text.clone())),
                Some(self.mimetype_send.clone().unwrap_or(MimeType::Text)),
            )),
            Media::Structured(value) => {
                let mimetype = self.mimetype_send.clone().unwrap_or(MimeType::Json);
                let body = self.client.registry().encode(&mimetype, value)?;
                Ok((Some(Bytes::from(body)), Some(mimetype)))
            }
        }
    }
}

fn mimetype_header(mimetype: &MimeType) -> Result<HeaderValue> {
    HeaderValue::from_str(mimetype.as_str())
        .map_err(|e| Error::ConfigurationError(format!("Invalid mimetype '{}': {}", mimetype, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mimetype::MimeTypeRegistry;
    use http::Method;
    use serde_json::json;

    fn client() -> Client {
        Client::builder()
            .base_url("http://api-host")
            .unwrap()
            .registry(MimeTypeRegistry::new())
            .build()
            .unwrap()
    }

    #[test]
    fn test_path_params_substituted() {
        let endpoint = Endpoint::get("/names/{name_id}/aliases/{alias}");
        let mut req = client().request(&endpoint);
        req.path_param("name_id", 7).path_param("alias", "boy-who-lived");

        let built = req.build(None).unwrap();
        assert_eq!(
            built.url.as_str(),
            "http://api-host/names/7/aliases/boy-who-lived"
        );
        assert_eq!(built.method, Method::GET);
        assert!(built.body.is_none());
    }

    #[test]
    fn test_missing_path_param_fails_before_sending() {
        let endpoint = Endpoint::get("/names/{name_id}");
        let req = client().request(&endpoint);
        match req.build(None) {
            Err(Error::MissingPathParam(name)) => assert_eq!(name, "name_id"),
            other => panic!("Expected MissingPathParam, got {:?}", other),
        }
    }

    #[test]
    fn test_base_path_prefix_is_kept() {
        let client = Client::builder()
            .base_url("http://api-host/v1/")
            .unwrap()
            .build()
            .unwrap();
        let req = client.request(&Endpoint::get("names"));
        assert_eq!(req.build(None).unwrap().url.as_str(), "http://api-host/v1/names");
    }

    #[test]
    fn test_projection_and_query_params() {
        let endpoint = Endpoint::get("/endpoint").query_param("limit", 10);
        let mut req = client().request(&endpoint);
        req.project("field1", true).project("field2", false);

        let built = req.build(None).unwrap();
        assert_eq!(built.query_param("limit").as_deref(), Some("10"));
        assert_eq!(built.query_param("project.field1").as_deref(), Some("1"));
        assert_eq!(built.query_param("project.field2").as_deref(), Some("0"));
    }

    #[test]
    fn test_no_query_string_when_empty() {
        let req = client().request(&Endpoint::get("/names"));
        assert_eq!(req.build(None).unwrap().url.query(), None);
    }

    #[test]
    fn test_structured_media_defaults_to_json() {
        let mut req = client().request(&Endpoint::post("/names"));
        req.set_media(json!({"first": "Harry", "last": "Potter"}));

        let built = req.build(None).unwrap();
        assert_eq!(built.headers[CONTENT_TYPE], "application/json");
        let body: Value = serde_json::from_slice(built.body.as_ref().unwrap()).unwrap();
        assert_eq!(body, json!({"first": "Harry", "last": "Potter"}));
    }

    #[test]
    fn test_text_media_passes_through() {
        let mut req = client().request(&Endpoint::post("/names").mimetype_send(MimeType::Yaml));
        req.set_media(r#"{"first": "Harry"}"#);

        let built = req.build(None).unwrap();
        assert_eq!(built.headers[CONTENT_TYPE], "application/x-yaml");
        assert_eq!(built.body.unwrap().as_ref(), br#"{"first": "Harry"}"#);
    }

    #[test]
    fn test_raw_media_with_unregistered_mimetype() {
        let mut req = client().request(&Endpoint::post("/names"));
        req.set_media(b"Some Bin Data".to_vec());
        req.mimetype_send = Some(MimeType::from("application/unknown"));

        let built = req.build(None).unwrap();
        assert_eq!(built.headers[CONTENT_TYPE], "application/unknown");
        assert_eq!(built.body.unwrap().as_ref(), b"Some Bin Data");
    }

    #[test]
    fn test_structured_media_with_unregistered_mimetype() {
        let mut req = client().request(&Endpoint::post("/names"));
        req.set_media(json!({"key": "value"}));
        req.mimetype_send = Some(MimeType::from("application/unknown"));

        assert!(matches!(
            req.build(None),
            Err(Error::ContentTypeUnknown { response: None, .. })
        ));
    }

    #[test]
    fn test_accept_and_endpoint_headers() {
        let endpoint = Endpoint::get("/names")
            .header("X-Trace", "abc")
            .unwrap()
            .mimetype_accept(MimeType::Bson);
        let mut req = client().request(&endpoint);
        req.header("x-trace", "override").unwrap();

        let built = req.build(None).unwrap();
        assert_eq!(built.headers[ACCEPT], "application/bson");
        assert_eq!(built.headers["x-trace"], "override");
    }

    #[test]
    fn test_changes_after_build_do_not_leak_into_endpoint() {
        let endpoint = Endpoint::get("/original");
        let mut req = client().request(&endpoint);
        req.endpoint.path = "/changed".to_string();

        assert_eq!(req.build(None).unwrap().url.path(), "/changed");
        assert_eq!(endpoint.path, "/original");
        let fresh = client().request(&endpoint);
        assert_eq!(fresh.build(None).unwrap().url.path(), "/original");
    }

    #[test]
    fn test_media_dump_through_schema() {
        use crate::schema::SerdeSchema;

        #[derive(Serialize, serde::Deserialize)]
        struct NameId {
            id: u32,
            first: String,
        }

        let schema = SerdeSchema::<NameId>::new().exclude(["id"]);
        let media = Media::dump(
            &schema,
            &NameId {
                id: 3,
                first: "Harry".into(),
            },
        )
        .unwrap();
        assert_eq!(media, Media::Structured(json!({"first": "Harry"})));
    }
}
