//! Response types that keep both decoded data and the raw response.
//!
//! [`RawResponse`] is what a transport hands back. [`ResponseInfo`] is the
//! result of handling one response: the schema-loaded value, the decoded
//! value it came from, and the raw response itself.

use crate::{Error, Result};
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// A response as received from the transport.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The raw response body.
    pub body: Bytes,
}

impl RawResponse {
    /// Creates a response from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Returns the body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The result of handling one response.
///
/// If the body was empty, both `loaded` and `decoded` are `None`. Loading
/// through a schema never changes `decoded`.
///
/// # Examples
///
/// ```no_run
/// use apiframe::{Client, Endpoint};
/// use apiframe::schema::SerdeSchema;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Name {
///     first: String,
///     last: String,
/// }
///
/// # async fn example() -> Result<(), apiframe::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// let endpoint = Endpoint::get("/names/{id}");
/// let mut req = client.request(&endpoint);
/// req.path_param("id", 7);
///
/// let info = req.execute_with(&SerdeSchema::<Name>::new()).await?;
/// println!("Status: {}", info.status());
/// println!("Took {:?}", info.latency);
/// println!("Raw body: {}", info.resp.text());
/// let name = info.require_loaded()?;
/// println!("Name: {} {}", name.first, name.last);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ResponseInfo<T> {
    /// The decoded value after passing through the schema.
    pub loaded: Option<T>,

    /// The decoded value before any schema was applied.
    pub decoded: Option<Value>,

    /// The response this information was taken from.
    pub resp: RawResponse,

    /// Time from sending the request until the response was read.
    pub latency: Duration,
}

impl<T> ResponseInfo<T> {
    /// Creates the result of handling one response.
    pub fn new(
        loaded: Option<T>,
        decoded: Option<Value>,
        resp: RawResponse,
        latency: Duration,
    ) -> Self {
        Self {
            loaded,
            decoded,
            resp,
            latency,
        }
    }

    /// Returns the HTTP status code of the response.
    pub fn status(&self) -> StatusCode {
        self.resp.status
    }

    /// Returns a reference to a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.resp.header(name)
    }

    /// Returns `true` if the response carried no body.
    pub fn is_empty(&self) -> bool {
        self.decoded.is_none()
    }

    /// Consumes the info, returning the loaded value if there was one.
    pub fn into_loaded(self) -> Option<T> {
        self.loaded
    }

    /// Consumes the info, returning the loaded value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingBody`] if the response had no body.
    pub fn require_loaded(self) -> Result<T> {
        let status = self.resp.status;
        self.loaded.ok_or(Error::MissingBody { status })
    }

    /// Maps the loaded value while keeping the rest of the information.
    pub fn map<U, F>(self, f: F) -> ResponseInfo<U>
    where
        F: FnOnce(T) -> U,
    {
        ResponseInfo {
            loaded: self.loaded.map(f),
            decoded: self.decoded,
            resp: self.resp,
            latency: self.latency,
        }
    }
}
