//! Application errors carried in response headers.
//!
//! A server reports an application-level failure through a set of `error-*`
//! headers (the error envelope), independent of the HTTP status line:
//!
//! | Header          | Meaning                               |
//! |-----------------|---------------------------------------|
//! | `error-name`    | taxonomy tag, e.g. `NothingToReturnError` |
//! | `error-code`    | numeric api code                      |
//! | `error-data`    | JSON-encoded structured payload       |
//! | `error-message` | human-readable message                |
//! | `error-id`      | UUID of this error instance           |
//!
//! [`ApiError::from_headers`] turns such an envelope into a typed [`ApiError`].

use http::HeaderMap;
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

pub const ERROR_NAME: &str = "error-name";
pub const ERROR_CODE: &str = "error-code";
pub const ERROR_DATA: &str = "error-data";
pub const ERROR_MESSAGE: &str = "error-message";
pub const ERROR_ID: &str = "error-id";

/// The error taxonomy, keyed by the `error-name` wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Base variant. Also used for names this client does not know.
    ApiError,
    /// The endpoint does not support the HTTP method used.
    InvalidMethod,
    /// The server rejected the request payload or parameters.
    RequestValidation,
    /// The server failed to produce a valid response payload.
    ResponseValidation,
    /// There is nothing (more) to return. Ends a paged stream cleanly.
    NothingToReturn,
}

impl ApiErrorKind {
    const ALL: [ApiErrorKind; 5] = [
        ApiErrorKind::ApiError,
        ApiErrorKind::InvalidMethod,
        ApiErrorKind::RequestValidation,
        ApiErrorKind::ResponseValidation,
        ApiErrorKind::NothingToReturn,
    ];

    /// The `error-name` wire value of this kind.
    pub fn name(self) -> &'static str {
        match self {
            ApiErrorKind::ApiError => "APIError",
            ApiErrorKind::InvalidMethod => "InvalidMethodError",
            ApiErrorKind::RequestValidation => "RequestValidationError",
            ApiErrorKind::ResponseValidation => "ResponseValidationError",
            ApiErrorKind::NothingToReturn => "NothingToReturnError",
        }
    }

    /// The numeric api code servers send in `error-code` for this kind.
    pub fn api_code(self) -> i64 {
        match self {
            ApiErrorKind::ApiError => 1000,
            ApiErrorKind::InvalidMethod => 1001,
            ApiErrorKind::NothingToReturn => 1002,
            ApiErrorKind::RequestValidation => 1003,
            ApiErrorKind::ResponseValidation => 1004,
        }
    }

    /// Looks up a kind by its wire name. Unknown names map to the base variant.
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .unwrap_or(ApiErrorKind::ApiError)
    }
}

/// An application error reported by the server.
///
/// The string form of the error is exactly the server's message.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    /// The taxonomy entry this error belongs to.
    pub kind: ApiErrorKind,
    /// The `error-name` as sent. Differs from `kind.name()` for unknown names.
    pub name: String,
    /// Identifies this error instance. Nil when the server sent no usable id.
    pub id: Uuid,
    /// The numeric api code, if one was sent.
    pub code: Option<i64>,
    /// Structured payload decoded from `error-data`.
    pub error_data: Option<Value>,
    /// Human-readable message.
    pub message: String,
}

impl ApiError {
    /// Creates an error of the given kind with a nil id and no payload.
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            name: kind.name().to_string(),
            id: Uuid::nil(),
            code: Some(kind.api_code()),
            error_data: None,
            message: message.into(),
        }
    }

    /// Reads an error envelope from response headers.
    ///
    /// Returns `None` when there is no `error-name` header. An `error-data`
    /// value that is not valid JSON is kept verbatim as a JSON string.
    ///
    /// # Examples
    ///
    /// ```
    /// use apiframe::{ApiError, ApiErrorKind};
    /// use http::{HeaderMap, HeaderValue};
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("error-name", HeaderValue::from_static("RequestValidationError"));
    /// headers.insert("error-message", HeaderValue::from_static("bad payload"));
    ///
    /// let error = ApiError::from_headers(&headers).unwrap();
    /// assert_eq!(error.kind, ApiErrorKind::RequestValidation);
    /// assert_eq!(error.to_string(), "bad payload");
    /// ```
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let name = header_str(headers, ERROR_NAME)?;
        let kind = ApiErrorKind::from_name(name);

        let id = header_str(headers, ERROR_ID)
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .unwrap_or_else(Uuid::nil);
        let code = header_str(headers, ERROR_CODE).and_then(|raw| raw.trim().parse().ok());
        let error_data = header_str(headers, ERROR_DATA).map(|raw| {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        });
        let message = header_str(headers, ERROR_MESSAGE)
            .unwrap_or_default()
            .to_string();

        Some(Self {
            kind,
            name: name.to_string(),
            id,
            code,
            error_data,
            message,
        })
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}
