//! Error types for declared API calls.
//!
//! Every failure the request/response pipeline can detect is a variant of
//! [`Error`]. Variants that concern a received response keep the
//! [`RawResponse`] so callers can inspect status, headers and body.

use crate::api_error::ApiError;
use crate::response::RawResponse;
use http::StatusCode;

/// Boxed error type returned by custom codecs and transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The main error type for declared API calls.
///
/// # Examples
///
/// ```no_run
/// use apiframe::{Client, Endpoint, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// let endpoint = Endpoint::get("/names");
/// match client.request(&endpoint).execute().await {
///     Ok(info) => println!("Decoded: {:?}", info.decoded),
///     Err(Error::StatusMismatch { response, .. }) => {
///         eprintln!("Unexpected status {}", response.status);
///     }
///     Err(Error::Api(api)) => eprintln!("{} ({}): {}", api.name, api.id, api),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error raised by the default `reqwest` transport.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A custom [`Transport`](crate::Transport) failed to complete the call.
    #[error("Transport error: {0}")]
    Transport(String),

    /// No codec is registered for the content type that was encountered or requested.
    ///
    /// `response` is set when the content type came from a received response, and
    /// is `None` when the failure happened while encoding the outgoing payload.
    #[error("No codec registered for content type '{content_type}'")]
    ContentTypeUnknown {
        /// The offending content type, as given.
        content_type: String,
        /// The response whose body could not be decoded, if any.
        response: Option<Box<RawResponse>>,
    },

    /// A response body was present but no `Content-Type` header selected a codec.
    #[error("Response body present without a Content-Type header (status {})", .response.status)]
    ContentDecode {
        /// The response that could not be decoded.
        response: Box<RawResponse>,
    },

    /// The response status code is outside the endpoint's allowed set.
    #[error("Status {} not in allowed set {expected:?}", .response.status)]
    StatusMismatch {
        /// The status codes the endpoint accepts.
        expected: Vec<StatusCode>,
        /// The response that was rejected.
        response: Box<RawResponse>,
    },

    /// The server reported an application error through the `error-*` headers.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A registered codec failed to encode or decode a payload.
    #[error("Codec for '{content_type}' failed: {source}")]
    Codec {
        /// The content type whose codec failed.
        content_type: String,
        /// The codec's own error.
        #[source]
        source: BoxError,
    },

    /// A schema failed to load a decoded value or dump a domain value.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A placeholder in the endpoint's path template was never filled.
    #[error("Path parameter '{0}' was not provided")]
    MissingPathParam(String),

    /// A response with no body was returned where a loaded value was required.
    #[error("Response (status {status}) carried no body to load")]
    MissingBody {
        /// The HTTP status code of the empty response.
        status: StatusCode,
    },

    /// Invalid configuration was provided, such as an invalid header value.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns the response this error was raised for, if any.
    pub fn response(&self) -> Option<&RawResponse> {
        match self {
            Error::ContentTypeUnknown { response, .. } => response.as_deref(),
            Error::ContentDecode { response } => Some(&**response),
            Error::StatusMismatch { response, .. } => Some(&**response),
            _ => None,
        }
    }

    /// Returns the HTTP status code of the response behind this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::MissingBody { status } => Some(*status),
            Error::Network(e) => e.status(),
            _ => self.response().map(|r| r.status),
        }
    }

    /// Returns the application error carried by the `error-*` headers, if this is one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(api) => Some(api),
            _ => None,
        }
    }

    /// Returns `true` if the server said there is nothing (more) to return.
    ///
    /// # Examples
    ///
    /// ```
    /// use apiframe::{ApiError, ApiErrorKind, Error};
    ///
    /// let err = Error::Api(ApiError::new(ApiErrorKind::NothingToReturn, "empty"));
    /// assert!(err.is_nothing_to_return());
    /// ```
    pub fn is_nothing_to_return(&self) -> bool {
        self.api_error()
            .is_some_and(|api| api.kind == crate::ApiErrorKind::NothingToReturn)
    }
}

/// A specialized `Result` type for declared API calls.
pub type Result<T> = std::result::Result<T, Error>;
