//! Endpoint declarations.
//!
//! An [`Endpoint`] is the static description of one API operation: its
//! method, path template, accepted status codes, default query parameters
//! and headers, mimetypes and paging. Each call copies it into a
//! [`ClientRequest`](crate::ClientRequest), so per-call changes never leak
//! into the declaration.

use crate::mimetype::MimeType;
use crate::paging::PagingConfig;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use std::collections::BTreeMap;

/// The declaration of one API operation.
///
/// # Examples
///
/// ```
/// use apiframe::{Endpoint, MimeType, PagingConfig};
/// use http::StatusCode;
///
/// let create = Endpoint::post("/names/{name_id}")
///     .resp_codes([StatusCode::CREATED])
///     .mimetype_send(MimeType::Yaml)
///     .header("Accept", "application/json")
///     .unwrap();
///
/// let list = Endpoint::get("/names")
///     .mimetype_accept(MimeType::Json)
///     .paged(PagingConfig::new(2));
///
/// assert_eq!(create.resp_codes, vec![StatusCode::CREATED]);
/// assert_eq!(list.resp_codes, vec![StatusCode::OK]);
/// ```
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The path template, with `{name}` placeholders for path parameters.
    pub path: String,

    /// The status codes that count as success. Defaults to `[200]`.
    pub resp_codes: Vec<StatusCode>,

    /// Query parameters sent with every call.
    pub query_params: BTreeMap<String, String>,

    /// Headers sent with every call.
    pub headers: HeaderMap,

    /// The mimetype to encode payloads with. Inferred from the payload when unset.
    pub mimetype_send: Option<MimeType>,

    /// The mimetype requested through `Accept`.
    pub mimetype_accept: Option<MimeType>,

    /// Paging defaults for endpoints that return a sequence across pages.
    pub paging: Option<PagingConfig>,
}

impl Endpoint {
    /// Creates a new `Endpoint` with the given method and path template.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            resp_codes: vec![StatusCode::OK],
            query_params: BTreeMap::new(),
            headers: HeaderMap::new(),
            mimetype_send: None,
            mimetype_accept: None,
            paging: None,
        }
    }

    /// Declares a `GET` endpoint.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Declares a `POST` endpoint.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Declares a `PUT` endpoint.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Declares a `PATCH` endpoint.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// Declares a `DELETE` endpoint.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Replaces the set of accepted status codes.
    pub fn resp_codes(mut self, codes: impl IntoIterator<Item = StatusCode>) -> Self {
        self.resp_codes = codes.into_iter().collect();
        self
    }

    /// Adds a default query parameter.
    pub fn query_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query_params.insert(key.into(), value.to_string());
        self
    }

    /// Adds a default header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, crate::Error> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Sets the mimetype payloads are encoded with.
    pub fn mimetype_send(mut self, mimetype: impl Into<MimeType>) -> Self {
        self.mimetype_send = Some(mimetype.into());
        self
    }

    /// Sets the mimetype sent in the `Accept` header.
    pub fn mimetype_accept(mut self, mimetype: impl Into<MimeType>) -> Self {
        self.mimetype_accept = Some(mimetype.into());
        self
    }

    /// Marks the endpoint as paged.
    pub fn paged(mut self, paging: PagingConfig) -> Self {
        self.paging = Some(paging);
        self
    }
}

pub(crate) fn parse_header(
    name: &str,
    value: &str,
) -> Result<(HeaderName, HeaderValue), crate::Error> {
    let name = HeaderName::try_from(name)
        .map_err(|e| crate::Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
    let value = HeaderValue::try_from(value)
        .map_err(|e| crate::Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
    Ok((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let endpoint = Endpoint::get("/names");
        assert_eq!(endpoint.method, Method::GET);
        assert_eq!(endpoint.resp_codes, vec![StatusCode::OK]);
        assert!(endpoint.paging.is_none());
        assert!(endpoint.mimetype_send.is_none());
    }

    #[test]
    fn test_invalid_header() {
        let result = Endpoint::get("/names").header("bad header", "value");
        assert!(matches!(result, Err(crate::Error::ConfigurationError(_))));
    }

    #[test]
    fn test_query_params_accept_any_display() {
        let endpoint = Endpoint::get("/names")
            .query_param("limit", 10)
            .query_param("offset", 0);
        assert_eq!(endpoint.query_params["limit"], "10");
        assert_eq!(endpoint.query_params["offset"], "0");
    }
}
