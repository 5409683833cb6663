//! The client that declared endpoints execute against.
//!
//! The [`Client`] type holds everything shared between calls: the base URL,
//! default headers, the mimetype registry and the transport session. Use
//! [`ClientBuilder`] to configure and create clients.

use crate::{
    endpoint::{parse_header, Endpoint},
    mimetype::MimeTypeRegistry,
    request::ClientRequest,
    response::RawResponse,
    transport::{Transport, TransportRequest},
    Error, Result,
};
use http::HeaderMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

/// A client for declared API endpoints.
///
/// The client is designed to be reused across calls. Clones share the same
/// transport session, which is created on first use and released when the
/// last clone is dropped.
///
/// # Examples
///
/// ```no_run
/// use apiframe::{Client, Endpoint};
/// use apiframe::schema::SerdeSchema;
/// use serde::{Deserialize, Serialize};
/// use std::time::Duration;
///
/// #[derive(Serialize, Deserialize)]
/// struct Name {
///     first: String,
///     last: String,
/// }
///
/// # async fn example() -> Result<(), apiframe::Error> {
/// let client = Client::builder()
///     .base_url("http://api-host")?
///     .port(8080)
///     .timeout(Duration::from_secs(30))
///     .build()?;
///
/// let fetch = Endpoint::get("/names/{name_id}");
///
/// let mut req = client.request(&fetch);
/// req.path_param("name_id", 7);
/// let name = req.execute_with(&SerdeSchema::<Name>::new()).await?.require_loaded()?;
/// println!("{} {}", name.first, name.last);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base_url: Url,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
    registry: MimeTypeRegistry,
    session: OnceCell<Arc<dyn Transport>>,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Starts a call to the given endpoint.
    ///
    /// The endpoint's settings are copied into the returned request, which
    /// the endpoint method then fills in and executes.
    pub fn request(&self, endpoint: &Endpoint) -> ClientRequest {
        ClientRequest::new(self.clone(), endpoint.clone())
    }

    /// The URL every endpoint path is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The mimetype registry this client encodes and decodes with.
    pub fn registry(&self) -> &MimeTypeRegistry {
        &self.inner.registry
    }

    pub(crate) fn default_headers(&self) -> &HeaderMap {
        &self.inner.default_headers
    }

    pub(crate) fn timeout(&self) -> Option<Duration> {
        self.inner.timeout
    }

    /// Returns `true` once the transport session exists.
    pub fn session_started(&self) -> bool {
        self.inner.session.initialized()
    }

    async fn session(&self) -> Result<&Arc<dyn Transport>> {
        self.inner
            .session
            .get_or_try_init(|| async {
                tracing::debug!(base_url = %self.inner.base_url, "Starting HTTP session");
                let http_client = reqwest::Client::builder().build().map_err(|e| {
                    Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
                })?;
                Ok::<Arc<dyn Transport>, Error>(Arc::new(http_client))
            })
            .await
    }

    /// Sends a built request through the session.
    pub(crate) async fn send(&self, request: TransportRequest) -> Result<RawResponse> {
        let session = self.session().await?;
        session.send(request).await
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use apiframe::{ClientBuilder, MimeTypeRegistry};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), apiframe::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")?
///     .timeout(Duration::from_secs(30))
///     .registry(MimeTypeRegistry::new())
///     .default_header("User-Agent", "my-app/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<Url>,
    port: Option<u16>,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
    registry: Option<MimeTypeRegistry>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            port: None,
            default_headers: HeaderMap::new(),
            timeout: None,
            registry: None,
            transport: None,
        }
    }

    /// Sets the base URL for all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Overrides the port of the base URL.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Uses the given registry instead of the process-wide one.
    pub fn registry(mut self, registry: MimeTypeRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sends requests through the given transport instead of a lazily created
    /// `reqwest` session.
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided or the port cannot be
    /// applied to it.
    pub fn build(self) -> Result<Client> {
        let mut base_url = self
            .base_url
            .ok_or_else(|| Error::ConfigurationError("Base URL is required".to_string()))?;

        if let Some(port) = self.port {
            base_url.set_port(Some(port)).map_err(|_| {
                Error::ConfigurationError(format!("Base URL {} cannot carry a port", base_url))
            })?;
        }

        Ok(Client {
            inner: Arc::new(ClientInner {
                base_url,
                default_headers: self.default_headers,
                timeout: self.timeout,
                registry: self.registry.unwrap_or_else(MimeTypeRegistry::global),
                session: OnceCell::new_with(self.transport),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_required() {
        match Client::builder().build() {
            Err(Error::ConfigurationError(message)) => assert!(message.contains("Base URL")),
            Err(e) => panic!("Expected ConfigurationError, got {:?}", e),
            Ok(_) => panic!("Expected ConfigurationError, got a client"),
        }
    }

    #[test]
    fn test_port_override() {
        let client = Client::builder()
            .base_url("http://api-host")
            .unwrap()
            .port(8080)
            .build()
            .unwrap();
        assert_eq!(client.base_url().as_str(), "http://api-host:8080/");
    }

    #[tokio::test]
    async fn test_session_is_created_lazily_and_shared() {
        let client = Client::builder()
            .base_url("http://api-host")
            .unwrap()
            .build()
            .unwrap();
        let clone = client.clone();
        assert!(!client.session_started());

        let first = Arc::as_ptr(client.session().await.unwrap());
        assert!(clone.session_started());
        let second = Arc::as_ptr(clone.session().await.unwrap());
        assert!(std::ptr::addr_eq(first, second));
    }
}
