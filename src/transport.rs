//! The seam between the client and the network.
//!
//! A [`Transport`] takes a fully built [`TransportRequest`] and returns the
//! [`RawResponse`]. `reqwest::Client` is the default implementation; tests can
//! substitute their own.

use crate::response::RawResponse;
use crate::Result;
use bytes::Bytes;
use futures::future::BoxFuture;
use http::{HeaderMap, Method};
use std::time::Duration;
use url::Url;

/// A request ready to go on the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// The HTTP method.
    pub method: Method,
    /// The full URL, path parameters substituted and query string applied.
    pub url: Url,
    /// All request headers, including `Accept` and `Content-Type`.
    pub headers: HeaderMap,
    /// The encoded body, if there is one.
    pub body: Option<Bytes>,
    /// Per-request timeout, if configured.
    pub timeout: Option<Duration>,
}

impl TransportRequest {
    /// Returns the first value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

/// Sends requests and returns their responses.
pub trait Transport: Send + Sync + 'static {
    /// Sends one request and reads the whole response.
    fn send(&self, request: TransportRequest) -> BoxFuture<'_, Result<RawResponse>>;
}

impl Transport for reqwest::Client {
    fn send(&self, request: TransportRequest) -> BoxFuture<'_, Result<RawResponse>> {
        Box::pin(async move {
            let mut builder = self
                .request(request.method, request.url)
                .headers(request.headers);

            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }

            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;

            Ok(RawResponse::new(status, headers, body))
        })
    }
}
