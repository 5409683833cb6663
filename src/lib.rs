//! # Apiframe - A declarative HTTP API client layer
//!
//! Apiframe lets you declare API endpoints once (method, path template,
//! accepted status codes, mimetypes, paging) and takes care of everything a
//! call needs: URL construction, content negotiation, payload encoding and
//! decoding, status validation, structured error translation and multi-page
//! iteration. It is built on top of `reqwest`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use apiframe::{Client, Endpoint, Media};
//! use apiframe::schema::SerdeSchema;
//! use http::StatusCode;
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Name {
//!     first: String,
//!     last: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), apiframe::Error> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")?
//!         .timeout(Duration::from_secs(30))
//!         .build()?;
//!
//!     let fetch = Endpoint::get("/names/{name_id}");
//!     let create = Endpoint::post("/names").resp_codes([StatusCode::CREATED]);
//!     let schema = SerdeSchema::<Name>::new();
//!
//!     // Fetch one name
//!     let mut req = client.request(&fetch);
//!     req.path_param("name_id", 7);
//!     let info = req.execute_with(&schema).await?;
//!     println!("Request took {:?}", info.latency);
//!     let name = info.require_loaded()?;
//!     println!("Name: {} {}", name.first, name.last);
//!
//!     // Create one
//!     let mut req = client.request(&create);
//!     req.media = Media::dump(&schema, &name)?;
//!     let created = req.execute_with(&schema).await?;
//!     println!("Created with status {}", created.status());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Declared endpoints** - Path templates, status allow-lists, default query parameters and headers
//! - **Pluggable wire formats** - JSON, YAML, BSON and text out of the box, custom codecs by registration
//! - **Schemas** - Load decoded values into domain types and dump them back, with field exclusion
//! - **Structured API errors** - `error-*` response headers become typed [`ApiError`]s
//! - **Update-in-place** - Apply a response onto an existing object instead of building a new one
//! - **Paging** - Offset or cursor paging exposed as a lazy stream of items
//! - **Automatic logging** - Structured logging with `tracing` for observability
//! - **Raw access** - Every result and error keeps the status, headers and body it came from
//!
//! ## Error Handling
//!
//! Application errors reported by the server are surfaced as [`Error::Api`]:
//!
//! ```no_run
//! use apiframe::{ApiErrorKind, Client, Endpoint, Error};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().base_url("https://api.example.com")?.build()?;
//! match client.request(&Endpoint::get("/names")).execute().await {
//!     Ok(info) => println!("Success: {:?}", info.decoded),
//!     Err(Error::Api(api)) if api.kind == ApiErrorKind::RequestValidation => {
//!         eprintln!("Rejected ({}): {}", api.id, api);
//!         eprintln!("  Details: {:?}", api.error_data);
//!     }
//!     Err(Error::StatusMismatch { expected, response }) => {
//!         eprintln!("HTTP {} (expected {:?}): {}", response.status, expected, response.text());
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Paging
//!
//! ```no_run
//! use apiframe::{Client, Endpoint, PagingConfig};
//! use futures::TryStreamExt;
//!
//! # async fn example() -> Result<(), apiframe::Error> {
//! # let client = Client::builder().base_url("https://api.example.com")?.build()?;
//! let list = Endpoint::get("/names").paged(PagingConfig::new(100));
//!
//! let names: Vec<_> = client.request(&list).paged_raw().try_collect().await?;
//! println!("Fetched {} names", names.len());
//! # Ok(())
//! # }
//! ```

mod api_error;
mod client;
pub mod decode;
mod endpoint;
mod error;
mod mimetype;
pub mod paging;
mod request;
mod response;
pub mod schema;
pub mod transport;

pub use api_error::{ApiError, ApiErrorKind};
pub use client::{Client, ClientBuilder};
pub use endpoint::Endpoint;
pub use error::{BoxError, Error, Result};
pub use mimetype::{register_mimetype, Codec, MimeType, MimeTypeRegistry};
pub use paging::{PageItem, Paged, PagingConfig, PagingState};
pub use request::{ClientRequest, Media};
pub use response::{RawResponse, ResponseInfo};
pub use transport::{Transport, TransportRequest};
