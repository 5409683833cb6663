//! Iteration over paged endpoints.
//!
//! A paged call turns a sequence of page responses into one stream of items.
//! Each page is fetched only when the consumer has drained the previous one,
//! so dropping the stream early never issues another request.
//!
//! Pages are addressed with `paging-offset`/`paging-limit` query parameters.
//! A response continues the sequence by carrying a non-empty `paging-next`
//! header; if it also carries `paging-cursor`, the next request sends that
//! cursor instead of an offset. A server answering with a
//! `NothingToReturnError` envelope ends the stream cleanly.

use crate::{
    request::ClientRequest,
    response::RawResponse,
    schema::{PassThrough, Schema},
    Error, Result,
};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde_json::Value;

/// Query parameter carrying the offset of the requested page.
pub const PAGING_OFFSET: &str = "paging-offset";

/// Query parameter carrying the page size.
pub const PAGING_LIMIT: &str = "paging-limit";

/// Response header signalling that another page exists.
pub const PAGING_NEXT: &str = "paging-next";

/// Response header and query parameter carrying an opaque page cursor.
pub const PAGING_CURSOR: &str = "paging-cursor";

/// Page size used when an endpoint does not set one.
pub const DEFAULT_PAGE_LIMIT: u64 = 50;

/// Where paging starts and how large pages are.
///
/// # Examples
///
/// ```
/// use apiframe::PagingConfig;
///
/// let config = PagingConfig::new(2).offset_start(10);
/// assert_eq!(config.limit, 2);
/// assert_eq!(config.offset_start, 10);
/// assert_eq!(PagingConfig::default().limit, 50);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    /// Offset of the first page.
    pub offset_start: u64,
    /// Items requested per page. Never zero.
    pub limit: u64,
}

impl PagingConfig {
    /// Creates a config starting at offset 0. A zero limit is raised to 1.
    pub fn new(limit: u64) -> Self {
        Self {
            offset_start: 0,
            limit: limit.max(1),
        }
    }

    /// Sets the offset of the first page.
    pub fn offset_start(mut self, offset: u64) -> Self {
        self.offset_start = offset;
        self
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT)
    }
}

/// The position of the next page to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingState {
    /// Offset of the page, counted in items.
    pub offset: u64,
    /// Items requested per page.
    pub limit: u64,
    /// Set once the server has handed out a cursor.
    pub cursor: Option<String>,
}

impl PagingState {
    /// The state of the first page.
    pub fn start(config: &PagingConfig) -> Self {
        Self {
            offset: config.offset_start,
            limit: config.limit.max(1),
            cursor: None,
        }
    }

    /// The query parameters that address this page.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match &self.cursor {
            Some(cursor) => vec![
                (PAGING_CURSOR, cursor.clone()),
                (PAGING_LIMIT, self.limit.to_string()),
            ],
            None => vec![
                (PAGING_OFFSET, self.offset.to_string()),
                (PAGING_LIMIT, self.limit.to_string()),
            ],
        }
    }

    /// Returns the state of the page after `response`, or `None` if
    /// `response` was the last page.
    ///
    /// A returned cursor takes precedence over offset arithmetic. The offset
    /// still advances past every page, so a later page without a cursor
    /// continues after the items already returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use apiframe::{PagingConfig, PagingState, RawResponse};
    /// use http::{HeaderMap, HeaderValue, StatusCode};
    ///
    /// let state = PagingState::start(&PagingConfig::new(2));
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("paging-next", HeaderValue::from_static("true"));
    /// let more = RawResponse::new(StatusCode::OK, headers, "[]");
    /// assert_eq!(state.advance(&more).map(|next| next.offset), Some(2));
    ///
    /// let last = RawResponse::new(StatusCode::OK, HeaderMap::new(), "[]");
    /// assert!(state.advance(&last).is_none());
    /// ```
    pub fn advance(&self, response: &RawResponse) -> Option<Self> {
        non_empty_header(response, PAGING_NEXT)?;

        Some(Self {
            offset: self.offset.saturating_add(self.limit),
            limit: self.limit,
            cursor: non_empty_header(response, PAGING_CURSOR).map(str::to_string),
        })
    }
}

fn non_empty_header<'a>(response: &'a RawResponse, name: &str) -> Option<&'a str> {
    response
        .header(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Outcome of fetching one page.
#[derive(Debug)]
pub(crate) enum PageFetch {
    /// A page arrived and passed validation.
    Page(RawResponse),
    /// The server has nothing (more) to return.
    Exhausted,
}

/// One element of a paged sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct PageItem<T> {
    /// The element after passing through the schema.
    pub loaded: T,
    /// The element as decoded from the page.
    pub decoded: Value,
}

/// A lazily fetched stream of page elements.
pub type Paged<T> = BoxStream<'static, Result<PageItem<T>>>;

struct Pager<S> {
    request: ClientRequest,
    schema: S,
    next: Option<PagingState>,
}

impl<S> Pager<S>
where
    S: Schema,
{
    async fn next_page(mut self) -> Result<Option<(Vec<PageItem<S::Output>>, Self)>> {
        let Some(state) = self.next.take() else {
            return Ok(None);
        };

        tracing::debug!(
            offset = state.offset,
            limit = state.limit,
            cursor = ?state.cursor,
            "Fetching page"
        );

        let response = match self.request.fetch_page(&state).await? {
            PageFetch::Page(response) => response,
            PageFetch::Exhausted => {
                tracing::debug!(offset = state.offset, "Server has nothing more to return");
                return Ok(None);
            }
        };

        let values = match self.request.decode_page(&response)? {
            None => Vec::new(),
            Some(Value::Array(values)) => values,
            Some(other) => vec![other],
        };

        let items = values
            .into_iter()
            .map(|decoded| {
                let loaded = self.schema.load(&decoded)?;
                Ok(PageItem { loaded, decoded })
            })
            .collect::<Result<Vec<_>>>()?;

        self.next = state.advance(&response);
        Ok(Some((items, self)))
    }
}

impl ClientRequest {
    /// Streams the elements of every page, loading each through `schema`.
    ///
    /// Paging starts from this request's [`PagingConfig`]. Each call starts
    /// over from the first page. A page with an empty body contributes no
    /// items; the stream still moves on to the next page if the response
    /// carried `paging-next`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use apiframe::{Client, Endpoint, PagingConfig};
    /// use apiframe::schema::SerdeSchema;
    /// use futures::TryStreamExt;
    /// use serde::{Deserialize, Serialize};
    ///
    /// #[derive(Serialize, Deserialize)]
    /// struct Name {
    ///     first: String,
    /// }
    ///
    /// # async fn example() -> Result<(), apiframe::Error> {
    /// let client = Client::builder().base_url("http://api-host")?.build()?;
    /// let list = Endpoint::get("/names").paged(PagingConfig::new(2));
    ///
    /// let mut names = client.request(&list).paged(SerdeSchema::<Name>::new());
    /// while let Some(item) = names.try_next().await? {
    ///     println!("{}", item.loaded.first);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn paged<S>(self, schema: S) -> Paged<S::Output>
    where
        S: Schema + 'static,
        S::Output: Send + 'static,
    {
        let pager = Pager {
            next: Some(PagingState::start(&self.paging)),
            request: self,
            schema,
        };

        stream::try_unfold(pager, Pager::next_page)
            .map_ok(|items| stream::iter(items.into_iter().map(Ok::<_, Error>)))
            .try_flatten()
            .boxed()
    }

    /// Streams the decoded elements of every page.
    pub fn paged_raw(self) -> Paged<Value> {
        self.paged(PassThrough)
    }
}
