//! Dual-mode pagination: legacy `page`/`pageSize` and Relay `first`/`after`/`last`/`before`
//!
//! Both argument styles resolve to the same offset/limit [`Window`]. The
//! resulting [`Connection`] always carries both the legacy `{data, pagination}`
//! shape and the Relay `{edges, pageInfo}` shape, so existing consumers of
//! either keep working.

use std::future::Future;

use async_graphql::{Object, OutputType, SimpleObject};
use base64::{
    engine::general_purpose::{STANDARD as BASE64, STANDARD_NO_PAD},
    Engine as _,
};

/// Page size used when the caller supplies none.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Raw pagination arguments as received from a query field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationArgs {
    pub page: Option<i32>,
    pub page_size: Option<i32>,
    pub first: Option<i32>,
    pub after: Option<String>,
    pub last: Option<i32>,
    pub before: Option<String>,
    /// A Relay argument was sent as an explicit `null`.
    pub relay_requested: bool,
}

/// Resolved slice bounds sent to the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub limit: u64,
}

/// Which argument style produced a [`Window`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationMode {
    Legacy { page: u64, page_size: u64 },
    Relay,
}

/// One slice of an ordered collection plus the collection's total size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl PaginationArgs {
    /// Any Relay argument that was sent, even `0` or `null`, switches to Relay mode.
    pub fn is_relay(&self) -> bool {
        self.relay_requested
            || self.first.is_some() || self.after.is_some() || self.last.is_some() || self.before.is_some()
    }

    /// Derive the offset/limit window.
    ///
    /// In Relay mode `after` takes precedence: `before` is only consulted
    /// when no `after` cursor was given.
    pub fn window(&self) -> (Window, PaginationMode) {
        if self.is_relay() {
            let limit = self
                .first
                .or(self.last)
                .map(clamp_positive)
                .unwrap_or(DEFAULT_PAGE_SIZE);

            let offset = if let Some(after) = &self.after {
                CursorCodec::decode(after).saturating_add(1)
            } else if let Some(before) = &self.before {
                CursorCodec::decode(before).saturating_sub(limit)
            } else {
                0
            };

            return (Window { offset, limit }, PaginationMode::Relay);
        }

        let page = self.page.map(clamp_positive).unwrap_or(1);
        let page_size = self
            .page_size
            .map(clamp_positive)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        (
            Window {
                offset: (page - 1).saturating_mul(page_size),
                limit: page_size,
            },
            PaginationMode::Legacy { page, page_size },
        )
    }
}

fn clamp_positive(value: i32) -> u64 {
    u64::try_from(value).unwrap_or(0).max(1)
}

/// Cursor encoding/decoding
///
/// A cursor is the standard base64 encoding of a zero-based decimal offset.
pub struct CursorCodec;

impl CursorCodec {
    /// Encode an offset as an opaque cursor
    pub fn encode(offset: u64) -> String {
        BASE64.encode(offset.to_string())
    }

    /// Decode a cursor back to its offset.
    ///
    /// Padding is optional. Malformed input (bad base64, non-UTF-8, anything
    /// but a complete decimal number) decodes to `0`; a numeric prefix such
    /// as `"12abc"` is not salvaged.
    pub fn decode(cursor: &str) -> u64 {
        BASE64
            .decode(cursor.as_bytes())
            .or_else(|_| STANDARD_NO_PAD.decode(cursor.as_bytes()))
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .and_then(|text| text.parse::<u64>().ok())
            .unwrap_or(0)
    }
}

/// Page information
#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// Legacy page-number summary
#[derive(SimpleObject, Debug, Clone, Copy, PartialEq, Eq)]
#[graphql(name = "Pagination")]
pub struct PaginationMeta {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
}

/// Edge in a connection
#[derive(Debug, Clone)]
pub struct Edge<T> {
    pub cursor: String,
    pub node: T,
}

#[Object]
impl<T: OutputType> Edge<T> {
    async fn cursor(&self) -> &str {
        &self.cursor
    }

    async fn node(&self) -> &T {
        &self.node
    }
}

/// Paginated result carrying both the legacy and the Relay shape
#[derive(Debug, Clone)]
pub struct Connection<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

pub type PaginationResult<T> = Connection<T>;

#[Object]
impl<T: OutputType> Connection<T> {
    async fn data(&self) -> &[T] {
        &self.data
    }

    async fn pagination(&self) -> &PaginationMeta {
        &self.pagination
    }

    async fn edges(&self) -> &[Edge<T>] {
        &self.edges
    }

    async fn page_info(&self) -> &PageInfo {
        &self.page_info
    }
}

impl<T: Clone> Connection<T> {
    /// Assemble a connection from a fetched page.
    pub fn from_page(window: Window, mode: PaginationMode, page: Page<T>) -> Self {
        let Window { offset, limit } = window;

        let edges: Vec<Edge<T>> = page
            .items
            .iter()
            .cloned()
            .zip(offset..)
            .map(|(node, position)| Edge {
                cursor: CursorCodec::encode(position),
                node,
            })
            .collect();

        let start_cursor = edges.first().map(|e| e.cursor.clone());
        let end_cursor = edges.last().map(|e| e.cursor.clone());

        let (page_number, page_size) = match mode {
            PaginationMode::Legacy { page, page_size } => (page, page_size),
            PaginationMode::Relay => (offset / limit + 1, limit),
        };

        Self {
            data: page.items,
            pagination: PaginationMeta {
                page: page_number,
                page_size,
                total: page.total,
            },
            edges,
            page_info: PageInfo {
                has_next_page: offset.saturating_add(limit) < page.total,
                has_previous_page: offset > 0,
                start_cursor,
                end_cursor,
            },
        }
    }
}

/// Resolve `args` to a window, fetch it once and assemble the connection.
///
/// The only error this returns is the one produced by `fetch`.
pub async fn paginate<T, E, F, Fut>(args: &PaginationArgs, fetch: F) -> Result<Connection<T>, E>
where
    T: Clone,
    F: FnOnce(Window) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    let (window, mode) = args.window();
    tracing::debug!(
        offset = window.offset,
        limit = window.limit,
        relay = matches!(mode, PaginationMode::Relay),
        "resolving pagination window"
    );

    let page = fetch(window).await?;
    Ok(Connection::from_page(window, mode, page))
}
