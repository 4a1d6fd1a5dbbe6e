//! Cursor-paginated remote listings as a lazy, single-pass sequence.
//!
//! A [`PageSource`] knows how to fetch one page for a cursor. A [`PageStream`]
//! drives it: each call to [`PageStream::next`] yields one item, fetching the
//! next page only once the buffered one is drained. The first fetch error is
//! yielded as the terminal element; after it the stream is finished and
//! never fetches again. A page that hands back the cursor it was fetched
//! with is treated as a malformed response rather than looped on. Dropping the stream stops the listing; no page beyond
//! the current one is ever requested.

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::ServiceError;

/// Page size used for every listing.
pub const PAGE_SIZE: u32 = 100;

/// Opaque continuation token returned by the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(String);

impl Cursor {
    /// Wraps a raw cursor string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the cursor as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Parameters for fetching a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum number of items to return.
    pub first: u32,
    /// Resume after this cursor; `None` for the first page.
    pub after: Option<Cursor>,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page, in listing order.
    pub items: Vec<T>,
    /// Cursor of the next page; `None` when this is the last one.
    pub next: Option<Cursor>,
}

impl<T> Page<T> {
    /// A final page holding `items`.
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// A remote listing operation parameterized by page size and cursor.
#[async_trait]
pub trait PageSource<T>: Send {
    /// Fetches one page.
    async fn fetch(&mut self, request: PageRequest) -> Result<Page<T>, ServiceError>;
}

#[derive(Debug)]
enum Position {
    Start,
    After(Cursor),
    Finished,
}

/// Lazy, singly-consumable sequence over a [`PageSource`].
pub struct PageStream<'a, T> {
    source: Box<dyn PageSource<T> + 'a>,
    buffered: VecDeque<T>,
    position: Position,
    page_size: u32,
}

impl<'a, T: Send> PageStream<'a, T> {
    /// Creates a stream positioned before the first page.
    pub fn new(source: impl PageSource<T> + 'a) -> Self {
        Self::with_page_size(source, PAGE_SIZE)
    }

    /// Creates a stream that requests `page_size` items per page.
    pub fn with_page_size(source: impl PageSource<T> + 'a, page_size: u32) -> Self {
        Self {
            source: Box::new(source),
            buffered: VecDeque::new(),
            position: Position::Start,
            page_size,
        }
    }

    /// Yields the next item, the terminal fetch error, or `None` when done.
    pub async fn next(&mut self) -> Option<Result<T, ServiceError>> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Some(Ok(item));
            }

            let after = match std::mem::replace(&mut self.position, Position::Finished) {
                Position::Finished => return None,
                Position::Start => None,
                Position::After(cursor) => Some(cursor),
            };

            let request = PageRequest {
                first: self.page_size,
                after,
            };
            let previous = request.after.clone();
            match self.source.fetch(request).await {
                Ok(page) => {
                    if page.next.is_some() && page.next == previous {
                        return Some(Err(ServiceError::transport(
                            "malformed response: page cursor did not advance",
                        )));
                    }
                    self.buffered.extend(page.items);
                    if let Some(cursor) = page.next {
                        self.position = Position::After(cursor);
                    }
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }

    /// Drains the stream, failing on the first fetch error.
    pub async fn try_collect(mut self) -> Result<Vec<T>, ServiceError> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item?);
        }
        Ok(items)
    }
}

impl<T: Send + 'static> PageStream<'static, T> {
    /// A stream over pre-built pages; each page is "fetched" in order.
    ///
    /// Used by in-memory service implementations.
    pub fn from_pages(pages: Vec<Result<Page<T>, ServiceError>>) -> Self {
        Self::new(StaticPages {
            pages: pages.into(),
        })
    }
}

/// Page source replaying a fixed list of page results.
///
/// Cursors are ignored; the page order is the list order. A page whose
/// `next` is `None` ends the listing even if more pages remain.
pub struct StaticPages<T> {
    pages: VecDeque<Result<Page<T>, ServiceError>>,
}

#[async_trait]
impl<T: Send> PageSource<T> for StaticPages<T> {
    async fn fetch(&mut self, _request: PageRequest) -> Result<Page<T>, ServiceError> {
        self.pages.pop_front().unwrap_or_else(|| Ok(Page::last(Vec::new())))
    }
}
