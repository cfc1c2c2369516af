//! Page-number pagination.
//!
//! APIs in this style accept `page` (1-indexed) and `per_page` query
//! parameters and return a plain array. A page shorter than `per_page`
//! is the last page, so a complete walk never needs a trailing empty
//! request.

use std::future::Future;

use futures::{Stream, TryStreamExt as _};
use serde::Serialize;

/// The largest page size the supported APIs accept.
pub const MAX_PER_PAGE: usize = 100;

/// Position of a single page request, serializable as query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    /// 1-indexed page number.
    pub page: usize,

    /// Number of items requested per page.
    pub per_page: usize,
}

impl Page {
    /// The first page of a walk.
    pub fn first(per_page: usize) -> Self {
        Self { page: 1, per_page }
    }

    fn next(self) -> Self {
        Self {
            page: self.page + 1,
            per_page: self.per_page,
        }
    }
}

/// Walk pages in order, yielding each non-empty page.
///
/// The walk ends after an empty page, or after a page holding fewer than
/// `per_page` items. Errors from `fetch` end the stream and are yielded
/// unchanged. Nothing is retried.
pub fn pages<T, E, F, Fut>(per_page: usize, fetch: F) -> impl Stream<Item = Result<Vec<T>, E>>
where
    F: FnMut(Page) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    futures::stream::try_unfold(
        (fetch, Some(Page::first(per_page))),
        |(mut fetch, next)| async move {
            let Some(page) = next else {
                return Ok(None);
            };

            let items = fetch(page).await?;
            tracing::trace!(page = page.page, items = items.len(), "Fetched page");

            if items.is_empty() {
                return Ok(None);
            }

            let next = (items.len() >= page.per_page).then(|| page.next());
            Ok::<_, E>(Some((items, (fetch, next))))
        },
    )
}

/// Fetch every page and concatenate the items in page order.
pub async fn fetch_all<T, E, F, Fut>(per_page: usize, fetch: F) -> Result<Vec<T>, E>
where
    F: FnMut(Page) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    pages(per_page, fetch).try_concat().await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn sized_pages(sizes: &'static [usize]) -> impl Fn(Page) -> Vec<usize> {
        move |page: Page| {
            let len = sizes.get(page.page - 1).copied().unwrap_or(0);
            let offset: usize = sizes.iter().take(page.page - 1).sum();
            (offset..offset + len).collect()
        }
    }

    #[tokio::test]
    async fn short_page_ends_walk() {
        let calls = AtomicUsize::new(0);
        let source = sized_pages(&[100, 100, 100, 40, 100]);

        let items = fetch_all(MAX_PER_PAGE, |page| {
            calls.fetch_add(1, Ordering::SeqCst);
            let items = source(page);
            async move { Ok::<_, std::convert::Infallible>(items) }
        })
        .await
        .unwrap();

        assert_eq!(items.len(), 340);
        assert_eq!(items, (0..340).collect::<Vec<_>>());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn full_last_page_needs_empty_page() {
        let calls = AtomicUsize::new(0);
        let source = sized_pages(&[100, 100]);

        let items = fetch_all(MAX_PER_PAGE, |page| {
            calls.fetch_add(1, Ordering::SeqCst);
            let items = source(page);
            async move { Ok::<_, std::convert::Infallible>(items) }
        })
        .await
        .unwrap();

        assert_eq!(items.len(), 200);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_first_page() {
        let calls = AtomicUsize::new(0);
        let items: Vec<u8> = fetch_all(MAX_PER_PAGE, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, std::convert::Infallible>(Vec::new()) }
        })
        .await
        .unwrap();

        assert!(items.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pages_are_requested_in_order() {
        let seen = std::sync::Mutex::new(Vec::new());
        let source = sized_pages(&[2, 2, 1]);

        let _ = fetch_all(2, |page| {
            seen.lock().unwrap().push(page);
            let items = source(page);
            async move { Ok::<_, std::convert::Infallible>(items) }
        })
        .await;

        let seen = seen.into_inner().unwrap();
        assert_eq!(
            seen,
            vec![
                Page { page: 1, per_page: 2 },
                Page { page: 2, per_page: 2 },
                Page { page: 3, per_page: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn errors_stop_the_walk() {
        let calls = AtomicUsize::new(0);

        let result: Result<Vec<usize>, String> = fetch_all(MAX_PER_PAGE, |page| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if page.page == 2 {
                    Err("boom".to_owned())
                } else {
                    Ok((0..100).collect())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap_err(), "boom");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn page_serializes_as_query() {
        let query = serde_urlencoded::to_string(Page::first(MAX_PER_PAGE)).unwrap();
        assert_eq!(query, "page=1&per_page=100");
    }
}
