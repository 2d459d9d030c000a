//! Cursor-pagination primitive over a single remote collection.
//!
//! Knows nothing about logs, IPs, or providers. Cursor tokens are opaque;
//! equality between the cursor used for a fetch and the one returned is the
//! provider's authoritative "no more data" signal and is honored even when
//! the page carried items. Domain-specific stop policies (volume caps,
//! retained-line limits) are layered by callers on top of these mechanics.

use std::future::Future;

/// One page of a cursor-paginated collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Decides whether a returned cursor makes progress over the one just used.
///
/// Returns the cursor for the next fetch, or `None` when the collection is
/// exhausted (cursor absent, or identical to the one the page was fetched
/// with).
pub fn advance(used: Option<&str>, returned: Option<&str>) -> Option<String> {
    match returned {
        Some(next) if used != Some(next) => Some(next.to_string()),
        _ => None,
    }
}

/// Drains a paginated collection to completion under the mechanical cursor
/// semantics alone: stop on an empty page, an absent cursor, or a repeated
/// cursor. A fetch failure aborts this drain only and propagates unchanged.
pub async fn drain_pages<T, E, F, Fut>(mut fetch: F) -> Result<Vec<T>, E>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = fetch(cursor.clone()).await?;
        let exhausted = page.is_empty();
        let next = advance(cursor.as_deref(), page.next_cursor.as_deref());
        items.extend(page.items);

        match next {
            Some(token) if !exhausted => cursor = Some(token),
            _ => return Ok(items),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn page(items: &[u32], next: Option<&str>) -> Page<u32> {
        Page::new(items.to_vec(), next.map(str::to_string))
    }

    #[test]
    fn advance_detects_repeated_cursor() {
        assert_eq!(advance(Some("tok1"), Some("tok1")), None);
        assert_eq!(advance(Some("tok1"), Some("tok2")), Some("tok2".to_string()));
        assert_eq!(advance(None, Some("tok1")), Some("tok1".to_string()));
        assert_eq!(advance(Some("tok1"), None), None);
        assert_eq!(advance(None, None), None);
    }

    #[tokio::test]
    async fn drain_stops_on_absent_cursor() {
        let pages = vec![page(&[1, 2], Some("a")), page(&[3], None)];
        let mut calls = pages.into_iter();
        let items: Vec<u32> = drain_pages(|_| {
            let next = calls.next().expect("fetched past termination");
            async move { Ok::<_, Infallible>(next) }
        })
        .await
        .unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn drain_stops_on_repeated_cursor_even_with_items() {
        let pages = vec![page(&[1], Some("a")), page(&[2], Some("a"))];
        let mut calls = pages.into_iter();
        let items: Vec<u32> = drain_pages(|_| {
            let next = calls.next().expect("fetched past termination");
            async move { Ok::<_, Infallible>(next) }
        })
        .await
        .unwrap();
        assert_eq!(items, vec![1, 2]);
    }

    #[tokio::test]
    async fn drain_stops_on_empty_page() {
        let pages = vec![page(&[1], Some("a")), page(&[], Some("b"))];
        let mut calls = pages.into_iter();
        let items: Vec<u32> = drain_pages(|_| {
            let next = calls.next().expect("fetched past termination");
            async move { Ok::<_, Infallible>(next) }
        })
        .await
        .unwrap();
        assert_eq!(items, vec![1]);
    }

    #[tokio::test]
    async fn drain_propagates_fetch_errors() {
        let result: Result<Vec<u32>, &str> = drain_pages(|_| async { Err("boom") }).await;
        assert_eq!(result.unwrap_err(), "boom");
    }
}
