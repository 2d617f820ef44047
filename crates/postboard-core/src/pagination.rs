//! Page-number pagination over ordered collections.
//!
//! A request carries the raw `page` query parameter. It is resolved against
//! the collection size before anything is fetched:
//!
//! - absent or not an integer: page 1
//! - past the last page, or below 1: the last page
//! - an empty collection still has one (empty) page

use serde::Serialize;

/// Default number of posts shown per feed page.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// A page-number request as received from the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    requested: Option<i64>,
    per_page: u64,
}

/// Offset/limit window for a resolved page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub offset: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page_param: Option<&str>, per_page: u64) -> Self {
        Self {
            requested: page_param.and_then(|p| p.trim().parse::<i64>().ok()),
            per_page: per_page.max(1),
        }
    }

    pub fn first(per_page: u64) -> Self {
        Self::new(None, per_page)
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Resolve the requested page number against `total` items.
    pub fn resolve(&self, total: u64) -> PageWindow {
        let num_pages = total.div_ceil(self.per_page).max(1);

        let number = match self.requested {
            None => 1,
            Some(n) if n < 1 => num_pages,
            Some(n) => (n as u64).min(num_pages),
        };

        PageWindow {
            number,
            num_pages,
            offset: (number - 1) * self.per_page,
            limit: self.per_page,
        }
    }
}

/// One page of an ordered collection.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total_count: u64,
    pub per_page: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
    /// 1-based index of the first item on this page, 0 when empty.
    pub start_index: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow, total_count: u64) -> Self {
        let has_next = window.number < window.num_pages;
        let has_previous = window.number > 1;
        Self {
            start_index: if total_count == 0 { 0 } else { window.offset + 1 },
            items,
            number: window.number,
            num_pages: window.num_pages,
            total_count,
            per_page: window.limit,
            has_next,
            has_previous,
            next_page_number: has_next.then(|| window.number + 1),
            previous_page_number: has_previous.then(|| window.number - 1),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            total_count: self.total_count,
            per_page: self.per_page,
            has_next: self.has_next,
            has_previous: self.has_previous,
            next_page_number: self.next_page_number,
            previous_page_number: self.previous_page_number,
            start_index: self.start_index,
        }
    }
}

/// Slice an in-memory ordered collection. Repositories backed by a database
/// resolve the window themselves and push offset/limit into the query.
pub fn paginate<T: Clone>(items: &[T], request: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let window = request.resolve(total);
    let slice = items
        .iter()
        .skip(window.offset as usize)
        .take(window.limit as usize)
        .cloned()
        .collect();
    Page::new(slice, window, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(n: u32) -> Vec<u32> {
        (1..=n).collect()
    }

    #[test]
    fn test_thirteen_items_split_ten_and_three() {
        let items = numbers(13);

        let first = paginate(&items, PageRequest::new(None, 10));
        assert_eq!(first.len(), 10);
        assert!(first.has_next);
        assert_eq!(first.next_page_number, Some(2));

        let second = paginate(&items, PageRequest::new(Some("2"), 10));
        assert_eq!(second.len(), 3);
        assert!(!second.has_next);
        assert!(second.has_previous);
        assert_eq!(second.items, vec![11, 12, 13]);
        assert_eq!(second.start_index, 11);
    }

    #[test]
    fn test_invalid_page_falls_back_to_first() {
        let page = paginate(&numbers(13), PageRequest::new(Some("abc"), 10));
        assert_eq!(page.number, 1);
        assert_eq!(page.items[0], 1);
    }

    #[test]
    fn test_out_of_range_page_is_last() {
        let request = PageRequest::new(Some("99"), 10);
        assert_eq!(request.resolve(13).number, 2);

        let request = PageRequest::new(Some("0"), 10);
        assert_eq!(request.resolve(13).number, 2);
    }

    #[test]
    fn test_empty_collection_has_one_empty_page() {
        let page = paginate::<u32>(&[], PageRequest::new(Some("3"), 10));
        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
        assert!(page.is_empty());
        assert_eq!(page.start_index, 0);
        assert!(!page.has_next);
        assert!(!page.has_previous);
    }

    #[test]
    fn test_page_fewer_than_page_size() {
        let page = paginate(&numbers(4), PageRequest::first(DEFAULT_PAGE_SIZE));
        assert_eq!(page.len(), 4);
        assert_eq!(page.total_count, 4);
    }
}
