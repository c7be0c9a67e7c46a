//! Page-number pagination over ordered feeds.
//!
//! Page numbers arrive from query strings and are never trusted: anything that
//! is not a number resolves to the first page, and numbers outside the valid
//! range resolve to the last page. Resolution never fails.

use std::num::NonZeroU64;

use serde::Serialize;

/// Number of posts shown on every feed page.
pub const PAGE_SIZE: u64 = 10;

/// Requested page as parsed from an untrusted source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageRequest {
    #[default]
    Absent,
    Invalid,
    Number(i64),
}

impl PageRequest {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Absent;
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Invalid;
        }

        match trimmed.parse::<i64>() {
            Ok(value) => Self::Number(value),
            Err(_) => {
                let (negative, digits) = match trimmed.strip_prefix('-') {
                    Some(rest) => (true, rest),
                    None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
                };
                if !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit()) {
                    // Out of i64 range but still numeric.
                    Self::Number(if negative { i64::MIN } else { i64::MAX })
                } else {
                    Self::Invalid
                }
            }
        }
    }
}

/// Resolved position of one page inside a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    number: u64,
    total_pages: u64,
    total_items: u64,
    page_size: u64,
}

impl PageWindow {
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.page_size
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    pub fn previous_number(&self) -> Option<u64> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_number(&self) -> Option<u64> {
        self.has_next().then(|| self.number + 1)
    }

    /// Number of items this page holds once the backing sequence is sliced.
    pub fn item_count(&self) -> u64 {
        self.total_items
            .saturating_sub(self.offset())
            .min(self.page_size)
    }
}

/// One page of items plus the window it was cut from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub window: PageWindow,
}

impl<T> Page<T> {
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            window: self.window,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: NonZeroU64,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(NonZeroU64::new(PAGE_SIZE).unwrap_or(NonZeroU64::MIN))
    }
}

impl Paginator {
    pub const fn new(page_size: NonZeroU64) -> Self {
        Self { page_size }
    }

    pub fn page_size(&self) -> u64 {
        self.page_size.get()
    }

    pub fn total_pages(&self, total_items: u64) -> u64 {
        total_items.div_ceil(self.page_size.get())
    }

    /// Resolve an untrusted request against a sequence of `total_items`.
    pub fn window(&self, total_items: u64, request: PageRequest) -> PageWindow {
        let total_pages = self.total_pages(total_items);
        let last = total_pages.max(1);

        let number = match request {
            PageRequest::Absent | PageRequest::Invalid => 1,
            PageRequest::Number(value) if value < 1 => last,
            PageRequest::Number(value) => u64::try_from(value).map_or(last, |n| n.min(last)),
        };

        PageWindow {
            number,
            total_pages,
            total_items,
            page_size: self.page_size.get(),
        }
    }

    /// Slice an in-memory ordered sequence.
    pub fn paginate<T: Clone>(&self, items: &[T], request: PageRequest) -> Page<T> {
        let window = self.window(items.len() as u64, request);
        let start = usize::try_from(window.offset()).unwrap_or(usize::MAX);
        let items = items
            .iter()
            .skip(start)
            .take(self.page_size.get() as usize)
            .cloned()
            .collect();
        Page { items, window }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(len: u32) -> Vec<u32> {
        (1..=len).collect()
    }

    #[test]
    fn parse_distinguishes_absent_invalid_and_numbers() {
        assert_eq!(PageRequest::parse(None), PageRequest::Absent);
        assert_eq!(PageRequest::parse(Some("abc")), PageRequest::Invalid);
        assert_eq!(PageRequest::parse(Some("")), PageRequest::Invalid);
        assert_eq!(PageRequest::parse(Some(" 2 ")), PageRequest::Number(2));
        assert_eq!(PageRequest::parse(Some("-3")), PageRequest::Number(-3));
        assert_eq!(
            PageRequest::parse(Some("99999999999999999999999")),
            PageRequest::Number(i64::MAX)
        );
    }

    #[test]
    fn empty_sequence_has_zero_pages_and_an_empty_first_page() {
        let page = Paginator::default().paginate::<u32>(&[], PageRequest::Number(4));
        assert!(page.is_empty());
        assert_eq!(page.window.number(), 1);
        assert_eq!(page.window.total_pages(), 0);
        assert!(!page.window.has_next());
        assert!(!page.window.has_previous());
    }

    #[test]
    fn exactly_one_full_page() {
        let items = sequence(10);
        let page = Paginator::default().paginate(&items, PageRequest::Absent);
        assert_eq!(page.items, items);
        assert_eq!(page.window.total_pages(), 1);
        assert!(!page.window.has_next());
    }

    #[test]
    fn remainder_lands_on_last_partial_page() {
        let items = sequence(13);
        let paginator = Paginator::default();

        let first = paginator.paginate(&items, PageRequest::Number(1));
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.window.next_number(), Some(2));

        let second = paginator.paginate(&items, PageRequest::Number(2));
        assert_eq!(second.items, vec![11, 12, 13]);
        assert_eq!(second.window.item_count(), 3);
        assert_eq!(second.window.previous_number(), Some(1));
        assert!(!second.window.has_next());
    }

    #[test]
    fn out_of_range_requests_clamp_to_last_page() {
        let items = sequence(25);
        let paginator = Paginator::default();

        for request in [
            PageRequest::Number(99),
            PageRequest::Number(0),
            PageRequest::Number(-1),
            PageRequest::Number(i64::MAX),
        ] {
            let page = paginator.paginate(&items, request);
            assert_eq!(page.window.number(), 3, "request {request:?}");
            assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        }
    }

    #[test]
    fn non_numeric_requests_resolve_to_first_page() {
        let items = sequence(25);
        let paginator = Paginator::default();
        for raw in [None, Some("abc"), Some("1.5"), Some("")] {
            let page = paginator.paginate(&items, PageRequest::parse(raw));
            assert_eq!(page.window.number(), 1, "raw {raw:?}");
            assert_eq!(page.items.first(), Some(&1));
        }
    }

    #[test]
    fn repeated_calls_are_identical() {
        let items = sequence(37);
        let paginator = Paginator::default();
        for number in 1..=4 {
            let request = PageRequest::Number(number);
            let first = paginator.paginate(&items, request);
            let second = paginator.paginate(&items, request);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn window_offsets_follow_page_size() {
        let paginator = Paginator::new(NonZeroU64::new(4).expect("non-zero"));
        let window = paginator.window(10, PageRequest::Number(3));
        assert_eq!(window.offset(), 8);
        assert_eq!(window.limit(), 4);
        assert_eq!(window.item_count(), 2);
    }
}
