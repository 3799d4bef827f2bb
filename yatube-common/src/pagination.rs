//! Page-number pagination over ordered listings.
//!
//! Page selection is forgiving: a missing or non-numeric page number selects
//! the first page, and a number outside `1..=num_pages` selects the last one.

use serde::Serialize;
use std::num::{IntErrorKind, NonZeroU64};

pub const POSTS_PER_PAGE: NonZeroU64 = NonZeroU64::new(10).unwrap();

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct Paginator {
    count: u64,
    per_page: NonZeroU64,
}

/// Row range of one page, ready for `LIMIT`/`OFFSET`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub per_page: u64,
}

impl Paginator {
    #[must_use]
    pub fn new(count: u64, per_page: NonZeroU64) -> Self {
        Self { count, per_page }
    }

    /// An empty listing still has one (empty) page.
    #[must_use]
    pub fn num_pages(self) -> u64 {
        self.count.div_ceil(self.per_page.get()).max(1)
    }

    /// Resolves a raw `page` query value to a valid 1-based page number.
    #[must_use]
    pub fn get_page(self, raw: Option<&str>) -> u64 {
        let Some(raw) = raw else {
            return 1;
        };

        match raw.trim().parse::<i64>() {
            Ok(number) => match u64::try_from(number) {
                Ok(number) if (1..=self.num_pages()).contains(&number) => number,
                _ => self.num_pages(),
            },
            Err(err) => match err.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => self.num_pages(),
                _ => 1,
            },
        }
    }

    #[must_use]
    pub fn window(self, number: u64) -> PageWindow {
        let per_page = self.per_page.get();

        PageWindow {
            offset: number.saturating_sub(1).saturating_mul(per_page),
            limit: per_page,
        }
    }

    #[must_use]
    pub fn page<T>(self, number: u64, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number,
            num_pages: self.num_pages(),
            count: self.count,
            per_page: self.per_page.get(),
        }
    }
}

impl<T> Page<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    #[must_use]
    pub fn next_page_number(&self) -> Option<u64> {
        self.has_next().then_some(self.number + 1)
    }

    #[must_use]
    pub fn previous_page_number(&self) -> Option<u64> {
        self.has_previous().then(|| self.number - 1)
    }

    /// 1-based index of the first item on this page, or 0 for an empty listing.
    #[must_use]
    pub fn start_index(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            (self.number - 1) * self.per_page + 1
        }
    }

    #[must_use]
    pub fn end_index(&self) -> u64 {
        if self.number == self.num_pages {
            self.count
        } else {
            self.number * self.per_page
        }
    }
}

/// Paginates an already ordered, fully loaded sequence.
#[must_use]
pub fn paginate<T>(items: Vec<T>, per_page: NonZeroU64, raw_page: Option<&str>) -> Page<T> {
    let paginator = Paginator::new(items.len() as u64, per_page);
    let number = paginator.get_page(raw_page);
    let window = paginator.window(number);

    let page_items = items
        .into_iter()
        .skip(usize::try_from(window.offset).unwrap_or(usize::MAX))
        .take(usize::try_from(window.limit).unwrap_or(usize::MAX))
        .collect();

    paginator.page(number, page_items)
}
