//! Pagination over the derived view.

use std::num::NonZeroUsize;
use std::ops::Range;

/// Default number of rows per page.
pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(20) {
    Some(size) => size,
    None => unreachable!(),
};

/// Current page (1-based) and page size.
///
/// The page number is never clamped to the data: when the view shrinks the
/// current page may point past the end and yield an empty slice. Callers use
/// [`has_next`](Self::has_next) / [`has_previous`](Self::has_previous) to
/// disable navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    size: NonZeroUsize,
    current: usize,
}

impl Default for PageState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PageState {
    pub fn new(size: NonZeroUsize) -> Self {
        Self { size, current: 1 }
    }

    pub fn size(&self) -> usize {
        self.size.get()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Go to page `page`. Page 0 does not exist and is treated as page 1.
    pub fn set(&mut self, page: usize) {
        self.current = page.max(1);
    }

    /// Row indices covered by the current page (may lie past the data).
    pub fn bounds(&self) -> Range<usize> {
        let size = self.size.get();
        let start = (self.current - 1).saturating_mul(size);
        start..start.saturating_add(size)
    }

    /// The part of `items` on the current page; empty when out of range.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let Range { start, end } = self.bounds();
        if start >= items.len() {
            return &[];
        }
        &items[start..end.min(items.len())]
    }

    pub fn has_previous(&self) -> bool {
        self.current > 1
    }

    /// True while rows exist after the current page.
    pub fn has_next(&self, total: usize) -> bool {
        self.bounds().end < total
    }

    /// Number of pages needed for `total` rows (at least 1).
    pub fn total_pages(&self, total: usize) -> usize {
        total.div_ceil(self.size.get()).max(1)
    }
}
