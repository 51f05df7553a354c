//! Page slicing for both pipelines.
//!
//! The local pipeline uses numbered pages over a fully ranked list. The remote
//! pipeline reveals the accumulation buffer a page at a time as the reader
//! scrolls, without ever re-reading what is already shown.

/// Results per page in both pipelines.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Numbered, 1-based pages over a ranked list.
///
/// `page` does not validate the page number; out-of-range numbers yield an
/// empty slice. Callers keep requests within `1..=total_pages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator {
    /// A zero page size is bumped to 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_pages(&self, len: usize) -> usize {
        len.div_ceil(self.page_size)
    }

    pub fn page<'a, T>(&self, items: &'a [T], page: usize) -> &'a [T] {
        let Some(index) = page.checked_sub(1) else {
            return &[];
        };
        let start = index.saturating_mul(self.page_size).min(items.len());
        let end = start.saturating_add(self.page_size).min(items.len());
        &items[start..end]
    }
}

/// Next slice of up to `page_size` items starting at `displayed_count`,
/// plus the new displayed count.
pub fn reveal<T>(buffer: &[T], displayed_count: usize, page_size: usize) -> (&[T], usize) {
    let start = displayed_count.min(buffer.len());
    let end = start.saturating_add(page_size.max(1)).min(buffer.len());
    (&buffer[start..end], end)
}

/// Reveal state for a buffer that may still be growing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RevealCursor {
    pub displayed_count: usize,
    pub stream_complete: bool,
}

impl RevealCursor {
    /// False only once everything is shown and the stream has finished. An
    /// exhausted buffer that is still streaming keeps reveals eligible.
    pub fn has_more(&self, buffer_len: usize) -> bool {
        !(self.displayed_count >= buffer_len && self.stream_complete)
    }

    /// Whether a reveal right now would produce items.
    pub fn can_reveal(&self, buffer_len: usize) -> bool {
        buffer_len > self.displayed_count
    }

    pub fn advance<'a, T>(&mut self, buffer: &'a [T], page_size: usize) -> &'a [T] {
        let (items, displayed) = reveal(buffer, self.displayed_count, page_size);
        self.displayed_count = displayed;
        items
    }
}
