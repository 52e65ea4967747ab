//! The unit of residency the buffer pool manages: a fixed-size block of
//! bytes carrying its own page number. Dirty/pin/reference-bit state
//! belongs to the frame descriptor that governs this page while it's
//! resident, not to the page itself.

pub const PAGE_SIZE: usize = 4096; // 4 KBs
pub const INVALID_PAGE: PageNumber = -1;

pub type PageNumber = i64;

/// A generic page with an underlying array of [`PAGE_SIZE`] bytes.
#[derive(Debug, Clone)]
pub struct Page {
    data: [u8; PAGE_SIZE],
    page_number: PageNumber,
}

impl Default for Page {
    fn default() -> Self {
        Page::new()
    }
}

impl Page {
    pub fn new() -> Self {
        Page {
            data: [0u8; PAGE_SIZE],
            page_number: INVALID_PAGE,
        }
    }

    pub fn with_number(page_number: PageNumber) -> Self {
        let mut page = Page::new();
        page.page_number = page_number;
        page
    }

    pub fn from_bytes(page_number: PageNumber, bytes: &[u8]) -> Self {
        assert_eq!(bytes.len(), PAGE_SIZE);
        let mut page = Page::with_number(page_number);
        page.data.copy_from_slice(bytes);
        page
    }

    pub fn page_number(&self) -> PageNumber {
        self.page_number
    }

    pub fn set_page_number(&mut self, page_number: PageNumber) {
        self.page_number = page_number;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn read_bytes(&self, start: usize, end: usize) -> &[u8] {
        &self.data[start..end]
    }

    pub fn write_bytes(&mut self, start: usize, end: usize, bytes: &[u8]) {
        self.data[start..end].copy_from_slice(bytes);
    }
}
