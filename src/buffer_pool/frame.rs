//! Frame-descriptor table: a passive per-slot metadata
//! record. No policy decisions live here — the clock sweep and pinning
//! discipline belong to [`super::BufferPoolManager`].

use crate::file_store::{file_key, FileHandle, FileId};
use crate::pages::{PageNumber, INVALID_PAGE};

pub(super) struct FrameDescriptor {
    file_ref: Option<FileHandle>,
    page_number: PageNumber,
    pin_count: u32,
    dirty: bool,
    refbit: bool,
    valid: bool,
}

impl FrameDescriptor {
    pub(super) fn new() -> Self {
        Self {
            file_ref: None,
            page_number: INVALID_PAGE,
            pin_count: 0,
            dirty: false,
            refbit: false,
            valid: false,
        }
    }

    pub(super) fn file_id(&self) -> Option<FileId> {
        self.file_ref.as_ref().map(file_key)
    }

    pub(super) fn file_ref(&self) -> Option<&FileHandle> {
        self.file_ref.as_ref()
    }

    pub(super) fn page_number(&self) -> PageNumber {
        self.page_number
    }

    pub(super) fn pin_count(&self) -> u32 {
        self.pin_count
    }

    pub(super) fn dirty(&self) -> bool {
        self.dirty
    }

    pub(super) fn refbit(&self) -> bool {
        self.refbit
    }

    pub(super) fn valid(&self) -> bool {
        self.valid
    }

    pub(super) fn set_refbit(&mut self, value: bool) {
        self.refbit = value;
    }

    pub(super) fn pin(&mut self) {
        self.pin_count += 1;
    }

    pub(super) fn unpin(&mut self) {
        self.pin_count -= 1;
    }

    pub(super) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(super) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Marks this descriptor valid with the given identity. Initializes
    /// `pin_count = 1`, `dirty = false`, `refbit = true`.
    pub(super) fn set(&mut self, file: FileHandle, page_number: PageNumber) {
        self.file_ref = Some(file);
        self.page_number = page_number;
        self.pin_count = 1;
        self.dirty = false;
        self.refbit = true;
        self.valid = true;
    }

    /// Marks this descriptor invalid and zeros all metadata fields.
    pub(super) fn clear(&mut self) {
        self.file_ref = None;
        self.page_number = INVALID_PAGE;
        self.pin_count = 0;
        self.dirty = false;
        self.refbit = false;
        self.valid = false;
    }
}

impl std::fmt::Debug for FrameDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.valid {
            return write!(f, "<empty>");
        }
        let filename = self
            .file_ref
            .as_ref()
            .map(|file| file.borrow().filename().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        write!(
            f,
            "file={} page={} pin={} dirty={} refbit={}",
            filename, self.page_number, self.pin_count, self.dirty, self.refbit
        )
    }
}
