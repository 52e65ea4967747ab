//! The buffer pool's view of "a file of pages". The buffer pool never
//! owns a file; callers construct one, wrap it, and hand the manager a
//! [`FileHandle`] each call.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;

use crate::pages::{Page, PageNumber};

/// Operations the buffer pool manager consumes from a file.
///
/// Implementors decide what "a page doesn't exist" means for
/// `read_page`; the manager only requires that the error propagate
/// unchanged (see [`crate::errors::Error::InvalidPage`]).
pub trait PagedFile {
    /// Used only for error reporting and diagnostics; never used as an
    /// identity key (two distinct files could share a display name).
    fn filename(&self) -> &str;

    fn allocate_page(&mut self) -> Result<Page>;
    fn read_page(&mut self, page_number: PageNumber) -> Result<Page>;
    fn write_page(&mut self, page: &Page) -> Result<()>;
    fn delete_page(&mut self, page_number: PageNumber) -> Result<()>;
}

/// A shared, non-owning handle to a file. `Rc`/`RefCell` rather than
/// `Arc`/`Mutex` because the buffer pool is single-threaded and
/// non-reentrant by design; the manager clones this handle into a frame
/// descriptor while one of the file's pages is resident, which is how
/// eviction can write a victim back to a file other than the one the
/// caller is currently working with.
pub type FileHandle = Rc<RefCell<dyn PagedFile>>;

/// Opaque per-file identity used as part of the frame-identity index key.
/// Derived from the handle's data pointer: two clones of the same `Rc`
/// produce the same id, two distinct files never collide.
pub type FileId = usize;

pub fn file_key(file: &FileHandle) -> FileId {
    Rc::as_ptr(file) as *const () as FileId
}

/// Wrap a concrete [`PagedFile`] implementation as a shareable handle.
pub fn handle<F: PagedFile + 'static>(file: F) -> FileHandle {
    Rc::new(RefCell::new(file))
}
