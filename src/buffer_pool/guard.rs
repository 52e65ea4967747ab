//! RAII sugar over the explicit pin/unpin API.
//! Additive: every operation here is expressible with
//! `BufferPoolManager::read_page`/`unpin_page` directly, and both styles
//! can be mixed over the same pool.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;

use crate::file_store::FileHandle;
use crate::pages::{Page, PageNumber};

use super::{BufferPoolManager, PageRef};

/// Shared handle to a pool, so a [`PageGuard`] can call back into it on
/// drop without the caller juggling a borrow across the guard's
/// lifetime.
pub type SharedBufferPool = Rc<RefCell<BufferPoolManager>>;

pub fn shared(num_frames: usize) -> SharedBufferPool {
    Rc::new(RefCell::new(BufferPoolManager::new(num_frames)))
}

/// Holds one pin on `page_number` for as long as it's alive. `unpin_page`
/// is called exactly once, on drop, with whatever dirty state was
/// recorded via [`PageGuard::mark_dirty`].
pub struct PageGuard {
    pool: SharedBufferPool,
    file: FileHandle,
    page_number: PageNumber,
    page: PageRef,
    dirty: bool,
}

impl PageGuard {
    pub fn page(&self) -> &PageRef {
        &self.page
    }

    pub fn page_number(&self) -> PageNumber {
        self.page_number
    }

    /// Marks this guard's page dirty; the bit is passed to `unpin_page`
    /// on drop. Does not write anything itself.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn with(&self, f: impl FnOnce(&Page)) {
        f(&self.page.borrow());
    }

    pub fn with_mut(&mut self, f: impl FnOnce(&mut Page)) {
        f(&mut self.page.borrow_mut());
        self.dirty = true;
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        let _ = self
            .pool
            .borrow_mut()
            .unpin_page(&self.file, self.page_number, self.dirty);
    }
}

/// Reads `page_number` through `pool` and wraps the pin in a guard.
pub fn read_page_guarded(
    pool: &SharedBufferPool,
    file: &FileHandle,
    page_number: PageNumber,
) -> Result<PageGuard> {
    let page = pool.borrow_mut().read_page(file, page_number)?;
    Ok(PageGuard {
        pool: pool.clone(),
        file: file.clone(),
        page_number,
        page,
        dirty: false,
    })
}

/// Allocates a fresh page through `pool` and wraps the pin in a guard.
pub fn allocate_page_guarded(pool: &SharedBufferPool, file: &FileHandle) -> Result<PageGuard> {
    let (page_number, page) = pool.borrow_mut().allocate_page(file)?;
    Ok(PageGuard {
        pool: pool.clone(),
        file: file.clone(),
        page_number,
        page,
        dirty: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk_manager::{test_path, DiskManager};
    use crate::file_store::handle;

    #[test]
    fn guard_unpins_on_drop() -> Result<()> {
        let path = test_path();
        let disk = DiskManager::new(&path)?;
        let file = handle(disk);
        let pool = shared(3);

        let page_number = {
            let guard = allocate_page_guarded(&pool, &file)?;
            guard.page_number()
        };

        assert_eq!(pool.borrow().pin_count(&file, page_number), Some(0));

        std::fs::remove_dir_all(path)?;
        Ok(())
    }

    #[test]
    fn guard_marks_dirty_and_persists() -> Result<()> {
        let path = test_path();
        let disk = DiskManager::new(&path)?;
        let file = handle(disk);
        let pool = shared(3);

        let page_number = {
            let mut guard = allocate_page_guarded(&pool, &file)?;
            guard.with_mut(|page| page.write_bytes(0, 4, &[5, 6, 7, 8]));
            guard.page_number()
        };

        pool.borrow_mut().flush_file(&file)?;

        let reread = pool.borrow_mut().read_page(&file, page_number)?;
        assert_eq!(reread.borrow().read_bytes(0, 4), &[5, 6, 7, 8]);
        pool.borrow_mut().unpin_page(&file, page_number, false)?;

        std::fs::remove_dir_all(path)?;
        Ok(())
    }
}
