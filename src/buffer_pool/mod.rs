//! Buffer Pool Manager: owns the frame array, the
//! descriptor table, the frame-identity index and the clock hand. Runs
//! the clock replacement algorithm internally; exposes `read_page`,
//! `unpin_page`, `allocate_page`, `flush_file`, `dispose_page` and
//! `print_self` to clients.

mod frame;
mod index;
pub mod guard;

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{anyhow, bail, ensure, Result};

use crate::errors::Error;
use crate::file_store::{file_key, FileHandle};
use crate::pages::{Page, PageNumber};
use crate::printdbg;

use frame::FrameDescriptor;
use index::FrameIndex;

pub(crate) type FrameId = usize;

/// A resident page, shared with the caller. Valid only while the caller
/// still holds the pin obtained from whichever call produced it — after
/// `unpin_page`, a later operation may evict the frame and the bytes
/// behind this handle become someone else's page.
pub type PageRef = Rc<RefCell<Page>>;

pub struct BufferPoolManager {
    descriptors: Vec<FrameDescriptor>,
    frames: Vec<PageRef>,
    index: FrameIndex,
    clock_hand: FrameId,
}

impl BufferPoolManager {
    /// Constructs a pool of `num_frames` frames, all initially invalid,
    /// with the clock hand positioned so the first advance lands on
    /// frame 0.
    pub fn new(num_frames: usize) -> Self {
        assert!(num_frames > 0, "a buffer pool needs at least one frame");

        Self {
            descriptors: (0..num_frames).map(|_| FrameDescriptor::new()).collect(),
            frames: (0..num_frames)
                .map(|_| Rc::new(RefCell::new(Page::new())))
                .collect(),
            index: FrameIndex::with_frame_count(num_frames),
            clock_hand: num_frames - 1,
        }
    }

    pub fn size(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns a stable reference to the in-pool copy of `page_number`,
    /// recording the caller as an additional pinner.
    pub fn read_page(&mut self, file: &FileHandle, page_number: PageNumber) -> Result<PageRef> {
        let target = file_key(file);

        if let Ok(frame_id) = self.index.lookup(target, page_number) {
            self.descriptors[frame_id].set_refbit(true);
            self.descriptors[frame_id].pin();
            printdbg!("read_page: hit on page {page_number} (frame {frame_id})");
            return Ok(self.frames[frame_id].clone());
        }

        // Read before allocating, so a failing read leaves pool state
        // untouched: no index entry, no frame spent.
        let page = file.borrow_mut().read_page(page_number)?;

        let frame_id = self.allocate_frame()?;
        *self.frames[frame_id].borrow_mut() = page;
        self.index.insert(target, page_number, frame_id)?;
        self.descriptors[frame_id].set(file.clone(), page_number);

        printdbg!("read_page: miss on page {page_number}, installed in frame {frame_id}");
        Ok(self.frames[frame_id].clone())
    }

    /// Decrements the pin count of `page_number`. If `dirty` is set, it
    /// is OR'd into the descriptor's dirty bit — dirty is never cleared
    /// here. Does not touch the reference bit; that's
    /// the clock sweep's job alone.
    pub fn unpin_page(
        &mut self,
        file: &FileHandle,
        page_number: PageNumber,
        dirty: bool,
    ) -> Result<()> {
        let frame_id = self.index.lookup(file_key(file), page_number)?;
        let descriptor = &mut self.descriptors[frame_id];

        if descriptor.pin_count() == 0 {
            bail!(Error::PageNotPinned(
                file.borrow().filename().to_string(),
                page_number,
                frame_id
            ));
        }
        descriptor.unpin();
        if dirty {
            descriptor.mark_dirty();
        }

        printdbg!(
            "unpin_page: page {page_number} (frame {frame_id}) pin_count now {}",
            descriptor.pin_count()
        );
        Ok(())
    }

    /// Obtains a fresh page number from `file` and installs it into a
    /// frame with `pin_count = 1`.
    pub fn allocate_page(&mut self, file: &FileHandle) -> Result<(PageNumber, PageRef)> {
        let page = file.borrow_mut().allocate_page()?;
        let page_number = page.page_number();

        let frame_id = self.allocate_frame()?;
        *self.frames[frame_id].borrow_mut() = page;
        self.index.insert(file_key(file), page_number, frame_id)?;
        self.descriptors[frame_id].set(file.clone(), page_number);

        printdbg!("allocate_page: page {page_number} installed in frame {frame_id}");
        Ok((page_number, self.frames[frame_id].clone()))
    }

    /// Writes back every dirty frame belonging to `file`, removes each
    /// from the index, and invalidates its descriptor.
    /// Not transactional: a failure partway through leaves earlier
    /// frames already flushed and cleared.
    pub fn flush_file(&mut self, file: &FileHandle) -> Result<()> {
        let target = file_key(file);

        for frame_id in 0..self.descriptors.len() {
            if self.descriptors[frame_id].file_id() != Some(target) {
                continue;
            }

            ensure!(
                self.descriptors[frame_id].valid(),
                Error::BadBuffer(frame_id)
            );
            ensure!(
                self.descriptors[frame_id].pin_count() == 0,
                Error::PagePinned(
                    file.borrow().filename().to_string(),
                    self.descriptors[frame_id].page_number(),
                    frame_id
                )
            );

            if self.descriptors[frame_id].dirty() {
                file.borrow_mut().write_page(&self.frames[frame_id].borrow())?;
                self.descriptors[frame_id].clear_dirty();
            }

            let page_number = self.descriptors[frame_id].page_number();
            self.index.remove(target, page_number)?;
            self.descriptors[frame_id].clear();

            printdbg!("flush_file: cleared frame {frame_id} (page {page_number})");
        }
        Ok(())
    }

    /// Frees `page_number`'s slot if resident, then deletes the page in
    /// the file. Silent if the page wasn't cached.
    pub fn dispose_page(&mut self, file: &FileHandle, page_number: PageNumber) -> Result<()> {
        let target = file_key(file);

        if let Ok(frame_id) = self.index.lookup(target, page_number) {
            self.descriptors[frame_id].clear();
            self.index.remove(target, page_number)?;
        }

        file.borrow_mut().delete_page(page_number)?;
        Ok(())
    }

    /// Human-readable per-frame listing plus a count of valid frames.
    /// Format is not otherwise specified.
    pub fn print_self(&self) {
        let mut valid_frames = 0;
        for (frame_id, descriptor) in self.descriptors.iter().enumerate() {
            println!("FrameNo:{frame_id} {descriptor:?}");
            if descriptor.valid() {
                valid_frames += 1;
            }
        }
        println!("Total Number of Valid Frames:{valid_frames}");
    }

    #[cfg(test)]
    pub(crate) fn pin_count(&self, file: &FileHandle, page_number: PageNumber) -> Option<u32> {
        let frame_id = self.index.lookup(file_key(file), page_number).ok()?;
        Some(self.descriptors[frame_id].pin_count())
    }

    #[cfg(test)]
    pub(crate) fn is_cached(&self, file: &FileHandle, page_number: PageNumber) -> bool {
        self.index.lookup(file_key(file), page_number).is_ok()
    }

    /// The clock-based frame allocator: select a frame
    /// for a new page, evicting an existing resident if necessary, or
    /// fail when every frame is pinned.
    fn allocate_frame(&mut self) -> Result<FrameId> {
        let num_frames = self.descriptors.len();
        let pinned = self
            .descriptors
            .iter()
            .filter(|descriptor| descriptor.pin_count() > 0)
            .count();
        if pinned == num_frames {
            bail!(Error::BufferExceeded);
        }

        let mut selected = None;
        for _ in 0..2 * num_frames {
            self.advance_clock();
            let hand = self.clock_hand;
            let descriptor = &mut self.descriptors[hand];

            if !descriptor.valid() {
                selected = Some(hand);
                break;
            }
            if descriptor.refbit() {
                descriptor.set_refbit(false);
                continue;
            }
            if descriptor.pin_count() == 0 {
                selected = Some(hand);
                break;
            }
        }

        let frame_id = selected.ok_or_else(|| anyhow!(Error::BufferExceeded))?;

        if self.descriptors[frame_id].valid() {
            if self.descriptors[frame_id].dirty() {
                let victim_file = self.descriptors[frame_id]
                    .file_ref()
                    .expect("valid descriptor must have a file reference")
                    .clone();
                victim_file
                    .borrow_mut()
                    .write_page(&self.frames[frame_id].borrow())?;
                printdbg!("allocate_frame: wrote back dirty victim in frame {frame_id}");
            }
            let victim_file_id = self.descriptors[frame_id]
                .file_id()
                .expect("valid descriptor must have a file id");
            let victim_page = self.descriptors[frame_id].page_number();
            self.index.remove(victim_file_id, victim_page)?;
        }

        Ok(frame_id)
    }

    fn advance_clock(&mut self) {
        self.clock_hand = (self.clock_hand + 1) % self.descriptors.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk_manager::{test_path, DiskManager};
    use crate::file_store::handle;

    fn pool(num_frames: usize) -> Result<(BufferPoolManager, FileHandle, String)> {
        let path = test_path();
        let disk = DiskManager::new(&path)?;
        Ok((BufferPoolManager::new(num_frames), handle(disk), path))
    }

    fn cleanup(path: String) {
        let _ = std::fs::remove_dir_all(path);
    }

    #[test]
    fn evicts_clean_oldest_frame() -> Result<()> {
        let (mut bpm, file, path) = pool(3)?;

        let (p1, _) = bpm.allocate_page(&file)?;
        let _ = bpm.read_page(&file, p1)?;
        bpm.unpin_page(&file, p1, false)?;
        bpm.unpin_page(&file, p1, false)?;

        let (p2, _) = bpm.allocate_page(&file)?;
        bpm.unpin_page(&file, p2, false)?;
        let (p3, _) = bpm.allocate_page(&file)?;
        bpm.unpin_page(&file, p3, false)?;

        let (p4, _) = bpm.allocate_page(&file)?;
        bpm.unpin_page(&file, p4, false)?;

        assert!(!bpm.is_cached(&file, p1));
        assert!(bpm.is_cached(&file, p2));
        assert!(bpm.is_cached(&file, p3));
        assert!(bpm.is_cached(&file, p4));

        cleanup(path);
        Ok(())
    }

    #[test]
    fn writes_back_dirty_victim_before_reuse() -> Result<()> {
        let (mut bpm, file, path) = pool(3)?;

        let (p1, page_ref) = bpm.allocate_page(&file)?;
        page_ref.borrow_mut().write_bytes(0, 4, &[9, 9, 9, 9]);
        bpm.unpin_page(&file, p1, true)?;

        let (p2, _) = bpm.allocate_page(&file)?;
        bpm.unpin_page(&file, p2, false)?;
        let (p3, _) = bpm.allocate_page(&file)?;
        bpm.unpin_page(&file, p3, false)?;

        let (_p4, _) = bpm.allocate_page(&file)?;

        assert!(!bpm.is_cached(&file, p1));

        let reread = bpm.read_page(&file, p1)?;
        assert_eq!(reread.borrow().read_bytes(0, 4), &[9, 9, 9, 9]);
        bpm.unpin_page(&file, p1, false)?;

        cleanup(path);
        Ok(())
    }

    #[test]
    fn buffer_exceeded_when_all_frames_pinned() -> Result<()> {
        let (mut bpm, file, path) = pool(3)?;

        let (p1, _) = bpm.allocate_page(&file)?;
        let (p2, _) = bpm.allocate_page(&file)?;
        let (p3, _) = bpm.allocate_page(&file)?;

        let err = bpm.allocate_page(&file).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::BufferExceeded)
        ));

        assert_eq!(bpm.pin_count(&file, p1), Some(1));
        assert_eq!(bpm.pin_count(&file, p2), Some(1));
        assert_eq!(bpm.pin_count(&file, p3), Some(1));

        cleanup(path);
        Ok(())
    }

    #[test]
    fn unpin_missing_page_is_hash_not_found() -> Result<()> {
        let (mut bpm, file, path) = pool(3)?;

        let err = bpm.unpin_page(&file, 99, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::HashNotFound)
        ));

        cleanup(path);
        Ok(())
    }

    #[test]
    fn flush_fails_while_page_pinned() -> Result<()> {
        let (mut bpm, file, path) = pool(3)?;

        let (p1, _) = bpm.allocate_page(&file)?;

        let err = bpm.flush_file(&file).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::PagePinned(..))
        ));
        assert!(bpm.is_cached(&file, p1));

        cleanup(path);
        Ok(())
    }

    #[test]
    fn flush_writes_back_and_clears_descriptor() -> Result<()> {
        let (mut bpm, file, path) = pool(3)?;

        let (p1, page_ref) = bpm.allocate_page(&file)?;
        page_ref.borrow_mut().write_bytes(0, 4, &[1, 2, 3, 4]);
        bpm.unpin_page(&file, p1, true)?;

        bpm.flush_file(&file)?;
        assert!(!bpm.is_cached(&file, p1));

        let reread = bpm.read_page(&file, p1)?;
        assert_eq!(reread.borrow().read_bytes(0, 4), &[1, 2, 3, 4]);
        bpm.unpin_page(&file, p1, false)?;

        cleanup(path);
        Ok(())
    }

    // Flush idempotence law.
    #[test]
    fn flush_is_idempotent() -> Result<()> {
        let (mut bpm, file, path) = pool(3)?;

        let (p1, _) = bpm.allocate_page(&file)?;
        bpm.unpin_page(&file, p1, true)?;

        bpm.flush_file(&file)?;
        bpm.flush_file(&file)?;

        cleanup(path);
        Ok(())
    }

    // Dispose removes residency law.
    #[test]
    fn dispose_removes_residency() -> Result<()> {
        let (mut bpm, file, path) = pool(3)?;

        let (p1, _) = bpm.allocate_page(&file)?;
        bpm.unpin_page(&file, p1, false)?;

        bpm.dispose_page(&file, p1)?;
        assert!(!bpm.is_cached(&file, p1));

        cleanup(path);
        Ok(())
    }

    // Dispose is silent when the page was never cached.
    #[test]
    fn dispose_silent_if_not_cached() -> Result<()> {
        let (mut bpm, file, path) = pool(3)?;

        let (p1, _) = bpm.allocate_page(&file)?;
        bpm.unpin_page(&file, p1, false)?;
        bpm.dispose_page(&file, p1)?;

        bpm.dispose_page(&file, p1)?;

        cleanup(path);
        Ok(())
    }

    // Read/unpin balance law.
    #[test]
    fn read_unpin_balance_preserves_pin_count() -> Result<()> {
        let (mut bpm, file, path) = pool(3)?;

        let (p1, _) = bpm.allocate_page(&file)?;
        bpm.unpin_page(&file, p1, false)?;

        let before = bpm.pin_count(&file, p1);
        let _ = bpm.read_page(&file, p1)?;
        bpm.unpin_page(&file, p1, false)?;
        let after = bpm.pin_count(&file, p1);

        assert_eq!(before, after);

        cleanup(path);
        Ok(())
    }

    // Never evict a pinned frame, even under repeated pressure.
    #[test]
    fn never_evicts_pinned_frames() -> Result<()> {
        let (mut bpm, file, path) = pool(2)?;

        let (p1, _) = bpm.allocate_page(&file)?;
        let (p2, _) = bpm.allocate_page(&file)?;
        bpm.unpin_page(&file, p2, false)?;

        for _ in 0..5 {
            let (pn, _) = bpm.allocate_page(&file)?;
            bpm.unpin_page(&file, pn, false)?;
        }

        assert!(bpm.is_cached(&file, p1));
        assert_eq!(bpm.pin_count(&file, p1), Some(1));

        cleanup(path);
        Ok(())
    }
}
