//! Frame-identity index: an expected-O(1) mapping from
//! `(file, page_number)` to frame index, with a distinct not-found
//! signal the manager uses as control flow on the `read_page` miss path.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use anyhow::{anyhow, bail, Result};

use crate::errors::Error;
use crate::file_store::FileId;
use crate::pages::PageNumber;

use super::FrameId;

pub(super) struct FrameIndex {
    table: HashMap<(FileId, PageNumber), FrameId>,
}

impl FrameIndex {
    pub(super) fn with_frame_count(num_frames: usize) -> Self {
        // load factor ~0.8.
        let capacity = ((num_frames as f64) / 0.8).ceil() as usize;
        Self {
            table: HashMap::with_capacity(capacity),
        }
    }

    /// Fails if the key already exists: a caller must `remove` before
    /// re-inserting, so a collision here is an internal bug.
    pub(super) fn insert(
        &mut self,
        file_id: FileId,
        page_number: PageNumber,
        frame_index: FrameId,
    ) -> Result<()> {
        match self.table.entry((file_id, page_number)) {
            Entry::Occupied(_) => bail!(Error::Internal(format!(
                "frame index already has an entry for page {page_number}"
            ))),
            Entry::Vacant(entry) => {
                entry.insert(frame_index);
                Ok(())
            }
        }
    }

    pub(super) fn lookup(&self, file_id: FileId, page_number: PageNumber) -> Result<FrameId> {
        self.table
            .get(&(file_id, page_number))
            .copied()
            .ok_or_else(|| anyhow!(Error::HashNotFound))
    }

    pub(super) fn remove(&mut self, file_id: FileId, page_number: PageNumber) -> Result<()> {
        self.table
            .remove(&(file_id, page_number))
            .map(|_| ())
            .ok_or_else(|| anyhow!(Error::HashNotFound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_lookup() -> Result<()> {
        let mut index = FrameIndex::with_frame_count(4);
        index.insert(1, 10, 0)?;
        assert_eq!(index.lookup(1, 10)?, 0);
        Ok(())
    }

    #[test]
    fn lookup_miss_is_hash_not_found() {
        let index = FrameIndex::with_frame_count(4);
        let err = index.lookup(1, 10).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::HashNotFound)));
    }

    #[test]
    fn insert_duplicate_key_fails() -> Result<()> {
        let mut index = FrameIndex::with_frame_count(4);
        index.insert(1, 10, 0)?;
        assert!(index.insert(1, 10, 1).is_err());
        Ok(())
    }

    #[test]
    fn remove_then_lookup_misses() -> Result<()> {
        let mut index = FrameIndex::with_frame_count(4);
        index.insert(1, 10, 0)?;
        index.remove(1, 10)?;
        assert!(index.lookup(1, 10).is_err());
        Ok(())
    }

    #[test]
    fn remove_missing_key_fails() {
        let mut index = FrameIndex::with_frame_count(4);
        assert!(index.remove(1, 10).is_err());
    }
}
