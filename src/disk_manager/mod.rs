//! A [`PagedFile`](crate::file_store::PagedFile) backed by one regular
//! file per page under a directory, plus a small persisted counter for
//! the next page number to hand out.

use anyhow::{anyhow, Context, Result};
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::errors::Error;
use crate::file_store::PagedFile;
use crate::pages::{Page, PageNumber, INVALID_PAGE, PAGE_SIZE};

const NEXT_PAGE_FILE: &str = "__next_page";

#[cfg(test)]
pub fn test_path() -> String {
    use uuid::Uuid;

    let id = Uuid::new_v4(); // Generate a unique UUID
    format!("data/test/test_{}/", id)
}

#[derive(Debug)]
pub struct DiskManager {
    path: PathBuf,
    next_page_number: PageNumber,
}

impl DiskManager {
    pub fn new(path: &str) -> Result<Self> {
        let path = Path::new(path);
        std::fs::create_dir_all(path)?;

        let next_page_number = match std::fs::read(path.join(NEXT_PAGE_FILE)) {
            Ok(bytes) => PageNumber::from_ne_bytes(bytes.as_slice().try_into()?),
            Err(_) => 0,
        };

        Ok(Self {
            path: path.to_path_buf(),
            next_page_number,
        })
    }

    fn page_path(&self, page_number: PageNumber) -> PathBuf {
        self.path.join(page_number.to_string())
    }

    fn persist_next_page_number(&self) -> Result<()> {
        std::fs::write(
            self.path.join(NEXT_PAGE_FILE),
            self.next_page_number.to_ne_bytes(),
        )?;
        Ok(())
    }
}

impl PagedFile for DiskManager {
    fn filename(&self) -> &str {
        self.path.to_str().unwrap_or("<non-utf8 path>")
    }

    fn allocate_page(&mut self) -> Result<Page> {
        let page_number = self.next_page_number;
        self.next_page_number += 1;
        self.persist_next_page_number()?;

        let page = Page::with_number(page_number);
        self.write_page(&page)?;
        Ok(page)
    }

    fn read_page(&mut self, page_number: PageNumber) -> Result<Page> {
        if page_number == INVALID_PAGE {
            return Err(anyhow!(Error::InvalidPage(page_number)));
        }

        let mut file = OpenOptions::new()
            .read(true)
            .open(self.page_path(page_number))
            .map_err(|_| anyhow!(Error::InvalidPage(page_number)))
            .context("reading page from disk")?;

        let mut buffer = vec![0u8; PAGE_SIZE];
        file.read_exact(&mut buffer)
            .map_err(|_| anyhow!(Error::InvalidPage(page_number)))?;

        Ok(Page::from_bytes(page_number, &buffer))
    }

    fn write_page(&mut self, page: &Page) -> Result<()> {
        if page.page_number() == INVALID_PAGE {
            return Err(anyhow!("asked to write a page with invalid page number"));
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.page_path(page.page_number()))?;

        file.write_all(page.as_bytes())?;
        Ok(())
    }

    fn delete_page(&mut self, page_number: PageNumber) -> Result<()> {
        match std::fs::remove_file(self.page_path(page_number)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
