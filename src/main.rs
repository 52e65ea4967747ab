use anyhow::Result;

use bufmgr::buffer_pool::BufferPoolManager;
use bufmgr::disk_manager::DiskManager;
use bufmgr::file_store::handle;

fn main() -> Result<()> {
    let disk = DiskManager::new("data/demo/")?;
    let file = handle(disk);

    let mut bpm = BufferPoolManager::new(4);

    let (page_number, page) = bpm.allocate_page(&file)?;
    page.borrow_mut().write_bytes(0, 5, b"hello");
    bpm.unpin_page(&file, page_number, true)?;

    let fetched = bpm.read_page(&file, page_number)?;
    println!("page {page_number}: {:?}", fetched.borrow().read_bytes(0, 5));
    bpm.unpin_page(&file, page_number, false)?;

    bpm.flush_file(&file)?;
    bpm.print_self();

    Ok(())
}
