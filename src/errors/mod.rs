use crate::pages::PageNumber;

#[derive(Debug)]
pub enum Error {
    /// Every frame is pinned; no victim can be selected by the clock sweep.
    BufferExceeded,
    /// `unpin_page` called for a resident page whose pin count is already zero.
    PageNotPinned(String, PageNumber, usize),
    /// `flush_file` found a resident, pinned page belonging to the target file.
    PagePinned(String, PageNumber, usize),
    /// A descriptor claims to hold a file but isn't valid; metadata invariant broken.
    BadBuffer(usize),
    /// The identity index has no entry for the requested (file, page) key.
    HashNotFound,
    /// The file store rejected a read for a page number it doesn't have.
    InvalidPage(PageNumber),
    Internal(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::BufferExceeded => write!(f, "Buffer pool exceeded: no frame available to evict."),
            Error::PageNotPinned(file, page, frame) => write!(
                f,
                "Page {page} of {file} (frame {frame}) is not pinned."
            ),
            Error::PagePinned(file, page, frame) => write!(
                f,
                "Page {page} of {file} (frame {frame}) is still pinned; cannot flush."
            ),
            Error::BadBuffer(frame) => write!(
                f,
                "Frame {frame} claims to hold a page but its descriptor is invalid."
            ),
            Error::HashNotFound => write!(f, "No frame is associated with that (file, page) pair."),
            Error::InvalidPage(page) => write!(f, "Page {page} does not exist in the file."),
            Error::Internal(context) => write!(f, "Internal Error: {context}."),
        }
    }
}
