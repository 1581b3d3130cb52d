use std::io::SeekFrom;
use std::path::PathBuf;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::bytes::*;
use crate::config::OpenMode;
use crate::consts::*;
use crate::error::{MalhError, Result};
use crate::page::{Page, PageId};

/// A file of fixed-size pages
///
/// ## File layout
/// - Page `n` occupies bytes `n * PAGE_SIZE .. (n + 1) * PAGE_SIZE`
/// - There is no header, the page count is derived from the file length
///
/// Every read hands back an owned [Page]; writing it back is the caller's job.
pub struct PageFile {
    path: PathBuf,
    file: File,
    page_count: u32,
}

fn page_offset(id: PageId) -> u64 {
    id as u64 * PAGE_SIZE as u64
}

impl PageFile {
    /// Creates an empty page file, truncating any existing one
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file,
            page_count: 0,
        })
    }

    /// Opens an existing page file
    ///
    /// Returns [MalhError::CorruptMetadata] if the length is not a whole number of pages.
    pub async fn open(path: impl Into<PathBuf>, mode: OpenMode) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(mode.is_writable())
            .open(&path)
            .await?;

        let len = file.metadata().await?.len();
        if len % PAGE_SIZE as u64 != 0 {
            return Err(MalhError::CorruptMetadata(format!(
                "{} is {} bytes, not a multiple of the page size {}",
                path.display(),
                len,
                PAGE_SIZE
            )));
        }

        Ok(Self {
            path,
            file,
            page_count: (len / PAGE_SIZE as u64) as u32,
        })
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub async fn read_page(&mut self, id: PageId) -> Result<Page> {
        if id >= self.page_count {
            return Err(MalhError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "page {} past end of {} ({} pages)",
                    id,
                    self.path.display(),
                    self.page_count
                ),
            )));
        }
        self.file.seek(SeekFrom::Start(page_offset(id))).await?;
        let mut buf = vec![0_u8; PAGE_SIZE];
        self.file.read_exact(&mut buf).await?;
        Page::from_bytes(&buf)
    }

    pub async fn write_page(&mut self, id: PageId, page: &Page) -> Result<()> {
        self.file.seek(SeekFrom::Start(page_offset(id))).await?;
        self.file.write_all(&page.into_bytes()).await?;
        // tokio defers the write; flushing surfaces its error on this call
        self.file.flush().await?;
        if id >= self.page_count {
            self.page_count = id + 1;
        }
        Ok(())
    }

    /// Appends one empty page and returns its id
    pub async fn allocate_page(&mut self) -> Result<PageId> {
        let id = self.page_count;
        self.write_page(id, &Page::new()).await?;
        Ok(id)
    }

    pub async fn sync(&mut self) -> Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(())
    }
}
