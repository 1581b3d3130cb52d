//! Multi-attribute linear-hashed relation

use std::ffi::OsString;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{info, warn};

use crate::bits::{lower_bits, Bits};
use crate::bytes::*;
use crate::chvec::ChoiceVector;
use crate::config::{OpenMode, RelationConfig};
use crate::consts::*;
use crate::error::{MalhError, Result};
use crate::page::{Page, PageId, NO_PAGE};
use crate::storage::PageFile;
use crate::tuple::Tuple;

/// Which page file of a relation a page lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Data,
    Overflow,
}

/// The mutable global state stored in the info file
///
/// ## Binary layout
/// - u32 LE attribute count
/// - u32 LE primary page count
/// - u32 LE tuple count
/// - u32 LE depth
/// - u32 LE split pointer
/// - the choice vector, see [ChoiceVector]
#[derive(Debug, Clone, PartialEq, Eq)]
struct RelationInfo {
    attr_count: u32,
    page_count: u32,
    tuple_count: u32,
    depth: u32,
    split_pointer: u32,
    choice_vector: ChoiceVector,
}

impl ByteLength for RelationInfo {
    fn byte_len(&self) -> usize {
        INFO_HEADER + self.choice_vector.byte_len()
    }
}

impl IntoBytes for &RelationInfo {
    fn into_bytes(self) -> Vec<u8> {
        let mut buf = vec![0_u8; INFO_HEADER];
        write_u32_le(&mut buf, 0, self.attr_count);
        write_u32_le(&mut buf, 4, self.page_count);
        write_u32_le(&mut buf, 8, self.tuple_count);
        write_u32_le(&mut buf, 12, self.depth);
        write_u32_le(&mut buf, 16, self.split_pointer);
        buf.extend((&self.choice_vector).into_bytes());
        buf
    }
}

impl FromBytes for RelationInfo {
    type Error = MalhError;

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != INFO_SIZE {
            return Err(MalhError::CorruptMetadata(format!(
                "info header is {} bytes, expected {}",
                bytes.len(),
                INFO_SIZE
            )));
        }
        Ok(Self {
            attr_count: read_u32_le(bytes, 0),
            page_count: read_u32_le(bytes, 4),
            tuple_count: read_u32_le(bytes, 8),
            depth: read_u32_le(bytes, 12),
            split_pointer: read_u32_le(bytes, 16),
            choice_vector: ChoiceVector::from_bytes(&bytes[INFO_HEADER..])?,
        })
    }
}

impl RelationInfo {
    /// Checks the header against itself and the data file
    fn validate(&self, data_pages: u32) -> Result<()> {
        let corrupt = |msg: String| MalhError::CorruptMetadata(format!("info header: {}", msg));
        let config = RelationConfig {
            attr_count: self.attr_count,
            initial_pages: self.page_count,
            depth: self.depth,
            choice_vector: self.choice_vector.clone(),
        };
        config.validate().map_err(|err| corrupt(err.to_string()))?;

        let buckets = 1_u64 << self.depth;
        if self.split_pointer as u64 >= buckets {
            return Err(corrupt(format!(
                "split pointer {} out of range for depth {}",
                self.split_pointer, self.depth
            )));
        }
        if (self.page_count as u64) < buckets + self.split_pointer as u64 {
            return Err(corrupt(format!(
                "{} pages cannot hold depth {} with split pointer {}",
                self.page_count, self.depth, self.split_pointer
            )));
        }
        if self.page_count > data_pages {
            return Err(corrupt(format!(
                "records {} pages but the data file has {}",
                self.page_count, data_pages
            )));
        }
        Ok(())
    }
}

/// An open relation
///
/// Made of three files sharing a base name:
/// - `<name>.info` holds [RelationInfo]
/// - `<name>.data` holds one primary page per bucket
/// - `<name>.ovflow` holds overflow pages, chained from the primary pages
///
/// Must be released with [Relation::close] to persist the info file.
pub struct Relation {
    name: PathBuf,
    mode: OpenMode,
    attr_count: u32,
    pub(crate) depth: u32,
    pub(crate) split_pointer: u32,
    pub(crate) page_count: u32,
    pub(crate) tuple_count: u32,
    choice_vector: ChoiceVector,
    info: File,
    pub(crate) data: PageFile,
    pub(crate) ovflow: PageFile,
    closed: bool,
}

/// Linear-hash addressing: buckets below the split pointer have already been
/// split and take one more bit of the hash
pub fn bucket_address(hash: Bits, depth: u32, split_pointer: u32) -> PageId {
    let low = lower_bits(hash, depth);
    if low < split_pointer {
        lower_bits(hash, depth + 1)
    } else {
        low
    }
}

fn stream_path(name: &Path, ext: &str) -> PathBuf {
    let mut path = OsString::from(name.as_os_str());
    path.push(".");
    path.push(ext);
    PathBuf::from(path)
}

impl Relation {
    /// Creates the three files of a new relation with `initial_pages` empty buckets
    ///
    /// Existing files of the same name are truncated. The relation is returned open
    /// for writing.
    pub async fn create(name: impl AsRef<Path>, config: &RelationConfig) -> Result<Self> {
        config.validate()?;
        let name = name.as_ref().to_path_buf();

        let info = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(stream_path(&name, "info"))
            .await?;
        let mut data = PageFile::create(stream_path(&name, "data")).await?;
        let ovflow = PageFile::create(stream_path(&name, "ovflow")).await?;

        for _ in 0..config.initial_pages {
            data.allocate_page().await?;
        }

        let mut relation = Self {
            name,
            mode: OpenMode::ReadWrite,
            attr_count: config.attr_count,
            depth: config.depth,
            split_pointer: 0,
            page_count: config.initial_pages,
            tuple_count: 0,
            choice_vector: config.choice_vector.clone(),
            info,
            data,
            ovflow,
            closed: false,
        };
        relation.write_info().await?;

        info!(
            relation = %relation.name.display(),
            attrs = relation.attr_count,
            pages = relation.page_count,
            depth = relation.depth,
            "created relation"
        );
        Ok(relation)
    }

    /// Whether the info file of a relation exists
    pub async fn exists(name: impl AsRef<Path>) -> bool {
        tokio::fs::metadata(stream_path(name.as_ref(), "info"))
            .await
            .is_ok()
    }

    pub async fn open(name: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        let name = name.as_ref().to_path_buf();

        let mut info = OpenOptions::new()
            .read(true)
            .write(mode.is_writable())
            .open(stream_path(&name, "info"))
            .await?;
        let data = PageFile::open(stream_path(&name, "data"), mode).await?;
        let ovflow = PageFile::open(stream_path(&name, "ovflow"), mode).await?;

        let mut buf = Vec::with_capacity(INFO_SIZE);
        info.read_to_end(&mut buf).await?;
        let header = RelationInfo::from_bytes(&buf)?;
        header.validate(data.page_count())?;

        info!(
            relation = %name.display(),
            pages = header.page_count,
            tuples = header.tuple_count,
            depth = header.depth,
            split_pointer = header.split_pointer,
            "opened relation"
        );

        Ok(Self {
            name,
            mode,
            attr_count: header.attr_count,
            depth: header.depth,
            split_pointer: header.split_pointer,
            page_count: header.page_count,
            tuple_count: header.tuple_count,
            choice_vector: header.choice_vector,
            info,
            data,
            ovflow,
            closed: false,
        })
    }

    /// Persists the info file if the relation is writable, then releases the files
    pub async fn close(mut self) -> Result<()> {
        if self.mode.is_writable() {
            self.write_info().await?;
            self.data.sync().await?;
            self.ovflow.sync().await?;
        }
        self.closed = true;
        info!(
            relation = %self.name.display(),
            pages = self.page_count,
            tuples = self.tuple_count,
            "closed relation"
        );
        Ok(())
    }

    /// Fails with a permission error unless the relation was opened for writing
    pub(crate) fn ensure_writable(&self) -> Result<()> {
        if self.mode.is_writable() {
            return Ok(());
        }
        Err(MalhError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            format!("relation {} is open read-only", self.name.display()),
        )))
    }

    async fn write_info(&mut self) -> Result<()> {
        let header = RelationInfo {
            attr_count: self.attr_count,
            page_count: self.page_count,
            tuple_count: self.tuple_count,
            depth: self.depth,
            split_pointer: self.split_pointer,
            choice_vector: self.choice_vector.clone(),
        };
        self.info.seek(SeekFrom::Start(0)).await?;
        self.info.write_all(&header.into_bytes()).await?;
        self.info.flush().await?;
        self.info.sync_all().await?;
        Ok(())
    }

    pub fn name(&self) -> &Path {
        &self.name
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn attr_count(&self) -> u32 {
        self.attr_count
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn split_pointer(&self) -> u32 {
        self.split_pointer
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn tuple_count(&self) -> u32 {
        self.tuple_count
    }

    pub fn choice_vector(&self) -> &ChoiceVector {
        &self.choice_vector
    }

    pub fn overflow_page_count(&self) -> u32 {
        self.ovflow.page_count()
    }

    pub fn tuple_hash(&self, tuple: &Tuple) -> Bits {
        tuple.composite_hash(&self.choice_vector)
    }

    pub fn bucket_of(&self, hash: Bits) -> PageId {
        bucket_address(hash, self.depth, self.split_pointer)
    }

    pub async fn read_page(&mut self, stream: Stream, id: PageId) -> Result<Page> {
        match stream {
            Stream::Data => self.data.read_page(id).await,
            Stream::Overflow => self.ovflow.read_page(id).await,
        }
    }

    pub async fn write_page(&mut self, stream: Stream, id: PageId, page: &Page) -> Result<()> {
        match stream {
            Stream::Data => self.data.write_page(id, page).await,
            Stream::Overflow => self.ovflow.write_page(id, page).await,
        }
    }

    /// Every tuple of a bucket, primary page first then the overflow chain in link order
    pub async fn bucket_tuples(&mut self, bucket: PageId) -> Result<Vec<Tuple>> {
        let mut page = self.data.read_page(bucket).await?;
        let mut tuples: Vec<Tuple> = page.tuples().collect();
        while page.overflow() != NO_PAGE {
            page = self.ovflow.read_page(page.overflow()).await?;
            tuples.extend(page.tuples());
        }
        Ok(tuples)
    }
}

impl Drop for Relation {
    fn drop(&mut self) {
        if self.mode.is_writable() && !self.closed {
            warn!(
                relation = %self.name.display(),
                "relation dropped without close, info file not updated"
            );
        }
    }
}
