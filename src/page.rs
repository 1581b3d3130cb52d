//! A fixed-size page of packed tuples
//!
//! ## Binary layout
//!
//! - u32 offset of the first free byte in the data area
//! - u32 id of the next overflow page, [NO_PAGE] if none
//! - u32 number of tuples
//! - data area, tuples stored back to back, each terminated by a NUL byte

use crate::bytes::*;
use crate::consts::*;
use crate::error::MalhError;
use crate::tuple::Tuple;

pub type PageId = u32;

pub const NO_PAGE: PageId = u32::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    free: usize,
    overflow: PageId,
    tuple_count: u32,
    data: Vec<u8>,
}

/// Returned when a tuple does not fit in the remaining space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageFull;

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    pub fn new() -> Self {
        Self {
            free: 0,
            overflow: NO_PAGE,
            tuple_count: 0,
            data: vec![0; PAGE_DATA_SIZE],
        }
    }

    pub fn free_space(&self) -> usize {
        PAGE_DATA_SIZE - self.free
    }

    pub fn tuple_count(&self) -> u32 {
        self.tuple_count
    }

    pub fn overflow(&self) -> PageId {
        self.overflow
    }

    pub fn set_overflow(&mut self, id: PageId) {
        self.overflow = id;
    }

    pub fn fits(&self, tuple: &Tuple) -> bool {
        tuple.stored_len() <= self.free_space()
    }

    pub fn add_tuple(&mut self, tuple: &Tuple) -> Result<(), PageFull> {
        if !self.fits(tuple) {
            return Err(PageFull);
        }
        let bytes = tuple.as_str().as_bytes();
        let end = self.free + bytes.len();
        self.data[self.free..end].copy_from_slice(bytes);
        self.data[end] = 0;
        self.free = end + 1;
        self.tuple_count += 1;
        Ok(())
    }

    /// The tuple starting at `offset` and the offset just past it
    pub fn tuple_at(&self, offset: usize) -> Option<(Tuple, usize)> {
        if offset >= self.free {
            return None;
        }
        let len = self.data[offset..self.free].iter().position(|b| *b == 0)?;
        let text = String::from_utf8_lossy(&self.data[offset..offset + len]);
        Some((Tuple::new(text), offset + len + 1))
    }

    pub fn tuples(&self) -> Tuples<'_> {
        Tuples {
            page: self,
            offset: 0,
        }
    }
}

pub struct Tuples<'a> {
    page: &'a Page,
    offset: usize,
}

impl Iterator for Tuples<'_> {
    type Item = Tuple;

    fn next(&mut self) -> Option<Tuple> {
        let (tuple, next) = self.page.tuple_at(self.offset)?;
        self.offset = next;
        Some(tuple)
    }
}

impl ByteLength for Page {
    fn byte_len(&self) -> usize {
        PAGE_SIZE
    }
}

impl IntoBytes for &Page {
    fn into_bytes(self) -> Vec<u8> {
        let mut buf = vec![0_u8; PAGE_SIZE];
        write_u32_le(&mut buf, 0, self.free as u32);
        write_u32_le(&mut buf, 4, self.overflow);
        write_u32_le(&mut buf, 8, self.tuple_count);
        buf[PAGE_HEADER..].copy_from_slice(&self.data);
        buf
    }
}

impl FromBytes for Page {
    type Error = MalhError;

    fn from_bytes(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != PAGE_SIZE {
            return Err(MalhError::CorruptMetadata(format!(
                "page is {} bytes, expected {}",
                bytes.len(),
                PAGE_SIZE
            )));
        }
        let free = read_u32_le(bytes, 0) as usize;
        if free > PAGE_DATA_SIZE {
            return Err(MalhError::CorruptMetadata(format!(
                "page free offset {} past end of page",
                free
            )));
        }
        Ok(Self {
            free,
            overflow: read_u32_le(bytes, 4),
            tuple_count: read_u32_le(bytes, 8),
            data: bytes[PAGE_HEADER..].to_vec(),
        })
    }
}
