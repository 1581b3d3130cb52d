pub const PAGE_SIZE: usize = 1024;

/// Free offset, overflow link and tuple count, each a u32
pub const PAGE_HEADER: usize = 12;

pub const PAGE_DATA_SIZE: usize = PAGE_SIZE - PAGE_HEADER;

/// Width of the composite hash, and the number of entries in a choice vector
pub const MAX_CHVEC: usize = 32;

/// Number of bits in an attribute hash
pub const HASH_BITS: u8 = 32;

/// Largest attribute count that still gives a split threshold of at least 1
pub const MAX_ATTRS: u32 = (PAGE_SIZE / 10) as u32;

/// attrCount, pageCount, tupleCount, depth, splitPointer
pub const INFO_HEADER: usize = 5 * 4;

pub const CHVEC_ITEM_LENGTH: usize = 2;

pub const INFO_SIZE: usize = INFO_HEADER + MAX_CHVEC * CHVEC_ITEM_LENGTH;

pub const WILDCARD: &str = "?";

pub const ATTR_SEPARATOR: char = ',';

pub const HASH_SEED: u32 = 0x9315;
