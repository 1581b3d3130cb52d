//! Choice vector: which bit of which attribute hash feeds each bit of the
//! composite hash.
//!
//! ## Textual form
//! `attr.bit,attr.bit,...` with exactly [MAX_CHVEC] entries, for example
//! `0.0,1.0,2.0,0.1,1.1,2.1,...`
//!
//! ## Binary layout
//! [MAX_CHVEC] entries of two bytes each: attribute index then bit index.

use std::fmt;
use std::str::FromStr;

use crate::bytes::{ByteLength, FromBytes, IntoBytes};
use crate::consts::*;
use crate::error::MalhError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChoiceItem {
    pub attr: u8,
    pub bit: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceVector {
    items: [ChoiceItem; MAX_CHVEC],
}

impl ChoiceVector {
    /// Cycles through the attributes, taking the next unused bit of each
    pub fn round_robin(attr_count: u32) -> Self {
        let attr_count = attr_count.max(1) as usize;
        let mut items = [ChoiceItem::default(); MAX_CHVEC];
        for (i, item) in items.iter_mut().enumerate() {
            *item = ChoiceItem {
                attr: (i % attr_count) as u8,
                bit: ((i / attr_count) % HASH_BITS as usize) as u8,
            };
        }
        Self { items }
    }

    /// Source of composite bit `i`, as `(attribute index, bit index)`
    pub fn resolve(&self, i: usize) -> (usize, usize) {
        let item = self.items[i];
        (item.attr as usize, item.bit as usize)
    }

    pub fn items(&self) -> &[ChoiceItem; MAX_CHVEC] {
        &self.items
    }

    /// Checks every entry refers to an existing attribute
    pub fn validate(&self, attr_count: u32) -> Result<(), MalhError> {
        for (i, item) in self.items.iter().enumerate() {
            if item.attr as u32 >= attr_count {
                return Err(MalhError::Config(format!(
                    "choice vector entry {} uses attribute {} but the relation has {}",
                    i, item.attr, attr_count
                )));
            }
        }
        Ok(())
    }
}

fn parse_item(entry: &str) -> Result<ChoiceItem, MalhError> {
    let (attr, bit) = entry
        .split_once('.')
        .ok_or_else(|| MalhError::Parse(format!("expected attr.bit, got {:?}", entry)))?;
    let attr = attr
        .trim()
        .parse::<u8>()
        .map_err(|_| MalhError::Parse(format!("bad attribute index in {:?}", entry)))?;
    let bit = bit
        .trim()
        .parse::<u8>()
        .map_err(|_| MalhError::Parse(format!("bad bit index in {:?}", entry)))?;
    if bit >= HASH_BITS {
        return Err(MalhError::Parse(format!(
            "bit index {} out of range in {:?}",
            bit, entry
        )));
    }
    Ok(ChoiceItem { attr, bit })
}

impl FromStr for ChoiceVector {
    type Err = MalhError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let entries: Vec<&str> = s.trim().split(',').collect();
        if entries.len() != MAX_CHVEC {
            return Err(MalhError::Parse(format!(
                "choice vector needs {} entries, got {}",
                MAX_CHVEC,
                entries.len()
            )));
        }
        let mut items = [ChoiceItem::default(); MAX_CHVEC];
        for (item, entry) in items.iter_mut().zip(entries) {
            *item = parse_item(entry)?;
        }
        Ok(Self { items })
    }
}

impl fmt::Display for ChoiceVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}.{}", item.attr, item.bit)?;
        }
        Ok(())
    }
}

impl ByteLength for ChoiceVector {
    fn byte_len(&self) -> usize {
        MAX_CHVEC * CHVEC_ITEM_LENGTH
    }
}

impl IntoBytes for &ChoiceVector {
    fn into_bytes(self) -> Vec<u8> {
        self.items.iter().flat_map(|i| [i.attr, i.bit]).collect()
    }
}

impl FromBytes for ChoiceVector {
    type Error = MalhError;

    fn from_bytes(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != MAX_CHVEC * CHVEC_ITEM_LENGTH {
            return Err(MalhError::CorruptMetadata(format!(
                "choice vector is {} bytes",
                bytes.len()
            )));
        }
        let mut items = [ChoiceItem::default(); MAX_CHVEC];
        for (item, pair) in items.iter_mut().zip(bytes.chunks_exact(CHVEC_ITEM_LENGTH)) {
            *item = ChoiceItem {
                attr: pair[0],
                bit: pair[1],
            };
        }
        Ok(Self { items })
    }
}
