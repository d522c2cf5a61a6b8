//! Typed key/value annotations attached to a read record.
//!
//! A [`ReadRecord`] owns one byte buffer: a fixed-layout core prefix followed
//! by the tag region. Every entry in the tag region is encoded back to back
//! with no index:
//!
//! ```text
//! key[0] key[1] type payload...
//! ```
//!
//! Payload length is derived from the type byte: scalars have a fixed width,
//! `Z`/`H` strings run to a NUL terminator, and `B` arrays carry an element
//! type byte plus a little-endian `u32` count. Keys are not required to be
//! unique; lookups scan linearly and the first match wins.
//!
//! Every entry extent is computed with bounds checks, so a truncated entry or
//! an array count that overruns the buffer surfaces as a [`TagError`] instead
//! of an over-read.

mod value;

pub use value::{Tag, TagArray, TagType, TagValue};

use std::ops::Range;

use thiserror::Error;

const HEADER_LEN: usize = 3;
const ARRAY_PREFIX_LEN: usize = 5;

/// Errors raised while decoding or mutating a tag region.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TagError {
    /// Entry header or payload runs past the end of the tag region.
    #[error("truncated tag entry at offset {offset}")]
    Truncated {
        /// Offset of the entry within the tag region.
        offset: usize,
    },

    /// Type byte (or array element type byte) is not a known discriminator.
    #[error("unknown tag type {byte:#04x} at offset {offset}")]
    UnknownType {
        /// Offending byte.
        byte: u8,
        /// Offset of the entry within the tag region.
        offset: usize,
    },

    /// Typed-array element count overruns the tag region.
    #[error("array of {count} elements overruns tag region at offset {offset}")]
    ArrayOverrun {
        /// Declared element count.
        count: u32,
        /// Offset of the entry within the tag region.
        offset: usize,
    },

    /// Raw payload carries bytes beyond what its type byte encodes.
    #[error("payload of {actual} bytes at offset {offset} encodes only {expected}")]
    PayloadLength {
        /// Offset the entry would have had within the tag region.
        offset: usize,
        /// Bytes the type byte accounts for.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },

    /// Position does not address the start of an entry in the current region.
    #[error("tag position {0} does not address an entry")]
    InvalidPosition(usize),

    /// String payload contains a NUL byte.
    #[error("string value for tag {0} contains an embedded NUL")]
    EmbeddedNul(String),

    /// Growing the record buffer failed.
    #[error("failed to grow record buffer to {0} bytes")]
    Allocation(usize),
}

/// Location of an entry inside a record's tag region, as returned by
/// [`ReadRecord::find`]. Any mutation of the record invalidates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagPosition(usize);

impl TagPosition {
    /// Offset of the entry's key within the tag region.
    pub fn offset(&self) -> usize {
        self.0
    }

    /// Offset of the entry's payload, just past the key and type byte.
    pub fn value_offset(&self) -> usize {
        self.0 + HEADER_LEN
    }
}

/// Full encoded size (key + type + payload) of the entry starting at `offset`.
fn entry_extent(region: &[u8], offset: usize) -> Result<usize, TagError> {
    let body_start = offset + HEADER_LEN;
    if body_start > region.len() {
        return Err(TagError::Truncated { offset });
    }
    let type_byte = region[offset + 2];
    let ty = TagType::from_byte(type_byte).ok_or(TagError::UnknownType {
        byte: type_byte,
        offset,
    })?;
    Ok(HEADER_LEN + payload_extent(ty, &region[body_start..], offset)?)
}

/// Bytes of `body` taken by a `ty` payload; `offset` only labels errors.
fn payload_extent(ty: TagType, body: &[u8], offset: usize) -> Result<usize, TagError> {
    let payload_len = match ty.fixed_size() {
        Some(size) => size,
        None if ty == TagType::Array => array_extent(body, offset)?,
        None => {
            body.iter()
                .position(|&b| b == 0)
                .ok_or(TagError::Truncated { offset })?
                + 1
        }
    };

    if payload_len > body.len() {
        return Err(TagError::Truncated { offset });
    }
    Ok(payload_len)
}

fn array_extent(body: &[u8], offset: usize) -> Result<usize, TagError> {
    if body.len() < ARRAY_PREFIX_LEN {
        return Err(TagError::Truncated { offset });
    }
    let element = TagType::from_byte(body[0])
        .filter(|ty| ty.is_array_element())
        .ok_or(TagError::UnknownType {
            byte: body[0],
            offset,
        })?;
    let count = u32::from_le_bytes([body[1], body[2], body[3], body[4]]);
    let element_size = element.fixed_size().unwrap_or(1);

    let len = (count as usize)
        .checked_mul(element_size)
        .and_then(|n| n.checked_add(ARRAY_PREFIX_LEN))
        .filter(|&n| n <= body.len())
        .ok_or(TagError::ArrayOverrun { count, offset })?;
    Ok(len)
}

/// Read record whose buffer carries a core prefix followed by tag entries.
///
/// `data_len` and `aux_len` are kept in lock-step with the buffer: after every
/// operation `data_len == core_len + aux_len == buffer length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRecord {
    data: Vec<u8>,
    core_len: usize,
    data_len: usize,
    aux_len: usize,
}

impl ReadRecord {
    /// Create a record with the given core bytes and an empty tag region.
    pub fn new(core: &[u8]) -> Self {
        Self {
            data: core.to_vec(),
            core_len: core.len(),
            data_len: core.len(),
            aux_len: 0,
        }
    }

    /// Create a record from a core prefix and an already-encoded tag region.
    ///
    /// The tag region is walked once so malformed input is rejected up front.
    pub fn from_parts(core: &[u8], tags: &[u8]) -> Result<Self, TagError> {
        let mut offset = 0;
        while offset < tags.len() {
            offset += entry_extent(tags, offset)?;
        }
        let mut data = Vec::with_capacity(core.len() + tags.len());
        data.extend_from_slice(core);
        data.extend_from_slice(tags);
        Ok(Self {
            core_len: core.len(),
            data_len: data.len(),
            aux_len: tags.len(),
            data,
        })
    }

    /// Core prefix bytes.
    pub fn core(&self) -> &[u8] {
        &self.data[..self.core_len]
    }

    /// Encoded tag region.
    pub fn tag_region(&self) -> &[u8] {
        &self.data[self.core_len..self.data_len]
    }

    /// Total bytes in use (core + tags).
    pub fn data_len(&self) -> usize {
        self.data_len
    }

    /// Bytes used by the tag region.
    pub fn aux_len(&self) -> usize {
        self.aux_len
    }

    /// Allocated buffer capacity.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Append a raw entry. The payload must already be encoded for `ty`;
    /// a payload whose size disagrees with its type is rejected and the
    /// record is left unchanged.
    pub fn append(&mut self, key: &[u8; 2], ty: TagType, payload: &[u8]) -> Result<(), TagError> {
        let offset = self.aux_len;
        let extent = payload_extent(ty, payload, offset)?;
        if extent != payload.len() {
            return Err(TagError::PayloadLength {
                offset,
                expected: extent,
                actual: payload.len(),
            });
        }

        let entry_len = HEADER_LEN + payload.len();
        let needed = self.data_len + entry_len;
        if self.data.capacity() < needed {
            let target = needed.checked_next_power_of_two().unwrap_or(needed);
            self.data
                .try_reserve_exact(target - self.data.len())
                .map_err(|_| TagError::Allocation(target))?;
        }

        self.data.extend_from_slice(key);
        self.data.push(ty.as_byte());
        self.data.extend_from_slice(payload);
        self.data_len += entry_len;
        self.aux_len += entry_len;
        self.debug_check();
        Ok(())
    }

    /// Encode and append a typed value.
    pub fn append_value(&mut self, key: &[u8; 2], value: &TagValue) -> Result<(), TagError> {
        let payload = value.encode(key)?;
        self.append(key, value.tag_type(), &payload)
    }

    /// Locate the first entry with `key`.
    pub fn find(&self, key: &[u8; 2]) -> Result<Option<TagPosition>, TagError> {
        let region = self.tag_region();
        let mut offset = 0;
        while offset < region.len() {
            let extent = entry_extent(region, offset)?;
            if region[offset..offset + 2] == key[..] {
                return Ok(Some(TagPosition(offset)));
            }
            offset += extent;
        }
        Ok(None)
    }

    /// Decode the first entry with `key`.
    pub fn get(&self, key: &[u8; 2]) -> Result<Option<Tag<'_>>, TagError> {
        match self.find(key)? {
            Some(position) => self.tag_at(position).map(Some),
            None => Ok(None),
        }
    }

    /// Decode the entry at `position`.
    pub fn tag_at(&self, position: TagPosition) -> Result<Tag<'_>, TagError> {
        let range = self.entry_range(position)?;
        Ok(decode_entry(&self.tag_region()[range]))
    }

    /// Remove the entry at `position`, closing the gap.
    pub fn delete(&mut self, position: TagPosition) -> Result<(), TagError> {
        let range = self.entry_range(position)?;
        let removed = range.len();
        let start = self.core_len + range.start;
        self.data.drain(start..start + removed);
        self.data_len -= removed;
        self.aux_len -= removed;
        self.debug_check();
        Ok(())
    }

    /// Keep only the entry at `position` (moved to the front of the region),
    /// or clear every entry when `position` is `None`.
    pub fn retain_only(&mut self, position: Option<TagPosition>) -> Result<(), TagError> {
        match position {
            Some(position) => {
                let range = self.entry_range(position)?;
                let kept = range.len();
                let src = self.core_len + range.start..self.core_len + range.end;
                self.data.copy_within(src, self.core_len);
                self.data.truncate(self.core_len + kept);
                self.data_len -= self.aux_len - kept;
                self.aux_len = kept;
            }
            None => {
                self.data.truncate(self.core_len);
                self.data_len -= self.aux_len;
                self.aux_len = 0;
            }
        }
        self.debug_check();
        Ok(())
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> TagIter<'_> {
        TagIter {
            region: self.tag_region(),
            offset: 0,
        }
    }

    /// Number of entries; fails on a malformed region.
    pub fn tag_count(&self) -> Result<usize, TagError> {
        self.iter().try_fold(0, |count, tag| tag.map(|_| count + 1))
    }

    /// Byte range of the entry at `position`, relative to the tag region.
    fn entry_range(&self, position: TagPosition) -> Result<Range<usize>, TagError> {
        let region = self.tag_region();
        let mut offset = 0;
        while offset < region.len() {
            let extent = entry_extent(region, offset)?;
            if offset == position.0 {
                return Ok(offset..offset + extent);
            }
            if offset > position.0 {
                break;
            }
            offset += extent;
        }
        Err(TagError::InvalidPosition(position.0))
    }

    fn debug_check(&self) {
        debug_assert_eq!(self.data.len(), self.data_len);
        debug_assert_eq!(self.core_len + self.aux_len, self.data_len);
    }
}

fn decode_entry(entry: &[u8]) -> Tag<'_> {
    let key = [entry[0], entry[1]];
    // Extent computation already validated the type byte.
    let ty = TagType::from_byte(entry[2]).unwrap_or(TagType::UInt8);
    Tag::new(key, ty, &entry[HEADER_LEN..])
}

/// Iterator over the entries of a tag region.
#[derive(Debug, Clone)]
pub struct TagIter<'a> {
    region: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for TagIter<'a> {
    type Item = Result<Tag<'a>, TagError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.region.len() {
            return None;
        }
        match entry_extent(self.region, self.offset) {
            Ok(extent) => {
                let entry = &self.region[self.offset..self.offset + extent];
                self.offset += extent;
                Some(Ok(decode_entry(entry)))
            }
            Err(err) => {
                self.offset = self.region.len();
                Some(Err(err))
            }
        }
    }
}
