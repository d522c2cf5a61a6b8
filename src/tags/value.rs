use super::TagError;

/// Type discriminator stored after each two-byte tag key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum TagType {
    /// Single printable character (`A`).
    Char,
    /// Signed 8-bit integer (`c`).
    Int8,
    /// Unsigned 8-bit integer (`C`).
    UInt8,
    /// Signed 16-bit integer (`s`).
    Int16,
    /// Unsigned 16-bit integer (`S`).
    UInt16,
    /// Signed 32-bit integer (`i`).
    Int32,
    /// Unsigned 32-bit integer (`I`).
    UInt32,
    /// IEEE-754 single precision float (`f`).
    Float32,
    /// IEEE-754 double precision float (`d`).
    Float64,
    /// NUL-terminated string (`Z`).
    String,
    /// NUL-terminated hex string (`H`).
    Hex,
    /// Typed array: element type byte, little-endian `u32` count, elements (`B`).
    Array,
}

impl TagType {
    /// Parse the on-disk discriminator byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'A' => Some(TagType::Char),
            b'c' => Some(TagType::Int8),
            b'C' => Some(TagType::UInt8),
            b's' => Some(TagType::Int16),
            b'S' => Some(TagType::UInt16),
            b'i' => Some(TagType::Int32),
            b'I' => Some(TagType::UInt32),
            b'f' => Some(TagType::Float32),
            b'd' => Some(TagType::Float64),
            b'Z' => Some(TagType::String),
            b'H' => Some(TagType::Hex),
            b'B' => Some(TagType::Array),
            _ => None,
        }
    }

    /// Discriminator byte written to the tag region.
    pub fn as_byte(self) -> u8 {
        match self {
            TagType::Char => b'A',
            TagType::Int8 => b'c',
            TagType::UInt8 => b'C',
            TagType::Int16 => b's',
            TagType::UInt16 => b'S',
            TagType::Int32 => b'i',
            TagType::UInt32 => b'I',
            TagType::Float32 => b'f',
            TagType::Float64 => b'd',
            TagType::String => b'Z',
            TagType::Hex => b'H',
            TagType::Array => b'B',
        }
    }

    /// Payload size for scalar types; `None` for strings and arrays.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            TagType::Char | TagType::Int8 | TagType::UInt8 => Some(1),
            TagType::Int16 | TagType::UInt16 => Some(2),
            TagType::Int32 | TagType::UInt32 | TagType::Float32 => Some(4),
            TagType::Float64 => Some(8),
            TagType::String | TagType::Hex | TagType::Array => None,
        }
    }

    /// Whether the type may appear as the element type of a `B` array.
    pub fn is_array_element(self) -> bool {
        !matches!(self, TagType::Char) && self.fixed_size().is_some()
    }

    fn is_integer(self) -> bool {
        matches!(
            self,
            TagType::Int8
                | TagType::UInt8
                | TagType::Int16
                | TagType::UInt16
                | TagType::Int32
                | TagType::UInt32
        )
    }
}

fn fixed<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

fn decode_int(ty: TagType, bytes: &[u8]) -> i64 {
    match ty {
        TagType::Int8 => i64::from(bytes[0] as i8),
        TagType::UInt8 => i64::from(bytes[0]),
        TagType::Int16 => i64::from(i16::from_le_bytes(fixed(bytes))),
        TagType::UInt16 => i64::from(u16::from_le_bytes(fixed(bytes))),
        TagType::Int32 => i64::from(i32::from_le_bytes(fixed(bytes))),
        TagType::UInt32 => i64::from(u32::from_le_bytes(fixed(bytes))),
        _ => 0,
    }
}

fn decode_float(ty: TagType, bytes: &[u8]) -> f64 {
    match ty {
        TagType::Float32 => f64::from(f32::from_le_bytes(fixed(bytes))),
        TagType::Float64 => f64::from_le_bytes(fixed(bytes)),
        _ => 0.0,
    }
}

/// Borrowed view of one decoded tag entry.
///
/// The typed accessors follow a miss-returns-default policy: asking for a
/// value of the wrong type yields `0`, `0.0`, `'\0'`, `""` or `None` rather
/// than an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tag<'a> {
    key: [u8; 2],
    ty: TagType,
    payload: &'a [u8],
}

impl<'a> Tag<'a> {
    pub(crate) fn new(key: [u8; 2], ty: TagType, payload: &'a [u8]) -> Self {
        Self { key, ty, payload }
    }

    /// Two-byte key.
    pub fn key(&self) -> [u8; 2] {
        self.key
    }

    /// Type discriminator.
    pub fn tag_type(&self) -> TagType {
        self.ty
    }

    /// Encoded payload exactly as stored (strings keep their NUL terminator,
    /// arrays keep their element type and count prefix).
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Integer value for any of the six integer types.
    pub fn to_int(&self) -> i64 {
        if self.ty.is_integer() {
            decode_int(self.ty, self.payload)
        } else {
            0
        }
    }

    /// Value of an `f` entry.
    pub fn to_f32(&self) -> f32 {
        match self.ty {
            TagType::Float32 => f32::from_le_bytes(fixed(self.payload)),
            _ => 0.0,
        }
    }

    /// Value of a `d` entry.
    pub fn to_f64(&self) -> f64 {
        match self.ty {
            TagType::Float64 => f64::from_le_bytes(fixed(self.payload)),
            _ => 0.0,
        }
    }

    /// Value of an `A` entry.
    pub fn to_char(&self) -> char {
        match self.ty {
            TagType::Char => char::from(self.payload[0]),
            _ => '\0',
        }
    }

    /// Text of a `Z` or `H` entry, without the terminator. Non-UTF-8 text
    /// reads as empty.
    pub fn to_str(&self) -> &'a str {
        match self.ty {
            TagType::String | TagType::Hex => {
                let text = &self.payload[..self.payload.len().saturating_sub(1)];
                std::str::from_utf8(text).unwrap_or("")
            }
            _ => "",
        }
    }

    /// Elements of a `B` entry.
    pub fn to_array(&self) -> Option<TagArray<'a>> {
        if self.ty != TagType::Array {
            return None;
        }
        let element = TagType::from_byte(self.payload[0])?;
        let count = u32::from_le_bytes(fixed(&self.payload[1..])) as usize;
        Some(TagArray {
            element,
            count,
            data: &self.payload[5..],
        })
    }
}

/// Borrowed elements of a typed array entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TagArray<'a> {
    element: TagType,
    count: usize,
    data: &'a [u8],
}

impl<'a> TagArray<'a> {
    /// Element type.
    pub fn element_type(&self) -> TagType {
        self.element
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` when the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn element_bytes(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let size = self.element.fixed_size().unwrap_or(1);
        self.data.chunks_exact(size).take(self.count)
    }

    /// Elements widened to `i64`; float arrays yield zeros.
    pub fn int_values(&self) -> impl Iterator<Item = i64> + 'a {
        let ty = self.element;
        self.element_bytes().map(move |bytes| decode_int(ty, bytes))
    }

    /// Elements widened to `f64`; integer arrays yield zeros.
    pub fn float_values(&self) -> impl Iterator<Item = f64> + 'a {
        let ty = self.element;
        self.element_bytes().map(move |bytes| decode_float(ty, bytes))
    }
}

/// Owned value that knows how to encode itself into a tag payload.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// `A`
    Char(u8),
    /// `c`
    Int8(i8),
    /// `C`
    UInt8(u8),
    /// `s`
    Int16(i16),
    /// `S`
    UInt16(u16),
    /// `i`
    Int32(i32),
    /// `I`
    UInt32(u32),
    /// `f`
    Float32(f32),
    /// `d`
    Float64(f64),
    /// `Z`
    String(String),
    /// `H`
    Hex(String),
    /// `B` with `C` elements.
    UInt8Array(Vec<u8>),
    /// `B` with `i` elements.
    Int32Array(Vec<i32>),
    /// `B` with `f` elements.
    Float32Array(Vec<f32>),
}

impl TagValue {
    /// Discriminator written for this value.
    pub fn tag_type(&self) -> TagType {
        match self {
            TagValue::Char(_) => TagType::Char,
            TagValue::Int8(_) => TagType::Int8,
            TagValue::UInt8(_) => TagType::UInt8,
            TagValue::Int16(_) => TagType::Int16,
            TagValue::UInt16(_) => TagType::UInt16,
            TagValue::Int32(_) => TagType::Int32,
            TagValue::UInt32(_) => TagType::UInt32,
            TagValue::Float32(_) => TagType::Float32,
            TagValue::Float64(_) => TagType::Float64,
            TagValue::String(_) => TagType::String,
            TagValue::Hex(_) => TagType::Hex,
            TagValue::UInt8Array(_) | TagValue::Int32Array(_) | TagValue::Float32Array(_) => {
                TagType::Array
            }
        }
    }

    /// Encoded payload bytes (no key or type byte).
    pub fn encode(&self, key: &[u8; 2]) -> Result<Vec<u8>, TagError> {
        let mut out = Vec::new();
        match self {
            TagValue::Char(c) => out.push(*c),
            TagValue::Int8(v) => out.extend_from_slice(&v.to_le_bytes()),
            TagValue::UInt8(v) => out.push(*v),
            TagValue::Int16(v) => out.extend_from_slice(&v.to_le_bytes()),
            TagValue::UInt16(v) => out.extend_from_slice(&v.to_le_bytes()),
            TagValue::Int32(v) => out.extend_from_slice(&v.to_le_bytes()),
            TagValue::UInt32(v) => out.extend_from_slice(&v.to_le_bytes()),
            TagValue::Float32(v) => out.extend_from_slice(&v.to_le_bytes()),
            TagValue::Float64(v) => out.extend_from_slice(&v.to_le_bytes()),
            TagValue::String(text) | TagValue::Hex(text) => {
                if text.as_bytes().contains(&0) {
                    return Err(TagError::EmbeddedNul(
                        String::from_utf8_lossy(key).into_owned(),
                    ));
                }
                out.extend_from_slice(text.as_bytes());
                out.push(0);
            }
            TagValue::UInt8Array(values) => {
                encode_array_header(&mut out, TagType::UInt8, values.len());
                out.extend_from_slice(values);
            }
            TagValue::Int32Array(values) => {
                encode_array_header(&mut out, TagType::Int32, values.len());
                values
                    .iter()
                    .for_each(|v| out.extend_from_slice(&v.to_le_bytes()));
            }
            TagValue::Float32Array(values) => {
                encode_array_header(&mut out, TagType::Float32, values.len());
                values
                    .iter()
                    .for_each(|v| out.extend_from_slice(&v.to_le_bytes()));
            }
        }
        Ok(out)
    }
}

fn encode_array_header(out: &mut Vec<u8>, element: TagType, count: usize) {
    out.push(element.as_byte());
    out.extend_from_slice(&(count as u32).to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminators_round_trip() {
        for byte in b"AcCsSiIfdZHB" {
            let ty = TagType::from_byte(*byte).expect("known discriminator");
            assert_eq!(ty.as_byte(), *byte);
        }
        assert_eq!(TagType::from_byte(b'x'), None);
    }

    #[test]
    fn mismatched_accessors_return_defaults() {
        let payload = 7i32.to_le_bytes();
        let tag = Tag::new(*b"NM", TagType::Int32, &payload);
        assert_eq!(tag.to_int(), 7);
        assert_eq!(tag.to_f32(), 0.0);
        assert_eq!(tag.to_f64(), 0.0);
        assert_eq!(tag.to_char(), '\0');
        assert_eq!(tag.to_str(), "");
        assert!(tag.to_array().is_none());
    }

    #[test]
    fn unsigned_32_bit_values_are_not_sign_extended() {
        let payload = u32::MAX.to_le_bytes();
        let tag = Tag::new(*b"XU", TagType::UInt32, &payload);
        assert_eq!(tag.to_int(), i64::from(u32::MAX));
    }

    #[test]
    fn embedded_nul_is_rejected() {
        let value = TagValue::String("a\0b".to_string());
        assert_eq!(
            value.encode(b"XS"),
            Err(TagError::EmbeddedNul("XS".to_string()))
        );
    }
}
