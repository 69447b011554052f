//! Segmented identifier codec.
//!
//! An [`InternalId`] encodes a [`Section`] followed by an ordered list of
//! segments. One of two layouts is used, marked by the high bit of the first
//! byte.
//!
//! Packed (high bit clear), used when there are at most 255 segments and every
//! segment is at most 255 bytes:
//!
//! ```text
//! [section][count][len_0]..[len_n][data_0]..[data_n]
//! ```
//!
//! Segment lengths are stored up front so any segment can be located without
//! scanning the payload.
//!
//! Delimited (high bit set), used for everything else:
//!
//! ```text
//! [section | 0x80][data_0] 0x00 [data_1] 0x00 .. [data_n]
//! ```
//!
//! NUL never appears in catalog names, so it's used as the separator.
//!
//! Both layouts are persisted and must stay decodable forever.
use std::borrow::Cow;
use std::fmt::{self, Write as _};

use bytes::{BufMut, Bytes, BytesMut};
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{IdentError, Result, malformed};
use crate::section::Section;

/// High bit of the first byte, set for the delimited layout.
pub const FORMAT_MASK: u8 = 0x80;

/// Segment separator for the delimited layout.
pub const SEPARATOR: u8 = 0x00;

/// Max segment count and segment length representable in the packed layout.
pub const MAX_PACKED: usize = u8::MAX as usize;

/// Opaque identifier for a catalog object.
///
/// Cloning is cheap. The null id is the empty byte sequence.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct InternalId(Bytes);

impl InternalId {
    pub const NULL: InternalId = InternalId(Bytes::new());

    /// Encode an id, choosing the packed layout when possible.
    ///
    /// The null section always produces the null id, whatever segments were
    /// provided.
    pub fn new<S: AsRef<[u8]>>(section: Section, segments: &[S]) -> Self {
        if section.is_null() {
            return Self::NULL;
        }
        if !fits_packed(segments) {
            return Self::encode_delimited(section, segments);
        }

        let data_len: usize = segments.iter().map(|s| s.as_ref().len()).sum();
        let mut buf = BytesMut::with_capacity(2 + segments.len() + data_len);
        buf.put_u8(section.as_u8());
        buf.put_u8(segments.len() as u8);
        for segment in segments {
            buf.put_u8(segment.as_ref().len() as u8);
        }
        for segment in segments {
            buf.put_slice(segment.as_ref());
        }

        InternalId(buf.freeze())
    }

    /// Encode an id, rejecting inputs that wouldn't decode back to the same
    /// section and segments.
    pub fn encode<S: AsRef<[u8]>>(section: Section, segments: &[S]) -> Result<Self> {
        if section.is_null() {
            if segments.is_empty() {
                return Ok(Self::NULL);
            }
            return Err(IdentError::InvalidSection);
        }

        if !fits_packed(segments) {
            if let Some(index) = segments
                .iter()
                .position(|s| s.as_ref().contains(&SEPARATOR))
            {
                return Err(IdentError::InvalidSegment { index });
            }
        }

        Ok(Self::new(section, segments))
    }

    /// Encode an id using the delimited layout regardless of segment sizes.
    pub fn encode_delimited<S: AsRef<[u8]>>(section: Section, segments: &[S]) -> Self {
        if section.is_null() {
            return Self::NULL;
        }

        let data_len: usize = segments.iter().map(|s| s.as_ref().len()).sum();
        let mut buf = BytesMut::with_capacity(1 + data_len + segments.len());
        buf.put_u8(section.as_u8() | FORMAT_MASK);
        for (idx, segment) in segments.iter().enumerate() {
            if idx > 0 {
                buf.put_u8(SEPARATOR);
            }
            buf.put_slice(segment.as_ref());
        }

        InternalId(buf.freeze())
    }

    /// Validate and wrap bytes read back from storage.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        let Some(&first) = bytes.first() else {
            return Ok(Self::NULL);
        };

        let section = Section::try_from(first & !FORMAT_MASK)?;
        if section.is_null() {
            return Err(malformed!("non-empty id with null section"));
        }

        if first & FORMAT_MASK == 0 {
            let count = *bytes
                .get(1)
                .ok_or_else(|| malformed!("missing segment count"))?
                as usize;
            let lengths = bytes
                .get(2..2 + count)
                .ok_or_else(|| malformed!("expected {count} segment lengths"))?;
            let expected: usize = lengths.iter().map(|&len| len as usize).sum();
            let actual = bytes.len() - 2 - count;
            if expected != actual {
                return Err(malformed!(
                    "segment lengths sum to {expected}, but payload is {actual} bytes"
                ));
            }
        }

        Ok(InternalId(bytes))
    }

    /// Section of this id, `Null` for the null id.
    pub fn section(&self) -> Section {
        match self.0.first() {
            Some(&first) => Section::ALL
                .get((first & !FORMAT_MASK) as usize)
                .copied()
                .unwrap_or(Section::Null),
            None => Section::Null,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn is_delimited(&self) -> bool {
        self.0.first().is_some_and(|b| b & FORMAT_MASK == FORMAT_MASK)
    }

    /// Iterate over the segments.
    pub fn segments_iter(&self) -> Segments<'_> {
        let inner = match self.0.first() {
            None => SegmentsInner::Packed {
                lengths: &[],
                data: &[],
            },
            Some(b) if b & FORMAT_MASK == FORMAT_MASK => {
                let payload = &self.0[1..];
                SegmentsInner::Delimited {
                    rest: (!payload.is_empty()).then_some(payload),
                }
            }
            Some(_) => {
                let count = self.0.get(1).copied().unwrap_or(0) as usize;
                let header_end = (2 + count).min(self.0.len());
                SegmentsInner::Packed {
                    lengths: &self.0[2.min(header_end)..header_end],
                    data: &self.0[header_end..],
                }
            }
        };

        Segments { inner }
    }

    /// Decode all segments.
    pub fn segments(&self) -> Vec<&[u8]> {
        self.segments_iter().collect()
    }

    /// Segment at `index`, or an empty slice if out of range.
    pub fn segment(&self, index: usize) -> &[u8] {
        self.segments_iter().nth(index).unwrap_or(&[])
    }

    /// Segment at `index` as a string, replacing invalid UTF-8.
    pub fn segment_str(&self, index: usize) -> Cow<'_, str> {
        String::from_utf8_lossy(self.segment(index))
    }

    /// Decode the segment at `index` as an embedded id.
    ///
    /// The returned id shares this id's buffer. Empty or out of range segments
    /// decode to the null id.
    pub fn nested(&self, index: usize) -> Result<InternalId> {
        let segment = self.segment(index);
        if segment.is_empty() {
            return Ok(Self::NULL);
        }
        Self::from_bytes(self.0.slice_ref(segment))
    }

    pub fn segment_count(&self) -> usize {
        if self.is_delimited() {
            return self.segments_iter().count();
        }
        self.0.get(1).copied().unwrap_or(0) as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render the raw bytes as a double-quoted string literal suitable for
    /// pasting into source.
    ///
    /// Header bytes are always written as `\xNN` escapes. Payload bytes are
    /// escaped when they aren't printable ASCII, or are a quote or backslash.
    pub fn literal(&self) -> String {
        let mut s = String::with_capacity(self.0.len() * 2 + 2);
        s.push('"');

        let header_len = match self.0.first() {
            None => 0,
            Some(b) if b & FORMAT_MASK == FORMAT_MASK => 1,
            Some(_) => (2 + self.0.get(1).copied().unwrap_or(0) as usize).min(self.0.len()),
        };

        for &b in &self.0[..header_len] {
            let _ = write!(s, "\\x{b:02x}");
        }
        for &b in &self.0[header_len..] {
            if b == b' ' || (b.is_ascii_graphic() && b != b'"' && b != b'\\') {
                s.push(b as char);
            } else {
                let _ = write!(s, "\\x{b:02x}");
            }
        }

        s.push('"');
        s
    }
}

fn fits_packed<S: AsRef<[u8]>>(segments: &[S]) -> bool {
    segments.len() <= MAX_PACKED && segments.iter().all(|s| s.as_ref().len() <= MAX_PACKED)
}

/// Iterator over the segments of an [`InternalId`].
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    inner: SegmentsInner<'a>,
}

#[derive(Debug, Clone)]
enum SegmentsInner<'a> {
    Packed { lengths: &'a [u8], data: &'a [u8] },
    Delimited { rest: Option<&'a [u8]> },
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            SegmentsInner::Packed { lengths, data } => {
                let (&len, remaining_lengths) = lengths.split_first()?;
                let segment = data.get(..len as usize)?;
                *lengths = remaining_lengths;
                *data = &data[len as usize..];
                Some(segment)
            }
            SegmentsInner::Delimited { rest } => {
                let buf = rest.take()?;
                match buf.iter().position(|&b| b == SEPARATOR) {
                    Some(pos) => {
                        *rest = Some(&buf[pos + 1..]);
                        Some(&buf[..pos])
                    }
                    None => Some(buf),
                }
            }
        }
    }
}

impl fmt::Display for InternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}:[", self.section())?;
        for (idx, segment) in self.segments_iter().enumerate() {
            if idx > 0 {
                write!(f, ",")?;
            }
            write!(f, "\"{}\"", String::from_utf8_lossy(segment))?;
        }
        write!(f, "]}}")
    }
}

impl fmt::Debug for InternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Serialize for InternalId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for InternalId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_bytes(InternalIdVisitor)
    }
}

struct InternalIdVisitor;

impl<'de> Visitor<'de> for InternalIdVisitor {
    type Value = InternalId;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "encoded internal id bytes")
    }

    fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        InternalId::from_bytes(Bytes::copy_from_slice(v)).map_err(E::custom)
    }

    fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        InternalId::from_bytes(v).map_err(E::custom)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut buf = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(b) = seq.next_element::<u8>()? {
            buf.push(b);
        }
        InternalId::from_bytes(buf).map_err(de::Error::custom)
    }
}
