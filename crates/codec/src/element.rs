//! Data elements and the VR-conditional header grammar

use std::borrow::Cow;

use bytes::Buf;
use tracing::warn;

use crate::config::CodecOptions;
use crate::cursor::{ByteReader, ByteWriter};
use crate::dictionary::Dictionary;
use crate::error::{DicomError, Result};
use crate::sequence::{self, Item};
use crate::tag::Tag;
use crate::transfer_syntax::{Endianness, TransferSyntax};
use crate::vr::{Vr, VrKind};
use crate::UNDEFINED_LENGTH;

/// Value of a data element
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Raw value bytes, without the padding byte added on encode
    Bytes(Vec<u8>),
    /// Items of a sequence
    Sequence(Vec<Item>),
    /// Encapsulated pixel data: item payloads in order, the first being the
    /// basic offset table
    Fragments(Vec<Vec<u8>>),
}

/// A decoded or to-be-encoded data element.
///
/// `offset` and `byte_len` locate the element in the source it was decoded
/// from: header, padded value and any trailing delimiter all fall inside
/// `offset..offset + byte_len`. Both are zero for elements built in memory.
#[derive(Debug, Clone)]
pub struct Element {
    pub tag: Tag,
    pub vr: Vr,
    /// Length field as written on the wire; `UNDEFINED_LENGTH` selects
    /// delimiter-terminated framing on encode
    pub length: u32,
    pub value: Value,
    pub offset: u64,
    pub byte_len: u64,
    /// Byte order of numeric values held in `Value::Bytes`
    pub endianness: Endianness,
}

/// Equality ignores source location and compares framing only by whether
/// the length is undefined.
impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.vr == other.vr
            && self.is_undefined_length() == other.is_undefined_length()
            && match (&self.value, &other.value) {
                (Value::Bytes(a), Value::Bytes(b)) => same_padded_value(
                    &reorder(self.vr, a, self.endianness, other.endianness),
                    b,
                ),
                (a, b) => a == b,
            }
    }
}

/// Equal bytes, or equal up to the single 0x00 that pads an odd-length value
fn same_padded_value(a: &[u8], b: &[u8]) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    match long.split_last() {
        _ if short.len() == long.len() => short == long,
        Some((&0, rest)) if short.len() % 2 == 1 => rest == short,
        _ => false,
    }
}

/// Tag, VR and length as read from the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementHeader {
    pub tag: Tag,
    pub vr: Vr,
    pub length: u32,
    /// Absolute offset of the first tag byte
    pub offset: u64,
}

impl ElementHeader {
    pub fn is_undefined_length(&self) -> bool {
        self.length == UNDEFINED_LENGTH
    }
}

/// Number of header bytes for an element with this VR
pub fn header_len(vr: Vr, syntax: TransferSyntax) -> usize {
    if syntax.explicit_vr && vr.has_long_length() {
        12
    } else {
        8
    }
}

/// Read tag, VR and length.
///
/// In explicit VR mode an unknown VR code fails with `UnrecognizedVr` when
/// `strict_vr` is set; otherwise it is read as UN with the long length form.
/// In implicit VR mode the VR comes from the dictionary.
pub fn read_header(
    reader: &mut ByteReader<'_>,
    syntax: TransferSyntax,
    options: &CodecOptions,
) -> Result<ElementHeader> {
    let offset = reader.offset();
    let tag = reader.read_tag()?;

    if !syntax.explicit_vr {
        let length = reader.read_u32()?;
        let vr = options.dictionary.default_vr(tag);
        return Ok(ElementHeader {
            tag,
            vr,
            length,
            offset,
        });
    }

    let code = reader.read_bytes(2)?;
    let code = [code[0], code[1]];
    let vr = match Vr::from_bytes(code) {
        Some(vr) => vr,
        None if options.strict_vr => {
            return Err(DicomError::UnrecognizedVr {
                offset: offset + 4,
                code,
            })
        }
        None => {
            warn!(
                "Unrecognized VR {:02X?} for {} at offset {}, reading as UN",
                code, tag, offset
            );
            Vr::UN
        }
    };

    let length = if vr.has_long_length() {
        reader.skip(2)?;
        reader.read_u32()?
    } else {
        reader.read_u16()? as u32
    };

    Ok(ElementHeader {
        tag,
        vr,
        length,
        offset,
    })
}

/// Write tag, VR and length. The caller has already checked that `length`
/// fits the VR's length field.
pub fn write_header(
    writer: &mut ByteWriter,
    tag: Tag,
    vr: Vr,
    length: u32,
    syntax: TransferSyntax,
) {
    writer.put_tag(tag);
    if !syntax.explicit_vr {
        writer.put_u32(length);
        return;
    }
    writer.put_slice(&vr.to_bytes());
    if vr.has_long_length() {
        writer.put_u16(0);
        writer.put_u32(length);
    } else {
        writer.put_u16(length as u16);
    }
}

/// Largest encodable value length for a VR under a transfer syntax
pub fn max_value_length(vr: Vr, syntax: TransferSyntax) -> u64 {
    if syntax.explicit_vr {
        vr.max_length()
    } else {
        (UNDEFINED_LENGTH - 1) as u64
    }
}

/// Width of the numeric units whose byte order follows the transfer syntax
fn swap_unit(vr: Vr) -> Option<usize> {
    match vr {
        Vr::US | Vr::SS | Vr::OW | Vr::AT => Some(2),
        Vr::UL | Vr::SL | Vr::FL | Vr::OL | Vr::OF => Some(4),
        Vr::FD | Vr::OD | Vr::SV | Vr::UV | Vr::OV => Some(8),
        _ => None,
    }
}

/// Numeric value bytes converted from one byte order to another
pub(crate) fn reorder(vr: Vr, bytes: &[u8], from: Endianness, to: Endianness) -> Cow<'_, [u8]> {
    match swap_unit(vr) {
        Some(width) if from != to => Cow::Owned(
            bytes
                .chunks(width)
                .flat_map(|unit| unit.iter().rev().copied())
                .collect(),
        ),
        _ => Cow::Borrowed(bytes),
    }
}

/// Strip the single 0x00 pad byte from a text value
pub(crate) fn strip_padding(vr: Vr, bytes: &[u8]) -> &[u8] {
    match bytes.split_last() {
        Some((&0, rest)) if vr.is_string() && bytes.len() % 2 == 0 => rest,
        _ => bytes,
    }
}

/// Encode a primitive (non-sequence, non-fragment) value
pub(crate) fn write_primitive(
    writer: &mut ByteWriter,
    element: &Element,
    bytes: &[u8],
    syntax: TransferSyntax,
) -> Result<()> {
    if element.is_undefined_length() {
        // Bytes must already carry their own item framing and delimiter
        if !element.vr.allows_undefined_length() {
            return Err(DicomError::InvalidUndefinedLength {
                offset: writer.len() as u64,
                tag: element.tag,
                vr: element.vr,
            });
        }
        write_header(writer, element.tag, element.vr, UNDEFINED_LENGTH, syntax);
        writer.put_slice(bytes);
        return Ok(());
    }

    let bytes = reorder(element.vr, bytes, element.endianness, syntax.endianness);
    let pad = element.vr.requires_padding() && bytes.len() % 2 == 1;
    let length = bytes.len() as u64 + pad as u64;
    if length > max_value_length(element.vr, syntax) {
        return Err(DicomError::LengthOverflow {
            tag: element.tag,
            vr: element.vr,
            length,
        });
    }

    write_header(writer, element.tag, element.vr, length as u32, syntax);
    writer.put_slice(&bytes);
    if pad {
        writer.put_zeros(1);
    }
    Ok(())
}

/// Encode encapsulated fragments: undefined length, one defined-length item
/// per fragment, closed by a sequence delimiter.
pub(crate) fn write_fragments(
    writer: &mut ByteWriter,
    element: &Element,
    fragments: &[Vec<u8>],
    syntax: TransferSyntax,
) -> Result<()> {
    if !element.vr.allows_undefined_length() {
        return Err(DicomError::InvalidUndefinedLength {
            offset: writer.len() as u64,
            tag: element.tag,
            vr: element.vr,
        });
    }
    write_header(writer, element.tag, element.vr, UNDEFINED_LENGTH, syntax);
    for fragment in fragments {
        if fragment.len() as u64 >= UNDEFINED_LENGTH as u64 {
            return Err(DicomError::LengthOverflow {
                tag: Tag::ITEM,
                vr: element.vr,
                length: fragment.len() as u64,
            });
        }
        writer.put_tag(Tag::ITEM);
        writer.put_u32(fragment.len() as u32);
        writer.put_slice(fragment);
    }
    writer.put_tag(Tag::SEQUENCE_DELIMITATION);
    writer.put_u32(0);
    Ok(())
}

/// Read encapsulated fragments up to and including the sequence delimiter
pub(crate) fn read_fragments(
    reader: &mut ByteReader<'_>,
    header: &ElementHeader,
) -> Result<Vec<Vec<u8>>> {
    let mut fragments = Vec::new();
    loop {
        let offset = reader.offset();
        let tag = reader.read_tag()?;
        let length = reader.read_u32()?;
        match tag {
            Tag::ITEM if length == UNDEFINED_LENGTH => {
                return Err(DicomError::InvalidUndefinedLength {
                    offset,
                    tag: header.tag,
                    vr: header.vr,
                })
            }
            Tag::ITEM => fragments.push(reader.read_bytes(length as usize)?.to_vec()),
            Tag::SEQUENCE_DELIMITATION if length == 0 => return Ok(fragments),
            Tag::SEQUENCE_DELIMITATION => {
                return Err(DicomError::InvalidDelimiter {
                    offset,
                    tag,
                    length,
                })
            }
            other => {
                return Err(DicomError::UnexpectedTag {
                    offset,
                    tag: other,
                    context: "expected fragment item or sequence delimiter",
                })
            }
        }
    }
}

impl Element {
    /// Element with a raw value; numeric bytes are little endian
    pub fn new(tag: Tag, vr: Vr, value: impl Into<Vec<u8>>) -> Self {
        let value = value.into();
        let padded = value.len() + (vr.requires_padding() && value.len() % 2 == 1) as usize;
        Self {
            tag,
            vr,
            length: u32::try_from(padded).unwrap_or(UNDEFINED_LENGTH - 1),
            value: Value::Bytes(value),
            offset: 0,
            byte_len: 0,
            endianness: Endianness::Little,
        }
    }

    /// Element holding a character value
    pub fn text(tag: Tag, vr: Vr, value: &str) -> Self {
        Self::new(tag, vr, value.as_bytes())
    }

    pub fn u16s(tag: Tag, vr: Vr, values: &[u16]) -> Self {
        Self::new(
            tag,
            vr,
            values.iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<u8>>(),
        )
    }

    pub fn u32s(tag: Tag, vr: Vr, values: &[u32]) -> Self {
        Self::new(
            tag,
            vr,
            values.iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<u8>>(),
        )
    }

    /// Sequence element with defined length framing
    pub fn sequence(tag: Tag, items: Vec<Item>) -> Self {
        Self {
            tag,
            vr: Vr::SQ,
            length: 0,
            value: Value::Sequence(items),
            offset: 0,
            byte_len: 0,
            endianness: Endianness::Little,
        }
    }

    /// Encapsulated pixel data element (always undefined length)
    pub fn fragments(tag: Tag, vr: Vr, fragments: Vec<Vec<u8>>) -> Self {
        Self {
            tag,
            vr,
            length: UNDEFINED_LENGTH,
            value: Value::Fragments(fragments),
            offset: 0,
            byte_len: 0,
            endianness: Endianness::Little,
        }
    }

    /// Switch to delimiter-terminated framing
    pub fn with_undefined_length(mut self) -> Self {
        self.length = UNDEFINED_LENGTH;
        self
    }

    pub fn is_undefined_length(&self) -> bool {
        self.length == UNDEFINED_LENGTH
    }

    /// Offset one past the last byte of this element in its source
    pub fn end_offset(&self) -> u64 {
        self.offset + self.byte_len
    }

    pub fn items(&self) -> Option<&[Item]> {
        match &self.value {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn items_mut(&mut self) -> Option<&mut Vec<Item>> {
        match &mut self.value {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.value {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Decode one element from the start of `data`, returning it with the
    /// number of bytes consumed
    pub fn decode(
        data: &[u8],
        syntax: TransferSyntax,
        options: &CodecOptions,
    ) -> Result<(Element, usize)> {
        let mut reader = ByteReader::new(data, syntax.endianness);
        let element = sequence::decode_element(&mut reader, syntax, options)?;
        Ok((element, reader.position()))
    }

    /// Encode this element (and any nested items) in the given syntax
    pub fn encode(&self, syntax: TransferSyntax, options: &CodecOptions) -> Result<Vec<u8>> {
        let mut writer = ByteWriter::new(syntax.endianness);
        sequence::encode_element(&mut writer, self, syntax, options, 0)?;
        Ok(writer.into_vec())
    }

    /// Character value with trailing space and NUL padding removed
    pub fn to_str(&self) -> Option<Cow<'_, str>> {
        if self.vr.kind() != VrKind::Text {
            return None;
        }
        let bytes = self.bytes()?;
        let trim = |s: &str| s.trim_end_matches(&[' ', '\0'][..]).len();
        Some(match String::from_utf8_lossy(bytes) {
            Cow::Borrowed(s) => Cow::Borrowed(&s[..trim(s)]),
            Cow::Owned(mut s) => {
                let len = trim(&s);
                s.truncate(len);
                Cow::Owned(s)
            }
        })
    }

    /// Backslash-separated values of a multi-valued character element
    pub fn to_strings(&self) -> Option<Vec<String>> {
        let value = self.to_str()?;
        if !self.vr.is_multi_valued_text() {
            return Some(vec![value.into_owned()]);
        }
        Some(
            value
                .split('\\')
                .map(|s| s.trim_matches(' ').to_string())
                .collect(),
        )
    }

    fn numbers<T, const N: usize>(
        &self,
        vrs: &[Vr],
        from: fn([u8; N], Endianness) -> T,
    ) -> Option<Vec<T>> {
        if !vrs.contains(&self.vr) {
            return None;
        }
        let bytes = self.bytes()?;
        Some(
            bytes
                .chunks_exact(N)
                .map(|chunk| {
                    let mut raw = [0u8; N];
                    raw.copy_from_slice(chunk);
                    from(raw, self.endianness)
                })
                .collect(),
        )
    }

    pub fn to_u16s(&self) -> Option<Vec<u16>> {
        self.numbers::<u16, 2>(&[Vr::US, Vr::OW], |b, e| match e {
            Endianness::Little => u16::from_le_bytes(b),
            Endianness::Big => u16::from_be_bytes(b),
        })
    }

    pub fn to_i16s(&self) -> Option<Vec<i16>> {
        self.numbers::<i16, 2>(&[Vr::SS], |b, e| match e {
            Endianness::Little => i16::from_le_bytes(b),
            Endianness::Big => i16::from_be_bytes(b),
        })
    }

    pub fn to_u32s(&self) -> Option<Vec<u32>> {
        self.numbers::<u32, 4>(&[Vr::UL, Vr::OL], |b, e| match e {
            Endianness::Little => u32::from_le_bytes(b),
            Endianness::Big => u32::from_be_bytes(b),
        })
    }

    pub fn to_i32s(&self) -> Option<Vec<i32>> {
        self.numbers::<i32, 4>(&[Vr::SL], |b, e| match e {
            Endianness::Little => i32::from_le_bytes(b),
            Endianness::Big => i32::from_be_bytes(b),
        })
    }

    pub fn to_f32s(&self) -> Option<Vec<f32>> {
        self.numbers::<f32, 4>(&[Vr::FL, Vr::OF], |b, e| match e {
            Endianness::Little => f32::from_le_bytes(b),
            Endianness::Big => f32::from_be_bytes(b),
        })
    }

    pub fn to_f64s(&self) -> Option<Vec<f64>> {
        self.numbers::<f64, 8>(&[Vr::FD, Vr::OD], |b, e| match e {
            Endianness::Little => f64::from_le_bytes(b),
            Endianness::Big => f64::from_be_bytes(b),
        })
    }

    pub fn to_tags(&self) -> Option<Vec<Tag>> {
        if self.vr != Vr::AT {
            return None;
        }
        let mut bytes = self.bytes()?;
        let mut tags = Vec::with_capacity(bytes.len() / 4);
        while bytes.remaining() >= 4 {
            let tag = match self.endianness {
                Endianness::Little => Tag(bytes.get_u16_le(), bytes.get_u16_le()),
                Endianness::Big => Tag(bytes.get_u16(), bytes.get_u16()),
            };
            tags.push(tag);
        }
        Some(tags)
    }

    /// Human-readable lines for this element, nested items indented by two
    /// spaces per level. Names come from the standard dictionary.
    pub fn describe(&self, indent: usize) -> Vec<String> {
        self.describe_with(indent, &crate::dictionary::StandardDictionary)
    }

    pub fn describe_with(&self, indent: usize, dictionary: &dyn Dictionary) -> Vec<String> {
        let mut lines = Vec::new();
        self.describe_into(indent, dictionary, &mut lines);
        lines
    }

    pub(crate) fn describe_into(
        &self,
        indent: usize,
        dictionary: &dyn Dictionary,
        lines: &mut Vec<String>,
    ) {
        let pad = "  ".repeat(indent);
        let name = dictionary.name(self.tag).unwrap_or("?");
        let length = if self.is_undefined_length() {
            "u/l".to_string()
        } else {
            self.length.to_string()
        };

        match &self.value {
            Value::Sequence(items) => {
                lines.push(format!(
                    "{}{} {} ({} items) # {}, {}",
                    pad,
                    self.tag,
                    self.vr,
                    items.len(),
                    length,
                    name
                ));
                for (index, item) in items.iter().enumerate() {
                    item.describe_into(indent + 1, index + 1, dictionary, lines);
                }
            }
            Value::Fragments(fragments) => {
                lines.push(format!(
                    "{}{} {} ({} fragments) # {}, {}",
                    pad,
                    self.tag,
                    self.vr,
                    fragments.len(),
                    length,
                    name
                ));
            }
            Value::Bytes(_) => {
                lines.push(format!(
                    "{}{} {} [{}] # {}, {}",
                    pad,
                    self.tag,
                    self.vr,
                    self.value_summary(),
                    length,
                    name
                ));
            }
        }
    }

    fn value_summary(&self) -> String {
        const MAX_TEXT: usize = 64;
        const MAX_NUMBERS: usize = 8;

        fn join<T: ToString>(values: Vec<T>) -> String {
            let shown: Vec<String> = values.iter().take(MAX_NUMBERS).map(T::to_string).collect();
            let more = if values.len() > MAX_NUMBERS { "\\..." } else { "" };
            format!("{}{}", shown.join("\\"), more)
        }

        if let Some(text) = self.to_str() {
            if text.chars().count() > MAX_TEXT {
                return format!("{}...", text.chars().take(MAX_TEXT).collect::<String>());
            }
            return text.into_owned();
        }
        let summary = match self.vr {
            Vr::US => self.to_u16s().map(join),
            Vr::SS => self.to_i16s().map(join),
            Vr::UL => self.to_u32s().map(join),
            Vr::SL => self.to_i32s().map(join),
            Vr::FL => self.to_f32s().map(join),
            Vr::FD => self.to_f64s().map(join),
            Vr::AT => self.to_tags().map(join),
            _ => None,
        };
        if let Some(summary) = summary {
            return summary;
        }
        let bytes = self.bytes().unwrap_or_default();
        let hex: Vec<String> = bytes.iter().take(16).map(|b| format!("{:02X}", b)).collect();
        let more = if bytes.len() > 16 { " ..." } else { "" };
        format!("{}{}", hex.join(" "), more)
    }
}
