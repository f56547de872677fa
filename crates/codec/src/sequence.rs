//! Sequences and items.
//!
//! Decoding keeps open sequences and items on an explicit stack instead of
//! recursing, so adversarial nesting fails with `NestingTooDeep` rather than
//! exhausting the call stack. Encoding recurses but applies the same depth cap.

use tracing::warn;

use crate::config::CodecOptions;
use crate::cursor::{ByteReader, ByteWriter};
use crate::dataset::DataSet;
use crate::dictionary::Dictionary;
use crate::element::{self, Element, ElementHeader, Value};
use crate::error::{DicomError, Result};
use crate::tag::Tag;
use crate::transfer_syntax::TransferSyntax;
use crate::vr::Vr;
use crate::UNDEFINED_LENGTH;

/// One item of a sequence
#[derive(Debug, Clone, Default)]
pub struct Item {
    pub elements: DataSet,
    /// Length field as written on the wire; `UNDEFINED_LENGTH` selects
    /// item-delimiter framing on encode
    pub length: u32,
    pub offset: u64,
    pub byte_len: u64,
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.is_undefined_length() == other.is_undefined_length() && self.elements == other.elements
    }
}

impl Item {
    /// Item with defined length framing
    pub fn new(elements: DataSet) -> Self {
        Self {
            elements,
            length: 0,
            offset: 0,
            byte_len: 0,
        }
    }

    pub fn with_undefined_length(mut self) -> Self {
        self.length = UNDEFINED_LENGTH;
        self
    }

    pub fn is_undefined_length(&self) -> bool {
        self.length == UNDEFINED_LENGTH
    }

    pub(crate) fn describe_into(
        &self,
        indent: usize,
        number: usize,
        dictionary: &dyn Dictionary,
        lines: &mut Vec<String>,
    ) {
        let length = if self.is_undefined_length() {
            "u/l".to_string()
        } else {
            self.length.to_string()
        };
        lines.push(format!(
            "{}Item #{} ({} elements) # {}",
            "  ".repeat(indent),
            number,
            self.elements.len(),
            length
        ));
        for element in self.elements.iter() {
            element.describe_into(indent + 1, dictionary, lines);
        }
    }
}

struct OpenSequence {
    header: ElementHeader,
    end: Option<usize>,
    syntax: TransferSyntax,
    items: Vec<Item>,
}

struct OpenItem {
    length: u32,
    offset: u64,
    end: Option<usize>,
    syntax: TransferSyntax,
    elements: DataSet,
}

enum Frame {
    Sequence(OpenSequence),
    Item(OpenItem),
}

impl Frame {
    fn end(&self) -> Option<usize> {
        match self {
            Frame::Sequence(seq) => seq.end,
            Frame::Item(item) => item.end,
        }
    }

    fn syntax(&self) -> TransferSyntax {
        match self {
            Frame::Sequence(seq) => seq.syntax,
            Frame::Item(item) => item.syntax,
        }
    }
}

enum Step {
    Element(ElementHeader),
    OpenItem { length: u32, offset: u64 },
    CloseSequence,
    CloseItem,
    Done,
}

/// Decodes elements until the reader's limit, or until one top-level
/// element has been completed when `single` is set.
struct Decoder<'o> {
    options: &'o CodecOptions,
    root_syntax: TransferSyntax,
    root: DataSet,
    stack: Vec<Frame>,
    depth: usize,
}

impl<'o> Decoder<'o> {
    fn new(syntax: TransferSyntax, options: &'o CodecOptions) -> Self {
        Self {
            options,
            root_syntax: syntax,
            root: DataSet::new(),
            stack: Vec::new(),
            depth: 0,
        }
    }

    fn run(mut self, reader: &mut ByteReader<'_>, single: bool) -> Result<DataSet> {
        let outer_limit = reader.limit();
        let result = self.run_inner(reader, outer_limit, single);
        reader.set_limit(outer_limit);
        result.map(|_| self.root)
    }

    fn run_inner(
        &mut self,
        reader: &mut ByteReader<'_>,
        outer_limit: usize,
        single: bool,
    ) -> Result<()> {
        loop {
            // Reads are bounded by the innermost container with a defined length
            let bound = self
                .stack
                .iter()
                .rev()
                .find_map(Frame::end)
                .unwrap_or(outer_limit);
            reader.set_limit(bound);
            let syntax = self
                .stack
                .last()
                .map(Frame::syntax)
                .unwrap_or(self.root_syntax);
            reader.set_endianness(syntax.endianness);

            let step = match self.stack.last() {
                None => {
                    if reader.is_at_end() || (single && !self.root.is_empty()) {
                        Step::Done
                    } else {
                        Step::Element(element::read_header(reader, syntax, self.options)?)
                    }
                }
                Some(Frame::Sequence(seq)) => match seq.end {
                    Some(end) if reader.position() >= end => Step::CloseSequence,
                    _ => {
                        let offset = reader.offset();
                        let tag = reader.read_tag()?;
                        let length = reader.read_u32()?;
                        match tag {
                            Tag::ITEM => Step::OpenItem { length, offset },
                            Tag::SEQUENCE_DELIMITATION if seq.end.is_none() => {
                                check_delimiter(offset, tag, length)?;
                                Step::CloseSequence
                            }
                            other => {
                                return Err(DicomError::UnexpectedTag {
                                    offset,
                                    tag: other,
                                    context: "expected item or sequence delimiter",
                                })
                            }
                        }
                    }
                },
                Some(Frame::Item(item)) => match item.end {
                    Some(end) if reader.position() >= end => Step::CloseItem,
                    Some(_) => Step::Element(element::read_header(reader, syntax, self.options)?),
                    None => {
                        if reader.peek_tag()? == Tag::ITEM_DELIMITATION {
                            let offset = reader.offset();
                            let tag = reader.read_tag()?;
                            let length = reader.read_u32()?;
                            check_delimiter(offset, tag, length)?;
                            Step::CloseItem
                        } else {
                            Step::Element(element::read_header(reader, syntax, self.options)?)
                        }
                    }
                },
            };

            match step {
                Step::Done => return Ok(()),
                Step::Element(header) => self.start_element(reader, header, syntax, bound)?,
                Step::OpenItem { length, offset } => {
                    let end = defined_end(reader, length, bound)?;
                    self.stack.push(Frame::Item(OpenItem {
                        length,
                        offset,
                        end,
                        syntax,
                        elements: DataSet::new(),
                    }));
                }
                Step::CloseSequence => self.close_sequence(reader)?,
                Step::CloseItem => self.close_item(reader)?,
            }
        }
    }

    fn start_element(
        &mut self,
        reader: &mut ByteReader<'_>,
        header: ElementHeader,
        syntax: TransferSyntax,
        bound: usize,
    ) -> Result<()> {
        if header.tag.is_item_or_delimiter() {
            return Err(DicomError::UnexpectedTag {
                offset: header.offset,
                tag: header.tag,
                context: "item or delimiter outside a sequence",
            });
        }

        let undefined = header.is_undefined_length();
        // UN with undefined length is a sequence encoded in implicit VR little endian
        let is_sequence =
            header.vr == Vr::SQ || (header.vr == Vr::UN && undefined && header.tag != Tag::PIXEL_DATA);

        if is_sequence {
            let depth = self.depth + 1;
            self.options.check_depth(depth, header.offset)?;
            let end = defined_end(reader, header.length, bound)?;
            let content_syntax = if header.vr == Vr::UN {
                TransferSyntax::IMPLICIT_VR_LITTLE_ENDIAN
            } else {
                syntax
            };
            self.depth = depth;
            self.stack.push(Frame::Sequence(OpenSequence {
                header,
                end,
                syntax: content_syntax,
                items: Vec::new(),
            }));
            return Ok(());
        }

        let value = if undefined {
            if !header.vr.allows_undefined_length() {
                return Err(DicomError::InvalidUndefinedLength {
                    offset: header.offset,
                    tag: header.tag,
                    vr: header.vr,
                });
            }
            Value::Fragments(element::read_fragments(reader, &header)?)
        } else {
            let bytes = reader.read_bytes(header.length as usize)?;
            Value::Bytes(element::strip_padding(header.vr, bytes).to_vec())
        };

        let element = Element {
            tag: header.tag,
            vr: header.vr,
            length: header.length,
            value,
            offset: header.offset,
            byte_len: reader.offset() - header.offset,
            endianness: syntax.endianness,
        };
        self.insert(element)
    }

    fn insert(&mut self, element: Element) -> Result<()> {
        let offset = element.offset;
        let tag = element.tag;
        let target = match self.stack.last_mut() {
            None => &mut self.root,
            Some(Frame::Item(item)) => &mut item.elements,
            Some(Frame::Sequence(_)) => {
                return Err(DicomError::UnexpectedTag {
                    offset,
                    tag,
                    context: "element directly inside a sequence",
                })
            }
        };
        if target.insert(element).is_some() {
            warn!("Duplicate tag {} at offset {}, keeping the last value", tag, offset);
        }
        Ok(())
    }

    fn close_sequence(&mut self, reader: &ByteReader<'_>) -> Result<()> {
        let Some(Frame::Sequence(seq)) = self.stack.pop() else {
            return Ok(());
        };
        self.depth -= 1;
        let element = Element {
            tag: seq.header.tag,
            vr: seq.header.vr,
            length: seq.header.length,
            value: Value::Sequence(seq.items),
            offset: seq.header.offset,
            byte_len: reader.offset() - seq.header.offset,
            endianness: seq.syntax.endianness,
        };
        self.insert(element)
    }

    fn close_item(&mut self, reader: &ByteReader<'_>) -> Result<()> {
        let Some(Frame::Item(open)) = self.stack.pop() else {
            return Ok(());
        };
        let item = Item {
            elements: open.elements,
            length: open.length,
            offset: open.offset,
            byte_len: reader.offset() - open.offset,
        };
        match self.stack.last_mut() {
            Some(Frame::Sequence(seq)) => {
                seq.items.push(item);
                Ok(())
            }
            _ => Err(DicomError::UnexpectedTag {
                offset: open.offset,
                tag: Tag::ITEM,
                context: "item outside a sequence",
            }),
        }
    }
}

fn check_delimiter(offset: u64, tag: Tag, length: u32) -> Result<()> {
    if length != 0 {
        return Err(DicomError::InvalidDelimiter {
            offset,
            tag,
            length,
        });
    }
    Ok(())
}

/// Buffer position where a container with this length ends, or `None` for
/// undefined length. A defined length must fit inside the enclosing bound.
fn defined_end(reader: &ByteReader<'_>, length: u32, bound: usize) -> Result<Option<usize>> {
    if length == UNDEFINED_LENGTH {
        return Ok(None);
    }
    let end = reader.position() + length as usize;
    if end > bound {
        return Err(DicomError::truncated(
            reader.offset(),
            length as usize,
            bound.saturating_sub(reader.position()),
        ));
    }
    Ok(Some(end))
}

/// Decode elements until the reader's limit
pub fn decode_dataset(
    reader: &mut ByteReader<'_>,
    syntax: TransferSyntax,
    options: &CodecOptions,
) -> Result<DataSet> {
    Decoder::new(syntax, options).run(reader, false)
}

/// Decode exactly one top-level element (with everything nested inside it)
pub fn decode_element(
    reader: &mut ByteReader<'_>,
    syntax: TransferSyntax,
    options: &CodecOptions,
) -> Result<Element> {
    let offset = reader.offset();
    let mut dataset = Decoder::new(syntax, options).run(reader, true)?;
    dataset
        .pop_first()
        .ok_or_else(|| DicomError::truncated(offset, 8, 0))
}

/// Encode every element of a data set in insertion order
pub fn encode_dataset(
    writer: &mut ByteWriter,
    dataset: &DataSet,
    syntax: TransferSyntax,
    options: &CodecOptions,
    depth: usize,
) -> Result<()> {
    for element in dataset.iter() {
        encode_element(writer, element, syntax, options, depth)?;
    }
    Ok(())
}

/// Encode one element; `depth` is the number of sequences enclosing it
pub fn encode_element(
    writer: &mut ByteWriter,
    element: &Element,
    syntax: TransferSyntax,
    options: &CodecOptions,
    depth: usize,
) -> Result<()> {
    match &element.value {
        Value::Bytes(bytes) => element::write_primitive(writer, element, bytes, syntax),
        Value::Fragments(fragments) => element::write_fragments(writer, element, fragments, syntax),
        Value::Sequence(items) => encode_sequence(writer, element, items, syntax, options, depth + 1),
    }
}

/// Encode a sequence. Defined length framing writes the total byte count of
/// all encoded items; undefined length framing appends a sequence delimiter.
pub fn encode_sequence(
    writer: &mut ByteWriter,
    element: &Element,
    items: &[Item],
    syntax: TransferSyntax,
    options: &CodecOptions,
    depth: usize,
) -> Result<()> {
    options.check_depth(depth, writer.len() as u64)?;
    // a defined-length UN reads back as raw bytes, so it cannot carry items
    let holds_items = element.vr == Vr::SQ
        || (element.vr == Vr::UN && element.is_undefined_length() && element.tag != Tag::PIXEL_DATA);
    if !holds_items {
        return Err(DicomError::InvalidSequenceVr {
            tag: element.tag,
            vr: element.vr,
        });
    }

    let content_syntax = if element.vr == Vr::UN {
        TransferSyntax::IMPLICIT_VR_LITTLE_ENDIAN
    } else {
        syntax
    };
    let mut body = ByteWriter::new(content_syntax.endianness);
    for item in items {
        encode_item(&mut body, item, content_syntax, options, depth)?;
    }

    if element.is_undefined_length() {
        body.put_tag(Tag::SEQUENCE_DELIMITATION);
        body.put_u32(0);
        element::write_header(writer, element.tag, element.vr, UNDEFINED_LENGTH, syntax);
    } else {
        let length = body.len() as u64;
        if length > element::max_value_length(element.vr, syntax) {
            return Err(DicomError::LengthOverflow {
                tag: element.tag,
                vr: element.vr,
                length,
            });
        }
        element::write_header(writer, element.tag, element.vr, length as u32, syntax);
    }
    writer.put_slice(body.as_slice());
    Ok(())
}

/// Encode one item with its header and, for undefined length, its delimiter
pub fn encode_item(
    writer: &mut ByteWriter,
    item: &Item,
    syntax: TransferSyntax,
    options: &CodecOptions,
    depth: usize,
) -> Result<()> {
    let mut body = ByteWriter::new(syntax.endianness);
    encode_dataset(&mut body, &item.elements, syntax, options, depth)?;

    writer.put_tag(Tag::ITEM);
    if item.is_undefined_length() {
        writer.put_u32(UNDEFINED_LENGTH);
        writer.put_slice(body.as_slice());
        writer.put_tag(Tag::ITEM_DELIMITATION);
        writer.put_u32(0);
    } else {
        let length = body.len() as u64;
        if length >= UNDEFINED_LENGTH as u64 {
            return Err(DicomError::LengthOverflow {
                tag: Tag::ITEM,
                vr: Vr::SQ,
                length,
            });
        }
        writer.put_u32(length as u32);
        writer.put_slice(body.as_slice());
    }
    Ok(())
}
