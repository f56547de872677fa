//! File preamble, magic and the file meta group (0002,xxxx)
//!
//! The meta group is always explicit VR little endian, whatever the transfer
//! syntax of the main data set.

use tracing::{debug, warn};

use crate::config::CodecOptions;
use crate::cursor::{ByteReader, ByteWriter};
use crate::dataset::DataSet;
use crate::element::Element;
use crate::error::{DicomError, Result};
use crate::sequence;
use crate::tag::Tag;
use crate::transfer_syntax::{Endianness, TransferSyntax};
use crate::vr::Vr;
use crate::{MAGIC, PREAMBLE_LEN};

const META_SYNTAX: TransferSyntax = TransferSyntax::EXPLICIT_VR_LITTLE_ENDIAN;

/// Decoded file meta group
#[derive(Debug, Clone, PartialEq)]
pub struct FileMeta {
    pub preamble: [u8; PREAMBLE_LEN],
    pub elements: DataSet,
    /// UID exactly as stored in (0002,0010), padding removed
    pub transfer_syntax_uid: String,
    pub transfer_syntax: TransferSyntax,
    /// Byte position where the main data set starts
    pub end: usize,
}

/// Read preamble, magic and meta group from the start of `reader`.
///
/// The group ends at the boundary announced by (0002,0000). When that
/// element is missing, elements are read for as long as their group is 0x0002.
pub fn read_file_meta(reader: &mut ByteReader<'_>, options: &CodecOptions) -> Result<FileMeta> {
    reader.set_endianness(Endianness::Little);
    let preamble_bytes = reader
        .read_bytes(PREAMBLE_LEN)
        .map_err(|_| DicomError::MissingMagic {
            offset: PREAMBLE_LEN as u64,
        })?;
    let mut preamble = [0u8; PREAMBLE_LEN];
    preamble.copy_from_slice(preamble_bytes);

    let magic_offset = reader.offset();
    match reader.read_bytes(MAGIC.len()) {
        Ok(magic) if magic == MAGIC => {}
        _ => {
            return Err(DicomError::MissingMagic {
                offset: magic_offset,
            })
        }
    }

    let mut elements = DataSet::new();
    if !reader.is_at_end() && reader.peek_tag()? == Tag::FILE_META_GROUP_LENGTH {
        let group_length = sequence::decode_element(reader, META_SYNTAX, options)?;
        let length = group_length
            .to_u32s()
            .and_then(|values| values.first().copied())
            .unwrap_or(0) as usize;
        elements.insert(group_length);

        let start = reader.position();
        let end = start + length;
        if end > reader.len() {
            return Err(DicomError::truncated(
                reader.offset(),
                length,
                reader.len() - start,
            ));
        }

        let outer_limit = reader.limit();
        reader.set_limit(end);
        let group = sequence::decode_dataset(reader, META_SYNTAX, options);
        reader.set_limit(outer_limit);
        for element in group? {
            elements.insert(element);
        }
    } else {
        warn!(
            "File meta group has no group length at offset {}, reading while group is 0002",
            reader.offset()
        );
        while !reader.is_at_end() && reader.peek_tag()?.group() == 0x0002 {
            let element = sequence::decode_element(reader, META_SYNTAX, options)?;
            elements.insert(element);
        }
    }

    let uid = elements
        .string(Tag::TRANSFER_SYNTAX_UID)
        .ok_or(DicomError::MissingTransferSyntax {
            offset: reader.offset(),
        })?;
    let transfer_syntax = resolve_transfer_syntax(&uid, reader.offset(), options)?;
    debug!(
        "Read file meta group: {} elements, transfer syntax {} ({})",
        elements.len(),
        uid,
        transfer_syntax
    );

    Ok(FileMeta {
        preamble,
        elements,
        transfer_syntax_uid: uid,
        transfer_syntax,
        end: reader.position(),
    })
}

/// Map a Transfer Syntax UID to its framing rules, honouring
/// `strict_transfer_syntax` for unknown UIDs
pub fn resolve_transfer_syntax(
    uid: &str,
    offset: u64,
    options: &CodecOptions,
) -> Result<TransferSyntax> {
    match TransferSyntax::from_uid(uid) {
        Some(syntax) => Ok(syntax),
        None if options.strict_transfer_syntax => Err(DicomError::UnsupportedTransferSyntax {
            offset,
            uid: uid.to_string(),
        }),
        None => {
            warn!(
                "Unknown transfer syntax '{}', assuming explicit VR little endian",
                uid
            );
            Ok(TransferSyntax::EXPLICIT_VR_LITTLE_ENDIAN)
        }
    }
}

/// Encode preamble, magic and meta group.
///
/// Elements are written in tag order. Any (0002,0000) in `meta` is ignored;
/// the group length is computed from the encoded elements and patched in
/// after them.
pub fn encode_file_meta(
    meta: &DataSet,
    preamble: Option<&[u8; PREAMBLE_LEN]>,
    options: &CodecOptions,
) -> Result<Vec<u8>> {
    let mut writer = ByteWriter::with_capacity(PREAMBLE_LEN + 256, Endianness::Little);
    match preamble {
        Some(preamble) => writer.put_slice(preamble),
        None => writer.put_zeros(PREAMBLE_LEN),
    }
    writer.put_slice(MAGIC);

    let placeholder = Element::u32s(Tag::FILE_META_GROUP_LENGTH, Vr::UL, &[0]);
    sequence::encode_element(&mut writer, &placeholder, META_SYNTAX, options, 0)?;
    let length_at = writer.len() - 4;
    let group_start = writer.len();

    for element in meta.sorted() {
        if element.tag == Tag::FILE_META_GROUP_LENGTH {
            continue;
        }
        sequence::encode_element(&mut writer, element, META_SYNTAX, options, 0)?;
    }

    let group_length = writer.len() - group_start;
    let group_length = u32::try_from(group_length).map_err(|_| DicomError::LengthOverflow {
        tag: Tag::FILE_META_GROUP_LENGTH,
        vr: Vr::UL,
        length: group_length as u64,
    })?;
    writer.patch_u32(length_at, group_length);
    Ok(writer.into_vec())
}

/// Builds the meta group for a new document
#[derive(Debug, Clone, Default)]
pub struct FileMetaBuilder {
    transfer_syntax: Option<String>,
    media_storage_sop_class_uid: Option<String>,
    media_storage_sop_instance_uid: Option<String>,
    implementation_class_uid: Option<String>,
    implementation_version_name: Option<String>,
}

impl FileMetaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transfer_syntax(mut self, uid: impl Into<String>) -> Self {
        self.transfer_syntax = Some(uid.into());
        self
    }

    pub fn media_storage_sop_class_uid(mut self, uid: impl Into<String>) -> Self {
        self.media_storage_sop_class_uid = Some(uid.into());
        self
    }

    pub fn media_storage_sop_instance_uid(mut self, uid: impl Into<String>) -> Self {
        self.media_storage_sop_instance_uid = Some(uid.into());
        self
    }

    pub fn implementation_class_uid(mut self, uid: impl Into<String>) -> Self {
        self.implementation_class_uid = Some(uid.into());
        self
    }

    pub fn implementation_version_name(mut self, name: impl Into<String>) -> Self {
        self.implementation_version_name = Some(name.into());
        self
    }

    /// Build the meta elements. The transfer syntax is mandatory; the group
    /// length is left to the encoder.
    pub fn build(self) -> Result<DataSet> {
        let transfer_syntax = self
            .transfer_syntax
            .ok_or(DicomError::MissingTransferSyntax { offset: 0 })?;

        let mut meta = DataSet::new();
        meta.insert(Element::new(Tag::FILE_META_VERSION, Vr::OB, vec![0x00, 0x01]));
        let uids = [
            (Tag::MEDIA_STORAGE_SOP_CLASS_UID, self.media_storage_sop_class_uid),
            (Tag::MEDIA_STORAGE_SOP_INSTANCE_UID, self.media_storage_sop_instance_uid),
            (Tag::TRANSFER_SYNTAX_UID, Some(transfer_syntax)),
            (Tag::IMPLEMENTATION_CLASS_UID, self.implementation_class_uid),
        ];
        for (tag, uid) in uids {
            if let Some(uid) = uid {
                meta.insert(Element::text(tag, Vr::UI, &uid));
            }
        }
        if let Some(name) = self.implementation_version_name {
            meta.insert(Element::text(Tag::IMPLEMENTATION_VERSION_NAME, Vr::SH, &name));
        }
        Ok(meta)
    }
}
