//! Whole Part 10 documents: meta group plus main data set

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use tracing::debug;

use crate::config::CodecOptions;
use crate::cursor::ByteReader;
use crate::dataset::DataSet;
use crate::element::Element;
use crate::error::{DicomError, Result};
use crate::meta;
use crate::sequence;
use crate::tag::Tag;
use crate::transfer_syntax::{Endianness, TransferSyntax};
use crate::{MAGIC, PREAMBLE_LEN};

/// A fully decoded DICOM file.
///
/// Decoding either yields a complete document or an error; there is no
/// partially decoded state.
#[derive(Debug, Clone, PartialEq)]
pub struct DicomDocument {
    pub preamble: [u8; PREAMBLE_LEN],
    /// File meta group, always explicit VR little endian
    pub meta: DataSet,
    /// Main data set in `transfer_syntax`
    pub dataset: DataSet,
    pub transfer_syntax: TransferSyntax,
    /// Where the document was read from, if it came from a file
    pub path: Option<PathBuf>,
}

impl DicomDocument {
    /// Assemble a document from a meta group and a data set. The transfer
    /// syntax is resolved from (0002,0010).
    pub fn new(meta: DataSet, dataset: DataSet) -> Result<Self> {
        let uid = meta
            .string(Tag::TRANSFER_SYNTAX_UID)
            .ok_or(DicomError::MissingTransferSyntax { offset: 0 })?;
        let transfer_syntax = TransferSyntax::from_uid(&uid).ok_or(
            DicomError::UnsupportedTransferSyntax {
                offset: 0,
                uid: uid.clone(),
            },
        )?;
        Ok(Self {
            preamble: [0u8; PREAMBLE_LEN],
            meta,
            dataset,
            transfer_syntax,
            path: None,
        })
    }

    /// Read and decode a file
    pub fn open(path: impl AsRef<Path>, options: &CodecOptions) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let mut document = Self::from_bytes(&data, options)?;
        debug!(
            "Decoded {}: {} elements, {}",
            path.display(),
            document.dataset.len(),
            document.transfer_syntax
        );
        document.path = Some(path.to_path_buf());
        Ok(document)
    }

    /// Decode a complete Part 10 stream.
    ///
    /// Input too short to hold the preamble and magic, or without `DICM` at
    /// offset 128, is reported as `NotADicomFile`.
    pub fn from_bytes(data: &[u8], options: &CodecOptions) -> Result<Self> {
        if data.len() < PREAMBLE_LEN + MAGIC.len() {
            return Err(DicomError::not_dicom(format!(
                "{} bytes is too short for preamble and magic",
                data.len()
            )));
        }

        let mut reader = ByteReader::new(data, Endianness::Little);
        let file_meta = match meta::read_file_meta(&mut reader, options) {
            Ok(file_meta) => file_meta,
            Err(DicomError::MissingMagic { offset }) => {
                return Err(DicomError::not_dicom(format!(
                    "no DICM magic at offset {}",
                    offset
                )))
            }
            Err(err) => return Err(err),
        };
        let syntax = file_meta.transfer_syntax;

        let dataset = if syntax.deflated {
            let inflated = inflate(
                &data[file_meta.end..],
                options.max_inflated_size,
                file_meta.end as u64,
            )?;
            // offsets continue from the end of the meta group as if the
            // inflated data set were stored in place
            let mut inner = ByteReader::new(&inflated, syntax.endianness)
                .with_base_offset(file_meta.end as u64);
            sequence::decode_dataset(&mut inner, syntax, options)?
        } else {
            sequence::decode_dataset(&mut reader, syntax, options)?
        };

        Ok(Self {
            preamble: file_meta.preamble,
            meta: file_meta.elements,
            dataset,
            transfer_syntax: syntax,
            path: None,
        })
    }

    /// Find an element; group 0002 tags are looked up in the meta group
    pub fn lookup(&self, tag: Tag) -> Option<&Element> {
        if tag.group() == 0x0002 {
            self.meta.get(tag)
        } else {
            self.dataset.get(tag)
        }
    }

    /// Meta elements then data set elements, each in insertion order
    pub fn all_elements(&self) -> impl Iterator<Item = &Element> {
        self.meta.iter().chain(self.dataset.iter())
    }

    /// Every top-level element ordered by (group, element)
    pub fn sorted_elements(&self) -> Vec<&Element> {
        let mut elements: Vec<&Element> = self.all_elements().collect();
        elements.sort_by_key(|element| element.tag);
        elements
    }

    /// Human-readable dump of the whole document in tag order
    pub fn describe(&self) -> Vec<String> {
        let dictionary = crate::dictionary::StandardDictionary;
        let mut lines = Vec::new();
        for element in self.sorted_elements() {
            lines.extend(element.describe_with(0, &dictionary));
        }
        lines
    }

    /// Encode the whole document. Nothing is returned unless every element
    /// encoded successfully.
    pub fn encode(&self, options: &CodecOptions) -> Result<Vec<u8>> {
        let mut bytes = meta::encode_file_meta(&self.meta, Some(&self.preamble), options)?;
        let body = self.dataset.encode(self.transfer_syntax, options)?;
        if self.transfer_syntax.deflated {
            let mut encoder = DeflateEncoder::new(bytes, Compression::default());
            encoder
                .write_all(&body)
                .map_err(|e| DicomError::Deflate(e.to_string()))?;
            bytes = encoder
                .finish()
                .map_err(|e| DicomError::Deflate(e.to_string()))?;
        } else {
            bytes.extend_from_slice(&body);
        }
        Ok(bytes)
    }

    /// Encode and write to `path`. The file is only created once encoding
    /// has succeeded.
    pub fn write_to_file(&self, path: impl AsRef<Path>, options: &CodecOptions) -> Result<()> {
        let bytes = self.encode(options)?;
        std::fs::write(path.as_ref(), &bytes)?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.as_ref().display());
        Ok(())
    }
}

/// Inflate at most `limit` bytes; one byte more means the stream is too large
fn inflate(data: &[u8], limit: u64, offset: u64) -> Result<Vec<u8>> {
    let mut inflated = Vec::with_capacity(data.len().saturating_mul(4).min(limit as usize));
    DeflateDecoder::new(data)
        .take(limit.saturating_add(1))
        .read_to_end(&mut inflated)
        .map_err(|e| DicomError::Deflate(e.to_string()))?;
    if inflated.len() as u64 > limit {
        return Err(DicomError::InflatedTooLarge { offset, limit });
    }
    Ok(inflated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::FileMetaBuilder;
    use crate::sequence::Item;
    use crate::vr::Vr;
    use tempfile::TempDir;

    fn options() -> CodecOptions {
        CodecOptions::default()
    }

    fn document(uid: &str) -> DicomDocument {
        let meta = FileMetaBuilder::new()
            .transfer_syntax(uid)
            .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.7")
            .media_storage_sop_instance_uid("1.2.3.4.5.6.7")
            .build()
            .unwrap();
        let item: DataSet = [Element::text(Tag(0x0008, 0x1150), Vr::UI, "1.2.840.10008.5.1.4.1.1.2")]
            .into_iter()
            .collect();
        let dataset: DataSet = [
            Element::text(Tag(0x0008, 0x0060), Vr::CS, "OT"),
            Element::sequence(Tag(0x0008, 0x1140), vec![Item::new(item)]).with_undefined_length(),
            Element::text(Tag(0x0010, 0x0010), Vr::PN, "DOE^JOHN"),
            Element::u16s(Tag(0x0028, 0x0010), Vr::US, &[64]),
        ]
        .into_iter()
        .collect();
        DicomDocument::new(meta, dataset).unwrap()
    }

    #[test]
    fn test_roundtrip_every_native_syntax() {
        for uid in [
            TransferSyntax::IMPLICIT_VR_LITTLE_ENDIAN_UID,
            TransferSyntax::EXPLICIT_VR_LITTLE_ENDIAN_UID,
            TransferSyntax::EXPLICIT_VR_BIG_ENDIAN_UID,
            TransferSyntax::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN_UID,
        ] {
            let original = document(uid);
            let bytes = original.encode(&options()).unwrap();
            let decoded = DicomDocument::from_bytes(&bytes, &options()).unwrap();
            assert_eq!(decoded.transfer_syntax, original.transfer_syntax, "{}", uid);
            assert_eq!(decoded.dataset, original.dataset, "{}", uid);
            assert_eq!(
                decoded.lookup(Tag(0x0028, 0x0010)).unwrap().to_u16s().unwrap(),
                vec![64]
            );
        }
    }

    #[test]
    fn test_element_offsets_are_absolute() {
        let bytes = document(TransferSyntax::EXPLICIT_VR_LITTLE_ENDIAN_UID)
            .encode(&options())
            .unwrap();
        let decoded = DicomDocument::from_bytes(&bytes, &options()).unwrap();
        let first_meta = decoded.meta.iter().next().unwrap();
        assert_eq!(first_meta.offset, 132);

        let last = decoded.dataset.iter().last().unwrap();
        assert_eq!(last.end_offset() as usize, bytes.len());
        let modality = decoded.lookup(Tag(0x0008, 0x0060)).unwrap();
        let start = modality.offset as usize;
        assert_eq!(&bytes[start..start + 4], &[0x08, 0x00, 0x60, 0x00]);
    }

    #[test]
    fn test_short_or_unmarked_input_is_not_dicom() {
        let err = DicomDocument::from_bytes(b"hello", &options()).unwrap_err();
        assert!(err.is_recoverable());

        let mut bytes = document(TransferSyntax::EXPLICIT_VR_LITTLE_ENDIAN_UID)
            .encode(&options())
            .unwrap();
        bytes[128..132].copy_from_slice(b"XXXX");
        let err = DicomDocument::from_bytes(&bytes, &options()).unwrap_err();
        assert!(matches!(err, DicomError::NotADicomFile { .. }));
    }

    #[test]
    fn test_inflated_size_is_capped() {
        let mut doc = document(TransferSyntax::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN_UID);
        doc.dataset
            .insert(Element::new(Tag(0x7FE0, 0x0010), Vr::OB, vec![0u8; 1 << 20]));
        let bytes = doc.encode(&options()).unwrap();
        assert!(bytes.len() < 16 * 1024);

        let capped = options().with_max_inflated_size(64 * 1024);
        let err = DicomDocument::from_bytes(&bytes, &capped).unwrap_err();
        match err {
            DicomError::InflatedTooLarge { offset, limit } => {
                assert_eq!(limit, 64 * 1024);
                assert!(offset > 132 && (offset as usize) < bytes.len());
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let roomy = options().with_max_inflated_size(2 << 20);
        let decoded = DicomDocument::from_bytes(&bytes, &roomy).unwrap();
        assert_eq!(decoded.dataset, doc.dataset);
    }

    #[test]
    fn test_truncated_main_dataset_is_fatal() {
        let bytes = document(TransferSyntax::EXPLICIT_VR_LITTLE_ENDIAN_UID)
            .encode(&options())
            .unwrap();
        let err = DicomDocument::from_bytes(&bytes[..bytes.len() - 1], &options()).unwrap_err();
        assert!(!err.is_recoverable());
        assert!(err.offset().is_some());
    }

    #[test]
    fn test_lookup_and_sorted_elements() {
        let doc = document(TransferSyntax::EXPLICIT_VR_LITTLE_ENDIAN_UID);
        assert!(doc.lookup(Tag::TRANSFER_SYNTAX_UID).is_some());
        assert!(doc.lookup(Tag(0x0020, 0x000D)).is_none());

        let tags: Vec<Tag> = doc.sorted_elements().iter().map(|e| e.tag).collect();
        let mut expected = tags.clone();
        expected.sort();
        assert_eq!(tags, expected);
        assert_eq!(doc.all_elements().count(), doc.meta.len() + doc.dataset.len());

        let lines = doc.describe();
        assert!(lines.iter().any(|l| l.starts_with("(0010,0010) PN [DOE^JOHN]")));
        assert!(lines.iter().any(|l| l.starts_with("  Item #1")));
    }

    #[test]
    fn test_write_and_open() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("image.dcm");
        let doc = document(TransferSyntax::EXPLICIT_VR_LITTLE_ENDIAN_UID);
        doc.write_to_file(&path, &options()).unwrap();

        let opened = DicomDocument::open(&path, &options()).unwrap();
        assert_eq!(opened.path.as_deref(), Some(path.as_path()));
        assert_eq!(opened.dataset, doc.dataset);
    }

    #[test]
    fn test_failed_encode_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.dcm");
        let mut doc = document(TransferSyntax::EXPLICIT_VR_LITTLE_ENDIAN_UID);
        doc.dataset
            .insert(Element::new(Tag(0x0010, 0x0020), Vr::LO, vec![b'A'; 70_000]));

        let err = doc.write_to_file(&path, &options()).unwrap_err();
        assert!(matches!(err, DicomError::LengthOverflow { .. }));
        assert!(!path.exists());
    }
}
