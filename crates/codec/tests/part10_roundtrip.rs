use dicom_codec::{
    CodecOptions, CustomDictionary, DataSet, DicomDocument, Element, FileMetaBuilder, Item,
    StandardDictionary, Tag, TransferSyntax, Value, Vr,
};
use std::sync::Arc;
use tempfile::TempDir;

fn sample_value(vr: Vr) -> Element {
    let tag = Tag(0x0009, 0x1010);
    if vr.is_string() {
        Element::text(tag, vr, "ABC")
    } else {
        Element::new(tag, vr, vec![1, 2, 3, 4, 5, 6, 7, 8])
    }
}

#[test]
fn every_vr_survives_explicit_roundtrip() {
    let options = CodecOptions::default();
    for syntax in [
        TransferSyntax::EXPLICIT_VR_LITTLE_ENDIAN,
        TransferSyntax::EXPLICIT_VR_BIG_ENDIAN,
    ] {
        for vr in Vr::ALL.into_iter().filter(|vr| *vr != Vr::SQ) {
            let element = sample_value(vr);
            let bytes = element.encode(syntax, &options).expect("encode");
            assert_eq!(bytes.len() % 2, 0, "{} encodes to even length", vr);

            let (decoded, consumed) = Element::decode(&bytes, syntax, &options).expect("decode");
            assert_eq!(consumed, bytes.len());
            assert_eq!(decoded, element, "{} under {}", vr, syntax);
            if vr.is_string() {
                assert_eq!(decoded.bytes().unwrap().len(), 3, "{} pad byte stripped", vr);
            }
        }

        for vr in [Vr::OB, Vr::UN] {
            let element = Element::new(Tag(0x0009, 0x1011), vr, vec![7, 8, 9]);
            let bytes = element.encode(syntax, &options).expect("encode");
            let (decoded, _) = Element::decode(&bytes, syntax, &options).expect("decode");
            assert_eq!(decoded.bytes().unwrap(), &[7, 8, 9, 0]);
            assert_eq!(decoded, element, "odd-length {} under {}", vr, syntax);
        }
    }
}

#[test]
fn written_file_reads_back_with_offsets() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("sr.dcm");

    let meta = FileMetaBuilder::new()
        .transfer_syntax(TransferSyntax::EXPLICIT_VR_LITTLE_ENDIAN_UID)
        .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.88.11")
        .media_storage_sop_instance_uid("1.2.3.4.100")
        .implementation_version_name("SCAN_0_1")
        .build()
        .expect("meta");

    let inner: DataSet = [Element::text(Tag(0x0040, 0xA160), Vr::UT, "Nested text value")]
        .into_iter()
        .collect();
    let outer: DataSet = [
        Element::text(Tag(0x0040, 0xA040), Vr::CS, "CONTAINER"),
        Element::sequence(Tag(0x0040, 0xA730), vec![Item::new(inner)]),
    ]
    .into_iter()
    .collect();
    let dataset: DataSet = [
        Element::text(Tag(0x0010, 0x0010), Vr::PN, "ROE^RICHARD"),
        Element::sequence(
            Tag(0x0040, 0xA730),
            vec![Item::new(outer).with_undefined_length()],
        )
        .with_undefined_length(),
        Element::text(Tag(0x0072, 0x005F), Vr::AS, "012Y"),
    ]
    .into_iter()
    .collect();

    let document = DicomDocument::new(meta, dataset).expect("document");
    document
        .write_to_file(&path, &CodecOptions::default())
        .expect("write");

    let bytes = std::fs::read(&path).expect("read back");
    let reopened = DicomDocument::open(&path, &CodecOptions::default()).expect("open");
    assert_eq!(reopened.dataset, document.dataset);

    // every top-level element's recorded span covers exactly its own bytes
    let age = reopened.lookup(Tag(0x0072, 0x005F)).expect("age");
    let span = &bytes[age.offset as usize..age.end_offset() as usize];
    assert_eq!(span, &[0x72, 0x00, 0x5F, 0x00, b'A', b'S', 0x04, 0x00, b'0', b'1', b'2', b'Y']);

    let content = reopened.lookup(Tag(0x0040, 0xA730)).expect("content");
    assert_eq!(content.end_offset(), age.offset);
    assert_eq!(&bytes[age.offset as usize - 8..age.offset as usize], &[
        0xFE, 0xFF, 0xDD, 0xE0, 0, 0, 0, 0
    ]);

    let nested = &content.items().unwrap()[0].elements;
    let inner_sequence = nested.get(Tag(0x0040, 0xA730)).expect("inner sequence");
    let inner_items = inner_sequence.items().unwrap();
    assert_eq!(
        inner_items[0].elements.string(Tag(0x0040, 0xA160)).as_deref(),
        Some("Nested text value")
    );

    let lines = reopened.describe();
    assert!(lines
        .iter()
        .any(|l| l == "(0040,A730) SQ (1 items) # u/l, ContentSequence"));
    assert!(lines.iter().any(|l| l.starts_with("    (0040,A730) SQ (1 items)")));
}

#[test]
fn custom_dictionary_resolves_private_implicit_tags() {
    let private = Tag(0x0019, 0x1001);
    let data: Vec<u8> = [
        &[0x19, 0x00, 0x01, 0x10, 0x04, 0x00, 0x00, 0x00][..],
        &512u32.to_le_bytes()[..],
    ]
    .concat();
    let syntax = TransferSyntax::IMPLICIT_VR_LITTLE_ENDIAN;

    let (plain, _) = Element::decode(&data, syntax, &CodecOptions::default()).expect("decode");
    assert_eq!(plain.vr, Vr::UN);

    let dictionary = CustomDictionary::new(Arc::new(StandardDictionary)).with_entry(
        private,
        Vr::UL,
        Some("VendorCounter"),
    );
    let options = CodecOptions::default().with_dictionary(Arc::new(dictionary));
    let (typed, _) = Element::decode(&data, syntax, &options).expect("decode");
    assert_eq!(typed.vr, Vr::UL);
    assert_eq!(typed.to_u32s().unwrap(), vec![512]);
}

#[test]
fn encapsulated_pixel_data_survives_document_roundtrip() {
    let meta = FileMetaBuilder::new()
        .transfer_syntax("1.2.840.10008.1.2.4.50")
        .build()
        .expect("meta");
    let dataset: DataSet = [
        Element::u16s(Tag(0x0028, 0x0010), Vr::US, &[2]),
        Element::fragments(
            Tag::PIXEL_DATA,
            Vr::OB,
            vec![Vec::new(), vec![0xFF, 0xD8, 0x00, 0x00, 0xFF, 0xD9]],
        ),
    ]
    .into_iter()
    .collect();
    let document = DicomDocument::new(meta, dataset).expect("document");
    let bytes = document.encode(&CodecOptions::default()).expect("encode");

    let decoded = DicomDocument::from_bytes(&bytes, &CodecOptions::default()).expect("decode");
    match &decoded.lookup(Tag::PIXEL_DATA).expect("pixel data").value {
        Value::Fragments(fragments) => {
            assert_eq!(fragments.len(), 2);
            assert!(fragments[0].is_empty());
        }
        other => panic!("unexpected value: {:?}", other),
    }
    assert_eq!(decoded.encode(&CodecOptions::default()).expect("re-encode"), bytes);
}
