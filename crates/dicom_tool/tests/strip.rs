use dicom_codec::{
    CodecOptions, DataSet, DicomDocument, Element, FileMetaBuilder, Item, Tag, TransferSyntax, Vr,
};
use dicom_tool as tool;
use tool::ToolError;

fn encode(uid: &str, dataset: DataSet) -> Vec<u8> {
    let meta = FileMetaBuilder::new()
        .transfer_syntax(uid)
        .build()
        .expect("meta");
    DicomDocument::new(meta, dataset)
        .expect("document")
        .encode(&CodecOptions::default())
        .expect("encode")
}

fn sample() -> DataSet {
    let reference: DataSet = [
        Element::text(Tag(0x0008, 0x1150), Vr::UI, "1.2.840.10008.5.1.4.1.1.2"),
        Element::text(Tag(0x0008, 0x1155), Vr::UI, "1.2.3.4.5"),
    ]
    .into_iter()
    .collect();
    [
        Element::text(Tag(0x0008, 0x0060), Vr::CS, "CT"),
        Element::sequence(Tag(0x0008, 0x1140), vec![Item::new(reference).with_undefined_length()])
            .with_undefined_length(),
        Element::text(Tag(0x0010, 0x0010), Vr::PN, "DOE^JOHN"),
        Element::text(Tag(0x0010, 0x0020), Vr::LO, "ID42"),
    ]
    .into_iter()
    .collect()
}

#[test]
fn strip_top_level_element_keeps_other_bytes() {
    let options = CodecOptions::default();
    let source = encode(TransferSyntax::EXPLICIT_VR_LITTLE_ENDIAN_UID, sample());
    let stripped = tool::strip_tag(&source, Tag(0x0010, 0x0010), &options).expect("strip");

    // PN header (8) + "DOE^JOHN" (8)
    assert_eq!(source.len() - stripped.len(), 16);
    let document = DicomDocument::from_bytes(&stripped, &options).expect("decode");
    assert!(document.lookup(Tag(0x0010, 0x0010)).is_none());
    assert_eq!(document.dataset.string(Tag(0x0010, 0x0020)).as_deref(), Some("ID42"));

    let mut expected = sample();
    expected.remove(Tag(0x0010, 0x0010));
    assert_eq!(stripped, encode(TransferSyntax::EXPLICIT_VR_LITTLE_ENDIAN_UID, expected));
}

#[test]
fn strip_nested_element_inside_undefined_length_containers() {
    let options = CodecOptions::default();
    let source = encode(TransferSyntax::IMPLICIT_VR_LITTLE_ENDIAN_UID, sample());
    let stripped = tool::strip_tag(&source, Tag(0x0008, 0x1155), &options).expect("strip");

    let document = DicomDocument::from_bytes(&stripped, &options).expect("decode");
    let items = document.lookup(Tag(0x0008, 0x1140)).unwrap().items().unwrap();
    assert_eq!(items[0].elements.len(), 1);
    assert!(items[0].elements.get(Tag(0x0008, 0x1155)).is_none());
}

#[test]
fn strip_refuses_unsafe_targets() {
    let options = CodecOptions::default();

    let mut defined = sample();
    defined.insert(Element::sequence(
        Tag(0x0008, 0x1140),
        vec![Item::new(
            [Element::text(Tag(0x0008, 0x1155), Vr::UI, "1.2.3.4.5")]
                .into_iter()
                .collect(),
        )],
    ));
    let source = encode(TransferSyntax::EXPLICIT_VR_LITTLE_ENDIAN_UID, defined);
    assert!(matches!(
        tool::strip_tag(&source, Tag(0x0008, 0x1155), &options),
        Err(ToolError::InsideDefinedLength(_))
    ));

    let source = encode(TransferSyntax::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN_UID, sample());
    assert!(matches!(
        tool::strip_tag(&source, Tag(0x0010, 0x0010), &options),
        Err(ToolError::Deflated)
    ));

    let source = encode(TransferSyntax::EXPLICIT_VR_LITTLE_ENDIAN_UID, sample());
    assert!(matches!(
        tool::strip_tag(&source, Tag::TRANSFER_SYNTAX_UID, &options),
        Err(ToolError::MetaElement(_))
    ));
    assert!(matches!(
        tool::strip_tag(&source, Tag(0x0020, 0x000D), &options),
        Err(ToolError::NotFound(_))
    ));
    assert!(matches!(
        tool::strip_tag(b"not dicom", Tag(0x0010, 0x0010), &options),
        Err(ToolError::Decode(_))
    ));
}
