use dicom_scan::codec::{DataSet, DicomDocument, Element, FileMetaBuilder, Tag, TransferSyntax, Vr};
use dicom_scan::{walk_directory, Config, DirectoryParser, FileOutcome, ScanError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn load_config_from_str(toml: &str) -> Config {
    Config::from_toml_str(toml).expect("config should parse and validate")
}

fn dicom_bytes(patient_id: &str, uid: &str) -> Vec<u8> {
    let meta = FileMetaBuilder::new()
        .transfer_syntax(uid)
        .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.7")
        .media_storage_sop_instance_uid(format!("1.2.3.{}", patient_id.len()))
        .build()
        .expect("meta");
    let dataset: DataSet = [
        Element::text(Tag(0x0008, 0x0060), Vr::CS, "OT"),
        Element::text(Tag(0x0010, 0x0020), Vr::LO, patient_id),
    ]
    .into_iter()
    .collect();
    DicomDocument::new(meta, dataset)
        .expect("document")
        .encode(&Default::default())
        .expect("encode")
}

/// Lays out `valid` DICOM files, `text` non-DICOM files and `broken`
/// truncated DICOM files across nested directories.
fn populate(root: &Path, valid: usize, text: usize, broken: usize) {
    let syntaxes = [
        TransferSyntax::IMPLICIT_VR_LITTLE_ENDIAN_UID,
        TransferSyntax::EXPLICIT_VR_LITTLE_ENDIAN_UID,
        TransferSyntax::EXPLICIT_VR_BIG_ENDIAN_UID,
        TransferSyntax::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN_UID,
    ];
    for i in 0..valid {
        let dir = root.join(format!("study{}/series{}", i % 3, i % 2));
        std::fs::create_dir_all(&dir).unwrap();
        let bytes = dicom_bytes(&format!("PID{:03}", i), syntaxes[i % syntaxes.len()]);
        std::fs::write(dir.join(format!("img{:03}.dcm", i)), bytes).unwrap();
    }
    for i in 0..text {
        std::fs::write(root.join(format!("notes{}.txt", i)), b"not an image").unwrap();
    }
    let dir = root.join("broken");
    std::fs::create_dir_all(&dir).unwrap();
    for i in 0..broken {
        let bytes = dicom_bytes("CUT", TransferSyntax::EXPLICIT_VR_LITTLE_ENDIAN_UID);
        std::fs::write(dir.join(format!("cut{}.dcm", i)), &bytes[..bytes.len() - 3]).unwrap();
    }
}

#[tokio::test]
async fn test_every_file_is_reported_once() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path(), 20, 5, 4);

    for workers in [1, 3, 64] {
        let config = load_config_from_str(&format!("[scan]\nworkers = {}\n", workers));
        let mut seen = HashSet::new();
        let mut patient_ids = HashSet::new();
        let summary = walk_directory(temp_dir.path(), &config, |outcome| {
            assert!(seen.insert(outcome.path().to_path_buf()), "reported twice");
            if let FileOutcome::Parsed { document, .. } = outcome {
                let id = document.dataset.string(Tag(0x0010, 0x0020)).unwrap();
                patient_ids.insert(id);
            }
        })
        .await
        .expect("scan");

        assert_eq!(summary.total, 29, "workers = {}", workers);
        assert_eq!(summary.parsed, 20);
        assert_eq!(summary.skipped, 5);
        assert_eq!(summary.failed, 4);
        assert_eq!(summary.parsed + summary.skipped + summary.failed, summary.total);
        assert_eq!(seen.len(), 29);
        assert_eq!(patient_ids.len(), 20);
        assert!(summary
            .failures
            .iter()
            .all(|f| f.path.starts_with(temp_dir.path().join("broken"))));
    }
}

#[tokio::test]
async fn test_parsed_documents_keep_their_path() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path(), 3, 0, 0);

    let config = load_config_from_str("[scan]\nworkers = 2\n");
    let mut documents = Vec::new();
    walk_directory(temp_dir.path(), &config, |outcome| {
        if let FileOutcome::Parsed { path, document } = outcome {
            documents.push((path, document));
        }
    })
    .await
    .expect("scan");

    assert_eq!(documents.len(), 3);
    for (path, document) in documents {
        assert_eq!(document.path.as_deref(), Some(path.as_path()));
    }
}

#[tokio::test]
async fn test_size_cap_fails_without_aborting_batch() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path(), 4, 0, 0);
    std::fs::write(temp_dir.path().join("huge.bin"), vec![0u8; 64 * 1024]).unwrap();

    let config = load_config_from_str(
        r#"
        [scan]
        workers = 2
        max_file_size = 4096
        "#,
    );
    let summary = walk_directory(temp_dir.path(), &config, |_| {})
        .await
        .expect("scan");
    assert_eq!(summary.total, 5);
    assert_eq!(summary.parsed, 4);
    assert_eq!(summary.failed, 1);
    assert!(summary.failures[0].error.contains("limit is 4096"));
}

#[tokio::test]
async fn test_strict_codec_config_reaches_workers() {
    let temp_dir = TempDir::new().unwrap();
    let mut bytes = dicom_bytes("PID", TransferSyntax::EXPLICIT_VR_LITTLE_ENDIAN_UID);
    let len = bytes.len();
    // LO element is last: 8-byte header, 4-byte value; corrupt its VR
    bytes[len - 8..len - 6].copy_from_slice(b"ZZ");
    std::fs::write(temp_dir.path().join("odd_vr.dcm"), &bytes).unwrap();

    // permissive mode reads the unknown VR as UN with a 4-byte length,
    // which then runs past the end of the file
    let permissive = load_config_from_str("");
    let summary = walk_directory(temp_dir.path(), &permissive, |_| {})
        .await
        .expect("scan");
    assert_eq!(summary.failed, 1);
    assert!(summary.failures[0].error.contains("Truncated stream"));

    let strict = load_config_from_str("[codec]\nstrict_vr = true\n");
    let summary = walk_directory(temp_dir.path(), &strict, |_| {})
        .await
        .expect("scan");
    assert_eq!(summary.failed, 1);
    assert!(summary.failures[0].error.contains("Unrecognized VR"));
}

#[tokio::test]
async fn test_missing_root_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::default();
    let result = walk_directory(temp_dir.path().join("absent"), &config, |_| {}).await;
    assert!(matches!(result, Err(ScanError::Io(_))));
}

#[tokio::test]
async fn test_parse_paths_with_fewer_workers_than_files() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path(), 12, 0, 0);
    let paths: Vec<PathBuf> = list_files(temp_dir.path());
    assert_eq!(paths.len(), 12);

    let parser = DirectoryParser::new(2, Default::default());
    let mut count = 0;
    let summary = parser.parse_paths(paths, |_| count += 1).await;
    assert_eq!(count, 12);
    assert_eq!(summary.parsed, 12);
}

fn list_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files
}
