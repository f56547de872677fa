//! Error types for decoding and encoding

use thiserror::Error;

use crate::tag::Tag;
use crate::vr::Vr;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, DicomError>;

/// Error types that can occur while decoding or encoding a data set
///
/// Decode variants carry the absolute byte offset at which the problem was
/// detected.
#[derive(Error, Debug)]
pub enum DicomError {
    #[error("Not a DICOM file: {reason}")]
    NotADicomFile { reason: String },

    #[error("Missing DICM magic at offset {offset}")]
    MissingMagic { offset: u64 },

    #[error("Truncated stream at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedStream {
        offset: u64,
        needed: u64,
        available: u64,
    },

    #[error("Unrecognized VR code {code:02X?} at offset {offset}")]
    UnrecognizedVr { offset: u64, code: [u8; 2] },

    #[error("Undefined length not allowed for {tag} with VR {vr} at offset {offset}")]
    InvalidUndefinedLength { offset: u64, tag: Tag, vr: Vr },

    #[error("Value of {tag} ({length} bytes) exceeds the length field of VR {vr}")]
    LengthOverflow { tag: Tag, vr: Vr, length: u64 },

    #[error("File meta group has no Transfer Syntax UID (0002,0010)")]
    MissingTransferSyntax { offset: u64 },

    #[error("Unsupported transfer syntax '{uid}'")]
    UnsupportedTransferSyntax { offset: u64, uid: String },

    #[error("{tag} with VR {vr} cannot hold items: use SQ, or UN with undefined length")]
    InvalidSequenceVr { tag: Tag, vr: Vr },

    #[error("Sequence nesting deeper than {limit} at offset {offset}")]
    NestingTooDeep { offset: u64, limit: usize },

    #[error("Unexpected tag {tag} at offset {offset}: {context}")]
    UnexpectedTag {
        offset: u64,
        tag: Tag,
        context: &'static str,
    },

    #[error("Delimiter {tag} at offset {offset} has non-zero length {length}")]
    InvalidDelimiter { offset: u64, tag: Tag, length: u32 },

    #[error("Deflated data set at offset {offset} inflates past {limit} bytes")]
    InflatedTooLarge { offset: u64, limit: u64 },

    #[error("Deflate error: {0}")]
    Deflate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DicomError {
    /// Create a truncation error
    pub fn truncated(offset: u64, needed: usize, available: usize) -> Self {
        Self::TruncatedStream {
            offset,
            needed: needed as u64,
            available: available as u64,
        }
    }

    /// Create a not-a-DICOM-file error
    pub fn not_dicom(reason: impl Into<String>) -> Self {
        Self::NotADicomFile {
            reason: reason.into(),
        }
    }

    /// Byte offset at which a decode error was detected, if any
    pub fn offset(&self) -> Option<u64> {
        match self {
            DicomError::MissingMagic { offset }
            | DicomError::TruncatedStream { offset, .. }
            | DicomError::UnrecognizedVr { offset, .. }
            | DicomError::InvalidUndefinedLength { offset, .. }
            | DicomError::MissingTransferSyntax { offset }
            | DicomError::UnsupportedTransferSyntax { offset, .. }
            | DicomError::NestingTooDeep { offset, .. }
            | DicomError::UnexpectedTag { offset, .. }
            | DicomError::InvalidDelimiter { offset, .. }
            | DicomError::InflatedTooLarge { offset, .. } => Some(*offset),
            DicomError::NotADicomFile { .. }
            | DicomError::LengthOverflow { .. }
            | DicomError::InvalidSequenceVr { .. }
            | DicomError::Deflate(_)
            | DicomError::Io(_) => None,
        }
    }

    /// Check if this error only means the input should be skipped
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DicomError::NotADicomFile { .. })
    }
}
