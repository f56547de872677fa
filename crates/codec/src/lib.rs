//! DICOM data set codec
//!
//! This crate decodes and encodes the DICOM Part 10 binary format: the
//! 128-byte preamble, the `DICM` magic, the file meta group and the main
//! data set in the transfer syntax the meta group declares.
//!
//! # Features
//! - Explicit and implicit VR, little and big endian, deflated explicit VR
//! - Sequences and items with defined or undefined length, nested to any
//!   depth up to a configurable cap (decoded without call-stack recursion)
//! - Encapsulated pixel data fragments
//! - Byte offsets and spans on every element for byte-exact file surgery
//! - Pluggable tag dictionary for implicit VR streams

pub mod config;
pub mod cursor;
pub mod dataset;
pub mod dictionary;
pub mod document;
pub mod element;
pub mod error;
pub mod meta;
pub mod sequence;
pub mod tag;
pub mod transfer_syntax;
pub mod vr;

// Re-export commonly used types
pub use config::{CodecConfig, CodecOptions, DictionaryKind};
pub use dataset::DataSet;
pub use dictionary::{CustomDictionary, Dictionary, MinimalDictionary, StandardDictionary};
pub use document::DicomDocument;
pub use element::{Element, Value};
pub use error::{DicomError, Result};
pub use meta::FileMetaBuilder;
pub use sequence::Item;
pub use tag::Tag;
pub use transfer_syntax::{Endianness, TransferSyntax};
pub use vr::Vr;

/// Length of the file preamble in bytes
pub const PREAMBLE_LEN: usize = 128;

/// Magic bytes following the preamble
pub const MAGIC: &[u8; 4] = b"DICM";

/// Length field value marking a delimiter-terminated sequence, item or element
pub const UNDEFINED_LENGTH: u32 = 0xFFFF_FFFF;

/// Default cap on nested sequences
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 1024;

/// Default limit on the inflated size of a deflated data set (256 MiB)
pub const DEFAULT_MAX_INFLATED_SIZE: u64 = 256 * 1024 * 1024;
