//! Tag dictionaries: default VR lookup for implicit VR streams and display
//! names for rendering.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dicom_core::dictionary::{DataDictionary, DataDictionaryEntry};
use dicom_dictionary_std::StandardDataDictionary;
use once_cell::sync::Lazy;

use crate::tag::Tag;
use crate::vr::Vr;

static STANDARD: StandardDataDictionary = StandardDataDictionary;

/// Maps tags to their default VR and name
pub trait Dictionary: Send + Sync + fmt::Debug {
    /// VR registered for the tag, if the dictionary knows it
    fn lookup_vr(&self, tag: Tag) -> Option<Vr>;

    /// Keyword of the tag, if the dictionary knows it
    fn name(&self, tag: Tag) -> Option<&str> {
        let _ = tag;
        None
    }

    /// VR to use for an implicit VR element. Group lengths are UL and
    /// private creators LO regardless of the registry; unknown tags are UN.
    fn default_vr(&self, tag: Tag) -> Vr {
        if tag.is_group_length() {
            return Vr::UL;
        }
        if tag.is_private_creator() {
            return Vr::LO;
        }
        self.lookup_vr(tag).unwrap_or(Vr::UN)
    }
}

/// The full standard registry from `dicom-dictionary-std`
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardDictionary;

impl Dictionary for StandardDictionary {
    fn lookup_vr(&self, tag: Tag) -> Option<Vr> {
        let entry = STANDARD.by_tag(tag.into())?;
        // Context-dependent VRs (US or SS, OB or OW) resolve to their relaxed form
        Vr::from_bytes(entry.vr().relaxed().to_bytes())
    }

    fn name(&self, tag: Tag) -> Option<&str> {
        STANDARD.by_tag(tag.into()).map(|entry| entry.alias())
    }
}

static MINIMAL_ENTRIES: Lazy<HashMap<Tag, (Vr, &'static str)>> = Lazy::new(|| {
    [
        (Tag(0x0002, 0x0000), Vr::UL, "FileMetaInformationGroupLength"),
        (Tag(0x0002, 0x0001), Vr::OB, "FileMetaInformationVersion"),
        (Tag(0x0002, 0x0002), Vr::UI, "MediaStorageSOPClassUID"),
        (Tag(0x0002, 0x0003), Vr::UI, "MediaStorageSOPInstanceUID"),
        (Tag(0x0002, 0x0010), Vr::UI, "TransferSyntaxUID"),
        (Tag(0x0002, 0x0012), Vr::UI, "ImplementationClassUID"),
        (Tag(0x0002, 0x0013), Vr::SH, "ImplementationVersionName"),
        (Tag(0x0002, 0x0016), Vr::AE, "SourceApplicationEntityTitle"),
        (Tag(0x0008, 0x0005), Vr::CS, "SpecificCharacterSet"),
        (Tag(0x0008, 0x0008), Vr::CS, "ImageType"),
        (Tag(0x0008, 0x0016), Vr::UI, "SOPClassUID"),
        (Tag(0x0008, 0x0018), Vr::UI, "SOPInstanceUID"),
        (Tag(0x0008, 0x0020), Vr::DA, "StudyDate"),
        (Tag(0x0008, 0x0030), Vr::TM, "StudyTime"),
        (Tag(0x0008, 0x0050), Vr::SH, "AccessionNumber"),
        (Tag(0x0008, 0x0060), Vr::CS, "Modality"),
        (Tag(0x0008, 0x0070), Vr::LO, "Manufacturer"),
        (Tag(0x0008, 0x0090), Vr::PN, "ReferringPhysicianName"),
        (Tag(0x0008, 0x1030), Vr::LO, "StudyDescription"),
        (Tag(0x0008, 0x103E), Vr::LO, "SeriesDescription"),
        (Tag(0x0008, 0x1140), Vr::SQ, "ReferencedImageSequence"),
        (Tag(0x0008, 0x1150), Vr::UI, "ReferencedSOPClassUID"),
        (Tag(0x0008, 0x1155), Vr::UI, "ReferencedSOPInstanceUID"),
        (Tag(0x0010, 0x0010), Vr::PN, "PatientName"),
        (Tag(0x0010, 0x0020), Vr::LO, "PatientID"),
        (Tag(0x0010, 0x0030), Vr::DA, "PatientBirthDate"),
        (Tag(0x0010, 0x0040), Vr::CS, "PatientSex"),
        (Tag(0x0010, 0x1010), Vr::AS, "PatientAge"),
        (Tag(0x0018, 0x0050), Vr::DS, "SliceThickness"),
        (Tag(0x0020, 0x000D), Vr::UI, "StudyInstanceUID"),
        (Tag(0x0020, 0x000E), Vr::UI, "SeriesInstanceUID"),
        (Tag(0x0020, 0x0010), Vr::SH, "StudyID"),
        (Tag(0x0020, 0x0011), Vr::IS, "SeriesNumber"),
        (Tag(0x0020, 0x0013), Vr::IS, "InstanceNumber"),
        (Tag(0x0020, 0x0032), Vr::DS, "ImagePositionPatient"),
        (Tag(0x0020, 0x0037), Vr::DS, "ImageOrientationPatient"),
        (Tag(0x0028, 0x0002), Vr::US, "SamplesPerPixel"),
        (Tag(0x0028, 0x0004), Vr::CS, "PhotometricInterpretation"),
        (Tag(0x0028, 0x0008), Vr::IS, "NumberOfFrames"),
        (Tag(0x0028, 0x0010), Vr::US, "Rows"),
        (Tag(0x0028, 0x0011), Vr::US, "Columns"),
        (Tag(0x0028, 0x0030), Vr::DS, "PixelSpacing"),
        (Tag(0x0028, 0x0100), Vr::US, "BitsAllocated"),
        (Tag(0x0028, 0x0101), Vr::US, "BitsStored"),
        (Tag(0x0028, 0x0102), Vr::US, "HighBit"),
        (Tag(0x0028, 0x0103), Vr::US, "PixelRepresentation"),
        (Tag(0x0028, 0x1050), Vr::DS, "WindowCenter"),
        (Tag(0x0028, 0x1051), Vr::DS, "WindowWidth"),
        (Tag(0x0040, 0xA730), Vr::SQ, "ContentSequence"),
        (Tag(0x0072, 0x005F), Vr::AS, "SelectorASValue"),
        (Tag(0x7FE0, 0x0010), Vr::OW, "PixelData"),
    ]
    .into_iter()
    .map(|(tag, vr, name)| (tag, (vr, name)))
    .collect()
});

/// A small built-in table: the file meta group and the common patient,
/// study, series and image attributes.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinimalDictionary;

impl Dictionary for MinimalDictionary {
    fn lookup_vr(&self, tag: Tag) -> Option<Vr> {
        MINIMAL_ENTRIES.get(&tag).map(|(vr, _)| *vr)
    }

    fn name(&self, tag: Tag) -> Option<&str> {
        MINIMAL_ENTRIES.get(&tag).map(|(_, name)| *name)
    }
}

/// Caller-registered entries layered over another dictionary
#[derive(Debug, Clone)]
pub struct CustomDictionary {
    base: Arc<dyn Dictionary>,
    entries: HashMap<Tag, (Vr, Option<String>)>,
}

impl CustomDictionary {
    pub fn new(base: Arc<dyn Dictionary>) -> Self {
        Self {
            base,
            entries: HashMap::new(),
        }
    }

    /// Register (or override) a tag
    pub fn insert(&mut self, tag: Tag, vr: Vr, name: Option<&str>) -> &mut Self {
        self.entries.insert(tag, (vr, name.map(str::to_string)));
        self
    }

    pub fn with_entry(mut self, tag: Tag, vr: Vr, name: Option<&str>) -> Self {
        self.insert(tag, vr, name);
        self
    }
}

impl Dictionary for CustomDictionary {
    fn lookup_vr(&self, tag: Tag) -> Option<Vr> {
        match self.entries.get(&tag) {
            Some((vr, _)) => Some(*vr),
            None => self.base.lookup_vr(tag),
        }
    }

    fn name(&self, tag: Tag) -> Option<&str> {
        match self.entries.get(&tag) {
            Some((_, Some(name))) => Some(name.as_str()),
            _ => self.base.name(tag),
        }
    }

    fn default_vr(&self, tag: Tag) -> Vr {
        // Explicit registrations win over the structural rules too
        match self.entries.get(&tag) {
            Some((vr, _)) => *vr,
            None => self.base.default_vr(tag),
        }
    }
}
