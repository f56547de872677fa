//! Data element tags

use std::fmt;
use std::str::FromStr;

/// A (group, element) pair identifying a data element.
///
/// Ordering is numeric: group first, then element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub u16, pub u16);

impl Tag {
    /// Item (FFFE,E000)
    pub const ITEM: Tag = Tag(0xFFFE, 0xE000);
    /// Item Delimitation Item (FFFE,E00D)
    pub const ITEM_DELIMITATION: Tag = Tag(0xFFFE, 0xE00D);
    /// Sequence Delimitation Item (FFFE,E0DD)
    pub const SEQUENCE_DELIMITATION: Tag = Tag(0xFFFE, 0xE0DD);

    /// File Meta Information Group Length
    pub const FILE_META_GROUP_LENGTH: Tag = Tag(0x0002, 0x0000);
    /// File Meta Information Version
    pub const FILE_META_VERSION: Tag = Tag(0x0002, 0x0001);
    /// Media Storage SOP Class UID
    pub const MEDIA_STORAGE_SOP_CLASS_UID: Tag = Tag(0x0002, 0x0002);
    /// Media Storage SOP Instance UID
    pub const MEDIA_STORAGE_SOP_INSTANCE_UID: Tag = Tag(0x0002, 0x0003);
    /// Transfer Syntax UID
    pub const TRANSFER_SYNTAX_UID: Tag = Tag(0x0002, 0x0010);
    /// Implementation Class UID
    pub const IMPLEMENTATION_CLASS_UID: Tag = Tag(0x0002, 0x0012);
    /// Implementation Version Name
    pub const IMPLEMENTATION_VERSION_NAME: Tag = Tag(0x0002, 0x0013);

    /// Pixel Data
    pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

    pub fn group(self) -> u16 {
        self.0
    }

    pub fn element(self) -> u16 {
        self.1
    }

    /// Whether this is one of the three item/delimiter tags of group FFFE
    pub fn is_item_or_delimiter(self) -> bool {
        self == Tag::ITEM || self == Tag::ITEM_DELIMITATION || self == Tag::SEQUENCE_DELIMITATION
    }

    /// Group length tags have the form (gggg,0000)
    pub fn is_group_length(self) -> bool {
        self.1 == 0x0000
    }

    pub fn is_private(self) -> bool {
        self.0 % 2 == 1
    }

    /// Private creator tags reserve blocks of private elements: (odd,0010-00FF)
    pub fn is_private_creator(self) -> bool {
        self.is_private() && (0x0010..=0x00FF).contains(&self.1)
    }
}

impl From<(u16, u16)> for Tag {
    fn from((group, element): (u16, u16)) -> Self {
        Tag(group, element)
    }
}

impl From<u32> for Tag {
    fn from(value: u32) -> Self {
        Tag((value >> 16) as u16, value as u16)
    }
}

impl From<Tag> for u32 {
    fn from(tag: Tag) -> Self {
        ((tag.0 as u32) << 16) | tag.1 as u32
    }
}

impl From<Tag> for dicom_core::Tag {
    fn from(tag: Tag) -> Self {
        dicom_core::Tag(tag.0, tag.1)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.0, self.1)
    }
}

/// Parses `(0010,0020)`, `0010,0020` and `00100020`
impl FromStr for Tag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('(').trim_end_matches(')');
        let (group, element) = match trimmed.split_once(',') {
            Some((g, e)) => (g.trim(), e.trim()),
            None if trimmed.len() == 8 => trimmed.split_at(4),
            None => return Err(format!("invalid tag '{}'", s)),
        };
        let group =
            u16::from_str_radix(group, 16).map_err(|e| format!("invalid tag group '{}': {}", s, e))?;
        let element = u16::from_str_radix(element, 16)
            .map_err(|e| format!("invalid tag element '{}': {}", s, e))?;
        Ok(Tag(group, element))
    }
}
