//! Transfer syntax resolution

use std::fmt;

/// Byte order of multi-byte values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    Little,
    Big,
}

/// Framing rules for a data set: VR explicitness, byte order and whether the
/// data set is deflated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferSyntax {
    pub explicit_vr: bool,
    pub endianness: Endianness,
    pub deflated: bool,
}

impl TransferSyntax {
    pub const IMPLICIT_VR_LITTLE_ENDIAN_UID: &'static str = "1.2.840.10008.1.2";
    pub const EXPLICIT_VR_LITTLE_ENDIAN_UID: &'static str = "1.2.840.10008.1.2.1";
    pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN_UID: &'static str = "1.2.840.10008.1.2.1.99";
    pub const EXPLICIT_VR_BIG_ENDIAN_UID: &'static str = "1.2.840.10008.1.2.2";

    pub const IMPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax {
        explicit_vr: false,
        endianness: Endianness::Little,
        deflated: false,
    };

    pub const EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax {
        explicit_vr: true,
        endianness: Endianness::Little,
        deflated: false,
    };

    pub const EXPLICIT_VR_BIG_ENDIAN: TransferSyntax = TransferSyntax {
        explicit_vr: true,
        endianness: Endianness::Big,
        deflated: false,
    };

    pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax {
        explicit_vr: true,
        endianness: Endianness::Little,
        deflated: true,
    };

    /// Resolve a Transfer Syntax UID. Encapsulated (compressed pixel data)
    /// syntaxes use the explicit VR little endian grammar for the data set.
    pub fn from_uid(uid: &str) -> Option<TransferSyntax> {
        let uid = uid.trim_end_matches(&['\0', ' '][..]);
        match uid {
            Self::IMPLICIT_VR_LITTLE_ENDIAN_UID => Some(Self::IMPLICIT_VR_LITTLE_ENDIAN),
            Self::EXPLICIT_VR_LITTLE_ENDIAN_UID => Some(Self::EXPLICIT_VR_LITTLE_ENDIAN),
            Self::EXPLICIT_VR_BIG_ENDIAN_UID => Some(Self::EXPLICIT_VR_BIG_ENDIAN),
            Self::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN_UID => {
                Some(Self::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN)
            }
            _ if uid.starts_with("1.2.840.10008.1.2.4.") || uid == "1.2.840.10008.1.2.5" => {
                Some(Self::EXPLICIT_VR_LITTLE_ENDIAN)
            }
            _ => None,
        }
    }

    /// UID of the native (uncompressed) syntax with these framing rules
    pub fn uid(&self) -> &'static str {
        match (self.explicit_vr, self.endianness, self.deflated) {
            (_, _, true) => Self::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN_UID,
            (false, _, false) => Self::IMPLICIT_VR_LITTLE_ENDIAN_UID,
            (true, Endianness::Little, false) => Self::EXPLICIT_VR_LITTLE_ENDIAN_UID,
            (true, Endianness::Big, false) => Self::EXPLICIT_VR_BIG_ENDIAN_UID,
        }
    }

    pub fn is_big_endian(&self) -> bool {
        self.endianness == Endianness::Big
    }
}

impl Default for TransferSyntax {
    fn default() -> Self {
        Self::EXPLICIT_VR_LITTLE_ENDIAN
    }
}

impl fmt::Display for TransferSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vr = if self.explicit_vr { "Explicit" } else { "Implicit" };
        let order = match self.endianness {
            Endianness::Little => "Little",
            Endianness::Big => "Big",
        };
        if self.deflated {
            write!(f, "Deflated {} VR {} Endian", vr, order)
        } else {
            write!(f, "{} VR {} Endian", vr, order)
        }
    }
}
