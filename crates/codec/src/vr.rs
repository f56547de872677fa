//! Value representations and their on-wire rules

use std::fmt;

/// Broad class of a VR, deciding padding and value interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VrKind {
    /// Character data (strings, dates, numbers written as text, UIDs)
    Text,
    /// Fixed-width binary numbers and attribute tags
    Numeric,
    /// Opaque binary blobs (OB, OW, UN ...)
    Binary,
    /// Sequence of items
    Sequence,
}

/// Value Representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vr {
    AE,
    AS,
    AT,
    CS,
    DA,
    DS,
    DT,
    FD,
    FL,
    IS,
    LO,
    LT,
    OB,
    OD,
    OF,
    OL,
    OV,
    OW,
    PN,
    SH,
    SL,
    SQ,
    SS,
    ST,
    SV,
    TM,
    UC,
    UI,
    UL,
    UN,
    UR,
    US,
    UT,
    UV,
}

impl Vr {
    /// Every known VR
    pub const ALL: [Vr; 34] = [
        Vr::AE,
        Vr::AS,
        Vr::AT,
        Vr::CS,
        Vr::DA,
        Vr::DS,
        Vr::DT,
        Vr::FD,
        Vr::FL,
        Vr::IS,
        Vr::LO,
        Vr::LT,
        Vr::OB,
        Vr::OD,
        Vr::OF,
        Vr::OL,
        Vr::OV,
        Vr::OW,
        Vr::PN,
        Vr::SH,
        Vr::SL,
        Vr::SQ,
        Vr::SS,
        Vr::ST,
        Vr::SV,
        Vr::TM,
        Vr::UC,
        Vr::UI,
        Vr::UL,
        Vr::UN,
        Vr::UR,
        Vr::US,
        Vr::UT,
        Vr::UV,
    ];

    /// Parse the two-character code written in explicit VR streams
    pub fn from_bytes(code: [u8; 2]) -> Option<Vr> {
        Vr::ALL.iter().copied().find(|vr| vr.to_bytes() == code)
    }

    pub fn to_bytes(self) -> [u8; 2] {
        let code = self.as_str().as_bytes();
        [code[0], code[1]]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Vr::AE => "AE",
            Vr::AS => "AS",
            Vr::AT => "AT",
            Vr::CS => "CS",
            Vr::DA => "DA",
            Vr::DS => "DS",
            Vr::DT => "DT",
            Vr::FD => "FD",
            Vr::FL => "FL",
            Vr::IS => "IS",
            Vr::LO => "LO",
            Vr::LT => "LT",
            Vr::OB => "OB",
            Vr::OD => "OD",
            Vr::OF => "OF",
            Vr::OL => "OL",
            Vr::OV => "OV",
            Vr::OW => "OW",
            Vr::PN => "PN",
            Vr::SH => "SH",
            Vr::SL => "SL",
            Vr::SQ => "SQ",
            Vr::SS => "SS",
            Vr::ST => "ST",
            Vr::SV => "SV",
            Vr::TM => "TM",
            Vr::UC => "UC",
            Vr::UI => "UI",
            Vr::UL => "UL",
            Vr::UN => "UN",
            Vr::UR => "UR",
            Vr::US => "US",
            Vr::UT => "UT",
            Vr::UV => "UV",
        }
    }

    pub fn kind(self) -> VrKind {
        match self {
            Vr::SQ => VrKind::Sequence,
            Vr::OB | Vr::OD | Vr::OF | Vr::OL | Vr::OV | Vr::OW | Vr::UN => VrKind::Binary,
            Vr::AT | Vr::FD | Vr::FL | Vr::SL | Vr::SS | Vr::SV | Vr::UL | Vr::US | Vr::UV => {
                VrKind::Numeric
            }
            _ => VrKind::Text,
        }
    }

    /// Explicit VR streams write a 2 reserved bytes + 4-byte length for these
    /// VRs and a 2-byte length for all others.
    pub fn has_long_length(self) -> bool {
        matches!(
            self,
            Vr::OB
                | Vr::OD
                | Vr::OF
                | Vr::OL
                | Vr::OV
                | Vr::OW
                | Vr::SQ
                | Vr::SV
                | Vr::UC
                | Vr::UN
                | Vr::UR
                | Vr::UT
                | Vr::UV
        )
    }

    /// Largest value length the explicit VR length field can hold.
    /// 0xFFFFFFFF is reserved for undefined length.
    pub fn max_length(self) -> u64 {
        if self.has_long_length() {
            0xFFFF_FFFE
        } else {
            0xFFFF
        }
    }

    /// Odd-length values must be padded to even length
    pub fn requires_padding(self) -> bool {
        !self.is_container()
    }

    pub fn is_container(self) -> bool {
        self.kind() == VrKind::Sequence
    }

    pub fn is_binary(self) -> bool {
        matches!(self.kind(), VrKind::Binary | VrKind::Numeric)
    }

    pub fn is_string(self) -> bool {
        self.kind() == VrKind::Text
    }

    /// VRs that may carry the undefined length: sequences and the blob VRs
    /// used for encapsulated pixel data.
    pub fn allows_undefined_length(self) -> bool {
        matches!(self, Vr::SQ | Vr::OB | Vr::OW | Vr::UN)
    }

    /// Text VRs whose multiple values are separated by backslash.
    /// LT, ST, UT and UR are single-valued.
    pub fn is_multi_valued_text(self) -> bool {
        self.is_string() && !matches!(self, Vr::LT | Vr::ST | Vr::UT | Vr::UR)
    }
}

impl fmt::Display for Vr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
