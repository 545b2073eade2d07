/// Seekable binary reader used by every decoder
pub mod cursor;
/// winnow helpers shared by the model and texture parsers
pub mod parser_utils;
/// Skin/material resolution for model surfaces
pub mod skins;

/// A two-part on-disk format version as stored in BTF headers.
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Version {
    pub major: i16,
    pub minor: i16,
}

impl Version {
    pub const fn new(major: i16, minor: i16) -> Version {
        Version { major, minor }
    }

    /// The single-number form written by the exporter: `major * 100 + minor * 10`.
    pub fn packed(&self) -> i32 {
        self.major as i32 * 100 + self.minor as i32 * 10
    }

    pub fn is_at_least(&self, other: &Version) -> bool {
        if self.major > other.major {
            true
        } else if self.major < other.major {
            false
        } else {
            self.minor >= other.minor
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
