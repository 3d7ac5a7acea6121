//! Dump header facts consumed by the index.
//!
//! Of the full header only two facts matter here: the identifier byte size
//! (4 or 8, fixed per dump) and the format version, which decides the class
//! name package separator convention.

/// HPROF format version, identified by the banner string at the start of the
/// dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HprofVersion {
    /// "JAVA PROFILE 1.0.1"
    Jdk1_0_1,
    /// "JAVA PROFILE 1.0.2"
    Jdk6,
    /// "JAVA PROFILE 1.0.3"
    Android,
}

impl HprofVersion {
    /// Parse a version from its header banner. Returns `None` for unknown
    /// banners.
    pub fn from_banner(banner: &str) -> Option<Self> {
        match banner {
            "JAVA PROFILE 1.0.1" => Some(Self::Jdk1_0_1),
            "JAVA PROFILE 1.0.2" => Some(Self::Jdk6),
            "JAVA PROFILE 1.0.3" => Some(Self::Android),
            _ => None,
        }
    }

    /// The banner string this version writes at the start of a dump.
    pub fn banner(self) -> &'static str {
        match self {
            Self::Jdk1_0_1 => "JAVA PROFILE 1.0.1",
            Self::Jdk6 => "JAVA PROFILE 1.0.2",
            Self::Android => "JAVA PROFILE 1.0.3",
        }
    }

    /// JVM dumps store class names with `/` package separators; only Android
    /// writes `.` natively.
    #[inline]
    pub fn uses_forward_slash_class_names(self) -> bool {
        !matches!(self, Self::Android)
    }
}

/// The header facts the index build needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HprofHeader {
    pub version: HprofVersion,
    /// Size in bytes of object identifiers in this dump: 4 or 8.
    pub identifier_byte_size: u32,
}

impl HprofHeader {
    pub fn new(version: HprofVersion, identifier_byte_size: u32) -> Self {
        debug_assert!(
            identifier_byte_size == 4 || identifier_byte_size == 8,
            "identifier byte size must be 4 or 8, got {identifier_byte_size}"
        );
        Self {
            version,
            identifier_byte_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_round_trip() {
        for version in [
            HprofVersion::Jdk1_0_1,
            HprofVersion::Jdk6,
            HprofVersion::Android,
        ] {
            assert_eq!(HprofVersion::from_banner(version.banner()), Some(version));
        }
        assert_eq!(HprofVersion::from_banner("JAVA PROFILE 9.9.9"), None);
    }

    #[test]
    fn test_separator_convention() {
        assert!(HprofVersion::Jdk1_0_1.uses_forward_slash_class_names());
        assert!(HprofVersion::Jdk6.uses_forward_slash_class_names());
        assert!(!HprofVersion::Android.uses_forward_slash_class_names());
    }
}
