//! Optional obfuscation-mapping seam, applied at name-lookup time.

/// Mapping from obfuscated to original class and field names.
///
/// Installed on the index at build time. When no mapping is installed, names
/// are returned as stored in the dump.
pub trait ProguardMapping {
    /// The original name for an obfuscated class name; identity when the
    /// class is not in the mapping.
    fn deobfuscate_class_name(&self, class_name: &str) -> String;

    /// The original name for an obfuscated field name, resolved in the
    /// context of its declaring class.
    fn deobfuscate_field_name(&self, class_name: &str, field_name: &str) -> String;
}
