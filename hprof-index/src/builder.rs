//! Indexing pass: the second streaming sweep, consuming all seven record
//! kinds and producing the finished [`MemoryIndex`].

use hprof_core::{
    GcRoot, GcRootKindFilter, HprofHeader, HprofRecord, ProguardMapping, RecordReader,
    RecordTagFilter, Result,
};

use crate::containers::{LongLongMap, LongObjectMap, LongSet};
use crate::index::MemoryIndex;
use crate::store::UnsortedByteEntries;
use crate::widths::{high_bit, ScanTotals, StoreWidths};

/// Build-time options.
#[derive(Debug, Clone, Copy)]
pub struct IndexConfig {
    /// GC-root kinds to retain. Roots of other kinds, and roots with a null
    /// identifier, are dropped during the sweep.
    pub indexed_gc_root_kinds: GcRootKindFilter,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            indexed_gc_root_kinds: GcRootKindFilter::ALL,
        }
    }
}

/// The eight boxed-primitive class names, in dotted form.
const PRIMITIVE_WRAPPER_NAMES: [&str; 8] = [
    "java.lang.Boolean",
    "java.lang.Character",
    "java.lang.Byte",
    "java.lang.Short",
    "java.lang.Integer",
    "java.lang.Long",
    "java.lang.Float",
    "java.lang.Double",
];

/// Byte-wise name comparison that treats a stored `/` as matching `.`, so
/// detection works for both package separator conventions without
/// allocating.
fn eq_dotted(stored: &str, dotted: &str) -> bool {
    stored.len() == dotted.len()
        && stored
            .bytes()
            .zip(dotted.bytes())
            .all(|(s, d)| s == d || (s == b'/' && d == b'.'))
}

fn is_primitive_wrapper_name(stored: &str) -> bool {
    PRIMITIVE_WRAPPER_NAMES
        .iter()
        .any(|dotted| eq_dotted(stored, dotted))
}

/// Run both sweeps over `reader` and assemble the index.
///
/// The first sweep sizes the stores (see [`ScanTotals`] and [`StoreWidths`]);
/// the second fills them. An error from the reader abandons the build; no
/// partial index is observable.
pub(crate) fn index_records<R: RecordReader + ?Sized>(
    reader: &mut R,
    header: &HprofHeader,
    proguard: Option<Box<dyn ProguardMapping>>,
    config: IndexConfig,
) -> Result<MemoryIndex> {
    let totals = ScanTotals::scan(reader)?;
    let widths = StoreWidths::from_totals(header, &totals);

    let mut builder = MemoryIndexBuilder::new(widths, &totals, config);
    reader.read_records(RecordTagFilter::INDEXING, &mut |position, record| {
        builder.on_record(position, record)
    })?;
    Ok(builder.into_index(header, proguard))
}

/// Accumulates the second sweep. Consumed by `into_index`; the unsorted
/// stores never outlive the build.
struct MemoryIndexBuilder {
    widths: StoreWidths,
    classes: UnsortedByteEntries,
    instances: UnsortedByteEntries,
    object_arrays: UnsortedByteEntries,
    primitive_arrays: UnsortedByteEntries,
    strings: LongObjectMap<Box<str>>,
    class_names: LongLongMap,
    /// String ids whose bytes name a boxed-primitive class. Transient:
    /// consulted while load-class records stream by, dropped with the
    /// builder.
    primitive_wrapper_name_ids: LongSet,
    primitive_wrapper_classes: LongSet,
    gc_roots: Vec<GcRoot>,
    root_filter: GcRootKindFilter,
}

impl MemoryIndexBuilder {
    fn new(widths: StoreWidths, totals: &ScanTotals, config: IndexConfig) -> Self {
        let id = widths.identifier;
        Self {
            widths,
            classes: UnsortedByteEntries::with_expected_entries(
                id,
                widths.class_row(),
                totals.class_count,
            ),
            instances: UnsortedByteEntries::with_expected_entries(
                id,
                widths.instance_row(),
                totals.instance_count,
            ),
            object_arrays: UnsortedByteEntries::with_expected_entries(
                id,
                widths.object_array_row(),
                totals.object_array_count,
            ),
            primitive_arrays: UnsortedByteEntries::with_expected_entries(
                id,
                widths.primitive_array_row(),
                totals.primitive_array_count,
            ),
            strings: LongObjectMap::new(),
            class_names: LongLongMap::with_expected_size(totals.class_count),
            primitive_wrapper_name_ids: LongSet::with_expected_size(
                PRIMITIVE_WRAPPER_NAMES.len(),
            ),
            primitive_wrapper_classes: LongSet::with_expected_size(
                PRIMITIVE_WRAPPER_NAMES.len(),
            ),
            gc_roots: Vec::new(),
            root_filter: config.indexed_gc_root_kinds,
        }
    }

    fn on_record(&mut self, position: u64, record: HprofRecord) {
        match record {
            HprofRecord::String { id, value } => {
                // Strings stream before the load-class records that
                // reference them, so wrapper names are known by the time
                // classes bind to them.
                if is_primitive_wrapper_name(&value) {
                    self.primitive_wrapper_name_ids.insert(id);
                }
                self.strings.put(id, value.into_boxed_str());
            }
            HprofRecord::LoadClass {
                class_id,
                class_name_string_id,
            } => {
                self.class_names.put(class_id, class_name_string_id);
                if self.primitive_wrapper_name_ids.contains(class_name_string_id) {
                    self.primitive_wrapper_classes.insert(class_id);
                }
            }
            HprofRecord::GcRoot { root } => {
                if root.object_id() != 0 && self.root_filter.contains(root.kind()) {
                    self.gc_roots.push(root);
                }
            }
            HprofRecord::ClassSkipContent {
                id,
                superclass_id,
                instance_size,
                record_size,
                has_ref_fields,
            } => {
                let widths = self.widths;
                let mut row = self.classes.append(id);
                row.write_truncated_u64(position, widths.position);
                row.write_id(superclass_id);
                row.write_u32(instance_size);
                if widths.class_size_high_bit {
                    let flag = if has_ref_fields {
                        high_bit(widths.class_size)
                    } else {
                        0
                    };
                    row.write_truncated_u64(record_size | flag, widths.class_size);
                } else {
                    row.write_truncated_u64(record_size, widths.class_size);
                    row.write_byte(u8::from(has_ref_fields));
                }
            }
            HprofRecord::InstanceSkipContent {
                id,
                class_id,
                record_size,
            } => {
                let widths = self.widths;
                let mut row = self.instances.append(id);
                row.write_truncated_u64(position, widths.position);
                row.write_id(class_id);
                row.write_truncated_u64(record_size, widths.instance_size);
            }
            HprofRecord::ObjectArraySkipContent {
                id,
                array_class_id,
                record_size,
            } => {
                let widths = self.widths;
                let mut row = self.object_arrays.append(id);
                row.write_truncated_u64(position, widths.position);
                row.write_id(array_class_id);
                row.write_truncated_u64(record_size, widths.object_array_size);
            }
            HprofRecord::PrimitiveArraySkipContent {
                id,
                primitive_type,
                record_size,
            } => {
                let widths = self.widths;
                let mut row = self.primitive_arrays.append(id);
                row.write_truncated_u64(position, widths.position);
                row.write_byte(primitive_type.hprof_tag());
                row.write_truncated_u64(record_size, widths.primitive_array_size);
            }
        }
    }

    /// Freeze every store and move the tables into the façade. The
    /// transient wrapper-name set is dropped here.
    fn into_index(
        self,
        header: &HprofHeader,
        proguard: Option<Box<dyn ProguardMapping>>,
    ) -> MemoryIndex {
        let index = MemoryIndex {
            widths: self.widths,
            classes: self.classes.move_to_sorted_map(),
            instances: self.instances.move_to_sorted_map(),
            object_arrays: self.object_arrays.move_to_sorted_map(),
            primitive_arrays: self.primitive_arrays.move_to_sorted_map(),
            strings: self.strings,
            class_names: self.class_names,
            gc_roots: self.gc_roots,
            primitive_wrapper_types: self.primitive_wrapper_classes,
            proguard,
            forward_slash_class_names: header.version.uses_forward_slash_class_names(),
        };
        tracing::debug!(
            classes = index.class_count(),
            instances = index.instance_count(),
            object_arrays = index.object_array_count(),
            primitive_arrays = index.primitive_array_count(),
            strings = index.strings.len(),
            gc_roots = index.gc_roots.len(),
            "index built"
        );
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapper_name_matching() {
        assert!(is_primitive_wrapper_name("java.lang.Integer"));
        assert!(is_primitive_wrapper_name("java/lang/Integer"));
        assert!(is_primitive_wrapper_name("java.lang.Boolean"));
        assert!(is_primitive_wrapper_name("java/lang/Double"));
        assert!(!is_primitive_wrapper_name("java.lang.String"));
        assert!(!is_primitive_wrapper_name("java.lang.Int"));
        assert!(!is_primitive_wrapper_name("my.app.Integer"));
        assert!(!is_primitive_wrapper_name(""));
    }

    #[test]
    fn test_eq_dotted_is_one_directional() {
        // A stored dot never matches a `/` in the reference name, and the
        // reference names contain no slashes anyway.
        assert!(eq_dotted("java/lang/Long", "java.lang.Long"));
        assert!(eq_dotted("java.lang.Long", "java.lang.Long"));
        assert!(!eq_dotted("java/lang/Long2", "java.lang.Long"));
    }
}
