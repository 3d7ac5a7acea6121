//! The read-only index façade.

use hprof_core::{
    GcRoot, HprofHeader, ObjectId, PrimitiveType, ProguardMapping, RecordReader, Result,
};

use crate::builder::{self, IndexConfig};
use crate::containers::{LongLongMap, LongObjectMap, LongSet};
use crate::store::{ByteRowReader, SortedBytesMap};
use crate::types::IndexedObject;
use crate::widths::{high_bit, StoreWidths};

/// Compact in-memory index over one heap dump.
///
/// Immutable after construction: every method is a pure function of the
/// frozen stores. Lookups by object identifier return `Option` on expected
/// misses; name lookups that hit a broken producer invariant (a class or
/// string id that was never interned) panic, as does
/// [`object_at_index`](Self::object_at_index) on an out-of-range slot.
///
/// Dense slots number every indexed object `0..total`, classes first, then
/// instances, object arrays, and primitive arrays, ascending by identifier
/// within each kind. [`indexed_object`](Self::indexed_object) and
/// [`object_at_index`](Self::object_at_index) are inverse bijections over
/// this numbering.
pub struct MemoryIndex {
    pub(crate) widths: StoreWidths,
    pub(crate) classes: SortedBytesMap,
    pub(crate) instances: SortedBytesMap,
    pub(crate) object_arrays: SortedBytesMap,
    pub(crate) primitive_arrays: SortedBytesMap,
    pub(crate) strings: LongObjectMap<Box<str>>,
    pub(crate) class_names: LongLongMap,
    pub(crate) gc_roots: Vec<GcRoot>,
    pub(crate) primitive_wrapper_types: LongSet,
    pub(crate) proguard: Option<Box<dyn ProguardMapping>>,
    pub(crate) forward_slash_class_names: bool,
}

impl MemoryIndex {
    /// Run both indexing sweeps over `reader` and build the index.
    ///
    /// The reader is invoked twice and must re-read from the start of the
    /// dump on each call. Reader errors propagate unchanged; on error the
    /// in-progress build is discarded.
    pub fn index_records<R: RecordReader + ?Sized>(
        reader: &mut R,
        header: &HprofHeader,
        proguard: Option<Box<dyn ProguardMapping>>,
        config: IndexConfig,
    ) -> Result<MemoryIndex> {
        builder::index_records(reader, header, proguard, config)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn object_array_count(&self) -> usize {
        self.object_arrays.len()
    }

    pub fn primitive_array_count(&self) -> usize {
        self.primitive_arrays.len()
    }

    /// The class's name, deobfuscated when a mapping is installed, with
    /// package separators normalized to `.`.
    ///
    /// # Panics
    ///
    /// When `class_id` is not in the class-name table, or its name string
    /// was never interned. Both are producer bugs: every load-class record
    /// must reference an interned string.
    pub fn class_name(&self, class_id: ObjectId) -> String {
        let string_id = self
            .class_names
            .get(class_id)
            .unwrap_or_else(|| panic!("class {class_id:#x} not in the class-name table"));
        let stored = self.string_at(string_id);
        let name = match &self.proguard {
            Some(mapping) => mapping.deobfuscate_class_name(stored),
            None => stored.to_owned(),
        };
        if self.forward_slash_class_names {
            name.replace('/', ".")
        } else {
            name
        }
    }

    /// A field's name, deobfuscated in the context of its declaring class
    /// when a mapping is installed.
    ///
    /// # Panics
    ///
    /// When `field_name_string_id` (or, with a mapping installed, the class
    /// name) is not interned.
    pub fn field_name(&self, class_id: ObjectId, field_name_string_id: u64) -> String {
        let field = self.string_at(field_name_string_id);
        match &self.proguard {
            Some(mapping) => {
                let string_id = self.class_names.get(class_id).unwrap_or_else(|| {
                    panic!("class {class_id:#x} not in the class-name table")
                });
                mapping.deobfuscate_field_name(self.string_at(string_id), field)
            }
            None => field.to_owned(),
        }
    }

    /// Reverse lookup: the identifier of the class named `class_name`.
    ///
    /// Two linear scans (strings, then the class-name table); not for hot
    /// paths. The comparison is against the stored name bytes after package
    /// separator normalization; an installed mapping does not apply here.
    pub fn class_id(&self, class_name: &str) -> Option<ObjectId> {
        let internal = if self.forward_slash_class_names {
            class_name.replace('.', "/")
        } else {
            class_name.to_owned()
        };
        let string_id = self
            .strings
            .iter()
            .find(|&(_, s)| &**s == internal.as_str())
            .map(|(id, _)| id)?;
        self.class_names
            .iter()
            .find(|&(_, name_id)| name_id == string_id)
            .map(|(class_id, _)| class_id)
    }

    /// True when `id` is in any of the four per-kind stores.
    pub fn object_id_is_indexed(&self, id: ObjectId) -> bool {
        self.classes.contains(id)
            || self.instances.contains(id)
            || self.object_arrays.contains(id)
            || self.primitive_arrays.contains(id)
    }

    /// Look up `id` across the four stores, returning its dense slot and
    /// decoded entry. `None` when the identifier is not indexed.
    pub fn indexed_object(&self, id: ObjectId) -> Option<(usize, IndexedObject)> {
        if let Some(slot) = self.classes.index_of(id) {
            return Some((slot, self.decode_class(self.classes.row_at(slot))));
        }
        let mut base = self.classes.len();
        if let Some(slot) = self.instances.index_of(id) {
            return Some((base + slot, self.decode_instance(self.instances.row_at(slot))));
        }
        base += self.instances.len();
        if let Some(slot) = self.object_arrays.index_of(id) {
            return Some((
                base + slot,
                self.decode_object_array(self.object_arrays.row_at(slot)),
            ));
        }
        base += self.object_arrays.len();
        if let Some(slot) = self.primitive_arrays.index_of(id) {
            return Some((
                base + slot,
                self.decode_primitive_array(self.primitive_arrays.row_at(slot)),
            ));
        }
        None
    }

    /// The object at `dense_slot`: inverse of
    /// [`indexed_object`](Self::indexed_object).
    ///
    /// # Panics
    ///
    /// When `dense_slot` is at or past the total number of indexed objects.
    pub fn object_at_index(&self, dense_slot: usize) -> (ObjectId, IndexedObject) {
        let mut slot = dense_slot;
        if slot < self.classes.len() {
            return (
                self.classes.key_at(slot),
                self.decode_class(self.classes.row_at(slot)),
            );
        }
        slot -= self.classes.len();
        if slot < self.instances.len() {
            return (
                self.instances.key_at(slot),
                self.decode_instance(self.instances.row_at(slot)),
            );
        }
        slot -= self.instances.len();
        if slot < self.object_arrays.len() {
            return (
                self.object_arrays.key_at(slot),
                self.decode_object_array(self.object_arrays.row_at(slot)),
            );
        }
        slot -= self.object_arrays.len();
        if slot < self.primitive_arrays.len() {
            return (
                self.primitive_arrays.key_at(slot),
                self.decode_primitive_array(self.primitive_arrays.row_at(slot)),
            );
        }
        panic!(
            "dense slot {dense_slot} out of range: {} objects indexed",
            self.indexed_object_count()
        );
    }

    /// Classes in ascending identifier order.
    pub fn indexed_class_sequence(
        &self,
    ) -> impl Iterator<Item = (ObjectId, IndexedObject)> + '_ {
        self.classes
            .entries()
            .map(move |(id, row)| (id, self.decode_class(row)))
    }

    /// Instances in ascending identifier order.
    pub fn indexed_instance_sequence(
        &self,
    ) -> impl Iterator<Item = (ObjectId, IndexedObject)> + '_ {
        self.instances
            .entries()
            .map(move |(id, row)| (id, self.decode_instance(row)))
    }

    /// Object arrays in ascending identifier order.
    pub fn indexed_object_array_sequence(
        &self,
    ) -> impl Iterator<Item = (ObjectId, IndexedObject)> + '_ {
        self.object_arrays
            .entries()
            .map(move |(id, row)| (id, self.decode_object_array(row)))
    }

    /// Primitive arrays in ascending identifier order.
    pub fn indexed_primitive_array_sequence(
        &self,
    ) -> impl Iterator<Item = (ObjectId, IndexedObject)> + '_ {
        self.primitive_arrays
            .entries()
            .map(move |(id, row)| (id, self.decode_primitive_array(row)))
    }

    /// Every indexed object in dense-slot order: classes, then instances,
    /// object arrays, and primitive arrays.
    pub fn indexed_object_sequence(
        &self,
    ) -> impl Iterator<Item = (ObjectId, IndexedObject)> + '_ {
        self.indexed_class_sequence()
            .chain(self.indexed_instance_sequence())
            .chain(self.indexed_object_array_sequence())
            .chain(self.indexed_primitive_array_sequence())
    }

    /// Retained GC roots, in dump stream order.
    pub fn gc_roots(&self) -> &[GcRoot] {
        &self.gc_roots
    }

    /// Identifiers of the eight boxed-primitive classes present in the dump.
    pub fn primitive_wrapper_types(&self) -> &LongSet {
        &self.primitive_wrapper_types
    }

    fn indexed_object_count(&self) -> usize {
        self.classes.len()
            + self.instances.len()
            + self.object_arrays.len()
            + self.primitive_arrays.len()
    }

    fn string_at(&self, string_id: u64) -> &str {
        self.strings
            .get(string_id)
            .unwrap_or_else(|| panic!("string {string_id:#x} not interned"))
    }

    fn decode_class(&self, mut row: ByteRowReader<'_>) -> IndexedObject {
        let position = row.read_truncated_u64(self.widths.position);
        let superclass_id = row.read_id();
        let instance_size = row.read_u32();
        let (record_size, has_ref_fields) = if self.widths.class_size_high_bit {
            let packed = row.read_truncated_u64(self.widths.class_size);
            let flag = high_bit(self.widths.class_size);
            (packed & !flag, packed & flag != 0)
        } else {
            let record_size = row.read_truncated_u64(self.widths.class_size);
            (record_size, row.read_byte() != 0)
        };
        IndexedObject::Class {
            position,
            superclass_id,
            instance_size,
            record_size,
            has_ref_fields,
        }
    }

    fn decode_instance(&self, mut row: ByteRowReader<'_>) -> IndexedObject {
        IndexedObject::Instance {
            position: row.read_truncated_u64(self.widths.position),
            class_id: row.read_id(),
            record_size: row.read_truncated_u64(self.widths.instance_size),
        }
    }

    fn decode_object_array(&self, mut row: ByteRowReader<'_>) -> IndexedObject {
        IndexedObject::ObjectArray {
            position: row.read_truncated_u64(self.widths.position),
            array_class_id: row.read_id(),
            record_size: row.read_truncated_u64(self.widths.object_array_size),
        }
    }

    fn decode_primitive_array(&self, mut row: ByteRowReader<'_>) -> IndexedObject {
        let position = row.read_truncated_u64(self.widths.position);
        let tag = row.read_byte();
        let primitive_type = PrimitiveType::from_hprof_tag(tag)
            .unwrap_or_else(|| panic!("invalid primitive type tag {tag} in index row"));
        IndexedObject::PrimitiveArray {
            position,
            primitive_type,
            record_size: row.read_truncated_u64(self.widths.primitive_array_size),
        }
    }
}
