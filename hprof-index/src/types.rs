//! Decoded index entries.

use hprof_core::{ObjectId, PrimitiveType};

/// A decoded per-object index entry, one variant per object kind.
///
/// Entries are decoded on demand from the packed row stores; this enum is
/// the ephemeral, field-accessible view a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexedObject {
    Class {
        /// File position of the class-dump record.
        position: u64,
        superclass_id: ObjectId,
        instance_size: u32,
        record_size: u64,
        has_ref_fields: bool,
    },
    Instance {
        position: u64,
        class_id: ObjectId,
        record_size: u64,
    },
    ObjectArray {
        position: u64,
        array_class_id: ObjectId,
        record_size: u64,
    },
    PrimitiveArray {
        position: u64,
        primitive_type: PrimitiveType,
        record_size: u64,
    },
}

impl IndexedObject {
    /// File position of the underlying dump record.
    pub fn position(&self) -> u64 {
        match *self {
            Self::Class { position, .. }
            | Self::Instance { position, .. }
            | Self::ObjectArray { position, .. }
            | Self::PrimitiveArray { position, .. } => position,
        }
    }

    /// Byte length of the underlying dump record, used to seek past it.
    pub fn record_size(&self) -> u64 {
        match *self {
            Self::Class { record_size, .. }
            | Self::Instance { record_size, .. }
            | Self::ObjectArray { record_size, .. }
            | Self::PrimitiveArray { record_size, .. } => record_size,
        }
    }
}
