//! # hprof-index
//!
//! Compact, queryable in-memory index over a streamed heap dump.
//!
//! Heap dumps can exceed several gigabytes; this crate fits an index for
//! tens of millions of objects into a fraction of that by packing per-object
//! records into variable-width byte rows sized from a preliminary sweep,
//! interning strings by identifier, and keeping every store as one sorted,
//! packed buffer.
//!
//! The build is two streaming sweeps over a
//! [`RecordReader`](hprof_core::RecordReader):
//!
//! ```text
//! stream → width pass → stream → index pass → sort & freeze → MemoryIndex
//! ```
//!
//! The finished [`MemoryIndex`] is immutable and answers lookups by object
//! identifier in O(log n), by dense slot in O(1), and enumerates each object
//! kind in ascending identifier order.
//!
//! ## Example
//!
//! ```ignore
//! use hprof_index::{IndexConfig, MemoryIndex};
//!
//! // Apps provide their own streaming RecordReader implementation.
//! let index = MemoryIndex::index_records(&mut reader, &header, None, IndexConfig::default())?;
//! let (slot, entry) = index.indexed_object(object_id).expect("indexed");
//! assert_eq!(index.object_at_index(slot), (object_id, entry));
//! ```

pub mod containers;
pub mod store;
pub mod types;
pub mod widths;

mod builder;
mod index;

pub use builder::IndexConfig;
pub use containers::{LongLongMap, LongObjectMap, LongSet};
pub use index::MemoryIndex;
pub use store::{ByteRowReader, ByteRowWriter, SortedBytesMap, UnsortedByteEntries};
pub use types::IndexedObject;
pub use widths::{ScanTotals, StoreWidths};
