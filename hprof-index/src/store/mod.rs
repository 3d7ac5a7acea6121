//! Variable-width byte store: an associative container from object
//! identifier to a fixed-width byte row.
//!
//! The store has two phases. [`UnsortedByteEntries`] is the build phase:
//! append-only, entries packed back-to-back in one contiguous buffer with no
//! per-entry headers. [`SortedBytesMap`] is the frozen phase: entries sorted
//! by identifier, supporting binary-search lookup and O(1) positional
//! access.
//!
//! ## Entry layout
//!
//! ```text
//! id:  4 or 8 bytes, big-endian   (the dump's identifier size)
//! row: W bytes                     (W chosen at store construction)
//! ```
//!
//! Big-endian identifiers make byte-wise comparison equal to unsigned
//! numeric comparison, so the sort and the binary search never decode keys.
//!
//! A sorted packed array costs ~log2 N key comparisons per lookup with zero
//! per-entry overhead, which is what keeps tens of millions of entries
//! resident.

mod sorted;
mod unsorted;

pub use sorted::{ByteRowReader, SortedBytesMap};
pub use unsorted::{ByteRowWriter, UnsortedByteEntries};
