//! The streaming-reader seam the index consumes.

use crate::record::{HprofRecord, RecordTagFilter};
use crate::Result;

/// Streaming source of dump records.
///
/// Implementations re-read from the start of the dump on every call, so the
/// two indexing sweeps can run over the same reader. The index never holds a
/// reader past a single sweep.
pub trait RecordReader {
    /// Stream every record whose tag is in `filter`, invoking `on_record`
    /// with the record's file position.
    ///
    /// Returns the total number of bytes read from the dump, which is also an
    /// upper bound on any record position. Errors propagate to the caller
    /// untransformed; a sweep that errors yields no partial result.
    fn read_records(
        &mut self,
        filter: RecordTagFilter,
        on_record: &mut dyn FnMut(u64, HprofRecord),
    ) -> Result<u64>;
}
