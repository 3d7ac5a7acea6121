//! Width-selection pass: the first streaming sweep.
//!
//! Tallies per-kind counts and maximum declared record sizes from the four
//! skip-content record kinds, then derives the minimum byte width for each
//! variable-width row field. On realistic dumps this shrinks per-row
//! overhead from a fixed 24-byte layout to as little as 10 bytes.

use hprof_core::{HprofHeader, HprofRecord, RecordReader, RecordTagFilter, Result};

/// Counts and maxima observed during the width-selection sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanTotals {
    pub class_count: usize,
    pub instance_count: usize,
    pub object_array_count: usize,
    pub primitive_array_count: usize,
    pub max_class_size: u64,
    pub max_instance_size: u64,
    pub max_object_array_size: u64,
    pub max_primitive_array_size: u64,
    /// Total bytes read by the sweep; an upper bound on any file position.
    pub total_bytes: u64,
}

impl ScanTotals {
    /// Run the sweep. Subscribes to skip-content records only.
    pub fn scan<R: RecordReader + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut totals = ScanTotals::default();
        let total_bytes = reader.read_records(RecordTagFilter::SKIP_CONTENT, &mut |_, record| {
            match record {
                HprofRecord::ClassSkipContent { record_size, .. } => {
                    totals.class_count += 1;
                    totals.max_class_size = totals.max_class_size.max(record_size);
                }
                HprofRecord::InstanceSkipContent { record_size, .. } => {
                    totals.instance_count += 1;
                    totals.max_instance_size = totals.max_instance_size.max(record_size);
                }
                HprofRecord::ObjectArraySkipContent { record_size, .. } => {
                    totals.object_array_count += 1;
                    totals.max_object_array_size = totals.max_object_array_size.max(record_size);
                }
                HprofRecord::PrimitiveArraySkipContent { record_size, .. } => {
                    totals.primitive_array_count += 1;
                    totals.max_primitive_array_size =
                        totals.max_primitive_array_size.max(record_size);
                }
                _ => {}
            }
        })?;
        totals.total_bytes = total_bytes;
        tracing::debug!(
            classes = totals.class_count,
            instances = totals.instance_count,
            object_arrays = totals.object_array_count,
            primitive_arrays = totals.primitive_array_count,
            total_bytes = totals.total_bytes,
            "width-selection sweep complete"
        );
        Ok(totals)
    }

    /// Total skip-content records observed.
    pub fn record_count(&self) -> usize {
        self.class_count + self.instance_count + self.object_array_count
            + self.primitive_array_count
    }
}

/// Per-dump row field widths derived from a sweep's [`ScanTotals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreWidths {
    /// Identifier width from the dump header: 4 or 8.
    pub identifier: usize,
    /// Width of file-position fields.
    pub position: usize,
    pub class_size: usize,
    pub instance_size: usize,
    pub object_array_size: usize,
    pub primitive_array_size: usize,
    /// True when the top bit of the class-size field is provably clear for
    /// every class in the dump, in which case it carries the
    /// has-reference-fields flag and the class row saves its flag byte.
    pub class_size_high_bit: bool,
}

impl StoreWidths {
    pub fn from_totals(header: &HprofHeader, totals: &ScanTotals) -> Self {
        let class_size = byte_width(totals.max_class_size);
        let class_size_high_bit =
            class_size > 0 && totals.max_class_size & high_bit(class_size) == 0;
        let widths = Self {
            identifier: header.identifier_byte_size as usize,
            position: byte_width(totals.total_bytes),
            class_size,
            instance_size: byte_width(totals.max_instance_size),
            object_array_size: byte_width(totals.max_object_array_size),
            primitive_array_size: byte_width(totals.max_primitive_array_size),
            class_size_high_bit,
        };
        tracing::debug!(
            position = widths.position,
            class_size = widths.class_size,
            instance_size = widths.instance_size,
            object_array_size = widths.object_array_size,
            primitive_array_size = widths.primitive_array_size,
            class_size_high_bit = widths.class_size_high_bit,
            "store widths selected"
        );
        widths
    }

    /// Class row: position, superclass id, instance size, record size with
    /// the flag either borrowed into the size's top bit or in a trailing
    /// byte.
    pub fn class_row(&self) -> usize {
        self.position
            + self.identifier
            + 4
            + self.class_size
            + usize::from(!self.class_size_high_bit)
    }

    /// Instance row: position, class id, record size.
    pub fn instance_row(&self) -> usize {
        self.position + self.identifier + self.instance_size
    }

    /// Object-array row: position, array-class id, record size.
    pub fn object_array_row(&self) -> usize {
        self.position + self.identifier + self.object_array_size
    }

    /// Primitive-array row: position, type tag, record size.
    pub fn primitive_array_row(&self) -> usize {
        self.position + 1 + self.primitive_array_size
    }
}

/// Number of bytes needed to hold `max`: shift right by 8 until zero.
/// `byte_width(0) == 0`.
pub(crate) fn byte_width(max: u64) -> usize {
    let mut n = 0;
    let mut v = max;
    while v != 0 {
        n += 1;
        v >>= 8;
    }
    n
}

/// Mask of the top bit of an `n`-byte field.
#[inline]
pub(crate) fn high_bit(n: usize) -> u64 {
    1 << (8 * n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hprof_core::HprofVersion;

    #[test]
    fn test_byte_width_minimality() {
        assert_eq!(byte_width(0), 0);
        assert_eq!(byte_width(1), 1);
        assert_eq!(byte_width(0xFF), 1);
        assert_eq!(byte_width(0x100), 2);
        assert_eq!(byte_width(0xFFFF), 2);
        assert_eq!(byte_width(0x1_0000), 3);
        assert_eq!(byte_width(0xFF_FFFF), 3);
        assert_eq!(byte_width(0x100_0000), 4);
        assert_eq!(byte_width(u32::MAX as u64), 4);
        assert_eq!(byte_width(u32::MAX as u64 + 1), 5);
        assert_eq!(byte_width(u64::MAX), 8);
        // Smallest n such that max < 2^(8n), for every n in [0, 8].
        for n in 1..=8usize {
            let max = if n == 8 { u64::MAX } else { (1 << (8 * n)) - 1 };
            assert_eq!(byte_width(max), n);
            assert_eq!(byte_width(max >> 8), n - 1);
        }
    }

    fn widths_for(max_class_size: u64) -> StoreWidths {
        let header = HprofHeader::new(HprofVersion::Android, 8);
        let totals = ScanTotals {
            class_count: 1,
            max_class_size,
            total_bytes: 100,
            ..ScanTotals::default()
        };
        StoreWidths::from_totals(&header, &totals)
    }

    #[test]
    fn test_class_size_high_bit_free() {
        let widths = widths_for(0x3F);
        assert_eq!(widths.class_size, 1);
        assert!(widths.class_size_high_bit);
        // No trailing flag byte when the bit is borrowed.
        assert_eq!(widths.class_row(), 1 + 8 + 4 + 1);
    }

    #[test]
    fn test_class_size_high_bit_taken() {
        let widths = widths_for(0x80);
        assert_eq!(widths.class_size, 1);
        assert!(!widths.class_size_high_bit);
        assert_eq!(widths.class_row(), 1 + 8 + 4 + 1 + 1);
    }

    #[test]
    fn test_class_size_high_bit_two_byte_field() {
        let widths = widths_for(0x7FFF);
        assert_eq!(widths.class_size, 2);
        assert!(widths.class_size_high_bit);

        let widths = widths_for(0x8000);
        assert_eq!(widths.class_size, 2);
        assert!(!widths.class_size_high_bit);
    }

    #[test]
    fn test_zero_class_size_has_no_bit_to_borrow() {
        let widths = widths_for(0);
        assert_eq!(widths.class_size, 0);
        assert!(!widths.class_size_high_bit);
    }

    #[test]
    fn test_row_widths_track_identifier_size() {
        let header = HprofHeader::new(HprofVersion::Jdk6, 4);
        let totals = ScanTotals {
            instance_count: 1,
            max_instance_size: 0xFFFF,
            total_bytes: 0x10_0000,
            ..ScanTotals::default()
        };
        let widths = StoreWidths::from_totals(&header, &totals);
        assert_eq!(widths.identifier, 4);
        assert_eq!(widths.position, 3);
        assert_eq!(widths.instance_size, 2);
        assert_eq!(widths.instance_row(), 3 + 4 + 2);
        assert_eq!(widths.primitive_array_row(), 3 + 1 + 0);
    }
}
