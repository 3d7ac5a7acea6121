//! Error types for heap-dump streaming.

use std::io;
use thiserror::Error;

/// Errors surfaced by a streaming reader and propagated, untransformed,
/// through the index build.
///
/// Broken index invariants (a missing interned string, an out-of-range dense
/// slot) are caller/producer bugs and panic instead of returning a variant
/// here.
#[derive(Error, Debug)]
pub enum HprofError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed dump: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, HprofError>;
