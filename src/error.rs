//! # Error Types
//!
//! Crate-wide error taxonomy for slice indexing and decoding. Caller
//! contract violations (bad index, use-after-close, late ancillary path,
//! oversized rank) are distinct variants so consumers can branch on them
//! instead of string-matching a catch-all.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while indexing or decoding a dataset.
#[derive(Error, Debug)]
pub enum SliceError {
    /// The input did not pass the format pre-check but a decode was
    /// attempted anyway. Fatal: the reader never opens such inputs.
    #[error("unsupported format: '{0}' is not a recognized multidimensional dataset")]
    UnsupportedFormat(PathBuf),

    /// A slice index outside the catalog's `[0, count)` range.
    #[error("slice index {index} out of range (catalog holds {count} slices)")]
    IndexOutOfRange { index: usize, count: usize },

    /// An operation was attempted after `dispose`.
    #[error("dataset has been disposed; no further reads are possible")]
    ResourceClosed,

    /// The ancillary metadata path was supplied after reads had begun.
    #[error("ancillary metadata must be set before the first read")]
    AncillaryConflict,

    /// A slab was requested with a rank outside the supported 1..=7 range
    /// (see [`crate::store::MAX_RANK`]).
    #[error("array rank {0} is outside the supported range 1..=7")]
    InvalidRank(usize),

    /// A single axis could not be classified. Recovered locally by the
    /// classifier; never fatal to the dataset as a whole.
    #[error("could not resolve a role for axis '{axis}': {reason}")]
    AxisResolution { axis: String, reason: String },

    /// A variable named by a descriptor or override is absent from the store.
    #[error("variable '{0}' not found in dataset")]
    VariableNotFound(String),

    /// A plane request did not line up with the variable's shape.
    #[error("dimension mismatch for variable '{variable}': {reason}")]
    DimensionMismatch { variable: String, reason: String },

    /// The ancillary metadata file could not be parsed or validated.
    #[error("invalid ancillary metadata: {0}")]
    Ancillary(String),

    #[error("array store error: {0}")]
    Store(#[from] netcdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type SliceResult<T> = Result<T, SliceError>;
