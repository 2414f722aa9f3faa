// Copyright (C) 2022-2023 Richard Lincoln

use thiserror::Error;

/// Caller errors. These indicate a violated precondition, never numerical
/// trouble: capacity exhaustion and rejected pivots are reported through
/// [`ReplaceStatus`](crate::ReplaceStatus) instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FactorError {
    #[error("duplicate index {0}")]
    DuplicateIndex(usize),

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("zero divisor at index {0}")]
    ZeroDivisor(usize),

    #[error("dimension mismatch: {what} has length {found}, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("entry ({row}, {column}) lies on the wrong side of the diagonal of {factor}")]
    NotTriangular {
        factor: &'static str,
        row: usize,
        column: usize,
    },

    #[error("zero pivot on internal row {0}")]
    ZeroPivot(usize),

    #[error("{0} is not a permutation")]
    InvalidPermutation(&'static str),

    #[error("{what} needs {needed} slots but only {found} were configured")]
    AreaTooSmall {
        what: &'static str,
        needed: usize,
        found: usize,
    },

    #[error("operation requires an unpacked vector")]
    Packed,
}
