//! Error types for dwconv

use crate::dtype::Precision;
use thiserror::Error;

/// Result type alias using dwconv's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Status code for argument errors (bad sizes, shifts, zero points, pointers).
pub const STATUS_INVALID_ARGUMENT: i32 = -1;
/// Status code for misaligned buffers.
pub const STATUS_MISALIGNED: i32 = -2;
/// Status code for scratch or size-computation capacity errors.
pub const STATUS_CAPACITY: i32 = -3;
/// Status code for violated internal invariants.
pub const STATUS_INTERNAL: i32 = -4;

/// Errors that can occur while planning or running a depthwise convolution
///
/// All errors are detected before any output is written, except
/// [`Error::Internal`], which signals a broken invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Buffer length does not match the declared shape
    #[error("Shape mismatch for '{arg}': expected {expected} elements, got {got}")]
    ShapeMismatch {
        /// The argument name
        arg: &'static str,
        /// Expected element count
        expected: usize,
        /// Actual element count
        got: usize,
    },

    /// Buffer is not aligned as the operation requires
    #[error("'{what}' must be {align}-byte aligned")]
    Misaligned {
        /// The misaligned buffer
        what: &'static str,
        /// Required alignment in bytes
        align: usize,
    },

    /// Caller-provided scratch is smaller than the planned size
    #[error("Scratch too small: {required} bytes required, got {got}")]
    ScratchTooSmall {
        /// Bytes required by the planner
        required: usize,
        /// Bytes provided
        got: usize,
    },

    /// A computed size would not fit a signed 32-bit count
    #[error("Capacity overflow while computing {what}")]
    CapacityOverflow {
        /// The quantity being computed
        what: &'static str,
    },

    /// Raw layout tag is neither channel-last nor channel-first
    #[error("Unsupported layout tag {tag}")]
    UnsupportedLayout {
        /// The raw tag
        tag: i32,
    },

    /// Quantization parameters do not fit the requested precision
    #[error("Quantization parameters invalid for {precision}: {reason}")]
    QuantMismatch {
        /// The precision being configured
        precision: Precision,
        /// Reason for rejection
        reason: String,
    },

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Create a quantization-parameter error
    pub fn quant(precision: Precision, reason: impl Into<String>) -> Self {
        Self::QuantMismatch {
            precision,
            reason: reason.into(),
        }
    }

    /// Negative status code of the two-phase size/compute contract.
    pub fn status(&self) -> i32 {
        match self {
            Error::InvalidArgument { .. }
            | Error::ShapeMismatch { .. }
            | Error::UnsupportedLayout { .. }
            | Error::QuantMismatch { .. } => STATUS_INVALID_ARGUMENT,
            Error::Misaligned { .. } => STATUS_MISALIGNED,
            Error::ScratchTooSmall { .. } | Error::CapacityOverflow { .. } => STATUS_CAPACITY,
            Error::Internal(_) => STATUS_INTERNAL,
        }
    }
}

/// Collapse a unit result into the C-style status code (0 on success).
pub fn status_of(result: &Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => e.status(),
    }
}
