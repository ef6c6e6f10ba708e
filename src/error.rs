use std::num::ParseFloatError;

/// Configuration and input-data errors. Always fatal: the caller gets a
/// description of the malformed input and no partial result.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("line {line}: expected {expected} numeric columns, found {found}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: {source}")]
    MalformedNumber {
        line: usize,
        #[source]
        source: ParseFloatError,
    },

    #[error("table contains no data rows after skipping {skipped} header rows")]
    EmptyTable { skipped: usize },

    #[error("wavelength grid is not strictly increasing at index {index}")]
    NonMonotonicWavelength { index: usize },

    #[error("array length mismatch: {name} has {actual} elements, expected {expected}")]
    LengthMismatch {
        name: &'static str,
        actual: usize,
        expected: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Errors raised while evaluating the forward model.
///
/// [`ModelError::NumericalInstability`] is the only recoverable kind: the
/// likelihood evaluator maps it to a rejected parameter vector. Every other
/// variant indicates a programming or configuration defect and must
/// propagate.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("atmospheric solve failed: {reason}")]
    NumericalInstability { reason: String },

    #[error("transit geometry: {0}")]
    InvalidGeometry(String),

    #[error("solver returned {name} of length {actual}, expected {expected}")]
    ProfileLengthMismatch {
        name: &'static str,
        actual: usize,
        expected: usize,
    },
}

impl ModelError {
    /// Shorthand for the recoverable numerical-instability kind.
    pub fn instability(reason: impl Into<String>) -> Self {
        Self::NumericalInstability {
            reason: reason.into(),
        }
    }
}
