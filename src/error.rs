//! Error types for the distributed kernels

use thiserror::Error;

/// Result type alias using this crate's [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the distributed kernels.
///
/// Every error is fatal at the crate boundary: once one rank observes an
/// inconsistency, the communication plan can no longer be trusted and the
/// caller is expected to abort the parallel run. The reset sentinel of the
/// iterated product is the single call that succeeds from any state.
#[derive(Error, Debug)]
pub enum Error {
    /// A collective or point-to-point operation failed at the backend
    #[error("transport failure: {what}")]
    Transport {
        /// What went wrong
        what: String,
    },

    /// A buffer or table does not match the shape the partition implies
    #[error("shape mismatch for {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        /// The quantity that was checked
        what: &'static str,
        /// Expected extent
        expected: usize,
        /// Actual extent
        found: usize,
    },

    /// Column indices within a row are not strictly ascending
    #[error("column indices out of order in global row {row}")]
    OrderingViolation {
        /// Global row index of the offending row
        row: usize,
    },

    /// Conjugate transpose invoked on a non-square matrix
    #[error("conjugate transpose requires a square matrix, got {rows}x{cols}")]
    UnsquareDagger {
        /// Global row count
        rows: usize,
        /// Global column count
        cols: usize,
    },

    /// A kernel was invoked out of its documented lifecycle
    #[error("invalid kernel state: {what}")]
    StateMisuse {
        /// Description of the misuse
        what: String,
    },
}

impl Error {
    pub(crate) fn transport(what: impl Into<String>) -> Self {
        Error::Transport { what: what.into() }
    }

    pub(crate) fn state(what: impl Into<String>) -> Self {
        Error::StateMisuse { what: what.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_shape() {
        let err = Error::ShapeMismatch {
            what: "partition table rank count",
            expected: 4,
            found: 3,
        };
        assert_eq!(
            err.to_string(),
            "shape mismatch for partition table rank count: expected 4, found 3"
        );
    }

    #[test]
    fn constructors_wrap_their_kind() {
        assert!(matches!(
            Error::transport("peer gone"),
            Error::Transport { .. }
        ));
        assert!(matches!(Error::state("no plan"), Error::StateMisuse { .. }));
    }

    #[test]
    fn ordering_violation_reports_the_row() {
        let err = Error::OrderingViolation { row: 17 };
        assert_eq!(err.to_string(), "column indices out of order in global row 17");
    }
}
