//! Error taxonomy for the engine.
//!
//! Only three of the four kinds the design discusses ever become an `Err`:
//! numeric anomalies self-heal locally (discount is clamped, backoff is set
//! to `NEG_INFINITY`, a warning is logged) and never reach a caller as an
//! error value.

use std::fmt;

/// Errors the engine can report to a caller.
///
/// `Input` and `Structural` are recoverable no-ops from the caller's point
/// of view: the mutation did not happen, nothing else changed. `Fatal` means
/// estimation cannot produce a usable model and the caller should abort the
/// training run.
#[derive(Debug, Clone, PartialEq)]
pub enum ArpaError {
    /// Empty sequence, order 0, mismatched lengths in `replace`, and similar
    /// caller mistakes that are rejected before any mutation is attempted.
    Input(String),
    /// Replace/delete against a context that does not exist, or an insert
    /// whose parent chain is broken.
    Structural(String),
    /// `estimate(g)` failed and the discount family is not `no_discount` at
    /// that level: the model cannot be trained as configured.
    Fatal(String),
}

impl fmt::Display for ArpaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArpaError::Input(msg) => write!(f, "invalid input: {msg}"),
            ArpaError::Structural(msg) => write!(f, "structural error: {msg}"),
            ArpaError::Fatal(msg) => write!(f, "fatal estimation error: {msg}"),
        }
    }
}

impl std::error::Error for ArpaError {}

pub type Result<T> = std::result::Result<T, ArpaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_include_kind() {
        assert!(ArpaError::Input("empty sequence".into()).to_string().contains("invalid input"));
        assert!(ArpaError::Structural("no such context".into())
            .to_string()
            .contains("structural error"));
        assert!(ArpaError::Fatal("n1 == 0".into()).to_string().contains("fatal"));
    }

    #[test]
    fn implements_std_error() {
        fn assert_error<E: std::error::Error>(_e: &E) {}
        assert_error(&ArpaError::Input("x".into()));
    }
}
