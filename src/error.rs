//! Crate-level errors.

use thiserror::Error;

use crate::expiring::TimerKind;
use crate::timer::TimerError;

/// Errors raised while building an expiring decorator.
///
/// Request-level failures never appear here; they belong to the wrapped
/// capability and pass through untouched.
#[derive(Debug, Error)]
pub enum ExpiryError {
    #[error("failed to arm {kind} timer: {source}")]
    Schedule {
        kind: TimerKind,
        #[source]
        source: TimerError,
    },
}
