//! Error types for timer operations

use thiserror::Error;

use super::record::TimerStatus;

/// Engine operation attempted, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOp {
    Start,
    Pause,
    Resume,
    Reset,
}

impl std::fmt::Display for TimerOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TimerOp::Start => "start",
            TimerOp::Pause => "pause",
            TimerOp::Resume => "resume",
            TimerOp::Reset => "reset",
        };
        f.write_str(s)
    }
}

/// Errors from timer engine operations.
///
/// Not-found and invalid-transition are deliberately distinct variants so
/// callers can tell a missing record from a disallowed state change.
#[derive(Debug, Error)]
pub enum TimerError {
    /// No record with this id exists in the store
    #[error("timer {id} not found")]
    NotFound { id: String },

    /// The operation is not allowed from the timer's current state
    #[error("cannot {op} timer {id} while {from}")]
    InvalidTransition {
        id: String,
        from: TimerStatus,
        op: TimerOp,
    },
}
