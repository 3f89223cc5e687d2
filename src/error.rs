//! Named error kinds surfaced by the engine.
//!
//! [`ValueHistory`](crate::value_history::ValueHistory) mutations report the narrow
//! [`HistoryError`]; everything that touches an [`Actor`](crate::actor::Actor) or
//! [`Universe`](crate::universe::Universe) widens that (and its own contract checks) into
//! [`EngineError`].

use crate::time::Time;
use thiserror::Error;

/// The two ways a [`ValueHistory`](crate::value_history::ValueHistory) mutation can be rejected.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum HistoryError {
    /// `append_transition(t, _)` was called with `t` not strictly after the last transition time.
    #[error("out-of-order transition at {0}")]
    OutOfOrder(Time),
    /// `append_transition(_, v)` was called with `v` equal to the current last value.
    #[error("redundant transition (value unchanged) at {0}")]
    Redundant(Time),
}

/// The full engine error taxonomy.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A [`ValueHistory`](crate::value_history::ValueHistory) transition was appended out of
    /// order.
    #[error("out-of-order transition at {0}")]
    OutOfOrderTransition(Time),

    /// A [`ValueHistory`](crate::value_history::ValueHistory) transition would not have changed
    /// the value.
    #[error("redundant transition at {0}")]
    RedundantTransition(Time),

    /// The synchronous `Signal::receive(state)` form was invoked but the signal's computed
    /// reception time is [`NEVER_RECEIVED`](crate::time::NEVER_RECEIVED).
    #[error("signal cannot be received under the given state")]
    UnreceivableSignal,

    /// A `Signal` primitive operation panicked while the engine invoked it. The calling actor's
    /// state was left unmodified.
    #[error("signal primitive faulted: {0}")]
    SignalFault(String),

    /// `add_signal_to_receive` was called with a signal whose `receiver` does not match the
    /// actor it was added to.
    #[error("signal receiver does not match the actor it was submitted to")]
    InvalidSignalReceiver,

    /// A signal's `when_sent` precedes its receiver's `start`.
    #[error("signal sent at {sent} before receiver's start at {start}")]
    SignalBeforeActorStart {
        /// The signal's `when_sent`.
        sent: Time,
        /// The receiving actor's `start`.
        start: Time,
    },

    /// A commit-time assertion (one of `Actor`'s own invariants) failed. This indicates a bug in the
    /// engine itself, not in caller-supplied code, and is fatal to the enclosing
    /// [`advance_to`](crate::universe::Universe::advance_to) future.
    #[error("engine invariant violated: {0}")]
    EngineInvariantViolated(String),
}

impl From<HistoryError> for EngineError {
    fn from(e: HistoryError) -> Self {
        match e {
            HistoryError::OutOfOrder(t) => EngineError::OutOfOrderTransition(t),
            HistoryError::Redundant(t) => EngineError::RedundantTransition(t),
        }
    }
}

/// Convenience alias for fallible engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
