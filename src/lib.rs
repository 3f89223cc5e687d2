//! A library for building asynchronous discrete-event simulations out of independent actors that
//! evolve their state by sending and receiving time-stamped signals.
//!
//! The core is the actor/signal scheduling and state-history subsystem: [`value_history`] keeps a
//! dense record of state over time, [`signal`] computes when a message is due for reception
//! against that record, [`event`] is the immutable result of one reception, [`actor`] ties those
//! together into a single-entity advancement loop with an optimistic-concurrency commit protocol
//! and invalidation cascade, and [`universe`] schedules many actors toward a common deadline on an
//! externally supplied [`executor::Executor`].
//!
//! Application code supplies the state type and the concrete `Signal` implementations; this crate
//! owns none of that domain logic, only the scheduling machinery around it.

pub mod actor;
pub mod error;
pub mod event;
pub mod executor;
pub mod signal;
pub mod time;
pub mod universe;
pub mod value_history;

pub use actor::{Actor, ActorId, AdvanceOutcome, ReceiveOutcome};
pub use error::{EngineError, EngineResult, HistoryError};
pub use event::{Event, Reception};
pub use executor::{AdvanceHandle, Executor, Job, ThreadPoolExecutor};
pub use signal::{Signal, SignalMeta, SignalRef};
pub use time::{Duration, Time, NEVER_RECEIVED};
pub use universe::{FaultSink, Universe};
pub use value_history::ValueHistory;
