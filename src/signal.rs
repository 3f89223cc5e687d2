//! [`Signal`]: a polymorphic message that computes its own reception time from the receiver's
//! state history and, once received, produces an [`Event`].

use crate::actor::Actor;
use crate::error::EngineError;
use crate::event::{Event, Reception};
use crate::time::{Duration, Time, NEVER_RECEIVED};
use crate::value_history::ValueHistory;
use std::any::Any;
use std::cmp::Ordering;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

/// The fields every `Signal` carries regardless of payload, mirroring the shared-state-plus-
/// primitive-methods shape of the trait itself. Concrete signal types embed one of these and
/// forward to it from [`Signal::meta`].
pub struct SignalMeta<S> {
    /// The actor that sent this signal, non-owning (the `Universe` owns actors).
    pub sender: Weak<Actor<S>>,
    /// The actor this signal is addressed to, non-owning.
    pub receiver: Weak<Actor<S>>,
    /// The time at which this signal was sent. Always `>= receiver.start`.
    pub when_sent: Time,
}

impl<S> SignalMeta<S> {
    pub fn new(sender: Weak<Actor<S>>, receiver: Weak<Actor<S>>, when_sent: Time) -> Self {
        Self { sender, receiver, when_sent }
    }
}

/// A reference-counted handle to a signal, shared between a sender's `signals_emitted`, a
/// receiver's `signals_to_receive`, and (once fired) an event's `causing_signal`. Identity for
/// cascade bookkeeping is pointer identity on this `Arc` (`Arc::ptr_eq`), not any derived equality
/// on the payload.
pub type SignalRef<S> = Arc<dyn Signal<S>>;

/// A polymorphic message from a sender actor to a receiver actor.
///
/// Implementors supply three primitive operations — [`get_propagation_delay`],
/// [`receive`](Signal::receive), and [`tie_break_compare`] — and inherit the derived scheduling
/// logic ([`when_received`](Signal::when_received) and its scalar form
/// [`when_received_at`](Signal::when_received_at)) as default methods, the same template-method
/// split the reception-time algorithm uses.
///
/// `receive` is expected to be a pure function of `(when, state)`: the engine may call it
/// speculatively and discard the result under contention (see the optimistic commit loop in
/// `Actor::receive_signal`). It returns a [`Reception`] rather than a full [`Event`] because the
/// event's `causing_signal`/`affected_object` fields are identity, not payload — they are filled
/// in by [`receive_and_wrap`], the one place that already holds this signal's own `Arc`.
pub trait Signal<S>: Send + Sync {
    /// Accessor for the shared sender/receiver/when_sent fields.
    fn meta(&self) -> &SignalMeta<S>;

    /// The delay between `when_sent` and reception, as a function of the receiver's state at the
    /// candidate reception instant. Non-negative, or [`Duration::NEVER_RECEIVED`].
    fn get_propagation_delay(&self, state: &S) -> Duration;

    /// Produces the value payload this signal causes, given the instant `when` and the
    /// receiver's state at that instant. Must be a pure function of its inputs: it is called
    /// outside any actor lock and may be retried if the actor changed concurrently.
    fn receive(&self, when: Time, state: &S) -> Reception<S>;

    /// A deterministic total order against another signal, used to break ties when two signals
    /// would be received at the same instant. Must never return `Ordering::Equal` for two
    /// distinct signals.
    fn tie_break_compare(&self, other: &dyn Signal<S>) -> Ordering;

    /// The actor this signal is addressed to.
    fn receiver(&self) -> Weak<Actor<S>> {
        self.meta().receiver.clone()
    }

    /// The actor that sent this signal.
    fn sender(&self) -> Weak<Actor<S>> {
        self.meta().sender.clone()
    }

    /// The time this signal was sent.
    fn when_sent(&self) -> Time {
        self.meta().when_sent
    }

    /// The reception time for a single, fixed receiver state: [`NEVER_RECEIVED`] if `state` is
    /// `None` (the receiver is destroyed), otherwise `when_sent + get_propagation_delay(state)`,
    /// saturating to [`NEVER_RECEIVED`] rather than overflowing. Never returns `when_sent` itself:
    /// instantaneous reception is disallowed.
    fn when_received_at(&self, state: Option<&S>) -> Time {
        let Some(state) = state else { return NEVER_RECEIVED };
        let delay = self.get_propagation_delay(state);
        self.when_sent() + delay
    }

    /// The reception time given the receiver's full state history: probes successive constant-
    /// value segments of `history`, starting just after `when_sent`, until a segment's own
    /// reception time falls inside it (or precedes it, in which case reception happens at the
    /// segment's start — the discontinuity case), or no such segment exists.
    fn when_received(&self, history: &ValueHistory<S>) -> Time
    where
        S: Clone + PartialEq,
    {
        let mut probe = self.when_sent().next();
        loop {
            if probe.is_never() {
                return NEVER_RECEIVED;
            }
            let (start, end, value) = history.get_timestamped(probe);
            let candidate = self.when_received_at(value.as_ref());
            if candidate.is_never() {
                return NEVER_RECEIVED;
            }
            if candidate < start {
                return start;
            }
            if candidate <= end {
                return candidate;
            }
            if end.is_never() {
                return NEVER_RECEIVED;
            }
            probe = end.next();
        }
    }
}

/// Calls `signal.receive(when, state)` under [`std::panic::catch_unwind`] and assembles the full
/// [`Event`], filling `causing_signal`/`affected_object` from `signal`'s own identity. A panic
/// unwinding out of the primitive is reported as [`EngineError::SignalFault`] instead of
/// propagating, leaving the caller's state untouched — this is the single call site
/// `Actor::receive_signal` uses to invoke user-supplied signal code.
pub(crate) fn receive_and_wrap<S>(
    signal: &SignalRef<S>,
    when: Time,
    state: &S,
) -> Result<Event<S>, EngineError> {
    let reception = std::panic::catch_unwind(AssertUnwindSafe(|| signal.receive(when, state)))
        .map_err(|payload| EngineError::SignalFault(panic_payload_message(payload)))?;
    Ok(Event::new(signal.clone(), when, signal.receiver(), reception))
}

/// The checked synchronous form described in the reception-time algorithm: computes the
/// reception time against a single fixed `state` (not a full history) and, if receivable, invokes
/// [`receive_and_wrap`]. Fails with [`EngineError::UnreceivableSignal`] rather than ever calling
/// the primitive with an impossible reception time.
pub fn receive_checked<S>(signal: &SignalRef<S>, state: &S) -> Result<Event<S>, EngineError> {
    let when = signal.when_received_at(Some(state));
    if when.is_never() {
        return Err(EngineError::UnreceivableSignal);
    }
    receive_and_wrap(signal, when, state)
}

/// Renders a caught panic payload as a human-readable string, the way `log::warn!` call sites
/// need it for [`EngineError::SignalFault`].
pub(crate) fn panic_payload_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "signal primitive panicked with a non-string payload".to_string()
    }
}
