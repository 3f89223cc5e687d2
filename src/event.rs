//! [`Event`]: the immutable record of one actor receiving one signal.

use crate::actor::Actor;
use crate::signal::SignalRef;
use crate::time::Time;
use std::cmp::Ordering;
use std::sync::{Arc, Weak};

/// The value payload a [`Signal::receive`](crate::signal::Signal::receive) primitive returns:
/// everything about the reception except its identity (`causing_signal`/`affected_object`), which
/// the engine fills in from the signal's own `Arc` in
/// [`receive_and_wrap`](crate::signal::receive_and_wrap).
pub struct Reception<S> {
    /// The receiver's new state, or `None` if this reception destroys the receiver.
    pub state: Option<S>,
    /// Signals this reception emits. Each must be sent at exactly this event's `when`.
    pub signals_emitted: Vec<SignalRef<S>>,
    /// Actors newly created by this reception, starting at exactly this event's `when`.
    pub created_actors: Vec<Arc<Actor<S>>>,
}

impl<S> Reception<S> {
    pub fn new(state: Option<S>, signals_emitted: Vec<SignalRef<S>>, created_actors: Vec<Arc<Actor<S>>>) -> Self {
        Self { state, signals_emitted, created_actors }
    }
}

/// The atomic result of one actor processing one signal.
///
/// Immutable once constructed. Ordered first by `when`, then by the causing signal's
/// [`tie_break_compare`](crate::signal::Signal::tie_break_compare) — see [`Event::compare`], used
/// in place of a blanket `Ord` impl because signals are trait objects and the comparison needs
/// `dyn` dispatch rather than a derived one.
pub struct Event<S> {
    /// The signal whose reception produced this event.
    pub causing_signal: SignalRef<S>,
    /// The instant this event takes effect.
    pub when: Time,
    /// The actor this event happened to. Always equal to `causing_signal.receiver()`.
    pub affected_object: Weak<Actor<S>>,
    /// The receiver's state immediately after this event, or `None` if the receiver is destroyed.
    pub state: Option<S>,
    /// Signals emitted as a side effect of this event.
    pub signals_emitted: Vec<SignalRef<S>>,
    /// Actors created as a side effect of this event.
    pub created_actors: Vec<Arc<Actor<S>>>,
}

impl<S> Event<S> {
    /// Assembles a full event from a signal's identity and the [`Reception`] its primitive
    /// produced. Not a general-purpose public constructor — see
    /// [`receive_and_wrap`](crate::signal::receive_and_wrap), the only intended call site.
    pub(crate) fn new(causing_signal: SignalRef<S>, when: Time, affected_object: Weak<Actor<S>>, reception: Reception<S>) -> Self {
        Self {
            causing_signal,
            when,
            affected_object,
            state: reception.state,
            signals_emitted: reception.signals_emitted,
            created_actors: reception.created_actors,
        }
    }

    /// The total order events are kept in within an actor's event set: by `when`, then by the
    /// causing signals' tie-break order. Per the tie-break contract, this never returns `Equal`
    /// for two events with distinct causing signals.
    pub fn compare(&self, other: &Event<S>) -> Ordering {
        self.when
            .cmp(&other.when)
            .then_with(|| self.causing_signal.tie_break_compare(other.causing_signal.as_ref()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::signal::{Signal, SignalMeta};
    use crate::time::Duration;

    struct Dummy {
        meta: SignalMeta<i32>,
    }
    impl Signal<i32> for Dummy {
        fn meta(&self) -> &SignalMeta<i32> {
            &self.meta
        }
        fn get_propagation_delay(&self, _state: &i32) -> Duration {
            Duration::from_ticks(1)
        }
        fn receive(&self, _when: Time, state: &i32) -> Reception<i32> {
            Reception::new(Some(*state), Vec::new(), Vec::new())
        }
        fn tie_break_compare(&self, _other: &dyn Signal<i32>) -> Ordering {
            Ordering::Equal
        }
    }

    fn event_at(when: Time) -> Event<i32> {
        let signal: SignalRef<i32> = Arc::new(Dummy { meta: SignalMeta::new(Weak::new(), Weak::new(), when) });
        Event::new(signal, when, Weak::new(), Reception::new(Some(0), Vec::new(), Vec::new()))
    }

    #[test]
    fn compare_orders_by_when_first() {
        let a = event_at(Time::from_ticks(1));
        let b = event_at(Time::from_ticks(2));
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&a), Ordering::Greater);
    }
}
