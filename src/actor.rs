//! [`Actor`]: owns a state history, a committed event set, and a pending signal queue, and
//! drives its own advancement through the optimistic commit protocol.

use crate::error::{EngineError, EngineResult};
use crate::event::Event;
use crate::signal::{self, SignalRef};
use crate::time::Time;
use crate::value_history::ValueHistory;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};

/// A unique, monotonically assigned actor identity. Doubles as the lock-ordering key for
/// multi-actor commits: locks are always acquired in ascending `ActorId` order.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ActorId(u64);

impl ActorId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        ActorId(NEXT.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({})", self.0)
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl nohash_hasher::IsEnabled for ActorId {}

struct ActorInner<S> {
    state_history: ValueHistory<S>,
    /// Kept sorted by [`Event::compare`] at all times.
    events: Vec<Arc<Event<S>>>,
    signals_to_receive: Vec<SignalRef<S>>,
    version: u64,
}

/// A simulated entity: a state history plus the machinery to advance it one signal reception at
/// a time.
///
/// All mutable state lives behind one `parking_lot::Mutex` (chosen, like the rest of the crate's
/// locking, for non-poisoning semantics and a smaller footprint than `std::sync::Mutex`).
/// Multi-actor commits acquire several actors' mutexes at once, always in ascending [`ActorId`]
/// order, to avoid deadlock.
pub struct Actor<S> {
    id: ActorId,
    start: Time,
    self_ref: Weak<Actor<S>>,
    inner: Mutex<ActorInner<S>>,
}

/// What a successful [`Actor::receive_signal`] hands back to its caller (normally a `Universe`):
/// any actors the committed event created, which the caller is responsible for adding to the
/// universe before they can receive signals of their own, plus any other actors whose pending
/// signal set changed as a side effect of the commit (a signal routed to them directly, or
/// reinstated by the invalidation cascade) and so may need their own task resubmitted.
pub struct ReceiveOutcome<S> {
    pub created_actors: Vec<Arc<Actor<S>>>,
    pub dirtied_receivers: Vec<Arc<Actor<S>>>,
}

/// Everything produced while advancing one actor as far toward a deadline as its own pending
/// signals allow: actors it created along the way, and other actors whose pending signal set was
/// dirtied by one of its commits.
pub struct AdvanceOutcome<S> {
    pub created: Vec<Arc<Actor<S>>>,
    pub dirtied_receivers: Vec<Arc<Actor<S>>>,
}

enum TryOutcome<S> {
    /// No pending signal is currently receivable.
    Idle,
    /// An optimistic precondition was invalidated by a concurrent mutation; the caller should
    /// call `receive_signal` again.
    Retry,
    Committed(ReceiveOutcome<S>),
}

impl<S> Actor<S> {
    /// This actor's identity.
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// The time this actor came into existence.
    pub fn start(&self) -> Time {
        self.start
    }

    /// A non-owning reference to this actor, for use as a `Signal`'s sender or receiver.
    pub fn downgrade(&self) -> Weak<Actor<S>> {
        self.self_ref.clone()
    }
}

impl<S: Send + Sync + 'static + Clone + PartialEq> Actor<S> {
    /// Creates a new actor starting at `start` with `initial_state`, wrapped in the `Arc` every
    /// `Signal` sender/receiver reference needs. Built with `Arc::new_cyclic` so the actor can
    /// hand out weak references to itself (for signals it sends) without a chicken-and-egg
    /// construction order.
    pub fn new(start: Time, initial_state: S) -> Arc<Self> {
        let state_history = if start == Time::START_OF_TIME {
            ValueHistory::from_parts(Some(initial_state), BTreeMap::new())
        } else {
            let mut transitions = BTreeMap::new();
            transitions.insert(start, Some(initial_state));
            ValueHistory::from_parts(None, transitions)
        };
        Arc::new_cyclic(|weak| Actor {
            id: ActorId::next(),
            start,
            self_ref: weak.clone(),
            inner: Mutex::new(ActorInner {
                state_history,
                events: Vec::new(),
                signals_to_receive: Vec::new(),
                version: 0,
            }),
        })
    }

    /// Adds `signal` to this actor's pending set. Fails with [`EngineError::InvalidSignalReceiver`]
    /// if `signal`'s receiver is not this actor, and with [`EngineError::SignalBeforeActorStart`]
    /// if it was sent before this actor existed.
    pub fn add_signal_to_receive(&self, signal: SignalRef<S>) -> EngineResult<()> {
        if !Weak::ptr_eq(&signal.receiver(), &self.self_ref) {
            return Err(EngineError::InvalidSignalReceiver);
        }
        if signal.when_sent() < self.start {
            return Err(EngineError::SignalBeforeActorStart { sent: signal.when_sent(), start: self.start });
        }
        let mut guard = self.inner.lock();
        guard.signals_to_receive.push(signal);
        guard.version += 1;
        Ok(())
    }

    /// A snapshot of this actor's state history.
    pub fn get_state_history(&self) -> ValueHistory<S> {
        self.inner.lock().state_history.clone()
    }

    /// A snapshot of this actor's committed events, ordered by [`Event::compare`].
    pub fn get_events(&self) -> Vec<Arc<Event<S>>> {
        self.inner.lock().events.clone()
    }

    /// A snapshot of this actor's pending signals.
    pub fn get_signals_to_receive(&self) -> Vec<SignalRef<S>> {
        self.inner.lock().signals_to_receive.clone()
    }

    /// The most recently ordered committed event, if any.
    pub fn get_last_event(&self) -> Option<Arc<Event<S>>> {
        self.inner.lock().events.last().cloned()
    }

    /// The earliest time at which a currently pending signal would be received, or `None` if no
    /// pending signal is ever receivable under the current state history.
    fn next_reception_time(&self) -> Option<Time> {
        let guard = self.inner.lock();
        guard
            .signals_to_receive
            .iter()
            .map(|s| s.when_received(&guard.state_history))
            .filter(|t| !t.is_never())
            .min()
    }

    /// Processes the single next pending signal due for reception, if any. Returns `Ok(None)` if
    /// there was nothing to receive. Internally retries on optimistic-concurrency conflicts; a
    /// [`EngineError::SignalFault`] from the signal's own primitive is propagated immediately
    /// without retrying (the calling actor is left unmodified). Bounded retries guard against a
    /// cascade that never stabilizes, which would indicate an engine bug rather than legitimate
    /// contention.
    pub fn receive_signal(self: &Arc<Self>) -> EngineResult<Option<ReceiveOutcome<S>>> {
        const MAX_ATTEMPTS: u32 = 64;
        for _ in 0..MAX_ATTEMPTS {
            match self.try_receive_signal_once()? {
                TryOutcome::Idle => return Ok(None),
                TryOutcome::Retry => continue,
                TryOutcome::Committed(outcome) => return Ok(Some(outcome)),
            }
        }
        Err(EngineError::EngineInvariantViolated(format!(
            "receive_signal on actor {:?} did not converge after {} attempts",
            self.id, MAX_ATTEMPTS
        )))
    }

    fn try_receive_signal_once(self: &Arc<Self>) -> EngineResult<TryOutcome<S>> {
        let (signals_snapshot, history_snapshot, v0) = {
            let guard = self.inner.lock();
            (guard.signals_to_receive.clone(), guard.state_history.clone(), guard.version)
        };

        let Some((when, signal)) = select_best_candidate(&signals_snapshot, &history_snapshot) else {
            return Ok(TryOutcome::Idle);
        };
        log::trace!("actor {:?} candidate signal selected for reception at {}", self.id, when);

        {
            let guard = self.inner.lock();
            if guard.version != v0 {
                return Ok(TryOutcome::Retry);
            }
        }

        let state = {
            let guard = self.inner.lock();
            guard.state_history.get(when)
        };
        let Some(state) = state else {
            return Err(EngineError::EngineInvariantViolated(format!(
                "actor {:?} selected reception time {} with no live state",
                self.id, when
            )));
        };

        let event = Arc::new(signal::receive_and_wrap(&signal, when, &state)?);

        let mut initial = vec![self.clone()];
        for es in &event.signals_emitted {
            if let Some(a) = es.receiver().upgrade() {
                initial.push(a);
            }
        }
        initial.extend(event.created_actors.iter().cloned());

        let entries = gather_commit_set(initial, event.when);
        let mut guards: Vec<(ActorId, Arc<Actor<S>>, parking_lot::MutexGuard<'_, ActorInner<S>>)> =
            Vec::with_capacity(entries.len());
        for actor in &entries {
            let guard = actor.inner.lock();
            guards.push((actor.id, actor.clone(), guard));
        }

        let self_version = guards.iter().find(|(id, _, _)| *id == self.id).map(|(_, _, g)| g.version);
        if self_version != Some(v0) {
            return Ok(TryOutcome::Retry);
        }

        let locked_ids: BTreeSet<ActorId> = guards.iter().map(|(id, _, _)| *id).collect();
        for (_, _, guard) in &guards {
            for f in guard.events.iter().filter(|f| f.when >= event.when) {
                for es in &f.signals_emitted {
                    if let Some(a) = es.receiver().upgrade() {
                        if !locked_ids.contains(&a.id) {
                            log::debug!("cascade touches an actor outside the gathered commit set; retrying");
                            return Ok(TryOutcome::Retry);
                        }
                    }
                }
            }
        }

        let dirtied_receivers = commit(self.id, &event, &mut guards)?;
        log::debug!("actor {:?} committed event at {}", self.id, event.when);

        Ok(TryOutcome::Committed(ReceiveOutcome { created_actors: event.created_actors.clone(), dirtied_receivers }))
    }

    /// `true` if this actor currently has a pending signal receivable before `deadline`. Used by
    /// `Universe::advance_to` to detect an actor re-dirtied by a concurrent commit after its own
    /// `advance_to` loop already exited, so its task can be resubmitted.
    pub fn has_pending_reception_before(&self, deadline: Time) -> bool {
        self.next_reception_time().is_some_and(|t| t < deadline)
    }

    /// Repeatedly receives signals until the actor's next reception time is at or after
    /// `deadline`, or there is nothing left to receive. Returns every actor created along the
    /// way, for the caller (normally a `Universe`) to add to the population, and every other
    /// actor dirtied by one of this actor's commits, for the caller to resubmit a task for.
    pub fn advance_to(self: &Arc<Self>, deadline: Time) -> EngineResult<AdvanceOutcome<S>> {
        let mut created = Vec::new();
        let mut dirtied_receivers: BTreeMap<ActorId, Arc<Actor<S>>> = BTreeMap::new();
        loop {
            match self.next_reception_time() {
                Some(next) if next < deadline => match self.receive_signal()? {
                    Some(outcome) => {
                        created.extend(outcome.created_actors);
                        for r in outcome.dirtied_receivers {
                            dirtied_receivers.insert(r.id(), r);
                        }
                    }
                    None => break,
                },
                _ => break,
            }
        }
        Ok(AdvanceOutcome { created, dirtied_receivers: dirtied_receivers.into_values().collect() })
    }
}

fn select_best_candidate<S: Clone + PartialEq>(
    signals: &[SignalRef<S>],
    history: &ValueHistory<S>,
) -> Option<(Time, SignalRef<S>)> {
    let mut best: Option<(Time, SignalRef<S>)> = None;
    for s in signals {
        let t = s.when_received(history);
        if t.is_never() {
            continue;
        }
        best = match best {
            None => Some((t, s.clone())),
            Some((bt, bs)) => {
                if t < bt || (t == bt && s.tie_break_compare(bs.as_ref()) == Ordering::Less) {
                    Some((t, s.clone()))
                } else {
                    Some((bt, bs))
                }
            }
        };
    }
    best
}

/// Expands `initial` to the full set of actors whose locks a commit at `new_event_when` needs:
/// every actor reachable by following "this actor has an event at or after `new_event_when` that
/// emitted a signal to another actor" edges. The `>=` comparison is a deliberately conservative
/// superset of the precise `Event::compare`-based invalidation rule — over-locking is harmless,
/// under-locking is not.
fn gather_commit_set<S>(initial: Vec<Arc<Actor<S>>>, new_event_when: Time) -> Vec<Arc<Actor<S>>> {
    let mut set: BTreeMap<ActorId, Arc<Actor<S>>> = BTreeMap::new();
    let mut frontier = initial;
    while let Some(actor) = frontier.pop() {
        if set.contains_key(&actor.id) {
            continue;
        }
        let emitted_receivers: Vec<Weak<Actor<S>>> = {
            let guard = actor.inner.lock();
            guard
                .events
                .iter()
                .filter(|ev| ev.when >= new_event_when)
                .flat_map(|ev| ev.signals_emitted.iter().map(|s| s.receiver()))
                .collect()
        };
        set.insert(actor.id, actor.clone());
        for w in emitted_receivers {
            if let Some(a) = w.upgrade() {
                if !set.contains_key(&a.id) {
                    frontier.push(a);
                }
            }
        }
    }
    set.into_values().collect()
}

type Guards<'a, S> = Vec<(ActorId, Arc<Actor<S>>, parking_lot::MutexGuard<'a, ActorInner<S>>)>;

fn commit<S: Clone + PartialEq>(
    self_id: ActorId,
    event: &Arc<Event<S>>,
    guards: &mut Guards<'_, S>,
) -> EngineResult<Vec<Arc<Actor<S>>>> {
    let self_idx = index_of(guards, self_id)
        .ok_or_else(|| EngineError::EngineInvariantViolated("affected actor missing from its own commit set".into()))?;

    let mut dirtied: BTreeSet<ActorId> = BTreeSet::new();

    invalidate_events_after(guards, self_idx, event, &mut dirtied)?;

    {
        let (_, _, guard) = &mut guards[self_idx];
        guard.version += 1;
        let pos = guard.events.partition_point(|f| f.compare(event) == Ordering::Less);
        guard.events.insert(pos, event.clone());
        guard.state_history.set_value_from(event.when, event.state.clone());
        debug_assert!(
            guard.state_history.get(event.when) == event.state,
            "state history did not reflect the event just committed"
        );
        if let Some(i) = guard.signals_to_receive.iter().position(|s| Arc::ptr_eq(s, &event.causing_signal)) {
            guard.signals_to_receive.remove(i);
        }
    }

    for es in &event.signals_emitted {
        let Some(receiver) = es.receiver().upgrade() else {
            // The receiver no longer exists; the emitted signal is simply dropped.
            continue;
        };
        let idx = index_of(guards, receiver.id).ok_or_else(|| {
            EngineError::EngineInvariantViolated("emitted signal's receiver missing from commit set".into())
        })?;
        let (_, _, guard) = &mut guards[idx];
        guard.signals_to_receive.push(es.clone());
        guard.version += 1;
        log::debug!("routed emitted signal to actor {:?}", receiver.id);
        if receiver.id != self_id {
            dirtied.insert(receiver.id);
        }
    }

    dirtied.remove(&self_id);
    Ok(dirtied.into_iter().filter_map(|id| index_of(guards, id).map(|i| guards[i].1.clone())).collect())
}

fn index_of<S>(guards: &Guards<'_, S>, id: ActorId) -> Option<usize> {
    guards.iter().position(|(gid, _, _)| *gid == id)
}

/// Removes every event in the `idx`th actor's event set that sorts after `event`, reinstating
/// their causing signals and recursively invalidating whatever those events emitted.
fn invalidate_events_after<S: Clone + PartialEq>(
    guards: &mut Guards<'_, S>,
    idx: usize,
    event: &Event<S>,
    dirtied: &mut BTreeSet<ActorId>,
) -> EngineResult<()> {
    let invalidated = {
        let (_, _, guard) = &mut guards[idx];
        let mut kept = Vec::with_capacity(guard.events.len());
        let mut invalidated = Vec::new();
        for f in guard.events.drain(..) {
            if f.compare(event) == Ordering::Greater {
                invalidated.push(f);
            } else {
                kept.push(f);
            }
        }
        guard.events = kept;
        invalidated
    };
    for f in invalidated {
        log::debug!("invalidating event at {} superseded by commit at {}", f.when, event.when);
        rescind_event(guards, idx, &f, dirtied)?;
    }
    Ok(())
}

/// Puts `f`'s causing signal back into the `idx`th actor's pending set and recursively undoes
/// everything `f` had caused elsewhere: events it caused are removed (and themselves rescinded),
/// and a still-pending signal it emitted is pulled back out of its receiver's queue before that
/// receiver can fire it a second time once the reinstated signal re-emits a fresh one.
fn rescind_event<S: Clone + PartialEq>(
    guards: &mut Guards<'_, S>,
    idx: usize,
    f: &Arc<Event<S>>,
    dirtied: &mut BTreeSet<ActorId>,
) -> EngineResult<()> {
    {
        let (id, _, guard) = &mut guards[idx];
        guard.signals_to_receive.push(f.causing_signal.clone());
        guard.version += 1;
        dirtied.insert(*id);
    }
    for es in &f.signals_emitted {
        let Some(receiver) = es.receiver().upgrade() else { continue };
        let target_idx = index_of(guards, receiver.id).ok_or_else(|| {
            EngineError::EngineInvariantViolated("invalidation cascade reached an actor outside the commit set".into())
        })?;
        {
            let (_, _, guard) = &mut guards[target_idx];
            if let Some(i) = guard.signals_to_receive.iter().position(|s| Arc::ptr_eq(s, es)) {
                guard.signals_to_receive.remove(i);
                guard.version += 1;
            }
        }
        remove_events_caused_by(guards, target_idx, es, dirtied)?;
    }
    Ok(())
}

fn remove_events_caused_by<S: Clone + PartialEq>(
    guards: &mut Guards<'_, S>,
    idx: usize,
    signal: &SignalRef<S>,
    dirtied: &mut BTreeSet<ActorId>,
) -> EngineResult<()> {
    let removed = {
        let (_, _, guard) = &mut guards[idx];
        let mut kept = Vec::with_capacity(guard.events.len());
        let mut removed = Vec::new();
        for f in guard.events.drain(..) {
            if Arc::ptr_eq(&f.causing_signal, signal) {
                removed.push(f);
            } else {
                kept.push(f);
            }
        }
        guard.events = kept;
        removed
    };
    for f in &removed {
        rescind_event(guards, idx, f, dirtied)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::event::Reception;
    use crate::signal::{Signal, SignalMeta};
    use crate::time::Duration;

    struct Delay {
        meta: SignalMeta<&'static str>,
        delay: i64,
        to_state: &'static str,
    }
    impl Signal<&'static str> for Delay {
        fn meta(&self) -> &SignalMeta<&'static str> {
            &self.meta
        }
        fn get_propagation_delay(&self, _state: &&'static str) -> Duration {
            Duration::from_ticks(self.delay)
        }
        fn receive(&self, _when: Time, _state: &&'static str) -> Reception<&'static str> {
            Reception::new(Some(self.to_state), Vec::new(), Vec::new())
        }
        fn tie_break_compare(&self, _other: &dyn Signal<&'static str>) -> Ordering {
            Ordering::Equal
        }
    }

    #[test]
    fn constant_actor_with_no_signals_is_idle() {
        let a = Actor::new(Time::from_ticks(0), "A");
        let outcome = a.advance_to(Time::from_ticks(10)).unwrap();
        assert!(outcome.created.is_empty());
        assert!(outcome.dirtied_receivers.is_empty());
        assert_eq!(a.get_state_history().get(Time::from_ticks(5)), Some("A"));
        assert!(a.get_events().is_empty());
        assert!(a.get_signals_to_receive().is_empty());
    }

    #[test]
    fn single_self_signal_transitions_state_and_clears_queue() {
        let a = Actor::new(Time::from_ticks(0), "A");
        let signal: SignalRef<&'static str> = Arc::new(Delay {
            meta: SignalMeta::new(a.downgrade(), a.downgrade(), Time::from_ticks(0)),
            delay: 3,
            to_state: "B",
        });
        a.add_signal_to_receive(signal).unwrap();

        a.advance_to(Time::from_ticks(5)).unwrap();

        let history = a.get_state_history();
        assert_eq!(history.get(Time::from_ticks(2)), Some("A"));
        assert_eq!(history.get(Time::from_ticks(3)), Some("B"));
        assert_eq!(history.get(Time::from_ticks(5)), Some("B"));
        assert_eq!(a.get_events().len(), 1);
        assert!(a.get_signals_to_receive().is_empty());
    }

    #[test]
    fn unreceivable_signal_never_fires_and_does_not_block_advancement() {
        struct NeverDelay {
            meta: SignalMeta<&'static str>,
        }
        impl Signal<&'static str> for NeverDelay {
            fn meta(&self) -> &SignalMeta<&'static str> {
                &self.meta
            }
            fn get_propagation_delay(&self, _state: &&'static str) -> Duration {
                Duration::NEVER_RECEIVED
            }
            fn receive(&self, _when: Time, _state: &&'static str) -> Reception<&'static str> {
                unreachable!("a never-receivable signal must not be delivered")
            }
            fn tie_break_compare(&self, _other: &dyn Signal<&'static str>) -> Ordering {
                Ordering::Equal
            }
        }

        let a = Actor::new(Time::from_ticks(0), "A");
        let signal: SignalRef<&'static str> = Arc::new(NeverDelay {
            meta: SignalMeta::new(a.downgrade(), a.downgrade(), Time::from_ticks(0)),
        });
        a.add_signal_to_receive(signal).unwrap();

        a.advance_to(Time::from_ticks(100)).unwrap();

        assert_eq!(a.get_state_history().get(Time::from_ticks(100)), Some("A"));
        assert!(a.get_events().is_empty());
        assert_eq!(a.get_signals_to_receive().len(), 1);
    }

    #[test]
    fn add_signal_to_receive_rejects_wrong_receiver() {
        let a = Actor::new(Time::from_ticks(0), "A");
        let b = Actor::new(Time::from_ticks(0), "A");
        let signal: SignalRef<&'static str> = Arc::new(Delay {
            meta: SignalMeta::new(a.downgrade(), a.downgrade(), Time::from_ticks(0)),
            delay: 1,
            to_state: "B",
        });
        assert!(matches!(b.add_signal_to_receive(signal), Err(EngineError::InvalidSignalReceiver)));
    }

    #[test]
    fn add_signal_to_receive_rejects_signal_before_start() {
        let a = Actor::new(Time::from_ticks(10), "A");
        let signal: SignalRef<&'static str> = Arc::new(Delay {
            meta: SignalMeta::new(a.downgrade(), a.downgrade(), Time::from_ticks(0)),
            delay: 1,
            to_state: "B",
        });
        assert!(matches!(
            a.add_signal_to_receive(signal),
            Err(EngineError::SignalBeforeActorStart { .. })
        ));
    }

    /// Scenario: an out-of-order signal commits an event earlier than one already recorded,
    /// triggering the invalidation cascade. `s1` fires first and emits a signal to `b`; `s2`
    /// arrives afterward with an earlier reception time and supersedes `s1`'s event, which is
    /// rescinded. Because `s1`'s delay does not depend on the receiver's state, re-advancing
    /// recomputes the same reception time and the actor settles with both events present. `b`'s
    /// exact outcome (whether it ends up having received `s1`'s forwarded signal or having it
    /// rescinded) is left unchecked here; only the invariants that must hold regardless are
    /// checked.
    #[test]
    fn out_of_order_signal_invalidates_existing_event_and_retracts_its_emission() {
        struct ToB {
            meta: SignalMeta<i64>,
        }
        impl Signal<i64> for ToB {
            fn meta(&self) -> &SignalMeta<i64> {
                &self.meta
            }
            fn get_propagation_delay(&self, _state: &i64) -> Duration {
                Duration::from_ticks(1)
            }
            fn receive(&self, _when: Time, state: &i64) -> Reception<i64> {
                Reception::new(Some(state + 100), Vec::new(), Vec::new())
            }
            fn tie_break_compare(&self, _other: &dyn Signal<i64>) -> Ordering {
                Ordering::Equal
            }
        }

        struct S1 {
            meta: SignalMeta<i64>,
            receiver_b: Weak<Actor<i64>>,
        }
        impl Signal<i64> for S1 {
            fn meta(&self) -> &SignalMeta<i64> {
                &self.meta
            }
            fn get_propagation_delay(&self, _state: &i64) -> Duration {
                Duration::from_ticks(5)
            }
            fn receive(&self, when: Time, _state: &i64) -> Reception<i64> {
                let forwarded: SignalRef<i64> =
                    Arc::new(ToB { meta: SignalMeta::new(self.meta.receiver.clone(), self.receiver_b.clone(), when) });
                Reception::new(Some(1), vec![forwarded], Vec::new())
            }
            fn tie_break_compare(&self, _other: &dyn Signal<i64>) -> Ordering {
                Ordering::Equal
            }
        }

        struct S2 {
            meta: SignalMeta<i64>,
        }
        impl Signal<i64> for S2 {
            fn meta(&self) -> &SignalMeta<i64> {
                &self.meta
            }
            fn get_propagation_delay(&self, _state: &i64) -> Duration {
                Duration::from_ticks(2)
            }
            fn receive(&self, _when: Time, _state: &i64) -> Reception<i64> {
                Reception::new(Some(2), Vec::new(), Vec::new())
            }
            fn tie_break_compare(&self, _other: &dyn Signal<i64>) -> Ordering {
                Ordering::Equal
            }
        }

        let a = Actor::new(Time::from_ticks(0), 0i64);
        let b = Actor::new(Time::from_ticks(0), 0i64);

        let s1: SignalRef<i64> =
            Arc::new(S1 { meta: SignalMeta::new(a.downgrade(), a.downgrade(), Time::from_ticks(0)), receiver_b: b.downgrade() });
        a.add_signal_to_receive(s1).unwrap();

        // s1 fires first: commits E1@5 and routes a forwarded signal to b.
        a.receive_signal().unwrap().expect("s1 should commit");
        assert_eq!(a.get_events().len(), 1);
        assert_eq!(a.get_events()[0].when, Time::from_ticks(5));
        assert_eq!(b.get_signals_to_receive().len(), 1);

        // s2 arrives later, addressed at t=0 with a shorter delay: it supersedes the
        // already-committed event at t=5.
        let s2: SignalRef<i64> = Arc::new(S2 { meta: SignalMeta::new(a.downgrade(), a.downgrade(), Time::from_ticks(0)) });
        a.add_signal_to_receive(s2).unwrap();
        a.advance_to(Time::from_ticks(100)).unwrap();

        let events = a.get_events();
        assert_eq!(events.len(), 2, "both s2's event and the re-received s1 should be present");
        assert_eq!(events[0].when, Time::from_ticks(2));
        assert_eq!(events[0].state, Some(2));
        assert_eq!(events[1].when, Time::from_ticks(5));
        assert_eq!(events[1].state, Some(1));
        assert!(a.get_signals_to_receive().is_empty());

        // Invariants that must hold on both actors regardless of which way `b` resolved.
        for actor in [&a, &b] {
            let history = actor.get_state_history();
            for event in actor.get_events() {
                assert_eq!(history.get(event.when), event.state, "state history must reflect every committed event");
            }
            for signal in actor.get_signals_to_receive() {
                assert!(Weak::ptr_eq(&signal.receiver(), &actor.downgrade()));
                assert!(signal.when_sent() >= actor.start());
            }
        }
    }

    /// Scenario: an event that destroys its receiver (state becomes `None`) freezes the state
    /// history and makes every later-reception-time signal permanently unreceivable. The
    /// destroying signal's own reception always succeeds; only signals racing to land *after* it
    /// are affected.
    #[test]
    fn destroying_event_freezes_history_and_strands_later_signals() {
        struct Destroy {
            meta: SignalMeta<i64>,
        }
        impl Signal<i64> for Destroy {
            fn meta(&self) -> &SignalMeta<i64> {
                &self.meta
            }
            fn get_propagation_delay(&self, _state: &i64) -> Duration {
                Duration::from_ticks(5)
            }
            fn receive(&self, _when: Time, _state: &i64) -> Reception<i64> {
                Reception::new(None, Vec::new(), Vec::new())
            }
            fn tie_break_compare(&self, _other: &dyn Signal<i64>) -> Ordering {
                Ordering::Equal
            }
        }

        struct Increment {
            meta: SignalMeta<i64>,
        }
        impl Signal<i64> for Increment {
            fn meta(&self) -> &SignalMeta<i64> {
                &self.meta
            }
            fn get_propagation_delay(&self, _state: &i64) -> Duration {
                Duration::from_ticks(20)
            }
            fn receive(&self, _when: Time, state: &i64) -> Reception<i64> {
                Reception::new(Some(state + 1), Vec::new(), Vec::new())
            }
            fn tie_break_compare(&self, _other: &dyn Signal<i64>) -> Ordering {
                Ordering::Equal
            }
        }

        let a = Actor::new(Time::from_ticks(0), 0i64);
        let destroy: SignalRef<i64> = Arc::new(Destroy { meta: SignalMeta::new(a.downgrade(), a.downgrade(), Time::from_ticks(0)) });
        let later: SignalRef<i64> = Arc::new(Increment { meta: SignalMeta::new(a.downgrade(), a.downgrade(), Time::from_ticks(0)) });
        a.add_signal_to_receive(destroy).unwrap();
        a.add_signal_to_receive(later).unwrap();

        a.advance_to(Time::from_ticks(100)).unwrap();

        assert_eq!(a.get_events().len(), 1);
        assert_eq!(a.get_events()[0].state, None);
        assert_eq!(a.get_state_history().get(Time::from_ticks(50)), None);
        // `later`'s reception would have fallen at t=20, after the destroying event at t=5, so it
        // is never received: null state makes `when_received` return `NEVER_RECEIVED`.
        assert_eq!(a.get_signals_to_receive().len(), 1);
    }
}
