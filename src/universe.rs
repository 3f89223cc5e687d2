//! [`Universe`]: the unordered set of actors, and the parallel advancement that drives them all
//! to a common deadline.

use crate::actor::{Actor, ActorId};
use crate::error::EngineError;
use crate::executor::{AdvanceHandle, Executor, Job, Quiescence};
use crate::time::Time;
use dashmap::DashMap;
use nohash_hasher::NoHashHasher;
use std::hash::BuildHasherDefault;
use std::sync::Arc;

/// Receives notification when a `Signal` primitive faults during parallel advancement, instead of
/// the fault silently terminating the whole `advance_to` future. The default (used when
/// `advance_to` is called with `None`) just logs via `log::warn!`.
pub trait FaultSink: Send + Sync {
    fn on_fault(&self, actor: ActorId, err: &EngineError);
}

struct LoggingFaultSink;

impl FaultSink for LoggingFaultSink {
    fn on_fault(&self, actor: ActorId, err: &EngineError) {
        log::warn!("actor {actor:?} signal fault: {err}");
    }
}

/// An unordered collection of actors, keyed by identity.
///
/// Backed by `dashmap::DashMap`, the same concurrent map this crate's own state-fingerprint table
/// (`checker::bfs::BfsChecker::sources`) uses, keyed with the same `NoHashHasher` pattern since
/// `ActorId`, like `Fingerprint`, already *is* a well-distributed integer and gains nothing from
/// being re-hashed.
pub struct Universe<S> {
    actors: DashMap<ActorId, Arc<Actor<S>>, BuildHasherDefault<NoHashHasher<u64>>>,
}

impl<S> Universe<S> {
    /// An empty universe.
    pub fn new() -> Arc<Self> {
        Arc::new(Self { actors: DashMap::with_hasher(BuildHasherDefault::default()) })
    }

    /// The number of actors currently in this universe.
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    /// `true` if this universe has no actors.
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Adds `actor` to this universe.
    pub fn add(&self, actor: Arc<Actor<S>>) {
        self.actors.insert(actor.id(), actor);
    }

    /// Looks up an actor by identity.
    pub fn get(&self, id: ActorId) -> Option<Arc<Actor<S>>> {
        self.actors.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// A snapshot of every actor currently in this universe.
    pub fn actors(&self) -> Vec<Arc<Actor<S>>> {
        self.actors.iter().map(|entry| Arc::clone(entry.value())).collect()
    }
}

impl<S: Send + Sync + 'static + Clone + PartialEq> Universe<S> {
    /// Advances every actor to `deadline` in parallel on `executor`, returning a future (and
    /// blocking-`.join()`-capable handle) that resolves once every actor's next pending
    /// reception is at or after `deadline`.
    ///
    /// Actors created or re-dirtied (a signal routed to them with a reception time before
    /// `deadline`, after their own task already finished) during advancement have their tasks
    /// resubmitted; the returned handle resolves only once the quiescence barrier's in-flight
    /// count reaches zero. `SignalFault`s are routed to `fault_sink` (defaulting to a logging
    /// sink) rather than failing the whole advancement; any other error fails it immediately.
    pub fn advance_to(
        self: &Arc<Self>,
        deadline: Time,
        executor: Arc<dyn Executor>,
        fault_sink: Option<Arc<dyn FaultSink>>,
    ) -> AdvanceHandle {
        let fault_sink = fault_sink.unwrap_or_else(|| Arc::new(LoggingFaultSink));
        let initial_actors = self.actors();
        let quiescence = Quiescence::new(initial_actors.len() as isize);

        for actor in initial_actors {
            self.submit_actor_task(actor, deadline, Arc::clone(&quiescence), Arc::clone(&executor), Arc::clone(&fault_sink));
        }

        AdvanceHandle { quiescence }
    }

    fn submit_actor_task(
        self: &Arc<Self>,
        actor: Arc<Actor<S>>,
        deadline: Time,
        quiescence: Arc<Quiescence>,
        executor: Arc<dyn Executor>,
        fault_sink: Arc<dyn FaultSink>,
    ) {
        let universe = Arc::clone(self);
        let job: Job = Box::new(move || {
            let actor_id = actor.id();
            log::trace!("actor {actor_id:?} task running toward deadline {deadline}");
            match actor.advance_to(deadline) {
                Ok(outcome) => {
                    for child in outcome.created {
                        universe.add(Arc::clone(&child));
                        quiescence.task_started();
                        universe.submit_actor_task(
                            child,
                            deadline,
                            Arc::clone(&quiescence),
                            Arc::clone(&executor),
                            Arc::clone(&fault_sink),
                        );
                    }
                    for receiver in outcome.dirtied_receivers {
                        if receiver.has_pending_reception_before(deadline) {
                            log::debug!(
                                "actor {:?} dirtied by actor {actor_id:?}'s commit, resubmitting",
                                receiver.id()
                            );
                            quiescence.task_started();
                            universe.submit_actor_task(
                                receiver,
                                deadline,
                                Arc::clone(&quiescence),
                                Arc::clone(&executor),
                                Arc::clone(&fault_sink),
                            );
                        }
                    }
                    if actor.has_pending_reception_before(deadline) {
                        log::debug!("actor {actor_id:?} re-dirtied by a concurrent commit, resubmitting");
                        quiescence.task_started();
                        universe.submit_actor_task(actor, deadline, Arc::clone(&quiescence), Arc::clone(&executor), Arc::clone(&fault_sink));
                    }
                }
                Err(err @ EngineError::SignalFault(_)) => {
                    fault_sink.on_fault(actor_id, &err);
                }
                Err(err) => {
                    log::error!("actor {actor_id:?} advancement failed fatally: {err}");
                    quiescence.fail(err);
                }
            }
            quiescence.task_finished();
        });
        executor.submit(job);
    }
}

impl<S> Default for Universe<S> {
    fn default() -> Self {
        Self { actors: DashMap::with_hasher(BuildHasherDefault::default()) }
    }
}
