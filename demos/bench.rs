//! Benchmarks `Universe::advance_to` over a ring of N relay actors, following this crate's own
//! `examples/bench.rs` convention of a small `pico-args`-driven CLI that prints wall-clock timing
//! rather than wiring up a full criterion harness for a one-off measurement.

use signalsim::{Actor, Duration, Reception, Signal, SignalMeta, SignalRef, ThreadPoolExecutor, Time, Universe};
use std::cmp::Ordering;
use std::sync::{Arc, Weak};
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Counter(u64);

struct Relay {
    meta: SignalMeta<Counter>,
    ring: Arc<Vec<Weak<Actor<Counter>>>>,
    receiver_index: usize,
}

impl Signal<Counter> for Relay {
    fn meta(&self) -> &SignalMeta<Counter> {
        &self.meta
    }

    fn get_propagation_delay(&self, _state: &Counter) -> Duration {
        Duration::from_ticks(1)
    }

    fn receive(&self, when: Time, state: &Counter) -> Reception<Counter> {
        let next_index = (self.receiver_index + 1) % self.ring.len();
        let mut emitted = Vec::new();
        if let Some(next) = self.ring[next_index].upgrade() {
            emitted.push(Arc::new(Relay {
                meta: SignalMeta::new(self.meta.receiver.clone(), next.downgrade(), when),
                ring: Arc::clone(&self.ring),
                receiver_index: next_index,
            }) as SignalRef<Counter>);
        }
        Reception::new(Some(Counter(state.0 + 1)), emitted, Vec::new())
    }

    fn tie_break_compare(&self, _other: &dyn Signal<Counter>) -> Ordering {
        Ordering::Equal
    }
}

fn main() {
    env_logger::init();
    let mut args = pico_args::Arguments::from_env();
    let actor_count: usize = args.opt_value_from_str("--actors").unwrap().unwrap_or(1_000);
    let deadline_ticks: i64 = args.opt_value_from_str("--deadline").unwrap().unwrap_or(1_000);
    let threads: usize = args.opt_value_from_str("--threads").unwrap().unwrap_or_else(num_cpus::get);

    let actors: Vec<Arc<Actor<Counter>>> =
        (0..actor_count).map(|_| Actor::new(Time::from_ticks(0), Counter(0))).collect();
    let ring: Arc<Vec<Weak<Actor<Counter>>>> = Arc::new(actors.iter().map(|a| a.downgrade()).collect());

    let kickoff: SignalRef<Counter> = Arc::new(Relay {
        meta: SignalMeta::new(actors[0].downgrade(), actors[0].downgrade(), Time::from_ticks(0)),
        ring: Arc::clone(&ring),
        receiver_index: 0,
    });
    actors[0].add_signal_to_receive(kickoff).unwrap();

    let universe = Universe::new();
    for actor in &actors {
        universe.add(Arc::clone(actor));
    }

    let executor = Arc::new(ThreadPoolExecutor::new(threads));
    let start = Instant::now();
    universe
        .advance_to(Time::from_ticks(deadline_ticks), executor, None)
        .join()
        .expect("advancement should not fault");
    let elapsed = start.elapsed();

    let total_events: usize = actors.iter().map(|a| a.get_events().len()).sum();
    println!(
        "{actor_count} actors, deadline {deadline_ticks} ticks, {threads} threads: {total_events} events in {elapsed:?}"
    );
}
