//! Three actors forming a signal relay ring (X -> Y -> Z -> X -> ...), each incrementing a
//! counter and forwarding to the next actor with an added delay. Demonstrates `Universe`
//! scheduling several actors in parallel on a `ThreadPoolExecutor` and the causal ordering
//! guarantee: each hop's event strictly follows the one that caused it.

use signalsim::{Actor, Duration, Reception, Signal, SignalMeta, SignalRef, ThreadPoolExecutor, Time, Universe};
use std::cmp::Ordering;
use std::sync::{Arc, Weak};

#[derive(Clone, Copy, Debug, PartialEq)]
struct Counter(u64);

/// A signal addressed to `ring[receiver_index]`. The ring topology is fixed and shared, so a hop
/// forwards by advancing `receiver_index` rather than needing to know its own successor's
/// successor in turn.
struct Relay {
    meta: SignalMeta<Counter>,
    delay: i64,
    ring: Arc<Vec<Weak<Actor<Counter>>>>,
    receiver_index: usize,
}

impl Signal<Counter> for Relay {
    fn meta(&self) -> &SignalMeta<Counter> {
        &self.meta
    }

    fn get_propagation_delay(&self, _state: &Counter) -> Duration {
        Duration::from_ticks(self.delay)
    }

    fn receive(&self, when: Time, state: &Counter) -> Reception<Counter> {
        let new_state = Counter(state.0 + 1);
        let next_index = (self.receiver_index + 1) % self.ring.len();
        let mut emitted = Vec::new();
        if let Some(next) = self.ring[next_index].upgrade() {
            let forwarded: SignalRef<Counter> = Arc::new(Relay {
                meta: SignalMeta::new(self.meta.receiver.clone(), next.downgrade(), when),
                delay: self.delay,
                ring: Arc::clone(&self.ring),
                receiver_index: next_index,
            });
            emitted.push(forwarded);
        }
        Reception::new(Some(new_state), emitted, Vec::new())
    }

    fn tie_break_compare(&self, _other: &dyn Signal<Counter>) -> Ordering {
        Ordering::Equal
    }
}

fn main() {
    env_logger::init();
    let mut args = pico_args::Arguments::from_env();
    let deadline_ticks: i64 = args.opt_value_from_str("--deadline").unwrap().unwrap_or(10);
    let threads: usize = args.opt_value_from_str("--threads").unwrap().unwrap_or_else(|| num_cpus::get());

    let x = Actor::new(Time::from_ticks(0), Counter(0));
    let y = Actor::new(Time::from_ticks(0), Counter(0));
    let z = Actor::new(Time::from_ticks(0), Counter(0));
    let ring = Arc::new(vec![x.downgrade(), y.downgrade(), z.downgrade()]);

    // X -> Y -> Z -> X, so the ring keeps itself busy until the deadline cuts it off.
    let kickoff: SignalRef<Counter> = Arc::new(Relay {
        meta: SignalMeta::new(x.downgrade(), y.downgrade(), Time::from_ticks(0)),
        delay: 1,
        ring,
        receiver_index: 1,
    });
    y.add_signal_to_receive(kickoff).unwrap();

    let universe = Universe::new();
    universe.add(Arc::clone(&x));
    universe.add(Arc::clone(&y));
    universe.add(Arc::clone(&z));

    let executor = Arc::new(ThreadPoolExecutor::new(threads));
    universe
        .advance_to(Time::from_ticks(deadline_ticks), executor, None)
        .join()
        .expect("ring advancement should not fault");

    for (name, actor) in [("X", &x), ("Y", &y), ("Z", &z)] {
        println!("{name}: {} events, final state {:?}", actor.get_events().len(), actor.get_last_event().map(|e| e.state));
    }
}
