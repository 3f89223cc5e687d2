//! A bucket actor drained by a leak signal whose propagation delay depends on the current fill
//! level, and filled by deposits that arrive on a fixed schedule. Demonstrates an unreceivable
//! signal (the leak never fires once the bucket is empty: `1 / fill_level` is undefined at zero,
//! which `get_propagation_delay` reports as `Duration::NEVER_RECEIVED`) alongside cascading
//! destruction (once a deposit tips the bucket over capacity it is destroyed, i.e. its state
//! becomes `None`, and every signal still addressed to it is never received again).

use signalsim::{Actor, Duration, Reception, Signal, SignalMeta, SignalRef, Time};
use std::cmp::Ordering;
use std::sync::Arc;

const CAPACITY: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Bucket {
    fill: f64,
}

/// Drains the bucket at a rate inversely proportional to how full it is (a fuller bucket leaks
/// faster), rescheduling itself after every drain. Never fires against an empty bucket.
struct Leak {
    meta: SignalMeta<Bucket>,
}

impl Signal<Bucket> for Leak {
    fn meta(&self) -> &SignalMeta<Bucket> {
        &self.meta
    }

    fn get_propagation_delay(&self, state: &Bucket) -> Duration {
        if state.fill <= 0.0 {
            return Duration::NEVER_RECEIVED;
        }
        Duration::from_ticks((100.0 / state.fill).round() as i64)
    }

    fn receive(&self, when: Time, state: &Bucket) -> Reception<Bucket> {
        let drained = Bucket { fill: (state.fill - 1.0).max(0.0) };
        let actor = self.meta.receiver.upgrade().expect("receiver still alive while handling its own signal");
        let reschedule: SignalRef<Bucket> = Arc::new(Leak { meta: SignalMeta::new(actor.downgrade(), actor.downgrade(), when) });
        Reception::new(Some(drained), vec![reschedule], Vec::new())
    }

    fn tie_break_compare(&self, _other: &dyn Signal<Bucket>) -> Ordering {
        Ordering::Equal
    }
}

/// A one-shot deposit. If it would overflow the bucket's capacity, the bucket is destroyed
/// instead (state becomes `None`) rather than clamped, to exercise the cascading-destruction path.
struct Deposit {
    meta: SignalMeta<Bucket>,
    amount: f64,
}

impl Signal<Bucket> for Deposit {
    fn meta(&self) -> &SignalMeta<Bucket> {
        &self.meta
    }

    fn get_propagation_delay(&self, _state: &Bucket) -> Duration {
        Duration::from_ticks(1)
    }

    fn receive(&self, _when: Time, state: &Bucket) -> Reception<Bucket> {
        let new_fill = state.fill + self.amount;
        if new_fill > CAPACITY {
            Reception::new(None, Vec::new(), Vec::new())
        } else {
            Reception::new(Some(Bucket { fill: new_fill }), Vec::new(), Vec::new())
        }
    }

    fn tie_break_compare(&self, _other: &dyn Signal<Bucket>) -> Ordering {
        Ordering::Equal
    }
}

fn main() {
    env_logger::init();
    let mut args = pico_args::Arguments::from_env();
    let deadline_ticks: i64 = args.opt_value_from_str("--deadline").unwrap().unwrap_or(500);
    let overflow_at: i64 = args.opt_value_from_str("--overflow-at").unwrap().unwrap_or(50);

    let bucket = Actor::new(Time::from_ticks(0), Bucket { fill: 4.0 });

    let leak: SignalRef<Bucket> = Arc::new(Leak { meta: SignalMeta::new(bucket.downgrade(), bucket.downgrade(), Time::from_ticks(0)) });
    bucket.add_signal_to_receive(leak).unwrap();

    let overflow: SignalRef<Bucket> = Arc::new(Deposit {
        meta: SignalMeta::new(bucket.downgrade(), bucket.downgrade(), Time::from_ticks(overflow_at)),
        amount: CAPACITY,
    });
    bucket.add_signal_to_receive(overflow).unwrap();

    bucket.advance_to(Time::from_ticks(deadline_ticks)).expect("advancement should not fault");

    println!("events: {}", bucket.get_events().len());
    for event in bucket.get_events() {
        println!("  at t={}: fill={:?}", event.when, event.state.map(|b| b.fill));
    }
    println!("pending (never received once destroyed): {}", bucket.get_signals_to_receive().len());
}
