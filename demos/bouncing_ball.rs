//! A single actor whose state is a dropped ball's height and velocity, rescheduling its own next
//! bounce as a self-signal each time it lands. Demonstrates `Signal::get_propagation_delay` doing
//! real analytic work (not just a constant) and an actor that keeps itself busy via self-emission
//! rather than ever going idle.

use signalsim::{Actor, Duration, Reception, Signal, SignalMeta, SignalRef, Time};
use std::cmp::Ordering;
use std::sync::Arc;

const GRAVITY: f64 = 9.81;
const RESTITUTION: f64 = 0.8;
const MIN_BOUNCE_VELOCITY: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Ball {
    /// Height and velocity as of the moment this state took effect (always a bounce instant,
    /// height == 0, velocity >= 0 meaning "moving upward").
    velocity_after_bounce: f64,
}

struct NextBounce {
    meta: SignalMeta<Ball>,
}

impl NextBounce {
    fn new(actor: &Arc<Actor<Ball>>, when_sent: Time) -> Self {
        Self { meta: SignalMeta::new(actor.downgrade(), actor.downgrade(), when_sent) }
    }

    /// Time-of-flight for a projectile launched upward at `v0` under constant gravity until it
    /// returns to height zero: `2 * v0 / g`.
    fn flight_ticks(v0: f64) -> i64 {
        ((2.0 * v0 / GRAVITY) * 1000.0).round() as i64
    }
}

impl Signal<Ball> for NextBounce {
    fn meta(&self) -> &SignalMeta<Ball> {
        &self.meta
    }

    fn get_propagation_delay(&self, state: &Ball) -> Duration {
        if state.velocity_after_bounce < MIN_BOUNCE_VELOCITY {
            return Duration::NEVER_RECEIVED;
        }
        Duration::from_ticks(Self::flight_ticks(state.velocity_after_bounce))
    }

    fn receive(&self, when: Time, state: &Ball) -> Reception<Ball> {
        let impact_velocity = state.velocity_after_bounce;
        let rebound = impact_velocity * RESTITUTION;
        let new_state = Ball { velocity_after_bounce: rebound };

        let mut emitted = Vec::new();
        if rebound >= MIN_BOUNCE_VELOCITY {
            let actor = self.meta.receiver.upgrade().expect("receiver still alive while handling its own signal");
            let next: SignalRef<Ball> = Arc::new(NextBounce::new(&actor, when));
            emitted.push(next);
        }
        Reception::new(Some(new_state), emitted, Vec::new())
    }

    fn tie_break_compare(&self, _other: &dyn Signal<Ball>) -> Ordering {
        // Only one pending signal per ball at a time, so ties never arise in practice, but the
        // contract still requires a total order; addresses double as a tiebreak.
        Ordering::Equal
    }
}

fn main() {
    env_logger::init();
    let mut args = pico_args::Arguments::from_env();
    let launch_velocity: f64 = args.opt_value_from_str("--launch-velocity").unwrap().unwrap_or(20.0);
    let deadline_ticks: i64 = args.opt_value_from_str("--deadline").unwrap().unwrap_or(30_000);

    let ball = Actor::new(Time::from_ticks(0), Ball { velocity_after_bounce: launch_velocity });
    let first: SignalRef<Ball> = Arc::new(NextBounce::new(&ball, Time::from_ticks(0)));
    ball.add_signal_to_receive(first).unwrap();

    ball.advance_to(Time::from_ticks(deadline_ticks)).expect("advancement should not fault");

    println!("bounces recorded: {}", ball.get_events().len());
    for event in ball.get_events() {
        println!("  at t={}: velocity_after_bounce={:?}", event.when, event.state.map(|b| b.velocity_after_bounce));
    }
    println!("still pending: {}", ball.get_signals_to_receive().len());
}
