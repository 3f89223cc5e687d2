//! The dense, totally-ordered time line that [`ValueHistory`](crate::value_history::ValueHistory),
//! [`Signal`](crate::signal::Signal), and [`Actor`](crate::actor::Actor) all operate over.
//!
//! All arithmetic on [`Time`] saturates at [`Time::START_OF_TIME`] and [`Time::END_OF_TIME`]
//! rather than overflowing, so the sentinels can be used as "no such time" markers without any
//! special-cased checked arithmetic at call sites.

use std::fmt::{self, Display, Formatter};
use std::ops::{Add, Sub};

/// A signed offset from an implied epoch, with one unit equal to the smallest representable
/// duration tick.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Time(i64);

/// The amount of time between two [`Time`]s. Always non-negative when returned from
/// [`Signal::get_propagation_delay`](crate::signal::Signal::get_propagation_delay); may equal
/// [`Duration::NEVER_RECEIVED`] to indicate an unreceivable signal.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Duration(i64);

impl Time {
    /// The most negative representable time. No actor may start before this, and no
    /// [`ValueHistory`](crate::value_history::ValueHistory) transition may occur at it.
    pub const START_OF_TIME: Time = Time(i64::MIN);

    /// The most positive representable time. Doubles as the sentinel [`Signal::when_received`]
    /// returns when a signal will never be received ([`NEVER_RECEIVED`]).
    pub const END_OF_TIME: Time = Time(i64::MAX);

    /// The smallest positive [`Duration`], used to step just past a transition or a send time.
    pub const UNIT: Duration = Duration(1);

    /// Constructs a [`Time`] from a raw tick count.
    pub const fn from_ticks(ticks: i64) -> Self {
        Time(ticks)
    }

    /// Returns the raw tick count.
    pub const fn ticks(self) -> i64 {
        self.0
    }

    /// Adds a [`Duration`], saturating at [`Time::END_OF_TIME`].
    pub fn saturating_add(self, d: Duration) -> Time {
        if d.0 == NEVER_RECEIVED.0 {
            return Time::END_OF_TIME;
        }
        Time(self.0.saturating_add(d.0))
    }

    /// One unit after this time, saturating at [`Time::END_OF_TIME`].
    pub fn next(self) -> Time {
        self.saturating_add(Time::UNIT)
    }

    /// `true` if this time is the never-received sentinel.
    pub fn is_never(self) -> bool {
        self == Time::END_OF_TIME
    }
}

/// Sentinel [`Time`] meaning "this signal will never be received under the current state
/// history." Equal to [`Time::END_OF_TIME`], which makes `when_sent == when_received` structurally
/// impossible: a signal whose delay would resolve to this sentinel is simply never received.
pub const NEVER_RECEIVED: Time = Time::END_OF_TIME;

impl Duration {
    /// A non-negative duration expressed in ticks.
    pub const fn from_ticks(ticks: i64) -> Self {
        Duration(ticks)
    }

    /// The sentinel duration meaning "propagation never completes."
    pub const NEVER_RECEIVED: Duration = Duration(i64::MAX);

    /// Raw tick count.
    pub const fn ticks(self) -> i64 {
        self.0
    }
}

impl Sub for Time {
    type Output = Duration;
    fn sub(self, rhs: Time) -> Duration {
        Duration(self.0.saturating_sub(rhs.0))
    }
}

impl Add<Duration> for Time {
    type Output = Time;
    fn add(self, rhs: Duration) -> Time {
        self.saturating_add(rhs)
    }
}

impl Sub<Duration> for Time {
    type Output = Time;
    fn sub(self, rhs: Duration) -> Time {
        if rhs.0 == NEVER_RECEIVED.0 {
            return Time::START_OF_TIME;
        }
        Time(self.0.saturating_sub(rhs.0))
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Time::START_OF_TIME => write!(f, "-inf"),
            Time::END_OF_TIME => write!(f, "+inf"),
            Time(t) => write!(f, "{}", t),
        }
    }
}

impl fmt::Debug for Time {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Time({})", self)
    }
}

impl Display for Duration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if *self == Duration::NEVER_RECEIVED {
            write!(f, "never")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({})", self)
    }
}

impl From<i64> for Duration {
    fn from(ticks: i64) -> Self {
        Duration(ticks)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn saturates_at_end_of_time() {
        assert_eq!(Time::END_OF_TIME.saturating_add(Time::UNIT), Time::END_OF_TIME);
        assert_eq!(Time::from_ticks(i64::MAX - 1).saturating_add(Duration::from_ticks(10)), Time::END_OF_TIME);
    }

    #[test]
    fn saturates_at_start_of_time() {
        assert_eq!(Time::START_OF_TIME - Time::END_OF_TIME, Duration::NEVER_RECEIVED);
    }

    #[test]
    fn never_received_is_end_of_time() {
        assert_eq!(NEVER_RECEIVED, Time::END_OF_TIME);
        assert!(Time::END_OF_TIME.is_never());
        assert!(!Time::START_OF_TIME.is_never());
    }

    #[test]
    fn addition_with_never_received_duration_saturates() {
        assert_eq!(Time::from_ticks(0).saturating_add(Duration::NEVER_RECEIVED), Time::END_OF_TIME);
    }
}
