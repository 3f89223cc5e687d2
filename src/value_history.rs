//! [`ValueHistory`]: a total function from [`Time`] to `Option<V>` with finitely many changes.

use crate::error::HistoryError;
use crate::time::{Duration, Time};
use std::collections::BTreeMap;
use std::collections::Bound;

/// Maps every point on the time line to a value (or `None`, meaning the subject did not yet
/// exist, or no longer exists). Answers point and range queries in `O(log n)`, where `n` is the
/// number of transitions, via a floor/ceiling lookup on an ordered transition map.
///
/// # Invariants
///
/// - There is never a transition at [`Time::START_OF_TIME`] (that value lives in `first_value`
///   instead).
/// - There is never a transition at [`Time::END_OF_TIME`].
/// - No two adjacent values are equal: consecutive entries (including the synthetic pair
///   `first_value` / first transition) always differ, so every transition is a genuine change.
///
/// `ValueHistory` itself has no notion of "the owning actor"; `Actor` is the only thing permitted
/// to mutate one, which is why the mutating methods take `&mut self` rather than requiring
/// interior mutability here.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ValueHistory<V> {
    first_value: Option<V>,
    transitions: BTreeMap<Time, Option<V>>,
}

impl<V> ValueHistory<V> {
    /// Constructs a history that is `None` everywhere (the constant-null history).
    pub fn new() -> Self {
        Self {
            first_value: None,
            transitions: BTreeMap::new(),
        }
    }

    /// Constructs a history from an explicit `first_value` and transition map. Callers are
    /// responsible for upholding the invariants listed on the type; this is typically used only
    /// by `Actor::new` (which sets `first_value = None` and a single transition at `start`).
    pub fn from_parts(first_value: Option<V>, transitions: BTreeMap<Time, Option<V>>) -> Self {
        Self { first_value, transitions }
    }
}

impl<V> Default for ValueHistory<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + PartialEq> ValueHistory<V> {
    /// Returns the value at time `t`. Never fails: before the first transition this is
    /// `first_value`; at or after a transition, it is that transition's value.
    pub fn get(&self, t: Time) -> Option<V> {
        match self.transitions.range(..=t).next_back() {
            Some((_, v)) => v.clone(),
            None => self.first_value.clone(),
        }
    }

    /// Returns `(start, end, value)` describing the maximal closed interval around `t` on which
    /// the value is constant.
    pub fn get_timestamped(&self, t: Time) -> (Time, Time, Option<V>) {
        let (start, value) = match self.transitions.range(..=t).next_back() {
            Some((&ts, v)) => (ts, v.clone()),
            None => (Time::START_OF_TIME, self.first_value.clone()),
        };
        let end = match self.transitions.range((Bound::Excluded(t), Bound::Unbounded)).next() {
            Some((&ts, _)) => ts - Time::UNIT,
            None => Time::END_OF_TIME,
        };
        (start, end, value)
    }

    /// The first value, at [`Time::START_OF_TIME`].
    pub fn first_value(&self) -> Option<V> {
        self.first_value.clone()
    }

    /// The value at the last transition, or `first_value` if there are no transitions.
    pub fn last_value(&self) -> Option<V> {
        match self.transitions.values().next_back() {
            Some(v) => v.clone(),
            None => self.first_value.clone(),
        }
    }

    /// The earliest transition time, if any.
    pub fn first_transition_time(&self) -> Option<Time> {
        self.transitions.keys().next().copied()
    }

    /// The latest transition time, if any.
    pub fn last_transition_time(&self) -> Option<Time> {
        self.transitions.keys().next_back().copied()
    }

    /// The smallest transition time that is `>= t`, if any.
    pub fn transition_at_or_after(&self, t: Time) -> Option<Time> {
        self.transitions.range(t..).next().map(|(&ts, _)| ts)
    }

    /// A snapshot of the transition map, ordered by time.
    pub fn transitions(&self) -> Vec<(Time, Option<V>)> {
        self.transitions.iter().map(|(&t, v)| (t, v.clone())).collect()
    }

    /// A snapshot of the transition times, ordered.
    pub fn transition_times(&self) -> Vec<Time> {
        self.transitions.keys().copied().collect()
    }

    /// Appends a transition after the current last one.
    ///
    /// Fails with [`HistoryError::OutOfOrder`] if `t` is not strictly after
    /// [`last_transition_time`](Self::last_transition_time), and with
    /// [`HistoryError::Redundant`] if `v` equals [`last_value`](Self::last_value).
    pub fn append_transition(&mut self, t: Time, v: Option<V>) -> Result<(), HistoryError> {
        if let Some(last) = self.last_transition_time() {
            if t <= last {
                return Err(HistoryError::OutOfOrder(t));
            }
        }
        if v == self.last_value() {
            return Err(HistoryError::Redundant(t));
        }
        self.transitions.insert(t, v);
        Ok(())
    }

    /// Overwrites the history from `t` onward: every transition at or after `t` is dropped, and a
    /// transition is inserted at `t` carrying `v` unless `v` already equals the value immediately
    /// before `t`. `t == Time::START_OF_TIME` resets the whole history to the constant `v`.
    pub fn set_value_from(&mut self, t: Time, v: Option<V>) {
        self.remove_transitions_from(t);
        if t == Time::START_OF_TIME {
            self.first_value = v;
            return;
        }
        if v != self.last_value() {
            self.transitions.insert(t, v);
        }
    }

    /// Overwrites the history up to and including `t`: every transition at or before `t` is
    /// dropped, `first_value` becomes `v`, and if the value that used to hold just after `t`
    /// differed from `v`, a restoring transition is inserted at `t.next()` so that everything
    /// after `t` is unaffected.
    pub fn set_value_until(&mut self, t: Time, v: Option<V>) {
        let restore_at = t.next();
        let held_after = self.get(restore_at);
        self.transitions = self.transitions.split_off(&restore_at);
        self.first_value = v;
        if held_after != v && !self.transitions.contains_key(&restore_at) {
            self.transitions.insert(restore_at, held_after);
        }
        self.dedupe_adjacent();
    }

    /// Drops every transition at or after `t`. `first_value` is unchanged.
    pub fn remove_transitions_from(&mut self, t: Time) {
        self.transitions.retain(|&ts, _| ts < t);
    }

    /// Removes any transition whose value equals the value immediately preceding it, restoring
    /// the no-redundant-adjacent-values invariant after a mutation that may have introduced one.
    fn dedupe_adjacent(&mut self) {
        let mut prev = self.first_value.clone();
        let mut redundant = Vec::new();
        for (&t, v) in self.transitions.iter() {
            if *v == prev {
                redundant.push(t);
            } else {
                prev = v.clone();
            }
        }
        for t in redundant {
            self.transitions.remove(&t);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn t(ticks: i64) -> Time {
        Time::from_ticks(ticks)
    }

    #[test]
    fn empty_history_is_none_everywhere() {
        let h: ValueHistory<&str> = ValueHistory::new();
        assert_eq!(h.get(Time::START_OF_TIME), None);
        assert_eq!(h.get(t(0)), None);
        assert_eq!(h.get(Time::END_OF_TIME), None);
    }

    #[test]
    fn append_transition_round_trips() {
        let mut h = ValueHistory::new();
        h.append_transition(t(0), Some("A")).unwrap();
        h.append_transition(t(5), Some("B")).unwrap();
        assert_eq!(h.get(t(-1)), None);
        assert_eq!(h.get(t(0)), Some("A"));
        assert_eq!(h.get(t(4)), Some("A"));
        assert_eq!(h.get(t(5)), Some("B"));
        assert_eq!(h.get(t(100)), Some("B"));
    }

    #[test]
    fn append_transition_rejects_out_of_order() {
        let mut h = ValueHistory::new();
        h.append_transition(t(5), Some("A")).unwrap();
        assert_eq!(h.append_transition(t(5), Some("B")), Err(HistoryError::OutOfOrder(t(5))));
        assert_eq!(h.append_transition(t(4), Some("B")), Err(HistoryError::OutOfOrder(t(4))));
    }

    #[test]
    fn append_transition_rejects_redundant_value() {
        let mut h = ValueHistory::new();
        h.append_transition(t(5), Some("A")).unwrap();
        assert_eq!(h.append_transition(t(10), Some("A")), Err(HistoryError::Redundant(t(10))));
    }

    #[test]
    fn set_value_from_overwrites_suffix_and_preserves_prefix() {
        let mut h = ValueHistory::new();
        h.append_transition(t(0), Some("A")).unwrap();
        h.append_transition(t(5), Some("B")).unwrap();
        h.append_transition(t(10), Some("C")).unwrap();

        h.set_value_from(t(7), Some("D"));

        assert_eq!(h.get(t(-1)), None);
        assert_eq!(h.get(t(0)), Some("A"));
        assert_eq!(h.get(t(6)), Some("B"));
        assert_eq!(h.get(t(7)), Some("D"));
        assert_eq!(h.get(t(100)), Some("D"));
    }

    #[test]
    fn set_value_from_skips_redundant_transition() {
        let mut h = ValueHistory::new();
        h.append_transition(t(0), Some("A")).unwrap();
        h.append_transition(t(5), Some("B")).unwrap();

        // Setting from t=7 to the value already in force there ("B") should not add a transition.
        h.set_value_from(t(7), Some("B"));
        assert_eq!(h.last_transition_time(), Some(t(5)));
        assert_eq!(h.get(t(7)), Some("B"));
    }

    #[test]
    fn set_value_from_start_of_time_resets_history() {
        let mut h = ValueHistory::new();
        h.append_transition(t(0), Some("A")).unwrap();
        h.append_transition(t(5), Some("B")).unwrap();

        h.set_value_from(Time::START_OF_TIME, Some("Z"));
        assert_eq!(h.first_value(), Some("Z"));
        assert_eq!(h.transitions().len(), 0);
        assert_eq!(h.get(t(1000)), Some("Z"));
    }

    #[test]
    fn remove_transitions_from_drops_at_or_after() {
        let mut h = ValueHistory::new();
        h.append_transition(t(0), Some("A")).unwrap();
        h.append_transition(t(5), Some("B")).unwrap();
        h.append_transition(t(10), Some("C")).unwrap();

        h.remove_transitions_from(t(5));
        assert_eq!(h.transition_times(), vec![t(0)]);
        assert_eq!(h.get(t(100)), Some("A"));
    }

    #[test]
    fn transition_at_or_after_is_a_ceiling_query() {
        let mut h = ValueHistory::new();
        h.append_transition(t(0), Some("A")).unwrap();
        h.append_transition(t(10), Some("B")).unwrap();

        assert_eq!(h.transition_at_or_after(t(0)), Some(t(0)));
        assert_eq!(h.transition_at_or_after(t(1)), Some(t(10)));
        assert_eq!(h.transition_at_or_after(t(11)), None);
    }

    #[test]
    fn get_timestamped_bounds_the_constant_interval() {
        let mut h = ValueHistory::new();
        h.append_transition(t(0), Some("A")).unwrap();
        h.append_transition(t(10), Some("B")).unwrap();

        assert_eq!(h.get_timestamped(t(5)), (t(0), t(9), Some("A")));
        assert_eq!(h.get_timestamped(t(10)), (t(10), Time::END_OF_TIME, Some("B")));
        assert_eq!(h.get_timestamped(Time::START_OF_TIME), (Time::START_OF_TIME, t(-1), None));
    }
}
