use serde::{Deserialize, Serialize};

use crate::ids::{EventId, PersonId};

/// Coin per minute, or 0 when no minutes have been recorded.
pub fn per_minute(coin: f64, minutes: f64) -> f64 {
    if minutes > 0.0 {
        coin / minutes
    } else {
        0.0
    }
}

/// Person state vector.
///
/// `total_coin` / `total_minutes` accumulate the person's equal-split share of
/// every event they took part in. The baseline rate is derived from the solo
/// basis only: events that also update links never feed back into the
/// baseline those links are scored against.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub label: String,
    pub total_coin: f64,
    pub total_minutes: f64,
    /// Coin from solo events
    pub solo_coin: f64,
    /// Minutes from solo events
    pub solo_minutes: f64,
    pub solo_event_ids: Vec<EventId>,
}

impl Person {
    /// A person labelled with their own id.
    pub fn new(id: PersonId) -> Self {
        let label = id.to_string();
        Self::with_label(id, label)
    }

    pub fn with_label(id: PersonId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            total_coin: 0.0,
            total_minutes: 0.0,
            solo_coin: 0.0,
            solo_minutes: 0.0,
            solo_event_ids: Vec::new(),
        }
    }

    /// Solo baseline rate. A person who was never solo keeps a rate of 0.
    ///
    /// Equals `total_coin / total_minutes` only while every event the person
    /// took part in was solo; joint shares move the totals but not this rate.
    pub fn base_rate(&self) -> f64 {
        per_minute(self.solo_coin, self.solo_minutes)
    }

    /// The baseline rate this person would have if their solo minutes moved
    /// by `delta_minutes` while solo coin stayed fixed. `None` when the
    /// shifted minutes are not positive.
    pub fn base_rate_with_minutes_shift(&self, delta_minutes: f64) -> Option<f64> {
        let minutes = self.solo_minutes + delta_minutes;
        (minutes > 0.0).then(|| self.solo_coin / minutes)
    }

    /// Add a share of a joint event.
    pub fn record_share(&mut self, coin: f64, minutes: f64) {
        self.total_coin += coin;
        self.total_minutes += minutes;
    }

    /// Add a solo event; it counts toward both the totals and the solo basis.
    pub fn record_solo(&mut self, event_id: EventId, coin: f64, minutes: f64) {
        self.record_share(coin, minutes);
        self.solo_coin += coin;
        self.solo_minutes += minutes;
        self.solo_event_ids.push(event_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_person_has_zero_rate() {
        let person = Person::new(PersonId::from("A"));
        assert_eq!(person.label, "A");
        assert_eq!(person.base_rate(), 0.0);
    }

    #[test]
    fn solo_events_define_base_rate() {
        let mut person = Person::new(PersonId::from("A"));
        person.record_solo(EventId::from("E1"), 1_000_000.0, 100.0);
        assert!((person.base_rate() - 10_000.0).abs() < 1e-9);
        assert_eq!(person.solo_event_ids, vec![EventId::from("E1")]);
    }

    #[test]
    fn joint_shares_do_not_move_base_rate() {
        let mut person = Person::new(PersonId::from("A"));
        person.record_solo(EventId::from("E1"), 1_000.0, 10.0);
        person.record_share(9_000.0, 10.0);
        assert!((person.base_rate() - 100.0).abs() < 1e-9);
        assert!((person.total_coin - 10_000.0).abs() < 1e-9);
        assert!((person.total_minutes - 20.0).abs() < 1e-9);
    }

    #[test]
    fn mixed_history_rate_differs_from_totals() {
        let mut person = Person::new(PersonId::from("A"));
        person.record_solo(EventId::from("E1"), 1_000.0, 10.0);
        person.record_share(500.0, 10.0);
        assert!((person.base_rate() - 100.0).abs() < 1e-9);
        assert!((person.total_coin / person.total_minutes - 75.0).abs() < 1e-9);
    }

    #[test]
    fn never_solo_person_keeps_zero_rate() {
        let mut person = Person::new(PersonId::from("B"));
        person.record_share(1_250_000.0, 50.0);
        assert_eq!(person.base_rate(), 0.0);
    }

    #[test]
    fn shifted_rate() {
        let mut person = Person::new(PersonId::from("A"));
        person.record_solo(EventId::from("E1"), 1_000.0, 10.0);
        let shifted = person.base_rate_with_minutes_shift(10.0).unwrap();
        assert!((shifted - 50.0).abs() < 1e-9);
        assert_eq!(person.base_rate_with_minutes_shift(-10.0), None);
        assert_eq!(person.base_rate_with_minutes_shift(-25.0), None);
    }
}
