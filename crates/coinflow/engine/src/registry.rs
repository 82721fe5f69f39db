use std::collections::BTreeMap;

use coinflow_types::{Event, Person, PersonId};

/// Per-person cumulative coin, minutes and solo baseline.
///
/// Persons are created lazily on first reference (or explicitly through
/// [`PersonRegistry::register`]) and never removed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PersonRegistry {
    persons: BTreeMap<PersonId, Person>,
}

impl PersonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &PersonId) -> Option<&Person> {
        self.persons.get(id)
    }

    pub fn contains(&self, id: &PersonId) -> bool {
        self.persons.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    /// Persons in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Person> {
        self.persons.values()
    }

    /// Person ids in ascending order.
    pub fn ids(&self) -> Vec<PersonId> {
        self.persons.keys().cloned().collect()
    }

    /// Current solo baseline; unknown persons have a rate of 0.
    pub fn base_rate(&self, id: &PersonId) -> f64 {
        self.persons.get(id).map_or(0.0, Person::base_rate)
    }

    /// Stage the person updates for an event without touching the registry.
    ///
    /// Amount and minutes are split equally across participants. A solo
    /// event also feeds the person's baseline.
    pub fn plan(&self, event: &Event) -> Vec<Person> {
        let n = event.participants.len() as f64;
        let coin_share = event.amount / n;
        let minutes_share = event.minutes / n;
        let solo = event.is_solo();

        event
            .participants
            .iter()
            .map(|id| {
                let mut person = self
                    .persons
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| Person::new(id.clone()));
                if solo {
                    person.record_solo(event.event_id.clone(), coin_share, minutes_share);
                } else {
                    person.record_share(coin_share, minutes_share);
                }
                person
            })
            .collect()
    }

    pub fn commit(&mut self, staged: Vec<Person>) {
        for person in staged {
            self.persons.insert(person.id.clone(), person);
        }
    }

    /// Plan and commit in one step.
    pub fn apply(&mut self, event: &Event) {
        let staged = self.plan(event);
        self.commit(staged);
    }

    /// Add a labelled person ahead of their first event.
    /// Returns false (and changes nothing) if the id is already known.
    pub fn register(&mut self, id: PersonId, label: impl Into<String>) -> bool {
        if self.persons.contains_key(&id) {
            return false;
        }
        self.persons
            .insert(id.clone(), Person::with_label(id, label));
        true
    }
}
