use serde::{Deserialize, Serialize};

/// Event identifier. Unique across the ledger; re-submitting an id is a no-op.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Person (entity) identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub String);

impl PersonId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PersonId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Key of an unordered person pair.
///
/// `LinkKey::new(a, b)` and `LinkKey::new(b, a)` are equal; the smaller id is
/// always stored first, so ordering over keys is lexicographic over the pair.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkKey {
    low: PersonId,
    high: PersonId,
}

impl LinkKey {
    pub fn new(a: PersonId, b: PersonId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn low(&self) -> &PersonId {
        &self.low
    }

    pub fn high(&self) -> &PersonId {
        &self.high
    }
}

impl std::fmt::Display for LinkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}<->{}", self.low, self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_key_is_unordered() {
        let ab = LinkKey::new(PersonId::from("a"), PersonId::from("b"));
        let ba = LinkKey::new(PersonId::from("b"), PersonId::from("a"));
        assert_eq!(ab, ba);
        assert_eq!(ab.low().as_str(), "a");
        assert_eq!(ab.high().as_str(), "b");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&PersonId::from("P01")).unwrap();
        assert_eq!(json, "\"P01\"");
        let restored: EventId = serde_json::from_str("\"E1\"").unwrap();
        assert_eq!(restored, EventId::from("E1"));
    }
}
