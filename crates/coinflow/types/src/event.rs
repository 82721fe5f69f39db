use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::{EventId, PersonId};

/// Direction of the money.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Inflow (revenue, income)
    Mint,
    /// Outflow (cost, expense)
    Burn,
    /// Movement between parties; counts toward minutes but not mint/burn
    Transfer,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            EventKind::Mint => "mint",
            EventKind::Burn => "burn",
            EventKind::Transfer => "transfer",
        };
        f.write_str(tag)
    }
}

/// Partition keys carried by every event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partition {
    pub industry: String,
    pub customer: String,
    pub project: String,
}

impl Partition {
    pub fn new(
        industry: impl Into<String>,
        customer: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            industry: industry.into(),
            customer: customer.into(),
            project: project.into(),
        }
    }
}

/// A verified monetary event.
///
/// Created once through the ledger and never mutated or deleted afterwards.
/// `participants` is an ordered set: order is preserved, duplicates are invalid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    /// Coin amount, >= 0
    pub amount: f64,
    /// Effective minutes spent, > 0
    pub minutes: f64,
    pub partition: Partition,
    pub participants: Vec<PersonId>,
    /// Opaque reference to supporting evidence
    pub evidence: Option<String>,
}

impl Event {
    /// Coin per minute realized by this event.
    pub fn velocity(&self) -> f64 {
        if self.minutes > 0.0 {
            self.amount / self.minutes
        } else {
            0.0
        }
    }

    /// Exactly one participant.
    pub fn is_solo(&self) -> bool {
        self.participants.len() == 1
    }

    /// Two or more participants; only joint events touch links.
    pub fn is_joint(&self) -> bool {
        self.participants.len() >= 2
    }

    /// Check every field constraint. Runs before any state is touched.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.event_id.as_str().trim().is_empty() {
            return Err(ValidationError::BlankEventId);
        }
        if !self.amount.is_finite() {
            return Err(ValidationError::NonFiniteAmount(self.amount));
        }
        if self.amount < 0.0 {
            return Err(ValidationError::NegativeAmount(self.amount));
        }
        if !self.minutes.is_finite() {
            return Err(ValidationError::NonFiniteMinutes(self.minutes));
        }
        if self.minutes <= 0.0 {
            return Err(ValidationError::NonPositiveMinutes(self.minutes));
        }
        // Subnormal minutes can push the quotient to infinity.
        if !(self.amount / self.minutes).is_finite() {
            return Err(ValidationError::NonFiniteVelocity {
                amount: self.amount,
                minutes: self.minutes,
            });
        }
        if self.participants.is_empty() {
            return Err(ValidationError::EmptyParticipants);
        }

        let mut seen = HashSet::with_capacity(self.participants.len());
        for (position, participant) in self.participants.iter().enumerate() {
            if participant.as_str().trim().is_empty() {
                return Err(ValidationError::BlankParticipant { position });
            }
            if !seen.insert(participant) {
                return Err(ValidationError::DuplicateParticipant(participant.clone()));
            }
        }

        Ok(())
    }
}
