use thiserror::Error;

use crate::ids::PersonId;

/// Malformed event or entity input. Always raised before any mutation,
/// so the caller may fix the input and resubmit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("event id must not be blank")]
    BlankEventId,

    #[error("amount must be finite, got {0}")]
    NonFiniteAmount(f64),

    #[error("amount must be >= 0, got {0}")]
    NegativeAmount(f64),

    #[error("minutes must be finite, got {0}")]
    NonFiniteMinutes(f64),

    #[error("minutes must be > 0, got {0}")]
    NonPositiveMinutes(f64),

    #[error("velocity {amount} / {minutes} is not a finite number")]
    NonFiniteVelocity { amount: f64, minutes: f64 },

    #[error("event must have at least one participant")]
    EmptyParticipants,

    #[error("participant at position {position} has a blank id")]
    BlankParticipant { position: usize },

    #[error("participant {0} appears more than once")]
    DuplicateParticipant(PersonId),

    #[error("person id must not be blank")]
    BlankPersonId,
}
