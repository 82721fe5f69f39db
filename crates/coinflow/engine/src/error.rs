use coinflow_types::{PersonId, ValidationError};
use thiserror::Error;

/// Errors from the Coinflow engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    // --- Mutation path ---
    #[error("invalid event: {0}")]
    Validation(#[from] ValidationError),

    #[error("core invariant violated, append aborted: {message}")]
    InvariantViolation { message: String },

    // --- Simulation path (never touches state) ---
    #[error("unknown drag kind: {0} (expected reallocation, link_adjustment or team_swap)")]
    InvalidDragKind(String),

    #[error("invalid drag parameters: {0}")]
    InvalidDragParams(String),

    #[error("no link between {a} and {b}")]
    LinkNotFound { a: PersonId, b: PersonId },

    #[error("{person} is not a member of the team")]
    NotAMember { person: PersonId },

    #[error("unknown person: {0}")]
    PersonNotFound(PersonId),

    // --- Configuration ---
    #[error("configuration error: {0}")]
    Config(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
