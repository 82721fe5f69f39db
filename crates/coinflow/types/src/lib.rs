//! # coinflow-types
//!
//! Primitive records for the Coinflow engine:
//!
//! - **Event**: an immutable, timestamped monetary event with one or more
//!   participants. The only source of truth; everything else is derived.
//! - **Person**: cumulative coin and minutes per participant, plus the
//!   solo basis that defines their baseline rate.
//! - **Link**: verified collaboration energy (Φ) between an unordered pair
//!   of persons, earned only from joint events with positive uplift.
//!
//! Validation of event fields lives here so every producer of events can
//! reject malformed input before it reaches the ledger.

pub mod error;
pub mod event;
pub mod ids;
pub mod link;
pub mod person;

pub use error::ValidationError;
pub use event::{Event, EventKind, Partition};
pub use ids::{EventId, LinkKey, PersonId};
pub use link::Link;
pub use person::{per_minute, Person};
