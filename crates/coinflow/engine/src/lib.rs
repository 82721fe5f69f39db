//! # coinflow-engine
//!
//! Deterministic engine that turns timestamped, multi-party monetary events
//! into a verified collaboration graph:
//!
//! - **EventLedger**: append-only store and the single mutation entry point.
//!   Person and link updates are staged, checked, then committed together.
//! - **PersonRegistry**: equal-split coin and minutes per person, and the
//!   solo baseline rate.
//! - **LinkGraph**: pairwise link energy Φ, earned from positive uplift over
//!   the pair's pre-event baseline. Φ never decreases.
//! - **KpiCalculator** / **PredictionModel**: rolling-window mint, burn,
//!   entropy and velocity, and a linear short-horizon forecast.
//! - **DragTranslator**: three read-only what-if edits (reallocation, link
//!   adjustment, team swap).
//! - **TeamOptimizer**: best team of size k by within-team Φ.
//! - **AuditLog**: BLAKE3 hash-chained record of every committed mutation.
//!
//! [`Engine`] ties these together behind the external interface;
//! [`SharedEngine`] serializes writers across threads.
//!
//! ## Invariants
//!
//! - Φ is monotonically non-decreasing; negative uplift is dropped.
//! - A person's baseline comes from solo events only.
//! - Link baselines are read before the event's person updates.
//! - Network value is Σ Φ over all links.

pub mod audit;
pub mod clock;
pub mod combinations;
pub mod config;
pub mod drag;
pub mod engine;
pub mod error;
pub mod export;
pub mod graph;
pub mod kpi;
pub mod ledger;
pub mod prediction;
pub mod registry;
pub mod shared;
pub mod team;
pub mod triggers;

pub use audit::{verify_entries, AuditAction, AuditEntry, AuditLog, ChainVerification};
pub use clock::{Clock, FixedClock, SystemClock};
pub use combinations::{binomial, Combinations};
pub use config::{EngineConfig, IndustryProfile};
pub use drag::{DragDelta, DragEdit, DragKind, DragTranslator};
pub use engine::{Engine, EventInput};
pub use error::{EngineError, EngineResult};
pub use export::{LinkView, PersonView, StateExport};
pub use graph::{LinkGraph, LinkUpdate, NetworkValue};
pub use kpi::{KpiCalculator, KpiSnapshot, PartitionFilter};
pub use ledger::{AppendReceipt, AppendStatus, EventLedger};
pub use prediction::{Forecast, PredictionModel};
pub use registry::PersonRegistry;
pub use shared::SharedEngine;
pub use team::{SearchStrategy, TeamOptimizer, TeamSelection};
pub use triggers::{Trigger, TriggerKind, TriggerThresholds, Urgency};
