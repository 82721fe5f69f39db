//! JSONL replay into an engine.
//!
//! Each non-blank line is either a person registration
//! (`{"person_id": "A", "label": "Alice"}`) or an event. An event carries
//! either a `kind` (`mint` / `burn` / `transfer`) or an industry `label`
//! resolved through the configured event catalog.

use std::io::BufRead;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use coinflow_engine::{AppendStatus, Engine, EventInput};
use coinflow_types::{EventId, EventKind, Partition, PersonId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplayLine {
    Person { person_id: PersonId, label: String },
    Event(EventRecord),
}

/// An event as it appears in a replay file.
#[derive(Debug, Deserialize)]
pub struct EventRecord {
    #[serde(default)]
    pub event_id: Option<EventId>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub kind: Option<EventKind>,
    #[serde(default)]
    pub label: Option<String>,
    pub amount: f64,
    pub minutes: f64,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub customer: String,
    #[serde(default)]
    pub project: String,
    pub participants: Vec<PersonId>,
    #[serde(default)]
    pub evidence: Option<String>,
}

impl EventRecord {
    fn into_input(self, engine: &Engine) -> Result<EventInput> {
        let kind = match (self.kind, self.label.as_deref()) {
            (Some(kind), _) => kind,
            (None, Some(label)) => engine.resolve_kind(&self.industry, label).ok_or_else(|| {
                anyhow!(
                    "label '{}' is not in the '{}' event catalog",
                    label,
                    self.industry
                )
            })?,
            (None, None) => return Err(anyhow!("event has neither kind nor label")),
        };

        Ok(EventInput {
            event_id: self.event_id,
            timestamp: self.timestamp,
            kind,
            amount: self.amount,
            minutes: self.minutes,
            partition: Partition::new(self.industry, self.customer, self.project),
            participants: self.participants,
            evidence: self.evidence,
        })
    }
}

/// Counts from a replay.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub applied: usize,
    pub duplicates: usize,
    pub registered: usize,
    pub rejected: usize,
}

/// Replay every line into `engine`.
///
/// Unparseable lines always fail the replay. Events the engine rejects are
/// logged and counted, or fail the replay when `strict` is set.
pub fn replay(engine: &mut Engine, reader: impl BufRead, strict: bool) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("reading line {line_no}"))?;
        if line.trim().is_empty() {
            continue;
        }

        let parsed: ReplayLine = serde_json::from_str(&line)
            .with_context(|| format!("line {line_no}: not a person or event record"))?;

        let outcome = match parsed {
            ReplayLine::Person { person_id, label } => {
                engine.register_person(person_id, label).map(|created| {
                    if created {
                        summary.registered += 1;
                    }
                })
            }
            ReplayLine::Event(record) => {
                let input = match record.into_input(engine) {
                    Ok(input) => input,
                    Err(err) if !strict => {
                        warn!(line = line_no, error = %err, "Record skipped");
                        summary.rejected += 1;
                        continue;
                    }
                    Err(err) => return Err(err.context(format!("line {line_no}"))),
                };
                engine.append_event(input).map(|receipt| match receipt.status {
                    AppendStatus::Applied => summary.applied += 1,
                    AppendStatus::Duplicate => summary.duplicates += 1,
                })
            }
        };

        if let Err(err) = outcome {
            if strict {
                return Err(anyhow::Error::new(err).context(format!("line {line_no}")));
            }
            warn!(line = line_no, error = %err, "Record rejected");
            summary.rejected += 1;
        }
    }

    info!(
        applied = summary.applied,
        duplicates = summary.duplicates,
        registered = summary.registered,
        rejected = summary.rejected,
        "Replay finished"
    );
    Ok(summary)
}
