//! Append-only event ledger and single mutation entry point.
//!
//! An append is staged before anything is written:
//!
//! 1. duplicate check (re-applying an id is a no-op)
//! 2. field validation
//! 3. link updates planned from pre-event base rates
//! 4. person updates planned
//! 5. invariant checks over the staged state
//! 6. commit persons, links and the event
//! 7. audit entry
//!
//! A failure in steps 2–5 returns before step 6, so persons and links are
//! either both updated or both untouched.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use coinflow_types::{Event, EventId, Person, PersonId, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::audit::{AuditAction, AuditLog};
use crate::error::{EngineError, EngineResult};
use crate::graph::{LinkGraph, LinkUpdate};
use crate::registry::PersonRegistry;

/// Outcome of an append.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppendStatus {
    /// The event was committed
    Applied,
    /// The id was already in the ledger; nothing changed
    Duplicate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendReceipt {
    pub event_id: EventId,
    pub status: AppendStatus,
}

/// The ledger owns every aggregate it mutates.
#[derive(Clone, Debug, Default)]
pub struct EventLedger {
    events: Vec<Event>,
    index: HashMap<EventId, usize>,
    registry: PersonRegistry,
    graph: LinkGraph,
    audit: AuditLog,
}

impl EventLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event. `recorded_at` stamps the audit entry.
    pub fn append(
        &mut self,
        event: Event,
        recorded_at: DateTime<Utc>,
    ) -> EngineResult<AppendReceipt> {
        if self.index.contains_key(&event.event_id) {
            debug!(event_id = %event.event_id, "Duplicate event ignored");
            return Ok(AppendReceipt {
                event_id: event.event_id,
                status: AppendStatus::Duplicate,
            });
        }

        if let Err(err) = event.validate() {
            warn!(event_id = %event.event_id, error = %err, "Event rejected");
            return Err(err.into());
        }

        // Links first: their baselines must not see this event's person updates.
        let link_updates = self.graph.plan(&event, &self.registry);
        let person_updates = self.registry.plan(&event);
        check_invariants(&event, &link_updates, &person_updates)?;

        let phi_added: f64 = link_updates.iter().map(LinkUpdate::phi_added).sum();
        let links_updated = link_updates.len();

        self.registry.commit(person_updates);
        self.graph.commit(link_updates);

        let event_id = event.event_id.clone();
        let payload = json!({
            "event_id": event.event_id,
            "kind": event.kind,
            "amount": event.amount,
            "minutes": event.minutes,
            "timestamp": event.timestamp,
            "partition": event.partition,
            "participants": event.participants,
            "evidence": event.evidence,
            "links_updated": links_updated,
            "phi_added": phi_added,
        });
        self.index.insert(event_id.clone(), self.events.len());
        self.events.push(event);
        self.audit
            .append(recorded_at, AuditAction::EventAppended, payload);

        info!(
            event_id = %event_id,
            links_updated = links_updated,
            phi_added = phi_added,
            "Event appended"
        );

        Ok(AppendReceipt {
            event_id,
            status: AppendStatus::Applied,
        })
    }

    /// Register a labelled person ahead of their first event.
    /// Returns `Ok(false)` when the id already exists.
    pub fn register_person(
        &mut self,
        id: PersonId,
        label: impl Into<String>,
        recorded_at: DateTime<Utc>,
    ) -> EngineResult<bool> {
        if id.as_str().trim().is_empty() {
            return Err(ValidationError::BlankPersonId.into());
        }
        let label = label.into();
        if !self.registry.register(id.clone(), label.clone()) {
            debug!(person = %id, "Person already registered");
            return Ok(false);
        }
        self.audit.append(
            recorded_at,
            AuditAction::PersonRegistered,
            json!({ "person_id": id, "label": label }),
        );
        info!(person = %id, "Person registered");
        Ok(true)
    }

    /// Record a configuration change by fingerprint only.
    pub fn record_reconfiguration(&mut self, fingerprint: &str, recorded_at: DateTime<Utc>) {
        self.audit.append(
            recorded_at,
            AuditAction::Reconfigured,
            json!({ "config_fingerprint": fingerprint }),
        );
    }

    /// Events in append order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn get(&self, event_id: &EventId) -> Option<&Event> {
        self.index.get(event_id).map(|&i| &self.events[i])
    }

    pub fn contains(&self, event_id: &EventId) -> bool {
        self.index.contains_key(event_id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn registry(&self) -> &PersonRegistry {
        &self.registry
    }

    pub fn graph(&self) -> &LinkGraph {
        &self.graph
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }
}

/// Reject staged state that would break an aggregate invariant.
fn check_invariants(
    event: &Event,
    links: &[LinkUpdate],
    persons: &[Person],
) -> EngineResult<()> {
    for update in links {
        let link = &update.link;
        if !link.phi.is_finite() || !link.cumulative_uplift.is_finite() {
            return violation(event, format!("link {} energy is not finite", link.key));
        }
        if link.phi < update.phi_before {
            return violation(
                event,
                format!(
                    "link {} energy would decrease from {} to {}",
                    link.key, update.phi_before, link.phi
                ),
            );
        }
    }

    for person in persons {
        let totals = [
            person.total_coin,
            person.total_minutes,
            person.solo_coin,
            person.solo_minutes,
        ];
        if totals.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return violation(
                event,
                format!("person {} totals would become invalid", person.id),
            );
        }
    }

    Ok(())
}

fn violation(event: &Event, message: String) -> EngineResult<()> {
    error!(event_id = %event.event_id, %message, "Invariant violation, append aborted");
    Err(EngineError::InvariantViolation { message })
}
