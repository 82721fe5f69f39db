//! Serializable state snapshot for presentation layers.
//!
//! Carries persons, links, network metrics and the audit tail. Configuration
//! is never part of it.

use coinflow_types::{Link, Person, PersonId};
use serde::{Deserialize, Serialize};

use crate::audit::AuditEntry;
use crate::graph::NetworkValue;
use crate::ledger::EventLedger;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonView {
    pub id: PersonId,
    pub label: String,
    pub total_coin: f64,
    pub total_minutes: f64,
    pub base_rate: f64,
    pub solo_event_count: usize,
}

impl From<&Person> for PersonView {
    fn from(person: &Person) -> Self {
        Self {
            id: person.id.clone(),
            label: person.label.clone(),
            total_coin: person.total_coin,
            total_minutes: person.total_minutes,
            base_rate: person.base_rate(),
            solo_event_count: person.solo_event_ids.len(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkView {
    pub person_a: PersonId,
    pub person_b: PersonId,
    pub phi: f64,
    pub cumulative_uplift: f64,
    pub average_uplift: f64,
    pub joint_event_count: usize,
    pub verified: bool,
}

impl From<&Link> for LinkView {
    fn from(link: &Link) -> Self {
        Self {
            person_a: link.key.low().clone(),
            person_b: link.key.high().clone(),
            phi: link.phi,
            cumulative_uplift: link.cumulative_uplift,
            average_uplift: link.average_uplift(),
            joint_event_count: link.joint_event_count(),
            verified: link.is_verified(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateExport {
    pub event_count: usize,
    /// Ascending id order
    pub persons: Vec<PersonView>,
    /// Ascending pair order
    pub links: Vec<LinkView>,
    pub network: NetworkValue,
    /// Newest audit entries, oldest first
    pub audit_tail: Vec<AuditEntry>,
}

impl StateExport {
    pub fn capture(ledger: &EventLedger, audit_tail_len: usize) -> Self {
        let registry = ledger.registry();
        let graph = ledger.graph();
        Self {
            event_count: ledger.len(),
            persons: registry.iter().map(PersonView::from).collect(),
            links: graph.iter().map(LinkView::from).collect(),
            network: graph.network_value(registry.len()),
            audit_tail: ledger.audit().tail(audit_tail_len).to_vec(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
