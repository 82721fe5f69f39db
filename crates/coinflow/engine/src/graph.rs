//! Pairwise collaboration energy.
//!
//! For every unordered pair in a joint event the graph scores the event's
//! velocity against the pair's averaged solo baseline:
//!
//! ```text
//! baseline = (base_rate(i) + base_rate(j)) / 2
//! uplift   = velocity - baseline
//! Φ       += uplift × minutes          (only when uplift > 0)
//! ```
//!
//! Baselines are read from the registry before the event's person updates
//! are committed.

use std::collections::{BTreeMap, BTreeSet};

use coinflow_types::{Event, Link, LinkKey, PersonId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combinations::{binomial, Combinations};
use crate::registry::PersonRegistry;

/// A staged link mutation.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkUpdate {
    /// Link state after the event
    pub link: Link,
    pub phi_before: f64,
    pub baseline: f64,
    /// Raw uplift, possibly negative
    pub uplift: f64,
}

impl LinkUpdate {
    pub fn phi_added(&self) -> f64 {
        self.link.phi - self.phi_before
    }
}

/// Graph-level scale metrics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkValue {
    pub node_count: usize,
    /// C(n, 2)
    pub theoretical_links: u128,
    pub link_count: usize,
    pub verified_link_count: usize,
    /// verified / C(n, 2), 0 below two nodes
    pub link_efficiency: f64,
    /// Σ Φ over all links
    pub total_phi: f64,
    /// total Φ / verified links, 0 with no verified link
    pub avg_link_energy: f64,
}

/// Links keyed by unordered person pair.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinkGraph {
    links: BTreeMap<LinkKey, Link>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage link updates for a joint event. Solo events produce none.
    pub fn plan(&self, event: &Event, registry: &PersonRegistry) -> Vec<LinkUpdate> {
        if !event.is_joint() {
            return Vec::new();
        }

        let velocity = event.velocity();
        Combinations::new(&event.participants, 2)
            .map(|pair| {
                let (a, b) = (pair[0], pair[1]);
                let baseline = (registry.base_rate(a) + registry.base_rate(b)) / 2.0;
                let uplift = velocity - baseline;

                let key = LinkKey::new(a.clone(), b.clone());
                let mut link = self
                    .links
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| Link::new(key));
                let phi_before = link.phi;

                link.joint_event_ids.push(event.event_id.clone());
                if uplift > 0.0 {
                    link.phi += uplift * event.minutes;
                    link.cumulative_uplift += uplift;
                }

                debug!(
                    event_id = %event.event_id,
                    link = %link.key,
                    baseline = baseline,
                    uplift = uplift,
                    phi = link.phi,
                    "Pair uplift scored"
                );

                LinkUpdate {
                    link,
                    phi_before,
                    baseline,
                    uplift,
                }
            })
            .collect()
    }

    pub fn commit(&mut self, staged: Vec<LinkUpdate>) {
        for update in staged {
            self.links.insert(update.link.key.clone(), update.link);
        }
    }

    /// Plan and commit in one step.
    pub fn apply(&mut self, event: &Event, registry: &PersonRegistry) {
        let staged = self.plan(event, registry);
        self.commit(staged);
    }

    pub fn get(&self, a: &PersonId, b: &PersonId) -> Option<&Link> {
        self.links.get(&LinkKey::new(a.clone(), b.clone()))
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Links in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn total_phi(&self) -> f64 {
        self.links.values().map(|l| l.phi).sum()
    }

    /// Σ Φ over every within-team pair that has a link. Members are treated
    /// as a set.
    pub fn team_score<'a>(&self, members: impl IntoIterator<Item = &'a PersonId>) -> f64 {
        let members: BTreeSet<&PersonId> = members.into_iter().collect();
        let members: Vec<&PersonId> = members.into_iter().collect();
        Combinations::new(&members, 2)
            .filter_map(|pair| self.get(pair[0], pair[1]))
            .map(|link| link.phi)
            .sum()
    }

    /// Φ the candidate would add to `team`.
    pub fn marginal_gain<'a>(
        &self,
        candidate: &PersonId,
        team: impl IntoIterator<Item = &'a PersonId>,
    ) -> f64 {
        team.into_iter()
            .filter(|member| *member != candidate)
            .filter_map(|member| self.get(candidate, member))
            .map(|link| link.phi)
            .sum()
    }

    /// The link with the highest Φ; ties go to the smallest key.
    pub fn strongest_link(&self) -> Option<&Link> {
        self.links.values().fold(None, |best: Option<&Link>, link| match best {
            Some(b) if b.phi >= link.phi => Some(b),
            _ => Some(link),
        })
    }

    pub fn network_value(&self, node_count: usize) -> NetworkValue {
        let theoretical_links = binomial(node_count, 2);
        let verified_link_count = self.links.values().filter(|l| l.is_verified()).count();
        let total_phi = self.total_phi();

        NetworkValue {
            node_count,
            theoretical_links,
            link_count: self.links.len(),
            verified_link_count,
            link_efficiency: if theoretical_links > 0 {
                verified_link_count as f64 / theoretical_links as f64
            } else {
                0.0
            },
            total_phi,
            avg_link_energy: if verified_link_count > 0 {
                total_phi / verified_link_count as f64
            } else {
                0.0
            },
        }
    }
}
