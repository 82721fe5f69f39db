use serde::{Deserialize, Serialize};

use crate::ids::{EventId, LinkKey};

/// Verified collaboration link between two persons.
///
/// Φ (`phi`) accumulates `uplift × minutes` for every joint event with
/// positive uplift. Negative uplift is dropped, never subtracted, so Φ is
/// monotonically non-decreasing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub key: LinkKey,
    pub joint_event_ids: Vec<EventId>,
    /// Cumulative link energy, >= 0
    pub phi: f64,
    /// Sum of positive per-event uplift (coin/min)
    pub cumulative_uplift: f64,
}

impl Link {
    pub fn new(key: LinkKey) -> Self {
        Self {
            key,
            joint_event_ids: Vec::new(),
            phi: 0.0,
            cumulative_uplift: 0.0,
        }
    }

    /// A link is verified once it has earned any energy.
    pub fn is_verified(&self) -> bool {
        self.phi > 0.0
    }

    pub fn joint_event_count(&self) -> usize {
        self.joint_event_ids.len()
    }

    /// Mean uplift per joint event (0 for a link with no events).
    pub fn average_uplift(&self) -> f64 {
        if self.joint_event_ids.is_empty() {
            0.0
        } else {
            self.cumulative_uplift / self.joint_event_ids.len() as f64
        }
    }
}
