//! Auto-triggers derived from the current KPI window.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::kpi::KpiSnapshot;

/// Thresholds for the structural auto-triggers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerThresholds {
    /// Entropy ratio above this → Rebalance
    pub rebalance_entropy: f64,
    /// Entropy ratio above this (and not above rebalance) → Shrink
    pub shrink_entropy: f64,
    /// Velocity (coin/min) above this → Expand
    pub expand_velocity: f64,
}

impl Default for TriggerThresholds {
    fn default() -> Self {
        Self {
            rebalance_entropy: 0.7,
            shrink_entropy: 0.5,
            expand_velocity: 10_000.0,
        }
    }
}

impl TriggerThresholds {
    pub fn validate(&self) -> EngineResult<()> {
        let all_finite = [
            self.rebalance_entropy,
            self.shrink_entropy,
            self.expand_velocity,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !all_finite {
            return Err(EngineError::Config(
                "trigger thresholds must be finite".into(),
            ));
        }
        if self.shrink_entropy > self.rebalance_entropy {
            return Err(EngineError::Config(format!(
                "shrink_entropy ({}) must not exceed rebalance_entropy ({})",
                self.shrink_entropy, self.rebalance_entropy
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Rebalance,
    Shrink,
    Expand,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

/// A suggested structural action. Never applied by the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub urgency: Urgency,
    /// The KPI value that crossed the threshold
    pub observed: f64,
    pub threshold: f64,
    pub reason: String,
}

/// Evaluate thresholds against a KPI snapshot.
///
/// Entropy triggers are exclusive: Rebalance wins over Shrink.
pub fn evaluate(thresholds: &TriggerThresholds, kpi: &KpiSnapshot) -> Vec<Trigger> {
    let mut triggers = Vec::new();

    if kpi.entropy_ratio > thresholds.rebalance_entropy {
        triggers.push(Trigger {
            kind: TriggerKind::Rebalance,
            urgency: Urgency::High,
            observed: kpi.entropy_ratio,
            threshold: thresholds.rebalance_entropy,
            reason: format!("entropy ratio {:.2} exceeds rebalance threshold", kpi.entropy_ratio),
        });
    } else if kpi.entropy_ratio > thresholds.shrink_entropy {
        triggers.push(Trigger {
            kind: TriggerKind::Shrink,
            urgency: Urgency::Medium,
            observed: kpi.entropy_ratio,
            threshold: thresholds.shrink_entropy,
            reason: format!("entropy ratio {:.2} exceeds shrink threshold", kpi.entropy_ratio),
        });
    }

    if kpi.velocity > thresholds.expand_velocity {
        triggers.push(Trigger {
            kind: TriggerKind::Expand,
            urgency: Urgency::Low,
            observed: kpi.velocity,
            threshold: thresholds.expand_velocity,
            reason: format!("velocity {:.0} coin/min supports expansion", kpi.velocity),
        });
    }

    triggers
}
