//! Drag: read-only what-if structural edits.
//!
//! Exactly three edit kinds exist. Translating an edit reads the registry and
//! the graph through shared references and returns a predicted delta; it can
//! never change state.

use std::str::FromStr;

use coinflow_types::PersonId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::graph::LinkGraph;
use crate::registry::PersonRegistry;
use crate::team::TeamOptimizer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragKind {
    Reallocation,
    LinkAdjustment,
    TeamSwap,
}

impl DragKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DragKind::Reallocation => "reallocation",
            DragKind::LinkAdjustment => "link_adjustment",
            DragKind::TeamSwap => "team_swap",
        }
    }
}

impl std::fmt::Display for DragKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DragKind {
    type Err = EngineError;

    /// Accepts the canonical names and the short forms
    /// `allocation`, `link` and `swap`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "reallocation" | "allocation" => Ok(DragKind::Reallocation),
            "link_adjustment" | "link" => Ok(DragKind::LinkAdjustment),
            "team_swap" | "swap" => Ok(DragKind::TeamSwap),
            _ => Err(EngineError::InvalidDragKind(s.to_string())),
        }
    }
}

/// A structural edit to simulate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DragEdit {
    /// Shift a person's baseline minutes, holding coin fixed
    Reallocation {
        person_id: PersonId,
        delta_minutes: f64,
    },
    /// Reweight an existing link
    LinkAdjustment {
        person_a: PersonId,
        person_b: PersonId,
        weight_delta: f64,
    },
    /// Replace one team member
    TeamSwap {
        team: Vec<PersonId>,
        person_out: PersonId,
        person_in: PersonId,
    },
}

impl DragEdit {
    /// Build an edit from a kind name and a JSON parameter object.
    pub fn parse(kind: &str, params: serde_json::Value) -> EngineResult<Self> {
        let kind: DragKind = kind.parse()?;
        let mut object = match params {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(EngineError::InvalidDragParams(format!(
                    "expected a parameter object, got {other}"
                )))
            }
        };
        object.insert(
            "kind".to_string(),
            serde_json::Value::String(kind.as_str().to_string()),
        );
        serde_json::from_value(serde_json::Value::Object(object))
            .map_err(|e| EngineError::InvalidDragParams(e.to_string()))
    }

    pub fn kind(&self) -> DragKind {
        match self {
            DragEdit::Reallocation { .. } => DragKind::Reallocation,
            DragEdit::LinkAdjustment { .. } => DragKind::LinkAdjustment,
            DragEdit::TeamSwap { .. } => DragKind::TeamSwap,
        }
    }
}

/// Predicted effect of an edit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DragDelta {
    /// `new_rate` and `velocity_change` are absent when the shift leaves no
    /// positive minutes to rate against.
    VelocityChange {
        person_id: PersonId,
        old_rate: f64,
        new_rate: Option<f64>,
        velocity_change: Option<f64>,
    },
    ExpectedUplift {
        person_a: PersonId,
        person_b: PersonId,
        average_uplift: f64,
        weight_delta: f64,
        expected_uplift: f64,
    },
    TeamScoreChange {
        team_before: Vec<PersonId>,
        team_after: Vec<PersonId>,
        score_before: f64,
        score_after: f64,
        delta: f64,
    },
}

impl DragDelta {
    /// The single headline number of the simulation.
    pub fn predicted_delta(&self) -> f64 {
        match self {
            DragDelta::VelocityChange {
                velocity_change, ..
            } => velocity_change.unwrap_or(0.0),
            DragDelta::ExpectedUplift {
                expected_uplift, ..
            } => *expected_uplift,
            DragDelta::TeamScoreChange { delta, .. } => *delta,
        }
    }

    /// Velocity change, for the deltas that are one.
    pub fn velocity_change(&self) -> Option<f64> {
        match self {
            DragDelta::VelocityChange {
                velocity_change, ..
            } => *velocity_change,
            _ => None,
        }
    }
}

/// Translates edits into deltas against borrowed state.
pub struct DragTranslator<'a> {
    registry: &'a PersonRegistry,
    graph: &'a LinkGraph,
}

impl<'a> DragTranslator<'a> {
    pub fn new(registry: &'a PersonRegistry, graph: &'a LinkGraph) -> Self {
        Self { registry, graph }
    }

    pub fn translate(&self, edit: &DragEdit) -> EngineResult<DragDelta> {
        let delta = match edit {
            DragEdit::Reallocation {
                person_id,
                delta_minutes,
            } => self.reallocation(person_id, *delta_minutes)?,
            DragEdit::LinkAdjustment {
                person_a,
                person_b,
                weight_delta,
            } => self.link_adjustment(person_a, person_b, *weight_delta)?,
            DragEdit::TeamSwap {
                team,
                person_out,
                person_in,
            } => self.team_swap(team, person_out, person_in)?,
        };

        debug!(
            kind = %edit.kind(),
            predicted_delta = delta.predicted_delta(),
            "Drag simulated"
        );
        Ok(delta)
    }

    fn reallocation(&self, person_id: &PersonId, delta_minutes: f64) -> EngineResult<DragDelta> {
        require_finite("delta_minutes", delta_minutes)?;
        let person = self
            .registry
            .get(person_id)
            .ok_or_else(|| EngineError::PersonNotFound(person_id.clone()))?;

        let old_rate = person.base_rate();
        let new_rate = person.base_rate_with_minutes_shift(delta_minutes);
        Ok(DragDelta::VelocityChange {
            person_id: person_id.clone(),
            old_rate,
            new_rate,
            velocity_change: new_rate.map(|rate| rate - old_rate),
        })
    }

    fn link_adjustment(
        &self,
        person_a: &PersonId,
        person_b: &PersonId,
        weight_delta: f64,
    ) -> EngineResult<DragDelta> {
        require_finite("weight_delta", weight_delta)?;
        let link = self
            .graph
            .get(person_a, person_b)
            .ok_or_else(|| EngineError::LinkNotFound {
                a: person_a.clone(),
                b: person_b.clone(),
            })?;

        let average_uplift = link.average_uplift();
        Ok(DragDelta::ExpectedUplift {
            person_a: person_a.clone(),
            person_b: person_b.clone(),
            average_uplift,
            weight_delta,
            expected_uplift: average_uplift * (1.0 + weight_delta),
        })
    }

    fn team_swap(
        &self,
        team: &[PersonId],
        person_out: &PersonId,
        person_in: &PersonId,
    ) -> EngineResult<DragDelta> {
        if !team.contains(person_out) {
            return Err(EngineError::NotAMember {
                person: person_out.clone(),
            });
        }

        let mut team_after: Vec<PersonId> = team
            .iter()
            .filter(|member| *member != person_out)
            .cloned()
            .collect();
        if !team_after.contains(person_in) {
            team_after.push(person_in.clone());
        }

        let score_before = TeamOptimizer::score(self.graph, team);
        let score_after = TeamOptimizer::score(self.graph, &team_after);
        Ok(DragDelta::TeamScoreChange {
            team_before: team.to_vec(),
            team_after,
            score_before,
            score_after,
            delta: score_after - score_before,
        })
    }
}

fn require_finite(name: &str, value: f64) -> EngineResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EngineError::InvalidDragParams(format!(
            "{name} must be finite, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use coinflow_types::{Event, EventId, EventKind, Partition};
    use serde_json::json;

    fn event(id: &str, amount: f64, minutes: f64, participants: &[&str]) -> Event {
        Event {
            event_id: EventId::from(id),
            timestamp: Utc::now(),
            kind: EventKind::Mint,
            amount,
            minutes,
            partition: Partition::default(),
            participants: participants.iter().map(|p| PersonId::from(*p)).collect(),
            evidence: None,
        }
    }

    fn pid(s: &str) -> PersonId {
        PersonId::from(s)
    }

    fn state() -> (PersonRegistry, LinkGraph) {
        let mut registry = PersonRegistry::new();
        let mut graph = LinkGraph::new();
        for e in [
            event("E1", 1_000_000.0, 100.0, &["A"]),
            event("E2", 2_500_000.0, 100.0, &["A", "B"]),
            event("E3", 100.0, 1.0, &["B", "C"]),
        ] {
            graph.apply(&e, &registry);
            registry.apply(&e);
        }
        (registry, graph)
    }

    #[test]
    fn kind_aliases() {
        assert_eq!("allocation".parse::<DragKind>().unwrap(), DragKind::Reallocation);
        assert_eq!("LINK".parse::<DragKind>().unwrap(), DragKind::LinkAdjustment);
        assert_eq!("team-swap".parse::<DragKind>().unwrap(), DragKind::TeamSwap);
        assert!(matches!(
            "teleport".parse::<DragKind>(),
            Err(EngineError::InvalidDragKind(k)) if k == "teleport"
        ));
    }

    #[test]
    fn parse_from_params() {
        let edit = DragEdit::parse(
            "allocation",
            json!({ "person_id": "A", "delta_minutes": 10.0 }),
        )
        .unwrap();
        assert_eq!(
            edit,
            DragEdit::Reallocation {
                person_id: pid("A"),
                delta_minutes: 10.0
            }
        );

        assert!(matches!(
            DragEdit::parse("link", json!({ "person_a": "A" })),
            Err(EngineError::InvalidDragParams(_))
        ));
        assert!(matches!(
            DragEdit::parse("swap", json!([1, 2])),
            Err(EngineError::InvalidDragParams(_))
        ));
    }

    #[test]
    fn reallocation_velocity_change() {
        let (registry, graph) = state();
        let delta = DragTranslator::new(&registry, &graph)
            .translate(&DragEdit::Reallocation {
                person_id: pid("A"),
                delta_minutes: 100.0,
            })
            .unwrap();
        // 1,000,000 / 200 - 1,000,000 / 100
        assert!((delta.predicted_delta() + 5_000.0).abs() < 1e-9);
        assert_eq!(delta.velocity_change(), Some(delta.predicted_delta()));
    }

    #[test]
    fn reallocation_to_no_minutes_has_no_velocity_change() {
        let (registry, graph) = state();
        let translator = DragTranslator::new(&registry, &graph);
        for delta_minutes in [-100.0, -150.0] {
            let delta = translator
                .translate(&DragEdit::Reallocation {
                    person_id: pid("A"),
                    delta_minutes,
                })
                .unwrap();
            assert_eq!(delta.velocity_change(), None);
            assert_eq!(delta.predicted_delta(), 0.0);
            assert!(matches!(
                delta,
                DragDelta::VelocityChange { new_rate: None, .. }
            ));
        }
    }

    #[test]
    fn reallocation_unknown_person() {
        let (registry, graph) = state();
        let result = DragTranslator::new(&registry, &graph).translate(&DragEdit::Reallocation {
            person_id: pid("Z"),
            delta_minutes: 1.0,
        });
        assert_eq!(result, Err(EngineError::PersonNotFound(pid("Z"))));
    }

    #[test]
    fn link_adjustment_scales_average_uplift() {
        let (registry, graph) = state();
        let delta = DragTranslator::new(&registry, &graph)
            .translate(&DragEdit::LinkAdjustment {
                person_a: pid("B"),
                person_b: pid("A"),
                weight_delta: 0.5,
            })
            .unwrap();
        assert!((delta.predicted_delta() - 30_000.0).abs() < 1e-9);
        assert_eq!(delta.velocity_change(), None);
    }

    #[test]
    fn link_adjustment_requires_link() {
        let (registry, graph) = state();
        let result = DragTranslator::new(&registry, &graph).translate(&DragEdit::LinkAdjustment {
            person_a: pid("A"),
            person_b: pid("C"),
            weight_delta: 0.5,
        });
        assert!(matches!(result, Err(EngineError::LinkNotFound { .. })));
    }

    #[test]
    fn team_swap_score_difference() {
        let (registry, graph) = state();
        let translator = DragTranslator::new(&registry, &graph);
        let delta = translator
            .translate(&DragEdit::TeamSwap {
                team: vec![pid("A"), pid("B")],
                person_out: pid("A"),
                person_in: pid("C"),
            })
            .unwrap();
        // Φ(A,B) = 2,000,000, Φ(B,C) = 100
        assert!((delta.predicted_delta() - (100.0 - 2_000_000.0)).abs() < 1e-6);

        let err = translator.translate(&DragEdit::TeamSwap {
            team: vec![pid("A"), pid("B")],
            person_out: pid("C"),
            person_in: pid("A"),
        });
        assert_eq!(err, Err(EngineError::NotAMember { person: pid("C") }));
    }

    #[test]
    fn swapping_in_existing_member_is_not_double_counted() {
        let (registry, graph) = state();
        let delta = DragTranslator::new(&registry, &graph)
            .translate(&DragEdit::TeamSwap {
                team: vec![pid("A"), pid("B"), pid("C")],
                person_out: pid("C"),
                person_in: pid("B"),
            })
            .unwrap();
        // Loses Φ(B,C) only.
        assert!((delta.predicted_delta() + 100.0).abs() < 1e-6);
    }

    #[test]
    fn non_finite_params_rejected() {
        let (registry, graph) = state();
        let result = DragTranslator::new(&registry, &graph).translate(&DragEdit::Reallocation {
            person_id: pid("A"),
            delta_minutes: f64::NAN,
        });
        assert!(matches!(result, Err(EngineError::InvalidDragParams(_))));
    }
}
