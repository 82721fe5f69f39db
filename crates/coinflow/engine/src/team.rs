use coinflow_types::PersonId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::combinations::Combinations;
use crate::graph::LinkGraph;
use crate::registry::PersonRegistry;

/// How a team was selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Every combination scored; the result is the true argmax
    Exhaustive,
    /// Candidate pool above the search ceiling; grown greedily from the strongest link
    Greedy,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamSelection {
    /// Members in ascending id order
    pub members: Vec<PersonId>,
    pub score: f64,
    pub strategy: SearchStrategy,
}

/// Search for the team of size k with the highest within-team Φ.
#[derive(Clone, Copy, Debug)]
pub struct TeamOptimizer {
    /// Largest pool searched exhaustively
    ceiling: usize,
}

impl TeamOptimizer {
    pub fn new(ceiling: usize) -> Self {
        Self { ceiling }
    }

    /// Σ Φ over all within-team pairs that have a link.
    pub fn score<'a>(graph: &LinkGraph, members: impl IntoIterator<Item = &'a PersonId>) -> f64 {
        graph.team_score(members)
    }

    /// Best team of `k` known persons.
    ///
    /// Exhaustive search keeps the first maximum in lexicographic order of
    /// sorted ids, so ties resolve to the lexicographically smallest team.
    /// With fewer than `k` persons every person is returned.
    pub fn best_team(&self, k: usize, registry: &PersonRegistry, graph: &LinkGraph) -> TeamSelection {
        let ids = registry.ids();

        if k >= ids.len() {
            let score = Self::score(graph, &ids);
            return TeamSelection {
                members: ids,
                score,
                strategy: SearchStrategy::Exhaustive,
            };
        }

        if ids.len() > self.ceiling {
            warn!(
                candidates = ids.len(),
                ceiling = self.ceiling,
                k = k,
                "Team search above ceiling, using greedy heuristic"
            );
            return self.greedy(k, &ids, graph);
        }

        let teams = Combinations::new(&ids, k);
        debug!(
            candidates = ids.len(),
            k = k,
            combinations = %teams.total(),
            "Exhaustive team search"
        );

        let mut best: Option<(Vec<&PersonId>, f64)> = None;
        for team in teams {
            let score = Self::score(graph, team.iter().copied());
            if best.as_ref().map_or(true, |(_, best_score)| score > *best_score) {
                best = Some((team, score));
            }
        }

        let (members, score) = best
            .map(|(team, score)| (team.into_iter().cloned().collect::<Vec<_>>(), score))
            .unwrap_or_default();
        TeamSelection {
            members,
            score,
            strategy: SearchStrategy::Exhaustive,
        }
    }

    /// Seed with the strongest link (or the smallest id), then repeatedly add
    /// the candidate with the largest marginal Φ; ties go to the smaller id.
    fn greedy(&self, k: usize, ids: &[PersonId], graph: &LinkGraph) -> TeamSelection {
        let mut team: Vec<PersonId> = Vec::with_capacity(k);
        if k >= 2 {
            if let Some(link) = graph.strongest_link().filter(|l| l.is_verified()) {
                team.push(link.key.low().clone());
                team.push(link.key.high().clone());
            }
        }

        while team.len() < k {
            let mut pick: Option<(&PersonId, f64)> = None;
            for candidate in ids.iter().filter(|id| !team.contains(id)) {
                let gain = graph.marginal_gain(candidate, &team);
                if pick.map_or(true, |(_, best_gain)| gain > best_gain) {
                    pick = Some((candidate, gain));
                }
            }
            match pick {
                Some((candidate, _)) => team.push(candidate.clone()),
                None => break,
            }
        }

        team.sort();
        let score = Self::score(graph, &team);
        TeamSelection {
            members: team,
            score,
            strategy: SearchStrategy::Greedy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use coinflow_types::{Event, EventId, EventKind, Partition};

    fn event(id: &str, amount: f64, participants: &[&str]) -> Event {
        Event {
            event_id: EventId::from(id),
            timestamp: Utc::now(),
            kind: EventKind::Mint,
            amount,
            minutes: 1.0,
            partition: Partition::default(),
            participants: participants.iter().map(|p| PersonId::from(*p)).collect(),
            evidence: None,
        }
    }

    fn build(events: &[Event]) -> (PersonRegistry, LinkGraph) {
        let mut registry = PersonRegistry::new();
        let mut graph = LinkGraph::new();
        for e in events {
            graph.apply(e, &registry);
            registry.apply(e);
        }
        (registry, graph)
    }

    fn ids(names: &[&str]) -> Vec<PersonId> {
        names.iter().map(|n| PersonId::from(*n)).collect()
    }

    #[test]
    fn picks_highest_energy_team() {
        let (registry, graph) = build(&[
            event("E1", 100.0, &["A", "B"]),
            event("E2", 500.0, &["C", "D"]),
            event("E3", 50.0, &["B", "C"]),
        ]);
        let best = TeamOptimizer::new(20).best_team(2, &registry, &graph);
        assert_eq!(best.members, ids(&["C", "D"]));
        assert!((best.score - 500.0).abs() < 1e-9);
        assert_eq!(best.strategy, SearchStrategy::Exhaustive);

        let trio = TeamOptimizer::new(20).best_team(3, &registry, &graph);
        assert_eq!(trio.members, ids(&["B", "C", "D"]));
        assert!((trio.score - 550.0).abs() < 1e-9);
    }

    #[test]
    fn score_sums_within_team_links_once() {
        let (_, graph) = build(&[
            event("E1", 100.0, &["A", "B"]),
            event("E2", 50.0, &["B", "C"]),
        ]);
        let team = ids(&["A", "B", "C", "B"]);
        assert!((TeamOptimizer::score(&graph, &team) - 150.0).abs() < 1e-9);
        assert_eq!(TeamOptimizer::score(&graph, &ids(&["A", "C"])), 0.0);
    }

    #[test]
    fn ties_resolve_to_smallest_team() {
        let (registry, graph) = build(&[
            event("E1", 100.0, &["C", "D"]),
            event("E2", 100.0, &["A", "B"]),
        ]);
        let best = TeamOptimizer::new(20).best_team(2, &registry, &graph);
        assert_eq!(best.members, ids(&["A", "B"]));
    }

    #[test]
    fn zero_links_yields_zero_score_team() {
        let (registry, graph) = build(&[
            event("E1", 10.0, &["A"]),
            event("E2", 10.0, &["B"]),
            event("E3", 10.0, &["C"]),
        ]);
        let best = TeamOptimizer::new(20).best_team(2, &registry, &graph);
        assert_eq!(best.members, ids(&["A", "B"]));
        assert_eq!(best.score, 0.0);
    }

    #[test]
    fn fewer_persons_than_k_returns_everyone() {
        let (registry, graph) = build(&[event("E1", 10.0, &["A", "B"])]);
        let best = TeamOptimizer::new(20).best_team(5, &registry, &graph);
        assert_eq!(best.members, ids(&["A", "B"]));
        assert!((best.score - 10.0).abs() < 1e-9);

        let empty = TeamOptimizer::new(20).best_team(3, &PersonRegistry::new(), &LinkGraph::new());
        assert!(empty.members.is_empty());
        assert_eq!(empty.score, 0.0);
    }

    #[test]
    fn greedy_above_ceiling() {
        let (registry, graph) = build(&[
            event("E1", 100.0, &["A", "B"]),
            event("E2", 500.0, &["C", "D"]),
            event("E3", 300.0, &["D", "E"]),
            event("E4", 10.0, &["F"]),
        ]);
        let best = TeamOptimizer::new(3).best_team(3, &registry, &graph);
        assert_eq!(best.strategy, SearchStrategy::Greedy);
        assert_eq!(best.members, ids(&["C", "D", "E"]));
        assert!((best.score - 800.0).abs() < 1e-9);
    }

    #[test]
    fn greedy_without_links_takes_smallest_ids() {
        let (registry, graph) = build(&[
            event("E1", 1.0, &["D"]),
            event("E2", 1.0, &["C"]),
            event("E3", 1.0, &["B"]),
            event("E4", 1.0, &["A"]),
        ]);
        let best = TeamOptimizer::new(2).best_team(2, &registry, &graph);
        assert_eq!(best.strategy, SearchStrategy::Greedy);
        assert_eq!(best.members, ids(&["A", "B"]));
    }
}
