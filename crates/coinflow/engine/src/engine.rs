use std::sync::Arc;

use chrono::{DateTime, Utc};
use coinflow_types::{Event, EventId, EventKind, Partition, PersonId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audit::AuditLog;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::drag::{DragDelta, DragEdit, DragTranslator};
use crate::error::EngineResult;
use crate::export::StateExport;
use crate::graph::NetworkValue;
use crate::kpi::{KpiCalculator, KpiSnapshot, PartitionFilter};
use crate::ledger::{AppendReceipt, EventLedger};
use crate::prediction::{Forecast, PredictionModel};
use crate::team::{TeamOptimizer, TeamSelection};
use crate::triggers::{self, Trigger};

/// Fields of an event as submitted by a collaborator.
///
/// A missing id is generated; a missing timestamp is taken from the engine clock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventInput {
    #[serde(default)]
    pub event_id: Option<EventId>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub kind: EventKind,
    pub amount: f64,
    pub minutes: f64,
    #[serde(default)]
    pub partition: Partition,
    pub participants: Vec<PersonId>,
    #[serde(default)]
    pub evidence: Option<String>,
}

impl EventInput {
    pub fn new<I, P>(kind: EventKind, amount: f64, minutes: f64, participants: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PersonId>,
    {
        Self {
            event_id: None,
            timestamp: None,
            kind,
            amount,
            minutes,
            partition: Partition::default(),
            participants: participants.into_iter().map(Into::into).collect(),
            evidence: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.event_id = Some(EventId::new(id));
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn in_partition(mut self, partition: Partition) -> Self {
        self.partition = partition;
        self
    }

    fn into_event(self, now: DateTime<Utc>) -> Event {
        Event {
            event_id: self
                .event_id
                .unwrap_or_else(|| EventId::new(uuid::Uuid::new_v4().to_string())),
            timestamp: self.timestamp.unwrap_or(now),
            kind: self.kind,
            amount: self.amount,
            minutes: self.minutes,
            partition: self.partition,
            participants: self.participants,
            evidence: self.evidence,
        }
    }
}

/// The Coinflow engine.
///
/// Owns the ledger (and through it every aggregate) plus the immutable
/// configuration. Mutations go through `&mut self`; every read is `&self`.
pub struct Engine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    ledger: EventLedger,
    kpi: KpiCalculator,
}

impl Engine {
    /// Engine on the system clock.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            ledger: EventLedger::new(),
            kpi: KpiCalculator::new(),
        })
    }

    /// Replace the configuration. Audited by fingerprint only.
    pub fn reconfigure(&mut self, config: EngineConfig) -> EngineResult<()> {
        config.validate()?;
        let fingerprint = config.fingerprint();
        self.config = config;
        self.ledger
            .record_reconfiguration(&fingerprint, self.clock.now());
        info!(fingerprint = %fingerprint, "Engine reconfigured");
        Ok(())
    }

    pub fn append_event(&mut self, input: EventInput) -> EngineResult<AppendReceipt> {
        let now = self.clock.now();
        self.ledger.append(input.into_event(now), now)
    }

    /// Register a labelled person. `Ok(false)` if the id already exists.
    pub fn register_person(
        &mut self,
        id: impl Into<PersonId>,
        label: impl Into<String>,
    ) -> EngineResult<bool> {
        let now = self.clock.now();
        self.ledger.register_person(id.into(), label, now)
    }

    /// Map an industry source label to an event kind via the configured catalog.
    pub fn resolve_kind(&self, industry: &str, label: &str) -> Option<EventKind> {
        self.config.resolve_kind(industry, label)
    }

    pub fn get_kpi(&self, window_days: u32) -> KpiSnapshot {
        self.get_kpi_at(window_days, self.clock.now())
    }

    /// KPI relative to an explicit reference instant.
    pub fn get_kpi_at(&self, window_days: u32, now: DateTime<Utc>) -> KpiSnapshot {
        self.kpi.compute(self.ledger.events(), window_days, now)
    }

    pub fn get_kpi_for(&self, window_days: u32, filter: &PartitionFilter) -> KpiSnapshot {
        self.kpi
            .compute_filtered(self.ledger.events(), window_days, self.clock.now(), filter)
    }

    pub fn get_network_value(&self) -> NetworkValue {
        self.ledger
            .graph()
            .network_value(self.ledger.registry().len())
    }

    pub fn best_team(&self, k: usize) -> TeamSelection {
        self.optimizer()
            .best_team(k, self.ledger.registry(), self.ledger.graph())
    }

    /// Forecast `horizon_days` ahead, folding in the given edits.
    ///
    /// Every edit is validated; an invalid edit fails the whole forecast.
    pub fn forecast(&self, horizon_days: u32, edits: &[DragEdit]) -> EngineResult<Forecast> {
        let deltas = edits
            .iter()
            .map(|edit| self.simulate(edit))
            .collect::<EngineResult<Vec<_>>>()?;

        let model = PredictionModel::from_config(&self.config);
        let trend = self.get_kpi(model.window_days());
        let best = self.best_team(self.config.forecast_team_size);
        Ok(model.forecast(horizon_days, &trend, deltas, best))
    }

    /// Simulate an edit given by kind name and JSON parameters. Never mutates.
    pub fn simulate_drag(&self, kind: &str, params: serde_json::Value) -> EngineResult<DragDelta> {
        let edit = DragEdit::parse(kind, params)?;
        self.simulate(&edit)
    }

    pub fn simulate(&self, edit: &DragEdit) -> EngineResult<DragDelta> {
        DragTranslator::new(self.ledger.registry(), self.ledger.graph()).translate(edit)
    }

    /// Structural triggers for the current KPI window.
    pub fn check_triggers(&self) -> Vec<Trigger> {
        let kpi = self.get_kpi(self.config.kpi_window_days);
        triggers::evaluate(&self.config.triggers, &kpi)
    }

    pub fn export_state(&self) -> StateExport {
        StateExport::capture(&self.ledger, self.config.audit_tail_len)
    }

    pub fn audit_log(&self) -> &AuditLog {
        self.ledger.audit()
    }

    pub fn ledger(&self) -> &EventLedger {
        &self.ledger
    }

    fn optimizer(&self) -> TeamOptimizer {
        TeamOptimizer::new(self.config.team_search_ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::EngineError;
    use crate::ledger::AppendStatus;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn engine() -> (Engine, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(start()));
        let engine = Engine::with_clock(EngineConfig::default(), clock.clone()).unwrap();
        (engine, clock)
    }

    #[test]
    fn generated_ids_and_clock_timestamps() {
        let (mut engine, _clock) = engine();
        let receipt = engine
            .append_event(EventInput::new(EventKind::Mint, 10.0, 1.0, ["A"]))
            .unwrap();
        assert_eq!(receipt.status, AppendStatus::Applied);
        assert!(!receipt.event_id.as_str().is_empty());

        let stored = engine.ledger().get(&receipt.event_id).unwrap();
        assert_eq!(stored.timestamp, start());
    }

    #[test]
    fn kpi_follows_the_clock() {
        let (mut engine, clock) = engine();
        engine
            .append_event(EventInput::new(EventKind::Mint, 1_000.0, 10.0, ["A"]).with_id("E1"))
            .unwrap();
        assert_eq!(engine.get_kpi(7).mint, 1_000.0);

        clock.advance(Duration::days(8));
        let kpi = engine.get_kpi(7);
        assert_eq!(kpi.mint, 0.0);
        assert_eq!(kpi.entropy_ratio, 0.0);

        assert_eq!(engine.get_kpi_at(7, start()).mint, 1_000.0);
    }

    #[test]
    fn invalid_config_rejected() {
        let config = EngineConfig {
            confidence: 2.0,
            ..EngineConfig::default()
        };
        assert!(matches!(Engine::new(config), Err(EngineError::Config(_))));
    }

    #[test]
    fn reconfigure_is_audited_and_not_exported() {
        let (mut engine, _clock) = engine();
        let config = EngineConfig {
            confidence: 0.9,
            ..EngineConfig::default()
        };
        let fingerprint = config.fingerprint();
        engine.reconfigure(config).unwrap();

        let entry = engine.audit_log().iter().last().unwrap();
        assert_eq!(entry.payload["config_fingerprint"], fingerprint.as_str());
        assert!((engine.forecast(7, &[]).unwrap().confidence - 0.9).abs() < f64::EPSILON);

        let bad = EngineConfig {
            team_search_ceiling: 0,
            ..EngineConfig::default()
        };
        assert!(engine.reconfigure(bad).is_err());
        assert_eq!(engine.audit_log().len(), 1);
    }

    #[test]
    fn forecast_uses_trend_and_best_team() {
        let (mut engine, _clock) = engine();
        engine
            .append_event(EventInput::new(EventKind::Mint, 700.0, 7.0, ["A", "B"]).with_id("E1"))
            .unwrap();
        engine
            .append_event(EventInput::new(EventKind::Burn, 70.0, 1.0, ["A"]).with_id("E2"))
            .unwrap();

        let forecast = engine.forecast(14, &[]).unwrap();
        assert!((forecast.predicted_mint - 1_400.0).abs() < 1e-9);
        assert!((forecast.predicted_burn - 140.0).abs() < 1e-9);
        assert_eq!(
            forecast.best_team,
            vec![PersonId::from("A"), PersonId::from("B")]
        );
        assert!((forecast.best_team_score - 700.0).abs() < 1e-9);
    }

    #[test]
    fn forecast_rejects_invalid_edit() {
        let (engine, _clock) = engine();
        let edits = [DragEdit::Reallocation {
            person_id: PersonId::from("ghost"),
            delta_minutes: 5.0,
        }];
        assert!(matches!(
            engine.forecast(7, &edits),
            Err(EngineError::PersonNotFound(_))
        ));
    }

    #[test]
    fn simulate_drag_by_name() {
        let (mut engine, _clock) = engine();
        engine
            .append_event(EventInput::new(EventKind::Mint, 1_000.0, 10.0, ["A"]).with_id("E1"))
            .unwrap();
        let delta = engine
            .simulate_drag("allocation", json!({ "person_id": "A", "delta_minutes": -5.0 }))
            .unwrap();
        assert!((delta.predicted_delta() - 100.0).abs() < 1e-9);

        assert!(matches!(
            engine.simulate_drag("merge", json!({})),
            Err(EngineError::InvalidDragKind(_))
        ));
    }

    #[test]
    fn triggers_from_current_window() {
        let (mut engine, _clock) = engine();
        engine
            .append_event(EventInput::new(EventKind::Mint, 1_000.0, 1.0, ["A"]).with_id("E1"))
            .unwrap();
        engine
            .append_event(EventInput::new(EventKind::Burn, 800.0, 1.0, ["A"]).with_id("E2"))
            .unwrap();
        let triggers = engine.check_triggers();
        let kinds: Vec<_> = triggers.iter().map(|t| t.kind).collect();
        assert!(kinds.contains(&crate::triggers::TriggerKind::Rebalance));
    }

    #[test]
    fn register_then_append_keeps_label() {
        let (mut engine, _clock) = engine();
        assert!(engine.register_person("A", "Alice").unwrap());
        engine
            .append_event(EventInput::new(EventKind::Mint, 10.0, 1.0, ["A"]).with_id("E1"))
            .unwrap();
        let export = engine.export_state();
        assert_eq!(export.persons[0].label, "Alice");
        assert_eq!(export.audit_tail.len(), 2);
    }

    #[test]
    fn resolve_kind_through_engine() {
        let (engine, _clock) = engine();
        assert_eq!(engine.resolve_kind("service", "operating_cost"), Some(EventKind::Burn));
    }
}
