use std::sync::Arc;

use coinflow_types::PersonId;
use parking_lot::RwLock;

use crate::config::EngineConfig;
use crate::drag::{DragDelta, DragEdit};
use crate::engine::{Engine, EventInput};
use crate::error::EngineResult;
use crate::export::StateExport;
use crate::graph::NetworkValue;
use crate::kpi::KpiSnapshot;
use crate::ledger::AppendReceipt;
use crate::prediction::Forecast;

/// Thread-safe engine handle.
///
/// Mutations take the write lock, so there is a single logical writer.
/// Reads take the read lock and always observe a state between two appends.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<RwLock<Engine>>,
}

impl SharedEngine {
    pub fn new(engine: Engine) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    pub fn append_event(&self, input: EventInput) -> EngineResult<AppendReceipt> {
        self.inner.write().append_event(input)
    }

    pub fn register_person(
        &self,
        id: impl Into<PersonId>,
        label: impl Into<String>,
    ) -> EngineResult<bool> {
        self.inner.write().register_person(id, label)
    }

    pub fn reconfigure(&self, config: EngineConfig) -> EngineResult<()> {
        self.inner.write().reconfigure(config)
    }

    /// Run a read-only closure against a consistent snapshot.
    pub fn read<R>(&self, f: impl FnOnce(&Engine) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn get_kpi(&self, window_days: u32) -> KpiSnapshot {
        self.inner.read().get_kpi(window_days)
    }

    pub fn get_network_value(&self) -> NetworkValue {
        self.inner.read().get_network_value()
    }

    pub fn forecast(&self, horizon_days: u32, edits: &[DragEdit]) -> EngineResult<Forecast> {
        self.inner.read().forecast(horizon_days, edits)
    }

    pub fn simulate_drag(&self, kind: &str, params: serde_json::Value) -> EngineResult<DragDelta> {
        self.inner.read().simulate_drag(kind, params)
    }

    pub fn export_state(&self) -> StateExport {
        self.inner.read().export_state()
    }
}
