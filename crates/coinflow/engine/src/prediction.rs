//! Rolling-horizon forecast.
//!
//! The trend window's mint is extrapolated linearly to the horizon and burn is
//! re-derived from predicted mint through the current entropy ratio, which
//! keeps the burn/mint structure fixed. Velocity deltas from drag edits scale
//! predicted mint by `1 + Δv × sensitivity` each.

use coinflow_types::PersonId;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::drag::DragDelta;
use crate::kpi::KpiSnapshot;
use crate::team::TeamSelection;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub horizon_days: u32,
    /// Window the trend was taken from
    pub trend_window_days: u32,
    pub predicted_mint: f64,
    pub predicted_burn: f64,
    pub predicted_net: f64,
    pub predicted_entropy_ratio: f64,
    /// Product of all drag mint factors (1 with no velocity edits)
    pub mint_factor: f64,
    pub best_team: Vec<PersonId>,
    pub best_team_score: f64,
    /// Fixed scalar from configuration, not a statistical estimate
    pub confidence: f64,
    /// Deltas of every edit the forecast was asked to consider
    pub deltas: Vec<DragDelta>,
}

/// Forecast model.
#[derive(Clone, Debug)]
pub struct PredictionModel {
    window_days: u32,
    confidence: f64,
    sensitivity: f64,
}

impl PredictionModel {
    pub fn new(window_days: u32, confidence: f64, sensitivity: f64) -> Self {
        Self {
            window_days,
            confidence,
            sensitivity,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.kpi_window_days,
            config.confidence,
            config.drag_sensitivity,
        )
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    /// Mint factor for one velocity change. Never negative.
    pub fn mint_factor(&self, velocity_change: f64) -> f64 {
        (1.0 + velocity_change * self.sensitivity).max(0.0)
    }

    pub fn forecast(
        &self,
        horizon_days: u32,
        trend: &KpiSnapshot,
        deltas: Vec<DragDelta>,
        best_team: TeamSelection,
    ) -> Forecast {
        let window = f64::from(self.window_days.max(1));
        let base_mint = trend.mint / window * f64::from(horizon_days);

        let mint_factor: f64 = deltas
            .iter()
            .filter_map(DragDelta::velocity_change)
            .map(|dv| self.mint_factor(dv))
            .product();

        let predicted_mint = base_mint * mint_factor;
        let predicted_burn = predicted_mint * trend.entropy_ratio;

        Forecast {
            horizon_days,
            trend_window_days: self.window_days,
            predicted_mint,
            predicted_burn,
            predicted_net: predicted_mint - predicted_burn,
            predicted_entropy_ratio: trend.entropy_ratio,
            mint_factor,
            best_team: best_team.members,
            best_team_score: best_team.score,
            confidence: self.confidence,
            deltas,
        }
    }
}
