//! Engine configuration.
//!
//! Supplied once at construction and replaced only through
//! [`Engine::reconfigure`](crate::Engine::reconfigure). The configuration holds
//! the per-industry tuning constants and is never part of the exported state.

use std::collections::BTreeMap;
use std::path::Path;

use coinflow_types::EventKind;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::triggers::TriggerThresholds;

/// Immutable engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Trailing window (days) the forecast extrapolates from
    pub kpi_window_days: u32,
    /// Team size used for the forecast's best team
    pub forecast_team_size: usize,
    /// Fixed forecast confidence. Not a statistical estimate.
    pub confidence: f64,
    /// Predicted mint factor per unit of velocity change: `1 + Δv × sensitivity`
    pub drag_sensitivity: f64,
    /// Largest candidate count searched exhaustively; above it a greedy search runs
    pub team_search_ceiling: usize,
    /// Audit entries included in a state export
    pub audit_tail_len: usize,
    pub triggers: TriggerThresholds,
    /// Per-industry tuning, keyed by industry id
    pub industries: BTreeMap<String, IndustryProfile>,
}

/// Per-industry tuning profile. Physics are shared; only parameters differ.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndustryProfile {
    pub display_name: String,
    /// Indirect contribution decay
    pub lambda_decay: f64,
    /// Joint work bonus
    pub gamma_bonus: f64,
    /// Update sensitivity
    pub alpha_sensitivity: f64,
    /// Source label -> event kind
    pub event_catalog: BTreeMap<String, EventKind>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kpi_window_days: 7,
            forecast_team_size: 3,
            confidence: 0.7,
            drag_sensitivity: 0.1,
            team_search_ceiling: 20,
            audit_tail_len: 50,
            triggers: TriggerThresholds::default(),
            industries: default_industries(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> EngineResult<Self> {
        let config: EngineConfig =
            toml::from_str(contents).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.kpi_window_days == 0 {
            return Err(EngineError::Config("kpi_window_days must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(EngineError::Config(format!(
                "confidence must be within [0, 1], got {}",
                self.confidence
            )));
        }
        if !self.drag_sensitivity.is_finite() || self.drag_sensitivity < 0.0 {
            return Err(EngineError::Config(format!(
                "drag_sensitivity must be finite and >= 0, got {}",
                self.drag_sensitivity
            )));
        }
        if self.team_search_ceiling < 2 {
            return Err(EngineError::Config(
                "team_search_ceiling must be >= 2".into(),
            ));
        }
        self.triggers.validate()
    }

    /// Map an industry-specific source label to an event kind.
    pub fn resolve_kind(&self, industry: &str, label: &str) -> Option<EventKind> {
        self.industries
            .get(industry)
            .and_then(|profile| profile.event_catalog.get(label))
            .copied()
    }

    pub fn industry(&self, industry: &str) -> Option<&IndustryProfile> {
        self.industries.get(industry)
    }

    /// BLAKE3 fingerprint of the configuration. Recorded in the audit trail
    /// in place of the configuration itself.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }
}

fn default_industries() -> BTreeMap<String, IndustryProfile> {
    let profile = |name: &str, lambda, gamma, alpha, catalog: &[(&str, EventKind)]| IndustryProfile {
        display_name: name.to_string(),
        lambda_decay: lambda,
        gamma_bonus: gamma,
        alpha_sensitivity: alpha,
        event_catalog: catalog
            .iter()
            .map(|(label, kind)| (label.to_string(), *kind))
            .collect(),
    };

    let mut industries = BTreeMap::new();
    industries.insert(
        "service".to_string(),
        profile(
            "Service",
            0.08,
            0.06,
            0.25,
            &[
                ("consultation", EventKind::Mint),
                ("project_fee", EventKind::Mint),
                ("operating_cost", EventKind::Burn),
                ("commission", EventKind::Transfer),
            ],
        ),
    );
    industries.insert(
        "education".to_string(),
        profile(
            "Education",
            0.12,
            0.08,
            0.20,
            &[
                ("tuition", EventKind::Mint),
                ("coaching_fee", EventKind::Mint),
                ("facility_cost", EventKind::Burn),
                ("referral_bonus", EventKind::Transfer),
            ],
        ),
    );
    industries.insert(
        "construction".to_string(),
        profile(
            "Construction",
            0.15,
            0.04,
            0.15,
            &[
                ("contract", EventKind::Mint),
                ("material_cost", EventKind::Burn),
                ("labor_cost", EventKind::Burn),
                ("subcontract", EventKind::Transfer),
            ],
        ),
    );
    industries
}
