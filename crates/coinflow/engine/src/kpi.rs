//! Rolling-window KPI aggregation.
//!
//! A pure function of the ledger contents and a reference instant.

use chrono::{DateTime, Duration, Utc};
use coinflow_types::{Event, EventKind, Partition};
use serde::{Deserialize, Serialize};

/// KPI over a trailing window.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiSnapshot {
    pub window_days: u32,
    pub mint: f64,
    pub burn: f64,
    pub net: f64,
    /// burn / mint, 0 when nothing was minted
    pub entropy_ratio: f64,
    /// (mint + burn) / minutes, 0 when the window holds no minutes
    pub velocity: f64,
    /// Minutes of every event in the window, transfers included
    pub minutes: f64,
    pub event_count: usize,
}

/// Restricts a KPI to events whose partition matches every key that is set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionFilter {
    pub industry: Option<String>,
    pub customer: Option<String>,
    pub project: Option<String>,
}

impl PartitionFilter {
    pub fn industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    pub fn customer(mut self, customer: impl Into<String>) -> Self {
        self.customer = Some(customer.into());
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn matches(&self, partition: &Partition) -> bool {
        fn key_matches(want: &Option<String>, have: &str) -> bool {
            want.as_deref().map_or(true, |w| w == have)
        }
        key_matches(&self.industry, &partition.industry)
            && key_matches(&self.customer, &partition.customer)
            && key_matches(&self.project, &partition.project)
    }
}

/// KPI calculator.
#[derive(Debug, Default, Clone, Copy)]
pub struct KpiCalculator;

impl KpiCalculator {
    pub fn new() -> Self {
        Self
    }

    /// KPI over events with `timestamp >= now - window_days`.
    pub fn compute(&self, events: &[Event], window_days: u32, now: DateTime<Utc>) -> KpiSnapshot {
        self.compute_filtered(events, window_days, now, &PartitionFilter::default())
    }

    pub fn compute_filtered(
        &self,
        events: &[Event],
        window_days: u32,
        now: DateTime<Utc>,
        filter: &PartitionFilter,
    ) -> KpiSnapshot {
        let cutoff = window_start(now, window_days);

        let mut snapshot = KpiSnapshot {
            window_days,
            ..KpiSnapshot::default()
        };
        for event in events
            .iter()
            .filter(|e| e.timestamp >= cutoff && filter.matches(&e.partition))
        {
            match event.kind {
                EventKind::Mint => snapshot.mint += event.amount,
                EventKind::Burn => snapshot.burn += event.amount,
                EventKind::Transfer => {}
            }
            snapshot.minutes += event.minutes;
            snapshot.event_count += 1;
        }

        snapshot.net = snapshot.mint - snapshot.burn;
        snapshot.entropy_ratio = if snapshot.mint > 0.0 {
            snapshot.burn / snapshot.mint
        } else {
            0.0
        };
        snapshot.velocity = if snapshot.minutes > 0.0 {
            (snapshot.mint + snapshot.burn) / snapshot.minutes
        } else {
            0.0
        };
        snapshot
    }
}

fn window_start(now: DateTime<Utc>, window_days: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::days(i64::from(window_days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
