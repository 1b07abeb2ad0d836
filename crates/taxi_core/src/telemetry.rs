//! Telemetry / KPIs: fare outcomes and periodic fleet snapshots.

use std::collections::{HashMap, VecDeque};

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::clock::MINUTES_PER_HOUR;
use crate::fare::FareKey;
use crate::network::NodeId;
use crate::taxi::{TaxiId, TaxiState};

/// One fare delivered to its destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedFareRecord {
    pub taxi: TaxiId,
    pub origin: NodeId,
    pub destination: NodeId,
    pub call_time: u64,
    pub picked_up_at: u64,
    pub completed_at: u64,
    pub price: f64,
}

impl CompletedFareRecord {
    /// Minutes the passenger waited at the kerb.
    pub fn wait_time(&self) -> u64 {
        self.picked_up_at.saturating_sub(self.call_time)
    }

    pub fn ride_time(&self) -> u64 {
        self.completed_at.saturating_sub(self.picked_up_at)
    }
}

/// Running counters for a simulation. Insert as a resource to record outcomes.
#[derive(Debug, Default, Resource)]
pub struct SimTelemetry {
    pub announced: u64,
    pub rejected: u64,
    pub allocated: u64,
    pub expired: u64,
    pub cancelled: u64,
    pub completed_fares: Vec<CompletedFareRecord>,
    pickups: HashMap<FareKey, u64>,
}

impl SimTelemetry {
    pub fn record_pickup(&mut self, key: FareKey, at: u64) {
        self.pickups.insert(key, at);
    }

    pub fn record_completion(&mut self, taxi: TaxiId, key: FareKey, price: f64, at: u64) {
        let picked_up_at = self.pickups.remove(&key).unwrap_or(key.call_time);
        self.completed_fares.push(CompletedFareRecord {
            taxi,
            origin: key.origin,
            destination: key.destination,
            call_time: key.call_time,
            picked_up_at,
            completed_at: at,
            price,
        });
    }

    pub fn completed(&self) -> usize {
        self.completed_fares.len()
    }

    pub fn mean_wait(&self) -> Option<f64> {
        if self.completed_fares.is_empty() {
            return None;
        }
        let total: u64 = self.completed_fares.iter().map(|r| r.wait_time()).sum();
        Some(total as f64 / self.completed_fares.len() as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxiSnapshot {
    pub number: TaxiId,
    pub balance: i64,
    pub on_duty: bool,
    pub state: TaxiState,
}

/// Fleet and dispatcher state at one minute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub minute: u64,
    pub dispatcher_revenue: f64,
    pub open_fares: usize,
    pub completed_fares: usize,
    pub taxis: Vec<TaxiSnapshot>,
}

impl MetricsSnapshot {
    pub fn on_duty(&self) -> usize {
        self.taxis.iter().filter(|t| t.on_duty).count()
    }

    pub fn total_balance(&self) -> i64 {
        self.taxis.iter().map(|t| t.balance).sum()
    }
}

/// Snapshot capture configuration.
#[derive(Debug, Clone, Copy, Resource)]
pub struct SimSnapshotConfig {
    pub interval_minutes: u64,
    pub max_snapshots: usize,
}

impl Default for SimSnapshotConfig {
    fn default() -> Self {
        Self {
            interval_minutes: MINUTES_PER_HOUR,
            max_snapshots: 10_000,
        }
    }
}

/// Rolling snapshot buffer.
#[derive(Debug, Default, Resource)]
pub struct SimSnapshots {
    pub snapshots: VecDeque<MetricsSnapshot>,
    pub last_snapshot_at: Option<u64>,
}

impl SimSnapshots {
    pub fn push(&mut self, snapshot: MetricsSnapshot, max: usize) {
        self.last_snapshot_at = Some(snapshot.minute);
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > max.max(1) {
            self.snapshots.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&MetricsSnapshot> {
        self.snapshots.back()
    }
}
