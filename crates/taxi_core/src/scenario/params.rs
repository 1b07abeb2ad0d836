use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::clock::{MINUTES_PER_DAY, MINUTES_PER_HOUR};
use crate::dispatcher::DispatcherConfig;
use crate::network::NodeId;
use crate::spawner::FareSpawnerConfig;
use crate::taxi::TaxiConfig;

/// Simulation end in minutes. The runner stops once the next event would be
/// at or after this minute.
#[derive(Debug, Clone, Copy, Resource)]
pub struct SimulationEndMinute(pub u64);

/// Road grid the scenario is played on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub width: i32,
    pub height: i32,
    /// Distance between adjacent junctions.
    pub spacing: i32,
    /// Distance units covered per minute.
    pub speed: f64,
    /// Share of streets closed at random when the grid is built.
    pub closed_street_fraction: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 50,
            height: 50,
            spacing: 5,
            speed: 1.0,
            closed_street_fraction: 0.0,
        }
    }
}

/// Parameters for building a simulation scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParams {
    pub seed: u64,
    pub grid: GridConfig,
    pub num_taxis: usize,
    /// Start points handed to taxis in number order; later taxis use the
    /// default start.
    pub start_points: Vec<NodeId>,
    pub taxi: TaxiConfig,
    pub dispatcher: DispatcherConfig,
    pub fares: FareSpawnerConfig,
    /// Spawn fares from the seeded generator. Off for hand-scripted runs.
    pub spawn_fares: bool,
    pub days: u64,
    /// Overrides `days` when set.
    pub simulation_end_minute: Option<u64>,
    pub snapshot_interval_minutes: u64,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            seed: 0,
            grid: GridConfig::default(),
            num_taxis: 8,
            start_points: Vec::new(),
            taxi: TaxiConfig::default(),
            dispatcher: DispatcherConfig::default(),
            fares: FareSpawnerConfig::default(),
            spawn_fares: true,
            days: 1,
            simulation_end_minute: None,
            snapshot_interval_minutes: MINUTES_PER_HOUR,
        }
    }
}

impl ScenarioParams {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_grid(mut self, width: i32, height: i32, spacing: i32) -> Self {
        self.grid.width = width;
        self.grid.height = height;
        self.grid.spacing = spacing;
        self
    }

    pub fn with_closed_streets(mut self, fraction: f64) -> Self {
        self.grid.closed_street_fraction = fraction;
        self
    }

    pub fn with_taxis(mut self, count: usize) -> Self {
        self.num_taxis = count;
        self
    }

    pub fn with_start_points(mut self, points: Vec<NodeId>) -> Self {
        self.start_points = points;
        self
    }

    pub fn with_taxi_config(mut self, config: TaxiConfig) -> Self {
        self.taxi = config;
        self
    }

    pub fn with_dispatcher_config(mut self, config: DispatcherConfig) -> Self {
        self.dispatcher = config;
        self
    }

    pub fn with_fare_config(mut self, config: FareSpawnerConfig) -> Self {
        self.fares = config;
        self
    }

    /// Disable the fare generator; fares then only arrive through the inbox.
    pub fn without_fare_spawner(mut self) -> Self {
        self.spawn_fares = false;
        self
    }

    pub fn with_days(mut self, days: u64) -> Self {
        self.days = days;
        self
    }

    pub fn with_simulation_end_minute(mut self, minute: u64) -> Self {
        self.simulation_end_minute = Some(minute);
        self
    }

    pub fn end_minute(&self) -> u64 {
        self.simulation_end_minute
            .unwrap_or_else(|| self.days.max(1) * MINUTES_PER_DAY)
    }

    /// Seed for the fare generator, kept apart from the street-closure seed.
    pub fn fare_seed(&self) -> u64 {
        self.seed.wrapping_add(0xfa4e_5eed)
    }

    pub fn street_seed(&self) -> u64 {
        self.seed ^ 0x5eed_cafe
    }
}
