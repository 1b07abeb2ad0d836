#![allow(dead_code)]

use bevy_ecs::prelude::World;
use taxi_core::dispatcher::DispatcherConfig;
use taxi_core::network::{NodeId, RoadNetwork};
use taxi_core::runner::initialize_simulation;
use taxi_core::scenario::{build_scenario_with_network, ScenarioParams};
use taxi_core::spawner::FareSpawnerConfig;
use taxi_core::taxi::TaxiConfig;

/// Helper that builds a ready-to-run world from a hand-made network and a
/// handful of placed taxis. Fares only arrive through the inbox unless a
/// spawner config is given.
pub struct TestWorldBuilder {
    params: ScenarioParams,
    network: RoadNetwork,
}

impl Default for TestWorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorldBuilder {
    /// 30x30 grid with junctions every 5 units, no taxis, two hours long.
    pub fn new() -> Self {
        Self {
            params: ScenarioParams::default()
                .with_seed(42)
                .with_taxis(0)
                .without_fare_spawner()
                .with_simulation_end_minute(120),
            network: RoadNetwork::grid(30, 30, 5, 1.0),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.params.seed = seed;
        self
    }

    pub fn with_network(mut self, network: RoadNetwork) -> Self {
        self.network = network;
        self
    }

    /// One taxi per start point, numbered from 1 in the given order.
    pub fn with_taxis_at(mut self, points: &[(i32, i32)]) -> Self {
        self.params.num_taxis = points.len();
        self.params.start_points = points.iter().map(|&p| NodeId::from(p)).collect();
        self
    }

    pub fn with_taxi_config(mut self, config: TaxiConfig) -> Self {
        self.params.taxi = config;
        self
    }

    pub fn with_dispatcher_config(mut self, config: DispatcherConfig) -> Self {
        self.params.dispatcher = config;
        self
    }

    pub fn with_fare_spawner(mut self, config: FareSpawnerConfig) -> Self {
        self.params.fares = config;
        self.params.spawn_fares = true;
        self
    }

    pub fn with_end_minute(mut self, minute: u64) -> Self {
        self.params.simulation_end_minute = Some(minute);
        self
    }

    /// Build the world and schedule the start event.
    pub fn build(self) -> World {
        let mut world = World::new();
        build_scenario_with_network(&mut world, &self.params, self.network)
            .expect("test scenario should build");
        initialize_simulation(&mut world);
        world
    }
}
