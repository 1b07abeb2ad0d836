//! Scenario setup: road grid, fleet and every simulation resource.
//!
//! Parameters are plain serde structs so experiment runs can be described
//! in JSON and reproduced from their seed.

mod build;
mod params;

pub use build::{build_scenario, build_scenario_with_network, retire_taxi, spawn_taxi};
pub use params::{GridConfig, ScenarioParams, SimulationEndMinute};
