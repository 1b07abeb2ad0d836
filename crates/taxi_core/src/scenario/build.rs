use bevy_ecs::prelude::{Entity, World};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::clock::SimulationClock;
use crate::dispatcher::Dispatcher;
use crate::ecs::{FareInbox, SimFault};
use crate::error::SimError;
use crate::fare::WaitingFares;
use crate::network::RoadNetwork;
use crate::scenario::params::{ScenarioParams, SimulationEndMinute};
use crate::spawner::FareSpawner;
use crate::taxi::{Taxi, TaxiConfig, TaxiId};
use crate::telemetry::{SimSnapshotConfig, SimSnapshots, SimTelemetry};

/// Builds the grid from `params` and inserts every resource the simulation
/// needs, then spawns `params.num_taxis` taxis numbered from 1.
pub fn build_scenario(world: &mut World, params: &ScenarioParams) -> Result<(), SimError> {
    let grid = params.grid;
    let mut network = RoadNetwork::grid(grid.width, grid.height, grid.spacing, grid.speed);
    if grid.closed_street_fraction > 0.0 {
        let mut rng = StdRng::seed_from_u64(params.street_seed());
        network.close_streets(&mut rng, grid.closed_street_fraction);
    }
    build_scenario_with_network(world, params, network)
}

/// Same as [build_scenario] on a hand-built network. Grid settings in
/// `params` are ignored.
pub fn build_scenario_with_network(
    world: &mut World,
    params: &ScenarioParams,
    network: RoadNetwork,
) -> Result<(), SimError> {
    if network.is_empty() {
        return Err(SimError::Setup("road network has no junctions".to_string()));
    }

    world.insert_resource(network);
    world.insert_resource(SimulationClock::default());
    world.insert_resource(SimulationEndMinute(params.end_minute()));
    world.insert_resource(params.dispatcher);
    world.insert_resource(Dispatcher::new(params.dispatcher));
    world.insert_resource(WaitingFares::default());
    world.insert_resource(FareInbox::default());
    world.insert_resource(SimFault::default());
    world.insert_resource(SimTelemetry::default());
    world.insert_resource(SimSnapshotConfig {
        interval_minutes: params.snapshot_interval_minutes.max(1),
        ..SimSnapshotConfig::default()
    });
    world.insert_resource(SimSnapshots::default());
    if params.spawn_fares {
        world.insert_resource(FareSpawner::new(params.fares.clone(), params.fare_seed()));
    } else {
        world.remove_resource::<FareSpawner>();
    }

    for index in 0..params.num_taxis {
        let mut config = params.taxi;
        if let Some(point) = params.start_points.get(index) {
            config.start_point = Some(*point);
        }
        spawn_taxi(world, TaxiId(index as u32 + 1), config)?;
    }

    tracing::debug!(
        taxis = params.num_taxis,
        end_minute = params.end_minute(),
        seed = params.seed,
        "scenario built"
    );
    Ok(())
}

/// Spawns one off-duty taxi holding a copy of the network map and registers
/// it with the dispatcher.
pub fn spawn_taxi(world: &mut World, number: TaxiId, config: TaxiConfig) -> Result<Entity, SimError> {
    let map = world
        .get_resource::<RoadNetwork>()
        .ok_or_else(|| SimError::Setup("road network must be inserted before taxis".to_string()))?
        .export_map();
    let taxi = Taxi::new(number, config, map)?;
    let entity = world.spawn(taxi).id();
    if let Some(mut dispatcher) = world.get_resource_mut::<Dispatcher>() {
        dispatcher.add_taxi(number);
    }
    Ok(entity)
}

/// Removes a taxi from the fleet. A taxi carrying a passenger stays until the
/// ride is over; returns whether the taxi was removed.
pub fn retire_taxi(world: &mut World, number: TaxiId) -> bool {
    let mut query = world.query::<(Entity, &Taxi)>();
    let found = query
        .iter(world)
        .find(|(_, taxi)| taxi.number == number)
        .map(|(entity, taxi)| (entity, taxi.passenger.is_some()));
    let Some((entity, carrying)) = found else {
        return false;
    };
    if carrying {
        return false;
    }
    world.despawn(entity);
    if let Some(mut dispatcher) = world.get_resource_mut::<Dispatcher>() {
        dispatcher.remove_taxi(number);
    }
    tracing::debug!(taxi = %number, "retired");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NodeId;

    #[test]
    fn builds_grid_and_numbered_taxis() {
        let mut world = World::new();
        let params = ScenarioParams::default()
            .with_grid(20, 20, 5)
            .with_taxis(3)
            .with_start_points(vec![NodeId::new(10, 10)]);
        build_scenario(&mut world, &params).expect("scenario");

        assert_eq!(world.resource::<RoadNetwork>().len(), 16);
        let mut taxis: Vec<(TaxiId, Option<NodeId>)> = world
            .query::<&Taxi>()
            .iter(&world)
            .map(|t| (t.number, t.config.start_point))
            .collect();
        taxis.sort();
        assert_eq!(
            taxis,
            vec![
                (TaxiId(1), Some(NodeId::new(10, 10))),
                (TaxiId(2), Some(NodeId::new(0, 0))),
                (TaxiId(3), Some(NodeId::new(0, 0))),
            ]
        );
        assert_eq!(world.resource::<Dispatcher>().taxis().count(), 3);
        assert!(world.get_resource::<FareSpawner>().is_some());
    }

    #[test]
    fn unknown_start_point_is_a_setup_error() {
        let mut world = World::new();
        let params = ScenarioParams::default()
            .with_grid(10, 10, 5)
            .with_taxis(1)
            .with_start_points(vec![NodeId::new(3, 3)]);
        let err = build_scenario(&mut world, &params).expect_err("bad start");
        assert!(matches!(err, SimError::UnknownNode(n) if n == NodeId::new(3, 3)));
    }

    #[test]
    fn retire_removes_taxi_from_world_and_registry() {
        let mut world = World::new();
        let params = ScenarioParams::default().with_grid(10, 10, 5).with_taxis(2);
        build_scenario(&mut world, &params).expect("scenario");

        assert!(retire_taxi(&mut world, TaxiId(2)));
        assert!(!retire_taxi(&mut world, TaxiId(2)));
        assert_eq!(world.query::<&Taxi>().iter(&world).count(), 1);
        assert_eq!(
            world.resource::<Dispatcher>().taxis().collect::<Vec<_>>(),
            vec![TaxiId(1)]
        );
    }
}
