//! Test helpers for common test setup and utilities.
//!
//! This module provides shared test utilities to reduce duplication across test files.

use bevy_ecs::prelude::World;

use crate::clock::SimulationClock;
use crate::dispatcher::{Dispatcher, DispatcherConfig};
use crate::ecs::{FareInbox, SimFault};
use crate::fare::{FareAnnouncement, WaitingFares};
use crate::network::{NodeId, RoadNetwork};
use crate::taxi::{Taxi, TaxiConfig, TaxiId};
use crate::telemetry::{SimSnapshotConfig, SimSnapshots, SimTelemetry};

/// Two diagonal streets, (0,0)-(5,5)-(10,10), seven minutes each at speed 1.
pub fn diagonal_network() -> RoadNetwork {
    let mut network = RoadNetwork::new(1.0);
    network.add_street(NodeId::new(0, 0), NodeId::new(5, 5));
    network.add_street(NodeId::new(5, 5), NodeId::new(10, 10));
    network
}

/// Announcement with coordinates written the way outside callers send them.
pub fn announcement(
    call_time: u64,
    origin: (i32, i32),
    destination: (i32, i32),
    price: f64,
    max_wait: u64,
) -> FareAnnouncement {
    FareAnnouncement {
        call_time: Some(call_time),
        origin: Some(format!("{},{}", origin.0, origin.1)),
        destination: Some(format!("{},{}", destination.0, destination.1)),
        price: Some(price),
        max_wait: Some(max_wait),
    }
}

/// A taxi already on duty at `at`.
///
/// # Panics
///
/// Panics if `at` is not a junction of `network`.
pub fn on_duty_taxi(number: u32, at: (i32, i32), network: &RoadNetwork) -> Taxi {
    let config = TaxiConfig {
        start_point: Some(at.into()),
        ..TaxiConfig::default()
    };
    let mut taxi =
        Taxi::new(TaxiId(number), config, network.export_map()).expect("start point on network");
    taxi.come_on_duty(0);
    taxi
}

/// Create a basic test world with essential resources and no taxis.
///
/// This is a convenience function for tests that need a minimal world setup.
/// For more complex scenarios, use the full `build_scenario` function.
pub fn create_test_world(network: RoadNetwork) -> World {
    let mut world = World::new();
    world.insert_resource(network);
    world.insert_resource(SimulationClock::default());
    world.insert_resource(Dispatcher::new(DispatcherConfig::default()));
    world.insert_resource(WaitingFares::default());
    world.insert_resource(FareInbox::default());
    world.insert_resource(SimFault::default());
    world.insert_resource(SimTelemetry::default());
    world.insert_resource(SimSnapshotConfig::default());
    world.insert_resource(SimSnapshots::default());
    world
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::TravelTimes;

    #[test]
    fn diagonal_streets_take_seven_minutes() {
        let network = diagonal_network();
        assert_eq!(network.travel_time(NodeId::new(0, 0), NodeId::new(5, 5)), Some(7));
        assert_eq!(network.travel_time(NodeId::new(0, 0), NodeId::new(10, 10)), Some(14));
    }

    #[test]
    fn announcement_validates_on_the_diagonal() {
        let network = diagonal_network();
        let request = announcement(3, (5, 5), (10, 10), 50.0, 60)
            .validate(&network)
            .expect("valid");
        assert_eq!(request.origin, NodeId::new(5, 5));
        assert_eq!(request.call_time, 3);
    }
}
