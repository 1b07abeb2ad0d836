//! Expiry: fares nobody collected within their wait are withdrawn from the
//! board, the kerb and every taxi's offers.

use bevy_ecs::prelude::{Mut, Query, Res, ResMut};

use crate::clock::SimulationClock;
use crate::dispatcher::Dispatcher;
use crate::fare::{FareKey, FareState, WaitingFares};
use crate::fleet::FleetRoster;
use crate::taxi::Taxi;
use crate::telemetry::SimTelemetry;

pub fn fare_expiry_system(
    clock: Res<SimulationClock>,
    mut dispatcher: ResMut<Dispatcher>,
    mut kerbside: ResMut<WaitingFares>,
    mut telemetry: ResMut<SimTelemetry>,
    mut taxis: Query<&mut Taxi>,
) {
    let now = clock.now();
    let stale: Vec<FareKey> = dispatcher
        .fares()
        .filter(|fare| fare.state != FareState::PickedUp && fare.is_expired_at(now))
        .map(|fare| fare.key)
        .collect();
    if stale.is_empty() {
        return;
    }

    let mut roster = FleetRoster::new(now, taxis.iter_mut().map(Mut::into_inner));
    for key in stale {
        if dispatcher.expire_fare(key, &mut roster).is_some() {
            kerbside.remove(&key);
            telemetry.expired += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use bevy_ecs::prelude::{Schedule, World};

    use super::*;
    use crate::clock::EventKind;
    use crate::dispatcher::DispatcherConfig;
    use crate::fare::FareRequest;
    use crate::network::{NodeId, RoadNetwork};
    use crate::taxi::{TaxiConfig, TaxiId};

    fn run_at(world: &mut World, minute: u64) {
        {
            let mut clock = world.resource_mut::<SimulationClock>();
            clock.schedule_at(minute, EventKind::Tick);
            clock.pop_next();
        }
        let mut schedule = Schedule::default();
        schedule.add_systems(fare_expiry_system);
        schedule.run(world);
    }

    #[test]
    fn fare_is_withdrawn_once_its_wait_is_over() {
        let network = RoadNetwork::grid(20, 20, 5, 1.0);
        let mut taxi = Taxi::new(TaxiId(1), TaxiConfig::default(), network.export_map()).expect("taxi");
        assert!(taxi.come_on_duty(0));
        let request = FareRequest {
            call_time: 0,
            origin: NodeId::new(15, 15),
            destination: NodeId::new(0, 15),
            price: Some(20.0),
            max_wait: 5,
        };
        let mut dispatcher = Dispatcher::new(DispatcherConfig::default());
        dispatcher.add_taxi(TaxiId(1));
        let mut kerbside = WaitingFares::default();
        kerbside.add(&request);
        {
            let mut roster = FleetRoster::new(0, [&mut taxi]);
            assert!(dispatcher.announce_fare(&request, &mut roster));
        }
        assert_eq!(taxi.offers.len(), 1);

        let mut world = World::new();
        world.spawn(taxi);
        world.insert_resource(SimulationClock::default());
        world.insert_resource(dispatcher);
        world.insert_resource(kerbside);
        world.insert_resource(SimTelemetry::default());

        run_at(&mut world, 5);
        assert_eq!(world.resource::<Dispatcher>().board_len(), 1);

        run_at(&mut world, 6);
        assert_eq!(world.resource::<Dispatcher>().board_len(), 0);
        assert!(world.resource::<WaitingFares>().is_empty());
        assert_eq!(world.resource::<SimTelemetry>().expired, 1);
        assert!(world.query::<&Taxi>().single(&world).offers.is_empty());
    }
}
