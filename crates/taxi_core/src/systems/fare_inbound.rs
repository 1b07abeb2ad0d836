//! Fare intake: withdrawn fares, announcements from the inbox and fares
//! from the spawner reach the dispatcher at the start of each tick.

use bevy_ecs::prelude::{Mut, Query, Res, ResMut};

use crate::clock::SimulationClock;
use crate::dispatcher::Dispatcher;
use crate::ecs::FareInbox;
use crate::fare::{FareRequest, WaitingFares};
use crate::fleet::FleetRoster;
use crate::network::RoadNetwork;
use crate::spawner::FareSpawner;
use crate::taxi::Taxi;
use crate::telemetry::SimTelemetry;

#[allow(clippy::too_many_arguments)]
pub fn fare_inbound_system(
    clock: Res<SimulationClock>,
    network: Res<RoadNetwork>,
    mut inbox: ResMut<FareInbox>,
    spawner: Option<ResMut<FareSpawner>>,
    mut dispatcher: ResMut<Dispatcher>,
    mut kerbside: ResMut<WaitingFares>,
    mut telemetry: ResMut<SimTelemetry>,
    mut taxis: Query<&mut Taxi>,
) {
    let now = clock.now();
    let mut roster = FleetRoster::new(now, taxis.iter_mut().map(Mut::into_inner));

    while let Some(origin) = inbox.cancellations.pop_front() {
        let removed = dispatcher.notify_fare_cancelled(origin, &mut roster);
        kerbside.remove_origin(origin);
        telemetry.cancelled += removed.len() as u64;
        tracing::debug!(%origin, fares = removed.len(), "fares withdrawn");
    }

    let mut requests: Vec<FareRequest> = Vec::new();
    while let Some(announcement) = inbox.announcements.pop_front() {
        match announcement.validate(&*network) {
            Ok(request) => requests.push(request),
            Err(reason) => {
                telemetry.rejected += 1;
                tracing::warn!(?announcement, %reason, "fare announcement rejected");
            }
        }
    }
    if let Some(mut spawner) = spawner {
        requests.extend(spawner.spawn_due(now, &network));
    }

    for request in &requests {
        if dispatcher.announce_fare(request, &mut roster) {
            kerbside.add(request);
            telemetry.announced += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use bevy_ecs::prelude::{Schedule, World};

    use super::*;
    use crate::dispatcher::DispatcherConfig;
    use crate::fare::{FareAnnouncement, FareKey};
    use crate::network::NodeId;
    use crate::taxi::{TaxiConfig, TaxiId};

    fn world() -> World {
        let network = RoadNetwork::grid(20, 20, 5, 1.0);
        let mut taxi = Taxi::new(TaxiId(1), TaxiConfig::default(), network.export_map()).expect("taxi");
        assert!(taxi.come_on_duty(0));
        let mut dispatcher = Dispatcher::new(DispatcherConfig::default());
        dispatcher.add_taxi(TaxiId(1));

        let mut world = World::new();
        world.spawn(taxi);
        world.insert_resource(network);
        world.insert_resource(SimulationClock::default());
        world.insert_resource(FareInbox::default());
        world.insert_resource(dispatcher);
        world.insert_resource(WaitingFares::default());
        world.insert_resource(SimTelemetry::default());
        world
    }

    fn run(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(fare_inbound_system);
        schedule.run(world);
    }

    fn announcement(origin: &str, destination: &str) -> FareAnnouncement {
        FareAnnouncement {
            call_time: Some(0),
            origin: Some(origin.to_string()),
            destination: Some(destination.to_string()),
            price: Some(30.0),
            max_wait: Some(20),
        }
    }

    #[test]
    fn valid_announcement_is_posted_and_advised() {
        let mut world = world();
        world.resource_mut::<FareInbox>().push(announcement("5,5", "15,15"));
        world.resource_mut::<FareInbox>().push(announcement("5,5", "99,99"));
        world.resource_mut::<FareInbox>().push(FareAnnouncement::default());
        run(&mut world);

        let key = FareKey {
            call_time: 0,
            origin: NodeId::new(5, 5),
            destination: NodeId::new(15, 15),
        };
        assert!(world.resource::<Dispatcher>().fare(&key).is_some());
        assert!(world.resource::<WaitingFares>().is_waiting(&key));
        let telemetry = world.resource::<SimTelemetry>();
        assert_eq!(telemetry.announced, 1);
        assert_eq!(telemetry.rejected, 2);
        assert_eq!(world.query::<&Taxi>().single(&world).offers.len(), 1);
        assert!(world.resource::<FareInbox>().is_empty());
    }

    #[test]
    fn cancellation_clears_board_kerb_and_offers() {
        let mut world = world();
        world.resource_mut::<FareInbox>().push(announcement("5,5", "15,15"));
        run(&mut world);

        world.resource_mut::<FareInbox>().cancel(NodeId::new(5, 5));
        run(&mut world);

        assert_eq!(world.resource::<Dispatcher>().board_len(), 0);
        assert!(world.resource::<WaitingFares>().is_empty());
        assert_eq!(world.resource::<SimTelemetry>().cancelled, 1);
        assert!(world.query::<&Taxi>().single(&world).offers.is_empty());
    }
}
