//! Per-minute taxi decisions and the dispatcher's reaction to them.
//!
//! Every taxi ticks first, in taxi-number order. Pickups, drop-offs and bids
//! are then applied to the dispatcher in the same order, so an allocation
//! decided for taxi 3 is visible before taxi 4's bid is auctioned.

use bevy_ecs::prelude::{Mut, Query, Res, ResMut};

use crate::clock::SimulationClock;
use crate::dispatcher::Dispatcher;
use crate::fare::WaitingFares;
use crate::fleet::FleetRoster;
use crate::network::RoadNetwork;
use crate::taxi::{Taxi, TaxiId, TickReport};
use crate::telemetry::SimTelemetry;

pub fn taxi_tick_system(
    clock: Res<SimulationClock>,
    network: Res<RoadNetwork>,
    mut dispatcher: ResMut<Dispatcher>,
    mut kerbside: ResMut<WaitingFares>,
    mut telemetry: ResMut<SimTelemetry>,
    mut taxis: Query<&mut Taxi>,
) {
    let now = clock.now();
    let mut fleet: Vec<Mut<Taxi>> = taxis.iter_mut().collect();
    fleet.sort_by_key(|taxi| taxi.number);

    let reports: Vec<(TaxiId, TickReport)> = fleet
        .iter_mut()
        .map(|taxi| {
            let report = taxi.clock_tick(now, &*network, &mut kerbside);
            (taxi.number, report)
        })
        .collect();

    let mut roster = FleetRoster::new(now, fleet.into_iter().map(Mut::into_inner));
    for (number, report) in reports {
        if let Some(key) = report.picked_up {
            dispatcher.mark_picked_up(key.origin, key.destination, number);
            telemetry.record_pickup(key, now);
        }
        if let Some(passenger) = report.completed {
            let key = passenger.key;
            dispatcher.notify_fare_completed(number, key, passenger.price, &mut roster);
            telemetry.record_completion(number, key, passenger.price, now);
        }
        for origin in report.bids {
            if let Some((key, winner)) = dispatcher.receive_bid(origin, number, &mut roster, &*network) {
                kerbside.allocate(&key, winner);
                telemetry.allocated += 1;
            }
        }
    }
}
