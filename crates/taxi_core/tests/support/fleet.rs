#![allow(dead_code)]

use bevy_ecs::prelude::World;
use taxi_core::ecs::FareInbox;
use taxi_core::network::NodeId;
use taxi_core::taxi::{Taxi, TaxiId};
use taxi_core::test_helpers::announcement;

/// Copy of the taxi with the given number.
pub fn taxi(world: &mut World, number: u32) -> Taxi {
    world
        .query::<&Taxi>()
        .iter(world)
        .find(|t| t.number == TaxiId(number))
        .cloned()
        .expect("taxi in world")
}

/// Every taxi, in number order.
pub fn fleet(world: &mut World) -> Vec<Taxi> {
    let mut taxis: Vec<Taxi> = world.query::<&Taxi>().iter(world).cloned().collect();
    taxis.sort_by_key(|t| t.number);
    taxis
}

pub fn with_taxi_mut<R>(world: &mut World, number: u32, f: impl FnOnce(&mut Taxi) -> R) -> R {
    let mut query = world.query::<&mut Taxi>();
    let taxi = query
        .iter_mut(world)
        .find(|t| t.number == TaxiId(number))
        .expect("taxi in world");
    f(taxi.into_inner())
}

/// Queue an announcement for the next tick.
pub fn call_fare(
    world: &mut World,
    call_time: u64,
    origin: (i32, i32),
    destination: (i32, i32),
    price: f64,
    max_wait: u64,
) {
    world
        .resource_mut::<FareInbox>()
        .push(announcement(call_time, origin, destination, price, max_wait));
}

pub fn withdraw_fares(world: &mut World, origin: (i32, i32)) {
    world.resource_mut::<FareInbox>().cancel(NodeId::from(origin));
}
