//! Adapter that lets the dispatcher reach taxis living in the ECS world.

use std::collections::BTreeMap;

use crate::error::DeliveryError;
use crate::messages::{FareMessage, FleetLink};
use crate::taxi::{Taxi, TaxiId, TaxiStatus};

/// Mutable borrow of every taxi for the span of one dispatcher call, keyed by
/// taxi number so iteration follows fleet order.
pub struct FleetRoster<'a> {
    now: u64,
    taxis: BTreeMap<TaxiId, &'a mut Taxi>,
}

impl<'a> FleetRoster<'a> {
    pub fn new(now: u64, taxis: impl IntoIterator<Item = &'a mut Taxi>) -> Self {
        Self {
            now,
            taxis: taxis.into_iter().map(|t| (t.number, t)).collect(),
        }
    }

    pub fn get(&self, taxi: TaxiId) -> Option<&Taxi> {
        self.taxis.get(&taxi).map(|t| &**t)
    }

    pub fn get_mut(&mut self, taxi: TaxiId) -> Option<&mut Taxi> {
        self.taxis.get_mut(&taxi).map(|t| &mut **t)
    }

    pub fn ids(&self) -> impl Iterator<Item = TaxiId> + '_ {
        self.taxis.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.taxis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taxis.is_empty()
    }
}

impl FleetLink for FleetRoster<'_> {
    fn status(&self, taxi: TaxiId) -> Option<TaxiStatus> {
        self.taxis.get(&taxi).map(|t| t.status())
    }

    fn deliver(&mut self, taxi: TaxiId, message: FareMessage) -> Result<(), DeliveryError> {
        let now = self.now;
        self.taxis
            .get_mut(&taxi)
            .ok_or(DeliveryError::UnknownTaxi(taxi))?
            .recv_msg(now, message)
    }
}
