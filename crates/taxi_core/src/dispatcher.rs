//! Dispatcher: owns the fare board, collects bids and runs a per-origin
//! auction that scores bidders by ETA plus a fairness penalty.
//!
//! Every operation that talks to taxis takes a [FleetLink]; nothing here holds
//! a reference to a taxi. The board and bid registry are ordered maps so the
//! auction outcome depends only on the sequence of calls.

mod auction;
mod fairness;

use std::collections::{BTreeMap, BTreeSet};

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::fare::{Fare, FareKey, FareRequest, FareState};
use crate::messages::{FareMessage, FleetLink};
use crate::network::{NodeId, TravelTimes};
use crate::taxi::TaxiId;

pub use fairness::FairnessHistory;

/// Tunables for the auction and revenue accounting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Dispatcher's cut of each completed fare.
    pub revenue_share: f64,
    /// Trailing window (minutes) in which past allocations count against a taxi.
    pub fairness_window_minutes: u64,
    /// Score added per allocation inside the window.
    pub penalty_per_allocation: f64,
    /// Score removed for a taxi whose balance is negative.
    pub negative_balance_boost: f64,
    /// Allocation timestamps kept per taxi.
    pub history_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            revenue_share: 1.0 / 9.0,
            fairness_window_minutes: 180,
            penalty_per_allocation: 2.0,
            negative_balance_boost: 1.0,
            history_capacity: 64,
        }
    }
}

#[derive(Debug, Resource)]
pub struct Dispatcher {
    config: DispatcherConfig,
    taxis: BTreeSet<TaxiId>,
    board: BTreeMap<FareKey, Fare>,
    /// Bidders per origin, in arrival order.
    bids: BTreeMap<NodeId, Vec<TaxiId>>,
    fairness: FairnessHistory,
    revenue: f64,
    now: u64,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            fairness: FairnessHistory::with_capacity(config.history_capacity),
            config,
            taxis: BTreeSet::new(),
            board: BTreeMap::new(),
            bids: BTreeMap::new(),
            revenue: 0.0,
            now: 0,
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn add_taxi(&mut self, taxi: TaxiId) {
        self.taxis.insert(taxi);
    }

    pub fn remove_taxi(&mut self, taxi: TaxiId) {
        self.taxis.remove(&taxi);
        for bidders in self.bids.values_mut() {
            bidders.retain(|t| *t != taxi);
        }
    }

    pub fn taxis(&self) -> impl Iterator<Item = TaxiId> + '_ {
        self.taxis.iter().copied()
    }

    /// Per-minute hook from the coordinator; keeps the fairness clock in step.
    pub fn clock_tick(&mut self, now: u64) {
        self.now = now;
        self.fairness
            .prune(now, self.config.fairness_window_minutes);
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    /// Posts a fare and advises every known taxi. Returns `false` (and sends
    /// nothing) when the key is already on the board.
    pub fn announce_fare(&mut self, request: &FareRequest, fleet: &mut dyn FleetLink) -> bool {
        let key = request.key();
        if self.board.contains_key(&key) {
            return false;
        }
        let fare = Fare::new(key, request.price, request.max_wait);
        let advice = FareMessage::FareAdvice {
            origin: key.origin,
            destination: key.destination,
            price: fare.advertised_price(),
        };
        self.board.insert(key, fare);
        self.broadcast(advice, fleet);
        tracing::debug!(fare = %key, "fare announced");
        true
    }

    /// Records `taxi` as a bidder at `origin` and runs that origin's auction.
    pub fn receive_bid(
        &mut self,
        origin: NodeId,
        taxi: TaxiId,
        fleet: &mut dyn FleetLink,
        network: &dyn TravelTimes,
    ) -> Option<(FareKey, TaxiId)> {
        let bidders = self.bids.entry(origin).or_default();
        if !bidders.contains(&taxi) {
            bidders.push(taxi);
        }
        for fare in self.fares_at_mut(origin) {
            if fare.state == FareState::Posted {
                fare.state = FareState::BidOpen;
            }
        }
        tracing::debug!(%taxi, %origin, "bid received");
        self.allocate(origin, fleet, network)
    }

    /// Tells every taxi to drop offers at `origin`, then forgets every fare and
    /// bid there. Returns the fares removed.
    pub fn notify_fare_cancelled(
        &mut self,
        origin: NodeId,
        fleet: &mut dyn FleetLink,
    ) -> Vec<Fare> {
        self.broadcast(
            FareMessage::FareCancel {
                origin,
                destination: None,
            },
            fleet,
        );
        let mut removed = self.purge_origin(origin);
        for fare in &mut removed {
            fare.state = FareState::Cancelled;
        }
        removed
    }

    /// Removes one fare whose wait ran out, leaving other fares at the same
    /// origin on the board.
    pub fn expire_fare(&mut self, key: FareKey, fleet: &mut dyn FleetLink) -> Option<Fare> {
        let mut fare = self.board.remove(&key)?;
        fare.state = FareState::Expired;
        if self.fares_at(key.origin).next().is_none() {
            self.bids.remove(&key.origin);
        }
        self.broadcast(
            FareMessage::FareCancel {
                origin: key.origin,
                destination: Some(key.destination),
            },
            fleet,
        );
        tracing::debug!(fare = %key, "fare expired");
        Some(fare)
    }

    pub fn mark_picked_up(&mut self, origin: NodeId, destination: NodeId, taxi: TaxiId) {
        if let Some(fare) = self
            .board
            .values_mut()
            .find(|f| {
                f.key.origin == origin
                    && f.key.destination == destination
                    && f.allocated_to == Some(taxi)
            })
        {
            fare.state = FareState::PickedUp;
        }
    }

    /// Books the dispatcher's share of a paid fare, counts it against the
    /// taxi's fairness window, forwards the payment and clears that one fare
    /// along with the bids at its origin. Returns the cleared fare, if it was
    /// still on the board.
    pub fn notify_fare_completed(
        &mut self,
        taxi: TaxiId,
        key: FareKey,
        amount: f64,
        fleet: &mut dyn FleetLink,
    ) -> Option<Fare> {
        let share = amount.max(0.0) * self.config.revenue_share;
        if share.is_finite() {
            self.revenue += share;
        }
        self.fairness.record(taxi, self.now);
        let payment = FareMessage::FarePay {
            amount,
            origin: key.origin,
            destination: key.destination,
        };
        if let Err(error) = fleet.deliver(taxi, payment) {
            tracing::warn!(%taxi, %error, "payment notice not delivered");
        }
        self.bids.remove(&key.origin);
        let completed = self.board.remove(&key).map(|mut fare| {
            fare.state = FareState::Completed;
            fare
        });
        if completed.is_none() {
            tracing::warn!(%taxi, fare = %key, "completed fare was not on the board");
        }
        tracing::debug!(%taxi, fare = %key, amount, share, "fare completed");
        completed
    }

    pub fn revenue(&self) -> f64 {
        self.revenue
    }

    pub fn fare(&self, key: &FareKey) -> Option<&Fare> {
        self.board.get(key)
    }

    pub fn fares(&self) -> impl Iterator<Item = &Fare> {
        self.board.values()
    }

    pub fn board_len(&self) -> usize {
        self.board.len()
    }

    /// Fares still waiting for an allocation.
    pub fn open_fares(&self) -> usize {
        self.board
            .values()
            .filter(|f| f.allocated_to.is_none())
            .count()
    }

    pub fn bidders(&self, origin: NodeId) -> &[TaxiId] {
        self.bids.get(&origin).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_bids_at(&self, origin: NodeId) -> bool {
        self.bids.contains_key(&origin)
    }

    /// Allocations inside the fairness window ending now.
    pub fn recent_allocations(&self, taxi: TaxiId) -> usize {
        self.fairness
            .count_within(taxi, self.now, self.config.fairness_window_minutes)
    }

    fn broadcast(&self, message: FareMessage, fleet: &mut dyn FleetLink) {
        for taxi in &self.taxis {
            if let Err(error) = fleet.deliver(*taxi, message) {
                tracing::trace!(%taxi, %error, "broadcast skipped");
            }
        }
    }

    fn fares_at(&self, origin: NodeId) -> impl Iterator<Item = &Fare> {
        self.board.values().filter(move |f| f.key.origin == origin)
    }

    fn fares_at_mut(&mut self, origin: NodeId) -> impl Iterator<Item = &mut Fare> {
        self.board
            .values_mut()
            .filter(move |f| f.key.origin == origin)
    }

    fn purge_origin(&mut self, origin: NodeId) -> Vec<Fare> {
        let keys: Vec<FareKey> = self.fares_at(origin).map(|f| f.key).collect();
        self.bids.remove(&origin);
        keys.iter().filter_map(|k| self.board.remove(k)).collect()
    }
}
