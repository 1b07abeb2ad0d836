//! Taxi agent: duty cycle, offer handling, path following.
//!
//! A taxi only ever holds node identifiers. It plans over its own copy of the
//! map ([LocalMap]) and asks the road network for travel times when bidding
//! and for street minutes when driving.

mod bidding;
mod offers;
pub mod routing;

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use bevy_ecs::prelude::Component;
use serde::{Deserialize, Serialize};

use crate::clock::MINUTES_PER_DAY;
use crate::error::{DeliveryError, SimError};
use crate::fare::{FareKey, Passenger, WaitingFares};
use crate::messages::FareMessage;
use crate::network::{LocalMap, NodeId, RoadNetwork, TravelTimes};

pub use bidding::DeclineReason;
pub use offers::{BidDecision, Offer, OfferBook};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TaxiId(pub u32);

impl fmt::Display for TaxiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the dispatcher may read about a taxi.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxiStatus {
    pub location: Option<NodeId>,
    pub balance: i64,
    pub on_duty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxiState {
    OffDuty,
    Idle,
    EnRouteToPickup,
    Carrying,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxiConfig {
    /// Balance granted on coming on duty with an empty account.
    pub idle_loss: i64,
    /// Minutes after the advice beyond which an offer is dropped.
    pub max_wait: u64,
    pub safety_margin: f64,
    /// Running cost per driven minute used in the profit estimate.
    pub cost_per_minute: f64,
    /// Minute of day the shift may start.
    pub on_duty_time: u64,
    /// Minute of day the shift ends; `None` for no fixed end.
    pub off_duty_time: Option<u64>,
    pub start_point: Option<NodeId>,
}

impl Default for TaxiConfig {
    fn default() -> Self {
        Self {
            idle_loss: 256,
            max_wait: 90,
            safety_margin: 5.0,
            cost_per_minute: 1.0,
            on_duty_time: 0,
            off_duty_time: None,
            start_point: None,
        }
    }
}

impl TaxiConfig {
    pub fn in_window(&self, minute_of_day: u64) -> bool {
        let minute = minute_of_day % MINUTES_PER_DAY;
        minute >= self.on_duty_time && self.off_duty_time.map_or(true, |off| minute < off)
    }
}

/// A street currently being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leg {
    pub to: NodeId,
    pub remaining: u64,
}

/// Things a tick produced that the dispatcher needs to hear about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub bids: Vec<NodeId>,
    pub picked_up: Option<FareKey>,
    pub completed: Option<Passenger>,
    pub went_off_duty: bool,
}

#[derive(Debug, Clone, Component)]
pub struct Taxi {
    pub number: TaxiId,
    pub on_duty: bool,
    pub account: i64,
    pub location: Option<NodeId>,
    pub path: VecDeque<NodeId>,
    pub transit: Option<Leg>,
    pub passenger: Option<Passenger>,
    pub map: LocalMap,
    pub offers: OfferBook,
    pub config: TaxiConfig,
    /// Set at each shift start; a taxi comes on duty at most once per shift.
    pub shift_open: bool,
}

impl Taxi {
    /// Builds an off-duty taxi. Without a configured start point the first
    /// junction on the west edge of `map` is used.
    pub fn new(number: TaxiId, mut config: TaxiConfig, map: LocalMap) -> Result<Self, SimError> {
        let start = match config.start_point {
            Some(point) if map.contains(point) => point,
            Some(point) => return Err(SimError::UnknownNode(point)),
            None => map.nodes().next().ok_or_else(|| {
                SimError::Setup(format!("taxi {number} has an empty map: nowhere to start"))
            })?,
        };
        config.start_point = Some(start);
        Ok(Self {
            number,
            on_duty: false,
            account: 0,
            location: None,
            path: VecDeque::new(),
            transit: None,
            passenger: None,
            map,
            offers: OfferBook::default(),
            config,
            shift_open: true,
        })
    }

    pub fn status(&self) -> TaxiStatus {
        TaxiStatus {
            location: self.location,
            balance: self.account,
            on_duty: self.on_duty,
        }
    }

    pub fn state(&self) -> TaxiState {
        if !self.on_duty {
            TaxiState::OffDuty
        } else if self.passenger.is_some() {
            TaxiState::Carrying
        } else if self.offers.has_allocation() {
            TaxiState::EnRouteToPickup
        } else {
            TaxiState::Idle
        }
    }

    /// Starts a shift if the taxi is free to: off duty, shift not yet used,
    /// inside its duty window. Places the taxi at its start point.
    pub fn come_on_duty(&mut self, minute_of_day: u64) -> bool {
        if self.on_duty || !self.shift_open || !self.config.in_window(minute_of_day) {
            return false;
        }
        if self.account <= 0 {
            self.account = self.config.idle_loss;
        }
        self.on_duty = true;
        self.shift_open = false;
        self.location = self.config.start_point;
        tracing::debug!(taxi = %self.number, balance = self.account, "on duty");
        true
    }

    pub fn go_off_duty(&mut self) {
        self.on_duty = false;
        self.location = None;
        self.path.clear();
        self.transit = None;
        self.offers.clear();
        tracing::debug!(taxi = %self.number, balance = self.account, "off duty");
    }

    /// One simulated minute of decision making.
    pub fn clock_tick(
        &mut self,
        now: u64,
        network: &dyn TravelTimes,
        kerbside: &mut WaitingFares,
    ) -> TickReport {
        let mut report = TickReport::default();
        if !self.on_duty {
            return report;
        }
        if self.account <= 0 && self.passenger.is_none() {
            self.go_off_duty();
            report.went_off_duty = true;
            return report;
        }

        if self.path.is_empty() && self.transit.is_none() {
            if let Some(passenger) = self.passenger {
                if self.location == Some(passenger.destination()) {
                    self.passenger = None;
                    report.completed = Some(passenger);
                    tracing::debug!(taxi = %self.number, fare = %passenger.key, "dropped off");
                } else if let Some(here) = self.location {
                    self.path = self.plan_path(here, passenger.destination());
                }
            }
        }

        for key in self.offers.keys() {
            let Some(offer) = self.offers.get(&key).copied() else {
                continue;
            };
            let idle = self.path.is_empty() && self.transit.is_none();
            if offer.allocated && self.passenger.is_none() && idle {
                let Some(here) = self.location else { continue };
                if here == key.origin {
                    if let Some(passenger) = kerbside.pickup(key.origin, key.destination, self.number) {
                        self.passenger = Some(passenger);
                        self.path = self.plan_path(here, passenger.destination());
                        report.picked_up = Some(passenger.key);
                        tracing::debug!(taxi = %self.number, fare = %passenger.key, "picked up");
                    }
                    self.offers.remove(&key);
                } else {
                    self.path = self.plan_path(here, key.origin);
                }
            } else if now.saturating_sub(key.call_time) > self.config.max_wait {
                self.offers.remove(&key);
            } else if offer.decision == BidDecision::Undecided {
                let decision = match self.evaluate_offer(now, &key, offer.price, network) {
                    Ok(()) => {
                        report.bids.push(key.origin);
                        BidDecision::Bid
                    }
                    Err(reason) => {
                        tracing::trace!(taxi = %self.number, fare = %key, ?reason, "declined");
                        BidDecision::Declined
                    }
                };
                if let Some(offer) = self.offers.get_mut(&key) {
                    offer.decision = decision;
                }
            }
        }

        self.account -= 1;
        report
    }

    /// Advances along the planned path by one minute. Returns `true` when the
    /// taxi reached a junction this minute.
    ///
    /// Starting a street uses up the current minute; a street of `n` minutes
    /// is finished on the `n`-th call.
    pub fn drive(&mut self, network: &RoadNetwork) -> Result<bool, SimError> {
        if !self.on_duty {
            return Ok(false);
        }
        let Some(here) = self.location else {
            return Ok(false);
        };

        if let Some(mut leg) = self.transit.take() {
            if leg.remaining > 1 {
                leg.remaining -= 1;
                self.transit = Some(leg);
                return Ok(false);
            }
            self.arrive(leg.to);
            return Ok(true);
        }

        if self.path.front() == Some(&here) {
            self.path.pop_front();
        }
        let Some(&next) = self.path.front() else {
            return Ok(false);
        };
        if !self.map.contains(here) {
            return Err(SimError::FellOffMap {
                taxi: self.number,
                node: here,
            });
        }
        if self.map.segment(here, next).is_none() {
            return Err(SimError::NoRoadSegment {
                taxi: self.number,
                from: here,
                to: next,
            });
        }
        let minutes = network
            .segment_minutes(here, next)
            .ok_or(SimError::NoRoadSegment {
                taxi: self.number,
                from: here,
                to: next,
            })?;
        if minutes <= 1 {
            self.arrive(next);
            return Ok(true);
        }
        self.transit = Some(Leg {
            to: next,
            remaining: minutes - 1,
        });
        Ok(false)
    }

    fn arrive(&mut self, node: NodeId) {
        self.location = Some(node);
        if self.path.front() == Some(&node) {
            self.path.pop_front();
        }
    }

    /// Handles one inbound message. Only allocations can be refused.
    pub fn recv_msg(&mut self, now: u64, message: FareMessage) -> Result<(), DeliveryError> {
        match message {
            FareMessage::FareAdvice {
                origin,
                destination,
                price,
            } => {
                if self.on_duty {
                    self.offers.advise(now, origin, destination, price);
                }
                Ok(())
            }
            FareMessage::FareAlloc {
                origin,
                destination,
            } => {
                if !self.on_duty {
                    return Err(DeliveryError::OffDuty(self.number));
                }
                if self.passenger.is_some() || self.offers.has_allocation() {
                    return Err(DeliveryError::AlreadyBooked(self.number));
                }
                if !self.offers.allocate(origin, destination) {
                    return Err(DeliveryError::NoMatchingOffer(self.number));
                }
                tracing::debug!(taxi = %self.number, %origin, %destination, "allocated");
                Ok(())
            }
            FareMessage::FarePay { amount, .. } => {
                if amount.is_finite() {
                    self.account += amount.round() as i64;
                }
                Ok(())
            }
            FareMessage::FareCancel {
                origin,
                destination,
            } => {
                let allocated = self.offers.allocated();
                let removed = self.offers.cancel(origin, destination);
                let lost_pickup = allocated.is_some_and(|k| removed.contains(&k));
                if lost_pickup && self.passenger.is_none() {
                    self.path.clear();
                }
                Ok(())
            }
        }
    }

    /// Merges `incoming` into the taxi's map. Every node and neighbour must be
    /// a junction of `network`; street lengths are taken from the network.
    /// Nothing is merged if any node is unknown.
    pub fn import_map(&mut self, incoming: &LocalMap, network: &RoadNetwork) -> Result<(), SimError> {
        for node in incoming.nodes() {
            let unknown = std::iter::once(node)
                .chain(incoming.neighbours(node).map(|(next, _)| next))
                .find(|n| network.node(n.x, n.y).is_none());
            if let Some(unknown) = unknown {
                return Err(SimError::UnknownNode(unknown));
            }
        }
        for node in incoming.nodes() {
            if !self.map.contains(node) {
                self.map.insert_node(node, BTreeMap::new());
            }
            for (next, _) in incoming.neighbours(node) {
                self.map
                    .insert_segment(node, next, Some(network.distance(node, next)));
            }
        }
        Ok(())
    }

    pub fn plan_path(&self, from: NodeId, to: NodeId) -> VecDeque<NodeId> {
        routing::plan_path(&self.map, from, to)
    }
}
