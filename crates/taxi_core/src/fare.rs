//! Fare records and the boundary adapter that turns loosely-shaped
//! announcements into typed requests.

use std::collections::BTreeMap;
use std::fmt;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::FareRejection;
use crate::network::{NodeId, TravelTimes};
use crate::taxi::TaxiId;

/// Identity of a fare on the dispatcher's board.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FareKey {
    pub call_time: u64,
    pub origin: NodeId,
    pub destination: NodeId,
}

impl fmt::Display for FareKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}@{}", self.origin, self.destination, self.call_time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FareState {
    Posted,
    BidOpen,
    Allocated,
    PickedUp,
    Completed,
    Expired,
    Cancelled,
}

impl FareState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FareState::Completed | FareState::Expired | FareState::Cancelled
        )
    }
}

/// One fare as the dispatcher tracks it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fare {
    pub key: FareKey,
    pub price: Option<f64>,
    pub max_wait: u64,
    pub allocated_to: Option<TaxiId>,
    pub state: FareState,
}

impl Fare {
    pub fn new(key: FareKey, price: Option<f64>, max_wait: u64) -> Self {
        Self {
            key,
            price,
            max_wait,
            allocated_to: None,
            state: FareState::Posted,
        }
    }

    /// Price quoted to taxis; unknown prices are advertised as zero.
    pub fn advertised_price(&self) -> f64 {
        self.price.unwrap_or(0.0)
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        now.saturating_sub(self.key.call_time) > self.max_wait
    }
}

/// A validated request ready for `Dispatcher::announce_fare`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareRequest {
    pub call_time: u64,
    pub origin: NodeId,
    pub destination: NodeId,
    pub price: Option<f64>,
    pub max_wait: u64,
}

impl FareRequest {
    pub fn key(&self) -> FareKey {
        FareKey {
            call_time: self.call_time,
            origin: self.origin,
            destination: self.destination,
        }
    }
}

/// Announcement as it arrives from outside the core: coordinates as text,
/// every field optional. [FareAnnouncement::validate] is the only way in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FareAnnouncement {
    pub call_time: Option<u64>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub price: Option<f64>,
    pub max_wait: Option<u64>,
}

/// Wait applied when an announcement omits one.
pub const DEFAULT_MAX_WAIT: u64 = 60;

impl FareAnnouncement {
    pub fn validate(&self, network: &dyn TravelTimes) -> Result<FareRequest, FareRejection> {
        let call_time = self
            .call_time
            .ok_or(FareRejection::MissingField("call_time"))?;
        let origin = parse_node(
            self.origin
                .as_deref()
                .ok_or(FareRejection::MissingField("origin"))?,
        )?;
        let destination = parse_node(
            self.destination
                .as_deref()
                .ok_or(FareRejection::MissingField("destination"))?,
        )?;
        for node in [origin, destination] {
            if !network.contains(node) {
                return Err(FareRejection::OffNetwork(node));
            }
        }
        if origin == destination {
            return Err(FareRejection::ZeroLengthTrip(origin));
        }
        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(FareRejection::BadPrice(price));
            }
        }
        Ok(FareRequest {
            call_time,
            origin,
            destination,
            price: self.price,
            max_wait: self.max_wait.unwrap_or(DEFAULT_MAX_WAIT),
        })
    }
}

/// A fare riding in a taxi.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Passenger {
    pub key: FareKey,
    pub price: f64,
}

impl Passenger {
    pub fn destination(&self) -> NodeId {
        self.key.destination
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Kerbside {
    key: FareKey,
    price: f64,
    allocated_to: Option<TaxiId>,
}

/// Fares physically waiting at junctions. A fare can only be collected by the
/// taxi the dispatcher allocated it to.
#[derive(Debug, Default, Resource)]
pub struct WaitingFares {
    by_origin: BTreeMap<NodeId, Vec<Kerbside>>,
}

impl WaitingFares {
    pub fn add(&mut self, request: &FareRequest) {
        let waiting = self.by_origin.entry(request.origin).or_default();
        let key = request.key();
        if waiting.iter().any(|w| w.key == key) {
            return;
        }
        waiting.push(Kerbside {
            key,
            price: request.price.unwrap_or(0.0),
            allocated_to: None,
        });
    }

    pub fn allocate(&mut self, key: &FareKey, taxi: TaxiId) {
        if let Some(waiting) = self
            .by_origin
            .get_mut(&key.origin)
            .and_then(|w| w.iter_mut().find(|w| w.key == *key))
        {
            waiting.allocated_to = Some(taxi);
        }
    }

    /// Hands the fare for `origin -> destination` allocated to `taxi` over.
    pub fn pickup(&mut self, origin: NodeId, destination: NodeId, taxi: TaxiId) -> Option<Passenger> {
        let waiting = self.by_origin.get_mut(&origin)?;
        let index = waiting.iter().position(|w| {
            w.key.destination == destination && w.allocated_to == Some(taxi)
        })?;
        let fare = waiting.remove(index);
        if waiting.is_empty() {
            self.by_origin.remove(&origin);
        }
        Some(Passenger {
            key: fare.key,
            price: fare.price,
        })
    }

    pub fn remove(&mut self, key: &FareKey) -> bool {
        let Some(waiting) = self.by_origin.get_mut(&key.origin) else {
            return false;
        };
        let before = waiting.len();
        waiting.retain(|w| w.key != *key);
        let removed = waiting.len() != before;
        if waiting.is_empty() {
            self.by_origin.remove(&key.origin);
        }
        removed
    }

    pub fn remove_origin(&mut self, origin: NodeId) -> usize {
        self.by_origin.remove(&origin).map_or(0, |w| w.len())
    }

    pub fn is_waiting(&self, key: &FareKey) -> bool {
        self.by_origin
            .get(&key.origin)
            .is_some_and(|w| w.iter().any(|f| f.key == *key))
    }

    pub fn len(&self) -> usize {
        self.by_origin.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_origin.is_empty()
    }
}

/// Accepts `"x,y"`, `"(x, y)"` or `"x y"`.
pub fn parse_node(text: &str) -> Result<NodeId, FareRejection> {
    let bad = || FareRejection::BadCoordinate(text.to_string());
    let trimmed = text.trim().trim_start_matches('(').trim_end_matches(')');
    let mut parts = trimmed
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty());
    let x = parts.next().ok_or_else(bad)?.parse::<i32>().map_err(|_| bad())?;
    let y = parts.next().ok_or_else(bad)?.parse::<i32>().map_err(|_| bad())?;
    if parts.next().is_some() {
        return Err(bad());
    }
    Ok(NodeId::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::RoadNetwork;

    fn announcement(origin: &str, destination: &str) -> FareAnnouncement {
        FareAnnouncement {
            call_time: Some(12),
            origin: Some(origin.to_string()),
            destination: Some(destination.to_string()),
            price: Some(30.0),
            max_wait: None,
        }
    }

    #[test]
    fn parses_common_coordinate_shapes() {
        assert_eq!(parse_node("3,4"), Ok(NodeId::new(3, 4)));
        assert_eq!(parse_node(" (3, 4) "), Ok(NodeId::new(3, 4)));
        assert_eq!(parse_node("3 4"), Ok(NodeId::new(3, 4)));
        assert!(parse_node("3").is_err());
        assert!(parse_node("3,4,5").is_err());
        assert!(parse_node("x,y").is_err());
    }

    #[test]
    fn valid_announcement_becomes_request_with_default_wait() {
        let network = RoadNetwork::grid(20, 20, 5, 1.0);
        let request = announcement("0,0", "(10,5)")
            .validate(&network)
            .expect("valid");
        assert_eq!(request.origin, NodeId::new(0, 0));
        assert_eq!(request.destination, NodeId::new(10, 5));
        assert_eq!(request.max_wait, DEFAULT_MAX_WAIT);
    }

    #[test]
    fn malformed_announcements_are_rejected() {
        let network = RoadNetwork::grid(20, 20, 5, 1.0);
        let missing = FareAnnouncement {
            origin: None,
            ..announcement("0,0", "5,5")
        };
        assert_eq!(
            missing.validate(&network),
            Err(FareRejection::MissingField("origin"))
        );
        assert!(matches!(
            announcement("zero,0", "5,5").validate(&network),
            Err(FareRejection::BadCoordinate(_))
        ));
        assert_eq!(
            announcement("1,1", "5,5").validate(&network),
            Err(FareRejection::OffNetwork(NodeId::new(1, 1)))
        );
        assert_eq!(
            announcement("5,5", "5,5").validate(&network),
            Err(FareRejection::ZeroLengthTrip(NodeId::new(5, 5)))
        );
        let negative = FareAnnouncement {
            price: Some(-1.0),
            ..announcement("0,0", "5,5")
        };
        assert_eq!(negative.validate(&network), Err(FareRejection::BadPrice(-1.0)));
    }

    #[test]
    fn only_the_allocated_taxi_collects_a_waiting_fare() {
        let request = FareRequest {
            call_time: 4,
            origin: NodeId::new(5, 5),
            destination: NodeId::new(10, 10),
            price: Some(50.0),
            max_wait: 60,
        };
        let mut kerb = WaitingFares::default();
        kerb.add(&request);
        kerb.add(&request);
        assert_eq!(kerb.len(), 1);

        assert_eq!(kerb.pickup(request.origin, request.destination, TaxiId(1)), None);
        kerb.allocate(&request.key(), TaxiId(2));
        assert_eq!(kerb.pickup(request.origin, request.destination, TaxiId(1)), None);
        let passenger = kerb
            .pickup(request.origin, request.destination, TaxiId(2))
            .expect("allocated taxi collects");
        assert_eq!(passenger.price, 50.0);
        assert_eq!(passenger.destination(), request.destination);
        assert!(kerb.is_empty());
    }

    #[test]
    fn expiry_is_strictly_after_max_wait() {
        let key = FareKey {
            call_time: 10,
            origin: NodeId::new(0, 0),
            destination: NodeId::new(5, 5),
        };
        let fare = Fare::new(key, None, 5);
        assert!(!fare.is_expired_at(15));
        assert!(fare.is_expired_at(16));
        assert_eq!(fare.advertised_price(), 0.0);
    }
}
