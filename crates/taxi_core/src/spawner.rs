//! Fare spawner: seeded per-minute generation of fare requests.
//!
//! Every junction has a chance of producing a fare each minute. Hotspots
//! override the base chance for individual junctions. Destinations are drawn
//! uniformly from junctions reachable from the origin, and the price is a
//! flat charge plus a per-minute rate on the network travel time.

use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::fare::FareRequest;
use crate::network::{NodeId, RoadNetwork, TravelTimes};

/// Destination draws per fare before the origin is skipped for this minute.
const MAX_DESTINATION_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct FareSpawnerConfig {
    /// Chance per junction per minute that a fare appears.
    pub fare_probability: f64,
    /// Junctions with their own chance per minute.
    pub hotspots: Vec<(NodeId, f64)>,
    pub min_wait: u64,
    pub max_wait: u64,
    pub base_price: f64,
    pub price_per_minute: f64,
    /// Shortest trip worth generating, in minutes.
    pub min_trip_minutes: u64,
}

impl Default for FareSpawnerConfig {
    fn default() -> Self {
        Self {
            fare_probability: 0.002,
            hotspots: Vec::new(),
            min_wait: 20,
            max_wait: 60,
            base_price: 10.0,
            price_per_minute: 2.0,
            min_trip_minutes: 5,
        }
    }
}

#[derive(Debug, Resource)]
pub struct FareSpawner {
    config: FareSpawnerConfig,
    rng: StdRng,
    spawned: u64,
}

impl FareSpawner {
    pub fn new(config: FareSpawnerConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            spawned: 0,
        }
    }

    pub fn config(&self) -> &FareSpawnerConfig {
        &self.config
    }

    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    fn probability_at(&self, node: NodeId) -> f64 {
        self.config
            .hotspots
            .iter()
            .find(|(n, _)| *n == node)
            .map_or(self.config.fare_probability, |(_, p)| *p)
            .clamp(0.0, 1.0)
    }

    /// Fares called in at minute `now`, in junction order.
    pub fn spawn_due(&mut self, now: u64, network: &RoadNetwork) -> Vec<FareRequest> {
        let nodes: Vec<NodeId> = network.nodes().collect();
        if nodes.len() < 2 {
            return Vec::new();
        }
        let mut requests = Vec::new();
        for &origin in &nodes {
            let chance = self.probability_at(origin);
            if chance <= 0.0 || !self.rng.gen_bool(chance) {
                continue;
            }
            if let Some(request) = self.draw_trip(now, origin, &nodes, network) {
                requests.push(request);
            }
        }
        self.spawned += requests.len() as u64;
        requests
    }

    fn draw_trip(
        &mut self,
        now: u64,
        origin: NodeId,
        nodes: &[NodeId],
        network: &RoadNetwork,
    ) -> Option<FareRequest> {
        for _ in 0..MAX_DESTINATION_ATTEMPTS {
            let destination = nodes[self.rng.gen_range(0..nodes.len())];
            if destination == origin {
                continue;
            }
            let Some(minutes) = network.travel_time(origin, destination) else {
                continue;
            };
            if minutes < self.config.min_trip_minutes {
                continue;
            }
            let (lo, hi) = (
                self.config.min_wait.min(self.config.max_wait),
                self.config.min_wait.max(self.config.max_wait),
            );
            let max_wait = self.rng.gen_range(lo..=hi);
            let price = self.config.base_price + self.config.price_per_minute * minutes as f64;
            return Some(FareRequest {
                call_time: now,
                origin,
                destination,
                price: Some(price),
                max_wait,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn busy_config() -> FareSpawnerConfig {
        FareSpawnerConfig {
            fare_probability: 0.3,
            ..FareSpawnerConfig::default()
        }
    }

    #[test]
    fn same_seed_same_fares() {
        let network = RoadNetwork::grid(30, 30, 5, 1.0);
        let mut a = FareSpawner::new(busy_config(), 11);
        let mut b = FareSpawner::new(busy_config(), 11);
        for minute in 0..20 {
            assert_eq!(a.spawn_due(minute, &network), b.spawn_due(minute, &network));
        }
        assert!(a.spawned() > 0);
    }

    #[test]
    fn fares_are_priced_on_travel_time_and_reachable() {
        let network = RoadNetwork::grid(30, 30, 5, 1.0);
        let mut spawner = FareSpawner::new(busy_config(), 3);
        let fares: Vec<FareRequest> = (0..10).flat_map(|m| spawner.spawn_due(m, &network)).collect();
        assert!(!fares.is_empty());
        for fare in fares {
            let minutes = network
                .travel_time(fare.origin, fare.destination)
                .expect("reachable");
            assert!(minutes >= 5);
            assert_eq!(fare.price, Some(10.0 + 2.0 * minutes as f64));
            assert!((20..=60).contains(&fare.max_wait));
        }
    }

    #[test]
    fn hotspot_overrides_base_chance() {
        let network = RoadNetwork::grid(30, 30, 5, 1.0);
        let hot = NodeId::new(15, 15);
        let config = FareSpawnerConfig {
            fare_probability: 0.0,
            hotspots: vec![(hot, 1.0)],
            ..FareSpawnerConfig::default()
        };
        let mut spawner = FareSpawner::new(config, 5);
        let fares = spawner.spawn_due(0, &network);
        assert_eq!(fares.len(), 1);
        assert_eq!(fares[0].origin, hot);
    }
}
