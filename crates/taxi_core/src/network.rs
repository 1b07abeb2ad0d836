//! Road network: junctions on integer coordinates joined by streets.
//!
//! This module provides:
//!
//! - **NodeId**: integer `(x, y)` handle for a junction; taxis hold these, never references
//! - **LocalMap**: `node -> {neighbour: (direction, distance)}`, the shape taxis plan over
//! - **RoadNetwork**: the authoritative graph with cached travel-time queries
//! - **TravelTimes**: the query seam used by the dispatcher ETA and the taxi bid policy
//!
//! A street's travel time is its length divided by the network speed, rounded to
//! whole minutes and never less than one minute.

use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use bevy_ecs::prelude::Resource;
use lru::LruCache;
use pathfinding::prelude::dijkstra;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

const TRAVEL_TIME_CACHE_SIZE: usize = 20_000;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId {
    pub x: i32,
    pub y: i32,
}

impl NodeId {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Straight-line distance; a lower bound on any street distance.
    pub fn euclidean(self, other: NodeId) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

impl From<(i32, i32)> for NodeId {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// Compass heading of a street leaving a junction. Screen coordinates: y grows southwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub fn between(from: NodeId, to: NodeId) -> Self {
        let dx = (to.x - from.x).signum();
        let dy = (to.y - from.y).signum();
        match (dx, dy) {
            (0, -1) => Direction::North,
            (1, -1) => Direction::NorthEast,
            (1, 0) => Direction::East,
            (1, 1) => Direction::SouthEast,
            (0, 1) => Direction::South,
            (-1, 1) => Direction::SouthWest,
            (-1, 0) => Direction::West,
            _ => Direction::NorthWest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub direction: Direction,
    /// Street length; `None` when the exporter did not record one.
    pub distance: Option<f64>,
}

/// Adjacency map held by each taxi. Iteration order is the coordinate order of
/// the nodes, so everything computed from it is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalMap {
    nodes: BTreeMap<NodeId, BTreeMap<NodeId, Segment>>,
}

impl LocalMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_node(&mut self, node: NodeId, neighbours: BTreeMap<NodeId, Segment>) {
        self.nodes.insert(node, neighbours);
    }

    /// Adds a one-way street, creating either endpoint if needed.
    pub fn insert_segment(&mut self, from: NodeId, to: NodeId, distance: Option<f64>) {
        self.nodes.entry(to).or_default();
        self.nodes.entry(from).or_default().insert(
            to,
            Segment {
                direction: Direction::between(from, to),
                distance,
            },
        );
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn segment(&self, from: NodeId, to: NodeId) -> Option<&Segment> {
        self.nodes.get(&from)?.get(&to)
    }

    pub fn neighbours(&self, node: NodeId) -> impl Iterator<Item = (NodeId, &Segment)> {
        self.nodes
            .get(&node)
            .into_iter()
            .flat_map(|n| n.iter().map(|(id, seg)| (*id, seg)))
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Travel-time queries consumed by the dispatcher and taxis.
pub trait TravelTimes: Send + Sync {
    /// Whole minutes from `from` to `to`; `None` when no route exists.
    fn travel_time(&self, from: NodeId, to: NodeId) -> Option<u64>;

    fn contains(&self, node: NodeId) -> bool;
}

#[derive(Resource)]
pub struct RoadNetwork {
    map: LocalMap,
    /// Distance units covered per minute.
    speed: f64,
    travel_cache: Mutex<LruCache<(NodeId, NodeId), Option<u64>>>,
}

impl fmt::Debug for RoadNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoadNetwork")
            .field("nodes", &self.map.len())
            .field("speed", &self.speed)
            .finish()
    }
}

impl Default for RoadNetwork {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RoadNetwork {
    pub fn new(speed: f64) -> Self {
        Self {
            map: LocalMap::new(),
            speed: if speed > 0.0 { speed } else { 1.0 },
            travel_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(TRAVEL_TIME_CACHE_SIZE).expect("cache size must be non-zero"),
            )),
        }
    }

    /// Lattice of junctions every `spacing` units, streets in the four compass
    /// directions between adjacent junctions.
    pub fn grid(width: i32, height: i32, spacing: i32, speed: f64) -> Self {
        let mut network = Self::new(speed);
        let spacing = spacing.max(1);
        for x in (0..width).step_by(spacing as usize) {
            for y in (0..height).step_by(spacing as usize) {
                let here = NodeId::new(x, y);
                network.add_junction(here);
                if x + spacing < width {
                    network.add_street(here, NodeId::new(x + spacing, y));
                }
                if y + spacing < height {
                    network.add_street(here, NodeId::new(x, y + spacing));
                }
            }
        }
        network
    }

    /// Closes a random fraction of two-way streets. Junctions stay; some may
    /// become unreachable, which callers see as `None` travel times.
    pub fn close_streets<R: Rng>(&mut self, rng: &mut R, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        if fraction == 0.0 {
            return;
        }
        let mut streets: Vec<(NodeId, NodeId)> = self
            .map
            .nodes()
            .flat_map(|a| {
                self.map
                    .neighbours(a)
                    .filter(move |(b, _)| a < *b)
                    .map(move |(b, _)| (a, b))
                    .collect::<Vec<_>>()
            })
            .collect();
        streets.shuffle(rng);
        let to_close = (streets.len() as f64 * fraction).round() as usize;
        for (a, b) in streets.into_iter().take(to_close) {
            if let Some(n) = self.map.nodes.get_mut(&a) {
                n.remove(&b);
            }
            if let Some(n) = self.map.nodes.get_mut(&b) {
                n.remove(&a);
            }
        }
        self.clear_cache();
    }

    pub fn add_junction(&mut self, node: NodeId) {
        self.map.nodes.entry(node).or_default();
    }

    /// Two-way street whose length is the straight-line distance.
    pub fn add_street(&mut self, a: NodeId, b: NodeId) {
        let length = a.euclidean(b);
        self.add_one_way(a, b, length);
        self.add_one_way(b, a, length);
    }

    pub fn add_one_way(&mut self, from: NodeId, to: NodeId, length: f64) {
        self.map.insert_segment(from, to, Some(length));
        self.clear_cache();
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn node(&self, x: i32, y: i32) -> Option<NodeId> {
        let id = NodeId::new(x, y);
        self.map.contains(id).then_some(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.map.nodes()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn distance(&self, a: NodeId, b: NodeId) -> f64 {
        a.euclidean(b)
    }

    /// Minutes to traverse the street `from -> to`, if the street exists.
    pub fn segment_minutes(&self, from: NodeId, to: NodeId) -> Option<u64> {
        let segment = self.map.segment(from, to)?;
        let length = segment.distance.unwrap_or_else(|| from.euclidean(to));
        Some(self.minutes_for(length))
    }

    fn minutes_for(&self, length: f64) -> u64 {
        ((length / self.speed).round() as u64).max(1)
    }

    /// Fastest route and its total minutes.
    pub fn route(&self, from: NodeId, to: NodeId) -> Option<(Vec<NodeId>, u64)> {
        if !self.map.contains(from) || !self.map.contains(to) {
            return None;
        }
        dijkstra(
            &from,
            |node| {
                self.map
                    .neighbours(*node)
                    .map(|(next, seg)| {
                        let length = seg.distance.unwrap_or_else(|| node.euclidean(next));
                        (next, self.minutes_for(length))
                    })
                    .collect::<Vec<_>>()
            },
            |node| *node == to,
        )
    }

    pub fn export_map(&self) -> LocalMap {
        self.map.clone()
    }

    fn clear_cache(&mut self) {
        if let Ok(cache) = self.travel_cache.get_mut() {
            cache.clear();
        }
    }
}

impl TravelTimes for RoadNetwork {
    fn travel_time(&self, from: NodeId, to: NodeId) -> Option<u64> {
        if from == to {
            return self.map.contains(from).then_some(0);
        }
        let mut cache = match self.travel_cache.lock() {
            Ok(guard) => guard,
            Err(_) => return self.route(from, to).map(|(_, minutes)| minutes), // poisoned: compute directly
        };
        *cache.get_or_insert((from, to), || {
            self.route(from, to).map(|(_, minutes)| minutes)
        })
    }

    fn contains(&self, node: NodeId) -> bool {
        self.map.contains(node)
    }
}
