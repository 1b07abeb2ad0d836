//! Taxi fleet fare-auction simulation.
//!
//! A dispatcher auctions passenger fares to a fleet of independently
//! reasoning taxis over a grid road network, one simulated minute at a time.

pub mod clock;
pub mod dispatcher;
pub mod ecs;
pub mod error;
pub mod fare;
pub mod fleet;
pub mod messages;
pub mod network;
pub mod runner;
pub mod scenario;
pub mod spawner;
pub mod systems;
pub mod taxi;
pub mod telemetry;
pub mod telemetry_export;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
