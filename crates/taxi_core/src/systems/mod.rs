pub mod duty;
pub mod fare_expiry;
pub mod fare_inbound;
pub mod movement;
pub mod taxi_tick;
pub mod telemetry_snapshot;
