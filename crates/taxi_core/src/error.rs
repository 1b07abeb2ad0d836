//! Error types. Only [SimError] is fatal; the others describe boundary
//! rejections that are logged and dropped.

use thiserror::Error;

use crate::network::NodeId;
use crate::taxi::TaxiId;

/// Faults that halt the run: a taxi's map disagrees with the road network.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("taxi {taxi} fell off the edge of the world: {node} is not in its map")]
    FellOffMap { taxi: TaxiId, node: NodeId },

    #[error("taxi {taxi} can't get there from here: its map has no street from {from} to {to}")]
    NoRoadSegment {
        taxi: TaxiId,
        from: NodeId,
        to: NodeId,
    },

    #[error("node {0} does not exist in the road network")]
    UnknownNode(NodeId),

    #[error("scenario setup failed: {0}")]
    Setup(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet export failed: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow export failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

/// Why a fare announcement was refused at the boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FareRejection {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("coordinate `{0}` is not an integer pair")]
    BadCoordinate(String),

    #[error("node {0} is not part of the road network")]
    OffNetwork(NodeId),

    #[error("price {0} is not a finite, non-negative amount")]
    BadPrice(f64),

    #[error("origin and destination are both {0}")]
    ZeroLengthTrip(NodeId),
}

/// A message could not be handed to a taxi.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("taxi {0} is not known to the fleet")]
    UnknownTaxi(TaxiId),

    #[error("taxi {0} is off duty")]
    OffDuty(TaxiId),

    #[error("taxi {0} holds no offer matching the message")]
    NoMatchingOffer(TaxiId),

    #[error("taxi {0} already has a fare booked")]
    AlreadyBooked(TaxiId),
}

pub type Result<T> = std::result::Result<T, SimError>;
