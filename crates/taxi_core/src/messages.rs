//! Messages exchanged between the dispatcher and taxis.

use serde::{Deserialize, Serialize};

use crate::error::DeliveryError;
use crate::network::NodeId;
use crate::taxi::{TaxiId, TaxiStatus};

/// Inbound messages to a taxi. Every message targets one offer by origin,
/// narrowed by destination where the message carries one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FareMessage {
    FareAdvice {
        origin: NodeId,
        destination: NodeId,
        price: f64,
    },
    FareAlloc {
        origin: NodeId,
        destination: NodeId,
    },
    FarePay {
        amount: f64,
        origin: NodeId,
        destination: NodeId,
    },
    FareCancel {
        origin: NodeId,
        destination: Option<NodeId>,
    },
}

/// The dispatcher's view of the fleet: where taxis are, and a way to hand them
/// messages. Delivery is synchronous, so a refusal is visible to the caller
/// immediately.
pub trait FleetLink {
    fn status(&self, taxi: TaxiId) -> Option<TaxiStatus>;

    fn deliver(&mut self, taxi: TaxiId, message: FareMessage) -> Result<(), DeliveryError>;
}
