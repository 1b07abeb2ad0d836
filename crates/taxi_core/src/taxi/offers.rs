use std::collections::BTreeMap;

use crate::fare::FareKey;
use crate::network::NodeId;

/// Outcome of the bid policy for one offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidDecision {
    Undecided,
    Bid,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Offer {
    pub price: f64,
    pub decision: BidDecision,
    pub allocated: bool,
}

/// A taxi's view of advertised fares. Keys carry the time the advice arrived,
/// the origin and the destination, so two fares waiting at one junction stay
/// distinct.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfferBook {
    offers: BTreeMap<FareKey, Offer>,
}

impl OfferBook {
    pub fn advise(&mut self, now: u64, origin: NodeId, destination: NodeId, price: f64) {
        self.offers.insert(
            FareKey {
                call_time: now,
                origin,
                destination,
            },
            Offer {
                price,
                decision: BidDecision::Undecided,
                allocated: false,
            },
        );
    }

    /// Marks the first matching offer allocated. Returns `false` if there is none.
    pub fn allocate(&mut self, origin: NodeId, destination: NodeId) -> bool {
        match self
            .offers
            .iter_mut()
            .find(|(k, o)| k.origin == origin && k.destination == destination && !o.allocated)
        {
            Some((_, offer)) => {
                offer.allocated = true;
                true
            }
            None => false,
        }
    }

    /// Drops offers at `origin`, narrowed to `destination` when given.
    /// Returns the removed keys.
    pub fn cancel(&mut self, origin: NodeId, destination: Option<NodeId>) -> Vec<FareKey> {
        let removed: Vec<FareKey> = self
            .offers
            .keys()
            .filter(|k| k.origin == origin && destination.map_or(true, |d| k.destination == d))
            .copied()
            .collect();
        for key in &removed {
            self.offers.remove(key);
        }
        removed
    }

    pub fn allocated(&self) -> Option<FareKey> {
        self.offers
            .iter()
            .find(|(_, o)| o.allocated)
            .map(|(k, _)| *k)
    }

    pub fn has_allocation(&self) -> bool {
        self.allocated().is_some()
    }

    pub fn get(&self, key: &FareKey) -> Option<&Offer> {
        self.offers.get(key)
    }

    pub fn get_mut(&mut self, key: &FareKey) -> Option<&mut Offer> {
        self.offers.get_mut(key)
    }

    pub fn remove(&mut self, key: &FareKey) -> Option<Offer> {
        self.offers.remove(key)
    }

    pub fn keys(&self) -> Vec<FareKey> {
        self.offers.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FareKey, &Offer)> {
        self.offers.iter()
    }

    pub fn clear(&mut self) {
        self.offers.clear();
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }
}
