use crate::fare::{FareKey, FareState};
use crate::messages::{FareMessage, FleetLink};
use crate::network::{NodeId, TravelTimes};
use crate::taxi::TaxiId;

use super::Dispatcher;

/// A bidder's standing for one fare. Lower score wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Candidate {
    pub taxi: TaxiId,
    pub eta: u64,
    pub penalty: f64,
}

impl Candidate {
    pub fn score(&self) -> f64 {
        self.eta as f64 + self.penalty
    }
}

impl Dispatcher {
    /// Resolves at most one fare at `origin`. Returns the allocation made, if any.
    pub(super) fn allocate(
        &mut self,
        origin: NodeId,
        fleet: &mut dyn FleetLink,
        network: &dyn TravelTimes,
    ) -> Option<(FareKey, TaxiId)> {
        let mut open: Vec<(FareKey, NodeId)> = self
            .fares_at(origin)
            .filter(|f| f.allocated_to.is_none())
            .map(|f| (f.key, f.key.destination))
            .collect();
        // Most recent call first; stable so equal call times keep board order.
        open.sort_by(|a, b| b.0.call_time.cmp(&a.0.call_time));

        for (key, destination) in open {
            let candidates = self.rank_bidders(origin, fleet, network);
            for candidate in candidates {
                if self.try_award(key, destination, candidate, fleet) {
                    return Some((key, candidate.taxi));
                }
            }
        }
        None
    }

    /// Reachable bidders at `origin` ordered by score, bid order on ties.
    pub(super) fn rank_bidders(
        &self,
        origin: NodeId,
        fleet: &dyn FleetLink,
        network: &dyn TravelTimes,
    ) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self
            .bidders(origin)
            .iter()
            .filter_map(|&taxi| {
                let status = fleet.status(taxi)?;
                let eta = network.travel_time(status.location?, origin)?;
                let mut penalty =
                    self.config.penalty_per_allocation * self.recent_allocations(taxi) as f64;
                if status.balance < 0 {
                    penalty -= self.config.negative_balance_boost;
                }
                Some(Candidate { taxi, eta, penalty })
            })
            .collect();
        candidates.sort_by(|a, b| a.score().total_cmp(&b.score()));
        candidates
    }

    fn try_award(
        &mut self,
        key: FareKey,
        destination: NodeId,
        candidate: Candidate,
        fleet: &mut dyn FleetLink,
    ) -> bool {
        let Some(fare) = self.board.get_mut(&key) else {
            return false;
        };
        let previous_state = fare.state;
        fare.allocated_to = Some(candidate.taxi);
        fare.state = FareState::Allocated;

        let message = FareMessage::FareAlloc {
            origin: key.origin,
            destination,
        };
        if let Err(error) = fleet.deliver(candidate.taxi, message) {
            if let Some(fare) = self.board.get_mut(&key) {
                fare.allocated_to = None;
                fare.state = previous_state;
            }
            tracing::warn!(fare = %key, taxi = %candidate.taxi, %error, "allocation refused, trying next bidder");
            return false;
        }

        self.fairness.record(candidate.taxi, self.now);
        if let Some(bidders) = self.bids.get_mut(&key.origin) {
            bidders.retain(|t| *t != candidate.taxi);
            if bidders.is_empty() {
                self.bids.remove(&key.origin);
            }
        }
        tracing::debug!(
            fare = %key,
            taxi = %candidate.taxi,
            eta = candidate.eta,
            score = candidate.score(),
            "fare allocated"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{StubFleet, TableTimes};
    use super::*;
    use crate::fare::FareRequest;

    fn fare_at(call_time: u64, origin: (i32, i32), destination: (i32, i32)) -> FareRequest {
        FareRequest {
            call_time,
            origin: origin.into(),
            destination: destination.into(),
            price: Some(50.0),
            max_wait: 60,
        }
    }

    fn setup(fleet: &StubFleet) -> Dispatcher {
        let mut dispatcher = Dispatcher::default();
        for id in fleet.statuses.keys() {
            dispatcher.add_taxi(*id);
        }
        dispatcher
    }

    #[test]
    fn recent_allocations_outweigh_shorter_eta() {
        // A: ETA 3 with two recent allocations (score 7); B: ETA 5, none (score 5).
        let mut fleet = StubFleet::default()
            .with_taxi(1, (0, 0), 100)
            .with_taxi(2, (20, 0), 100);
        let times = TableTimes::default()
            .with((0, 0), (10, 0), 3)
            .with((20, 0), (10, 0), 5);
        let mut dispatcher = setup(&fleet);
        dispatcher.clock_tick(100);
        dispatcher.fairness.record(TaxiId(1), 40);
        dispatcher.fairness.record(TaxiId(1), 90);

        let req = fare_at(100, (10, 0), (10, 10));
        dispatcher.announce_fare(&req, &mut fleet);
        dispatcher.bids.insert(req.origin, vec![TaxiId(1), TaxiId(2)]);

        let ranked = dispatcher.rank_bidders(req.origin, &fleet, &times);
        assert_eq!(ranked[0].score(), 5.0);
        assert_eq!(ranked[1].score(), 7.0);

        let won = dispatcher.allocate(req.origin, &mut fleet, &times);
        assert_eq!(won, Some((req.key(), TaxiId(2))));
        assert_eq!(
            dispatcher.fare(&req.key()).and_then(|f| f.allocated_to),
            Some(TaxiId(2))
        );
        assert_eq!(dispatcher.bidders(req.origin), &[TaxiId(1)]);
    }

    #[test]
    fn equal_eta_prefers_fewer_recent_allocations() {
        let mut fleet = StubFleet::default()
            .with_taxi(1, (0, 0), 100)
            .with_taxi(2, (20, 0), 100);
        let times = TableTimes::default()
            .with((0, 0), (10, 0), 4)
            .with((20, 0), (10, 0), 4);
        let mut dispatcher = setup(&fleet);
        dispatcher.clock_tick(50);
        dispatcher.fairness.record(TaxiId(1), 45);

        let req = fare_at(50, (10, 0), (10, 10));
        dispatcher.announce_fare(&req, &mut fleet);
        dispatcher.receive_bid(req.origin, TaxiId(1), &mut fleet, &times);

        // Taxi 1 was the only bidder and won despite its history.
        assert_eq!(
            dispatcher.fare(&req.key()).and_then(|f| f.allocated_to),
            Some(TaxiId(1))
        );

        let second = fare_at(51, (10, 0), (0, 10));
        dispatcher.clock_tick(51);
        dispatcher.announce_fare(&second, &mut fleet);
        dispatcher.bids.insert(second.origin, vec![TaxiId(1), TaxiId(2)]);
        let won = dispatcher.allocate(second.origin, &mut fleet, &times);
        assert_eq!(won.map(|(_, t)| t), Some(TaxiId(2)));
    }

    #[test]
    fn ties_keep_bid_order() {
        let mut fleet = StubFleet::default()
            .with_taxi(1, (0, 0), 100)
            .with_taxi(2, (20, 0), 100);
        let times = TableTimes::default()
            .with((0, 0), (10, 0), 4)
            .with((20, 0), (10, 0), 4);
        let mut dispatcher = setup(&fleet);
        let req = fare_at(0, (10, 0), (10, 10));
        dispatcher.announce_fare(&req, &mut fleet);
        dispatcher.bids.insert(req.origin, vec![TaxiId(2), TaxiId(1)]);

        let won = dispatcher.allocate(req.origin, &mut fleet, &times);
        assert_eq!(won.map(|(_, t)| t), Some(TaxiId(2)));
    }

    #[test]
    fn negative_balance_earns_a_point() {
        let fleet = StubFleet::default()
            .with_taxi(1, (0, 0), 100)
            .with_taxi(2, (20, 0), -3);
        let times = TableTimes::default()
            .with((0, 0), (10, 0), 4)
            .with((20, 0), (10, 0), 4);
        let mut dispatcher = setup(&fleet);
        dispatcher.bids.insert(NodeId::new(10, 0), vec![TaxiId(1), TaxiId(2)]);

        let ranked = dispatcher.rank_bidders(NodeId::new(10, 0), &fleet, &times);
        assert_eq!(ranked[0].taxi, TaxiId(2));
        assert_eq!(ranked[0].score(), 3.0);
    }

    #[test]
    fn unreachable_and_unplaced_bidders_are_excluded() {
        let mut fleet = StubFleet::default()
            .with_taxi(1, (0, 0), 100)
            .with_taxi(2, (20, 0), 100);
        if let Some(status) = fleet.statuses.get_mut(&TaxiId(2)) {
            status.location = None;
        }
        let times = TableTimes::default();
        let mut dispatcher = setup(&fleet);
        let req = fare_at(0, (10, 0), (10, 10));
        dispatcher.announce_fare(&req, &mut fleet);
        dispatcher.bids.insert(req.origin, vec![TaxiId(1), TaxiId(2)]);

        assert!(dispatcher.rank_bidders(req.origin, &fleet, &times).is_empty());
        assert_eq!(dispatcher.allocate(req.origin, &mut fleet, &times), None);
        assert_eq!(dispatcher.open_fares(), 1);
    }

    #[test]
    fn refused_allocation_rolls_back_and_tries_next_bidder() {
        let mut fleet = StubFleet::default()
            .with_taxi(1, (0, 0), 100)
            .with_taxi(2, (20, 0), 100);
        fleet.refuse_alloc.push(TaxiId(1));
        let times = TableTimes::default()
            .with((0, 0), (10, 0), 1)
            .with((20, 0), (10, 0), 9);
        let mut dispatcher = setup(&fleet);
        let req = fare_at(0, (10, 0), (10, 10));
        dispatcher.announce_fare(&req, &mut fleet);
        dispatcher.bids.insert(req.origin, vec![TaxiId(1), TaxiId(2)]);

        let won = dispatcher.allocate(req.origin, &mut fleet, &times);

        assert_eq!(won.map(|(_, t)| t), Some(TaxiId(2)));
        assert_eq!(dispatcher.recent_allocations(TaxiId(1)), 0);
        assert!(fleet
            .received(1)
            .iter()
            .all(|m| !matches!(m, FareMessage::FareAlloc { .. })));
    }

    #[test]
    fn all_refusals_leave_fare_open() {
        let mut fleet = StubFleet::default().with_taxi(1, (0, 0), 100);
        fleet.refuse_alloc.push(TaxiId(1));
        let times = TableTimes::default().with((0, 0), (10, 0), 1);
        let mut dispatcher = setup(&fleet);
        let req = fare_at(0, (10, 0), (10, 10));
        dispatcher.announce_fare(&req, &mut fleet);

        assert_eq!(dispatcher.receive_bid(req.origin, TaxiId(1), &mut fleet, &times), None);
        let fare = dispatcher.fare(&req.key()).expect("still posted");
        assert_eq!(fare.allocated_to, None);
        assert_eq!(fare.state, FareState::BidOpen);
    }

    #[test]
    fn one_fare_per_pass_most_recent_first() {
        let mut fleet = StubFleet::default()
            .with_taxi(1, (0, 0), 100)
            .with_taxi(2, (20, 0), 100);
        let times = TableTimes::default()
            .with((0, 0), (10, 0), 2)
            .with((20, 0), (10, 0), 3);
        let mut dispatcher = setup(&fleet);
        let older = fare_at(3, (10, 0), (10, 10));
        let newer = fare_at(7, (10, 0), (0, 10));
        dispatcher.announce_fare(&older, &mut fleet);
        dispatcher.announce_fare(&newer, &mut fleet);
        dispatcher.bids.insert(older.origin, vec![TaxiId(1), TaxiId(2)]);

        let first = dispatcher.allocate(older.origin, &mut fleet, &times);
        assert_eq!(first, Some((newer.key(), TaxiId(1))));
        assert_eq!(dispatcher.open_fares(), 1);

        let second = dispatcher.allocate(older.origin, &mut fleet, &times);
        assert_eq!(second, Some((older.key(), TaxiId(2))));
        assert_eq!(dispatcher.open_fares(), 0);
    }

    #[test]
    fn allocated_fare_is_never_reassigned() {
        let mut fleet = StubFleet::default()
            .with_taxi(1, (0, 0), 100)
            .with_taxi(2, (20, 0), 100);
        let times = TableTimes::default()
            .with((0, 0), (10, 0), 9)
            .with((20, 0), (10, 0), 1);
        let mut dispatcher = setup(&fleet);
        let req = fare_at(0, (10, 0), (10, 10));
        dispatcher.announce_fare(&req, &mut fleet);

        dispatcher.receive_bid(req.origin, TaxiId(1), &mut fleet, &times);
        assert_eq!(
            dispatcher.fare(&req.key()).and_then(|f| f.allocated_to),
            Some(TaxiId(1))
        );
        // A closer bidder arriving later cannot take the fare over.
        assert_eq!(
            dispatcher.receive_bid(req.origin, TaxiId(2), &mut fleet, &times),
            None
        );
        assert_eq!(
            dispatcher.fare(&req.key()).and_then(|f| f.allocated_to),
            Some(TaxiId(1))
        );
    }
}
