use crate::fare::FareKey;
use crate::network::TravelTimes;

use super::Taxi;

/// Why a taxi passed on an offer. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    Busy,
    Unreachable,
    TooLate,
    Unprofitable,
    CannotAfford,
}

impl Taxi {
    /// Runs the bid policy for one offer. `Ok(())` means bid.
    pub fn evaluate_offer(
        &self,
        now: u64,
        key: &FareKey,
        price: f64,
        network: &dyn TravelTimes,
    ) -> Result<(), DeclineReason> {
        if self.passenger.is_some() || self.offers.has_allocation() {
            return Err(DeclineReason::Busy);
        }
        let start = self
            .location
            .or(self.config.start_point)
            .ok_or(DeclineReason::Unreachable)?;
        let to_origin = network
            .travel_time(start, key.origin)
            .ok_or(DeclineReason::Unreachable)?;
        let to_destination = network
            .travel_time(key.origin, key.destination)
            .ok_or(DeclineReason::Unreachable)?;

        let margin = self.config.safety_margin;
        let waited = now.saturating_sub(key.call_time);
        let time_left = self.config.max_wait.saturating_sub(waited) as f64;
        if time_left <= to_origin as f64 + margin {
            return Err(DeclineReason::TooLate);
        }

        let cost = (to_origin + to_destination) as f64 * self.config.cost_per_minute;
        if price - cost - margin <= 0.0 {
            return Err(DeclineReason::Unprofitable);
        }

        if self.account <= to_origin as i64 {
            return Err(DeclineReason::CannotAfford);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{NodeId, RoadNetwork};
    use crate::taxi::{TaxiConfig, TaxiId};

    fn on_duty_taxi(network: &RoadNetwork, at: (i32, i32)) -> Taxi {
        let config = TaxiConfig {
            start_point: Some(at.into()),
            ..TaxiConfig::default()
        };
        let mut taxi = Taxi::new(TaxiId(1), config, network.export_map()).expect("taxi");
        taxi.come_on_duty(0);
        taxi
    }

    fn key(origin: (i32, i32), destination: (i32, i32)) -> FareKey {
        FareKey {
            call_time: 0,
            origin: origin.into(),
            destination: destination.into(),
        }
    }

    #[test]
    fn profitable_reachable_fare_is_bid_on() {
        let network = RoadNetwork::grid(20, 20, 5, 1.0);
        let taxi = on_duty_taxi(&network, (0, 0));
        // 10 minutes to origin, 10 to destination: 50 - 20 - 5 > 0.
        assert_eq!(taxi.evaluate_offer(0, &key((5, 5), (10, 10)), 50.0, &network), Ok(()));
    }

    #[test]
    fn thin_margin_is_declined() {
        let network = RoadNetwork::grid(20, 20, 5, 1.0);
        let taxi = on_duty_taxi(&network, (0, 0));
        assert_eq!(
            taxi.evaluate_offer(0, &key((5, 5), (10, 10)), 25.0, &network),
            Err(DeclineReason::Unprofitable)
        );
    }

    #[test]
    fn stale_offer_is_declined() {
        let network = RoadNetwork::grid(20, 20, 5, 1.0);
        let taxi = on_duty_taxi(&network, (0, 0));
        // 90 - 80 = 10 minutes left, need 10 + 5.
        assert_eq!(
            taxi.evaluate_offer(80, &key((5, 5), (10, 10)), 50.0, &network),
            Err(DeclineReason::TooLate)
        );
    }

    #[test]
    fn unreachable_origin_is_declined() {
        let mut network = RoadNetwork::grid(20, 20, 5, 1.0);
        network.add_junction(NodeId::new(50, 50));
        let taxi = on_duty_taxi(&network, (0, 0));
        assert_eq!(
            taxi.evaluate_offer(0, &key((50, 50), (10, 10)), 500.0, &network),
            Err(DeclineReason::Unreachable)
        );
    }

    #[test]
    fn low_balance_is_declined() {
        let network = RoadNetwork::grid(20, 20, 5, 1.0);
        let mut taxi = on_duty_taxi(&network, (0, 0));
        taxi.account = 10;
        assert_eq!(
            taxi.evaluate_offer(0, &key((5, 5), (10, 10)), 50.0, &network),
            Err(DeclineReason::CannotAfford)
        );
    }

    #[test]
    fn allocated_taxi_does_not_bid_again() {
        let network = RoadNetwork::grid(20, 20, 5, 1.0);
        let mut taxi = on_duty_taxi(&network, (0, 0));
        taxi.offers.advise(0, (5, 0).into(), (15, 0).into(), 40.0);
        taxi.offers.allocate((5, 0).into(), (15, 0).into());
        assert_eq!(
            taxi.evaluate_offer(0, &key((5, 5), (10, 10)), 50.0, &network),
            Err(DeclineReason::Busy)
        );
    }
}
