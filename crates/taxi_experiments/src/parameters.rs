//! Parameter sweeps over scenario settings and seeds.
//!
//! A [ParameterSpace] starts from a base [ScenarioParams] and lists values to
//! try for a handful of dimensions. An empty dimension keeps the base value.
//! [ParameterSpace::generate] expands the Cartesian product, seeds varying
//! fastest, into numbered [ParameterSet]s.

use serde::{Deserialize, Serialize};
use taxi_core::scenario::ScenarioParams;

use crate::error::{ExperimentError, Result};

/// One run of an experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSet {
    pub experiment_id: String,
    pub run_id: usize,
    pub seed: u64,
    pub params: ScenarioParams,
}

impl ParameterSet {
    /// Scenario parameters with this run's seed applied.
    pub fn scenario_params(&self) -> ScenarioParams {
        self.params.clone().with_seed(self.seed)
    }
}

#[derive(Debug, Clone)]
pub struct ParameterSpace {
    experiment_id: String,
    base: ScenarioParams,
    seeds: Vec<u64>,
    num_taxis: Vec<usize>,
    fare_probabilities: Vec<f64>,
    revenue_shares: Vec<f64>,
    days: Vec<u64>,
}

impl Default for ParameterSpace {
    fn default() -> Self {
        Self::from_base(ScenarioParams::default())
    }
}

impl ParameterSpace {
    pub fn grid() -> Self {
        Self::default()
    }

    pub fn from_base(base: ScenarioParams) -> Self {
        Self {
            experiment_id: "sweep".to_string(),
            base,
            seeds: Vec::new(),
            num_taxis: Vec::new(),
            fare_probabilities: Vec::new(),
            revenue_shares: Vec::new(),
            days: Vec::new(),
        }
    }

    pub fn experiment_id(mut self, id: impl Into<String>) -> Self {
        self.experiment_id = id.into();
        self
    }

    pub fn seeds(mut self, seeds: Vec<u64>) -> Self {
        self.seeds = seeds;
        self
    }

    /// `count` consecutive seeds starting at `first`.
    pub fn seed_range(self, first: u64, count: u64) -> Self {
        self.seeds((first..first.saturating_add(count)).collect())
    }

    pub fn num_taxis(mut self, values: Vec<usize>) -> Self {
        self.num_taxis = values;
        self
    }

    pub fn fare_probability(mut self, values: Vec<f64>) -> Self {
        self.fare_probabilities = values;
        self
    }

    pub fn revenue_share(mut self, values: Vec<f64>) -> Self {
        self.revenue_shares = values;
        self
    }

    pub fn days(mut self, values: Vec<u64>) -> Self {
        self.days = values;
        self
    }

    pub fn base(&self) -> &ScenarioParams {
        &self.base
    }

    /// Number of runs [generate](Self::generate) will produce.
    pub fn run_count(&self) -> usize {
        [
            self.seeds.len(),
            self.num_taxis.len(),
            self.fare_probabilities.len(),
            self.revenue_shares.len(),
            self.days.len(),
        ]
        .iter()
        .map(|n| (*n).max(1))
        .product()
    }

    /// Rejects values a scenario cannot be built from.
    pub fn validate(&self) -> Result<()> {
        if let Some(p) = self
            .fare_probabilities
            .iter()
            .find(|p| !(0.0..=1.0).contains(*p))
        {
            return Err(ExperimentError::Params(format!(
                "fare probability {p} is outside [0, 1]"
            )));
        }
        if let Some(s) = self
            .revenue_shares
            .iter()
            .find(|s| !(0.0..=1.0).contains(*s))
        {
            return Err(ExperimentError::Params(format!(
                "revenue share {s} is outside [0, 1]"
            )));
        }
        if self.days.contains(&0) || (self.days.is_empty() && self.base.days == 0) {
            return Err(ExperimentError::Params("a run needs at least one day".to_string()));
        }
        Ok(())
    }

    pub fn generate(&self) -> Vec<ParameterSet> {
        let seeds = or_base(&self.seeds, self.base.seed);
        let taxis = or_base(&self.num_taxis, self.base.num_taxis);
        let probabilities = or_base(&self.fare_probabilities, self.base.fares.fare_probability);
        let shares = or_base(&self.revenue_shares, self.base.dispatcher.revenue_share);
        let days = or_base(&self.days, self.base.days);

        let mut sets = Vec::with_capacity(self.run_count());
        for &num_taxis in &taxis {
            for &fare_probability in &probabilities {
                for &revenue_share in &shares {
                    for &run_days in &days {
                        let mut params = self.base.clone().with_taxis(num_taxis).with_days(run_days);
                        params.fares.fare_probability = fare_probability;
                        params.dispatcher.revenue_share = revenue_share;
                        for &seed in &seeds {
                            sets.push(ParameterSet {
                                experiment_id: self.experiment_id.clone(),
                                run_id: sets.len(),
                                seed,
                                params: params.clone(),
                            });
                        }
                    }
                }
            }
        }
        sets
    }
}

fn or_base<T: Copy>(values: &[T], base: T) -> Vec<T> {
    if values.is_empty() {
        vec![base]
    } else {
        values.to_vec()
    }
}
