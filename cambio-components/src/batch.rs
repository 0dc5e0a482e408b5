//! Batches of runs
//!
//! Scenarios are independent of one another, so a batch is run in parallel on the rayon
//! thread pool. [`RunCache`] memoises deterministic runs keyed on their full parameter
//! set, so repeated requests for the same configuration are integrated only once.

use crate::run::run;
use cambio_core::errors::{CambioError, CambioResult};
use cambio_core::parameters::ParameterSet;
use cambio_core::timeseries::ClimateTimeSeries;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// A named parameter set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub parameters: ParameterSet,
}

impl Scenario {
    pub fn new(name: impl Into<String>, parameters: ParameterSet) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }
}

fn check_unique_names(scenarios: &[Scenario]) -> CambioResult<()> {
    let mut seen = HashSet::with_capacity(scenarios.len());
    for scenario in scenarios {
        if !seen.insert(scenario.name.as_str()) {
            return Err(CambioError::DuplicateScenario(scenario.name.clone()));
        }
    }
    Ok(())
}

/// Collect per-scenario results, failing with the first error in input order.
fn collect_results<T>(
    results: Vec<(String, CambioResult<T>)>,
) -> CambioResult<BTreeMap<String, T>> {
    results
        .into_iter()
        .map(|(name, result)| result.map(|output| (name, output)))
        .collect()
}

/// Run every scenario in parallel.
///
/// Scenario names must be unique. If any run fails the whole batch fails with the error
/// of the first failing scenario in input order.
pub fn run_scenarios(scenarios: &[Scenario]) -> CambioResult<BTreeMap<String, ClimateTimeSeries>> {
    check_unique_names(scenarios)?;
    info!("Running {} scenarios", scenarios.len());

    let results: Vec<_> = scenarios
        .par_iter()
        .map(|scenario| (scenario.name.clone(), run(&scenario.parameters)))
        .collect();
    collect_results(results)
}

type Slot = Arc<OnceLock<CambioResult<Arc<ClimateTimeSeries>>>>;

/// Memoises runs by parameter set.
///
/// Only runs that are reproducible are cached: deterministic runs and stochastic runs
/// with a seed. Concurrent requests for the same parameters wait on a single
/// computation rather than each integrating the model.
#[derive(Debug, Default)]
pub struct RunCache {
    slots: Mutex<HashMap<String, Slot>>,
    computations: AtomicUsize,
}

impl RunCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for a parameter set, or `None` if its runs are not reproducible.
    pub fn fingerprint(params: &ParameterSet) -> Option<String> {
        if params.is_stochastic() && params.seed.is_none() {
            return None;
        }
        serde_json::to_string(params).ok()
    }

    /// Return the cached output for `params`, running the model on a miss.
    ///
    /// Failed runs are cached too since they fail the same way every time.
    pub fn get_or_run(&self, params: &ParameterSet) -> CambioResult<Arc<ClimateTimeSeries>> {
        let key = match Self::fingerprint(params) {
            Some(key) => key,
            None => {
                debug!("Unseeded stochastic run bypasses the cache");
                self.computations.fetch_add(1, Ordering::SeqCst);
                return run(params).map(Arc::new);
            }
        };

        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(key).or_default().clone()
        };

        let mut computed = false;
        let result = slot.get_or_init(|| {
            computed = true;
            self.computations.fetch_add(1, Ordering::SeqCst);
            run(params).map(Arc::new)
        });
        if !computed {
            info!("Reusing cached run");
        }
        result.clone()
    }

    /// Run every scenario in parallel through the cache.
    pub fn run_scenarios(
        &self,
        scenarios: &[Scenario],
    ) -> CambioResult<BTreeMap<String, Arc<ClimateTimeSeries>>> {
        check_unique_names(scenarios)?;
        let results: Vec<_> = scenarios
            .par_iter()
            .map(|scenario| (scenario.name.clone(), self.get_or_run(&scenario.parameters)))
            .collect();
        collect_results(results)
    }

    /// Number of times the model has actually been integrated by this cache
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::SeqCst)
    }

    /// Number of cached parameter sets
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
