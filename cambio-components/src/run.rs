//! Run driver
//!
//! Generates the emissions scenario for a [`ParameterSet`], starts from the preindustrial
//! state and propagates it across the whole time axis, collecting every state into a
//! [`ClimateTimeSeries`].

use crate::components::emissions::{generate_emissions_scenario, EmissionsSeries};
use crate::components::propagator::ClimatePropagator;
use approx::relative_eq;
use cambio_core::errors::{CambioError, CambioResult};
use cambio_core::parameters::ParameterSet;
use cambio_core::state::{ClimateState, ClimateVariable};
use cambio_core::timeseries::{ClimateTimeSeries, ClimateTimeSeriesBuilder};
use cambio_core::FloatValue;
use log::{debug, error};
use ndarray::ArrayView1;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// Relative and absolute tolerances of the output check
const CHECK_MAX_RELATIVE: FloatValue = 1e-5;
const CHECK_EPSILON: FloatValue = 1e-8;

/// Random source for a run: seeded from `params.seed` if present, from the OS otherwise.
pub fn rng_for(params: &ParameterSet) -> ChaCha8Rng {
    match params.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Run the model over the full time axis of `params`.
pub fn run(params: &ParameterSet) -> CambioResult<ClimateTimeSeries> {
    let mut rng = rng_for(params);
    run_with_rng(params, &mut rng)
}

/// Run the model, drawing any noise from `rng`.
///
/// The parameters are validated before anything is integrated. A run either completes
/// every step or returns an error; no partial output is produced.
pub fn run_with_rng<R: Rng + ?Sized>(
    params: &ParameterSet,
    rng: &mut R,
) -> CambioResult<ClimateTimeSeries> {
    params.validate()?;

    let emissions = generate_emissions_scenario(&params.scenario_shape())?;
    let first_year = emissions.time.first().copied().unwrap_or(params.start_year);
    debug!(
        "Running {} steps from {} (dtime={}, albedo_feedback={}, temp_anomaly_feedback={}, stochastic={})",
        emissions.len(),
        first_year,
        params.dtime,
        params.albedo_feedback,
        params.temp_anomaly_feedback,
        params.is_stochastic()
    );

    let propagator = ClimatePropagator::from_parameters(params);
    let mut state = ClimateState::preindustrial(params, first_year);
    let mut builder = ClimateTimeSeriesBuilder::with_capacity(emissions.len());

    for &human_flux in emissions.flux_ha.iter() {
        state = propagator.propagate(&state, human_flux, rng)?;
        builder.push(&state);
    }

    let output = builder.finish(params.albedo_transition_temp, params.flux_al_transition_temp);
    check_consistency(&emissions, &output)?;

    debug!(
        "Finished run at {} with c_atm={} and temp_anomaly={}",
        state.year, state.c_atm, state.temp_anomaly
    );
    Ok(output)
}

/// Verify the output reproduces the input time axis and human emissions.
///
/// A mismatch means the driver's bookkeeping is broken, not that the input was bad.
pub fn check_consistency(
    emissions: &EmissionsSeries,
    output: &ClimateTimeSeries,
) -> CambioResult<()> {
    check_column(
        ClimateVariable::Year,
        emissions.time.view(),
        output.years(),
    )?;
    check_column(
        ClimateVariable::FluxHa,
        emissions.flux_ha.view(),
        output.get(ClimateVariable::FluxHa),
    )
}

fn check_column(
    variable: ClimateVariable,
    expected: ArrayView1<FloatValue>,
    actual: ArrayView1<FloatValue>,
) -> CambioResult<()> {
    if expected.len() != actual.len() {
        return Err(inconsistent(
            variable,
            expected.len().min(actual.len()),
            expected.len() as FloatValue,
            actual.len() as FloatValue,
        ));
    }

    for (index, (e, a)) in expected.iter().zip(actual.iter()).enumerate() {
        if !relative_eq!(
            *e,
            *a,
            epsilon = CHECK_EPSILON,
            max_relative = CHECK_MAX_RELATIVE
        ) {
            return Err(inconsistent(variable, index, *e, *a));
        }
    }
    Ok(())
}

fn inconsistent(
    variable: ClimateVariable,
    index: usize,
    expected: FloatValue,
    actual: FloatValue,
) -> CambioError {
    let err = CambioError::InconsistentOutput {
        variable: variable.name().to_string(),
        index,
        expected,
        actual,
    };
    error!("{}", err);
    err
}
