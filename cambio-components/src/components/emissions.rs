//! Emissions scenario generator
//!
//! Builds the human to atmosphere carbon flux for a run from a handful of shape
//! parameters.
//!
//! The scenario is built in three stages:
//!
//! 1. An exponentially growing curve, switched off by a logistic step-down:
//!    $$ \epsilon(t) = \epsilon_0 \frac{e^{k (t - t_0)}}{\sigma_{down}(t_0)} \sigma_{down}(t; t_{trans}, w) $$
//!    normalised so that it passes through $\epsilon_0 = 11.3$ GtC/yr in $t_0 = 2020$
//!    (had the step-down not already started).
//! 2. The midpoint $t_{trans}$ of the step-down is solved for in closed form so the curve
//!    peaks in the requested year $t_{peak}$:
//!    $$ t_{trans} = t_{peak} + \frac{w}{3} \ln\left(\frac{3 - k w}{k w}\right) $$
//!    which is only defined for $0 < k w < 3$.
//! 3. From the peak onwards the curve is replaced by a Gaussian relaxation from the
//!    peak value $b$ towards the long-term emissions $a$:
//!    $$ \epsilon_i = a + e^{-(t_i - t_{peak})^2 / w^2} (b - a) $$

use cambio_core::errors::CambioResult;
use cambio_core::math::sigmadown;
use cambio_core::parameters::ScenarioShape;
use cambio_core::{FloatValue, Time};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Year the unconstrained exponential is normalised in
pub const NORMALISATION_YEAR: Time = 2020.0;
/// Emissions in [`NORMALISATION_YEAR`] on the unconstrained exponential
/// unit: GtC / yr
pub const NORMALISATION_EMISSIONS: FloatValue = 11.3;

/// Human emissions on a regular time axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionsSeries {
    pub time: Array1<Time>,
    /// unit: GtC / yr
    pub flux_ha: Array1<FloatValue>,
}

impl EmissionsSeries {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Index of the largest emission value. Ties resolve to the earliest index and an
    /// empty series reports index 0.
    pub fn peak_index(&self) -> usize {
        peak_index(&self.flux_ha)
    }
}

/// Generator for a peaked emissions scenario with long-term emissions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmissionsScenario {
    shape: ScenarioShape,
    transition_midpoint: Time,
}

impl EmissionsScenario {
    /// Validate the shape and solve for the step-down midpoint.
    pub fn from_shape(shape: ScenarioShape) -> CambioResult<Self> {
        shape.validate()?;
        let transition_midpoint = transition_midpoint(
            shape.inv_time_constant,
            shape.transition_year,
            shape.transition_duration,
        );
        Ok(Self {
            shape,
            transition_midpoint,
        })
    }

    pub fn shape(&self) -> &ScenarioShape {
        &self.shape
    }

    /// Midpoint of the logistic step-down that puts the peak at `transition_year`.
    pub fn transition_midpoint(&self) -> Time {
        self.transition_midpoint
    }

    /// The exponential-logistic curve before post-peak flattening.
    pub fn unflattened_emissions(&self, t: Time) -> FloatValue {
        let k = self.shape.inv_time_constant;
        let w = self.shape.transition_duration;
        let normalisation = sigmadown(NORMALISATION_YEAR, self.transition_midpoint, w);

        NORMALISATION_EMISSIONS * (k * (t - NORMALISATION_YEAR)).exp() / normalisation
            * sigmadown(t, self.transition_midpoint, w)
    }

    /// Time axis `start_year + i * dtime` for `i` in `0..n_steps`.
    pub fn time_axis(&self) -> Array1<Time> {
        let n = self.shape.n_steps();
        Array1::from_iter((0..n).map(|i| self.shape.start_year + i as Time * self.shape.dtime))
    }

    /// Generate the scenario.
    pub fn generate(&self) -> EmissionsSeries {
        let time = self.time_axis();
        let raw = time.mapv(|t| self.unflattened_emissions(t));
        let flux_ha = flatten_after_peak(
            &time,
            raw,
            self.shape.transition_duration,
            self.shape.long_term_emissions,
        );
        EmissionsSeries { time, flux_ha }
    }
}

/// Generate the human emissions for a scenario shape.
///
/// Fails with a configuration error if the shape is invalid, including the case
/// `inv_time_constant * transition_duration` outside `(0, 3)`.
pub fn generate_emissions_scenario(shape: &ScenarioShape) -> CambioResult<EmissionsSeries> {
    Ok(EmissionsScenario::from_shape(*shape)?.generate())
}

/// Solve for the step-down midpoint so `exp(k t) * sigmadown(t)` peaks at `t_peak`.
///
/// Setting the derivative to zero gives `exp(3 (t_peak - t_trans) / w) = k w / (3 - k w)`.
/// Evaluated in log space so large `t_peak / w` does not overflow.
pub fn transition_midpoint(k: FloatValue, t_peak: Time, w: Time) -> Time {
    let kw = k * w;
    t_peak + w / 3.0 * ((3.0 - kw) / kw).ln()
}

fn peak_index(values: &Array1<FloatValue>) -> usize {
    let mut best = 0;
    for (i, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = i;
        }
    }
    best
}

/// Replace everything from the peak onwards with a relaxation towards `long_term`.
fn flatten_after_peak(
    time: &Array1<Time>,
    mut emissions: Array1<FloatValue>,
    width: Time,
    long_term: FloatValue,
) -> Array1<FloatValue> {
    if emissions.is_empty() {
        return emissions;
    }
    let ipeak = peak_index(&emissions);
    let peak_time = time[ipeak];
    let peak_value = emissions[ipeak];

    for i in ipeak..emissions.len() {
        let decay = (-(time[i] - peak_time).powi(2) / width.powi(2)).exp();
        emissions[i] = long_term + decay * (peak_value - long_term);
    }
    emissions
}
