//! Model parameters
//!
//! A [`ParameterSet`] holds every constant that governs a single model run: flux rate
//! constants, feedback sensitivities and thresholds, the preindustrial baseline, feature
//! switches, the time axis, and the shape of the emissions scenario.
//!
//! Parameter sets are created once per run and never mutated during integration.
//! Callers start from [`ParameterSet::default`] and apply a partial [`ParameterOverrides`]
//! (typically parsed from TOML or JSON); every construction path validates the result.

use crate::errors::{CambioError, CambioResult};
use crate::{FloatValue, Time};
use log::debug;
use serde::{Deserialize, Serialize};

/// Parameters for a full model run.
///
/// The defaults reproduce the reference Cambio configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSet {
    /// Constant land to atmosphere carbon flux
    /// unit: GtC / yr
    /// default: 120
    pub k_la: FloatValue,
    /// Constant part of the atmosphere to land flux
    /// unit: GtC / yr
    /// default: 113
    pub k_al0: FloatValue,
    /// Rate constant of the CO2-fertilised atmosphere to land flux
    /// unit: 1 / yr
    /// default: 0.0114
    pub k_al1: FloatValue,
    /// Ocean degassing rate constant
    /// unit: 1 / yr
    /// default: 0.2
    pub k_oa: FloatValue,
    /// Ocean uptake rate constant
    /// unit: 1 / yr
    /// default: 0.114
    pub k_ao: FloatValue,

    /// Warming per unit of atmospheric carbon above preindustrial
    /// unit: K / GtC
    /// default: 3 / 615
    pub climate_sensitivity: FloatValue,
    /// Warming per unit of albedo change. Negative, so a darker planet warms.
    /// unit: K
    /// default: -100
    pub albedo_sensitivity: FloatValue,
    /// Fractional increase of ocean degassing per kelvin of warming
    /// unit: 1 / K
    /// default: 0.034
    pub ocean_degas_flux_feedback: FloatValue,

    /// Temperature anomaly at which albedo starts to fall towards its floor
    /// unit: K
    /// default: 4.0
    pub albedo_transition_temp: FloatValue,
    /// Width of the albedo transition
    /// unit: K
    /// default: 1.0
    pub albedo_transition_interval: FloatValue,
    /// Temperature anomaly at which CO2 fertilisation of the land sink weakens
    /// unit: K
    /// default: 3.9
    pub flux_al_transition_temp: FloatValue,
    /// Width of the land sink transition
    /// unit: K
    /// default: 1.0
    pub flux_al_transition_temp_interval: FloatValue,
    /// Lowest albedo as a fraction of the preindustrial albedo
    /// unit: dimensionless
    /// default: 0.9
    pub fractional_albedo_floor: FloatValue,
    /// Lowest CO2 fertilisation factor of the land sink
    /// unit: dimensionless
    /// default: 0.9
    pub fractional_flux_al_floor: FloatValue,
    /// Largest allowed albedo change per year when the albedo constraint is active
    /// unit: 1 / yr
    /// default: 0.0006
    pub max_albedo_change_rate: FloatValue,

    /// unit: GtC
    /// default: 615
    pub preindust_c_atm: FloatValue,
    /// unit: GtC
    /// default: 350
    pub preindust_c_ocean: FloatValue,
    /// default: 0.3
    pub preindust_albedo: FloatValue,
    /// default: 8.2
    pub preindust_ph: FloatValue,

    /// Let albedo respond to warming, and warming respond to albedo
    /// default: false
    pub albedo_feedback: bool,
    /// Skip the albedo rate limiter
    /// default: false
    pub albedo_with_no_constraint: bool,
    /// Let warming weaken the land sink and strengthen ocean degassing
    /// default: false
    pub temp_anomaly_feedback: bool,

    /// default: 1750
    pub start_year: Time,
    /// Exclusive end of the time axis
    /// default: 2200
    pub stop_year: Time,
    /// Step size
    /// unit: yr
    /// default: 1.0
    pub dtime: Time,

    /// Year of peak human emissions
    /// default: 2040
    pub transition_year: Time,
    /// Width of the decarbonisation transition
    /// unit: yr
    /// default: 20
    pub transition_duration: Time,
    /// Human emissions once decarbonisation has run its course
    /// unit: GtC / yr
    /// default: 2.0
    pub long_term_emissions: FloatValue,
    /// Growth rate of emissions before the transition
    /// unit: 1 / yr
    /// default: 0.025
    pub inv_time_constant: FloatValue,

    /// Standard deviation of the noise added to atmospheric carbon each step.
    /// Zero disables the perturbation.
    /// unit: GtC
    /// default: 0.0
    pub stochastic_c_atm_std_dev: FloatValue,
    /// Seed for the noise generator. Runs without a seed draw one from the OS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            // Flux rate constants
            k_la: 120.0,
            k_al0: 113.0,
            k_al1: 0.0114,
            k_oa: 0.2,
            k_ao: 0.114,

            // Sensitivities
            climate_sensitivity: 3.0 / 615.0,
            albedo_sensitivity: -100.0,
            ocean_degas_flux_feedback: 0.034,

            // Thresholds
            albedo_transition_temp: 4.0,
            albedo_transition_interval: 1.0,
            flux_al_transition_temp: 3.9,
            flux_al_transition_temp_interval: 1.0,
            fractional_albedo_floor: 0.9,
            fractional_flux_al_floor: 0.9,
            max_albedo_change_rate: 0.0006,

            // Preindustrial baseline
            preindust_c_atm: 615.0,
            preindust_c_ocean: 350.0,
            preindust_albedo: 0.3,
            preindust_ph: 8.2,

            // Feature switches
            albedo_feedback: false,
            albedo_with_no_constraint: false,
            temp_anomaly_feedback: false,

            // Time axis
            start_year: 1750.0,
            stop_year: 2200.0,
            dtime: 1.0,

            // Emissions scenario
            transition_year: 2040.0,
            transition_duration: 20.0,
            long_term_emissions: 2.0,
            inv_time_constant: 0.025,

            stochastic_c_atm_std_dev: 0.0,
            seed: None,
        }
    }
}

/// Largest time axis a run may have
pub const MAX_STEPS: usize = 1_000_000;

/// The seven numbers that define an emissions scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioShape {
    pub start_year: Time,
    pub stop_year: Time,
    pub dtime: Time,
    /// Growth rate of the early exponential (k)
    pub inv_time_constant: FloatValue,
    /// Year at which emissions peak
    pub transition_year: Time,
    /// Width of the transition (w)
    pub transition_duration: Time,
    /// Asymptote approached after the peak
    pub long_term_emissions: FloatValue,
}

impl ScenarioShape {
    /// Number of points on the time axis, `ceil((stop - start) / dtime)`.
    pub fn n_steps(&self) -> usize {
        let n = ((self.stop_year - self.start_year) / self.dtime).ceil();
        if n.is_finite() && n > 0.0 {
            n as usize
        } else {
            0
        }
    }

    /// Check the shape can be turned into a scenario.
    pub fn validate(&self) -> CambioResult<()> {
        check_finite("start_year", self.start_year)?;
        check_finite("stop_year", self.stop_year)?;
        check_finite("dtime", self.dtime)?;
        check_finite("inv_time_constant", self.inv_time_constant)?;
        check_finite("transition_year", self.transition_year)?;
        check_finite("transition_duration", self.transition_duration)?;
        check_finite("long_term_emissions", self.long_term_emissions)?;

        if self.dtime <= 0.0 {
            return Err(CambioError::invalid("dtime", self.dtime, "must be positive"));
        }
        if self.stop_year <= self.start_year {
            return Err(CambioError::invalid(
                "stop_year",
                self.stop_year,
                "must be after start_year",
            ));
        }
        // Compared as floats so a vanishing dtime cannot saturate the usize cast
        if ((self.stop_year - self.start_year) / self.dtime).ceil() > MAX_STEPS as FloatValue {
            return Err(CambioError::invalid(
                "dtime",
                self.dtime,
                &format!("gives more than {} steps", MAX_STEPS),
            ));
        }
        if self.transition_duration <= 0.0 {
            return Err(CambioError::invalid(
                "transition_duration",
                self.transition_duration,
                "must be positive",
            ));
        }

        let kw = self.inv_time_constant * self.transition_duration;
        if kw <= 0.0 || kw >= 3.0 {
            return Err(CambioError::UndefinedScenarioShape {
                inv_time_constant: self.inv_time_constant,
                transition_duration: self.transition_duration,
            });
        }
        Ok(())
    }
}

impl ParameterSet {
    /// Apply a set of overrides on top of these parameters and validate the result.
    pub fn with_overrides(self, overrides: ParameterOverrides) -> CambioResult<Self> {
        let mut params = self;
        if !overrides.is_empty() {
            debug!("Applying parameter overrides {:?}", overrides);
        }
        overrides.apply_to(&mut params);
        params.validate()?;
        Ok(params)
    }

    /// Parse a TOML document of overrides and apply it on top of the defaults.
    ///
    /// ```toml
    /// transition_year = 2060.0
    /// albedo_feedback = true
    /// ```
    pub fn from_toml_str(document: &str) -> CambioResult<Self> {
        Self::default().with_overrides(ParameterOverrides::from_toml_str(document)?)
    }

    /// The subset of parameters describing the emissions scenario.
    pub fn scenario_shape(&self) -> ScenarioShape {
        ScenarioShape {
            start_year: self.start_year,
            stop_year: self.stop_year,
            dtime: self.dtime,
            inv_time_constant: self.inv_time_constant,
            transition_year: self.transition_year,
            transition_duration: self.transition_duration,
            long_term_emissions: self.long_term_emissions,
        }
    }

    /// Number of steps in a run
    pub fn n_steps(&self) -> usize {
        self.scenario_shape().n_steps()
    }

    /// True if atmospheric carbon is perturbed with noise each step.
    pub fn is_stochastic(&self) -> bool {
        self.stochastic_c_atm_std_dev > 0.0
    }

    /// Check every parameter is in its domain.
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> CambioResult<()> {
        self.scenario_shape().validate()?;

        for (name, value) in [
            ("k_la", self.k_la),
            ("k_al0", self.k_al0),
            ("k_al1", self.k_al1),
            ("k_oa", self.k_oa),
            ("k_ao", self.k_ao),
            ("climate_sensitivity", self.climate_sensitivity),
            ("albedo_sensitivity", self.albedo_sensitivity),
            ("ocean_degas_flux_feedback", self.ocean_degas_flux_feedback),
            ("albedo_transition_temp", self.albedo_transition_temp),
            ("flux_al_transition_temp", self.flux_al_transition_temp),
            ("preindust_ph", self.preindust_ph),
        ] {
            check_finite(name, value)?;
        }

        check_positive("albedo_transition_interval", self.albedo_transition_interval)?;
        check_positive(
            "flux_al_transition_temp_interval",
            self.flux_al_transition_temp_interval,
        )?;
        check_positive("preindust_c_atm", self.preindust_c_atm)?;

        check_non_negative("max_albedo_change_rate", self.max_albedo_change_rate)?;
        check_non_negative("stochastic_c_atm_std_dev", self.stochastic_c_atm_std_dev)?;
        check_non_negative("preindust_c_ocean", self.preindust_c_ocean)?;

        check_fraction("fractional_albedo_floor", self.fractional_albedo_floor)?;
        check_fraction("fractional_flux_al_floor", self.fractional_flux_al_floor)?;
        check_fraction("preindust_albedo", self.preindust_albedo)?;

        Ok(())
    }
}

fn check_finite(name: &str, value: FloatValue) -> CambioResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CambioError::invalid(name, value, "must be finite"))
    }
}

fn check_positive(name: &str, value: FloatValue) -> CambioResult<()> {
    check_finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(CambioError::invalid(name, value, "must be positive"))
    }
}

fn check_non_negative(name: &str, value: FloatValue) -> CambioResult<()> {
    check_finite(name, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(CambioError::invalid(name, value, "must not be negative"))
    }
}

fn check_fraction(name: &str, value: FloatValue) -> CambioResult<()> {
    check_finite(name, value)?;
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CambioError::invalid(name, value, "must lie within [0, 1]"))
    }
}

/// A partial [`ParameterSet`].
///
/// Every field is optional; unset fields keep the value of the set the overrides are
/// applied to. Unknown field names are rejected when deserialising.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParameterOverrides {
    pub k_la: Option<FloatValue>,
    pub k_al0: Option<FloatValue>,
    pub k_al1: Option<FloatValue>,
    pub k_oa: Option<FloatValue>,
    pub k_ao: Option<FloatValue>,
    pub climate_sensitivity: Option<FloatValue>,
    pub albedo_sensitivity: Option<FloatValue>,
    pub ocean_degas_flux_feedback: Option<FloatValue>,
    pub albedo_transition_temp: Option<FloatValue>,
    pub albedo_transition_interval: Option<FloatValue>,
    pub flux_al_transition_temp: Option<FloatValue>,
    pub flux_al_transition_temp_interval: Option<FloatValue>,
    pub fractional_albedo_floor: Option<FloatValue>,
    pub fractional_flux_al_floor: Option<FloatValue>,
    pub max_albedo_change_rate: Option<FloatValue>,
    pub preindust_c_atm: Option<FloatValue>,
    pub preindust_c_ocean: Option<FloatValue>,
    pub preindust_albedo: Option<FloatValue>,
    pub preindust_ph: Option<FloatValue>,
    pub albedo_feedback: Option<bool>,
    pub albedo_with_no_constraint: Option<bool>,
    pub temp_anomaly_feedback: Option<bool>,
    pub start_year: Option<Time>,
    pub stop_year: Option<Time>,
    pub dtime: Option<Time>,
    pub transition_year: Option<Time>,
    pub transition_duration: Option<Time>,
    pub long_term_emissions: Option<FloatValue>,
    pub inv_time_constant: Option<FloatValue>,
    pub stochastic_c_atm_std_dev: Option<FloatValue>,
    pub seed: Option<u64>,
}

impl ParameterOverrides {
    /// Parse overrides from a TOML document.
    pub fn from_toml_str(document: &str) -> CambioResult<Self> {
        toml::from_str(document).map_err(|e| CambioError::ConfigParse(e.to_string()))
    }

    /// True if no field is overridden.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply_to(self, params: &mut ParameterSet) {
        macro_rules! apply {
            ($src:expr, $dst:expr; $($field:ident),* $(,)?) => {
                $(
                    if let Some(value) = $src.$field {
                        $dst.$field = value;
                    }
                )*
            };
        }

        apply!(
            self,
            params;
            k_la,
            k_al0,
            k_al1,
            k_oa,
            k_ao,
            climate_sensitivity,
            albedo_sensitivity,
            ocean_degas_flux_feedback,
            albedo_transition_temp,
            albedo_transition_interval,
            flux_al_transition_temp,
            flux_al_transition_temp_interval,
            fractional_albedo_floor,
            fractional_flux_al_floor,
            max_albedo_change_rate,
            preindust_c_atm,
            preindust_c_ocean,
            preindust_albedo,
            preindust_ph,
            albedo_feedback,
            albedo_with_no_constraint,
            temp_anomaly_feedback,
            start_year,
            stop_year,
            dtime,
            transition_year,
            transition_duration,
            long_term_emissions,
            inv_time_constant,
            stochastic_c_atm_std_dev,
        );

        if self.seed.is_some() {
            params.seed = self.seed;
        }
    }
}
