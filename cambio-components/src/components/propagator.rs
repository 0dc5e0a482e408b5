//! Climate propagator
//!
//! Advances a [`ClimateState`] by one explicit Euler step.
//!
//! Carbon moves between the atmosphere and ocean, with a constant land source, a
//! CO2-fertilised land sink and a human source:
//!
//! $$ F_{la} = k_{la} $$
//! $$ F_{al} = k_{al0} + k_{al1} \sigma_{floor}(T') C_{atm} $$
//! $$ F_{oa} = k_{oa} (1 + \gamma T') C_{ocean} $$
//! $$ F_{ao} = k_{ao} C_{atm} $$
//!
//! where $T'$ is the temperature anomaly if the temperature feedback is enabled and zero
//! otherwise. The reservoirs are then updated with
//!
//! $$ C_{atm}' = C_{atm} + (F_{la} + F_{oa} - F_{ao} - F_{al} + F_{ha}) \Delta t $$
//! $$ C_{ocean}' = C_{ocean} + (F_{ao} - F_{oa}) \Delta t $$
//!
//! With the albedo feedback enabled, albedo follows the temperature anomaly down towards
//! its floor (optionally rate limited) and feeds back onto the anomaly through
//! `albedo_sensitivity`.

use cambio_core::errors::{CambioError, CambioResult};
use cambio_core::math::sigmafloor;
use cambio_core::parameters::ParameterSet;
use cambio_core::state::ClimateState;
use cambio_core::{FloatValue, Time};
use log::debug;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Absolute temperature the anomaly is measured from
/// unit: degC
pub const PREINDUSTRIAL_TEMPERATURE: FloatValue = 14.0;

/// Ocean surface pH diagnosed from atmospheric carbon.
///
/// $$ pH = -\log_{10}(C_{atm} / C_{atm,pi}) + pH_{pi} $$
///
/// Only defined for positive `c_atm`.
pub fn diagnose_ph(
    c_atm: FloatValue,
    preindust_c_atm: FloatValue,
    preindust_ph: FloatValue,
) -> FloatValue {
    -(c_atm / preindust_c_atm).log10() + preindust_ph
}

/// Absolute temperature from a temperature anomaly
pub fn diagnose_actual_temperature(temp_anomaly: FloatValue) -> FloatValue {
    temp_anomaly + PREINDUSTRIAL_TEMPERATURE
}

/// Advance `prev` by one step of `params.dtime`.
///
/// `rng` is only sampled when `params.stochastic_c_atm_std_dev > 0`.
pub fn propagate<R: Rng + ?Sized>(
    prev: &ClimateState,
    params: &ParameterSet,
    human_flux: FloatValue,
    rng: &mut R,
) -> CambioResult<ClimateState> {
    ClimatePropagator::from_parameters(params).propagate(prev, human_flux, rng)
}

/// The state transition function of the model.
///
/// Holds no state of its own; every step is a function of the previous state, the
/// parameters, the human flux and the random source.
#[derive(Debug, Clone, Copy)]
pub struct ClimatePropagator<'a> {
    parameters: &'a ParameterSet,
}

impl<'a> ClimatePropagator<'a> {
    pub fn from_parameters(parameters: &'a ParameterSet) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &ParameterSet {
        self.parameters
    }

    /// Warming implied by atmospheric carbon above preindustrial
    pub fn diagnose_temp_anomaly(&self, c_atm: FloatValue) -> FloatValue {
        self.parameters.climate_sensitivity * (c_atm - self.parameters.preindust_c_atm)
    }

    /// The anomaly seen by the carbon fluxes, zero unless the temperature feedback is on
    pub fn effective_temp_anomaly(&self, temp_anomaly: FloatValue) -> FloatValue {
        if self.parameters.temp_anomaly_feedback {
            temp_anomaly
        } else {
            0.0
        }
    }

    /// Temperature dependent ocean degassing
    pub fn flux_ocean_atm(&self, c_ocean: FloatValue, temp_anomaly_eff: FloatValue) -> FloatValue {
        let p = self.parameters;
        p.k_oa * (1.0 + p.ocean_degas_flux_feedback * temp_anomaly_eff) * c_ocean
    }

    /// Land sink, with CO2 fertilisation weakening as temperature rises
    pub fn flux_atm_land(&self, c_atm: FloatValue, temp_anomaly_eff: FloatValue) -> FloatValue {
        let p = self.parameters;
        let fertilisation = sigmafloor(
            temp_anomaly_eff,
            p.flux_al_transition_temp,
            p.flux_al_transition_temp_interval,
            p.fractional_flux_al_floor,
        );
        p.k_al0 + p.k_al1 * fertilisation * c_atm
    }

    /// Ocean uptake, proportional to atmospheric carbon
    pub fn flux_atm_ocean(&self, c_atm: FloatValue) -> FloatValue {
        self.parameters.k_ao * c_atm
    }

    /// Constant land source
    pub fn flux_land_atm(&self) -> FloatValue {
        self.parameters.k_la
    }

    /// Albedo in equilibrium with a temperature anomaly
    pub fn unconstrained_albedo(&self, temp_anomaly: FloatValue) -> FloatValue {
        let p = self.parameters;
        sigmafloor(
            temp_anomaly,
            p.albedo_transition_temp,
            p.albedo_transition_interval,
            p.fractional_albedo_floor,
        ) * p.preindust_albedo
    }

    /// Limit the albedo change over `dtime` to `max_albedo_change_rate * dtime`.
    ///
    /// Returns the new albedo and whether the limit was hit.
    pub fn constrain_albedo(
        &self,
        albedo: FloatValue,
        prev_albedo: FloatValue,
        dtime: Time,
    ) -> (FloatValue, bool) {
        let change = albedo - prev_albedo;
        let max_change = self.parameters.max_albedo_change_rate * dtime;
        if change.abs() > max_change {
            (prev_albedo + change.signum() * max_change, true)
        } else {
            (albedo, false)
        }
    }

    /// Additional warming from an albedo below preindustrial
    pub fn delta_temp_from_albedo(&self, albedo: FloatValue) -> FloatValue {
        (albedo - self.parameters.preindust_albedo) * self.parameters.albedo_sensitivity
    }

    /// Advance `prev` by one step, with `human_flux` as the human to atmosphere flux.
    ///
    /// Fails if atmospheric carbon ends the step non-positive, where pH is undefined.
    pub fn propagate<R: Rng + ?Sized>(
        &self,
        prev: &ClimateState,
        human_flux: FloatValue,
        rng: &mut R,
    ) -> CambioResult<ClimateState> {
        let p = self.parameters;
        let dtime = p.dtime;
        let year = prev.year + dtime;

        let mut temp_anomaly = self.diagnose_temp_anomaly(prev.c_atm);
        let temp_anomaly_eff = self.effective_temp_anomaly(temp_anomaly);

        let flux_oa = self.flux_ocean_atm(prev.c_ocean, temp_anomaly_eff);
        let flux_al = self.flux_atm_land(prev.c_atm, temp_anomaly_eff);
        let flux_ao = self.flux_atm_ocean(prev.c_atm);
        let flux_la = self.flux_land_atm();

        let mut c_atm = prev.c_atm + (flux_la + flux_oa - flux_ao - flux_al + human_flux) * dtime;
        let c_ocean = prev.c_ocean + (flux_ao - flux_oa) * dtime;

        let albedo = if p.albedo_feedback {
            let albedo = self.unconstrained_albedo(temp_anomaly);
            let albedo = if p.albedo_with_no_constraint {
                albedo
            } else {
                let (constrained, clamped) = self.constrain_albedo(albedo, prev.albedo, dtime);
                if clamped {
                    debug!(
                        "Albedo change limited to {} in year {} (unconstrained {})",
                        constrained, year, albedo
                    );
                }
                constrained
            };
            temp_anomaly += self.delta_temp_from_albedo(albedo);
            albedo
        } else {
            prev.albedo
        };

        // Must stay the last change to c_atm so pH sees the perturbed value
        if p.is_stochastic() {
            let noise = Normal::new(c_atm, p.stochastic_c_atm_std_dev)
                .map_err(|e| CambioError::Stochastic(e.to_string()))?;
            c_atm = noise.sample(rng);
        }

        if !(c_atm > 0.0) {
            return Err(CambioError::NonPositiveAtmosphericCarbon { year, c_atm });
        }

        Ok(ClimateState {
            year,
            c_atm,
            c_ocean,
            albedo,
            temp_anomaly,
            ph: diagnose_ph(c_atm, p.preindust_c_atm, p.preindust_ph),
            temp_c: diagnose_actual_temperature(temp_anomaly),
            flux_ha: human_flux,
            flux_ao,
            flux_oa,
            flux_la,
            flux_al,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn feedback_parameters() -> ParameterSet {
        ParameterSet {
            albedo_feedback: true,
            temp_anomaly_feedback: true,
            ..ParameterSet::default()
        }
    }

    fn preindustrial(params: &ParameterSet) -> ClimateState {
        ClimateState::preindustrial(params, params.start_year)
    }

    fn warm_state(params: &ParameterSet) -> ClimateState {
        ClimateState {
            c_atm: 1500.0,
            c_ocean: 700.0,
            ..preindustrial(params)
        }
    }

    #[test]
    fn test_first_step_from_preindustrial() {
        let params = ParameterSet {
            albedo_transition_temp: 4.0,
            flux_al_transition_temp: 3.9,
            ..feedback_parameters()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let state = propagate(&preindustrial(&params), &params, 0.013362685654972034, &mut rng)
            .unwrap();

        assert_eq!(state.year, 1750.0);
        assert_relative_eq!(state.c_atm, 614.8923685004033, epsilon = 1e-9);
        assert_relative_eq!(state.c_ocean, 350.11, epsilon = 1e-9);
        assert_relative_eq!(state.albedo, 0.2999998156747619, epsilon = 1e-12);
        assert_relative_eq!(state.temp_anomaly, 1.8432523807287993e-5, epsilon = 1e-12);
        assert_relative_eq!(state.ph, 8.200076012775865, epsilon = 1e-9);
        assert_relative_eq!(state.flux_ao, 70.11, epsilon = 1e-9);
        assert_relative_eq!(state.flux_oa, 70.0, epsilon = 1e-9);
        assert_relative_eq!(state.flux_la, 120.0);
        assert_relative_eq!(state.flux_al, 120.01099418525162, epsilon = 1e-9);
        assert_relative_eq!(state.temp_c, 14.0 + state.temp_anomaly);
    }

    #[test]
    fn test_mass_conservation() {
        let params = feedback_parameters();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut prev = preindustrial(&params);

        for i in 0..100 {
            let human_flux = 0.1 * i as f64;
            let next = propagate(&prev, &params, human_flux, &mut rng).unwrap();

            let reservoir_change = (next.c_atm - prev.c_atm) + (next.c_ocean - prev.c_ocean);
            let external_input = (next.flux_la - next.flux_al + human_flux) * params.dtime;
            assert_abs_diff_eq!(reservoir_change, external_input, epsilon = 1e-9);

            prev = next;
        }
    }

    #[test]
    fn test_mass_conservation_with_fractional_step() {
        let params = ParameterSet {
            dtime: 0.25,
            ..feedback_parameters()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let prev = warm_state(&params);
        let next = propagate(&prev, &params, 10.0, &mut rng).unwrap();

        let reservoir_change = (next.c_atm - prev.c_atm) + (next.c_ocean - prev.c_ocean);
        assert_abs_diff_eq!(
            reservoir_change,
            (next.flux_la - next.flux_al + 10.0) * 0.25,
            epsilon = 1e-9
        );
        assert_eq!(next.year, prev.year + 0.25);
    }

    #[test]
    fn test_albedo_rate_is_capped() {
        let params = ParameterSet {
            albedo_transition_temp: 0.5,
            ..feedback_parameters()
        };
        let propagator = ClimatePropagator::from_parameters(&params);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let prev = warm_state(&params);

        let unconstrained = propagator.unconstrained_albedo(propagator.diagnose_temp_anomaly(prev.c_atm));
        assert!((unconstrained - prev.albedo).abs() > params.max_albedo_change_rate);

        let next = propagator.propagate(&prev, 0.0, &mut rng).unwrap();
        assert_relative_eq!(
            next.albedo,
            prev.albedo - params.max_albedo_change_rate * params.dtime,
            epsilon = 1e-12
        );

        let mut state = next;
        for _ in 0..50 {
            let following = propagator.propagate(&state, 0.0, &mut rng).unwrap();
            assert!(
                (following.albedo - state.albedo).abs()
                    <= params.max_albedo_change_rate * params.dtime + 1e-12
            );
            state = following;
        }
    }

    #[test]
    fn test_albedo_without_constraint_jumps() {
        let params = ParameterSet {
            albedo_transition_temp: 0.5,
            albedo_with_no_constraint: true,
            ..feedback_parameters()
        };
        let propagator = ClimatePropagator::from_parameters(&params);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let prev = warm_state(&params);

        let temp_anomaly = propagator.diagnose_temp_anomaly(prev.c_atm);
        let next = propagator.propagate(&prev, 0.0, &mut rng).unwrap();
        assert_relative_eq!(next.albedo, propagator.unconstrained_albedo(temp_anomaly));
        assert!(next.albedo < params.preindust_albedo * 0.95);

        // Albedo floor bounds the response
        assert!(next.albedo >= params.preindust_albedo * params.fractional_albedo_floor);

        // Lower albedo warms
        assert!(next.temp_anomaly > temp_anomaly);
        assert_relative_eq!(
            next.temp_anomaly,
            temp_anomaly + (next.albedo - params.preindust_albedo) * params.albedo_sensitivity
        );
    }

    #[test]
    fn test_constrain_albedo() {
        let params = ParameterSet::default();
        let propagator = ClimatePropagator::from_parameters(&params);

        let (albedo, clamped) = propagator.constrain_albedo(0.2999, 0.3, 1.0);
        assert_eq!(albedo, 0.2999);
        assert!(!clamped);

        let (albedo, clamped) = propagator.constrain_albedo(0.25, 0.3, 2.0);
        assert_relative_eq!(albedo, 0.3 - 0.0012);
        assert!(clamped);

        let (albedo, clamped) = propagator.constrain_albedo(0.31, 0.3, 1.0);
        assert_relative_eq!(albedo, 0.3006);
        assert!(clamped);
    }

    #[test]
    fn test_albedo_carried_without_feedback() {
        let params = ParameterSet {
            albedo_transition_temp: 0.5,
            ..ParameterSet::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let prev = ClimateState {
            albedo: 0.29,
            ..warm_state(&params)
        };
        let next = propagate(&prev, &params, 0.0, &mut rng).unwrap();
        assert_eq!(next.albedo, 0.29);
        let propagator = ClimatePropagator::from_parameters(&params);
        assert_eq!(next.temp_anomaly, propagator.diagnose_temp_anomaly(prev.c_atm));
    }

    #[test]
    fn test_feedback_gating() {
        let params = ParameterSet {
            flux_al_transition_temp: 1.0,
            ..ParameterSet::default()
        };
        assert!(!params.temp_anomaly_feedback);
        let propagator = ClimatePropagator::from_parameters(&params);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let prev = warm_state(&params);
        assert!(propagator.diagnose_temp_anomaly(prev.c_atm) > 4.0);

        let next = propagator.propagate(&prev, 0.0, &mut rng).unwrap();
        assert_eq!(next.flux_al, propagator.flux_atm_land(prev.c_atm, 0.0));
        assert_eq!(next.flux_oa, propagator.flux_ocean_atm(prev.c_ocean, 0.0));
        assert_relative_eq!(next.flux_oa, params.k_oa * prev.c_ocean);

        let feedback_params = ParameterSet {
            temp_anomaly_feedback: true,
            ..params.clone()
        };
        let with_feedback = propagate(&prev, &feedback_params, 0.0, &mut rng).unwrap();
        assert!(with_feedback.flux_al < next.flux_al);
        assert!(with_feedback.flux_oa > next.flux_oa);
    }

    #[test]
    fn test_simple_fluxes() {
        let params = ParameterSet::default();
        let propagator = ClimatePropagator::from_parameters(&params);
        assert_relative_eq!(propagator.flux_atm_ocean(615.0), 70.11, epsilon = 1e-9);
        assert_eq!(propagator.flux_land_atm(), params.k_la);
    }

    #[test]
    fn test_diagnostics() {
        assert_relative_eq!(diagnose_ph(615.0, 615.0, 8.2), 8.2);
        assert_relative_eq!(diagnose_ph(6150.0, 615.0, 8.2), 7.2, epsilon = 1e-12);
        assert_relative_eq!(diagnose_actual_temperature(1.5), 15.5);
    }

    #[test]
    fn test_previous_state_is_untouched() {
        let params = feedback_parameters();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let prev = warm_state(&params);
        let copy = prev;
        let a = propagate(&prev, &params, 5.0, &mut rng).unwrap();
        let b = propagate(&prev, &params, 5.0, &mut rng).unwrap();
        assert_eq!(prev, copy);
        assert_eq!(a, b);
    }

    #[test]
    fn test_noise_is_seeded() {
        let params = ParameterSet {
            stochastic_c_atm_std_dev: 5.0,
            ..feedback_parameters()
        };
        let prev = preindustrial(&params);
        let deterministic = propagate(
            &prev,
            &ParameterSet::default(),
            1.0,
            &mut ChaCha8Rng::seed_from_u64(1),
        )
        .unwrap();

        let a = propagate(&prev, &params, 1.0, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        let b = propagate(&prev, &params, 1.0, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        let c = propagate(&prev, &params, 1.0, &mut ChaCha8Rng::seed_from_u64(2)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.c_atm, c.c_atm);

        // Only atmospheric carbon and its diagnostics move
        assert_ne!(a.c_atm, deterministic.c_atm);
        assert!((a.c_atm - deterministic.c_atm).abs() < 50.0);
        assert_eq!(a.c_ocean, deterministic.c_ocean);
        assert_relative_eq!(a.ph, diagnose_ph(a.c_atm, 615.0, 8.2));
    }

    #[test]
    fn test_no_noise_ignores_rng() {
        let params = feedback_parameters();
        let prev = warm_state(&params);
        let a = propagate(&prev, &params, 1.0, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        let b = propagate(&prev, &params, 1.0, &mut ChaCha8Rng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_non_positive_carbon_is_an_error() {
        let params = ParameterSet::default();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let prev = preindustrial(&params);
        let err = propagate(&prev, &params, -2000.0, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            CambioError::NonPositiveAtmosphericCarbon { year, c_atm } if year == 1750.0 && c_atm < 0.0
        ));
    }
}
