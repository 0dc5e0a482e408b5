use crate::parameters::ParameterSet;
use crate::{FloatValue, Time};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of the climate system at the end of one time step.
///
/// Reservoirs (`c_atm`, `c_ocean`, `albedo`) are carried from step to step.
/// The fluxes describe the step that produced this state and `ph`/`temp_c` are
/// diagnosed from the other fields; neither feeds into the next step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateState {
    pub year: Time,
    /// Atmospheric carbon
    /// unit: GtC
    pub c_atm: FloatValue,
    /// Oceanic carbon
    /// unit: GtC
    pub c_ocean: FloatValue,
    pub albedo: FloatValue,
    /// unit: K
    pub temp_anomaly: FloatValue,
    pub ph: FloatValue,
    /// unit: degC
    pub temp_c: FloatValue,
    /// Human to atmosphere flux
    /// unit: GtC / yr
    pub flux_ha: FloatValue,
    /// Atmosphere to ocean flux
    /// unit: GtC / yr
    pub flux_ao: FloatValue,
    /// Ocean to atmosphere flux
    /// unit: GtC / yr
    pub flux_oa: FloatValue,
    /// Land to atmosphere flux
    /// unit: GtC / yr
    pub flux_la: FloatValue,
    /// Atmosphere to land flux
    /// unit: GtC / yr
    pub flux_al: FloatValue,
}

impl ClimateState {
    /// The preindustrial state one step before `first_year`.
    ///
    /// Reservoirs take their preindustrial values; the anomaly, fluxes and diagnostics
    /// are zero placeholders that the first propagated step overwrites.
    pub fn preindustrial(params: &ParameterSet, first_year: Time) -> Self {
        Self {
            year: first_year - params.dtime,
            c_atm: params.preindust_c_atm,
            c_ocean: params.preindust_c_ocean,
            albedo: params.preindust_albedo,
            temp_anomaly: 0.0,
            ph: 0.0,
            temp_c: 0.0,
            flux_ha: 0.0,
            flux_ao: 0.0,
            flux_oa: 0.0,
            flux_la: 0.0,
            flux_al: 0.0,
        }
    }

    /// Read a single field
    pub fn get(&self, variable: ClimateVariable) -> FloatValue {
        match variable {
            ClimateVariable::Year => self.year,
            ClimateVariable::CAtm => self.c_atm,
            ClimateVariable::COcean => self.c_ocean,
            ClimateVariable::Albedo => self.albedo,
            ClimateVariable::TempAnomaly => self.temp_anomaly,
            ClimateVariable::Ph => self.ph,
            ClimateVariable::TempC => self.temp_c,
            ClimateVariable::FluxHa => self.flux_ha,
            ClimateVariable::FluxAo => self.flux_ao,
            ClimateVariable::FluxOa => self.flux_oa,
            ClimateVariable::FluxLa => self.flux_la,
            ClimateVariable::FluxAl => self.flux_al,
        }
    }

    /// Net carbon added to the atmosphere per unit time
    pub fn net_flux_to_atmosphere(&self) -> FloatValue {
        self.flux_la + self.flux_oa - self.flux_ao - self.flux_al + self.flux_ha
    }

    /// Net carbon added to the ocean per unit time
    pub fn net_flux_to_ocean(&self) -> FloatValue {
        self.flux_ao - self.flux_oa
    }
}

/// The columns of a [`crate::timeseries::ClimateTimeSeries`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateVariable {
    Year,
    CAtm,
    COcean,
    Albedo,
    TempAnomaly,
    Ph,
    TempC,
    FluxHa,
    FluxAo,
    FluxOa,
    FluxLa,
    FluxAl,
}

impl ClimateVariable {
    /// Every variable, in output column order
    pub const ALL: [ClimateVariable; 12] = [
        ClimateVariable::Year,
        ClimateVariable::CAtm,
        ClimateVariable::COcean,
        ClimateVariable::Albedo,
        ClimateVariable::TempAnomaly,
        ClimateVariable::Ph,
        ClimateVariable::TempC,
        ClimateVariable::FluxHa,
        ClimateVariable::FluxAo,
        ClimateVariable::FluxOa,
        ClimateVariable::FluxLa,
        ClimateVariable::FluxAl,
    ];

    /// Canonical column name
    pub fn name(&self) -> &'static str {
        match self {
            ClimateVariable::Year => "year",
            ClimateVariable::CAtm => "c_atm",
            ClimateVariable::COcean => "c_ocean",
            ClimateVariable::Albedo => "albedo",
            ClimateVariable::TempAnomaly => "temp_anomaly",
            ClimateVariable::Ph => "ph",
            ClimateVariable::TempC => "temp_c",
            ClimateVariable::FluxHa => "flux_ha",
            ClimateVariable::FluxAo => "flux_ao",
            ClimateVariable::FluxOa => "flux_oa",
            ClimateVariable::FluxLa => "flux_la",
            ClimateVariable::FluxAl => "flux_al",
        }
    }

    /// Native unit of the values produced by the model
    pub fn unit(&self) -> &'static str {
        match self {
            ClimateVariable::Year => "yr",
            ClimateVariable::CAtm | ClimateVariable::COcean => "GtC",
            ClimateVariable::Albedo | ClimateVariable::Ph => "1",
            ClimateVariable::TempAnomaly => "K",
            ClimateVariable::TempC => "degC",
            ClimateVariable::FluxHa
            | ClimateVariable::FluxAo
            | ClimateVariable::FluxOa
            | ClimateVariable::FluxLa
            | ClimateVariable::FluxAl => "GtC / yr",
        }
    }

    /// Look a variable up by its canonical name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }
}

impl fmt::Display for ClimateVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preindustrial_state_starts_one_step_early() {
        let params = ParameterSet {
            dtime: 0.5,
            ..ParameterSet::default()
        };
        let state = ClimateState::preindustrial(&params, 1750.0);
        assert_eq!(state.year, 1749.5);
        assert_eq!(state.c_atm, 615.0);
        assert_eq!(state.c_ocean, 350.0);
        assert_eq!(state.albedo, 0.3);
        assert_eq!(state.temp_anomaly, 0.0);
        assert_eq!(state.flux_al, 0.0);
    }

    #[test]
    fn variable_names_roundtrip() {
        for variable in ClimateVariable::ALL {
            assert_eq!(ClimateVariable::from_name(variable.name()), Some(variable));
        }
        assert_eq!(ClimateVariable::from_name("T_anomaly"), None);
    }

    #[test]
    fn variable_serialises_as_column_name() {
        let json = serde_json::to_string(&ClimateVariable::TempAnomaly).unwrap();
        assert_eq!(json, "\"temp_anomaly\"");
        let json = serde_json::to_string(&ClimateVariable::CAtm).unwrap();
        assert_eq!(json, "\"c_atm\"");
    }

    #[test]
    fn get_reads_matching_field() {
        let state = ClimateState {
            year: 2000.0,
            c_atm: 1.0,
            c_ocean: 2.0,
            albedo: 3.0,
            temp_anomaly: 4.0,
            ph: 5.0,
            temp_c: 6.0,
            flux_ha: 7.0,
            flux_ao: 8.0,
            flux_oa: 9.0,
            flux_la: 10.0,
            flux_al: 11.0,
        };
        let values: Vec<f64> = ClimateVariable::ALL
            .iter()
            .map(|v| state.get(*v))
            .collect();
        assert_eq!(
            values,
            vec![2000.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0]
        );
        assert_eq!(state.net_flux_to_atmosphere(), 10.0 + 9.0 - 8.0 - 11.0 + 7.0);
        assert_eq!(state.net_flux_to_ocean(), -1.0);
    }
}
