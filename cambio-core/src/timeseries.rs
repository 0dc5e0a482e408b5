//! Columnar model output
//!
//! A run produces one [`ClimateState`] per step. [`ClimateTimeSeriesBuilder`] collects
//! those states one index at a time into columns, and [`ClimateTimeSeries`] is the
//! immutable result handed back to the caller.

use crate::state::{ClimateState, ClimateVariable};
use crate::{FloatValue, Time};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Time series of every [`ClimateState`] field over a run.
///
/// All columns have the same length and index `i` of every column belongs to the same
/// step. The transition temperatures of the run are kept alongside as constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateTimeSeries {
    year: Array1<Time>,
    c_atm: Array1<FloatValue>,
    c_ocean: Array1<FloatValue>,
    albedo: Array1<FloatValue>,
    temp_anomaly: Array1<FloatValue>,
    ph: Array1<FloatValue>,
    temp_c: Array1<FloatValue>,
    flux_ha: Array1<FloatValue>,
    flux_ao: Array1<FloatValue>,
    flux_oa: Array1<FloatValue>,
    flux_la: Array1<FloatValue>,
    flux_al: Array1<FloatValue>,
    /// Albedo transition temperature used for the run
    pub albedo_transition_temp: FloatValue,
    /// Land sink transition temperature used for the run
    pub flux_al_transition_temp: FloatValue,
}

impl ClimateTimeSeries {
    /// Number of steps
    pub fn len(&self) -> usize {
        self.year.len()
    }

    pub fn is_empty(&self) -> bool {
        self.year.is_empty()
    }

    /// The year column
    pub fn years(&self) -> ArrayView1<'_, Time> {
        self.year.view()
    }

    /// A single column
    pub fn get(&self, variable: ClimateVariable) -> ArrayView1<'_, FloatValue> {
        self.column(variable).view()
    }

    /// A column looked up by its canonical name, e.g. `"c_atm"`
    pub fn get_by_name(&self, name: &str) -> Option<ArrayView1<'_, FloatValue>> {
        ClimateVariable::from_name(name).map(|v| self.get(v))
    }

    /// Iterate over `(variable, column)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (ClimateVariable, ArrayView1<'_, FloatValue>)> {
        ClimateVariable::ALL
            .into_iter()
            .map(move |v| (v, self.get(v)))
    }

    /// Reassemble the state at step `index`
    pub fn state_at(&self, index: usize) -> Option<ClimateState> {
        if index >= self.len() {
            return None;
        }
        Some(ClimateState {
            year: self.year[index],
            c_atm: self.c_atm[index],
            c_ocean: self.c_ocean[index],
            albedo: self.albedo[index],
            temp_anomaly: self.temp_anomaly[index],
            ph: self.ph[index],
            temp_c: self.temp_c[index],
            flux_ha: self.flux_ha[index],
            flux_ao: self.flux_ao[index],
            flux_oa: self.flux_oa[index],
            flux_la: self.flux_la[index],
            flux_al: self.flux_al[index],
        })
    }

    /// The final state of the run
    pub fn last(&self) -> Option<ClimateState> {
        self.len().checked_sub(1).and_then(|i| self.state_at(i))
    }

    /// Iterate over the states of the run in order
    pub fn states(&self) -> impl Iterator<Item = ClimateState> + '_ {
        (0..self.len()).filter_map(move |i| self.state_at(i))
    }

    fn column(&self, variable: ClimateVariable) -> &Array1<FloatValue> {
        match variable {
            ClimateVariable::Year => &self.year,
            ClimateVariable::CAtm => &self.c_atm,
            ClimateVariable::COcean => &self.c_ocean,
            ClimateVariable::Albedo => &self.albedo,
            ClimateVariable::TempAnomaly => &self.temp_anomaly,
            ClimateVariable::Ph => &self.ph,
            ClimateVariable::TempC => &self.temp_c,
            ClimateVariable::FluxHa => &self.flux_ha,
            ClimateVariable::FluxAo => &self.flux_ao,
            ClimateVariable::FluxOa => &self.flux_oa,
            ClimateVariable::FluxLa => &self.flux_la,
            ClimateVariable::FluxAl => &self.flux_al,
        }
    }
}

/// Collects states into columns, one step at a time.
#[derive(Debug, Clone, Default)]
pub struct ClimateTimeSeriesBuilder {
    year: Vec<Time>,
    c_atm: Vec<FloatValue>,
    c_ocean: Vec<FloatValue>,
    albedo: Vec<FloatValue>,
    temp_anomaly: Vec<FloatValue>,
    ph: Vec<FloatValue>,
    temp_c: Vec<FloatValue>,
    flux_ha: Vec<FloatValue>,
    flux_ao: Vec<FloatValue>,
    flux_oa: Vec<FloatValue>,
    flux_la: Vec<FloatValue>,
    flux_al: Vec<FloatValue>,
}

impl ClimateTimeSeriesBuilder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            year: Vec::with_capacity(capacity),
            c_atm: Vec::with_capacity(capacity),
            c_ocean: Vec::with_capacity(capacity),
            albedo: Vec::with_capacity(capacity),
            temp_anomaly: Vec::with_capacity(capacity),
            ph: Vec::with_capacity(capacity),
            temp_c: Vec::with_capacity(capacity),
            flux_ha: Vec::with_capacity(capacity),
            flux_ao: Vec::with_capacity(capacity),
            flux_oa: Vec::with_capacity(capacity),
            flux_la: Vec::with_capacity(capacity),
            flux_al: Vec::with_capacity(capacity),
        }
    }

    /// Append a state as the next index of every column
    pub fn push(&mut self, state: &ClimateState) {
        self.year.push(state.year);
        self.c_atm.push(state.c_atm);
        self.c_ocean.push(state.c_ocean);
        self.albedo.push(state.albedo);
        self.temp_anomaly.push(state.temp_anomaly);
        self.ph.push(state.ph);
        self.temp_c.push(state.temp_c);
        self.flux_ha.push(state.flux_ha);
        self.flux_ao.push(state.flux_ao);
        self.flux_oa.push(state.flux_oa);
        self.flux_la.push(state.flux_la);
        self.flux_al.push(state.flux_al);
    }

    pub fn len(&self) -> usize {
        self.year.len()
    }

    pub fn is_empty(&self) -> bool {
        self.year.is_empty()
    }

    /// Freeze the collected columns
    pub fn finish(
        self,
        albedo_transition_temp: FloatValue,
        flux_al_transition_temp: FloatValue,
    ) -> ClimateTimeSeries {
        ClimateTimeSeries {
            year: Array1::from_vec(self.year),
            c_atm: Array1::from_vec(self.c_atm),
            c_ocean: Array1::from_vec(self.c_ocean),
            albedo: Array1::from_vec(self.albedo),
            temp_anomaly: Array1::from_vec(self.temp_anomaly),
            ph: Array1::from_vec(self.ph),
            temp_c: Array1::from_vec(self.temp_c),
            flux_ha: Array1::from_vec(self.flux_ha),
            flux_ao: Array1::from_vec(self.flux_ao),
            flux_oa: Array1::from_vec(self.flux_oa),
            flux_la: Array1::from_vec(self.flux_la),
            flux_al: Array1::from_vec(self.flux_al),
            albedo_transition_temp,
            flux_al_transition_temp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn state(year: f64, c_atm: f64) -> ClimateState {
        ClimateState {
            year,
            c_atm,
            c_ocean: 350.0,
            albedo: 0.3,
            temp_anomaly: 0.0,
            ph: 8.2,
            temp_c: 14.0,
            flux_ha: 1.0,
            flux_ao: 70.0,
            flux_oa: 70.0,
            flux_la: 120.0,
            flux_al: 120.0,
        }
    }

    fn build() -> ClimateTimeSeries {
        let mut builder = ClimateTimeSeriesBuilder::with_capacity(3);
        for (i, c_atm) in [615.0, 616.0, 617.0].into_iter().enumerate() {
            builder.push(&state(2020.0 + i as f64, c_atm));
        }
        assert_eq!(builder.len(), 3);
        builder.finish(4.0, 3.9)
    }

    #[test]
    fn columns_follow_push_order() {
        let ts = build();
        assert_eq!(ts.len(), 3);
        assert_eq!(ts.years(), array![2020.0, 2021.0, 2022.0]);
        assert_eq!(ts.get(ClimateVariable::CAtm), array![615.0, 616.0, 617.0]);
        assert_eq!(ts.get_by_name("flux_la").unwrap(), array![120.0, 120.0, 120.0]);
        assert!(ts.get_by_name("carbon").is_none());
        assert_eq!(ts.albedo_transition_temp, 4.0);
        assert_eq!(ts.flux_al_transition_temp, 3.9);
    }

    #[test]
    fn iter_visits_every_column() {
        let ts = build();
        let names: Vec<&str> = ts.iter().map(|(v, _)| v.name()).collect();
        assert_eq!(names.len(), 12);
        assert_eq!(names[0], "year");
        assert!(ts.iter().all(|(_, column)| column.len() == 3));
    }

    #[test]
    fn state_at_reassembles_rows() {
        let ts = build();
        assert_eq!(ts.state_at(1), Some(state(2021.0, 616.0)));
        assert_eq!(ts.last(), Some(state(2022.0, 617.0)));
        assert_eq!(ts.state_at(3), None);
        assert_eq!(ts.states().count(), 3);
    }

    #[test]
    fn empty_series() {
        let ts = ClimateTimeSeriesBuilder::default().finish(4.0, 3.9);
        assert!(ts.is_empty());
        assert_eq!(ts.last(), None);
    }

    #[test]
    fn serialization_roundtrip() {
        let ts = build();
        let json = serde_json::to_string(&ts).expect("Serialization failed");
        let parsed: ClimateTimeSeries = serde_json::from_str(&json).expect("Deserialization failed");
        assert_eq!(ts, parsed);
    }
}
