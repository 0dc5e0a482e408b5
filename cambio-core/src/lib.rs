//! Core types for the Cambio carbon-cycle and climate box model
//!
//! This crate holds everything a model run is described by and produces, without any of
//! the physics: the [`parameters::ParameterSet`], the per-step [`state::ClimateState`],
//! the columnar [`timeseries::ClimateTimeSeries`] output, the error taxonomy, and the
//! logistic helper functions shared by the components.

pub mod errors;
pub mod math;
pub mod parameters;
pub mod state;
pub mod timeseries;

/// Floating point type used for every physical quantity
pub type FloatValue = f64;
/// Time in years
pub type Time = f64;
