//! Components of the Cambio climate box model
//!
//! This crate turns a [`cambio_core::parameters::ParameterSet`] into model output.
//!
//! # Module Organisation
//!
//! - `components::emissions`: the human emissions scenario
//! - `components::propagator`: one explicit Euler step of the carbon cycle and climate
//! - `run`: drives a single run over the full time axis
//! - `batch`: named scenarios run in parallel, with an optional memoising cache

pub mod batch;
pub mod components;
pub mod run;

pub use components::emissions::{generate_emissions_scenario, EmissionsScenario, EmissionsSeries};
pub use components::propagator::{propagate, ClimatePropagator};
pub use run::{run, run_with_rng};
