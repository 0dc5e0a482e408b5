//! Cambio: a zero-dimensional carbon-cycle and climate box model
//!
//! Carbon moves between the atmosphere, the ocean and the land under a prescribed human
//! emissions scenario. Atmospheric carbon sets the temperature anomaly, which in turn
//! feeds back on the land sink, ocean degassing and planetary albedo.
//!
//! ```no_run
//! use cambio::prelude::*;
//!
//! let params = ParameterSet::default().with_overrides(ParameterOverrides {
//!     albedo_feedback: Some(true),
//!     ..ParameterOverrides::default()
//! })?;
//! let output = run(&params)?;
//! println!("{:?}", output.last());
//! # Ok::<(), CambioError>(())
//! ```

pub use cambio_components::{batch, components, run};
pub use cambio_core::{errors, math, parameters, state, timeseries, FloatValue, Time};

pub mod prelude {
    pub use cambio_components::batch::{run_scenarios, RunCache, Scenario};
    pub use cambio_components::components::emissions::{
        generate_emissions_scenario, EmissionsSeries,
    };
    pub use cambio_components::components::propagator::{
        diagnose_actual_temperature, diagnose_ph, propagate,
    };
    pub use cambio_components::run::{run, run_with_rng};
    pub use cambio_core::errors::{CambioError, CambioResult};
    pub use cambio_core::parameters::{ParameterOverrides, ParameterSet, ScenarioShape};
    pub use cambio_core::state::{ClimateState, ClimateVariable};
    pub use cambio_core::timeseries::ClimateTimeSeries;
}
